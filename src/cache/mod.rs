//! Two-tier lyrics cache
//!
//! A bounded in-memory LRU in front of one JSON file per song under the cache
//! directory. Records expire `ttl` after they were written. Failures are logged
//! and degrade to a miss; nothing here returns an error to the caller.

pub mod clock;
pub mod record;

pub use clock::{Clock, SystemClock};
pub use record::{CacheRecord, CachedOption};

use crate::config::CacheConfig;
use crate::lyrics::{Lyrics, Song};
use lru::LruCache;
use sha1::{Digest, Sha1};
use std::fs;
use std::io::ErrorKind;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use time::Duration;

#[derive(Debug, Error)]
enum CacheError {
    #[error("cache i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache record: {0}")]
    Json(#[from] serde_json::Error),
}

/// Longest key used verbatim as a file stem.
const MAX_STEM_LEN: usize = 160;
/// Bytes of the key kept in front of the digest for longer keys.
const STEM_PREFIX_LEN: usize = 64;

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Cache key for a song: lowercased `title|artist`, percent-encoded.
///
/// Album and duration are not part of the key.
pub fn cache_key(song: &Song) -> String {
    let normalized = format!("{}|{}", song.title.to_lowercase(), song.artist.to_lowercase());
    urlencoding::encode(&normalized).into_owned()
}

/// Whether `key` only uses the alphabet `cache_key` produces.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'%' | b'-' | b'_' | b'.' | b'~'))
}

/// File stem for a key. Percent-encoded non-ASCII titles triple in length, so
/// long keys are cut to a prefix plus the SHA-1 of the whole key.
fn file_stem(key: &str) -> String {
    if key.len() <= MAX_STEM_LEN {
        return key.to_string();
    }
    let digest = hex::encode(Sha1::digest(key.as_bytes()));
    let mut end = STEM_PREFIX_LEN;
    while !key.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}-{digest}", &key[..end])
}

pub struct LyricsCache {
    dir: PathBuf,
    ttl: Duration,
    memory: Mutex<LruCache<String, Arc<CacheRecord>>>,
    clock: Arc<dyn Clock>,
}

impl LyricsCache {
    pub fn open(cfg: &CacheConfig) -> Self {
        Self::with_clock(
            cfg.dir.clone(),
            Duration::days(i64::from(cfg.ttl_days)),
            cfg.memory_capacity,
            Arc::new(SystemClock),
        )
    }

    pub fn with_clock(dir: PathBuf, ttl: Duration, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        if let Err(e) = fs::create_dir_all(&dir) {
            tracing::warn!("create cache dir {}: {e}", dir.display());
        }
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            dir,
            ttl,
            memory: Mutex::new(LruCache::new(capacity)),
            clock,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Live record for `song`, if any.
    pub fn get(&self, song: &Song) -> Option<Arc<CacheRecord>> {
        self.get_by_key(&cache_key(song))
    }

    pub fn get_by_key(&self, key: &str) -> Option<Arc<CacheRecord>> {
        if !is_valid_key(key) {
            return None;
        }
        let now = self.clock.now();

        {
            let mut memory = self.memory();
            if let Some(record) = memory.get(key) {
                if record.is_valid(now, self.ttl) {
                    tracing::debug!(key, "cache hit (memory)");
                    return Some(record.clone());
                }
                memory.pop(key);
            }
        }

        let path = self.path_for(key);
        match read_record(&path) {
            Ok(Some(record)) if record.is_valid(now, self.ttl) => {
                tracing::debug!(key, "cache hit (disk)");
                let record = Arc::new(record);
                self.memory().put(key.to_string(), record.clone());
                Some(record)
            }
            Ok(Some(_)) => {
                tracing::debug!(key, "cache record expired");
                remove_file(&path);
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("cache read {}: {e}", path.display());
                None
            }
        }
    }

    /// Store `lyrics` for `song`, replacing any previous record.
    pub fn save(&self, song: &Song, lyrics: &[Lyrics]) {
        let key = cache_key(song);
        let record = Arc::new(CacheRecord {
            song_key: key.clone(),
            song_title: Some(song.title.clone()),
            song_artist: Some(song.artist.clone()),
            lyrics: lyrics.iter().map(CachedOption::from_lyrics).collect(),
            cached_at: self.clock.now(),
        });

        self.memory().put(key.clone(), record.clone());

        match self.write_record(&record) {
            Ok(()) => tracing::debug!(key = %key, options = lyrics.len(), "cached lyrics"),
            Err(e) => tracing::warn!("cache write {key}: {e}"),
        }
    }

    /// Drop every record and recreate the empty cache directory.
    pub fn clear_all(&self) {
        self.memory().clear();
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("clear cache dir {}: {e}", self.dir.display()),
        }
        if let Err(e) = fs::create_dir_all(&self.dir) {
            tracing::warn!("create cache dir {}: {e}", self.dir.display());
        }
        tracing::info!("cache cleared");
    }

    /// Drop the record stored under `key`. Malformed keys are ignored.
    pub fn delete(&self, key: &str) {
        if !is_valid_key(key) {
            tracing::warn!("refusing to delete malformed cache key {key:?}");
            return;
        }
        self.memory().pop(key);
        remove_file(&self.path_for(key));
    }

    pub fn remove(&self, song: &Song) {
        self.delete(&cache_key(song));
    }

    /// Live disk records, newest first.
    pub fn list_all(&self) -> Vec<CacheRecord> {
        let now = self.clock.now();
        let mut records: Vec<CacheRecord> = self
            .record_files()
            .into_iter()
            .filter_map(|path| match read_record(&path) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("cache read {}: {e}", path.display());
                    None
                }
            })
            .filter(|record| record.is_valid(now, self.ttl))
            .collect();
        records.sort_by(|a, b| b.cached_at.cmp(&a.cached_at));
        records
    }

    /// Delete every expired disk record. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        for path in self.record_files() {
            if let Ok(Some(record)) = read_record(&path)
                && !record.is_valid(now, self.ttl)
            {
                self.memory().pop(&record.song_key);
                remove_file(&path);
                removed += 1;
            }
        }
        removed
    }

    fn memory(&self) -> MutexGuard<'_, LruCache<String, Arc<CacheRecord>>> {
        self.memory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(key)))
    }

    fn record_files(&self) -> Vec<PathBuf> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    tracing::warn!("list cache dir {}: {e}", self.dir.display());
                }
                return Vec::new();
            }
        };
        entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect()
    }

    /// Write to a temporary file and rename it over the record. Each write
    /// gets its own temporary name so concurrent saves of one key never share it.
    fn write_record(&self, record: &CacheRecord) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&record.song_key);
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = self.dir.join(format!(
            "{}.{}.{seq}.tmp",
            file_stem(&record.song_key),
            std::process::id()
        ));
        let written =
            fs::write(&tmp, serde_json::to_vec(record)?).and_then(|()| fs::rename(&tmp, &path));
        if written.is_err() {
            remove_file(&tmp);
        }
        written?;
        Ok(())
    }
}

fn read_record(path: &Path) -> Result<Option<CacheRecord>, CacheError> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_slice(&raw)?))
}

fn remove_file(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("remove {}: {e}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::clock::manual::ManualClock;
    use super::*;
    use crate::lyrics::{LyricLine, LyricSource};
    use time::macros::datetime;

    struct Fixture {
        cache: LyricsCache,
        clock: Arc<ManualClock>,
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(self.cache.dir());
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("lyricsync-cache-{}-{name}", std::process::id()))
    }

    fn fixture(name: &str, capacity: usize) -> Fixture {
        let dir = temp_dir(name);
        let _ = fs::remove_dir_all(&dir);
        let clock = Arc::new(ManualClock::new(datetime!(2025-03-01 12:00 UTC)));
        let cache = LyricsCache::with_clock(dir, Duration::days(7), capacity, clock.clone());
        Fixture { cache, clock }
    }

    fn reopen(f: &Fixture) -> LyricsCache {
        LyricsCache::with_clock(f.cache.dir().to_path_buf(), Duration::days(7), 8, f.clock.clone())
    }

    fn sample() -> Vec<Lyrics> {
        vec![
            Lyrics::synced(
                LyricSource::Lrclib,
                vec![LyricLine::timed(1.0, "one"), LyricLine::timed(2.0, "two")],
            )
            .unwrap(),
            Lyrics::plain(LyricSource::Lrclib, vec![LyricLine::untimed("one")]).unwrap(),
        ]
    }

    #[test]
    fn test_cache_key_normalization() {
        let a = Song::new("Hello World", "The Band");
        let b = Song::new("HELLO world", "the BAND").with_album("Live").with_duration(99.0);
        assert_eq!(cache_key(&a), cache_key(&b));
        assert_eq!(cache_key(&a), "hello%20world%7Cthe%20band");
        assert_ne!(cache_key(&a), cache_key(&Song::new("Hello World", "Other")));
        assert!(!cache_key(&Song::new("a/b", "c\\d")).contains(['/', '\\']));
        assert!(is_valid_key(&cache_key(&Song::new("../..", "x/y"))));
    }

    #[test]
    fn test_long_non_ascii_key_persists() {
        let f = fixture("long-key", 8);
        let song = Song::new(
            "君の名は希望今日も明日もずっと歌い続ける物語の終わりに",
            "東京スカパラダイスオーケストラ",
        );
        let key = cache_key(&song);
        assert!(key.len() > 255);
        f.cache.save(&song, &sample());

        let files: Vec<_> = fs::read_dir(f.cache.dir())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].file_name().unwrap().len() < 255);

        let fresh = reopen(&f);
        let record = fresh.get(&song).unwrap();
        assert_eq!(record.song_key, key);
        assert_eq!(record.to_lyrics(), sample());
        assert_eq!(fresh.list_all().len(), 1);

        fresh.delete(&key);
        assert!(fresh.get(&song).is_none());
        assert!(fs::read_dir(f.cache.dir()).unwrap().next().is_none());
    }

    #[test]
    fn test_long_keys_sharing_a_prefix_stay_apart() {
        let f = fixture("long-prefix", 8);
        let title = "ж".repeat(60);
        let a = Song::new(format!("{title} один"), "Артист");
        let b = Song::new(format!("{title} два"), "Артист");
        let other =
            vec![Lyrics::plain(LyricSource::Genius, vec![LyricLine::untimed("два")]).unwrap()];
        f.cache.save(&a, &sample());
        f.cache.save(&b, &other);

        let fresh = reopen(&f);
        assert_eq!(fresh.get(&a).unwrap().to_lyrics(), sample());
        assert_eq!(fresh.get(&b).unwrap().to_lyrics(), other);
    }

    #[test]
    fn test_delete_rejects_path_like_keys() {
        let f = fixture("traversal", 8);
        let outside = temp_dir("traversal-outside");
        fs::create_dir_all(&outside).unwrap();
        let victim = outside.join("victim.json");
        fs::write(&victim, b"{}").unwrap();

        let rel = format!("../{}/victim", outside.file_name().unwrap().to_string_lossy());
        assert!(!is_valid_key(&rel));
        f.cache.delete(&rel);
        assert!(victim.exists());
        assert!(!is_valid_key(""));

        let _ = fs::remove_dir_all(&outside);
    }

    #[test]
    fn test_repeated_saves_leave_no_temp_files() {
        let f = fixture("tmp", 8);
        let song = Song::new("Song", "Artist");
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..10 {
                        f.cache.save(&song, &sample());
                    }
                });
            }
        });

        let names: Vec<_> = fs::read_dir(f.cache.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, [format!("{}.json", cache_key(&song))]);
        assert_eq!(reopen(&f).get(&song).unwrap().to_lyrics(), sample());
    }

    #[test]
    fn test_concurrent_access_to_different_keys() {
        let f = fixture("threads", 4);
        std::thread::scope(|s| {
            for t in 0..8 {
                let cache = &f.cache;
                s.spawn(move || {
                    for i in 0..16 {
                        let song = Song::new(format!("Song {i}"), format!("Artist {t}"));
                        cache.save(&song, &sample());
                        let record = cache.get(&song).unwrap();
                        assert_eq!(record.song_key, cache_key(&song));
                        assert_eq!(record.to_lyrics(), sample());
                    }
                });
            }
        });

        assert_eq!(f.cache.list_all().len(), 8 * 16);
        let fresh = reopen(&f);
        for t in 0..8 {
            for i in 0..16 {
                let song = Song::new(format!("Song {i}"), format!("Artist {t}"));
                assert!(fresh.get(&song).is_some());
            }
        }
    }

    #[test]
    fn test_save_then_get_case_insensitive() {
        let f = fixture("roundtrip", 8);
        f.cache.save(&Song::new("Song", "Artist"), &sample());

        let record = f.cache.get(&Song::new("song", "ARTIST")).unwrap();
        assert_eq!(record.to_lyrics(), sample());
        assert_eq!(record.song_title.as_deref(), Some("Song"));
        assert!(f.cache.dir().join(format!("{}.json", record.song_key)).exists());
    }

    #[test]
    fn test_disk_hit_after_restart() {
        let f = fixture("restart", 8);
        f.cache.save(&Song::new("Song", "Artist"), &sample());

        let fresh = reopen(&f);
        let record = fresh.get(&Song::new("Song", "Artist")).unwrap();
        assert_eq!(record.to_lyrics(), sample());
    }

    #[test]
    fn test_expiry_purges_record() {
        let f = fixture("expiry", 8);
        let song = Song::new("Song", "Artist");
        f.cache.save(&song, &sample());
        let path = f.cache.dir().join(format!("{}.json", cache_key(&song)));

        f.clock.advance(Duration::days(7));
        assert!(f.cache.get(&song).is_some());

        f.clock.advance(Duration::seconds(1));
        assert!(f.cache.get(&song).is_none());
        assert!(!path.exists());
        assert!(reopen(&f).get(&song).is_none());
    }

    #[test]
    fn test_save_replaces_previous_record() {
        let f = fixture("replace", 8);
        let song = Song::new("Song", "Artist");
        f.cache.save(&song, &sample());

        let replacement =
            vec![Lyrics::plain(LyricSource::Genius, vec![LyricLine::untimed("new")]).unwrap()];
        f.cache.save(&song.clone().with_album("Other"), &replacement);

        assert_eq!(f.cache.get(&song).unwrap().to_lyrics(), replacement);
        assert_eq!(reopen(&f).get(&song).unwrap().to_lyrics(), replacement);
    }

    #[test]
    fn test_clear_all_and_delete_one() {
        let f = fixture("clear", 8);
        let a = Song::new("A", "X");
        let b = Song::new("B", "X");
        f.cache.save(&a, &sample());
        f.cache.save(&b, &sample());

        f.cache.delete(&cache_key(&a));
        assert!(f.cache.get(&a).is_none());
        assert!(f.cache.get(&b).is_some());

        f.cache.clear_all();
        assert!(f.cache.get(&b).is_none());
        assert!(f.cache.dir().is_dir());
        assert!(f.cache.list_all().is_empty());

        f.cache.save(&a, &sample());
        assert!(reopen(&f).get(&a).is_some());
    }

    #[test]
    fn test_list_all_newest_first_and_live_only() {
        let f = fixture("list", 8);
        f.cache.save(&Song::new("Old", "X"), &sample());
        f.clock.advance(Duration::days(5));
        f.cache.save(&Song::new("Mid", "X"), &sample());
        f.clock.advance(Duration::days(1));
        f.cache.save(&Song::new("New", "X"), &sample());
        f.clock.advance(Duration::days(3));

        let titles: Vec<_> = f
            .cache
            .list_all()
            .into_iter()
            .filter_map(|r| r.song_title)
            .collect();
        assert_eq!(titles, ["New", "Mid"]);

        assert_eq!(f.cache.purge_expired(), 1);
        assert_eq!(f.cache.purge_expired(), 0);
    }

    #[test]
    fn test_corrupt_record_is_a_miss() {
        let f = fixture("corrupt", 8);
        let song = Song::new("Song", "Artist");
        fs::write(
            f.cache.dir().join(format!("{}.json", cache_key(&song))),
            b"{ not json",
        )
        .unwrap();
        assert!(f.cache.get(&song).is_none());
        assert!(f.cache.list_all().is_empty());

        f.cache.save(&song, &sample());
        assert!(f.cache.get(&song).is_some());
    }

    #[test]
    fn test_memory_eviction_keeps_disk_record() {
        let f = fixture("evict", 1);
        let a = Song::new("A", "X");
        let b = Song::new("B", "X");
        f.cache.save(&a, &sample());
        f.cache.save(&b, &sample());

        assert!(f.cache.get(&a).is_some());
        assert!(f.cache.get(&b).is_some());
    }
}
