//! On-disk cache record format
//!
//! One JSON file per song key:
//! `{songKey, songTitle?, songArtist?, lyrics: [{source, isSynced, lines}], cachedAt}`

use crate::lyrics::{LyricLine, LyricSource, Lyrics};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord {
    pub song_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub song_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub song_artist: Option<String>,
    pub lyrics: Vec<CachedOption>,
    #[serde(
        serialize_with = "time::serde::rfc3339::serialize",
        deserialize_with = "deserialize_cached_at"
    )]
    pub cached_at: OffsetDateTime,
}

impl CacheRecord {
    /// A record is live while its age does not exceed `ttl`.
    pub fn is_valid(&self, now: OffsetDateTime, ttl: Duration) -> bool {
        now - self.cached_at <= ttl
    }

    pub fn to_lyrics(&self) -> Vec<Lyrics> {
        self.lyrics.iter().filter_map(CachedOption::to_lyrics).collect()
    }
}

/// One lyrics option as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedOption {
    pub source: LyricSource,
    pub is_synced: bool,
    pub lines: Vec<LyricLine>,
}

impl CachedOption {
    pub fn from_lyrics(lyrics: &Lyrics) -> Self {
        Self {
            source: lyrics.source(),
            is_synced: lyrics.is_synced(),
            lines: lyrics.lines(),
        }
    }

    /// `None` if the stored option has no usable lines.
    pub fn to_lyrics(&self) -> Option<Lyrics> {
        Lyrics::from_lines(self.source, self.is_synced, self.lines.clone())
    }

    /// `LRCLib-synced`, `Genius-plain`, ...
    pub fn id(&self) -> String {
        format!(
            "{}-{}",
            self.source,
            if self.is_synced { "synced" } else { "plain" }
        )
    }
}

/// Accept RFC 3339 text or epoch seconds.
fn deserialize_cached_at<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawStamp {
        Text(String),
        Secs(i64),
        Fractional(f64),
    }

    match RawStamp::deserialize(deserializer)? {
        RawStamp::Text(s) => OffsetDateTime::parse(&s, &Rfc3339).map_err(D::Error::custom),
        RawStamp::Secs(secs) => OffsetDateTime::from_unix_timestamp(secs).map_err(D::Error::custom),
        RawStamp::Fractional(secs) => {
            OffsetDateTime::from_unix_timestamp_nanos((secs * 1e9) as i128).map_err(D::Error::custom)
        }
    }
}
