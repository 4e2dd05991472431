use crate::cache::{CacheRecord, LyricsCache};
use crate::config::Config;
use crate::lyrics::error::LyricsError;
use crate::lyrics::lrclib::LrclibProvider;
use crate::lyrics::model::{Lyrics, LyricsOptions, Song};
use crate::lyrics::provider::LyricProvider;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

/// Coordinates the registered providers and the cache.
pub struct LyricsManager {
    /// Sorted ascending by priority; equal priorities keep registration order.
    providers: Vec<Arc<dyn LyricProvider>>,
    cache: Arc<LyricsCache>,
    provider_timeout: Duration,
}

impl LyricsManager {
    pub fn new(cache: Arc<LyricsCache>) -> Self {
        Self {
            providers: Vec::new(),
            cache,
            provider_timeout: Duration::from_secs(crate::config::defaults::PROVIDER_TIMEOUT_SECS),
        }
    }

    /// Manager with the cache and every enabled provider from `cfg`.
    pub fn from_config(cfg: &Config) -> Result<Self, LyricsError> {
        let cache = Arc::new(LyricsCache::open(&cfg.cache));
        let mut manager = Self::new(cache)
            .with_provider_timeout(Duration::from_secs(cfg.manager.provider_timeout_secs));
        if cfg.lrclib.enabled {
            manager.register(Arc::new(LrclibProvider::new(&cfg.lrclib)?));
        }
        Ok(manager)
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// Add a provider. Duplicates are allowed; only results are de-duplicated.
    pub fn register(&mut self, provider: Arc<dyn LyricProvider>) {
        self.providers.push(provider);
        self.providers.sort_by_key(|p| p.priority());
    }

    pub fn providers(&self) -> &[Arc<dyn LyricProvider>] {
        &self.providers
    }

    pub fn cache(&self) -> &Arc<LyricsCache> {
        &self.cache
    }

    /// Every lyrics option for `song`, from cache or from all providers.
    ///
    /// Provider failures and timeouts count as "nothing found"; an empty result
    /// means no provider had lyrics.
    pub async fn fetch_all_lyrics(&self, song: &Song) -> LyricsOptions {
        if let Some(options) = self.cached(song).await {
            tracing::info!("using cached lyrics: {} options", options.len());
            return options;
        }

        if self.providers.is_empty() {
            tracing::debug!("no lyrics providers registered");
            return LyricsOptions::default();
        }

        let timeout = self.provider_timeout;
        let lookups = self.providers.iter().map(|provider| async move {
            match tokio::time::timeout(timeout, provider.fetch_all(song)).await {
                Ok(Ok(lyrics)) => lyrics,
                Ok(Err(e)) => {
                    tracing::warn!(provider = provider.name(), "lyrics fetch failed: {e}");
                    Vec::new()
                }
                Err(_) => {
                    tracing::warn!(provider = provider.name(), "lyrics fetch timed out");
                    Vec::new()
                }
            }
        });

        // join_all yields in provider order, so the first provider wins a duplicate
        let mut all: Vec<Lyrics> = Vec::new();
        for lyrics in join_all(lookups).await.into_iter().flatten() {
            let duplicate = all
                .iter()
                .any(|l| l.source() == lyrics.source() && l.is_synced() == lyrics.is_synced());
            if !duplicate {
                all.push(lyrics);
            }
        }

        if !all.is_empty() {
            let song = song.clone();
            let entries = all.clone();
            self.with_cache(move |cache| cache.save(&song, &entries)).await;
        }

        tracing::info!("fetched {} lyrics options for {}", all.len(), song.display_name());
        LyricsOptions::new(all)
    }

    /// The recommended lyrics for `song`.
    pub async fn fetch_lyrics(&self, song: &Song) -> Result<Lyrics, LyricsError> {
        let options = self.fetch_all_lyrics(song).await;
        if options.is_empty() && self.providers.is_empty() {
            return Err(LyricsError::NoProviderAvailable);
        }
        options.default_lyrics().cloned().ok_or(LyricsError::NotFound)
    }

    /// Drop the cached record for `song` and fetch it again.
    pub async fn refresh(&self, song: &Song) -> LyricsOptions {
        let target = song.clone();
        self.with_cache(move |cache| cache.remove(&target)).await;
        self.fetch_all_lyrics(song).await
    }

    /// Cached options for `song`, without contacting any provider.
    pub async fn cached(&self, song: &Song) -> Option<LyricsOptions> {
        let target = song.clone();
        let record = self.with_cache(move |cache| cache.get(&target)).await.flatten()?;
        let lyrics = record.to_lyrics();
        if lyrics.is_empty() {
            return None;
        }
        Some(LyricsOptions::new(lyrics))
    }

    pub async fn clear_cache(&self) {
        self.with_cache(|cache| cache.clear_all()).await;
    }

    pub async fn list_cached(&self) -> Vec<CacheRecord> {
        self.with_cache(|cache| cache.list_all()).await.unwrap_or_default()
    }

    pub async fn delete_cached(&self, key: &str) {
        let key = key.to_string();
        self.with_cache(move |cache| cache.delete(&key)).await;
    }

    /// Run a cache operation off the async runtime.
    async fn with_cache<T, F>(&self, op: F) -> Option<T>
    where
        F: FnOnce(&LyricsCache) -> T + Send + 'static,
        T: Send + 'static,
    {
        let cache = self.cache.clone();
        match tokio::task::spawn_blocking(move || op(&cache)).await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("cache task failed: {e}");
                None
            }
        }
    }
}
