use crate::lyrics::error::LyricsError;
use crate::lyrics::model::{LyricSource, Lyrics, Song};
use async_trait::async_trait;

/// A remote source of lyrics.
///
/// Implement this trait to add a new provider and register it with
/// [`crate::lyrics::LyricsManager::register`].
#[async_trait]
pub trait LyricProvider: Send + Sync {
    /// Human readable name
    fn name(&self) -> &str;

    /// The source tag attached to every document this provider returns
    fn source(&self) -> LyricSource;

    /// Lower values are consulted and merged first
    fn priority(&self) -> i32;

    fn supports_synced(&self) -> bool;

    /// Fetch every rendering available for `song`, synced and plain.
    ///
    /// An ordinary miss is `Ok(vec![])`; errors are for transport or payload
    /// failures only.
    async fn fetch_all(&self, song: &Song) -> Result<Vec<Lyrics>, LyricsError>;

    /// Best single rendering, synced preferred.
    async fn fetch_lyrics(&self, song: &Song) -> Result<Lyrics, LyricsError> {
        let mut all = self.fetch_all(song).await?;
        match all.iter().position(Lyrics::is_synced) {
            Some(i) => Ok(all.swap_remove(i)),
            None if !all.is_empty() => Ok(all.swap_remove(0)),
            None => Err(LyricsError::NotFound),
        }
    }
}
