//! Lyrics acquisition, caching and playback synchronization.

pub mod cache;
pub mod config;
pub mod lyrics;

pub use cache::LyricsCache;
pub use lyrics::{LyricProvider, Lyrics, LyricsError, LyricsManager, LyricsOptions, Song};
