//! Lyrics acquisition and synchronization
//!
//! This module provides:
//! - LRC format parser for synchronized and plain lyrics
//! - Data structures for lyrics display and playback sync
//! - A provider contract plus the LRCLIB implementation
//! - The manager that merges provider results through the cache

pub mod error;
pub mod lrclib;
pub mod manager;
pub mod model;
pub mod parser;
pub mod provider;

pub use error::LyricsError;
pub use lrclib::LrclibProvider;
pub use manager::LyricsManager;
pub use model::{LyricLine, LyricSource, Lyrics, LyricsBody, LyricsOptions, Song, TimedLine};
pub use parser::{parse_plain, parse_timed};
pub use provider::LyricProvider;
