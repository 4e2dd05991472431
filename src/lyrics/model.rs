//! Data structures for lyrics acquisition and display

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// The track lyrics are requested for.
///
/// Equality and hashing cover title, artist and album; duration only helps
/// providers narrow their match.
#[derive(Debug, Clone)]
pub struct Song {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    /// Duration in seconds
    pub duration: Option<f64>,
}

impl Song {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            album: None,
            duration: None,
        }
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration = Some(secs);
        self
    }

    pub fn display_name(&self) -> String {
        format!("{} - {}", self.title, self.artist)
    }
}

impl PartialEq for Song {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title && self.artist == other.artist && self.album == other.album
    }
}

impl Eq for Song {}

impl Hash for Song {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.title.hash(state);
        self.artist.hash(state);
        self.album.hash(state);
    }
}

/// A single parsed line, timed or untimed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricLine {
    /// Seconds from the start of the track
    pub timestamp: Option<f64>,
    pub text: String,
}

impl LyricLine {
    pub fn timed(timestamp: f64, text: impl Into<String>) -> Self {
        Self {
            timestamp: Some(timestamp),
            text: text.into(),
        }
    }

    pub fn untimed(text: impl Into<String>) -> Self {
        Self {
            timestamp: None,
            text: text.into(),
        }
    }

    pub fn is_synced(&self) -> bool {
        self.timestamp.is_some()
    }

    /// Format the timestamp as `[mm:ss.xx]`
    pub fn formatted_timestamp(&self) -> Option<String> {
        self.timestamp.map(format_lrc_tag)
    }
}

fn format_lrc_tag(secs: f64) -> String {
    let centis = (secs.max(0.0) * 100.0).round() as u64;
    format!(
        "[{:02}:{:02}.{:02}]",
        centis / 6000,
        (centis / 100) % 60,
        centis % 100
    )
}

/// Where a lyrics document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LyricSource {
    #[serde(rename = "LRCLib")]
    Lrclib,
    Genius,
    Musixmatch,
    Megalobiz,
    Unknown,
}

impl LyricSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lrclib => "LRCLib",
            Self::Genius => "Genius",
            Self::Musixmatch => "Musixmatch",
            Self::Megalobiz => "Megalobiz",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for LyricSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimedLine {
    pub time: f64,
    pub text: String,
}

/// Document content. Sync-ness belongs to the whole document, never to a line.
#[derive(Debug, Clone, PartialEq)]
pub enum LyricsBody {
    /// Sorted ascending by time
    Synced(Vec<TimedLine>),
    Plain(Vec<String>),
}

/// One complete lyrics document.
#[derive(Debug, Clone, PartialEq)]
pub struct Lyrics {
    source: LyricSource,
    body: LyricsBody,
}

impl Lyrics {
    /// Build a synced document from parser output.
    ///
    /// Untimed lines are dropped. Returns `None` if no timed line remains.
    pub fn synced(source: LyricSource, lines: Vec<LyricLine>) -> Option<Self> {
        let mut timed: Vec<TimedLine> = lines
            .into_iter()
            .filter_map(|l| {
                l.timestamp.map(|time| TimedLine { time, text: l.text })
            })
            .collect();
        if timed.is_empty() {
            return None;
        }
        timed.sort_by(|a, b| a.time.total_cmp(&b.time));
        Some(Self {
            source,
            body: LyricsBody::Synced(timed),
        })
    }

    /// Build a plain document; timestamps, if any, are discarded.
    pub fn plain(source: LyricSource, lines: Vec<LyricLine>) -> Option<Self> {
        let texts: Vec<String> = lines.into_iter().map(|l| l.text).collect();
        if texts.is_empty() {
            return None;
        }
        Some(Self {
            source,
            body: LyricsBody::Plain(texts),
        })
    }

    pub fn from_lines(source: LyricSource, is_synced: bool, lines: Vec<LyricLine>) -> Option<Self> {
        if is_synced {
            Self::synced(source, lines)
        } else {
            Self::plain(source, lines)
        }
    }

    pub fn source(&self) -> LyricSource {
        self.source
    }

    pub fn body(&self) -> &LyricsBody {
        &self.body
    }

    pub fn is_synced(&self) -> bool {
        matches!(self.body, LyricsBody::Synced(_))
    }

    pub fn len(&self) -> usize {
        match &self.body {
            LyricsBody::Synced(lines) => lines.len(),
            LyricsBody::Plain(lines) => lines.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lines in document order, with timestamps present iff synced.
    pub fn lines(&self) -> Vec<LyricLine> {
        match &self.body {
            LyricsBody::Synced(lines) => lines
                .iter()
                .map(|l| LyricLine::timed(l.time, l.text.clone()))
                .collect(),
            LyricsBody::Plain(lines) => lines.iter().map(LyricLine::untimed).collect(),
        }
    }

    pub fn text_at(&self, index: usize) -> Option<&str> {
        match &self.body {
            LyricsBody::Synced(lines) => lines.get(index).map(|l| l.text.as_str()),
            LyricsBody::Plain(lines) => lines.get(index).map(String::as_str),
        }
    }

    /// Index of the line active at `time` seconds.
    ///
    /// That is the last line whose timestamp is `<= time`; among equal
    /// timestamps the later one wins. Always `None` for plain lyrics.
    pub fn current_line_index(&self, time: f64) -> Option<usize> {
        let LyricsBody::Synced(lines) = &self.body else {
            return None;
        };
        lines.partition_point(|l| l.time <= time).checked_sub(1)
    }

    pub fn current_line(&self, time: f64) -> Option<&TimedLine> {
        let LyricsBody::Synced(lines) = &self.body else {
            return None;
        };
        self.current_line_index(time).and_then(|i| lines.get(i))
    }

    /// Text only, one line per row
    pub fn plain_text(&self) -> String {
        match &self.body {
            LyricsBody::Synced(lines) => lines
                .iter()
                .map(|l| l.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            LyricsBody::Plain(lines) => lines.join("\n"),
        }
    }

    /// Render synced lyrics back to LRC text.
    pub fn to_lrc(&self) -> Option<String> {
        let LyricsBody::Synced(lines) = &self.body else {
            return None;
        };
        Some(
            lines
                .iter()
                .map(|l| format!("{}{}", format_lrc_tag(l.time), l.text))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }
}

/// All lyrics found for one song, with the recommended choice.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LyricsOptions {
    options: Vec<Lyrics>,
    default_index: usize,
}

impl LyricsOptions {
    /// The default is the first synced option, else the first one.
    pub fn new(options: Vec<Lyrics>) -> Self {
        let default_index = options.iter().position(Lyrics::is_synced).unwrap_or(0);
        Self {
            options,
            default_index,
        }
    }

    pub fn options(&self) -> &[Lyrics] {
        &self.options
    }

    pub fn into_options(self) -> Vec<Lyrics> {
        self.options
    }

    pub fn default_index(&self) -> usize {
        self.default_index
    }

    pub fn default_lyrics(&self) -> Option<&Lyrics> {
        self.options
            .get(self.default_index)
            .or_else(|| self.options.first())
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}
