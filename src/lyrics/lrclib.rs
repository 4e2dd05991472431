//! LRCLIB lyrics provider
//!
//! LRCLIB is a free lyrics API that provides synchronized (LRC format) lyrics.
//! API Documentation: https://lrclib.net/docs

use crate::config::LrclibConfig;
use crate::lyrics::error::LyricsError;
use crate::lyrics::model::{LyricSource, Lyrics, Song};
use crate::lyrics::parser::{parse_plain, parse_timed};
use crate::lyrics::provider::LyricProvider;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// LRCLIB API response
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LrclibResponse {
    pub id: i64,
    pub track_name: String,
    pub artist_name: String,
    pub album_name: Option<String>,
    pub duration: Option<f64>,
    #[serde(default)]
    pub instrumental: bool,
    pub plain_lyrics: Option<String>,
    pub synced_lyrics: Option<String>,
}

impl LrclibResponse {
    fn has_lyrics(&self) -> bool {
        non_empty(&self.synced_lyrics).is_some() || non_empty(&self.plain_lyrics).is_some()
    }
}

fn non_empty(body: &Option<String>) -> Option<&str> {
    body.as_deref().filter(|s| !s.trim().is_empty())
}

/// LRCLIB provider
#[derive(Debug, Clone)]
pub struct LrclibProvider {
    client: reqwest::Client,
    base_url: String,
    priority: i32,
}

impl LrclibProvider {
    pub fn new(cfg: &LrclibConfig) -> Result<Self, LyricsError> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .read_timeout(Duration::from_secs(cfg.read_timeout_secs))
            .build()?;
        Ok(Self::with_client(client, &cfg.base_url, cfg.priority))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, priority: i32) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            priority,
        }
    }

    /// Get lyrics with exact match
    async fn get_exact(&self, song: &Song) -> Result<Option<LrclibResponse>, LyricsError> {
        let mut url = format!(
            "{}/get?track_name={}&artist_name={}",
            self.base_url,
            urlencoding::encode(&song.title),
            urlencoding::encode(&song.artist)
        );

        if let Some(album) = &song.album {
            url.push_str(&format!("&album_name={}", urlencoding::encode(album)));
        }

        if let Some(duration) = song.duration.filter(|d| d.is_finite() && *d >= 0.0) {
            url.push_str(&format!("&duration={}", duration as u64));
        }

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "lrclib: no direct match");
            return Ok(None);
        }

        match response.json::<LrclibResponse>().await {
            Ok(lyrics) => Ok(Some(lyrics)),
            Err(e) => {
                tracing::debug!("lrclib: undecodable direct response: {e}");
                Ok(None)
            }
        }
    }

    /// Search for lyrics
    async fn search(&self, song: &Song) -> Result<Vec<LrclibResponse>, LyricsError> {
        let query = format!("{} {}", song.title, song.artist);
        let url = format!("{}/search?q={}", self.base_url, urlencoding::encode(&query));

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(response.json().await?)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Ok(Vec::new())
        } else {
            Err(LyricsError::InvalidResponse(status.as_u16()))
        }
    }
}

#[async_trait]
impl LyricProvider for LrclibProvider {
    fn name(&self) -> &str {
        "LRCLib"
    }

    fn source(&self) -> LyricSource {
        LyricSource::Lrclib
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn supports_synced(&self) -> bool {
        true
    }

    async fn fetch_all(&self, song: &Song) -> Result<Vec<Lyrics>, LyricsError> {
        // First try the "get" endpoint with exact match
        match self.get_exact(song).await {
            Ok(Some(response)) => {
                let lyrics = build_lyrics(&response, self.source());
                if !lyrics.is_empty() {
                    return Ok(lyrics);
                }
            }
            Ok(None) => {}
            Err(e) => tracing::debug!("lrclib: direct lookup failed: {e}"),
        }

        // Fall back to search
        let results = self.search(song).await?;
        tracing::debug!(candidates = results.len(), "lrclib: search for {}", song.display_name());
        Ok(best_match(&results, song)
            .map(|r| build_lyrics(r, self.source()))
            .unwrap_or_default())
    }
}

/// How well a search candidate matches the requested song.
pub fn match_score(candidate: &LrclibResponse, song: &Song) -> u32 {
    let mut score = 0;

    let track = candidate.track_name.to_lowercase();
    let title = song.title.to_lowercase();
    if track == title {
        score += 10;
    } else if track.contains(&title) {
        score += 5;
    }

    let artist_name = candidate.artist_name.to_lowercase();
    let artist = song.artist.to_lowercase();
    if artist_name == artist {
        score += 10;
    } else if artist_name.contains(&artist) {
        score += 5;
    }

    if let (Some(album), Some(candidate_album)) = (&song.album, &candidate.album_name)
        && album.to_lowercase() == candidate_album.to_lowercase()
    {
        score += 5;
    }

    score
}

/// Highest scoring candidate that carries lyrics; the earliest wins a tie.
pub fn best_match<'a>(results: &'a [LrclibResponse], song: &Song) -> Option<&'a LrclibResponse> {
    let mut best: Option<(&LrclibResponse, u32)> = None;
    for candidate in results.iter().filter(|r| r.has_lyrics()) {
        let score = match_score(candidate, song);
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((candidate, score));
        }
    }
    best.map(|(candidate, _)| candidate)
}

/// Every rendering in a response: synced first, then plain.
fn build_lyrics(response: &LrclibResponse, source: LyricSource) -> Vec<Lyrics> {
    let mut out = Vec::new();

    if let Some(synced) = non_empty(&response.synced_lyrics)
        && let Some(lyrics) = Lyrics::synced(source, parse_timed(synced))
    {
        out.push(lyrics);
    }

    if let Some(plain) = non_empty(&response.plain_lyrics)
        && let Some(lyrics) = Lyrics::plain(source, parse_plain(plain))
    {
        out.push(lyrics);
    }

    if out.is_empty() && response.instrumental {
        tracing::debug!("lrclib: {} is instrumental", response.track_name);
    }

    out
}
