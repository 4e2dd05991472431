use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub mod defaults;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub lrclib: LrclibConfig,
    pub manager: ManagerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding one JSON record per song.
    pub dir: PathBuf,
    /// Records older than this are treated as absent.
    pub ttl_days: u32,
    /// Maximum records kept in memory; disk records are unaffected by eviction.
    pub memory_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LrclibConfig {
    pub enabled: bool,
    pub base_url: String,
    /// Lower is consulted first.
    pub priority: i32,
    pub user_agent: String,
    /// Overall per-request timeout.
    pub request_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Upper bound for one provider's whole lookup (direct + search).
    pub provider_timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let dir = ProjectDirs::from("dev", "lyricsync", "lyricsync")
            .map(|p| p.cache_dir().join("lyrics"))
            .unwrap_or_else(|| std::env::temp_dir().join("lyricsync").join("lyrics"));
        Self {
            dir,
            ttl_days: defaults::CACHE_TTL_DAYS,
            memory_capacity: defaults::MEMORY_CAPACITY,
        }
    }
}

impl Default for LrclibConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: defaults::LRCLIB_BASE_URL.to_string(),
            priority: 1,
            user_agent: defaults::USER_AGENT.to_string(),
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
            read_timeout_secs: defaults::READ_TIMEOUT_SECS,
        }
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            provider_timeout_secs: defaults::PROVIDER_TIMEOUT_SECS,
        }
    }
}

pub fn save(cfg: &Config, override_path: Option<&Path>) -> anyhow::Result<()> {
    let path = match override_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }
    let raw = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&path, raw).with_context(|| format!("write {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(&path, fs::Permissions::from_mode(0o600));
    }
    Ok(())
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let proj =
        ProjectDirs::from("dev", "lyricsync", "lyricsync").context("ProjectDirs unavailable")?;
    Ok(proj.config_dir().join("config.toml"))
}

/// Load the config, writing defaults on first run.
pub fn load(override_path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match override_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };

    if !path.exists() {
        let cfg = defaults::defaults();
        save(&cfg, Some(path.as_path()))?;
        return Ok(cfg);
    }

    let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg = toml::from_str::<Config>(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
