use super::Config;

pub const CACHE_TTL_DAYS: u32 = 7;
pub const MEMORY_CAPACITY: usize = 256;

pub const LRCLIB_BASE_URL: &str = "https://lrclib.net/api";
pub const USER_AGENT: &str = concat!("lyricsync/", env!("CARGO_PKG_VERSION"));
pub const REQUEST_TIMEOUT_SECS: u64 = 30;
pub const READ_TIMEOUT_SECS: u64 = 15;

pub const PROVIDER_TIMEOUT_SECS: u64 = 45;

pub fn defaults() -> Config {
    Config::default()
}
