use std::env;
use std::time::Duration;

/// Read an env var, falling back to `default` when unset
fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read and parse an env var, falling back to `default` when unset or invalid
fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Metadata provider (TMDB) settings
#[derive(Debug, Clone)]
pub struct TmdbConfig {
    pub base_url: String,
    pub api_key: String,
    /// Locale used for the localized title lookup (e.g. "hu-HU")
    pub language: String,
    /// Region tag matched against alternative titles (e.g. "HU")
    pub region: String,
}

/// Content site (HDMozi) settings
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub base_url: String,
    pub user_agent: String,
}

/// Delivery provider (RPM Share) settings
#[derive(Debug, Clone)]
pub struct RpmConfig {
    pub base_url: String,
    /// Registrable domain of the provider's own stream hosts
    pub stream_domain: String,
    /// 128-bit AES key, hex encoded
    pub key_hex: String,
    /// 16-byte CBC IV, raw text
    pub iv: String,
    pub user_agent: String,
    /// Language code used for subtitles lacking one
    pub subtitle_lang: String,
}

/// Third-party web player (Videa) settings
#[derive(Debug, Clone)]
pub struct VideaConfig {
    pub player_url: String,
    pub referer: String,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub port: u16,

    // Upstreams
    pub tmdb: TmdbConfig,
    pub site: SiteConfig,
    pub rpm: RpmConfig,
    pub videa: VideaConfig,

    // Network
    pub http_timeout_ms: u64,
    pub request_deadline_ms: u64,

    // Extractor
    pub max_verify_candidates: usize,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let desktop_ua = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

        Self {
            // Server
            port: parse_or("PORT", 7000),

            // TMDB
            tmdb: TmdbConfig {
                base_url: var_or("TMDB_BASE_URL", "https://api.themoviedb.org/3"),
                api_key: var_or("TMDB_API_KEY", "ffe7ef8916c61835264d2df68276ddc2"),
                language: var_or("TMDB_LANGUAGE", "hu-HU"),
                region: var_or("TMDB_REGION", "HU"),
            },

            // HDMozi
            site: SiteConfig {
                base_url: var_or("SITE_BASE_URL", "https://hdmozi.hu"),
                user_agent: var_or("SITE_USER_AGENT", desktop_ua),
            },

            // RPM Share - key is "kiemtienmua911ca"
            rpm: RpmConfig {
                base_url: var_or("RPM_BASE_URL", "https://rpmshare.rpmstream.live"),
                stream_domain: var_or("RPM_STREAM_DOMAIN", "rpmstream.live"),
                key_hex: var_or("RPM_KEY_HEX", "6b69656d7469656e6d75613931316361"),
                iv: var_or("RPM_IV", "1234567890oiuytr"),
                user_agent: var_or("RPM_USER_AGENT", desktop_ua),
                subtitle_lang: var_or("RPM_SUBTITLE_LANG", "hun"),
            },

            // Videa
            videa: VideaConfig {
                player_url: var_or("VIDEA_PLAYER_URL", "https://videa.hu/player"),
                referer: var_or("VIDEA_REFERER", "https://videa.hu/"),
            },

            // Network
            http_timeout_ms: parse_or("HTTP_TIMEOUT_MS", 15_000),
            request_deadline_ms: parse_or("REQUEST_DEADLINE_MS", 60_000),

            // Extractor
            max_verify_candidates: parse_or("MAX_VERIFY_CANDIDATES", 8),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn request_deadline(&self) -> Duration {
        Duration::from_millis(self.request_deadline_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
impl Config {
    /// Config pointing every upstream at a single mock server
    pub fn for_mock(server_url: &str) -> Self {
        let mut config = Self::from_env();
        config.tmdb.base_url = server_url.to_string();
        config.tmdb.api_key = "test-key".to_string();
        config.site.base_url = server_url.to_string();
        config.rpm.base_url = server_url.to_string();
        config.http_timeout_ms = 5_000;
        config.request_deadline_ms = 10_000;
        config
    }
}
