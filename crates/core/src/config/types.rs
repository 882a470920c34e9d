use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Server configuration (API + streaming gateway)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "127.0.0.1".parse().unwrap()
}

fn default_port() -> u16 {
    8888
}

impl ServerConfig {
    /// Base URL of the streaming endpoint served by this instance.
    pub fn stream_url(&self) -> String {
        format!("http://{}:{}/stream", self.host, self.port)
    }
}

/// Transfer engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Where downloaded content lands.
    #[serde(default = "default_download_path")]
    pub download_path: String,
    /// Engine-side session resume folder (None disables it).
    #[serde(default)]
    pub persistence_path: Option<String>,
    /// DHT participation.
    #[serde(default = "default_true")]
    pub enable_dht: bool,
    /// Fixed listen port (None picks one).
    #[serde(default)]
    pub listen_port: Option<u16>,
    /// Keep cache records and files of evicted swarms.
    #[serde(default)]
    pub persist: bool,
    /// Only fetch pieces on demand instead of the whole swarm.
    #[serde(default = "default_true")]
    pub streamed: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            download_path: default_download_path(),
            persistence_path: None,
            enable_dht: true,
            listen_port: None,
            persist: false,
            streamed: true,
        }
    }
}

fn default_download_path() -> String {
    "hayase-downloads".to_string()
}

fn default_true() -> bool {
    true
}

/// Metadata cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub dir: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
        }
    }
}

fn default_cache_dir() -> String {
    "hayase-cache".to_string()
}

/// Search aggregator configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Per-source deadline in seconds.
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u32,
    #[serde(default)]
    pub tosho: ToshoConfig,
    #[serde(default)]
    pub nyaa: NyaaConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_search_timeout(),
            tosho: ToshoConfig::default(),
            nyaa: NyaaConfig::default(),
        }
    }
}

fn default_search_timeout() -> u32 {
    30
}

/// AnimeTosho JSON feed source
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToshoConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_tosho_url")]
    pub url: String,
}

impl Default for ToshoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_tosho_url(),
        }
    }
}

fn default_tosho_url() -> String {
    "https://feed.animetosho.org".to_string()
}

/// Nyaa RSS feed source
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NyaaConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_nyaa_url")]
    pub url: String,
    /// The feed rejects non-browser agents.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NyaaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_nyaa_url(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_nyaa_url() -> String {
    "https://nyaa.si".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

/// Sanitized config for API responses
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub cache: CacheConfig,
    pub search: SanitizedSearchConfig,
}

/// Search config without source URLs (they may embed credentials)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSearchConfig {
    pub timeout_secs: u32,
    pub tosho_enabled: bool,
    pub nyaa_enabled: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            engine: config.engine.clone(),
            cache: config.cache.clone(),
            search: SanitizedSearchConfig {
                timeout_secs: config.search.timeout_secs,
                tosho_enabled: config.search.tosho.enabled,
                nyaa_enabled: config.search.nyaa.enabled,
            },
        }
    }
}
