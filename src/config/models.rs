use crate::handlers::HandlerConfig;
use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    /// Extra handler instances, keyed by instance name
    #[serde(default)]
    pub handlers: BTreeMap<String, HandlerConfig>,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Web server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// How many ports after `port` to try when it is taken
    #[serde(default = "default_port_search_span")]
    pub port_search_span: u16,
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: ByteSize,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            port_search_span: default_port_search_span(),
            max_payload_bytes: default_max_payload_bytes(),
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_port_search_span() -> u16 {
    20
}

fn default_max_payload_bytes() -> ByteSize {
    ByteSize(64 * 1024) // 64 KB
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

/// Settings for the `yt-dlp` subprocess
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractorConfig {
    #[serde(default = "default_binary")]
    pub binary: PathBuf,
    #[serde(default = "default_user_agent")]
    pub user_agent: Option<String>,
    /// 0 leaves the extractor's own default in place
    #[serde(default = "default_socket_timeout_secs")]
    pub socket_timeout_secs: u64,
    #[serde(default = "default_check_certificate")]
    pub check_certificate: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            user_agent: default_user_agent(),
            socket_timeout_secs: default_socket_timeout_secs(),
            check_certificate: default_check_certificate(),
        }
    }
}

fn default_binary() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_user_agent() -> Option<String> {
    Some(
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
            .to_string(),
    )
}

fn default_socket_timeout_secs() -> u64 {
    30
}

fn default_check_certificate() -> bool {
    true
}

/// Filesystem locations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    #[serde(default = "default_preferences_file")]
    pub preferences_file: PathBuf,
    /// Directory scanned for handler manifests at startup
    #[serde(default = "default_plugin_dir")]
    pub plugin_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            preferences_file: default_preferences_file(),
            plugin_dir: default_plugin_dir(),
        }
    }
}

/// `~/.wizwam`, or `.wizwam` in the working directory when there is no home.
pub fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".wizwam")
}

fn default_preferences_file() -> PathBuf {
    app_dir().join("config.json")
}

fn default_plugin_dir() -> Option<PathBuf> {
    Some(app_dir().join("plugins"))
}
