use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::normalize::AlbumLayout;
use super::platform;

pub const ENV_USERNAME: &str = "IBROADCAST_USERNAME";
pub const ENV_PASSWORD: &str = "IBROADCAST_PASSWORD";
pub const ENV_API_URL: &str = "IBROADCAST_API_URL";
/// Older names, read when the ones above are unset.
pub const ENV_USER_EMAIL: &str = "IBROADCAST_USER_EMAIL";
pub const ENV_USER_PASSWORD: &str = "IBROADCAST_USER_PASSWORD";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// JSON endpoint used for login.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_library_url")]
    pub library_url: String,
    #[serde(default = "default_streaming_url")]
    pub streaming_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_client")]
    pub client: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_device_name")]
    pub device_name: String,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Credentials {
    pub fn is_complete(&self) -> bool {
        self.username.as_deref().is_some_and(|u| !u.is_empty())
            && self.password.as_deref().is_some_and(|p| !p.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Cache subdirectory. Defaults to one derived from the username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub album_layout: AlbumLayout,
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mpv_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_true")]
    pub show_keys_bar: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            library_url: default_library_url(),
            streaming_url: default_streaming_url(),
            timeout_secs: default_timeout_secs(),
            client: default_client(),
            version: default_version(),
            device_name: default_device_name(),
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            profile: None,
            workers: default_workers(),
            album_layout: AlbumLayout::default(),
            search_limit: default_search_limit(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            mpv_path: None,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_keys_bar: default_true(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.ibroadcast.com/s/JSON/".to_string()
}

fn default_library_url() -> String {
    "https://library.ibroadcast.com/".to_string()
}

fn default_streaming_url() -> String {
    "https://streaming.ibroadcast.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_client() -> String {
    platform::APP_NAME.to_string()
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_device_name() -> String {
    platform::APP_NAME.to_string()
}

fn default_cache_dir() -> PathBuf {
    platform::cache_dir()
}

fn default_workers() -> usize {
    4
}

fn default_search_limit() -> usize {
    crate::search::DEFAULT_SEARCH_LIMIT
}

fn default_volume() -> f32 {
    0.7
}

fn default_true() -> bool {
    true
}

impl LibraryConfig {
    /// `<cache_dir>/<profile>/library.json`.
    pub fn cache_file(&self, username: Option<&str>) -> PathBuf {
        let profile = self
            .profile
            .clone()
            .or_else(|| username.map(profile_name))
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "default".to_string());
        self.cache_dir.join(profile).join("library.json")
    }
}

/// Filesystem-safe directory name for a username.
fn profile_name(username: &str) -> String {
    username
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Read `path`, writing defaults there first if it does not exist.
    /// Environment overrides are applied on top.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            let config = Self::default();
            config.save_to(path)?;
            config
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(username) = non_empty(ENV_USERNAME).or_else(|| non_empty(ENV_USER_EMAIL)) {
            self.credentials.username = Some(username);
        }
        if let Some(password) = non_empty(ENV_PASSWORD).or_else(|| non_empty(ENV_USER_PASSWORD)) {
            self.credentials.password = Some(password);
        }
        if let Some(url) = non_empty(ENV_API_URL) {
            self.api.base_url = url;
        }
    }
}
