//! # Sync Configuration
//!
//! Configuration for the catalog sync layer.
//!
//! ## Configuration Sources
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                      Configuration Priority                        │
//! │                                                                    │
//! │  1. Environment Variables (highest priority)                       │
//! │     SHELF_API_BASE=http://inventory.local:8080                     │
//! │     SHELF_WS_URL=wss://inventory.local/ws                          │
//! │                                                                    │
//! │  2. TOML Config File                                               │
//! │     ~/.config/shelfsync/sync.toml (Linux)                          │
//! │                                                                    │
//! │  3. Default Values (lowest priority)                               │
//! │     http://localhost:8080, channel URL derived from API base       │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Push Endpoint Resolution
//! The explicit channel URL override wins when set. Otherwise the URL is
//! derived from the API base by swapping the scheme to its streaming
//! equivalent (`http`→`ws`, `https`→`wss`) and appending `/ws`. The
//! result is resolved once; reconnect attempts reuse it.
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [api]
//! base_url = "http://localhost:8080"
//!
//! [channel]
//! # url = "wss://inventory.local/ws"   # optional override
//! reconnect_base_ms = 1500
//! reconnect_jitter_ms = 2000
//! connect_timeout_secs = 10
//!
//! [undo]
//! window_secs = 6
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{SyncError, SyncResult};

// =============================================================================
// API Settings
// =============================================================================

/// CRUD API endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL of the catalog service (scheme + host + port).
    #[serde(default = "default_api_base")]
    pub base_url: String,
}

fn default_api_base() -> String {
    "http://localhost:8080".to_string()
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings { base_url: default_api_base() }
    }
}

// =============================================================================
// Channel Settings
// =============================================================================

/// Push channel settings.
///
/// The reconnect delay is deliberately flat: a fixed base plus a uniform
/// random jitter window, retried indefinitely. An idle retry is cheap
/// and the channel is best-effort, so there is no backoff growth and no
/// retry cap. The jitter spreads reconnect storms across clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSettings {
    /// Explicit channel URL. Takes precedence over derivation when set.
    #[serde(default)]
    pub url: Option<String>,

    /// Fixed component of the reconnect delay (milliseconds).
    #[serde(default = "default_reconnect_base")]
    pub reconnect_base_ms: u64,

    /// Upper bound of the uniform random jitter (milliseconds).
    #[serde(default = "default_reconnect_jitter")]
    pub reconnect_jitter_ms: u64,

    /// Connection handshake timeout (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_reconnect_base() -> u64 {
    1500
}

fn default_reconnect_jitter() -> u64 {
    2000
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for ChannelSettings {
    fn default() -> Self {
        ChannelSettings {
            url: None,
            reconnect_base_ms: default_reconnect_base(),
            reconnect_jitter_ms: default_reconnect_jitter(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

// =============================================================================
// Undo Settings
// =============================================================================

/// Undo buffer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoSettings {
    /// How long a deleted product stays restorable (seconds).
    #[serde(default = "default_undo_window")]
    pub window_secs: u64,
}

fn default_undo_window() -> u64 {
    6
}

impl Default for UndoSettings {
    fn default() -> Self {
        UndoSettings { window_secs: default_undo_window() }
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync layer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// CRUD API settings.
    #[serde(default)]
    pub api: ApiSettings,

    /// Push channel settings.
    #[serde(default)]
    pub channel: ChannelSettings,

    /// Undo buffer settings.
    #[serde(default)]
    pub undo: UndoSettings,
}

impl SyncConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns defaults if loading fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load sync config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        let base = Url::parse(&self.api.base_url)?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(SyncError::InvalidUrl(format!(
                "API base URL must be http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if let Some(ref url) = self.channel.url {
            let parsed = Url::parse(url)?;
            if !matches!(parsed.scheme(), "ws" | "wss") {
                return Err(SyncError::InvalidUrl(format!(
                    "Channel URL must be ws:// or wss://, got: {url}"
                )));
            }
        }

        if self.undo.window_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "undo window_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(base) = std::env::var("SHELF_API_BASE") {
            debug!(base = %base, "Overriding API base from environment");
            self.api.base_url = base;
        }

        if let Ok(url) = std::env::var("SHELF_WS_URL") {
            debug!(url = %url, "Overriding channel URL from environment");
            self.channel.url = Some(url);
        }

        if let Ok(secs) = std::env::var("SHELF_UNDO_WINDOW_SECS") {
            if let Ok(s) = secs.parse::<u64>() {
                self.undo.window_secs = s;
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("io", "shelfsync", "shelfsync")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Full URL of the products resource.
    pub fn products_url(&self) -> SyncResult<Url> {
        let mut url = Url::parse(&self.api.base_url)?;
        push_segments(&mut url, &["api", "products"])?;
        Ok(url)
    }

    /// Resolves the push channel endpoint.
    ///
    /// Explicit override wins; otherwise derived from the API base by
    /// swapping the scheme to its streaming equivalent and appending
    /// `/ws`.
    pub fn channel_url(&self) -> SyncResult<Url> {
        if let Some(ref url) = self.channel.url {
            return Ok(Url::parse(url)?);
        }

        let mut derived = Url::parse(&self.api.base_url)?;
        let scheme = match derived.scheme() {
            "https" => "wss",
            _ => "ws",
        };
        derived
            .set_scheme(scheme)
            .map_err(|_| SyncError::InvalidUrl(format!("Cannot derive channel URL from {}", self.api.base_url)))?;
        push_segments(&mut derived, &["ws"])?;
        Ok(derived)
    }

    /// Reconnect delay base.
    pub fn reconnect_base(&self) -> Duration {
        Duration::from_millis(self.channel.reconnect_base_ms)
    }

    /// Reconnect jitter upper bound.
    pub fn reconnect_jitter(&self) -> Duration {
        Duration::from_millis(self.channel.reconnect_jitter_ms)
    }

    /// Undo window duration.
    pub fn undo_window(&self) -> Duration {
        Duration::from_secs(self.undo.window_secs)
    }
}

/// Appends path segments, keeping any path already on the base
/// (`http://host/app` + `["ws"]` -> `http://host/app/ws`).
fn push_segments(url: &mut Url, segments: &[&str]) -> SyncResult<()> {
    let display = url.as_str().to_string();
    let mut parts = url
        .path_segments_mut()
        .map_err(|_| SyncError::InvalidUrl(format!("URL cannot carry a path: {display}")))?;
    parts.pop_if_empty().extend(segments);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_url_derived_from_http_base() {
        let config = SyncConfig::default();
        assert_eq!(config.channel_url().unwrap().as_str(), "ws://localhost:8080/ws");
    }

    #[test]
    fn channel_url_derived_from_https_base() {
        let mut config = SyncConfig::default();
        config.api.base_url = "https://inventory.example.com".into();
        assert_eq!(
            config.channel_url().unwrap().as_str(),
            "wss://inventory.example.com/ws"
        );
    }

    #[test]
    fn channel_url_override_wins() {
        let mut config = SyncConfig::default();
        config.channel.url = Some("wss://push.example.com/stream".into());
        assert_eq!(
            config.channel_url().unwrap().as_str(),
            "wss://push.example.com/stream"
        );
    }

    #[test]
    fn products_url_appends_api_path() {
        let config = SyncConfig::default();
        assert_eq!(
            config.products_url().unwrap().as_str(),
            "http://localhost:8080/api/products"
        );
    }

    #[test]
    fn derivation_keeps_the_base_path() {
        let mut config = SyncConfig::default();
        config.api.base_url = "http://host:8080/inventory".into();
        assert_eq!(
            config.channel_url().unwrap().as_str(),
            "ws://host:8080/inventory/ws"
        );
        assert_eq!(
            config.products_url().unwrap().as_str(),
            "http://host:8080/inventory/api/products"
        );

        // A trailing slash on the base does not double up.
        config.api.base_url = "http://host:8080/inventory/".into();
        assert_eq!(
            config.channel_url().unwrap().as_str(),
            "ws://host:8080/inventory/ws"
        );
    }

    #[test]
    fn validate_rejects_bad_schemes() {
        let mut config = SyncConfig::default();
        config.api.base_url = "ftp://localhost".into();
        assert!(config.validate().is_err());

        config.api.base_url = default_api_base();
        config.channel.url = Some("http://not-a-socket".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_undo_window() {
        let mut config = SyncConfig::default();
        config.undo.window_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_roundtrip() {
        let config = SyncConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[api]"));
        assert!(toml_str.contains("[channel]"));

        let parsed: SyncConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.channel.reconnect_base_ms, 1500);
        assert_eq!(parsed.undo.window_secs, 6);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let parsed: SyncConfig = toml::from_str("[api]\nbase_url = \"http://host:9000\"\n").unwrap();
        assert_eq!(parsed.api.base_url, "http://host:9000");
        assert_eq!(parsed.channel.reconnect_jitter_ms, 2000);
    }
}
