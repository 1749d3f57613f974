//! Service configuration for plexgrant.
//!
//! TOML file + `PLEXGRANT_*` environment layering via figment. The service
//! holds no credentials of its own -- every request carries the caller's
//! token -- so configuration is limited to listen address, upstream base URL,
//! timeout, and the client metadata plex.tv wants on every call.

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Config structs ──────────────────────────────────────────────────

/// Top-level service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Listen address for the HTTP shell.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// plex.tv base URL. Overridable for tests and relays.
    #[serde(default = "default_upstream")]
    pub upstream_url: String,

    /// Per-remote-call timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Client metadata sent with every upstream call.
    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    #[serde(default = "default_product")]
    pub product: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default = "default_client_identifier")]
    pub client_identifier: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            upstream_url: default_upstream(),
            timeout_secs: default_timeout(),
            client: ClientConfig::default(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            product: default_product(),
            version: default_version(),
            client_identifier: default_client_identifier(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:5005".into()
}
fn default_upstream() -> String {
    "https://plex.tv".into()
}
fn default_timeout() -> u64 {
    15
}
fn default_product() -> String {
    "plexgrant".into()
}
fn default_version() -> String {
    env!("CARGO_PKG_VERSION").into()
}
fn default_client_identifier() -> String {
    "plexgrant-service".into()
}

impl Config {
    /// Load configuration: defaults, then an optional TOML file, then
    /// `PLEXGRANT_*` environment variables (nested keys split on `__`).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        let config: Config = figment
            .merge(Env::prefixed("PLEXGRANT_").split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Validation {
                field: "listen".into(),
                reason: format!("not a socket address: {:?}", self.listen),
            });
        }
        if Url::parse(&self.upstream_url).is_err() {
            return Err(ConfigError::Validation {
                field: "upstream_url".into(),
                reason: format!("not a URL: {:?}", self.upstream_url),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation {
                field: "timeout_secs".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// The upstream base URL, parsed. `load` validates the URL, so this only
    /// fails for a hand-built `Config`.
    pub fn upstream(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.upstream_url).map_err(|e| ConfigError::Validation {
            field: "upstream_url".into(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.listen, "0.0.0.0:5005");
        assert_eq!(config.upstream_url, "https://plex.tv");
        assert_eq!(config.timeout_secs, 15);
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "listen = \"127.0.0.1:9000\"\ntimeout_secs = 5\n\n[client]\nproduct = \"custom\"\n"
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.listen, "127.0.0.1:9000");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.client.product, "custom");
        // Untouched keys keep their defaults.
        assert_eq!(config.upstream_url, "https://plex.tv");
    }

    #[test]
    fn rejects_bad_listen_address() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "listen = \"not-an-address\"").unwrap();

        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "listen"));
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "timeout_secs = 0").unwrap();

        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation { ref field, .. } if field == "timeout_secs")
        );
    }
}
