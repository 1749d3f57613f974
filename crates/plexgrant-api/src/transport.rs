// Shared transport configuration for building reqwest::Client instances.
//
// All plex.tv clients (legacy XML, shares, settings, account, invites) share
// timeout and product-header settings through this module, avoiding
// duplicated builder logic. Credentials are applied per request, never baked
// into a client, because one process serves many principals.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};

/// Client metadata plex.tv expects on every request, as headers on most
/// endpoints and as query parameters on the settings endpoint.
#[derive(Debug, Clone)]
pub struct ClientMetadata {
    pub product: String,
    pub version: String,
    pub client_identifier: String,
}

impl Default for ClientMetadata {
    fn default() -> Self {
        Self {
            product: "plexgrant".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            client_identifier: "plexgrant-service".into(),
        }
    }
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub metadata: ClientMetadata,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            metadata: ClientMetadata::default(),
        }
    }
}

impl TransportConfig {
    /// The per-call timeout in whole seconds (used in `Timeout` errors).
    pub fn timeout_secs(&self) -> u64 {
        self.timeout.as_secs()
    }

    /// Build a `reqwest::Client` from this config.
    ///
    /// Injects `Accept: application/json` plus the `X-Plex-*` product
    /// headers. The legacy XML endpoint ignores the Accept header and always
    /// answers XML, so one client serves both surfaces.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            "X-Plex-Product",
            HeaderValue::from_str(&self.metadata.product)
                .unwrap_or_else(|_| HeaderValue::from_static("plexgrant")),
        );
        headers.insert(
            "X-Plex-Version",
            HeaderValue::from_str(&self.metadata.version)
                .unwrap_or_else(|_| HeaderValue::from_static("0")),
        );
        headers.insert(
            "X-Plex-Client-Identifier",
            HeaderValue::from_str(&self.metadata.client_identifier)
                .unwrap_or_else(|_| HeaderValue::from_static("plexgrant-service")),
        );

        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("plexgrant/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(crate::error::Error::Transport)
    }
}
