// plex.tv JSON HTTP client
//
// Wraps `reqwest::Client` with plex.tv URL construction, per-request token
// injection, and response decoding. All JSON endpoint modules (shares,
// settings, account, invites) are implemented as inherent methods via
// separate files to keep this module focused on transport mechanics.

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::{excerpt, Error};
use crate::transport::{ClientMetadata, TransportConfig};

/// Raw HTTP client for the plex.tv JSON endpoints.
///
/// Holds no credential: every method takes the caller's token, because one
/// process acts on behalf of many principals (the server owner for share
/// management, individual users for settings and invites).
pub struct PlexTvClient {
    http: reqwest::Client,
    base_url: Url,
    metadata: ClientMetadata,
    timeout_secs: u64,
}

impl PlexTvClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` should be the plex.tv root (`https://plex.tv` in
    /// production, a mock server in tests).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            metadata: transport.metadata.clone(),
            timeout_secs: transport.timeout_secs(),
        })
    }

    /// The plex.tv base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn metadata(&self) -> &ClientMetadata {
        &self.metadata
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for a plex.tv path (no leading slash).
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        self.base_url.join(path).map_err(Error::InvalidUrl)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode the JSON response.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        token: &SecretString,
    ) -> Result<T, Error> {
        debug!("GET {}", url.path());
        let resp = self
            .http
            .get(url)
            .header("X-Plex-Token", token.expose_secret())
            .send()
            .await
            .map_err(|e| Error::from_send(e, self.timeout_secs))?;
        self.decode(resp).await
    }

    /// Send a POST request with a JSON body and decode the response.
    pub(crate) async fn post_json<T: DeserializeOwned>(
        &self,
        url: Url,
        token: &SecretString,
        body: &impl Serialize,
    ) -> Result<T, Error> {
        debug!("POST {}", url.path());
        let resp = self
            .http
            .post(url)
            .header("X-Plex-Token", token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| Error::from_send(e, self.timeout_secs))?;
        self.decode(resp).await
    }

    /// Send a PUT request with a JSON body, expecting only a success status.
    pub(crate) async fn put_json(
        &self,
        url: Url,
        token: &SecretString,
        body: &impl Serialize,
    ) -> Result<(), Error> {
        debug!("PUT {}", url.path());
        let resp = self
            .http
            .put(url)
            .header("X-Plex-Token", token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| Error::from_send(e, self.timeout_secs))?;
        self.check_status(resp).await.map(|_| ())
    }

    /// Send a DELETE request, expecting only a success status.
    pub(crate) async fn delete(&self, url: Url, token: &SecretString) -> Result<(), Error> {
        debug!("DELETE {}", url.path());
        let resp = self
            .http
            .delete(url)
            .header("X-Plex-Token", token.expose_secret())
            .send()
            .await
            .map_err(|e| Error::from_send(e, self.timeout_secs))?;
        self.check_status(resp).await.map(|_| ())
    }

    // ── Response decoding ────────────────────────────────────────────

    /// Check the status and return the body text on success.
    ///
    /// 401 maps to `Authentication`, every other non-2xx to `Api` with a
    /// body excerpt. This is the single choke point for status handling --
    /// no endpoint module inspects status codes itself.
    pub(crate) async fn check_status(&self, resp: reqwest::Response) -> Result<String, Error> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::from_send(e, self.timeout_secs))?;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: "token rejected by plex.tv".into(),
            });
        }
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: excerpt(&body),
            });
        }
        Ok(body)
    }

    async fn decode<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T, Error> {
        let body = self.check_status(resp).await?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            excerpt: excerpt(&body),
        })
    }
}
