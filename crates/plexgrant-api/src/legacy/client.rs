// Legacy XML HTTP client
//
// Same transport mechanics as the JSON client, but responses are XML and go
// through the quick-xml parser in `models` instead of serde.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use crate::error::{excerpt, Error};
use crate::legacy::models::{parse_sections, SectionRecord};
use crate::transport::TransportConfig;

/// Raw HTTP client for plex.tv's legacy XML endpoints.
pub struct LegacyClient {
    http: reqwest::Client,
    base_url: Url,
    timeout_secs: u64,
}

impl LegacyClient {
    /// Create a new legacy client from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            timeout_secs: transport.timeout_secs(),
        })
    }

    /// List the sections of one collection owner's server.
    ///
    /// `GET /api/servers/{owner_id}` -- the only endpoint that returns both
    /// the plex.tv numeric section id and the server-side section key for
    /// every library in one response.
    pub async fn server_sections(
        &self,
        owner_id: &str,
        token: &SecretString,
    ) -> Result<Vec<SectionRecord>, Error> {
        let url = self
            .base_url
            .join(&format!("api/servers/{owner_id}"))
            .map_err(Error::InvalidUrl)?;
        debug!(owner_id, "listing server sections");
        let body = self.get_xml(url, token).await?;
        parse_sections(&body)
    }

    /// Send a GET request and return the raw body after status checks.
    async fn get_xml(&self, url: Url, token: &SecretString) -> Result<String, Error> {
        let resp = self
            .http
            .get(url)
            .header("X-Plex-Token", token.expose_secret())
            .send()
            .await
            .map_err(|e| Error::from_send(e, self.timeout_secs))?;

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
}
