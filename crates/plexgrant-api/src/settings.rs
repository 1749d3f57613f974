// User settings endpoints
//
// `GET|POST /api/v2/user/settings` stores per-user settings as a flat list
// of entries. Unlike the other endpoints, this one takes the credential and
// the client metadata as query parameters, not headers. The `experience`
// entry's value is itself a JSON document serialized into a string
// (double-encoded); this module moves the inner string verbatim and leaves
// decoding it to the core layer, so the re-serialization stays symmetric.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::client::PlexTvClient;
use crate::error::Error;

/// The settings entry holding the UI preference blob.
pub const EXPERIENCE_SETTING_ID: &str = "experience";

/// One entry from the user settings list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub value: String,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Deserialize)]
struct SettingsEnvelope {
    #[serde(default)]
    value: Vec<SettingEntry>,
}

impl PlexTvClient {
    fn settings_url(&self, token: &SecretString) -> Result<Url, Error> {
        let mut url = self.url("api/v2/user/settings")?;
        let meta = self.metadata();
        url.query_pairs_mut()
            .append_pair("X-Plex-Product", &meta.product)
            .append_pair("X-Plex-Version", &meta.version)
            .append_pair("X-Plex-Client-Identifier", &meta.client_identifier)
            .append_pair("X-Plex-Token", token.expose_secret());
        Ok(url)
    }

    /// Fetch the full settings list for the token's user.
    ///
    /// `GET /api/v2/user/settings`
    pub async fn user_settings(&self, token: &SecretString) -> Result<Vec<SettingEntry>, Error> {
        let url = self.settings_url(token)?;
        debug!("fetching user settings");
        let envelope: SettingsEnvelope = self.get_json(url, token).await?;
        Ok(envelope.value)
    }

    /// Fetch the raw `experience` setting value (the inner JSON string).
    ///
    /// Returns `None` when the user has never had the setting written.
    pub async fn experience_setting(&self, token: &SecretString) -> Result<Option<String>, Error> {
        let entries = self.user_settings(token).await?;
        Ok(entries
            .into_iter()
            .find(|e| e.id == EXPERIENCE_SETTING_ID)
            .map(|e| e.value))
    }

    /// Write the `experience` setting back, value passed verbatim.
    ///
    /// `POST /api/v2/user/settings`
    pub async fn store_experience_setting(
        &self,
        token: &SecretString,
        value: &str,
    ) -> Result<(), Error> {
        let url = self.settings_url(token)?;
        debug!(bytes = value.len(), "storing experience setting");
        let entry = SettingEntry {
            id: EXPERIENCE_SETTING_ID.into(),
            entry_type: "text".into(),
            value: value.to_owned(),
            hidden: false,
        };
        let _: serde_json::Value = self.post_json(url, token, &entry).await?;
        Ok(())
    }
}
