// Account and resource endpoints
//
// Credential validation, collection-owner discovery, and managed-account
// provisioning.

use secrecy::SecretString;
use serde::Deserialize;
use tracing::debug;

use crate::client::PlexTvClient;
use crate::error::Error;

/// The authenticated principal, from `GET /users/account.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub id: i64,
    #[serde(default)]
    pub uuid: Option<String>,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountEnvelope {
    user: Account,
}

/// One resource descriptor from `GET /api/v2/resources`.
///
/// A collection owner is a resource whose `provides` includes "server".
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    pub name: String,
    pub client_identifier: String,
    #[serde(default)]
    pub provides: String,
    #[serde(default)]
    pub owned: bool,
    #[serde(default)]
    pub presence: bool,
}

impl ResourceDescriptor {
    pub fn is_server(&self) -> bool {
        self.provides.split(',').any(|p| p == "server")
    }
}

/// A managed (home) account, from `POST /api/v2/home/users`.
#[derive(Debug, Clone, Deserialize)]
pub struct HomeUser {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl PlexTvClient {
    /// Validate a credential and return its principal.
    ///
    /// `GET /users/account.json`
    pub async fn account(&self, token: &SecretString) -> Result<Account, Error> {
        let url = self.url("users/account.json")?;
        debug!("fetching account");
        let envelope: AccountEnvelope = self.get_json(url, token).await?;
        Ok(envelope.user)
    }

    /// List the resources visible to the principal.
    ///
    /// `GET /api/v2/resources`
    pub async fn resources(&self, token: &SecretString) -> Result<Vec<ResourceDescriptor>, Error> {
        let url = self.url("api/v2/resources")?;
        debug!("listing resources");
        self.get_json(url, token).await
    }

    /// Find one server resource by its machine identifier.
    ///
    /// Returns `None` when the owner is not among the principal's resources,
    /// which callers report as "collection owner unreachable".
    pub async fn find_server(
        &self,
        owner_id: &str,
        token: &SecretString,
    ) -> Result<Option<ResourceDescriptor>, Error> {
        let resources = self.resources(token).await?;
        Ok(resources
            .into_iter()
            .find(|r| r.is_server() && r.client_identifier == owner_id))
    }

    /// Provision a managed (home) account for an email address.
    ///
    /// `POST /api/v2/home/users`
    pub async fn create_home_user(
        &self,
        email: &str,
        token: &SecretString,
    ) -> Result<HomeUser, Error> {
        let url = self.url("api/v2/home/users")?;
        debug!(email, "creating home user");
        self.post_json(url, token, &serde_json::json!({ "email": email }))
            .await
    }
}
