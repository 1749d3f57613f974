// Pending-invitation endpoints (invitee side)
//
// After a share is created for a user who has never accepted one from this
// owner, a pending invitation sits in *their* queue. These endpoints let the
// service accept it on the invitee's behalf when it holds their credential.

use secrecy::SecretString;
use serde::Deserialize;
use tracing::debug;

use crate::client::PlexTvClient;
use crate::error::Error;

/// One pending invitation from `GET /api/invites/requested`.
#[derive(Debug, Clone, Deserialize)]
pub struct PendingInvite {
    pub id: i64,
    #[serde(default)]
    pub machine_identifier: Option<String>,
    #[serde(default)]
    pub owner_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InvitesEnvelope {
    #[serde(default)]
    invites: Vec<PendingInvite>,
}

impl PlexTvClient {
    /// List the token's own pending invitations.
    ///
    /// `GET /api/invites/requested`
    pub async fn pending_invites(&self, token: &SecretString) -> Result<Vec<PendingInvite>, Error> {
        let url = self.url("api/invites/requested")?;
        debug!("listing pending invites");
        let envelope: InvitesEnvelope = self.get_json(url, token).await?;
        Ok(envelope.invites)
    }

    /// Accept one pending invitation.
    ///
    /// `PUT /api/invites/requested/{id}`
    pub async fn accept_invite(&self, invite_id: i64, token: &SecretString) -> Result<(), Error> {
        let url = self.url(&format!("api/invites/requested/{invite_id}"))?;
        debug!(invite_id, "accepting invite");
        self.put_json(url, token, &serde_json::json!({})).await
    }
}
