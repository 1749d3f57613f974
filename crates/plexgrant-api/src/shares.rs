// Share management endpoints
//
// CRUD on shared-server records under `/api/servers/{owner}/shared_servers`.
// A shared-server record is the remote object granting one user access to a
// subset (or all) of one owner's libraries. The endpoint has no in-place
// mutation for the permission flags: they are only accepted at creation
// time, which is why the core layer destroys and recreates records to change
// them. Flags travel as the strings "0"/"1" on create; reads return booleans.

use serde::{Deserialize, Serialize};
use secrecy::SecretString;
use tracing::debug;

use crate::client::PlexTvClient;
use crate::error::Error;

// ── Models ───────────────────────────────────────────────────────────

/// One shared-server record from the list endpoint.
///
/// `#[serde(default)]` liberally: plex.tv omits fields depending on whether
/// the share is accepted, pending, or owner-managed.
#[derive(Debug, Clone, Deserialize)]
pub struct SharedServer {
    pub id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub invited_email: Option<String>,
    #[serde(default)]
    pub all_libraries: bool,
    #[serde(default)]
    pub library_section_ids: Vec<i64>,
    #[serde(default)]
    pub sharing_settings: SharingSettings,
}

/// Capability flags attached to a share record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SharingSettings {
    #[serde(default)]
    pub allow_sync: bool,
    #[serde(default)]
    pub allow_camera_upload: bool,
    #[serde(default)]
    pub allow_channels: bool,
}

#[derive(Debug, Deserialize)]
struct SharedServersEnvelope {
    #[serde(default)]
    shared_servers: Vec<SharedServer>,
}

/// Body for creating a shared-server record.
///
/// Creation must state every flag explicitly -- the endpoint has no
/// "unchanged" concept -- and wants them as "0"/"1" strings.
#[derive(Debug, Clone)]
pub struct CreateShareRequest {
    pub invited_email: String,
    pub library_section_ids: Vec<i64>,
    pub allow_sync: bool,
    pub allow_camera_upload: bool,
    pub allow_channels: bool,
}

impl Serialize for CreateShareRequest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        fn flag(b: bool) -> &'static str {
            if b { "1" } else { "0" }
        }

        #[derive(Serialize)]
        struct SharedServerBody<'a> {
            invited_email: &'a str,
            library_section_ids: &'a [i64],
        }
        #[derive(Serialize)]
        struct SettingsBody {
            allow_sync: &'static str,
            allow_camera_upload: &'static str,
            allow_channels: &'static str,
        }
        #[derive(Serialize)]
        struct Body<'a> {
            shared_server: SharedServerBody<'a>,
            sharing_settings: SettingsBody,
        }

        Body {
            shared_server: SharedServerBody {
                invited_email: &self.invited_email,
                library_section_ids: &self.library_section_ids,
            },
            sharing_settings: SettingsBody {
                allow_sync: flag(self.allow_sync),
                allow_camera_upload: flag(self.allow_camera_upload),
                allow_channels: flag(self.allow_channels),
            },
        }
        .serialize(serializer)
    }
}

// ── Endpoints ────────────────────────────────────────────────────────

impl PlexTvClient {
    /// List every shared-server record for one collection owner.
    ///
    /// `GET /api/servers/{owner}/shared_servers`
    pub async fn list_shared_servers(
        &self,
        owner_id: &str,
        token: &SecretString,
    ) -> Result<Vec<SharedServer>, Error> {
        let url = self.url(&format!("api/servers/{owner_id}/shared_servers"))?;
        debug!(owner_id, "listing shared servers");
        let envelope: SharedServersEnvelope = self.get_json(url, token).await?;
        Ok(envelope.shared_servers)
    }

    /// Replace the library set of an existing share record.
    ///
    /// `PUT /api/servers/{owner}/shared_servers/{share_id}` with
    /// `{"shared_server": {"library_section_ids": [...]}}`. Idempotent:
    /// sending the current set is a no-op on the remote side.
    pub async fn update_shared_libraries(
        &self,
        owner_id: &str,
        share_id: i64,
        section_ids: &[i64],
        token: &SecretString,
    ) -> Result<(), Error> {
        let url = self.url(&format!("api/servers/{owner_id}/shared_servers/{share_id}"))?;
        debug!(owner_id, share_id, count = section_ids.len(), "updating shared libraries");
        self.put_json(
            url,
            token,
            &serde_json::json!({
                "shared_server": { "library_section_ids": section_ids },
            }),
        )
        .await
    }

    /// Delete a share record. This revokes the user's access entirely.
    ///
    /// `DELETE /api/servers/{owner}/shared_servers/{share_id}`
    pub async fn delete_shared_server(
        &self,
        owner_id: &str,
        share_id: i64,
        token: &SecretString,
    ) -> Result<(), Error> {
        let url = self.url(&format!("api/servers/{owner_id}/shared_servers/{share_id}"))?;
        debug!(owner_id, share_id, "deleting shared server");
        self.delete(url, token).await
    }

    /// Create a share record (also the invite operation for first contact).
    ///
    /// `POST /api/servers/{owner}/shared_servers`
    pub async fn create_shared_server(
        &self,
        owner_id: &str,
        request: &CreateShareRequest,
        token: &SecretString,
    ) -> Result<SharedServer, Error> {
        let url = self.url(&format!("api/servers/{owner_id}/shared_servers"))?;
        debug!(
            owner_id,
            invited_email = %request.invited_email,
            count = request.library_section_ids.len(),
            "creating shared server"
        );
        self.post_json(url, token, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_encodes_flags_as_strings() {
        let req = CreateShareRequest {
            invited_email: "friend@example.com".into(),
            library_section_ids: vec![101, 102],
            allow_sync: true,
            allow_camera_upload: false,
            allow_channels: false,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["sharing_settings"]["allow_sync"], "1");
        assert_eq!(v["sharing_settings"]["allow_camera_upload"], "0");
        assert_eq!(v["shared_server"]["library_section_ids"][1], 102);
        assert_eq!(v["shared_server"]["invited_email"], "friend@example.com");
    }
}
