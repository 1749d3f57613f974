// ── Share reconciliation ──
//
// Moves one user's remote share state to a desired state with the minimal
// set of remote operations, under the constraints the share endpoint
// imposes: the library set can be replaced in place, but the permission
// flags are only accepted at creation time, so a flag change means
// destroying and recreating the share record.
//
// Ordering contract: the library-set update must be observed to succeed
// before any delete/recreate is attempted. That bounds a partial failure to
// "libraries unchanged, permissions unchanged". A failure *between* delete
// and recreate leaves the user unshared and is surfaced loudly as its own
// variant -- never folded into a generic error. Nothing here retries:
// delete/recreate is not idempotent, so retries are the caller's call.

use std::time::Duration;

use secrecy::SecretString;
use tracing::{debug, error, info, warn};

use plexgrant_api::shares::CreateShareRequest;
use plexgrant_api::{LegacyClient, PlexTvClient};

use crate::error::CoreError;
use crate::model::{
    DesiredState, InviteOutcome, LibraryIdentity, ReconciliationResult, ShareState,
    SharedLibraries, UserRef,
};
use crate::resolver::SectionMap;

/// Fixed wait before polling an invitee's pending-invitation queue. The
/// queue is populated asynchronously on the remote side; this is the only
/// suspension point outside network I/O, and it is never repeated.
const INVITE_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// First-contact invite parameters.
#[derive(Debug)]
pub struct InviteRequest {
    pub email: String,
    /// The invitee's own credential, when the caller holds it. Enables the
    /// bounded best-effort auto-accept step.
    pub invitee_token: Option<SecretString>,
    /// Provision a managed (home) account before sharing.
    pub create_local_account: bool,
}

/// A user's current grant, read fresh for reporting.
#[derive(Debug)]
pub struct CurrentGrant {
    pub state: ShareState,
    /// True for the unrestricted sentinel *and* for an explicit set covering
    /// every current library -- the two read the same in reports.
    pub unrestricted: bool,
    pub libraries: Vec<LibraryIdentity>,
}

/// The reconciliation engine. Owns the API clients; holds no per-request
/// state -- every call re-reads the remote service fresh.
pub struct AccessReconciler {
    legacy: LegacyClient,
    plextv: PlexTvClient,
}

impl AccessReconciler {
    pub fn new(legacy: LegacyClient, plextv: PlexTvClient) -> Self {
        Self { legacy, plextv }
    }

    /// The underlying plex.tv JSON client (for callers that need the
    /// settings or account surfaces alongside reconciliation).
    pub fn plextv(&self) -> &PlexTvClient {
        &self.plextv
    }

    // ── Lookups ──────────────────────────────────────────────────────

    /// Fetch the owner's section inventory.
    pub async fn section_map(
        &self,
        owner_id: &str,
        token: &SecretString,
    ) -> Result<SectionMap, CoreError> {
        SectionMap::fetch(&self.legacy, owner_id, token).await
    }

    /// Locate one user's current share record for an owner.
    async fn find_share(
        &self,
        owner_id: &str,
        user: &UserRef,
        token: &SecretString,
    ) -> Result<ShareState, CoreError> {
        let shares = self.plextv.list_shared_servers(owner_id, token).await?;
        shares
            .iter()
            .find(|s| user.matches(s))
            .map(ShareState::from)
            .ok_or_else(|| CoreError::UserNotShared {
                user: user.to_string(),
                owner: owner_id.to_owned(),
            })
    }

    /// Read a user's current grant for reporting.
    pub async fn current_grant(
        &self,
        owner_id: &str,
        user: &UserRef,
        token: &SecretString,
    ) -> Result<CurrentGrant, CoreError> {
        let state = self.find_share(owner_id, user, token).await?;
        let map = self.section_map(owner_id, token).await?;
        let (unrestricted, libraries) = match &state.sections {
            SharedLibraries::All => (true, map.all().to_vec()),
            SharedLibraries::Ids(ids) => (
                map.covers_all(ids),
                map.all()
                    .iter()
                    .filter(|s| ids.contains(&s.numeric_id))
                    .cloned()
                    .collect(),
            ),
        };
        Ok(CurrentGrant {
            state,
            unrestricted,
            libraries,
        })
    }

    // ── Reconcile ────────────────────────────────────────────────────

    /// Reconcile an existing share to the desired state.
    ///
    /// Fails with `UserNotShared` when the user has no relationship with
    /// this owner: updating only works against an existing share record
    /// (first contact is [`create_or_invite`](Self::create_or_invite)).
    pub async fn reconcile(
        &self,
        owner_id: &str,
        user: &UserRef,
        desired: &DesiredState,
        token: &SecretString,
    ) -> Result<ReconciliationResult, CoreError> {
        let current = self.find_share(owner_id, user, token).await?;
        let map = self.section_map(owner_id, token).await?;
        let selected = map.resolve_requested(&desired.libraries)?;
        let section_ids: Vec<i64> = selected.iter().map(|s| s.numeric_id).collect();

        let permissions_changed = desired.permissions_changed(&current);
        debug!(
            owner_id,
            user = %user,
            share_id = current.record_id,
            count = section_ids.len(),
            permissions_changed,
            "reconciling share"
        );

        // The library-set update always goes first, even when the set is
        // unchanged (it is idempotent remotely). It must fully succeed
        // before any destructive step.
        self.plextv
            .update_shared_libraries(owner_id, current.record_id, &section_ids, token)
            .await
            .map_err(|e| CoreError::LibraryUpdateFailed {
                user: user.to_string(),
                owner: owner_id.to_owned(),
                message: CoreError::from(e).to_string(),
            })?;

        if permissions_changed {
            self.recreate_share(owner_id, user, &current, &section_ids, desired, token)
                .await?;
        }

        info!(
            owner_id,
            user = %user,
            libraries_shared = section_ids.len(),
            permissions_changed,
            "share reconciled"
        );
        Ok(ReconciliationResult {
            libraries_shared: section_ids.len(),
            permissions_changed,
        })
    }

    /// Destroy-and-recreate path for permission-flag changes.
    ///
    /// All flags are resolved to concrete values *before* the delete, so the
    /// recreate never consults remote state after the destructive step.
    async fn recreate_share(
        &self,
        owner_id: &str,
        user: &UserRef,
        current: &ShareState,
        section_ids: &[i64],
        desired: &DesiredState,
        token: &SecretString,
    ) -> Result<(), CoreError> {
        let (allow_sync, allow_camera_upload, allow_channels) = desired.resolved_flags(current);
        let email = match (&current.email, user) {
            (Some(email), _) => email.clone(),
            (None, UserRef::Email(email)) => email.clone(),
            (None, UserRef::Id(_)) => {
                // Without an email the recreated invite has no addressee;
                // bail before deleting anything.
                return Err(CoreError::Rejected {
                    message: format!(
                        "share record {} has no email to recreate against",
                        current.record_id
                    ),
                });
            }
        };

        self.plextv
            .delete_shared_server(owner_id, current.record_id, token)
            .await
            .map_err(CoreError::from)?;

        let request = CreateShareRequest {
            invited_email: email,
            library_section_ids: section_ids.to_vec(),
            allow_sync,
            allow_camera_upload,
            allow_channels,
        };
        if let Err(e) = self
            .plextv
            .create_shared_server(owner_id, &request, token)
            .await
        {
            let message = CoreError::from(e).to_string();
            error!(
                owner_id,
                user = %user,
                deleted_share_id = current.record_id,
                section_ids = ?section_ids,
                allow_sync,
                allow_camera_upload,
                allow_channels,
                %message,
                "share deleted but recreation failed; user is left unshared"
            );
            return Err(CoreError::ShareRecreationFailed {
                user: user.to_string(),
                owner: owner_id.to_owned(),
                message,
            });
        }
        Ok(())
    }

    // ── First contact ────────────────────────────────────────────────

    /// Invite a user (or provision a managed account) with an initial grant.
    ///
    /// Never deletes anything -- there is nothing to delete on first
    /// contact. The auto-accept step is bounded and best-effort: one fixed
    /// delay, one queue read, one accept attempt; its failure downgrades the
    /// outcome but not the success of the invite itself.
    pub async fn create_or_invite(
        &self,
        owner_id: &str,
        invite: &InviteRequest,
        desired: &DesiredState,
        token: &SecretString,
    ) -> Result<InviteOutcome, CoreError> {
        let map = self.section_map(owner_id, token).await?;
        let selected = map.resolve_requested(&desired.libraries)?;
        let section_ids: Vec<i64> = selected.iter().map(|s| s.numeric_id).collect();
        let (allow_sync, allow_camera_upload, allow_channels) = desired.flags_or_default();

        if invite.create_local_account {
            let home = self.plextv.create_home_user(&invite.email, token).await?;
            debug!(owner_id, home_user_id = home.id, "provisioned managed account");
        }

        let request = CreateShareRequest {
            invited_email: invite.email.clone(),
            library_section_ids: section_ids.clone(),
            allow_sync,
            allow_camera_upload,
            allow_channels,
        };
        self.plextv
            .create_shared_server(owner_id, &request, token)
            .await?;
        info!(
            owner_id,
            email = %invite.email,
            libraries_shared = section_ids.len(),
            "invite created"
        );

        let auto_accepted = match &invite.invitee_token {
            None => None,
            Some(invitee_token) => Some(self.try_accept(owner_id, invitee_token).await),
        };

        Ok(InviteOutcome {
            libraries_shared: section_ids.len(),
            auto_accepted,
        })
    }

    /// Single best-effort accept of the pending invitation this owner just
    /// created. Returns whether it was accepted; never errors.
    async fn try_accept(&self, owner_id: &str, invitee_token: &SecretString) -> bool {
        tokio::time::sleep(INVITE_SETTLE_DELAY).await;

        let pending = match self.plextv.pending_invites(invitee_token).await {
            Ok(pending) => pending,
            Err(e) => {
                warn!(owner_id, error = %e, "could not read pending invites; leaving invite unaccepted");
                return false;
            }
        };
        let Some(invite) = pending
            .iter()
            .find(|p| p.machine_identifier.as_deref() == Some(owner_id))
            .or_else(|| pending.first())
        else {
            warn!(owner_id, "no pending invite found; leaving invite unaccepted");
            return false;
        };

        match self.plextv.accept_invite(invite.id, invitee_token).await {
            Ok(()) => {
                debug!(owner_id, invite_id = invite.id, "invite auto-accepted");
                true
            }
            Err(e) => {
                warn!(owner_id, invite_id = invite.id, error = %e, "invite accept failed; leaving invite pending");
                false
            }
        }
    }
}
