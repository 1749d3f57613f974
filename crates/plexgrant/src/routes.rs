// HTTP surface of the service.
//
// Thin JSON shell over the reconciliation engine: requests carry the
// caller's credentials (the service stores none), handlers translate wire
// shapes into engine calls, and every response uses the same
// `{success, ...}` envelope. All policy lives in plexgrant-core; nothing
// here inspects remote state directly.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use plexgrant_core::{
    AccessReconciler, CoreError, DesiredState, LibrariesInput, PinCandidate, PreferenceBlob,
    RequestedLibraries, UserRef,
};

#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<AccessReconciler>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/invite", post(invite))
        .route("/v1/libraries", get(current_libraries).post(set_libraries))
        .route("/v1/pins", post(merge_pins))
        .route("/v1/library-details", get(library_details))
        .with_state(state)
}

// ── Error envelope ───────────────────────────────────────────────────

#[derive(Debug)]
struct AppError(CoreError);

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self.0, "request failed");
        }
        let body = json!({ "success": false, "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

fn status_for(err: &CoreError) -> StatusCode {
    match err {
        CoreError::AuthenticationFailed { .. } => StatusCode::UNAUTHORIZED,
        CoreError::UnknownLibrary { .. } | CoreError::Rejected { .. } | CoreError::Config { .. } => {
            StatusCode::BAD_REQUEST
        }
        CoreError::UserNotShared { .. } => StatusCode::NOT_FOUND,
        CoreError::Unavailable { .. } | CoreError::MalformedResponse { .. } => {
            StatusCode::BAD_GATEWAY
        }
        CoreError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        CoreError::Api { .. }
        | CoreError::LibraryUpdateFailed { .. }
        | CoreError::ShareRecreationFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ── Request shapes ───────────────────────────────────────────────────

/// The user named by a request, by plex.tv id or by email. At least one is
/// required; the id wins when both are present.
#[derive(Debug, Deserialize)]
struct UserSelector {
    #[serde(default)]
    user_id: Option<i64>,
    #[serde(default)]
    email: Option<String>,
}

impl UserSelector {
    fn user_ref(&self) -> Result<UserRef, AppError> {
        match (self.user_id, &self.email) {
            (Some(id), _) => Ok(UserRef::Id(id)),
            (None, Some(email)) => Ok(UserRef::Email(email.clone())),
            (None, None) => Err(CoreError::Rejected {
                message: "request names no user (user_id or email required)".into(),
            }
            .into()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct InviteBody {
    owner_id: String,
    email: String,
    token: String,
    #[serde(default)]
    invitee_token: Option<String>,
    #[serde(default)]
    create_local_account: bool,
    #[serde(default)]
    libraries: Option<LibrariesInput>,
    #[serde(default)]
    allow_sync: Option<bool>,
    #[serde(default)]
    allow_camera_upload: Option<bool>,
    #[serde(default)]
    allow_channels: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ReconcileBody {
    owner_id: String,
    token: String,
    #[serde(flatten)]
    user: UserSelector,
    #[serde(default)]
    libraries: Option<LibrariesInput>,
    #[serde(default)]
    allow_sync: Option<bool>,
    #[serde(default)]
    allow_camera_upload: Option<bool>,
    #[serde(default)]
    allow_channels: Option<bool>,
}

/// Query form of the user selector. The fields are inline rather than a
/// flattened `UserSelector`: serde's flatten buffers query values as
/// strings, which rejects a numeric `user_id` in query position.
#[derive(Debug, Deserialize)]
struct GrantQuery {
    owner_id: String,
    token: String,
    #[serde(default)]
    user_id: Option<i64>,
    #[serde(default)]
    email: Option<String>,
}

impl GrantQuery {
    fn user_ref(&self) -> Result<UserRef, AppError> {
        UserSelector {
            user_id: self.user_id,
            email: self.email.clone(),
        }
        .user_ref()
    }
}

#[derive(Debug, Deserialize)]
struct PinsBody {
    owner_id: String,
    friendly_name: String,
    /// The target user's own credential; pins live in their settings.
    token: String,
    #[serde(default)]
    libraries: Vec<PinCandidate>,
}

#[derive(Debug, Deserialize)]
struct DetailsQuery {
    owner_id: String,
    token: String,
    /// Comma-separated identifiers; absent or empty means every library.
    #[serde(default)]
    libraries: Option<String>,
}

// ── Handlers ─────────────────────────────────────────────────────────

async fn invite(
    State(state): State<AppState>,
    Json(body): Json<InviteBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let token = SecretString::from(body.token);
    let reconciler = &state.reconciler;

    // The owner must be among the caller's resources; a typo'd machine
    // identifier fails here instead of as an opaque upstream 404.
    if reconciler
        .plextv()
        .find_server(&body.owner_id, &token)
        .await
        .map_err(CoreError::from)?
        .is_none()
    {
        return Err(CoreError::Unavailable {
            reason: format!("server {} is not among this account's resources", body.owner_id),
        }
        .into());
    }

    let desired = DesiredState {
        libraries: RequestedLibraries::from_request(body.libraries),
        allow_sync: body.allow_sync,
        allow_camera_upload: body.allow_camera_upload,
        allow_channels: body.allow_channels,
    };
    let invite = plexgrant_core::InviteRequest {
        email: body.email,
        invitee_token: body.invitee_token.map(SecretString::from),
        create_local_account: body.create_local_account,
    };

    let outcome = reconciler
        .create_or_invite(&body.owner_id, &invite, &desired, &token)
        .await?;

    let message = match outcome.auto_accepted {
        Some(false) => "invite created; auto-accept did not complete",
        _ => "invite created",
    };
    Ok(Json(json!({
        "success": true,
        "message": message,
        "libraries_shared": outcome.libraries_shared,
        "auto_accepted": outcome.auto_accepted,
    })))
}

async fn current_libraries(
    State(state): State<AppState>,
    Query(query): Query<GrantQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = query.user_ref()?;
    let token = SecretString::from(query.token);

    let grant = state
        .reconciler
        .current_grant(&query.owner_id, &user, &token)
        .await?;

    // Unrestricted access reports as the empty list; callers read "no
    // restriction recorded", not "no libraries".
    let libraries: Vec<_> = if grant.unrestricted {
        vec![]
    } else {
        grant.libraries.iter().map(library_json).collect()
    };
    Ok(Json(json!({
        "success": true,
        "all_libraries": grant.unrestricted,
        "libraries": libraries,
        "allow_sync": grant.state.allow_sync,
        "allow_camera_upload": grant.state.allow_camera_upload,
        "allow_channels": grant.state.allow_channels,
    })))
}

async fn set_libraries(
    State(state): State<AppState>,
    Json(body): Json<ReconcileBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let token = SecretString::from(body.token);
    let user = body.user.user_ref()?;
    let desired = DesiredState {
        libraries: RequestedLibraries::from_request(body.libraries),
        allow_sync: body.allow_sync,
        allow_camera_upload: body.allow_camera_upload,
        allow_channels: body.allow_channels,
    };

    let result = state
        .reconciler
        .reconcile(&body.owner_id, &user, &desired, &token)
        .await?;
    Ok(Json(json!({
        "success": true,
        "libraries_shared": result.libraries_shared,
        "permissions_changed": result.permissions_changed,
    })))
}

async fn merge_pins(
    State(state): State<AppState>,
    Json(body): Json<PinsBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let token = SecretString::from(body.token);
    let plextv = state.reconciler.plextv();

    // Read-merge-write against the user's own settings. A missing setting
    // starts from an empty blob; a blob we cannot parse is surfaced, never
    // overwritten blind.
    let mut blob = match plextv
        .experience_setting(&token)
        .await
        .map_err(CoreError::from)?
    {
        Some(raw) => PreferenceBlob::from_setting(&raw).map_err(|e| CoreError::MalformedResponse {
            message: format!("stored preference blob is not valid JSON: {e}"),
            excerpt: String::new(),
        })?,
        None => PreferenceBlob::default(),
    };

    blob.merge_pinned(&body.owner_id, &body.friendly_name, &body.libraries);

    let serialized = blob.to_setting().map_err(|e| CoreError::Config {
        message: format!("could not serialize preference blob: {e}"),
    })?;
    plextv
        .store_experience_setting(&token, &serialized)
        .await
        .map_err(CoreError::from)?;

    Ok(Json(json!({
        "success": true,
        "pinned": blob.pinned_sources.len(),
    })))
}

async fn library_details(
    State(state): State<AppState>,
    Query(query): Query<DetailsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let token = SecretString::from(query.token);
    let requested = match query.libraries.as_deref() {
        None => RequestedLibraries::All,
        Some(csv) => RequestedLibraries::from_str_input(csv),
    };

    let map = state.reconciler.section_map(&query.owner_id, &token).await?;
    let selected = map.resolve_requested(&requested)?;
    let libraries: Vec<_> = selected.iter().map(library_json).collect();
    Ok(Json(json!({
        "success": true,
        "libraries": libraries,
    })))
}

fn library_json(lib: &plexgrant_core::LibraryIdentity) -> serde_json::Value {
    json!({
        "id": lib.numeric_id,
        "key": lib.key,
        "title": lib.title,
        "kind": lib.kind,
    })
}
