// ── Domain model ──
//
// Plain types for the reconciliation engine. Everything here is fetched
// fresh per request from plex.tv and discarded afterwards; nothing is
// cached or persisted.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use plexgrant_api::legacy::SectionRecord;
use plexgrant_api::shares::SharedServer;

// ── Libraries ────────────────────────────────────────────────────────

/// What a library holds, from the section's `type` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryKind {
    Movie,
    Show,
    Artist,
    Other,
}

impl LibraryKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "movie" => Self::Movie,
            "show" => Self::Show,
            "artist" => Self::Artist,
            _ => Self::Other,
        }
    }
}

/// One library of one collection owner, unified across both remote
/// identifier spaces.
///
/// `key` is the owner-server section key; `numeric_id` is the plex.tv-side
/// id the share endpoint wants. Callers never branch on which space a remote
/// response used -- resolution happens once, here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryIdentity {
    pub key: String,
    pub numeric_id: i64,
    pub title: String,
    pub kind: LibraryKind,
}

impl From<SectionRecord> for LibraryIdentity {
    fn from(s: SectionRecord) -> Self {
        Self {
            kind: LibraryKind::parse(&s.kind),
            key: s.key,
            numeric_id: s.id,
            title: s.title,
        }
    }
}

// ── Requested libraries ──────────────────────────────────────────────

/// The library selection of an incoming request.
///
/// An empty, null, or empty-list input is the "all libraries" sentinel and
/// resolves to every library the owner currently has -- it is not "zero
/// matches".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestedLibraries {
    All,
    Ids(Vec<String>),
}

impl RequestedLibraries {
    /// Normalize a comma-separated string ("1, 5,12") into identifiers.
    pub fn from_str_input(input: &str) -> Self {
        let ids: Vec<String> = input
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        if ids.is_empty() { Self::All } else { Self::Ids(ids) }
    }

    /// Normalize a list input, trimming entries and dropping empties.
    pub fn from_list(input: Vec<String>) -> Self {
        let ids: Vec<String> = input
            .into_iter()
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
        if ids.is_empty() { Self::All } else { Self::Ids(ids) }
    }

    /// Normalize whichever input shape the request carried.
    pub fn from_request(input: Option<LibrariesInput>) -> Self {
        match input {
            None => Self::All,
            Some(LibrariesInput::Csv(s)) => Self::from_str_input(&s),
            Some(LibrariesInput::List(v)) => Self::from_list(v),
        }
    }
}

/// The two wire shapes a request may use for its library selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LibrariesInput {
    Csv(String),
    List(Vec<String>),
}

// ── Share state ──────────────────────────────────────────────────────

/// The libraries a share currently grants.
///
/// `All` is the unrestricted sentinel ("every library, including ones added
/// later") and is distinct from an explicit set that happens to cover every
/// current library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharedLibraries {
    All,
    Ids(BTreeSet<i64>),
}

/// One user's current remote share state for one collection owner.
#[derive(Debug, Clone)]
pub struct ShareState {
    pub record_id: i64,
    pub sections: SharedLibraries,
    pub allow_sync: bool,
    pub allow_camera_upload: bool,
    pub allow_channels: bool,
    pub email: Option<String>,
}

impl From<&SharedServer> for ShareState {
    fn from(s: &SharedServer) -> Self {
        let sections = if s.all_libraries {
            SharedLibraries::All
        } else {
            SharedLibraries::Ids(s.library_section_ids.iter().copied().collect())
        };
        Self {
            record_id: s.id,
            sections,
            allow_sync: s.sharing_settings.allow_sync,
            allow_camera_upload: s.sharing_settings.allow_camera_upload,
            allow_channels: s.sharing_settings.allow_channels,
            email: s.email.clone().or_else(|| s.invited_email.clone()),
        }
    }
}

// ── Desired state ────────────────────────────────────────────────────

/// The target state of a reconciliation request.
///
/// `None` flags mean "leave unchanged"; they are carried through and do not
/// count toward the changed-permissions comparison.
#[derive(Debug, Clone)]
pub struct DesiredState {
    pub libraries: RequestedLibraries,
    pub allow_sync: Option<bool>,
    pub allow_camera_upload: Option<bool>,
    pub allow_channels: Option<bool>,
}

impl DesiredState {
    /// Whether any stated flag differs from the current share state.
    pub fn permissions_changed(&self, current: &ShareState) -> bool {
        fn differs(desired: Option<bool>, current: bool) -> bool {
            desired.is_some_and(|d| d != current)
        }
        differs(self.allow_sync, current.allow_sync)
            || differs(self.allow_camera_upload, current.allow_camera_upload)
            || differs(self.allow_channels, current.allow_channels)
    }

    /// Resolve every flag to a concrete value, nulls falling back to the
    /// current state. Recreation has no "unchanged" concept, so this runs
    /// before any destructive step.
    pub fn resolved_flags(&self, current: &ShareState) -> (bool, bool, bool) {
        (
            self.allow_sync.unwrap_or(current.allow_sync),
            self.allow_camera_upload.unwrap_or(current.allow_camera_upload),
            self.allow_channels.unwrap_or(current.allow_channels),
        )
    }

    /// Flags for first contact, where there is no current state: nulls
    /// default to the most restrictive setting.
    pub fn flags_or_default(&self) -> (bool, bool, bool) {
        (
            self.allow_sync.unwrap_or(false),
            self.allow_camera_upload.unwrap_or(false),
            self.allow_channels.unwrap_or(false),
        )
    }
}

// ── User reference ───────────────────────────────────────────────────

/// How a request names the target user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    Id(i64),
    Email(String),
}

impl UserRef {
    /// Match against a share record. Emails compare case-insensitively and
    /// match either the accepted or the still-invited address.
    pub fn matches(&self, share: &SharedServer) -> bool {
        match self {
            Self::Id(id) => share.user_id == Some(*id),
            Self::Email(email) => {
                let wanted = email.to_lowercase();
                share
                    .email
                    .as_deref()
                    .is_some_and(|e| e.to_lowercase() == wanted)
                    || share
                        .invited_email
                        .as_deref()
                        .is_some_and(|e| e.to_lowercase() == wanted)
            }
        }
    }
}

impl std::fmt::Display for UserRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Email(email) => f.write_str(email),
        }
    }
}

// ── Results ──────────────────────────────────────────────────────────

/// Outcome of a reconcile call, for caller-side reporting. Callers needing
/// the new share state must re-read it -- nothing is cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    pub libraries_shared: usize,
    pub permissions_changed: bool,
}

/// Outcome of a first-contact invite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InviteOutcome {
    pub libraries_shared: usize,
    /// `None` when auto-accept was not attempted (no invitee credential);
    /// `Some(false)` when attempted and downgraded, never a failure.
    pub auto_accepted: Option<bool>,
}
