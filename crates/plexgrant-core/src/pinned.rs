// ── Pinned-sources merge ──
//
// The UI preference blob holds, among unrelated settings, the user's ordered
// sidebar pins. The merge replaces the entries belonging to one collection
// owner, leaves everything else in the blob untouched (including fields this
// crate does not understand), and guarantees the two system defaults are
// present exactly once. Pure in-memory transform: the read-then-write round
// trip is the caller's responsibility and is not atomic, so the merge is
// written to be a function of one fresh read -- a lost race costs a pin
// update, never blob corruption.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::LibraryKind;

/// Provider segment of library pin keys.
pub const LIBRARY_PROVIDER: &str = "com.plexapp.plugins.library";

/// The synthetic owner of the Discover and Watchlist system defaults.
pub const DISCOVER_PROVIDER: &str = "tv.plex.provider.discover";

const DISCOVER_KEY: &str = "source--discover--tv.plex.provider.discover";
const WATCHLIST_KEY: &str = "source--watchlist--tv.plex.provider.discover--watchlist";

// ── Blob ─────────────────────────────────────────────────────────────

/// The user's UI preference blob.
///
/// Owner-agnostic and mostly opaque: only the pin sequence and the
/// setup-completion flag are modeled, everything else rides through the
/// flattened catch-all untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferenceBlob {
    #[serde(default, rename = "pinnedSources")]
    pub pinned_sources: Vec<PinnedSource>,
    #[serde(default, rename = "setupComplete")]
    pub setup_complete: bool,
    /// Catch-all for unrelated settings.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One sidebar pin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinnedSource {
    /// Deterministic composite identity; the de-duplication key.
    pub key: String,
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(rename = "machineIdentifier")]
    pub machine_identifier: String,
    #[serde(default, rename = "sourceTitle", skip_serializing_if = "Option::is_none")]
    pub source_title: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub owned: bool,
    #[serde(default, rename = "hiddenAt", skip_serializing_if = "Option::is_none")]
    pub hidden_at: Option<DateTime<Utc>>,
    /// Catch-all for per-entry fields this crate does not understand.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PreferenceBlob {
    /// Parse the double-encoded `experience` setting value.
    pub fn from_setting(value: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(value)
    }

    /// Serialize back to the form the settings endpoint stores.
    pub fn to_setting(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Replace this owner's pins with `candidates` and ensure the system
    /// defaults, leaving every other entry and field untouched.
    ///
    /// Idempotent: applying the same candidates twice yields the same
    /// sequence, with no duplicate keys.
    pub fn merge_pinned(
        &mut self,
        owner_id: &str,
        friendly_name: &str,
        candidates: &[PinCandidate],
    ) {
        // Entries belonging to other owners (and the provider defaults,
        // whose machine identifier is never a server's) survive in their
        // existing order; this owner's are discarded and rebuilt.
        self.pinned_sources
            .retain(|p| p.machine_identifier != owner_id);

        // Fixed sidebar ordering: video sources first (movies, then shows,
        // each by ascending numeric id), music last. This is an observable
        // contract of the resulting sidebar, not an implementation artifact.
        let mut ordered: Vec<&PinCandidate> = candidates
            .iter()
            // Other kinds are not pinnable; no sidebar source type exists.
            .filter(|c| c.kind != LibraryKind::Other)
            .collect();
        ordered.sort_by_key(|c| (kind_rank(c.kind), c.sort_key()));

        for c in ordered {
            self.pinned_sources
                .push(c.to_source(owner_id, friendly_name));
        }

        for default in [discover_default(), watchlist_default()] {
            if !self.pinned_sources.iter().any(|p| p.key == default.key) {
                self.pinned_sources.push(default);
            }
        }

        self.setup_complete = true;
    }
}

fn kind_rank(kind: LibraryKind) -> u8 {
    match kind {
        LibraryKind::Movie => 0,
        LibraryKind::Show => 1,
        LibraryKind::Artist => 2,
        LibraryKind::Other => 3,
    }
}

// ── Candidates ───────────────────────────────────────────────────────

/// One library to pin, as named by the request.
#[derive(Debug, Clone, Deserialize)]
pub struct PinCandidate {
    pub id: String,
    pub name: String,
    pub kind: LibraryKind,
}

impl PinCandidate {
    /// Numeric ids sort ascending; non-numeric ids sort after all numeric
    /// ones, lexically among themselves, so the order is total.
    fn sort_key(&self) -> (i64, String) {
        match self.id.parse::<i64>() {
            Ok(n) => (n, String::new()),
            Err(_) => (i64::MAX, self.id.clone()),
        }
    }

    fn source_type(&self) -> &'static str {
        match self.kind {
            LibraryKind::Movie => "movies",
            LibraryKind::Show => "tv",
            LibraryKind::Artist => "music",
            LibraryKind::Other => "",
        }
    }

    fn to_source(&self, owner_id: &str, friendly_name: &str) -> PinnedSource {
        let source_type = self.source_type();
        PinnedSource {
            key: format!(
                "source--{source_type}--{owner_id}--{LIBRARY_PROVIDER}--{id}",
                id = self.id
            ),
            source_type: source_type.into(),
            machine_identifier: owner_id.into(),
            source_title: Some(friendly_name.into()),
            title: self.name.clone(),
            owned: false,
            hidden_at: None,
            extra: serde_json::Map::new(),
        }
    }
}

// ── System defaults ──────────────────────────────────────────────────

fn discover_default() -> PinnedSource {
    PinnedSource {
        key: DISCOVER_KEY.into(),
        source_type: "discover".into(),
        machine_identifier: DISCOVER_PROVIDER.into(),
        source_title: None,
        title: "Discover".into(),
        owned: false,
        hidden_at: None,
        extra: serde_json::Map::new(),
    }
}

fn watchlist_default() -> PinnedSource {
    PinnedSource {
        key: WATCHLIST_KEY.into(),
        source_type: "watchlist".into(),
        machine_identifier: DISCOVER_PROVIDER.into(),
        source_title: None,
        title: "Watchlist".into(),
        owned: false,
        hidden_at: None,
        extra: serde_json::Map::new(),
    }
}
