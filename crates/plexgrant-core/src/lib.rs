// plexgrant-core: Access reconciliation engine for delegated Plex library sharing

pub mod error;
pub mod model;
pub mod pinned;
pub mod reconciler;
pub mod resolver;

// ── Primary re-exports ──────────────────────────────────────────────
pub use error::CoreError;
pub use model::{
    DesiredState, InviteOutcome, LibrariesInput, LibraryIdentity, LibraryKind,
    ReconciliationResult, RequestedLibraries, ShareState, SharedLibraries, UserRef,
};
pub use pinned::{PinCandidate, PinnedSource, PreferenceBlob};
pub use reconciler::{AccessReconciler, CurrentGrant, InviteRequest};
pub use resolver::SectionMap;
