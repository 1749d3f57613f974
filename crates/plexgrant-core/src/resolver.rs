// ── Identifier resolution ──
//
// plex.tv's two interfaces disagree about how a library is named: the owner's
// server speaks section keys, the share endpoint speaks plex.tv numeric ids,
// and human-facing requests sometimes arrive with titles. `SectionMap` is one
// fetch of the owner's inventory followed by pure lookups, so every caller
// works with `LibraryIdentity` and never branches on identifier space.

use std::collections::HashMap;

use secrecy::SecretString;
use tracing::debug;

use plexgrant_api::LegacyClient;

use crate::error::CoreError;
use crate::model::{LibraryIdentity, RequestedLibraries};

/// The resolved library inventory of one collection owner.
///
/// Pure after construction: lookups perform no I/O and the map is discarded
/// when the request completes.
#[derive(Debug)]
pub struct SectionMap {
    sections: Vec<LibraryIdentity>,
    by_key: HashMap<String, usize>,
    by_id: HashMap<String, usize>,
    by_title: HashMap<String, usize>,
}

impl SectionMap {
    pub fn new(sections: Vec<LibraryIdentity>) -> Self {
        let mut by_key = HashMap::new();
        let mut by_id = HashMap::new();
        let mut by_title = HashMap::new();
        for (idx, s) in sections.iter().enumerate() {
            by_key.insert(s.key.clone(), idx);
            by_id.insert(s.numeric_id.to_string(), idx);
            // Titles are unique in practice but not guaranteed; first one
            // wins, keeping the title join best-effort.
            by_title.entry(s.title.to_lowercase()).or_insert(idx);
        }
        Self {
            sections,
            by_key,
            by_id,
            by_title,
        }
    }

    /// Fetch the owner's inventory from the legacy endpoint.
    ///
    /// One remote read. Unreachable owners and malformed bodies surface as
    /// distinct errors (`Unavailable` vs `MalformedResponse`).
    pub async fn fetch(
        legacy: &LegacyClient,
        owner_id: &str,
        token: &SecretString,
    ) -> Result<Self, CoreError> {
        let records = legacy.server_sections(owner_id, token).await?;
        debug!(owner_id, count = records.len(), "resolved section inventory");
        Ok(Self::new(records.into_iter().map(Into::into).collect()))
    }

    /// Every library known to the owner, in remote listing order.
    pub fn all(&self) -> &[LibraryIdentity] {
        &self.sections
    }

    /// Look up one identifier.
    ///
    /// Keys first: they are the owner-local primary space. Numeric ids next,
    /// string-coerced, because the share endpoint hands those out. Titles
    /// last, case-insensitively, as the best-effort join key.
    pub fn lookup(&self, identifier: &str) -> Option<&LibraryIdentity> {
        self.by_key
            .get(identifier)
            .or_else(|| self.by_id.get(identifier))
            .or_else(|| self.by_title.get(&identifier.to_lowercase()))
            .map(|&idx| &self.sections[idx])
    }

    /// Resolve a request's library selection into concrete identities.
    ///
    /// The all-sentinel resolves to a snapshot of every current library. Any
    /// unknown identifier fails the whole request, naming the identifier --
    /// unknown entries are never silently dropped.
    pub fn resolve_requested(
        &self,
        requested: &RequestedLibraries,
    ) -> Result<Vec<LibraryIdentity>, CoreError> {
        match requested {
            RequestedLibraries::All => Ok(self.sections.clone()),
            RequestedLibraries::Ids(ids) => ids
                .iter()
                .map(|id| {
                    self.lookup(id).cloned().ok_or_else(|| CoreError::UnknownLibrary {
                        identifier: id.clone(),
                    })
                })
                .collect(),
        }
    }

    /// Whether an explicit id set covers every current library.
    ///
    /// Used for display only: unrestricted access and a full explicit set
    /// read the same in reports, but writes keep them distinct.
    pub fn covers_all(&self, ids: &std::collections::BTreeSet<i64>) -> bool {
        self.sections.len() == ids.len()
            && self.sections.iter().all(|s| ids.contains(&s.numeric_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LibraryKind;

    fn map() -> SectionMap {
        SectionMap::new(vec![
            LibraryIdentity {
                key: "1".into(),
                numeric_id: 101,
                title: "Movies".into(),
                kind: LibraryKind::Movie,
            },
            LibraryIdentity {
                key: "2".into(),
                numeric_id: 102,
                title: "TV Shows".into(),
                kind: LibraryKind::Show,
            },
            LibraryIdentity {
                key: "5".into(),
                numeric_id: 103,
                title: "Music".into(),
                kind: LibraryKind::Artist,
            },
        ])
    }

    #[test]
    fn all_sentinel_resolves_to_every_library() {
        let resolved = map().resolve_requested(&RequestedLibraries::All).unwrap();
        assert_eq!(resolved.len(), 3);
    }

    #[test]
    fn key_space_wins_over_numeric_id_space() {
        // "2" is both a key (TV Shows) and no numeric id; "102" is only a
        // numeric id. Key lookup must be tried first.
        let m = map();
        assert_eq!(m.lookup("2").unwrap().title, "TV Shows");
        assert_eq!(m.lookup("102").unwrap().title, "TV Shows");
    }

    #[test]
    fn title_is_the_last_resort_join_key() {
        let m = map();
        assert_eq!(m.lookup("music").unwrap().numeric_id, 103);
        assert_eq!(m.lookup("TV SHOWS").unwrap().key, "2");
    }

    #[test]
    fn unknown_identifier_fails_naming_it() {
        let err = map()
            .resolve_requested(&RequestedLibraries::Ids(vec!["1".into(), "99".into()]))
            .unwrap_err();
        match err {
            CoreError::UnknownLibrary { identifier } => assert_eq!(identifier, "99"),
            other => panic!("expected UnknownLibrary, got {other:?}"),
        }
    }

    #[test]
    fn resolution_preserves_request_order() {
        let resolved = map()
            .resolve_requested(&RequestedLibraries::Ids(vec!["5".into(), "1".into()]))
            .unwrap();
        assert_eq!(resolved[0].title, "Music");
        assert_eq!(resolved[1].title, "Movies");
    }

    #[test]
    fn covers_all_requires_exact_cover() {
        let m = map();
        let full: std::collections::BTreeSet<i64> = [101, 102, 103].into();
        let partial: std::collections::BTreeSet<i64> = [101, 102].into();
        assert!(m.covers_all(&full));
        assert!(!m.covers_all(&partial));
    }
}
