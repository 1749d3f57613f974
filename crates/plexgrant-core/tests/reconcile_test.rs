// End-to-end reconciliation tests against a mocked plex.tv.
//
// The call-count assertions (`expect(n)`, verified on MockServer drop) are
// the point: they pin down the ordering and partial-failure contract --
// which remote operations run, how many times, and which are skipped.

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use plexgrant_api::transport::TransportConfig;
use plexgrant_api::{LegacyClient, PlexTvClient};
use plexgrant_core::{
    AccessReconciler, CoreError, DesiredState, InviteRequest, RequestedLibraries, UserRef,
};

// ── Helpers ─────────────────────────────────────────────────────────

const OWNER: &str = "abc123";
const SHARE_ID: i64 = 555;

async fn setup() -> (MockServer, AccessReconciler, SecretString) {
    let server = MockServer::start().await;
    let base = Url::parse(&server.uri()).unwrap();
    let transport = TransportConfig::default();
    let legacy = LegacyClient::new(base.clone(), &transport).unwrap();
    let plextv = PlexTvClient::new(base, &transport).unwrap();
    (
        server,
        AccessReconciler::new(legacy, plextv),
        SecretString::from("t0ken"),
    )
}

/// Mount the section inventory: Movies (101/key 1), TV Shows (102/key 2),
/// Music (103/key 5).
async fn mount_sections(server: &MockServer) {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<MediaContainer size="1">
  <Server name="atlas" machineIdentifier="abc123">
    <Section id="101" key="1" type="movie" title="Movies"/>
    <Section id="102" key="2" type="show" title="TV Shows"/>
    <Section id="103" key="5" type="artist" title="Music"/>
  </Server>
</MediaContainer>"#;
    Mock::given(method("GET"))
        .and(path(format!("/api/servers/{OWNER}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(xml))
        .mount(server)
        .await;
}

/// Mount one existing share for friend@example.com with the given sections
/// and flags.
async fn mount_share(server: &MockServer, section_ids: &[i64], flags: (bool, bool, bool)) {
    let body = json!({
        "shared_servers": [{
            "id": SHARE_ID,
            "user_id": 42,
            "username": "friend",
            "email": "friend@example.com",
            "all_libraries": false,
            "library_section_ids": section_ids,
            "sharing_settings": {
                "allow_sync": flags.0,
                "allow_camera_upload": flags.1,
                "allow_channels": flags.2
            }
        }]
    });
    Mock::given(method("GET"))
        .and(path(format!("/api/servers/{OWNER}/shared_servers")))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(server)
        .await;
}

fn desired(libraries: RequestedLibraries, flags: (Option<bool>, Option<bool>, Option<bool>)) -> DesiredState {
    DesiredState {
        libraries,
        allow_sync: flags.0,
        allow_camera_upload: flags.1,
        allow_channels: flags.2,
    }
}

fn user() -> UserRef {
    UserRef::Email("friend@example.com".into())
}

// ── Reconcile: library set only ─────────────────────────────────────

#[tokio::test]
async fn null_flags_never_destroy_and_recreate() {
    let (server, reconciler, token) = setup().await;
    mount_sections(&server).await;
    mount_share(&server, &[101], (false, false, false)).await;

    Mock::given(method("PUT"))
        .and(path(format!("/api/servers/{OWNER}/shared_servers/{SHARE_ID}")))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("/api/servers/{OWNER}/shared_servers/{SHARE_ID}")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/api/servers/{OWNER}/shared_servers")))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let want = desired(RequestedLibraries::Ids(vec!["1".into()]), (None, None, None));

    // Same desired state twice: same result, still no destroy/recreate.
    let first = reconciler.reconcile(OWNER, &user(), &want, &token).await.unwrap();
    let second = reconciler.reconcile(OWNER, &user(), &want, &token).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.libraries_shared, 1);
    assert!(!first.permissions_changed);
}

#[tokio::test]
async fn empty_selection_grants_every_library() {
    let (server, reconciler, token) = setup().await;
    mount_sections(&server).await;
    // Currently a strict subset, flags already all false.
    mount_share(&server, &[101], (false, false, false)).await;

    Mock::given(method("PUT"))
        .and(path(format!("/api/servers/{OWNER}/shared_servers/{SHARE_ID}")))
        .and(body_partial_json(json!({
            "shared_server": { "library_section_ids": [101, 102, 103] }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("/api/servers/{OWNER}/shared_servers/{SHARE_ID}")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let want = desired(
        RequestedLibraries::from_str_input(""),
        (Some(false), Some(false), Some(false)),
    );
    let result = reconciler.reconcile(OWNER, &user(), &want, &token).await.unwrap();

    assert_eq!(result.libraries_shared, 3);
    assert!(!result.permissions_changed);
}

// ── Reconcile: flag changes ─────────────────────────────────────────

#[tokio::test]
async fn flag_change_triggers_exactly_one_delete_and_one_create() {
    let (server, reconciler, token) = setup().await;
    mount_sections(&server).await;
    mount_share(&server, &[101, 102], (false, true, false)).await;

    Mock::given(method("PUT"))
        .and(path(format!("/api/servers/{OWNER}/shared_servers/{SHARE_ID}")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("/api/servers/{OWNER}/shared_servers/{SHARE_ID}")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    // Recreation restates every flag: the changed one, plus the nulls
    // resolved from current state (camera upload stays true).
    Mock::given(method("POST"))
        .and(path(format!("/api/servers/{OWNER}/shared_servers")))
        .and(body_partial_json(json!({
            "shared_server": {
                "invited_email": "friend@example.com",
                "library_section_ids": [101, 102]
            },
            "sharing_settings": {
                "allow_sync": "1",
                "allow_camera_upload": "1",
                "allow_channels": "0"
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 900 })))
        .expect(1)
        .mount(&server)
        .await;

    let want = desired(
        RequestedLibraries::Ids(vec!["1".into(), "2".into()]),
        (Some(true), None, None),
    );
    let result = reconciler.reconcile(OWNER, &user(), &want, &token).await.unwrap();

    assert_eq!(result.libraries_shared, 2);
    assert!(result.permissions_changed);
}

#[tokio::test]
async fn library_update_failure_blocks_the_destructive_step() {
    let (server, reconciler, token) = setup().await;
    mount_sections(&server).await;
    mount_share(&server, &[101], (false, false, false)).await;

    Mock::given(method("PUT"))
        .and(path(format!("/api/servers/{OWNER}/shared_servers/{SHARE_ID}")))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("/api/servers/{OWNER}/shared_servers/{SHARE_ID}")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/api/servers/{OWNER}/shared_servers")))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    // Flag change requested, but the update step fails first.
    let want = desired(RequestedLibraries::All, (Some(true), None, None));
    let err = reconciler.reconcile(OWNER, &user(), &want, &token).await.unwrap_err();

    assert!(
        matches!(err, CoreError::LibraryUpdateFailed { .. }),
        "expected LibraryUpdateFailed, got {err:?}"
    );
}

#[tokio::test]
async fn failed_recreate_surfaces_as_destructive_partial_failure() {
    let (server, reconciler, token) = setup().await;
    mount_sections(&server).await;
    mount_share(&server, &[101], (false, false, false)).await;

    Mock::given(method("PUT"))
        .and(path(format!("/api/servers/{OWNER}/shared_servers/{SHARE_ID}")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("/api/servers/{OWNER}/shared_servers/{SHARE_ID}")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/api/servers/{OWNER}/shared_servers")))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(1)
        .mount(&server)
        .await;

    let want = desired(RequestedLibraries::All, (Some(true), None, None));
    let err = reconciler.reconcile(OWNER, &user(), &want, &token).await.unwrap_err();

    match err {
        CoreError::ShareRecreationFailed { user, owner, .. } => {
            assert_eq!(user, "friend@example.com");
            assert_eq!(owner, OWNER);
        }
        other => panic!("expected ShareRecreationFailed, got {other:?}"),
    }
}

// ── Preconditions ───────────────────────────────────────────────────

#[tokio::test]
async fn unshared_user_is_a_precondition_failure() {
    let (server, reconciler, token) = setup().await;
    mount_sections(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("/api/servers/{OWNER}/shared_servers")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "shared_servers": [] })))
        .mount(&server)
        .await;

    let want = desired(RequestedLibraries::All, (None, None, None));
    let err = reconciler.reconcile(OWNER, &user(), &want, &token).await.unwrap_err();

    assert!(matches!(err, CoreError::UserNotShared { .. }));
}

#[tokio::test]
async fn unknown_identifier_fails_before_any_write() {
    let (server, reconciler, token) = setup().await;
    mount_sections(&server).await;
    mount_share(&server, &[101], (false, false, false)).await;

    Mock::given(method("PUT"))
        .and(path(format!("/api/servers/{OWNER}/shared_servers/{SHARE_ID}")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let want = desired(RequestedLibraries::Ids(vec!["99".into()]), (None, None, None));
    let err = reconciler.reconcile(OWNER, &user(), &want, &token).await.unwrap_err();

    match err {
        CoreError::UnknownLibrary { identifier } => assert_eq!(identifier, "99"),
        other => panic!("expected UnknownLibrary, got {other:?}"),
    }
}

// ── Current grant ───────────────────────────────────────────────────

#[tokio::test]
async fn explicit_full_set_reads_as_unrestricted() {
    let (server, reconciler, token) = setup().await;
    mount_sections(&server).await;
    mount_share(&server, &[101, 102, 103], (false, false, false)).await;

    let grant = reconciler.current_grant(OWNER, &user(), &token).await.unwrap();
    assert!(grant.unrestricted);
    assert_eq!(grant.libraries.len(), 3);
}

#[tokio::test]
async fn strict_subset_reads_as_restricted() {
    let (server, reconciler, token) = setup().await;
    mount_sections(&server).await;
    mount_share(&server, &[102], (false, false, false)).await;

    let grant = reconciler.current_grant(OWNER, &user(), &token).await.unwrap();
    assert!(!grant.unrestricted);
    assert_eq!(grant.libraries.len(), 1);
    assert_eq!(grant.libraries[0].title, "TV Shows");
}

// ── First contact ───────────────────────────────────────────────────

#[tokio::test]
async fn invite_without_invitee_credential_skips_auto_accept() {
    let (server, reconciler, token) = setup().await;
    mount_sections(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("/api/servers/{OWNER}/shared_servers")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 900 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/invites/requested"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let invite = InviteRequest {
        email: "friend@example.com".into(),
        invitee_token: None,
        create_local_account: false,
    };
    let want = desired(RequestedLibraries::All, (None, None, None));
    let outcome = reconciler
        .create_or_invite(OWNER, &invite, &want, &token)
        .await
        .unwrap();

    assert_eq!(outcome.libraries_shared, 3);
    assert_eq!(outcome.auto_accepted, None);
}

#[tokio::test]
async fn failed_auto_accept_downgrades_but_does_not_fail() {
    let (server, reconciler, token) = setup().await;
    mount_sections(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("/api/servers/{OWNER}/shared_servers")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 900 })))
        .expect(1)
        .mount(&server)
        .await;
    // Invitee queue read fails; the invite itself must still succeed.
    Mock::given(method("GET"))
        .and(path("/api/invites/requested"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let invite = InviteRequest {
        email: "friend@example.com".into(),
        invitee_token: Some(SecretString::from("invitee-t0ken")),
        create_local_account: false,
    };
    let want = desired(RequestedLibraries::All, (None, None, None));
    let outcome = reconciler
        .create_or_invite(OWNER, &invite, &want, &token)
        .await
        .unwrap();

    assert_eq!(outcome.auto_accepted, Some(false));
}

#[tokio::test]
async fn auto_accept_targets_the_owners_invite() {
    let (server, reconciler, token) = setup().await;
    mount_sections(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("/api/servers/{OWNER}/shared_servers")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 900 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/invites/requested"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "invites": [
                { "id": 6, "machine_identifier": "other-server" },
                { "id": 7, "machine_identifier": OWNER }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/invites/requested/7"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let invite = InviteRequest {
        email: "friend@example.com".into(),
        invitee_token: Some(SecretString::from("invitee-t0ken")),
        create_local_account: false,
    };
    let want = desired(RequestedLibraries::All, (None, None, None));
    let outcome = reconciler
        .create_or_invite(OWNER, &invite, &want, &token)
        .await
        .unwrap();

    assert_eq!(outcome.auto_accepted, Some(true));
}
