//! E2E tests for account resolution
//!
//! Covers the routing contract between the local store path and the
//! WebFinger/actor-fetch path, using real HTTP instances as remote peers.

mod common;

use common::{RemoteInstance, TestApp};
use muster::data::IdentityStore;
use muster::error::AppError;
use muster::service::IdentifierKind;

#[tokio::test]
async fn local_identifier_resolves_from_store() {
    let app = TestApp::new().await;
    app.seed_local_actor("alice", None).await;

    let view = app
        .state
        .account_service()
        .resolve_account(&app.domain, "alice", IdentifierKind::Canonical)
        .await
        .unwrap();

    assert_eq!(view.acct, "alice");
    assert_eq!(view.username, "alice");
    assert_eq!(view.display_name, "The alice");
    assert_eq!(view.id.len(), 26); // opaque ULID, not the actor URL
    assert_eq!(view.url, "https://test.example.com/users/alice");
}

#[tokio::test]
async fn own_domain_identifier_never_queries_webfinger() {
    let app = TestApp::new().await;
    app.seed_local_actor("alice", None).await;
    let instance = RemoteInstance::start().await;

    // The explicit domain matches the request domain, so resolution must stay
    // on the local path. test.example.com is unroutable from here: any
    // WebFinger attempt would fail the resolution.
    let view = app
        .state
        .account_service()
        .resolve_account(
            &app.domain,
            "alice@Test.Example.Com",
            IdentifierKind::Canonical,
        )
        .await
        .unwrap();

    assert_eq!(view.acct, "alice");
    assert_eq!(instance.webfinger_hits(), 0);
}

#[tokio::test]
async fn missing_local_account_is_not_found() {
    let app = TestApp::new().await;

    let error = app
        .state
        .account_service()
        .resolve_account(&app.domain, "nobody", IdentifierKind::Canonical)
        .await
        .unwrap_err();

    assert!(matches!(error, AppError::NotFound));
}

#[tokio::test]
async fn remote_identifier_resolves_via_webfinger() {
    let app = TestApp::new().await;
    let instance = RemoteInstance::start().await;
    instance.add_user("bob");
    instance.set_display_name("bob", "Bob");

    let acct = instance.acct("bob");
    let view = app
        .state
        .account_service()
        .resolve_account(&app.domain, &acct, IdentifierKind::Canonical)
        .await
        .unwrap();

    assert_eq!(view.acct, acct);
    assert_eq!(view.id, acct);
    assert_eq!(view.username, "bob");
    assert_eq!(view.display_name, "Bob");
    assert_eq!(instance.webfinger_hits(), 1);
    assert_eq!(instance.actor_fetches("bob"), 1);
}

#[tokio::test]
async fn remote_actor_url_identifier_resolves() {
    let app = TestApp::new().await;
    let instance = RemoteInstance::start().await;
    let actor_url = instance.add_user("bob");

    let view = app
        .state
        .account_service()
        .resolve_account(&app.domain, &actor_url, IdentifierKind::Canonical)
        .await
        .unwrap();

    assert_eq!(view.acct, instance.acct("bob"));
    // The URL form still routes through discovery, not a blind fetch
    assert_eq!(instance.webfinger_hits(), 1);
}

#[tokio::test]
async fn webfinger_without_links_is_not_found_without_actor_fetch() {
    let app = TestApp::new().await;
    let instance = RemoteInstance::start().await;
    instance.add_user("bob");
    instance.hide_webfinger_links("bob");

    let error = app
        .state
        .account_service()
        .resolve_account(&app.domain, &instance.acct("bob"), IdentifierKind::Canonical)
        .await
        .unwrap_err();

    assert!(matches!(error, AppError::NotFound));
    assert_eq!(instance.webfinger_hits(), 1);
    assert_eq!(instance.actor_fetches("bob"), 0);
}

#[tokio::test]
async fn unknown_remote_account_is_not_found() {
    let app = TestApp::new().await;
    let instance = RemoteInstance::start().await;

    let error = app
        .state
        .account_service()
        .resolve_account(&app.domain, &instance.acct("ghost"), IdentifierKind::Canonical)
        .await
        .unwrap_err();

    assert!(matches!(error, AppError::NotFound));
}

#[tokio::test]
async fn repeated_remote_resolution_fetches_actor_once() {
    let app = TestApp::new().await;
    let instance = RemoteInstance::start().await;
    instance.add_user("bob");

    let service = app.state.account_service();
    let acct = instance.acct("bob");

    service
        .resolve_account(&app.domain, &acct, IdentifierKind::Canonical)
        .await
        .unwrap();
    service
        .resolve_account(&app.domain, &acct, IdentifierKind::Canonical)
        .await
        .unwrap();

    // Within the cache TTL the second resolution reuses the cached actor.
    assert_eq!(instance.actor_fetches("bob"), 1);
}

#[tokio::test]
async fn opaque_id_translates_to_local_account() {
    let app = TestApp::new().await;
    let actor = app.seed_local_actor("alice", None).await;

    let opaque_id = app
        .state
        .db
        .opaque_id_for_actor(&actor.id)
        .await
        .unwrap()
        .unwrap();

    let view = app
        .state
        .account_service()
        .resolve_account(&app.domain, &opaque_id, IdentifierKind::Opaque)
        .await
        .unwrap();

    assert_eq!(view.acct, "alice");
    assert_eq!(view.id, opaque_id);

    let error = app
        .state
        .account_service()
        .resolve_account(&app.domain, "01UNKNOWNULIDVALUE0000000X", IdentifierKind::Opaque)
        .await
        .unwrap_err();
    assert!(matches!(error, AppError::NotFound));
}

#[tokio::test]
async fn email_resolves_to_local_account() {
    let app = TestApp::new().await;
    app.seed_local_actor("alice", Some("alice@corp.example")).await;

    let view = app
        .state
        .account_service()
        .resolve_account_by_email(&app.domain, "alice@corp.example")
        .await
        .unwrap();

    assert_eq!(view.acct, "alice");
}

#[tokio::test]
async fn unmapped_email_is_not_found() {
    let app = TestApp::new().await;

    let error = app
        .state
        .account_service()
        .resolve_account_by_email(&app.domain, "nobody@example.com")
        .await
        .unwrap_err();

    assert!(matches!(error, AppError::NotFound));
}

#[tokio::test]
async fn unparsable_identifier_is_not_found() {
    let app = TestApp::new().await;

    let error = app
        .state
        .account_service()
        .resolve_account(&app.domain, "a@b@c", IdentifierKind::Canonical)
        .await
        .unwrap_err();

    assert!(matches!(error, AppError::NotFound));
}
