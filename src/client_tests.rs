use super::*;
use crate::frontend::{FrontendEvent, Page, RecordingFrontend};
use crate::identity::{Credential, CredentialStore, Role};
use crate::test_support::{harness, ScriptedTransport};
use serde_json::json;

fn logged_in() -> Credential { Credential::new("abc123xyz9", Some(Role::Renter), json!({"role": "renter"})) }

#[tokio::test]
async fn attaches_stored_token() {
    let h = harness();
    h.store.set(&logged_in()).unwrap();
    h.transport.reply(200, json!([{"id": 1}]));

    let out = h.client.send(ApiRequest::get("cameras")).await.unwrap();
    assert_eq!(out, Outcome::Data(json!([{"id": 1}])));

    let seen = h.transport.seen();
    assert_eq!(seen[0].url.as_str(), "https://api.test/api/cameras");
    assert_eq!(seen[0].header("authorization"), Some("Bearer abc123xyz9"));
    assert_eq!(seen[0].header("accept"), Some("application/json"));
}

#[tokio::test]
async fn sends_unauthenticated_without_token() {
    let h = harness();
    h.transport.reply(200, json!({"ok": true}));
    h.client.send(ApiRequest::get("/cameras")).await.unwrap();
    assert_eq!(h.transport.seen()[0].header("Authorization"), None);
}

#[tokio::test]
async fn unauthorized_clears_store_and_short_circuits() {
    let h = harness();
    h.store.set(&logged_in()).unwrap();
    h.transport.reply(401, json!({"message": "Unauthenticated."}));

    let out = h.client.send(ApiRequest::get("rentals")).await.unwrap();
    assert!(out.is_handled());
    assert!(h.store.get().is_none());
    assert_eq!(h.transport.seen().len(), 1, "401 must not be retried");
    assert_eq!(h.frontend.events(), vec![
        FrontendEvent::Notice(Notice::session_expired()),
        FrontendEvent::Navigate(Page::login()),
    ]);
}

/// Store whose credential cannot be removed, like a read-only session file.
struct StuckStore(Credential);

impl CredentialStore for StuckStore {
    fn get(&self) -> Option<Credential> { Some(self.0.clone()) }
    fn set(&self, _: &Credential) -> crate::error::ApiResult<()> { Ok(()) }
    fn clear(&self) -> crate::error::ApiResult<()> { Err(ApiError::store("permission denied")) }
}

#[tokio::test]
async fn unauthorized_with_uncleared_store_is_an_error() {
    let transport = ScriptedTransport::new();
    transport.reply(401, json!({"message": "Unauthenticated."}));
    let frontend = Arc::new(RecordingFrontend::new());
    let client = AuthClient::new(
        Url::parse("https://api.test/api").unwrap(),
        transport.clone(),
        Arc::new(StuckStore(logged_in())),
        frontend.clone(),
    );

    let err = client.send(ApiRequest::get("rentals")).await.unwrap_err();
    assert_eq!(err.code_str(), "store");
    assert_eq!(frontend.navigations(), vec![Page::login()]);
    assert_eq!(transport.seen().len(), 1);
}

#[tokio::test]
async fn other_http_errors_keep_credentials() {
    let h = harness();
    h.store.set(&logged_in()).unwrap();
    h.transport.reply(422, json!({"message": "The model field is required."}));

    let err = h.client.send(ApiRequest::post("cameras")).await.unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert_eq!(h.store.get(), Some(logged_in()));
    assert_eq!(h.frontend.errors(), vec!["The model field is required.".to_string()]);
    assert!(h.frontend.navigations().is_empty());
}

#[tokio::test]
async fn network_errors_keep_credentials() {
    let h = harness();
    h.store.set(&logged_in()).unwrap();
    h.transport.fail("connection refused");

    let err = h.client.send(ApiRequest::get("profile")).await.unwrap_err();
    assert!(matches!(err, ApiError::Transport { .. }));
    assert_eq!(h.store.get(), Some(logged_in()));
    assert_eq!(h.frontend.errors(), vec!["connection refused".to_string()]);
}

#[tokio::test]
async fn non_json_error_body_is_kept_as_text() {
    let h = harness();
    h.transport.reply_text(502, "<html>Bad Gateway</html>");
    let err = h.client.send(ApiRequest::get("users")).await.unwrap_err();
    match err {
        ApiError::Http { status, body, .. } => {
            assert_eq!(status, 502);
            assert_eq!(body, json!("<html>Bad Gateway</html>"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn empty_success_is_null_and_garbage_is_malformed() {
    let h = harness();
    h.transport.reply_text(204, "");
    h.transport.reply_text(200, "not json");
    assert_eq!(h.client.send(ApiRequest::delete("cameras/3")).await.unwrap(), Outcome::Data(Value::Null));
    let err = h.client.send(ApiRequest::get("cameras")).await.unwrap_err();
    assert_eq!(err.code_str(), "malformed");
}

#[tokio::test]
async fn public_calls_never_touch_the_session() {
    let h = harness();
    h.store.set(&logged_in()).unwrap();
    h.transport.reply(401, json!({"message": "Invalid credentials"}));

    let err = h.client.send_public(ApiRequest::post("login").json(json!({"username": "a"}))).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(h.transport.seen()[0].header("Authorization"), None);
    assert_eq!(h.store.get(), Some(logged_in()));
    assert_eq!(h.frontend.errors(), vec!["Invalid credentials".to_string()]);
}

#[tokio::test]
async fn absolute_urls_are_used_verbatim() {
    let h = harness();
    h.transport.reply(200, json!({}));
    h.client.send(ApiRequest::get("https://other.test/x")).await.unwrap();
    assert_eq!(h.transport.seen()[0].url.as_str(), "https://other.test/x");
}

#[tokio::test]
async fn call_decodes_typed_payloads() {
    #[derive(serde::Deserialize, Debug, PartialEq)]
    struct Stats { cameras: u32 }
    let h = harness();
    h.transport.reply(200, json!({"cameras": 4}));
    let out: Outcome<Stats> = h.client.call(ApiRequest::get("dashboard")).await.unwrap();
    assert_eq!(out, Outcome::Data(Stats { cameras: 4 }));
}
