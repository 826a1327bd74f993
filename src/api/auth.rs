use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::client::{ApiRequest, AuthClient, Outcome};
use crate::error::{ApiError, ApiResult};
use crate::frontend::{Notice, Page};
use crate::identity::{Credential, Role};

/// `POST login` payload.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    #[serde(default)]
    user: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterRequest {
    pub firstname: String,
    pub lastname: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Current user's profile. The role field is what the role watcher compares.
pub async fn profile(client: &AuthClient) -> ApiResult<Outcome<Value>> { client.send(ApiRequest::get("profile")).await }

/// Exchange username/password for a token, persist the session and move to
/// the dashboard. The stored role comes from `user.role` when the server
/// sends a user record.
pub async fn login(client: &AuthClient, username: &str, password: &str) -> ApiResult<Credential> {
    let body = json!({ "username": username, "password": password });
    let value = client
        .send_public(ApiRequest::post("login").json(body))
        .await
        .inspect_err(|e| error!(target: "prolens::auth", "login failed: {}", e))?;
    let resp: LoginResponse = serde_json::from_value(value)?;
    if resp.token.is_empty() {
        return Err(ApiError::malformed("login response has an empty token"));
    }

    let cred = match resp.user {
        Some(user) => Credential::new(resp.token, Credential::role_of(&user), user),
        None => Credential::new(resp.token, None, Value::Null),
    };
    client.store().set(&cred)?;
    info!(target: "prolens::auth", "logged in as {} (role {})", username, cred.role.as_ref().map(Role::as_str).unwrap_or("-"));

    let frontend = client.frontend();
    frontend.acknowledge(Notice::login_succeeded()).await;
    frontend.navigate(Page::Dashboard);
    Ok(cred)
}

pub async fn register(client: &AuthClient, req: &RegisterRequest) -> ApiResult<()> {
    client
        .send_public(ApiRequest::post("register").json(serde_json::to_value(req)?))
        .await
        .inspect_err(|e| error!(target: "prolens::auth", "registration failed: {}", e))?;
    info!(target: "prolens::auth", "registered {}", req.username);
    let frontend = client.frontend();
    frontend.acknowledge(Notice::registered()).await;
    frontend.navigate(Page::login());
    Ok(())
}

/// Tell the server the token is done, then drop the local session whatever
/// the server said. Without a stored token the user is just sent to login.
pub async fn logout(client: &AuthClient) -> ApiResult<()> {
    let frontend = client.frontend();
    let store = client.store();
    if store.get().map_or(true, |c| c.token.is_empty()) {
        frontend.acknowledge(Notice::not_logged_in()).await;
        frontend.navigate(Page::login());
        return Ok(());
    }

    match client.send(ApiRequest::post("logout")).await {
        Ok(Outcome::Handled) => Ok(()),
        Ok(Outcome::Data(_)) => {
            store.clear()?;
            info!(target: "prolens::auth", "logged out");
            frontend.acknowledge(Notice::logged_out()).await;
            frontend.navigate(Page::login());
            Ok(())
        }
        Err(e) => {
            warn!(target: "prolens::auth", "logout request failed, clearing local session anyway: {}", e);
            if let Err(ce) = store.clear() {
                warn!(target: "prolens::auth", "failed to clear credentials: {}", ce);
            }
            frontend.navigate(Page::login());
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::FrontendEvent;
    use crate::identity::CredentialStore;
    use crate::test_support::harness;

    #[tokio::test]
    async fn login_stores_session_and_goes_to_dashboard() {
        let h = harness();
        h.transport.reply(200, json!({"token": "tok_0123456789", "user": {"id": 7, "role": "employee"}}));
        let cred = login(&h.client, "ana", "secret1").await.unwrap();

        assert_eq!(cred.role, Some(Role::Employee));
        assert_eq!(h.store.get(), Some(cred));
        let seen = h.transport.seen();
        assert_eq!(seen[0].url.as_str(), "https://api.test/api/login");
        assert_eq!(seen[0].header("Authorization"), None);
        assert_eq!(h.frontend.events(), vec![
            FrontendEvent::Notice(Notice::login_succeeded()),
            FrontendEvent::Navigate(Page::Dashboard),
        ]);
    }

    #[tokio::test]
    async fn login_without_user_record_stores_token_only() {
        let h = harness();
        h.transport.reply(200, json!({"token": "tok_0123456789"}));
        let cred = login(&h.client, "ana", "secret1").await.unwrap();
        assert_eq!(cred, Credential::new("tok_0123456789", None, Value::Null));
    }

    #[tokio::test]
    async fn rejected_login_leaves_store_empty() {
        let h = harness();
        h.transport.reply(401, json!({"message": "Invalid credentials"}));
        let err = login(&h.client, "ana", "wrong").await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(h.store.get().is_none());
        assert_eq!(h.frontend.errors(), vec!["Invalid credentials".to_string()]);
        assert!(h.frontend.navigations().is_empty());
    }

    #[tokio::test]
    async fn login_response_without_token_is_malformed() {
        let h = harness();
        h.transport.reply(200, json!({"user": {"role": "renter"}}));
        assert_eq!(login(&h.client, "ana", "x").await.unwrap_err().code_str(), "malformed");
        assert!(h.store.get().is_none());
    }

    #[tokio::test]
    async fn register_sends_profile_and_goes_to_login() {
        let h = harness();
        h.transport.reply(201, json!({"message": "ok"}));
        let req = RegisterRequest {
            firstname: "Ana".into(),
            lastname: "Cruz".into(),
            username: "ana".into(),
            email: "ana@example.com".into(),
            password: "secret1".into(),
        };
        register(&h.client, &req).await.unwrap();
        match &h.transport.seen()[0].body {
            crate::transport::Body::Json(v) => assert_eq!(v["email"], "ana@example.com"),
            other => panic!("unexpected body {other:?}"),
        }
        assert_eq!(h.frontend.navigations(), vec![Page::login()]);
    }

    #[tokio::test]
    async fn logout_clears_session() {
        let h = harness();
        h.store.set(&Credential::new("abc123xyz9", Some(Role::Admin), Value::Null)).unwrap();
        h.transport.reply(200, json!({"message": "Logged out"}));
        logout(&h.client).await.unwrap();
        assert!(h.store.get().is_none());
        assert_eq!(h.transport.seen()[0].header("Authorization"), Some("Bearer abc123xyz9"));
        assert_eq!(h.frontend.events(), vec![
            FrontendEvent::Notice(Notice::logged_out()),
            FrontendEvent::Navigate(Page::login()),
        ]);
    }

    #[tokio::test]
    async fn logout_without_session_only_redirects() {
        let h = harness();
        logout(&h.client).await.unwrap();
        assert!(h.transport.seen().is_empty());
        assert_eq!(h.frontend.events(), vec![
            FrontendEvent::Notice(Notice::not_logged_in()),
            FrontendEvent::Navigate(Page::login()),
        ]);
    }

    #[tokio::test]
    async fn failed_logout_still_clears_locally() {
        let h = harness();
        h.store.set(&Credential::new("abc123xyz9", Some(Role::Admin), Value::Null)).unwrap();
        h.transport.fail("connection reset");
        assert!(logout(&h.client).await.is_err());
        assert!(h.store.get().is_none());
        assert_eq!(h.frontend.navigations(), vec![Page::login()]);
    }
}
