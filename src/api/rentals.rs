use serde_json::{json, Value};
use tracing::error;

use crate::client::{ApiRequest, AuthClient, Outcome};
use crate::error::{ApiError, ApiResult};

/// State transitions a rental accepts, each a bodiless `POST rentals/{id}/{action}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RentalAction {
    Approve,
    Decline,
    Cancel,
    HandleCamera,
    Return,
    Complete,
}

impl RentalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RentalAction::Approve => "approve",
            RentalAction::Decline => "decline",
            RentalAction::Cancel => "cancel",
            RentalAction::HandleCamera => "handle-camera",
            RentalAction::Return => "return",
            RentalAction::Complete => "complete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "approve" => RentalAction::Approve,
            "decline" => RentalAction::Decline,
            "cancel" => RentalAction::Cancel,
            "handle-camera" => RentalAction::HandleCamera,
            "return" => RentalAction::Return,
            "complete" => RentalAction::Complete,
            _ => return None,
        })
    }
}

/// Every rental (admin).
pub async fn list_all(client: &AuthClient) -> ApiResult<Outcome<Value>> {
    client.send(ApiRequest::get("rentals")).await.inspect_err(|e| error!(target: "prolens::api", "error fetching rentals: {}", e))
}

/// Rentals an employee handles.
pub async fn list_employee(client: &AuthClient) -> ApiResult<Outcome<Value>> {
    client
        .send(ApiRequest::get("employee/rentals"))
        .await
        .inspect_err(|e| error!(target: "prolens::api", "error fetching employee rentals: {}", e))
}

/// The signed-in renter's own rentals.
pub async fn list_mine(client: &AuthClient) -> ApiResult<Outcome<Value>> {
    client.send(ApiRequest::get("my-rentals")).await.inspect_err(|e| error!(target: "prolens::api", "error fetching my rentals: {}", e))
}

pub async fn create(client: &AuthClient, rental: Value) -> ApiResult<Outcome<Value>> {
    client
        .send(ApiRequest::post("rentals").json(rental))
        .await
        .inspect_err(|e| error!(target: "prolens::api", "error creating rental: {}", e))
}

pub async fn act(client: &AuthClient, id: u64, action: RentalAction) -> ApiResult<Outcome<Value>> {
    client
        .send(ApiRequest::post(format!("rentals/{}/{}", id, action.as_str())))
        .await
        .inspect_err(|e| error!(target: "prolens::api", "error on rental {} {}: {}", id, action.as_str(), e))
}

pub async fn extend(client: &AuthClient, id: u64, additional_days: u32) -> ApiResult<Outcome<Value>> {
    if additional_days == 0 {
        return Err(ApiError::invalid("additional_days", "must be at least 1"));
    }
    client
        .send(ApiRequest::post(format!("rentals/{}/extend", id)).json(json!({ "additional_days": additional_days })))
        .await
        .inspect_err(|e| error!(target: "prolens::api", "error extending rental {}: {}", id, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Credential, CredentialStore, Role};
    use crate::test_support::harness;
    use crate::transport::Body;

    #[tokio::test]
    async fn actions_map_to_paths() {
        let h = harness();
        for action in [RentalAction::Approve, RentalAction::HandleCamera, RentalAction::Complete] {
            h.transport.reply(200, json!({"ok": true}));
            act(&h.client, 5, action).await.unwrap();
        }
        let paths: Vec<String> = h.transport.seen().iter().map(|r| r.url.path().to_string()).collect();
        assert_eq!(paths, ["/api/rentals/5/approve", "/api/rentals/5/handle-camera", "/api/rentals/5/complete"]);
        assert_eq!(RentalAction::parse("handle-camera"), Some(RentalAction::HandleCamera));
        assert_eq!(RentalAction::parse("steal"), None);
    }

    #[tokio::test]
    async fn extend_sends_additional_days() {
        let h = harness();
        h.transport.reply(200, json!({"ok": true}));
        extend(&h.client, 3, 2).await.unwrap();
        let req = &h.transport.seen()[0];
        assert_eq!(req.url.path(), "/api/rentals/3/extend");
        assert_eq!(req.body, Body::Json(json!({"additional_days": 2})));
        assert!(extend(&h.client, 3, 0).await.is_err());
        assert_eq!(h.transport.seen().len(), 1);
    }

    #[tokio::test]
    async fn expired_session_while_listing_is_handled() {
        let h = harness();
        h.store.set(&Credential::new("abc123xyz9", Some(Role::Renter), Value::Null)).unwrap();
        h.transport.reply(401, Value::Null);
        assert!(list_mine(&h.client).await.unwrap().is_handled());
        assert!(h.store.get().is_none());
    }
}
