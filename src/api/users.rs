use serde_json::Value;
use tracing::error;

use crate::client::{ApiRequest, AuthClient, Outcome};
use crate::error::ApiResult;

pub async fn list(client: &AuthClient) -> ApiResult<Outcome<Value>> {
    client.send(ApiRequest::get("users")).await.inspect_err(|e| error!(target: "prolens::api", "error fetching users: {}", e))
}

pub async fn add(client: &AuthClient, user: Value) -> ApiResult<Outcome<Value>> {
    client.send(ApiRequest::post("users").json(user)).await.inspect_err(|e| error!(target: "prolens::api", "error adding user: {}", e))
}

/// Role changes made here are what other sessions' role watchers pick up.
pub async fn update(client: &AuthClient, id: u64, user: Value) -> ApiResult<Outcome<Value>> {
    client
        .send(ApiRequest::put(format!("users/{}", id)).json(user))
        .await
        .inspect_err(|e| error!(target: "prolens::api", "error updating user {}: {}", id, e))
}

pub async fn delete(client: &AuthClient, id: u64) -> ApiResult<Outcome<Value>> {
    client
        .send(ApiRequest::delete(format!("users/{}", id)))
        .await
        .inspect_err(|e| error!(target: "prolens::api", "error deleting user {}: {}", id, e))
}
