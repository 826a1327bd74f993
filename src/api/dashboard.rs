use serde_json::Value;
use tracing::error;

use crate::client::{ApiRequest, AuthClient, Outcome};
use crate::error::{ApiError, ApiResult};

/// Role-specific statistics. An empty body is treated as a broken response.
pub async fn stats(client: &AuthClient) -> ApiResult<Outcome<Value>> {
    client
        .send(ApiRequest::get("dashboard"))
        .await?
        .try_map(|v| if v.is_null() { Err(ApiError::malformed("Invalid response from dashboard API")) } else { Ok(v) })
        .inspect_err(|e| error!(target: "prolens::api", "error loading dashboard stats: {}", e))
}
