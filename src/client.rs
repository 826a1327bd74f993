//!
//! Authenticated request wrapper
//! -----------------------------
//! Every call to the backend goes through `AuthClient`. It attaches the stored
//! bearer token, runs the request on the configured transport, and gets first
//! refusal on failures:
//!
//! - 401: the credential store is cleared, a blocking "Session Expired" notice
//!   is shown and the user is sent to login. The caller gets
//!   `Outcome::Handled`; the call is not retried. If the store cannot be
//!   cleared the user still lands on login, but the caller gets the
//!   `ApiError::Store` instead.
//! - anything else: the store is left alone, an `ErrorReport` is handed to the
//!   frontend and the error is returned to the caller.

use std::sync::Arc;

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::frontend::{Notice, SharedFrontend};
use crate::identity::{end_session, SharedCredentials};
use crate::report::{ErrorReport, RequestInfo};
use crate::transport::{Body, FormPart, HttpTransport, Method, OutboundRequest, RawResponse, Transport};

/// Result of an authenticated call that did not fail.
/// `Handled` means the session was rejected and already torn down.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Data(T),
    Handled,
}

impl<T> Outcome<T> {
    pub fn data(self) -> Option<T> {
        match self {
            Outcome::Data(t) => Some(t),
            Outcome::Handled => None,
        }
    }

    pub fn is_handled(&self) -> bool { matches!(self, Outcome::Handled) }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Data(t) => Outcome::Data(f(t)),
            Outcome::Handled => Outcome::Handled,
        }
    }

    pub fn try_map<U, F: FnOnce(T) -> ApiResult<U>>(self, f: F) -> ApiResult<Outcome<U>> {
        match self {
            Outcome::Data(t) => f(t).map(Outcome::Data),
            Outcome::Handled => Ok(Outcome::Handled),
        }
    }
}

/// A call against the API, with `path` relative to the configured base.
/// Absolute `http(s)://` URLs are used as given.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Body,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new<S: Into<String>>(method: Method, path: S) -> Self {
        Self { method, path: path.into(), body: Body::Empty, headers: Vec::new() }
    }

    pub fn get<S: Into<String>>(path: S) -> Self { Self::new(Method::Get, path) }
    pub fn post<S: Into<String>>(path: S) -> Self { Self::new(Method::Post, path) }
    pub fn put<S: Into<String>>(path: S) -> Self { Self::new(Method::Put, path) }
    pub fn delete<S: Into<String>>(path: S) -> Self { Self::new(Method::Delete, path) }

    pub fn json(mut self, v: Value) -> Self {
        self.body = Body::Json(v);
        self
    }

    pub fn form(mut self, parts: Vec<(String, FormPart)>) -> Self {
        self.body = Body::Form(parts);
        self
    }

    pub fn header<K: Into<String>, V: Into<String>>(mut self, k: K, v: V) -> Self {
        self.headers.push((k.into(), v.into()));
        self
    }
}

pub struct AuthClient {
    base: Url,
    transport: Arc<dyn Transport>,
    store: SharedCredentials,
    frontend: SharedFrontend,
}

impl AuthClient {
    pub fn new(base: Url, transport: Arc<dyn Transport>, store: SharedCredentials, frontend: SharedFrontend) -> Self {
        Self { base: with_trailing_slash(base), transport, store, frontend }
    }

    /// Client over the reqwest transport, configured from `config`.
    pub fn from_config(config: &ClientConfig, store: SharedCredentials, frontend: SharedFrontend) -> ApiResult<Self> {
        let transport = HttpTransport::new(config.request_timeout)?;
        Ok(Self::new(config.api_base.clone(), Arc::new(transport), store, frontend))
    }

    pub fn base(&self) -> &Url { &self.base }
    pub fn store(&self) -> &SharedCredentials { &self.store }
    pub fn frontend(&self) -> &SharedFrontend { &self.frontend }

    pub fn resolve(&self, path: &str) -> ApiResult<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path).map_err(|e| ApiError::invalid("url".to_string(), format!("{}: {}", path, e)));
        }
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::invalid("url".to_string(), format!("{}: {}", path, e)))
    }

    /// Authenticated call. See the module docs for the failure contract.
    pub async fn send(&self, req: ApiRequest) -> ApiResult<Outcome<Value>> {
        let (outbound, info) = self.prepare(req, true)?;
        let context = format!("{} {}", info.method, info.url);
        match self.transport.execute(outbound).await {
            Ok(resp) if resp.status == 401 => {
                warn!(target: "prolens::client", "{} rejected the session token", context);
                end_session(&self.store, &self.frontend, Notice::session_expired()).await?;
                Ok(Outcome::Handled)
            }
            Ok(resp) => match decode(resp) {
                Ok(v) => Ok(Outcome::Data(v)),
                Err(e) => Err(self.present(context, info, e).await),
            },
            Err(e) => Err(self.present(context, info, e).await),
        }
    }

    /// Unauthenticated call for login, registration and password reset.
    /// No token is attached and a 401 is an ordinary `ApiError::Http`.
    pub async fn send_public(&self, req: ApiRequest) -> ApiResult<Value> {
        let (outbound, info) = self.prepare(req, false)?;
        let context = format!("{} {}", info.method, info.url);
        let result = self.transport.execute(outbound).await.and_then(decode);
        match result {
            Ok(v) => Ok(v),
            Err(e) => Err(self.present(context, info, e).await),
        }
    }

    /// `send` followed by decoding the payload into `T`.
    pub async fn call<T: DeserializeOwned>(&self, req: ApiRequest) -> ApiResult<Outcome<T>> {
        self.send(req).await?.try_map(|v| serde_json::from_value(v).map_err(ApiError::from))
    }

    fn prepare(&self, req: ApiRequest, authenticated: bool) -> ApiResult<(OutboundRequest, RequestInfo)> {
        let url = self.resolve(&req.path)?;
        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        headers.extend(req.headers);
        if authenticated {
            if let Some(cred) = self.store.get() {
                if !cred.token.is_empty() {
                    headers.push(("Authorization".to_string(), format!("Bearer {}", cred.token)));
                }
            }
        }
        let data = match &req.body {
            Body::Json(v) => Some(v.clone()),
            Body::Form(parts) => Some(Value::Object(
                parts
                    .iter()
                    .map(|(k, p)| {
                        let v = match p {
                            FormPart::Text(t) => Value::String(t.clone()),
                            FormPart::File { file_name, bytes, .. } => Value::String(format!("<file {} ({} bytes)>", file_name, bytes.len())),
                        };
                        (k.clone(), v)
                    })
                    .collect(),
            )),
            Body::Empty => None,
        };
        let info = RequestInfo { method: req.method.as_str().to_string(), url: url.to_string(), data };
        debug!(target: "prolens::client", "{} {} auth={}", info.method, info.url, authenticated);
        Ok((OutboundRequest { method: req.method, url, headers, body: req.body }, info))
    }

    async fn present(&self, context: String, info: RequestInfo, err: ApiError) -> ApiError {
        error!(target: "prolens::client", "{} failed: {}", context, err);
        let report = ErrorReport::new(context, err.clone()).with_request(info);
        self.frontend.show_error(&report).await;
        err
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let p = format!("{}/", url.path());
        url.set_path(&p);
    }
    url
}

/// Successful bodies are JSON (or empty → null); failures keep whatever the
/// server sent so the report can show it.
fn decode(resp: RawResponse) -> ApiResult<Value> {
    let trimmed = resp.body.trim();
    if !resp.is_success() {
        let body = if trimmed.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(resp.body.clone()))
        };
        return Err(ApiError::Http { status: resp.status, status_text: resp.status_text, body, headers: resp.headers });
    }
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(trimmed).map_err(|e| ApiError::malformed(format!("response is not JSON: {}", e)))
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod client_tests;
