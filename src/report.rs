//! Error presentation: a short summary for the user and a copyable
//! diagnostic dump for whoever has to debug the failure.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::ApiError;

/// Body keys whose values never appear in a diagnostic dump.
const REDACTED_KEYS: &[&str] = &["password", "new_password", "otp", "token"];

#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: String,
    pub url: String,
    pub data: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub context: String,
    pub time: DateTime<Utc>,
    pub request: Option<RequestInfo>,
    pub error: ApiError,
}

impl ErrorReport {
    pub fn new<S: Into<String>>(context: S, error: ApiError) -> Self {
        Self { context: context.into(), time: Utc::now(), request: None, error }
    }

    pub fn with_request(mut self, request: RequestInfo) -> Self {
        self.request = Some(request);
        self
    }

    pub fn summary(&self) -> String { self.error.user_message() }

    /// Full multi-section report, suitable for copy/paste into a bug report.
    pub fn details(&self) -> String {
        let mut out: Vec<String> = Vec::new();
        if !self.context.is_empty() {
            out.push(format!("=== {} ===", self.context));
        }
        out.push(format!("Time: {}", self.time.to_rfc3339()));

        if let Some(req) = &self.request {
            out.push("\n--- Request ---".into());
            out.push(format!("URL: {}", req.url));
            out.push(format!("Method: {}", req.method.to_uppercase()));
            if let Some(data) = &req.data {
                out.push(format!("Data: {}", pretty(&redact(data))));
            }
        }

        match &self.error {
            ApiError::Http { status, status_text, body, headers } => {
                out.push("\n--- Response ---".into());
                out.push(format!("Status: {} {}", status, status_text).trim_end().to_string());
                if !body.is_null() {
                    out.push("\nResponse Data:".into());
                    out.push(pretty(body));
                }
                if !headers.is_empty() {
                    out.push("\nResponse Headers:".into());
                    for (k, v) in headers {
                        out.push(format!("{}: {}", k, v));
                    }
                }
            }
            ApiError::Transport { message } => {
                out.push("\n--- Network Error ---".into());
                out.push("No response received from server".into());
                out.push(message.clone());
            }
            other => {
                out.push("\n--- Error ---".into());
                out.push(format!("Message: {}", other.user_message()));
            }
        }

        out.push("\n--- Error Message ---".into());
        out.push(format!("[{}] {}", self.error.code_str(), self.error));
        out.join("\n")
    }
}

fn pretty(v: &Value) -> String { serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string()) }

fn redact(v: &Value) -> Value {
    match v {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, val)| {
                    if REDACTED_KEYS.contains(&k.to_ascii_lowercase().as_str()) {
                        (k.clone(), Value::String("***".into()))
                    } else {
                        (k.clone(), redact(val))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}
