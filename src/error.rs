//! Client error model.
//! Every failure the session layer can surface is one `ApiError` variant. The
//! authenticated request wrapper turns HTTP 401 into `Outcome::Handled` before
//! it ever becomes an error, so callers only see 401 here from public calls.

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Non-2xx response. `body` is the parsed JSON payload, or the raw text as
    /// a JSON string when the server did not send JSON.
    #[error("HTTP {status} {status_text}")]
    Http {
        status: u16,
        status_text: String,
        body: Value,
        headers: BTreeMap<String, String>,
    },
    #[error("network error: {message}")]
    Transport { message: String },
    #[error("unexpected response: {message}")]
    Malformed { message: String },
    #[error("{field}: {message}")]
    Invalid { field: String, message: String },
    #[error("credential store: {message}")]
    Store { message: String },
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn transport<S: Into<String>>(msg: S) -> Self { ApiError::Transport { message: msg.into() } }
    pub fn malformed<S: Into<String>>(msg: S) -> Self { ApiError::Malformed { message: msg.into() } }
    pub fn invalid<S: Into<String>>(field: S, msg: S) -> Self { ApiError::Invalid { field: field.into(), message: msg.into() } }
    pub fn store<S: Into<String>>(msg: S) -> Self { ApiError::Store { message: msg.into() } }

    pub fn code_str(&self) -> &'static str {
        match self {
            ApiError::Http { status: 401, .. } => "unauthorized",
            ApiError::Http { .. } if self.is_validation() => "validation",
            ApiError::Http { .. } => "http_error",
            ApiError::Transport { .. } => "network",
            ApiError::Malformed { .. } => "malformed",
            ApiError::Invalid { .. } => "invalid_input",
            ApiError::Store { .. } => "store",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool { self.status() == Some(401) }

    /// A 4xx response carrying a field-level `errors` map.
    pub fn is_validation(&self) -> bool {
        matches!(self, ApiError::Http { status, body, .. }
            if (400..500).contains(status) && body.get("errors").is_some_and(Value::is_object))
    }

    /// `message`, then `error`, from the response payload.
    pub fn server_message(&self) -> Option<&str> {
        let ApiError::Http { body, .. } = self else { return None };
        ["message", "error"]
            .iter()
            .filter_map(|k| body.get(*k).and_then(Value::as_str))
            .find(|s| !s.trim().is_empty())
    }

    /// Field-level validation messages keyed by field name. Values may be sent
    /// as a single string or a list of strings.
    pub fn field_errors(&self) -> BTreeMap<String, Vec<String>> {
        let mut out = BTreeMap::new();
        let ApiError::Http { body, .. } = self else { return out };
        let Some(map) = body.get("errors").and_then(Value::as_object) else { return out };
        for (field, v) in map {
            let msgs = match v {
                Value::Array(items) => items.iter().map(value_text).collect(),
                other => vec![value_text(other)],
            };
            out.insert(field.clone(), msgs);
        }
        out
    }

    /// One-paragraph summary fit for showing to a user.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Http { status, status_text, .. } => {
                if let Some(msg) = self.server_message() {
                    return msg.to_string();
                }
                let fields = self.field_errors();
                if !fields.is_empty() {
                    let mut s = String::from("Validation errors:\n");
                    for (field, msgs) in fields {
                        s.push_str(&format!("{}: {}\n", field, msgs.join(", ")));
                    }
                    return s;
                }
                let text = if status_text.is_empty() { "Request failed" } else { status_text.as_str() };
                format!("Error {}: {}", status, text)
            }
            ApiError::Transport { message } => {
                if message.is_empty() { "Network error. Please try again.".to_string() } else { message.clone() }
            }
            ApiError::Malformed { message } | ApiError::Invalid { message, .. } | ApiError::Store { message } => {
                if message.is_empty() { "An unexpected error occurred".to_string() } else { message.clone() }
            }
        }
    }
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self { ApiError::malformed(err.to_string()) }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
