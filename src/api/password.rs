//! Three-step password reset: request an OTP by email, verify it, then set a
//! new password. Each step validates locally before calling the server and
//! only advances on success.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::client::{ApiRequest, AuthClient};
use crate::error::{ApiError, ApiResult};
use crate::frontend::Page;

pub const OTP_LEN: usize = 6;
pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetStep {
    Email,
    Otp { email: String },
    NewPassword { email: String, otp: String },
    Done,
}

pub fn is_valid_email(email: &str) -> bool { EMAIL_RE.is_match(email) }

pub struct PasswordReset<'a> {
    client: &'a AuthClient,
    step: ResetStep,
}

impl<'a> PasswordReset<'a> {
    pub fn new(client: &'a AuthClient) -> Self { Self { client, step: ResetStep::Email } }

    pub fn step(&self) -> &ResetStep { &self.step }

    /// Step 1. Returns the server's message.
    pub async fn send_otp(&mut self, email: &str) -> ApiResult<String> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ApiError::invalid("email", "Please enter your email address."));
        }
        if !is_valid_email(email) {
            return Err(ApiError::invalid("email", "Please enter a valid email address."));
        }
        let resp = self
            .post("forgot-password/send-otp", json!({ "email": email }))
            .await
            .inspect_err(|e| error!(target: "prolens::password", "send OTP failed: {}", e))?;
        self.step = ResetStep::Otp { email: email.to_string() };
        Ok(message_of(&resp))
    }

    /// Step 2. Needs a prior successful `send_otp`.
    pub async fn verify_otp(&mut self, otp: &str) -> ApiResult<String> {
        let otp = otp.trim();
        if otp.is_empty() {
            return Err(ApiError::invalid("otp", "Please enter the OTP."));
        }
        if otp.len() != OTP_LEN || !otp.chars().all(|c| c.is_ascii_digit()) {
            return Err(ApiError::invalid("otp", "OTP must be 6 digits."));
        }
        let email = match &self.step {
            ResetStep::Otp { email } | ResetStep::NewPassword { email, .. } => email.clone(),
            _ => return Err(ApiError::invalid("email", "Please enter your email address.")),
        };
        let resp = self
            .post("forgot-password/verify-otp", json!({ "email": email, "otp": otp }))
            .await
            .inspect_err(|e| error!(target: "prolens::password", "verify OTP failed: {}", e))?;
        self.step = ResetStep::NewPassword { email, otp: otp.to_string() };
        Ok(message_of(&resp))
    }

    /// Step 3. Without a verified OTP the flow starts over on the
    /// forgot-password page. On success the user is sent to login.
    pub async fn reset(&mut self, new_password: &str, confirm: &str) -> ApiResult<String> {
        if new_password.is_empty() || confirm.is_empty() {
            return Err(ApiError::invalid("password", "Please fill in all fields."));
        }
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::invalid("password", "Password must be at least 6 characters."));
        }
        if new_password != confirm {
            return Err(ApiError::invalid("password", "Passwords do not match."));
        }
        let ResetStep::NewPassword { email, otp } = self.step.clone() else {
            self.step = ResetStep::Email;
            self.client.frontend().navigate(Page::ForgotPassword);
            return Err(ApiError::invalid("otp", "Session expired. Please start over."));
        };
        let resp = self
            .post("forgot-password/reset", json!({ "email": email, "otp": otp, "new_password": new_password }))
            .await
            .inspect_err(|e| error!(target: "prolens::password", "password reset failed: {}", e))?;
        info!(target: "prolens::password", "password reset for {}", email);
        self.step = ResetStep::Done;
        self.client.frontend().navigate(Page::login());
        Ok(message_of(&resp))
    }

    async fn post(&self, path: &str, body: Value) -> ApiResult<Value> {
        self.client.send_public(ApiRequest::post(path).json(body)).await
    }
}

fn message_of(v: &Value) -> String { v.get("message").and_then(Value::as_str).unwrap_or_default().to_string() }
