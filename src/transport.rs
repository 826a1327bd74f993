//! Wire-level seam between the session layer and an HTTP client.
//! `HttpTransport` is the reqwest-backed default; tests swap in their own.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Text(String),
    File { file_name: String, mime: Option<String>, bytes: Vec<u8> },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    Json(Value),
    /// multipart/form-data; the transport picks the boundary and content type.
    Form(Vec<(String, FormPart)>),
}

#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl OutboundRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }
}

/// Executes one request. Only failures to get any response at all are
/// errors; every HTTP status comes back as a `RawResponse`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: OutboundRequest) -> ApiResult<RawResponse>;
}

#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Option<Duration>) -> ApiResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().map_err(|e| ApiError::transport(format!("http client: {}", e)))?;
        Ok(Self { client })
    }
}

fn to_multipart(parts: Vec<(String, FormPart)>) -> ApiResult<reqwest::multipart::Form> {
    let mut form = reqwest::multipart::Form::new();
    for (name, part) in parts {
        form = match part {
            FormPart::Text(t) => form.text(name, t),
            FormPart::File { file_name, mime, bytes } => {
                let mut p = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
                if let Some(m) = mime {
                    p = p.mime_str(&m).map_err(|e| ApiError::invalid(name.clone(), format!("mime type {}: {}", m, e)))?;
                }
                form.part(name, p)
            }
        };
    }
    Ok(form)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: OutboundRequest) -> ApiResult<RawResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };
        let is_form = matches!(request.body, Body::Form(_));
        let mut rb = self.client.request(method, request.url.clone());
        for (k, v) in &request.headers {
            // multipart needs the generated boundary in its content type
            if is_form && k.eq_ignore_ascii_case("content-type") { continue; }
            rb = rb.header(k.as_str(), v.as_str());
        }
        rb = match request.body {
            Body::Empty => rb,
            Body::Json(v) => rb.json(&v),
            Body::Form(parts) => rb.multipart(to_multipart(parts)?),
        };
        let resp = rb.send().await.map_err(|e| ApiError::transport(e.to_string()))?;
        let status = resp.status();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.as_str().to_string(), s.to_string())))
            .collect();
        let body = resp.text().await.map_err(|e| ApiError::transport(format!("reading body: {}", e)))?;
        Ok(RawResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            headers,
            body,
        })
    }
}
