//! Host seam for everything the session layer wants a user to see.
//! The library never renders anything itself: it asks the frontend to show a
//! blocking notice, to present an error report, or to move to another page.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::identity::Role;
use crate::report::ErrorReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Warning,
    Error,
}

/// A modal message the user has to acknowledge before the flow continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub text: String,
    pub confirm: String,
}

impl Notice {
    pub fn new<S: Into<String>>(kind: NoticeKind, title: S, text: S, confirm: S) -> Self {
        Self { kind, title: title.into(), text: text.into(), confirm: confirm.into() }
    }

    /// Server rejected the token.
    pub fn session_expired() -> Self {
        Self::new(NoticeKind::Warning, "Session Expired", "Your session has expired. Please log in again.", "Go to Login")
    }

    /// Local guard found no usable token.
    pub fn session_invalid() -> Self {
        Self::new(
            NoticeKind::Warning,
            "Session Expired",
            "Your session has expired or is invalid. Please log in again.",
            "Go to Login",
        )
    }

    pub fn role_changed(old: Option<&Role>, new: &Role) -> Self {
        let from = old.map(|r| r.to_string()).unwrap_or_else(|| "none".to_string());
        Self::new(
            NoticeKind::Success,
            "Role Changed".to_string(),
            format!("Your role has been changed from {} to {}. The page will refresh to apply the changes.", from, new),
            "OK".to_string(),
        )
    }

    pub fn not_logged_in() -> Self {
        Self::new(NoticeKind::Info, "Not Logged In", "Please log in to continue.", "Go to Login")
    }

    pub fn logged_out() -> Self {
        Self::new(NoticeKind::Success, "Logged Out", "You have been logged out successfully!", "OK")
    }

    pub fn login_succeeded() -> Self {
        Self::new(NoticeKind::Success, "Login Successful", "Login successful!", "OK")
    }

    pub fn registered() -> Self {
        Self::new(
            NoticeKind::Success,
            "Registration Successful!",
            "Please check your email to verify your account.",
            "Go to Login",
        )
    }
}

/// Navigation targets. The dashboard is role-agnostic; it renders role
/// specific content from the stored role after a (re)load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    Login { activated: bool },
    Dashboard,
    ForgotPassword,
}

impl Page {
    pub fn login() -> Self { Page::Login { activated: false } }

    pub fn path(&self) -> &'static str {
        match self {
            Page::Login { activated: false } => "login.html",
            Page::Login { activated: true } => "login.html?activated=1",
            Page::Dashboard => "dashboard.html",
            Page::ForgotPassword => "forgot.html",
        }
    }
}

#[async_trait]
pub trait Frontend: Send + Sync {
    /// Show a blocking notice; returns once the user dismissed it.
    async fn acknowledge(&self, notice: Notice);
    /// Present an error summary with the full diagnostic report on demand.
    async fn show_error(&self, report: &ErrorReport);
    /// Full navigation (reload) to `page`.
    fn navigate(&self, page: Page);
}

pub type SharedFrontend = Arc<dyn Frontend>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontendEvent {
    Notice(Notice),
    Error { context: String, summary: String },
    Navigate(Page),
}

/// Headless frontend that acknowledges everything immediately and keeps a
/// log of what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingFrontend {
    events: Mutex<Vec<FrontendEvent>>,
}

impl RecordingFrontend {
    pub fn new() -> Self { Self::default() }

    pub fn events(&self) -> Vec<FrontendEvent> { self.events.lock().clone() }

    pub fn notices(&self) -> Vec<Notice> {
        self.events.lock().iter().filter_map(|e| match e { FrontendEvent::Notice(n) => Some(n.clone()), _ => None }).collect()
    }

    pub fn navigations(&self) -> Vec<Page> {
        self.events.lock().iter().filter_map(|e| match e { FrontendEvent::Navigate(p) => Some(p.clone()), _ => None }).collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events.lock().iter().filter_map(|e| match e { FrontendEvent::Error { summary, .. } => Some(summary.clone()), _ => None }).collect()
    }

    pub fn clear(&self) { self.events.lock().clear(); }
}

#[async_trait]
impl Frontend for RecordingFrontend {
    async fn acknowledge(&self, notice: Notice) { self.events.lock().push(FrontendEvent::Notice(notice)); }

    async fn show_error(&self, report: &ErrorReport) {
        self.events.lock().push(FrontendEvent::Error { context: report.context.clone(), summary: report.summary() });
    }

    fn navigate(&self, page: Page) { self.events.lock().push(FrontendEvent::Navigate(page)); }
}
