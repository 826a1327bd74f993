//! Rewrites for activation pages that still point at a development login.
//! The server-rendered account activation page links back to whatever host
//! the backend was configured with; these helpers decide where such links
//! should go instead.

use crate::config::DEFAULT_FRONTEND_HOST;

/// Where "proceed to login" should land on `host`.
pub fn login_url(host: &str) -> String {
    if host.contains(DEFAULT_FRONTEND_HOST) {
        "/login.html?activated=1".to_string()
    } else {
        "login.html?activated=1".to_string()
    }
}

/// A target that only makes sense on a developer's machine.
pub fn is_broken_login_target(target: &str) -> bool {
    target.contains("127.0.0.1")
        || target.contains("localhost")
        || target.contains("/frontend/login")
        || (target.contains("login") && (target.contains(":5500") || target.contains(":8000")))
}

/// Replacement `href` for a link, or `None` when it is fine as is. Plain
/// `login.html` links that read like a login prompt get `activated=1`.
pub fn fix_href(href: &str, text: &str, login_url: &str) -> Option<String> {
    if href.is_empty() {
        return None;
    }
    if is_broken_login_target(href) {
        return Some(login_url.to_string());
    }
    let text = text.to_lowercase();
    if href.contains("login.html") && !href.contains("activated=") && (text.contains("proceed") || text.contains("login")) {
        let sep = if href.contains('?') { '&' } else { '?' };
        return Some(format!("{}{}activated=1", href, sep));
    }
    None
}

/// Whether a button should be sent to the login URL: its text asks to go to
/// login and its `onclick` is either missing or broken.
pub fn is_login_button(text: &str, onclick: Option<&str>) -> bool {
    let text = text.to_lowercase();
    let login_text = text.contains("proceed to login")
        || text.contains("go to login")
        || (text.contains("login") && text.contains("proceed"));
    if !login_text {
        return onclick.is_some_and(is_broken_login_target);
    }
    match onclick.map(str::trim) {
        None | Some("") => true,
        Some(handler) => is_broken_login_target(handler),
    }
}

/// An activation-page element that may need to point at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element<'a> {
    Link { href: &'a str, text: &'a str },
    Button { text: &'a str, onclick: Option<&'a str> },
}

/// New target for `element` when served from `host`, or `None` to leave it.
pub fn redirect(host: &str, element: Element<'_>) -> Option<String> {
    let target = login_url(host);
    match element {
        Element::Link { href, text } => fix_href(href, text, &target),
        Element::Button { text, onclick } => is_login_button(text, onclick).then_some(target),
    }
}
