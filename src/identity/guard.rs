use tracing::{info, warn};

use super::credential::Credential;
use super::store::SharedCredentials;
use crate::error::ApiResult;
use crate::frontend::{Notice, Page, SharedFrontend};

/// Local, network-free session checks run on page load.
#[derive(Clone)]
pub struct SessionGuard {
    store: SharedCredentials,
    frontend: SharedFrontend,
}

impl SessionGuard {
    pub fn new(store: SharedCredentials, frontend: SharedFrontend) -> Self { Self { store, frontend } }

    /// Returns the stored credential when its token looks usable. Otherwise
    /// clears the store, shows a blocking notice and sends the user to login.
    /// The token is not checked against the server here.
    pub async fn require_auth(&self) -> Option<Credential> {
        match self.store.get() {
            Some(c) if c.has_plausible_token() => Some(c),
            _ => {
                if let Err(e) = end_session(&self.store, &self.frontend, Notice::session_invalid()).await {
                    warn!(target: "prolens::session", "stale session left behind: {}", e);
                }
                None
            }
        }
    }

    /// Login/registration pages call this to skip the form when a session exists.
    pub fn redirect_if_logged_in(&self) -> bool {
        match self.store.get() {
            Some(c) if !c.token.is_empty() => {
                self.frontend.navigate(Page::Dashboard);
                true
            }
            _ => false,
        }
    }
}

/// Clear every credential slot, block on `notice`, then go to login. The
/// user is sent to login even when clearing fails; the failure is returned.
pub(crate) async fn end_session(store: &SharedCredentials, frontend: &SharedFrontend, notice: Notice) -> ApiResult<()> {
    let cleared = store.clear();
    if let Err(e) = &cleared {
        warn!(target: "prolens::session", "failed to clear credentials: {}", e);
    }
    info!(target: "prolens::session", "session ended: {}", notice.text);
    frontend.acknowledge(notice).await;
    frontend.navigate(Page::login());
    cleared
}
