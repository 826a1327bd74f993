//!
//! Role-change detection
//! ---------------------
//! A `RoleWatcher` runs per tab. It notices that the signed-in user's role
//! changed on the server and brings every open tab onto the new role.
//!
//! Triggers:
//! - poll: on start and every `poll_interval`, `GET profile` and compare the
//!   server role with the stored one. A difference is written to the store and
//!   announced.
//! - broadcast: a `RoleChangeEvent` from another tab whose new role differs
//!   from the role this tab is showing is applied without re-fetching.
//!
//! Announcing means publishing the event on the `RoleBus`, showing a blocking
//! "Role Changed" notice, then reloading the dashboard.
//!
//! Each tab remembers the role its view was rendered with. Moving to a new
//! role is a compare-and-set on that value, and only the caller that performs
//! the transition announces. Seeing the same change twice (poll and broadcast,
//! or two tabs polling at once) therefore reloads each tab exactly once.

mod bus;

pub use bus::{RoleBus, RoleChangeEvent, RoleSubscription, TabId};

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api;
use crate::client::{AuthClient, Outcome};
use crate::config::DEFAULT_POLL_SECS;
use crate::error::{ApiError, ApiResult};
use crate::frontend::{Notice, Page};
use crate::identity::{Credential, Role};
use crate::report::ErrorReport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult {
    /// Nobody signed in with a role; nothing was fetched.
    Skipped,
    Unchanged,
    /// The server role differed from the stored one and was applied.
    Changed { from: Role, to: Role },
    /// The store already held the server role but this tab still showed an
    /// older one (it missed the broadcast); the view was reloaded.
    CaughtUp { to: Role },
    /// The profile call was rejected with 401; the session is gone.
    SessionEnded,
}

pub struct RoleWatcher {
    tab: TabId,
    client: Arc<AuthClient>,
    bus: RoleBus,
    shown: Mutex<Option<Role>>,
    serial: tokio::sync::Mutex<()>,
    interval: Duration,
}

impl RoleWatcher {
    /// Watcher for a freshly loaded tab; the shown role is whatever the store
    /// holds right now.
    pub fn new(client: Arc<AuthClient>, bus: RoleBus) -> Self {
        let shown = client.store().get().and_then(|c| c.role);
        Self {
            tab: Uuid::new_v4(),
            client,
            bus,
            shown: Mutex::new(shown),
            serial: tokio::sync::Mutex::new(()),
            interval: Duration::from_secs(DEFAULT_POLL_SECS),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn tab_id(&self) -> TabId { self.tab }

    pub fn shown_role(&self) -> Option<Role> { self.shown.lock().clone() }

    pub fn interval(&self) -> Duration { self.interval }

    /// Compare-and-set of the shown role. Returns the previous role when this
    /// call moved the tab to `to`, `None` when it was already there.
    fn transition(&self, to: &Role) -> Option<Option<Role>> {
        let mut shown = self.shown.lock();
        if shown.as_ref() == Some(to) {
            return None;
        }
        Some(shown.replace(to.clone()))
    }

    /// One poll cycle. Polls and broadcast handling are serialized per tab.
    pub async fn poll_once(&self) -> ApiResult<PollResult> {
        let _serial = self.serial.lock().await;
        let store = self.client.store();
        let Some(stored) = store.get() else { return Ok(PollResult::Skipped) };
        let Some(stored_role) = stored.role.clone() else { return Ok(PollResult::Skipped) };

        let profile = match api::auth::profile(&self.client).await? {
            Outcome::Data(p) => p,
            Outcome::Handled => {
                *self.shown.lock() = None;
                return Ok(PollResult::SessionEnded);
            }
        };
        let Some(server_role) = Credential::role_of(&profile) else {
            let err = ApiError::malformed("profile response has no role");
            warn!(target: "prolens::roles", "tab {}: {}", self.tab, err);
            self.client.frontend().show_error(&ErrorReport::new("Role refresh", err.clone())).await;
            return Err(err);
        };

        if server_role != stored_role {
            store.set(&stored.with_role(server_role.clone(), Some(profile)))?;
            info!(target: "prolens::roles", "tab {}: role changed from {} to {}", self.tab, stored_role, server_role);
            if let Some(old) = self.transition(&server_role) {
                self.announce(old, server_role.clone(), true).await;
            }
            return Ok(PollResult::Changed { from: stored_role, to: server_role });
        }

        if let Some(old) = self.transition(&server_role) {
            info!(target: "prolens::roles", "tab {}: catching up to role {}", self.tab, server_role);
            self.announce(old, server_role.clone(), false).await;
            return Ok(PollResult::CaughtUp { to: server_role });
        }
        Ok(PollResult::Unchanged)
    }

    /// Apply a change announced by another tab. Returns whether this tab
    /// transitioned. Events from this tab, and events that carry the role
    /// already shown, are no-ops.
    ///
    /// The event only applies on top of the state it was produced from: the
    /// store must hold either its new role (the sender already wrote it) or
    /// its old role. Anything else means the store has moved on since, and the
    /// event is dropped; the next poll settles the role.
    pub async fn handle_event(&self, event: &RoleChangeEvent) -> ApiResult<bool> {
        if event.origin == self.tab {
            return Ok(false);
        }
        let _serial = self.serial.lock().await;
        let store = self.client.store();
        let Some(cred) = store.get() else {
            debug!(target: "prolens::roles", "tab {}: ignoring role event, signed out", self.tab);
            return Ok(false);
        };
        let already_stored = cred.role.as_ref() == Some(&event.new_role);
        if !already_stored && cred.role != event.old_role {
            debug!(
                target: "prolens::roles",
                "tab {}: dropping stale role event {:?} -> {}, store holds {:?}",
                self.tab, event.old_role, event.new_role, cred.role
            );
            return Ok(false);
        }
        let Some(old) = self.transition(&event.new_role) else { return Ok(false) };
        if !already_stored {
            store.set(&cred.with_role(event.new_role.clone(), None))?;
        }
        info!(target: "prolens::roles", "tab {}: role changed in another tab, now {}", self.tab, event.new_role);
        // only a tab that moved the store on has news for the others
        self.announce(old, event.new_role.clone(), !already_stored).await;
        Ok(true)
    }

    async fn announce(&self, old: Option<Role>, new: Role, broadcast: bool) {
        if broadcast {
            let reached = self.bus.publish(RoleChangeEvent::new(self.tab, old.clone(), new.clone()));
            debug!(target: "prolens::roles", "tab {}: role event reached {} subscriber(s)", self.tab, reached);
        }
        let frontend = self.client.frontend();
        frontend.acknowledge(Notice::role_changed(old.as_ref(), &new)).await;
        frontend.navigate(Page::Dashboard);
    }

    /// Poll loop plus bus listener until `shutdown` flips to true or the
    /// session ends. Polls start immediately (page load).
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut events = self.bus.subscribe();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => match self.poll_once().await {
                    Ok(PollResult::SessionEnded) => break,
                    Ok(r) => debug!(target: "prolens::roles", "tab {}: poll {:?}", self.tab, r),
                    Err(e) => warn!(target: "prolens::roles", "tab {}: role refresh failed: {}", self.tab, e),
                },
                ev = events.recv() => match ev {
                    Some(ev) => {
                        if let Err(e) = self.handle_event(&ev).await {
                            warn!(target: "prolens::roles", "tab {}: applying role event failed: {}", self.tab, e);
                        }
                    }
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() { break; }
                }
            }
        }
        debug!(target: "prolens::roles", "tab {}: watcher stopped", self.tab);
    }

    /// Spawn `run` on the current runtime.
    pub fn spawn(self: &Arc<Self>) -> WatcherHandle {
        let (tx, rx) = watch::channel(false);
        let join = tokio::spawn(Arc::clone(self).run(rx));
        WatcherHandle { shutdown: tx, join: Some(join) }
    }
}

pub struct WatcherHandle {
    shutdown: watch::Sender<bool>,
    /// `None` once the task has been awaited to completion.
    join: Option<JoinHandle<()>>,
}

impl WatcherHandle {
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        self.finished().await;
    }

    pub fn is_finished(&self) -> bool { self.join.as_ref().map_or(true, JoinHandle::is_finished) }

    /// Resolves when the loop ends on its own (session ended). Cancel-safe,
    /// so it can sit in a `select!` next to a stop signal.
    pub async fn finished(&mut self) {
        let Some(join) = self.join.as_mut() else { return };
        let result = join.await;
        self.join = None;
        if let Err(e) = result {
            warn!(target: "prolens::roles", "watcher task ended abnormally: {}", e);
        }
    }
}
