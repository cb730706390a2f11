//! Session store: the authenticated-identity lifecycle.
//!
//! # State machine
//!
//! ```text
//! restoring ──restore()──▶ anonymous ◀──sign_out()── authenticated
//!     │                        │                          ▲
//!     └──────restore()─────────┼──────────────────────────┤
//!                              └──sign_in()/sign_up()─────┘
//! ```
//!
//! Nothing ever transitions back to `restoring`. The status is derived from
//! the snapshot: authenticated iff an identity is adopted.
//!
//! The store exclusively owns the persisted credential. It hands the
//! credential to the gateway, which attaches it to outgoing calls; views
//! never see it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use tienda_core::{Identity, NoticeKind, Role, SessionStatus};

use crate::credential::{Credential, CredentialStore};
use crate::gateway::{GatewayError, RemoteGateway, SignIn, SignUp};
use crate::normalize::{normalize_auth, normalize_identity};
use crate::notice::NoticeQueue;

const SIGN_IN_FAILED: &str = "Could not sign in";
const SIGN_UP_FAILED: &str = "Could not create the account";

/// Observable session state. Never contains the credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    restored: bool,
    identity: Option<Identity>,
}

impl SessionSnapshot {
    /// State at process start, before restoration has run.
    #[must_use]
    pub const fn restoring() -> Self {
        Self {
            restored: false,
            identity: None,
        }
    }

    /// Derived lifecycle status.
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        match (&self.identity, self.restored) {
            (Some(_), _) => SessionStatus::Authenticated,
            (None, false) => SessionStatus::Restoring,
            (None, true) => SessionStatus::Anonymous,
        }
    }

    /// The adopted identity.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Role of the adopted identity; `None` while anonymous.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.identity.as_ref().map(|identity| identity.role)
    }

    /// Whether an identity is adopted.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Whether the adopted identity is an administrator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role().is_some_and(Role::is_admin)
    }

    /// Whether purchase controls should be offered (authenticated customers only).
    #[must_use]
    pub fn can_purchase(&self) -> bool {
        self.role() == Some(Role::Customer)
    }
}

/// Owner of credential persistence, restoration, and role derivation.
pub struct SessionStore {
    gateway: Arc<dyn RemoteGateway>,
    credentials: Arc<dyn CredentialStore>,
    state: watch::Sender<SessionSnapshot>,
    notices: NoticeQueue,
    restore_started: AtomicBool,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.state.borrow())
            .field("notices", &self.notices)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create a store in the `restoring` state.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn RemoteGateway>,
        credentials: Arc<dyn CredentialStore>,
        notices: NoticeQueue,
    ) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::restoring());
        Self {
            gateway,
            credentials,
            state,
            notices,
            restore_started: AtomicBool::new(false),
        }
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Current session state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Current derived status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status()
    }

    /// Role of the adopted identity; `None` while anonymous.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.state.borrow().role()
    }

    /// Watch session changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Notices raised by session operations.
    #[must_use]
    pub const fn notices(&self) -> &NoticeQueue {
        &self.notices
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Restore the session from the persisted credential. Runs once.
    ///
    /// Without a persisted credential this settles `anonymous` immediately
    /// and makes no remote call. Otherwise the profile endpoint decides: on
    /// success the identity is adopted, on any failure the credential is
    /// dropped and the session settles `anonymous` without a notice. If the
    /// future is dropped mid-flight the session still settles `anonymous`.
    ///
    /// Later calls return the current status without doing anything.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> SessionStatus {
        if self.restore_started.swap(true, Ordering::SeqCst) {
            debug!("Session restore already ran");
            return self.status();
        }

        let _settle = SettleOnDrop { state: &self.state };

        let credential = match self.credentials.load() {
            Ok(credential) => credential,
            Err(e) => {
                warn!(error = %e, "Could not read persisted credential");
                None
            }
        };

        let Some(credential) = credential else {
            debug!("No persisted credential");
            self.settle(None);
            return self.status();
        };

        self.gateway.set_credential(Some(credential));

        let identity = match self.gateway.profile().await {
            Ok(body) => normalize_identity(&body),
            Err(e) => {
                if e.is_unauthorized() {
                    info!("Persisted credential rejected");
                } else {
                    warn!(error = %e, "Profile check failed");
                }
                None
            }
        };

        match identity {
            Some(identity) => {
                info!(user = %identity.id, role = ?identity.role, "Session restored");
                self.settle(Some(identity));
            }
            None => {
                if self.status() == SessionStatus::Restoring {
                    self.forget_credential();
                }
                self.settle(None);
            }
        }

        self.status()
    }

    /// Sign in with email and password.
    ///
    /// On success the returned credential is persisted and the identity
    /// adopted. On failure an error notice carries the backend's messages
    /// and the session is left exactly as it was.
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn sign_in(&self, credentials: &SignIn) -> SessionStatus {
        self.notices.clear(NoticeKind::Error);
        match self.gateway.login(credentials).await {
            Ok(body) => self.adopt(&body, SIGN_IN_FAILED),
            Err(e) => self.report(&e, SIGN_IN_FAILED),
        }
        self.status()
    }

    /// Create an account and sign in as it.
    ///
    /// Same success and failure handling as [`Self::sign_in`].
    #[instrument(skip(self, profile), fields(email = %profile.email))]
    pub async fn sign_up(&self, profile: &SignUp) -> SessionStatus {
        self.notices.clear(NoticeKind::Error);
        match self.gateway.register(profile).await {
            Ok(body) => self.adopt(&body, SIGN_UP_FAILED),
            Err(e) => self.report(&e, SIGN_UP_FAILED),
        }
        self.status()
    }

    /// Sign out.
    ///
    /// The remote logout is attempted with the current credential; whatever
    /// it returns, and even if this future is dropped before it does, the
    /// local credential and identity are cleared. Idempotent.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) {
        let _clear = ClearOnDrop { store: self };

        if let Err(e) = self.gateway.logout().await {
            warn!(error = %e, "Remote logout failed; clearing local session anyway");
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn adopt(&self, body: &Value, fallback: &str) {
        let Some(auth) = normalize_auth(body) else {
            warn!("Auth response was not an object");
            self.notices.push(NoticeKind::Error, fallback);
            return;
        };

        // A tokenless response must not leave a previous user's credential
        // paired with the new identity.
        match auth.credential {
            Some(credential) => {
                self.persist(&credential);
                self.gateway.set_credential(Some(credential));
            }
            None => self.forget_credential(),
        }

        info!(user = %auth.identity.id, role = ?auth.identity.role, "Signed in");
        self.state.send_modify(|state| {
            state.restored = true;
            state.identity = Some(auth.identity);
        });
    }

    fn report(&self, error: &GatewayError, fallback: &str) {
        warn!(error = %error, "Auth request failed");
        let messages = error.messages();
        let message = if messages.is_empty() {
            fallback.to_string()
        } else {
            messages.join("; ")
        };
        self.notices.push(NoticeKind::Error, message);
    }

    fn persist(&self, credential: &Credential) {
        // The in-memory session still works for this process.
        if let Err(e) = self.credentials.save(credential) {
            warn!(error = %e, "Could not persist credential");
        }
    }

    fn forget_credential(&self) {
        if let Err(e) = self.credentials.clear() {
            warn!(error = %e, "Could not delete persisted credential");
        }
        self.gateway.set_credential(None);
    }

    /// Leave `restoring`, unless something else already did.
    fn settle(&self, identity: Option<Identity>) {
        self.state.send_if_modified(|state| {
            if state.restored || state.identity.is_some() {
                return false;
            }
            state.restored = true;
            state.identity = identity;
            true
        });
    }

    fn clear_local(&self) {
        self.forget_credential();
        self.state.send_if_modified(|state| {
            let changed = !state.restored || state.identity.is_some();
            state.restored = true;
            state.identity = None;
            changed
        });
        debug!("Local session cleared");
    }
}

/// Settles `anonymous` if restoration is abandoned mid-flight.
struct SettleOnDrop<'a> {
    state: &'a watch::Sender<SessionSnapshot>,
}

impl Drop for SettleOnDrop<'_> {
    fn drop(&mut self) {
        self.state.send_if_modified(|state| {
            if state.restored || state.identity.is_some() {
                return false;
            }
            state.restored = true;
            true
        });
    }
}

/// Clears the local session when sign-out finishes or is abandoned.
struct ClearOnDrop<'a> {
    store: &'a SessionStore,
}

impl Drop for ClearOnDrop<'_> {
    fn drop(&mut self) {
        self.store.clear_local();
    }
}
