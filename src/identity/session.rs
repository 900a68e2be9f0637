use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::principal::{Identity, Role};
use super::provider::{AuthBackend, Credentials};
use crate::error::{AppError, AppResult, SERVER_CODE};

pub const WRONG_CREDENTIALS: &str = "Wrong credentials.";

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern"));

/// Who is logged in, as far as this client knows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// The initial identity check has not answered yet.
    Loading,
    Anonymous,
    Authenticated(Identity),
}

impl SessionState {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Authenticated(id) => Some(id),
            _ => None,
        }
    }

    pub fn role(&self) -> Option<Role> { self.identity().map(|i| i.role) }

    pub fn is_loading(&self) -> bool { matches!(self, SessionState::Loading) }
}

/// Single source of truth for the current session.
///
/// Shared by reference (`Arc<SessionStore>`) from the application root. Every
/// transition replaces the whole state and is published to all subscribers.
/// Writers are `initialize`, `login`, `logout` and `expire`. Each write bumps
/// `writes`; an `initialize` answer is dropped if any write landed after it started.
pub struct SessionStore {
    backend: Arc<dyn AuthBackend>,
    state: watch::Sender<SessionState>,
    writes: AtomicU64,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn AuthBackend>) -> Self {
        let (state, _rx) = watch::channel(SessionState::Loading);
        Self { backend, state, writes: AtomicU64::new(0) }
    }

    pub fn current(&self) -> SessionState { self.state.borrow().clone() }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> { self.state.subscribe() }

    /// Wait until the initial identity check has resolved.
    pub async fn ready(&self) -> SessionState {
        let mut rx = self.state.subscribe();
        let resolved = match rx.wait_for(|s| !s.is_loading()).await {
            Ok(s) => s.clone(),
            Err(_) => self.current(),
        };
        resolved
    }

    /// Query the identity endpoint once; any failure means no session.
    /// Returns the state in effect afterwards, which is a newer write's if
    /// login or logout finished while the query was in flight.
    pub async fn initialize(&self) -> SessionState {
        let seen = self.writes.load(Ordering::SeqCst);
        let next = match self.backend.whoami().await {
            Ok(identity) => {
                info!(target: "session", user = %identity.email, role = %identity.role, "session restored");
                SessionState::Authenticated(identity)
            }
            Err(e) => {
                debug!(target: "session", error = %e, "no active session");
                SessionState::Anonymous
            }
        };
        let applied = self.state.send_if_modified(|current| {
            if self.writes.load(Ordering::SeqCst) != seen {
                return false;
            }
            *current = next;
            true
        });
        if !applied {
            debug!(target: "session", "identity answer superseded by a newer session write");
        }
        self.current()
    }

    /// Authenticate, then re-query the identity so the role comes from the server.
    /// Rejections surface as `AppError::Auth` carrying the server message or
    /// the generic wrong-credentials text.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<Identity> {
        let credentials = validate_credentials(email, password)?;
        if let Err(e) = self.backend.authenticate(&credentials).await {
            warn!(target: "session", user = %credentials.email, error = %e, "login rejected");
            if self.current().is_loading() {
                self.publish(SessionState::Anonymous);
            }
            return Err(as_auth_error(e));
        }
        match self.backend.whoami().await {
            Ok(identity) => {
                info!(target: "session", user = %identity.email, role = %identity.role, "logged in");
                self.publish(SessionState::Authenticated(identity.clone()));
                Ok(identity)
            }
            Err(e) => {
                warn!(target: "session", error = %e, "identity check failed after login");
                self.publish(SessionState::Anonymous);
                Err(as_auth_error(e))
            }
        }
    }

    /// Ask the server to drop the credential, then clear local state no matter what.
    /// The server outcome is returned so the caller can report a failed call.
    pub async fn logout(&self) -> AppResult<()> {
        let result = self.backend.invalidate().await;
        if let Err(e) = &result {
            warn!(target: "session", error = %e, "server logout failed; clearing local session anyway");
        }
        self.publish(SessionState::Anonymous);
        info!(target: "session", "logged out");
        result
    }

    /// Drop the session after an authentication failure seen by a data call.
    pub fn expire(&self) {
        if self.state.borrow().identity().is_some() {
            warn!(target: "session", "credential rejected by server; session expired");
            self.publish(SessionState::Anonymous);
        }
    }

    fn publish(&self, next: SessionState) {
        self.state.send_modify(|current| {
            self.writes.fetch_add(1, Ordering::SeqCst);
            *current = next;
        });
    }
}

fn validate_credentials(email: &str, password: &str) -> AppResult<Credentials> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AppError::user("email_required", "Email is required"));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(AppError::user("email_invalid", "Email is not valid"));
    }
    if password.is_empty() {
        return Err(AppError::user("password_required", "Password is required"));
    }
    Ok(Credentials { email: email.to_string(), password: password.to_string() })
}

// Transport failures stay as they are; anything the server refused becomes an auth error.
fn as_auth_error(err: AppError) -> AppError {
    match err {
        AppError::Io { .. } | AppError::Decode { .. } | AppError::Internal { .. } => err,
        other => match other.server_message() {
            Some(m) => AppError::auth(SERVER_CODE, m),
            None => AppError::auth("invalid_credentials", WRONG_CREDENTIALS),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio::sync::Notify;

    struct FakeBackend {
        user: Identity,
        password: String,
        logged_in: Mutex<bool>,
        reject_message: Option<String>,
        fail_invalidate: bool,
        calls: Mutex<Vec<&'static str>>,
        held: Mutex<Option<Arc<Notify>>>,
    }

    impl FakeBackend {
        fn new(role: Role) -> Self {
            Self {
                user: Identity { id: 3, email: "cs1@shop.test".into(), role, name: None },
                password: "secret".into(),
                logged_in: Mutex::new(false),
                reject_message: None,
                fail_invalidate: false,
                calls: Mutex::new(Vec::new()),
                held: Mutex::new(None),
            }
        }

        // The next whoami answers from the state at call time, but only once released.
        fn hold_next_whoami(&self) -> Arc<Notify> {
            let release = Arc::new(Notify::new());
            *self.held.lock() = Some(release.clone());
            release
        }
    }

    #[async_trait]
    impl AuthBackend for FakeBackend {
        async fn whoami(&self) -> AppResult<Identity> {
            self.calls.lock().push("whoami");
            let answer = if *self.logged_in.lock() { Ok(self.user.clone()) } else { Err(AppError::from_status(401, None)) };
            let held = self.held.lock().take();
            if let Some(release) = held {
                release.notified().await;
            }
            answer
        }

        async fn authenticate(&self, credentials: &Credentials) -> AppResult<()> {
            self.calls.lock().push("authenticate");
            if credentials.email == self.user.email && credentials.password == self.password {
                *self.logged_in.lock() = true;
                Ok(())
            } else {
                Err(AppError::from_status(401, self.reject_message.clone()))
            }
        }

        async fn invalidate(&self) -> AppResult<()> {
            self.calls.lock().push("invalidate");
            *self.logged_in.lock() = false;
            if self.fail_invalidate { Err(AppError::io("network_error", "connection reset")) } else { Ok(()) }
        }
    }

    #[tokio::test]
    async fn initialize_without_credential_is_anonymous() {
        let store = SessionStore::new(Arc::new(FakeBackend::new(Role::Cs1)));
        assert_eq!(store.current(), SessionState::Loading);
        assert_eq!(store.initialize().await, SessionState::Anonymous);
        assert_eq!(store.ready().await, SessionState::Anonymous);
    }

    #[tokio::test]
    async fn initialize_restores_existing_session() {
        let backend = FakeBackend::new(Role::Cs2);
        *backend.logged_in.lock() = true;
        let store = SessionStore::new(Arc::new(backend));
        let state = store.initialize().await;
        assert_eq!(state.role(), Some(Role::Cs2));
    }

    #[tokio::test]
    async fn ready_waits_for_initialize() {
        let store = Arc::new(SessionStore::new(Arc::new(FakeBackend::new(Role::Cs1))));
        let waiter = {
            let store = store.clone();
            tokio::spawn(async move { store.ready().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        store.initialize().await;
        assert_eq!(waiter.await.unwrap(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn login_sets_role_from_server_and_notifies_subscribers() {
        let store = SessionStore::new(Arc::new(FakeBackend::new(Role::Cs1)));
        store.initialize().await;
        let mut rx = store.subscribe();
        rx.borrow_and_update();

        let id = store.login("cs1@shop.test", "secret").await.unwrap();
        assert_eq!(id.role, Role::Cs1);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().role(), Some(Role::Cs1));
    }

    #[tokio::test]
    async fn rejected_login_leaves_session_unset() {
        let store = SessionStore::new(Arc::new(FakeBackend::new(Role::Cs1)));
        store.initialize().await;
        let err = store.login("cs1@shop.test", "nope").await.unwrap_err();
        assert!(err.is_auth());
        assert_eq!(err.message(), WRONG_CREDENTIALS);
        assert_eq!(store.current(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn late_initialize_answer_does_not_undo_login() {
        let backend = Arc::new(FakeBackend::new(Role::Admin));
        let release = backend.hold_next_whoami();
        let store = Arc::new(SessionStore::new(backend.clone()));
        let init = {
            let store = store.clone();
            tokio::spawn(async move { store.initialize().await })
        };
        tokio::task::yield_now().await;
        assert!(!init.is_finished());

        store.login("cs1@shop.test", "secret").await.unwrap();
        release.notify_one();
        let settled = init.await.unwrap();
        assert_eq!(settled.role(), Some(Role::Admin));
        assert_eq!(store.current().role(), Some(Role::Admin));
    }

    #[tokio::test]
    async fn rejected_login_before_initialize_settles_anonymous() {
        let store = SessionStore::new(Arc::new(FakeBackend::new(Role::Buyer)));
        assert_eq!(store.current(), SessionState::Loading);
        assert!(store.login("cs1@shop.test", "nope").await.is_err());
        assert_eq!(store.current(), SessionState::Anonymous);
        assert_eq!(store.ready().await, SessionState::Anonymous);
    }

    #[tokio::test]
    async fn rejected_login_surfaces_server_message() {
        let mut backend = FakeBackend::new(Role::Buyer);
        backend.reject_message = Some("Account locked".into());
        let store = SessionStore::new(Arc::new(backend));
        let err = store.login("cs1@shop.test", "nope").await.unwrap_err();
        assert_eq!(err.server_message(), Some("Account locked"));
        assert_eq!(err.notice_text(WRONG_CREDENTIALS), "Account locked");
    }

    #[tokio::test]
    async fn invalid_form_never_reaches_server() {
        let backend = Arc::new(FakeBackend::new(Role::Buyer));
        let store = SessionStore::new(backend.clone());
        for (email, pass) in [("", "x"), ("not-an-email", "x"), ("a@b.co", "")] {
            let err = store.login(email, pass).await.unwrap_err();
            assert!(matches!(err, AppError::UserInput { .. }), "{email:?}: {err}");
        }
        assert!(backend.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn logout_clears_even_when_server_call_fails() {
        let mut backend = FakeBackend::new(Role::Admin);
        backend.fail_invalidate = true;
        let store = SessionStore::new(Arc::new(backend));
        store.login("cs1@shop.test", "secret").await.unwrap();
        assert!(store.logout().await.is_err());
        assert_eq!(store.current(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn logout_success_clears() {
        let store = SessionStore::new(Arc::new(FakeBackend::new(Role::Admin)));
        store.login("cs1@shop.test", "secret").await.unwrap();
        store.logout().await.unwrap();
        assert_eq!(store.current(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn expire_drops_authenticated_session_only() {
        let store = SessionStore::new(Arc::new(FakeBackend::new(Role::Buyer)));
        store.expire();
        assert_eq!(store.current(), SessionState::Loading);
        store.login("cs1@shop.test", "secret").await.unwrap();
        store.expire();
        assert_eq!(store.current(), SessionState::Anonymous);
    }
}
