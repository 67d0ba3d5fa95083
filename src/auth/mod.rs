//! Authentication state and session lifecycle.
//!
//! `SessionAuthority` is the single owner of the session: it resolves the
//! initial state from the store once at construction, and every later
//! transition (login, logout, a 401 observed by the HTTP client) goes
//! through it. Components that need to react to invalidation subscribe to
//! its event stream instead of watching storage.

use std::io;
use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

use crate::api::{ApiClient, ApiError};
use crate::models::{LoginPayload, LoginRequest, User};
use crate::notify::Notifier;
use crate::session::SessionStore;

/// The two authentication states. A token found at startup with a missing
/// or unreadable profile yields `Authenticated { user: None }` rather than
/// failing: the token, not the profile, is what gates access.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Anonymous,
    Authenticated { user: Option<User> },
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated { .. })
    }
}

/// Session lifecycle transitions, broadcast to whoever subscribes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A login completed and the session was persisted.
    Established,
    /// The user logged out locally.
    LoggedOut,
    /// The backend rejected the credential (401); the session was dropped.
    Expired,
}

pub struct SessionAuthority {
    store: SessionStore,
    state: ArcSwap<AuthState>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionAuthority {
    /// Wrap a store and resolve the initial state from it, once.
    pub fn new(store: SessionStore) -> Self {
        let initial = match store.token() {
            Some(_) => AuthState::Authenticated { user: store.user() },
            None => AuthState::Anonymous,
        };
        debug!(authenticated = initial.is_authenticated(), "Resolved startup session state");

        let (events, _) = broadcast::channel(16);
        Self {
            store,
            state: ArcSwap::from_pointee(initial),
            events,
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> AuthState {
        self.state.load().as_ref().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.load().is_authenticated()
    }

    pub fn user(&self) -> Option<User> {
        match self.state.load().as_ref() {
            AuthState::Authenticated { user } => user.clone(),
            AuthState::Anonymous => None,
        }
    }

    /// The bearer credential attached to outgoing requests.
    pub fn token(&self) -> Option<String> {
        self.store.token()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Persist a fresh session and transition to `Authenticated`.
    pub fn establish(&self, token: &str, user: &User) -> io::Result<()> {
        self.store.set_token(token)?;
        self.store.set_user(user)?;
        self.state.store(Arc::new(AuthState::Authenticated {
            user: Some(user.clone()),
        }));
        let _ = self.events.send(SessionEvent::Established);
        Ok(())
    }

    /// Drop the session after a local logout. Never calls the backend.
    pub fn logout(&self) {
        self.invalidate(SessionEvent::LoggedOut);
    }

    /// Drop the session after the backend rejected the credential. Called
    /// by the HTTP client on a 401 so storage and in-memory state move
    /// together.
    pub fn expire(&self) {
        self.invalidate(SessionEvent::Expired);
    }

    fn invalidate(&self, event: SessionEvent) {
        self.store.clear();
        self.state.store(Arc::new(AuthState::Anonymous));
        let _ = self.events.send(event);
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("Failed to persist session: {0}")]
    Persist(#[from] io::Error),
}

/// Login/logout operations over the HTTP client and the session authority.
pub struct Authenticator {
    api: Arc<ApiClient>,
    session: Arc<SessionAuthority>,
    notices: Notifier,
}

impl Authenticator {
    pub fn new(api: Arc<ApiClient>, session: Arc<SessionAuthority>, notices: Notifier) -> Self {
        Self {
            api,
            session,
            notices,
        }
    }

    /// `POST /login`. On success the token and user are persisted and the
    /// state flips to `Authenticated`. On failure the state is untouched
    /// and the error is returned so the caller can also react.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let request = LoginRequest { email, password };
        match self.api.post::<LoginPayload>("/login", &request).await {
            Ok(payload) => {
                self.session.establish(&payload.access_token, &payload.user)?;
                self.notices.success("Login successful");
                Ok(payload.user)
            }
            Err(err) => {
                self.notices.error("Invalid credentials");
                Err(err.into())
            }
        }
    }

    /// Purely local: clears the store and flips to `Anonymous`.
    pub fn logout(&self) {
        self.session.logout();
        self.notices.info("Logged out successfully");
    }
}
