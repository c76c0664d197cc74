/// Session and preferences store
///
/// Process-wide client state: the sidebar-collapsed flag, the dark-mode flag,
/// the auth token and the signed-in user. The store is an explicit context
/// object; clone it into whatever needs it.
///
/// # Invariants
///
/// - Token and user are set together by [`SessionStore::sign_in`] and cleared
///   together by [`SessionStore::sign_out`]. A snapshot never shows one
///   without the other.
/// - Every mutation is written back through the [`SessionPersistence`]
///   boundary; the store is rehydrated from it at startup.
///
/// # Example
///
/// ```
/// use taskboard_shared::session::{SessionStore, MemoryPersistence};
/// use taskboard_shared::models::user::{Role, User};
/// use std::sync::Arc;
///
/// let store = SessionStore::load(Arc::new(MemoryPersistence::default()));
/// store.sign_in("token".to_string(), User {
///     user_id: Some(1),
///     username: "bob".to_string(),
///     role: Role::Developer,
///     profile_picture_url: None,
///     organization_id: Some(1),
/// });
/// assert!(store.snapshot().is_signed_in());
/// ```

mod persistence;

pub use persistence::{FilePersistence, MemoryPersistence, SessionError, SessionPersistence};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

use crate::models::user::{Role, User};

/// Snapshot of the session state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub is_sidebar_collapsed: bool,
    pub is_dark_mode: bool,
    pub token: Option<String>,
    pub user: Option<User>,
}

impl SessionState {
    /// True when both token and user are present
    pub fn is_signed_in(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }

    /// Role of the signed-in user
    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|u| u.role)
    }

    /// Drops a half-present credential pair
    fn normalized(mut self) -> Self {
        if self.token.is_none() || self.user.is_none() {
            self.token = None;
            self.user = None;
        }
        self
    }
}

/// Shared session store
#[derive(Clone)]
pub struct SessionStore {
    state: Arc<watch::Sender<SessionState>>,
    persistence: Arc<dyn SessionPersistence>,
}

impl SessionStore {
    /// Rehydrates the store from persisted state
    ///
    /// Unreadable persisted state is logged and replaced with an empty session.
    pub fn load(persistence: Arc<dyn SessionPersistence>) -> Self {
        let initial = match persistence.load() {
            Ok(Some(state)) => state.normalized(),
            Ok(None) => SessionState::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load persisted session, starting empty");
                SessionState::default()
            }
        };

        let (tx, _rx) = watch::channel(initial);
        SessionStore {
            state: Arc::new(tx),
            persistence,
        }
    }

    /// Returns a consistent copy of the current state
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Current bearer token, if signed in
    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    /// Current user, if signed in
    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    /// Subscribes to state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn set_sidebar_collapsed(&self, collapsed: bool) {
        self.update(|state| state.is_sidebar_collapsed = collapsed);
    }

    pub fn set_dark_mode(&self, dark: bool) {
        self.update(|state| state.is_dark_mode = dark);
    }

    /// Stores token and user in one step after a successful sign-in
    pub fn sign_in(&self, token: String, user: User) {
        tracing::info!(username = %user.username, role = %user.role, "Session signed in");
        self.update(|state| {
            state.token = Some(token);
            state.user = Some(user);
        });
    }

    /// Clears token and user in one step
    pub fn sign_out(&self) {
        tracing::info!("Session signed out");
        self.update(|state| {
            state.token = None;
            state.user = None;
        });
    }

    /// Replaces the signed-in user, keeping the token
    ///
    /// Returns `false` (and changes nothing) when nobody is signed in.
    pub fn replace_user(&self, user: User) -> bool {
        let mut replaced = false;
        self.update(|state| {
            if state.token.is_some() {
                state.user = Some(user);
                replaced = true;
            }
        });
        replaced
    }

    /// Applies a freshly fetched copy of the signed-in user
    ///
    /// The store is updated only when the username matches and the role
    /// differs from the cached one. Returns whether the user was replaced.
    pub fn sync_fetched_user(&self, fetched: &User) -> bool {
        let needs_update = {
            let state = self.state.borrow();
            match &state.user {
                Some(current) => {
                    current.username == fetched.username && current.role != fetched.role
                }
                None => false,
            }
        };

        if !needs_update {
            return false;
        }

        tracing::info!(
            username = %fetched.username,
            role = %fetched.role,
            "Server role differs from session, updating"
        );
        self.replace_user(fetched.clone())
    }

    fn update<F>(&self, mutate: F)
    where
        F: FnOnce(&mut SessionState),
    {
        self.state.send_modify(mutate);

        let snapshot = self.snapshot();
        if let Err(e) = self.persistence.save(&snapshot) {
            tracing::warn!(error = %e, "Failed to persist session");
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("SessionStore")
            .field("signed_in", &state.is_signed_in())
            .field("is_dark_mode", &state.is_dark_mode)
            .field("is_sidebar_collapsed", &state.is_sidebar_collapsed)
            .finish()
    }
}
