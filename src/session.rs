use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tokio::sync::broadcast;

use crate::{
    auth::validate_refresh_token,
    models::{AuthPayload, Department, Role, User, UserPatch},
    storage::{AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY, StorageState, USER_DATA_KEY},
};

/// Session
///
/// The in-memory view of who is signed in. Authenticated iff both the access
/// token and the user are present; the refresh token alone does not count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<User>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.user.is_some()
    }

    /// True iff a user is present and its role is one of `roles`.
    pub fn has_role(&self, roles: &[Role]) -> bool {
        self.user
            .as_ref()
            .is_some_and(|user| roles.contains(&user.role))
    }

    pub fn has_department(&self, departments: &[Department]) -> bool {
        self.user
            .as_ref()
            .is_some_and(|user| departments.contains(&user.department))
    }

    pub fn requires_password_change(&self) -> bool {
        self.user
            .as_ref()
            .is_some_and(|user| user.must_change_password)
    }

    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|user| user.role)
    }
}

/// Changes observers can subscribe to (e.g. a UI shell or the CLI).
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SignedIn { user_id: u64 },
    Restored { user_id: u64 },
    Refreshed,
    UserUpdated { user_id: u64 },
    Cleared,
}

const EVENT_CAPACITY: usize = 32;

/// SessionStore
///
/// Session State Holder. Owns the current [`Session`] and mirrors every
/// mutation into durable storage under three independent keys.
///
/// Mutations never fail: a storage fault is logged and the in-memory session
/// still changes, so the running client stays consistent even when the disk
/// does not.
pub struct SessionStore {
    inner: RwLock<Session>,
    storage: StorageState,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    /// Creates an empty store. Call [`SessionStore::restore_auth`] to load a
    /// persisted session.
    pub fn new(storage: StorageState) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: RwLock::new(Session::default()),
            storage,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    // --- Read access ---

    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh_token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    pub fn has_role(&self, roles: &[Role]) -> bool {
        self.read().has_role(roles)
    }

    pub fn has_department(&self, departments: &[Department]) -> bool {
        self.read().has_department(departments)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(&[Role::Admin, Role::Manager])
    }

    pub fn requires_password_change(&self) -> bool {
        self.read().requires_password_change()
    }

    // --- Mutations ---

    /// set_auth
    ///
    /// Stores both tokens and the user after a successful login. The server
    /// reports a pending forced password change next to the user, so it is
    /// folded into `must_change_password` here.
    pub fn set_auth(&self, payload: &AuthPayload) {
        let mut user = payload.user.clone();
        if payload.require_password_change {
            user.must_change_password = true;
        }
        let user_id = user.id;

        {
            let mut session = self.write();
            session.access_token = Some(payload.token.clone());
            session.refresh_token = Some(payload.refresh_token.clone());
            session.user = Some(user.clone());
        }

        self.persist(AUTH_TOKEN_KEY, &payload.token);
        self.persist(REFRESH_TOKEN_KEY, &payload.refresh_token);
        self.persist_user(&user);

        tracing::info!(user_id, role = %payload.user.role, "Session established");
        let _ = self.events.send(SessionEvent::SignedIn { user_id });
    }

    /// Replaces both tokens after a successful refresh, keeping the user.
    pub fn update_tokens(&self, access_token: &str, refresh_token: &str) {
        {
            let mut session = self.write();
            session.access_token = Some(access_token.to_string());
            session.refresh_token = Some(refresh_token.to_string());
        }

        self.persist(AUTH_TOKEN_KEY, access_token);
        self.persist(REFRESH_TOKEN_KEY, refresh_token);

        tracing::debug!("Session tokens rotated");
        let _ = self.events.send(SessionEvent::Refreshed);
    }

    /// Replaces the user wholesale without touching the tokens.
    pub fn set_user(&self, user: User) {
        let user_id = user.id;
        self.write().user = Some(user.clone());
        self.persist_user(&user);
        let _ = self.events.send(SessionEvent::UserUpdated { user_id });
    }

    /// Field-patches the current user. Returns the updated user, or `None`
    /// when nobody is signed in.
    pub fn patch_user(&self, patch: UserPatch) -> Option<User> {
        let updated = {
            let mut session = self.write();
            let user = session.user.as_mut()?;
            user.apply(patch);
            user.clone()
        };

        self.persist_user(&updated);
        let _ = self.events.send(SessionEvent::UserUpdated { user_id: updated.id });
        Some(updated)
    }

    /// clear_auth
    ///
    /// Drops the in-memory session and every persisted key. Idempotent.
    pub fn clear_auth(&self) {
        let was_present = {
            let mut session = self.write();
            let was_present = *session != Session::default();
            *session = Session::default();
            was_present
        };

        for key in [AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_DATA_KEY] {
            if let Err(err) = self.storage.remove(key) {
                tracing::warn!(key, error = %err, "Failed to remove persisted session key");
            }
        }

        if was_present {
            tracing::info!("Session cleared");
            let _ = self.events.send(SessionEvent::Cleared);
        }
    }

    /// restore_auth
    ///
    /// Loads the persisted session. The refresh token must pass the local
    /// structural check (three segments, decodable payload, unexpired `exp`)
    /// and the user must parse; otherwise the persisted session is wiped.
    ///
    /// The access token is restored as-is. An expired one is discovered by the
    /// first request that gets a 401, which the refresh coordinator handles.
    ///
    /// Returns `true` when a session was restored.
    pub fn restore_auth(&self) -> bool {
        let token = self.storage.get(AUTH_TOKEN_KEY);
        let refresh_token = self.storage.get(REFRESH_TOKEN_KEY);
        let user_raw = self.storage.get(USER_DATA_KEY);

        if token.is_none() && refresh_token.is_none() && user_raw.is_none() {
            return false;
        }

        let (Some(token), Some(refresh_token), Some(user_raw)) = (token, refresh_token, user_raw)
        else {
            tracing::warn!("Persisted session is incomplete, clearing");
            self.clear_auth();
            return false;
        };

        if let Err(err) = validate_refresh_token(&refresh_token, Utc::now()) {
            tracing::warn!(error = %err, "Persisted refresh token rejected, clearing session");
            self.clear_auth();
            return false;
        }

        let user: User = match serde_json::from_str(&user_raw) {
            Ok(user) => user,
            Err(err) => {
                tracing::warn!(error = %err, "Persisted user data is malformed, clearing session");
                self.clear_auth();
                return false;
            }
        };
        let user_id = user.id;

        *self.write() = Session {
            access_token: Some(token),
            refresh_token: Some(refresh_token),
            user: Some(user),
        };

        tracing::info!(user_id, "Session restored from storage");
        let _ = self.events.send(SessionEvent::Restored { user_id });
        true
    }

    // --- Internals ---

    fn persist(&self, key: &str, value: &str) {
        if let Err(err) = self.storage.set(key, value) {
            tracing::warn!(key, error = %err, "Failed to persist session key");
        }
    }

    fn persist_user(&self, user: &User) {
        match serde_json::to_string(user) {
            Ok(raw) => self.persist(USER_DATA_KEY, &raw),
            Err(err) => tracing::warn!(error = %err, "Failed to serialize user for storage"),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
