//! Durable session store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use harbor_core::{BearerToken, Email, UserId};

use super::storage::{KeyValueStorage, NoopStorage, StorageError, probe_or_noop};
use crate::error::{clear_sentry_user, set_sentry_user};

/// Storage key of the persisted session record.
pub const SESSION_STORAGE_KEY: &str = "harbor.session";

/// The logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    pub email: Email,
    #[serde(default)]
    pub name: Option<String>,
    pub token: BearerToken,
}

/// Fields to shallow-merge into the current user. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionUserUpdate {
    pub email: Option<Email>,
    pub name: Option<String>,
    pub token: Option<BearerToken>,
}

/// The persisted record.
///
/// `is_authenticated` and `token` duplicate what `user` already says; they
/// are kept so the stored layout is self-describing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub user: Option<SessionUser>,
    pub is_authenticated: bool,
    pub token: Option<BearerToken>,
}

impl SessionRecord {
    fn from_user(user: Option<&SessionUser>) -> Self {
        Self {
            user: user.cloned(),
            is_authenticated: user.is_some(),
            token: user.map(|u| u.token.clone()),
        }
    }

    /// The user this record authenticates, if it is consistent.
    fn into_user(self) -> Option<SessionUser> {
        if self.is_authenticated { self.user } else { None }
    }
}

/// Read-only view of the authentication state that can wait for changes.
#[derive(Debug, Clone)]
pub struct AuthSignal {
    rx: watch::Receiver<Option<SessionUser>>,
}

impl AuthSignal {
    /// Current value.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Wait until the session changes, then return the new value.
    ///
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<bool> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().is_some())
    }
}

/// Holder of the logged-in identity and token.
///
/// In-memory state is authoritative for the running process; every change
/// is also written to storage on a best-effort basis so the next process
/// starts from it. Clones share state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    state: watch::Sender<Option<SessionUser>>,
    storage: Arc<dyn KeyValueStorage>,
}

impl SessionStore {
    /// Open the store on `storage`, restoring any persisted session.
    ///
    /// If `storage` fails its probe the store falls back to [`NoopStorage`]
    /// and behaves as in-memory only for this run. An unreadable or corrupt
    /// record is treated as logged out.
    #[must_use]
    pub fn open(storage: Arc<dyn KeyValueStorage>) -> Self {
        let storage = probe_or_noop(storage);

        let user = load_user(storage.as_ref());
        if let Some(user) = &user {
            tracing::info!(user_id = %user.id, "Restored session");
            set_sentry_user(&user.id, Some(user.email.as_str()));
        }

        let (state, _) = watch::channel(user);
        Self {
            inner: Arc::new(SessionStoreInner { state, storage }),
        }
    }

    /// A store that never persists.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::open(Arc::new(NoopStorage))
    }

    /// Install `user` as the logged-in user.
    pub fn login(&self, user: SessionUser) {
        tracing::info!(user_id = %user.id, "Logged in");
        set_sentry_user(&user.id, Some(user.email.as_str()));
        self.persist(Some(&user));
        self.inner.state.send_replace(Some(user));
    }

    /// Clear the logged-in user and persist the cleared record.
    pub fn logout(&self) {
        let previous = self.inner.state.send_replace(None);
        if let Some(user) = previous {
            tracing::info!(user_id = %user.id, "Logged out");
        }
        clear_sentry_user();
        self.persist(None);
    }

    /// Shallow-merge `update` into the current user.
    ///
    /// Returns `false` (and does nothing) when logged out.
    pub fn update_user(&self, update: SessionUserUpdate) -> bool {
        let mut updated = None;
        self.inner.state.send_if_modified(|current| {
            let Some(user) = current.as_mut() else {
                return false;
            };
            if let Some(email) = update.email {
                user.email = email;
            }
            if let Some(name) = update.name {
                user.name = Some(name);
            }
            if let Some(token) = update.token {
                user.token = token;
            }
            updated = Some(user.clone());
            true
        });

        match updated {
            Some(user) => {
                tracing::debug!(user_id = %user.id, "Updated session user");
                self.persist(Some(&user));
                true
            }
            None => false,
        }
    }

    /// The logged-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<SessionUser> {
        self.inner.state.borrow().clone()
    }

    /// The bearer token of the logged-in user, if any.
    #[must_use]
    pub fn token(&self) -> Option<BearerToken> {
        self.inner.state.borrow().as_ref().map(|u| u.token.clone())
    }

    /// Whether a user is logged in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_some()
    }

    /// Whether session changes outlive this process.
    #[must_use]
    pub fn is_durable(&self) -> bool {
        self.inner.storage.is_durable()
    }

    /// Subscribe to authentication changes.
    #[must_use]
    pub fn subscribe(&self) -> AuthSignal {
        AuthSignal {
            rx: self.inner.state.subscribe(),
        }
    }

    fn persist(&self, user: Option<&SessionUser>) {
        let result = serde_json::to_string(&SessionRecord::from_user(user))
            .map_err(StorageError::from)
            .and_then(|json| self.inner.storage.write(SESSION_STORAGE_KEY, &json));

        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist session");
        }
    }
}

fn load_user(storage: &dyn KeyValueStorage) -> Option<SessionUser> {
    let raw = match storage.read(SESSION_STORAGE_KEY) {
        Ok(raw) => raw?,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read persisted session");
            return None;
        }
    };

    match serde_json::from_str::<SessionRecord>(&raw) {
        Ok(record) => record.into_user(),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring corrupt session record");
            None
        }
    }
}
