//! Logged-in session and the storage it persists to.

mod storage;
mod store;

pub use storage::{
    FileStorage, KeyValueStorage, MemoryStorage, NoopStorage, StorageError, probe_or_noop,
};
pub use store::{
    AuthSignal, SESSION_STORAGE_KEY, SessionRecord, SessionStore, SessionUser, SessionUserUpdate,
};
