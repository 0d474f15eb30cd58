//! Session lifecycle.
//!
//! This module provides:
//! - `SessionRecord`: the token-keyed record a store persists
//! - `SessionValidator`: the timeout decision (New / Valid / Expired)
//! - `SessionStore` with in-memory and file-backed implementations
//! - `SessionLocks`: serialization of read-decide-write sequences
//!
//! Expiry is checked lazily on access; nothing sweeps in the background.

pub mod file;
pub mod lock;
pub mod memory;
pub mod record;
pub mod store;
pub mod validator;

pub use file::FileSessionStore;
pub use lock::{LockMode, SessionLease, SessionLocks};
pub use memory::MemorySessionStore;
pub use record::{format_timestamp, SessionRecord, EXPIRE_NOW, LAST_LOGIN_KEY, USERNAME_KEY};
pub use store::{SessionStore, StoreError};
pub use validator::{SessionIntent, SessionStatus, SessionValidator, INVALID_SESSION};
