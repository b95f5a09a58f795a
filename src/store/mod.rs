//! Injected key/value state store.
//!
//! The original storefront keeps its state in browser storage: tab-lifetime
//! entries (login markers) and persistent entries (verification sessions,
//! membership records). Modeling that storage as a trait keeps the gate logic
//! testable and leaves the actual backing (web storage, a file, a test map)
//! to the embedder.
//!
//! Keys are shared with the deployed storefront, so the exact names in
//! [`keys`] matter for compatibility.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

/// Storage keys used by the storefront. Renaming any of these breaks
/// compatibility with state written by the deployed pages.
pub mod keys {
    /// Persistent one-time-code verification session.
    pub const STREAM_VERIFICATION: &str = "stream_verification";
    /// Persistent verified membership record.
    pub const VERIFIED_USER: &str = "jkt48_verified_user";
    /// Persistent auth-token marker written alongside the membership record.
    pub const VERIFIED_TOKEN: &str = "jkt48_auth_token";
    /// Tab-scoped login marker.
    pub const USER_LOGIN: &str = "userLogin";
    /// Tab-scoped post-registration marker.
    pub const USER_REGISTRATION: &str = "userRegistration";
    /// Tab-scoped raw auth token.
    pub const AUTH_TOKEN: &str = "authToken";
    /// Persistent successful-registration marker.
    pub const SUCCESSFUL_REGISTRATION: &str = "successfulRegistration";
    /// Persistent saved registration form draft.
    pub const REGISTER_FORM_DATA: &str = "registerFormData";
    /// Persistent shopping cart contents.
    pub const CART: &str = "cart";
}

/// Storage scope, mirroring `sessionStorage` vs `localStorage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Lives for the current tab only.
    Tab,
    /// Survives across visits.
    Persistent,
}

/// Key/value storage seam used by the gate, auth and OTP flows.
///
/// Reads and writes are unsynchronized across tabs by design; the flows run
/// single-threaded and tolerate stale values by re-validating on use.
pub trait StateStore: Send + Sync {
    fn get(&self, scope: Scope, key: &str) -> Option<String>;
    fn set(&self, scope: Scope, key: &str, value: &str);
    fn remove(&self, scope: Scope, key: &str);
}

/// Read a JSON value from the store, treating malformed JSON as absent.
///
/// Callers that own the key are expected to purge it when a read comes back
/// `None` for a key that `get` says exists; the per-flow rules decide that.
pub fn get_json<T: DeserializeOwned>(store: &dyn StateStore, scope: Scope, key: &str) -> Option<T> {
    let raw = store.get(scope, key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, %err, "stored value is not valid JSON");
            None
        }
    }
}

/// Serialize a value into the store as JSON.
pub fn set_json<T: Serialize>(store: &dyn StateStore, scope: Scope, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => store.set(scope, key, &raw),
        Err(err) => warn!(key, %err, "failed to serialize value for storage"),
    }
}

/// In-memory [`StateStore`], the default backing for tests and native hosts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tab: Mutex<HashMap<String, String>>,
    persistent: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, scope: Scope) -> &Mutex<HashMap<String, String>> {
        match scope {
            Scope::Tab => &self.tab,
            Scope::Persistent => &self.persistent,
        }
    }
}

impl StateStore for MemoryStore {
    fn get(&self, scope: Scope, key: &str) -> Option<String> {
        self.map(scope)
            .lock()
            .ok()
            .and_then(|map| map.get(key).cloned())
    }

    fn set(&self, scope: Scope, key: &str, value: &str) {
        if let Ok(mut map) = self.map(scope).lock() {
            map.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, scope: Scope, key: &str) {
        if let Ok(mut map) = self.map(scope).lock() {
            map.remove(key);
        }
    }
}
