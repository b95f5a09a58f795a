//! The Access Gate: stream-viewing decisions from local state plus remote
//! checks.
//!
//! Two independent flows grant access to a stream:
//!
//! - the one-time-code flow ([`session`]): a code bound to an email unlocks a
//!   five-hour local session that is *not* re-checked against the server on
//!   refresh;
//! - the membership flow ([`membership`]): a locally cached membership record
//!   that *is* re-validated against the server on every check.
//!
//! The asymmetry is deliberate and preserved from the deployed storefront:
//! once a code session is verified, refreshing within the window never
//! re-denies, while a membership check fails closed on any remote problem.
//! [`otp`] holds the email-OTP sub-flow that creates membership records.

pub mod membership;
pub mod otp;
pub mod session;

use std::sync::Arc;

use crate::api::ApiClient;
use crate::store::StateStore;

/// Gate over a state store and the remote API. Pages call its operations and
/// render the outcome; all purge/persist side effects happen in here.
#[derive(Clone)]
pub struct AccessGate {
    pub(crate) api: ApiClient,
    pub(crate) store: Arc<dyn StateStore>,
}

impl AccessGate {
    #[must_use]
    pub fn new(api: ApiClient, store: Arc<dyn StateStore>) -> Self {
        Self { api, store }
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    #[must_use]
    pub fn store(&self) -> &dyn StateStore {
        self.store.as_ref()
    }
}
