//! One-time-code flow: verify a code bound to an email, then hold a local
//! five-hour session.
//!
//! The session lives under the persistent `stream_verification` key with the
//! storefront's historical field names (`timestamp` is epoch milliseconds).
//! Within the window a check never goes back to the server; the stored IP is
//! refreshed opportunistically but never re-denies access.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::store::{self, keys, Scope, StateStore};

use super::AccessGate;

/// Session validity window.
const SESSION_TTL_MS: i64 = 5 * 60 * 60 * 1000;

/// Persisted verification session. Field names match the deployed storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSession {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub code: String,
    /// Best-effort client IP, informational only.
    #[serde(default)]
    pub ip: String,
    /// Issue time, epoch milliseconds.
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub verified: bool,
}

impl VerificationSession {
    fn is_complete(&self) -> bool {
        self.verified && !self.email.is_empty() && !self.code.is_empty() && self.timestamp > 0
    }

    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() - self.timestamp > SESSION_TTL_MS
    }
}

/// Outcome of a local session check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCheck {
    Granted,
    Denied(DenyReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No session stored; the viewer must verify a code.
    VerificationRequired,
    /// Stored session was malformed or incomplete and has been purged.
    InvalidData,
    /// Stored session aged out of the five-hour window and has been purged.
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("email and code are required")]
    FieldsRequired,
    /// The server rejected the code; the message is surfaced verbatim.
    #[error("{0}")]
    Rejected(String),
    #[error("code already used from a different IP address")]
    UsedFromDifferentIp,
    /// Transport or parse failure; nothing was persisted.
    #[error("verification failed, please try again")]
    Unavailable,
}

impl AccessGate {
    /// Check the stored session against the current time.
    ///
    /// Expired or malformed sessions are deleted, never silently reused. On
    /// the granted path the stored IP is refreshed when the current
    /// best-effort IP differs; that refresh is informational and never flips
    /// the decision.
    pub async fn check_session(&self) -> SessionCheck {
        self.check_session_at(Utc::now()).await
    }

    /// Clock-injected form of [`check_session`](Self::check_session).
    pub async fn check_session_at(&self, now: DateTime<Utc>) -> SessionCheck {
        let Some(raw) = self.store.get(Scope::Persistent, keys::STREAM_VERIFICATION) else {
            return SessionCheck::Denied(DenyReason::VerificationRequired);
        };

        let session: VerificationSession = match serde_json::from_str(&raw) {
            Ok(session) => session,
            Err(err) => {
                warn!(%err, "stored verification session is malformed, purging");
                self.purge_session();
                return SessionCheck::Denied(DenyReason::InvalidData);
            }
        };

        if !session.is_complete() {
            debug!("stored verification session is incomplete, purging");
            self.purge_session();
            return SessionCheck::Denied(DenyReason::InvalidData);
        }

        if session.is_expired_at(now) {
            debug!("stored verification session expired, purging");
            self.purge_session();
            return SessionCheck::Denied(DenyReason::Expired);
        }

        // Dynamic IPs are common; keep the stored value current so the
        // used-code re-entry path keeps working after an address change.
        let current_ip = self.api.best_effort_ip().await;
        if current_ip != session.ip {
            let mut refreshed = session;
            refreshed.ip = current_ip;
            store::set_json(
                self.store.as_ref(),
                Scope::Persistent,
                keys::STREAM_VERIFICATION,
                &refreshed,
            );
        }

        SessionCheck::Granted
    }

    /// Redeem a one-time code for a verification session.
    ///
    /// Remote steps run strictly in sequence: verify, then (for used codes)
    /// list to compare the bound IP, then consume. A session is persisted
    /// only on the granted paths; every failure leaves storage untouched.
    ///
    /// The bound-IP comparison is a best-effort one-viewer policy built on a
    /// self-reported address, not a security boundary.
    ///
    /// # Errors
    /// See [`SubmitError`] for the per-path failure semantics.
    pub async fn submit_code(&self, email: &str, code: &str) -> Result<VerificationSession, SubmitError> {
        self.submit_code_at(email, code, Utc::now()).await
    }

    /// Clock-injected form of [`submit_code`](Self::submit_code).
    pub async fn submit_code_at(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<VerificationSession, SubmitError> {
        let email = email.trim();
        let code = code.trim();
        if email.is_empty() || code.is_empty() {
            return Err(SubmitError::FieldsRequired);
        }

        let ip = self.api.best_effort_ip().await;

        let verify = self.api.verify_code(email, code).await.map_err(|err| {
            warn!(%err, "code verify call failed");
            SubmitError::Unavailable
        })?;

        let valid = verify.status && verify.data.as_ref().is_some_and(|data| data.is_valid);
        if !valid {
            let message = verify
                .message
                .unwrap_or_else(|| "code is invalid or expired".to_string());
            return Err(SubmitError::Rejected(message));
        }

        let used = verify.data.as_ref().is_some_and(|data| data.is_used);
        if used {
            return self.reenter_used_code(email, code, &ip, now).await;
        }

        let outcome = self.api.use_code(email, code).await.map_err(|err| {
            warn!(%err, "code use call failed");
            SubmitError::Unavailable
        })?;

        if !outcome.status {
            let message = outcome
                .message
                .unwrap_or_else(|| "failed to redeem code".to_string());
            return Err(SubmitError::Rejected(message));
        }

        Ok(self.persist_session(email, code, &ip, now))
    }

    /// A used code is still acceptable when its bound IP is unset or matches
    /// the caller's; the consume endpoint is not called again.
    async fn reenter_used_code(
        &self,
        email: &str,
        code: &str,
        ip: &str,
        now: DateTime<Utc>,
    ) -> Result<VerificationSession, SubmitError> {
        let list = self.api.list_codes(email).await.map_err(|err| {
            warn!(%err, "code list call failed");
            SubmitError::Unavailable
        })?;

        let records = list.data.map(|data| data.wotatokens).unwrap_or_default();
        let record = if list.status {
            records.into_iter().find(|record| record.code == code)
        } else {
            None
        };

        let Some(record) = record else {
            return Err(SubmitError::Rejected("code has already been used".to_string()));
        };

        match record.ip_address.as_deref() {
            Some(bound) if !bound.is_empty() && bound != ip => {
                Err(SubmitError::UsedFromDifferentIp)
            }
            _ => Ok(self.persist_session(email, code, ip, now)),
        }
    }

    fn persist_session(
        &self,
        email: &str,
        code: &str,
        ip: &str,
        now: DateTime<Utc>,
    ) -> VerificationSession {
        let session = VerificationSession {
            email: email.to_string(),
            code: code.to_string(),
            ip: ip.to_string(),
            timestamp: now.timestamp_millis(),
            verified: true,
        };
        store::set_json(
            self.store.as_ref(),
            Scope::Persistent,
            keys::STREAM_VERIFICATION,
            &session,
        );
        debug!(email, "verification session persisted");
        session
    }

    /// Drop the stored session unconditionally.
    pub fn logout(&self) {
        self.purge_session();
    }

    fn purge_session(&self) {
        self.store.remove(Scope::Persistent, keys::STREAM_VERIFICATION);
    }
}
