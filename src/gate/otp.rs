//! Email OTP sub-flow for the membership verification page.
//!
//! State machine: `Idle -> Sent -> Verified`, with a resend loop on failed
//! attempts. The resend cooldown is enforced client-side, so a premature
//! resend never reaches the network. A successful verification writes the
//! membership record with a locally generated token; that token is a display
//! marker only and carries no server-side meaning.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::store::{self, keys, Scope, StateStore};
use crate::validate;

use super::membership::{MembershipRecord, MembershipType};

/// Server-side default when the send response omits `cooldownSeconds`.
pub const DEFAULT_COOLDOWN_SECONDS: u64 = 60;

const TOKEN_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpState {
    Idle,
    Sent {
        cooldown_until: DateTime<Utc>,
        remaining_attempts: Option<u32>,
    },
    Verified,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OtpError {
    #[error("enter a valid email address")]
    InvalidEmail,
    #[error("wait {0} seconds before requesting another code")]
    CooldownActive(i64),
    #[error("request a code first")]
    NotRequested,
    #[error("enter the 6-digit code")]
    InvalidCode,
    #[error("already verified")]
    AlreadyVerified,
    /// The server refused; its message is surfaced verbatim.
    #[error("{0}")]
    Rejected(String),
    #[error("verification failed, please try again")]
    Unavailable,
}

/// One verification page's OTP flow. Holds the transient state between the
/// send and verify calls; the durable outcome is the membership record it
/// persists on success.
pub struct OtpFlow {
    api: ApiClient,
    store: Arc<dyn StateStore>,
    state: OtpState,
}

impl OtpFlow {
    #[must_use]
    pub fn new(api: ApiClient, store: Arc<dyn StateStore>) -> Self {
        Self {
            api,
            store,
            state: OtpState::Idle,
        }
    }

    #[must_use]
    pub fn state(&self) -> &OtpState {
        &self.state
    }

    /// Seconds left before a resend is allowed, zero when none.
    #[must_use]
    pub fn cooldown_remaining_at(&self, now: DateTime<Utc>) -> i64 {
        match &self.state {
            OtpState::Sent { cooldown_until, .. } => (*cooldown_until - now).num_seconds().max(0),
            _ => 0,
        }
    }

    /// Request (or re-request) an OTP email.
    ///
    /// # Errors
    /// Refused client-side while the cooldown is running or after the flow
    /// already verified; server refusals carry the server message.
    pub async fn send_otp(&mut self, email: &str) -> Result<(), OtpError> {
        self.send_otp_at(email, Utc::now()).await
    }

    /// Clock-injected form of [`send_otp`](Self::send_otp).
    pub async fn send_otp_at(&mut self, email: &str, now: DateTime<Utc>) -> Result<(), OtpError> {
        if self.state == OtpState::Verified {
            return Err(OtpError::AlreadyVerified);
        }
        if !validate::is_valid_email(email.trim()) {
            return Err(OtpError::InvalidEmail);
        }

        let remaining = self.cooldown_remaining_at(now);
        if remaining > 0 {
            debug!(remaining, "resend refused during cooldown");
            return Err(OtpError::CooldownActive(remaining));
        }

        let response = self
            .api
            .send_otp(email.trim(), "membership")
            .await
            .map_err(|err| {
                warn!(%err, "OTP send call failed");
                OtpError::Unavailable
            })?;

        if !response.success {
            // stays in the previous state; the viewer may retry immediately
            let message = response
                .message
                .unwrap_or_else(|| "failed to send code".to_string());
            return Err(OtpError::Rejected(message));
        }

        let cooldown = response
            .data
            .and_then(|data| data.cooldown_seconds)
            .unwrap_or(DEFAULT_COOLDOWN_SECONDS);
        self.state = OtpState::Sent {
            cooldown_until: now + Duration::seconds(cooldown as i64),
            remaining_attempts: None,
        };
        Ok(())
    }

    /// Verify the 6-digit code and, on success, persist the membership
    /// record for `email`/`whatsapp` with the purchased tier.
    ///
    /// # Errors
    /// Malformed codes are refused without a network call; a server
    /// rejection keeps the flow in `Sent` with the reported remaining
    /// attempts.
    pub async fn verify_otp(
        &mut self,
        email: &str,
        whatsapp: &str,
        membership_type: MembershipType,
        code: &str,
    ) -> Result<MembershipRecord, OtpError> {
        self.verify_otp_at(email, whatsapp, membership_type, code, Utc::now())
            .await
    }

    /// Clock-injected form of [`verify_otp`](Self::verify_otp).
    pub async fn verify_otp_at(
        &mut self,
        email: &str,
        whatsapp: &str,
        membership_type: MembershipType,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<MembershipRecord, OtpError> {
        match self.state {
            OtpState::Verified => return Err(OtpError::AlreadyVerified),
            OtpState::Idle => return Err(OtpError::NotRequested),
            OtpState::Sent { .. } => {}
        }
        if !validate::is_six_digits(code.trim()) {
            return Err(OtpError::InvalidCode);
        }

        let response = self
            .api
            .verify_otp(email.trim(), code.trim())
            .await
            .map_err(|err| {
                warn!(%err, "OTP verify call failed");
                OtpError::Unavailable
            })?;

        if !response.success {
            if let OtpState::Sent {
                remaining_attempts, ..
            } = &mut self.state
            {
                *remaining_attempts = response.remaining_attempts;
            }
            let message = response
                .message
                .unwrap_or_else(|| "incorrect code".to_string());
            return Err(OtpError::Rejected(message));
        }

        let record = MembershipRecord {
            token: generate_token(),
            email: email.trim().to_string(),
            whatsapp: whatsapp.trim().to_string(),
            membership_type: serialize_type(membership_type),
            registered_date: Some(now.to_rfc3339()),
            verified_at: Some(serde_json::Value::String(now.to_rfc3339())),
        };
        store::set_json(
            self.store.as_ref(),
            Scope::Persistent,
            keys::VERIFIED_USER,
            &record,
        );
        self.store
            .set(Scope::Persistent, keys::VERIFIED_TOKEN, &record.token);

        debug!(email, "OTP verified, membership record persisted");
        self.state = OtpState::Verified;
        Ok(record)
    }
}

fn serialize_type(membership_type: MembershipType) -> String {
    match membership_type {
        MembershipType::Weekly => "weekly",
        MembershipType::Monthly => "monthly",
        MembershipType::Yearly => "yearly",
    }
    .to_string()
}

/// 32 random alphanumeric characters. Not a credential: the server never
/// sees or validates it, it only marks the record as locally issued.
fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}
