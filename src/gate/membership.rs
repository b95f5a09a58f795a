//! Membership flow: a locally cached membership record re-validated against
//! the server on every check.
//!
//! Unlike the code flow, there is no refresh shortcut here: each check calls
//! the verification endpoint and fails closed on any remote problem. Every
//! deny purges the record; restoring access requires the verification flow.
//!
//! The record's `token` is generated locally by the OTP flow and never
//! validated by the server. It is a marker for display purposes, not an
//! authentication credential.

use chrono::{DateTime, Days, Months, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::store::{keys, Scope, StateStore};

use super::AccessGate;

/// Subscription tier. The backend stores English or Indonesian names
/// depending on which form wrote the row; both parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipType {
    Weekly,
    Monthly,
    Yearly,
}

impl MembershipType {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "weekly" | "mingguan" => Some(Self::Weekly),
            "monthly" | "bulanan" => Some(Self::Monthly),
            "yearly" | "tahunan" => Some(Self::Yearly),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
            Self::Yearly => "Yearly",
        }
    }

    /// Expiry for a membership registered at `registered`: 7 days, one
    /// calendar month, or one year.
    #[must_use]
    pub fn expiry(self, registered: DateTime<Utc>) -> DateTime<Utc> {
        let expiry = match self {
            Self::Weekly => registered.checked_add_days(Days::new(7)),
            Self::Monthly => registered.checked_add_months(Months::new(1)),
            Self::Yearly => registered.checked_add_months(Months::new(12)),
        };
        // Overflow is only reachable near the end of the representable
        // range; treat it as already expired.
        expiry.unwrap_or(registered)
    }
}

/// Persisted membership record. Field names and their camelCase aliases match
/// what the deployed verification pages wrote over time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MembershipRecord {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub whatsapp: String,
    #[serde(rename = "membershipType", alias = "membership_type", default)]
    pub membership_type: String,
    #[serde(
        rename = "registeredDate",
        alias = "registered_date",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub registered_date: Option<String>,
    /// Either a plain timestamp or an object with a `fullDate` field,
    /// depending on which page version wrote the record.
    #[serde(rename = "verifiedAt", default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<Value>,
}

impl MembershipRecord {
    /// Registration timestamp, falling back to `verifiedAt` (or its
    /// `fullDate` field) when the record predates `registeredDate`.
    #[must_use]
    pub fn registration_timestamp(&self) -> Option<String> {
        if let Some(date) = &self.registered_date {
            if !date.is_empty() {
                return Some(date.clone());
            }
        }
        match &self.verified_at {
            Some(Value::String(date)) if !date.is_empty() => Some(date.clone()),
            Some(Value::Object(map)) => map
                .get("fullDate")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        }
    }
}

/// Granted membership access with the derived display fields the viewer page
/// renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamAccess {
    pub playback_id: String,
    /// Masked local token; safe to expose as a player viewer id.
    pub viewer_id: String,
    pub email: String,
    pub membership_label: &'static str,
    pub remaining: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MembershipError {
    #[error("missing stream id")]
    MissingStreamId,
    /// No record stored at all; nothing to purge.
    #[error("no active membership")]
    NotFound,
    /// Stored record could not be interpreted and has been purged.
    #[error("membership data invalid")]
    Malformed,
    #[error("membership data incomplete: missing {0}")]
    MissingField(&'static str),
    /// The server no longer verifies this membership, or could not be asked.
    #[error("membership invalid or removed")]
    NotVerified,
    #[error("membership expired")]
    Expired,
}

impl AccessGate {
    /// Decide whether the stored membership grants access to `stream_id`.
    ///
    /// Steps: local field validation, server re-validation, expiry check.
    /// Every deny except [`MembershipError::MissingStreamId`] and
    /// [`MembershipError::NotFound`] purges the stored record.
    ///
    /// # Errors
    /// See [`MembershipError`]; a single remote failure is a hard deny.
    pub async fn check_membership(&self, stream_id: &str) -> Result<StreamAccess, MembershipError> {
        self.check_membership_at(stream_id, Utc::now()).await
    }

    /// Clock-injected form of [`check_membership`](Self::check_membership).
    pub async fn check_membership_at(
        &self,
        stream_id: &str,
        now: DateTime<Utc>,
    ) -> Result<StreamAccess, MembershipError> {
        if stream_id.trim().is_empty() {
            return Err(MembershipError::MissingStreamId);
        }

        let Some(raw) = self.store.get(Scope::Persistent, keys::VERIFIED_USER) else {
            return Err(MembershipError::NotFound);
        };

        let record: MembershipRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(err) => {
                warn!(%err, "stored membership record is malformed, purging");
                self.purge_membership();
                return Err(MembershipError::Malformed);
            }
        };

        if record.token.is_empty() {
            self.purge_membership();
            return Err(MembershipError::MissingField("token"));
        }
        if record.membership_type.is_empty() {
            self.purge_membership();
            return Err(MembershipError::MissingField("membership type"));
        }
        if record.email.is_empty() || record.whatsapp.is_empty() {
            self.purge_membership();
            return Err(MembershipError::MissingField("email or whatsapp"));
        }

        if !self.revalidate(&record).await {
            self.purge_membership();
            return Err(MembershipError::NotVerified);
        }

        let Some(registered_raw) = record.registration_timestamp() else {
            self.purge_membership();
            return Err(MembershipError::MissingField("registered date"));
        };
        let Some(registered) = parse_timestamp(&registered_raw) else {
            warn!(registered = %registered_raw, "unparseable registration date, purging");
            self.purge_membership();
            return Err(MembershipError::Expired);
        };

        let Some(membership_type) = MembershipType::parse(&record.membership_type) else {
            warn!(membership_type = %record.membership_type, "unknown membership type, purging");
            self.purge_membership();
            return Err(MembershipError::Malformed);
        };

        let expiry = membership_type.expiry(registered);
        if now > expiry {
            debug!(%expiry, "membership expired, purging");
            self.purge_membership();
            return Err(MembershipError::Expired);
        }

        Ok(StreamAccess {
            playback_id: stream_id.to_string(),
            viewer_id: mask_token(&record.token),
            email: record.email,
            membership_label: membership_type.label(),
            remaining: remaining_label(expiry, now),
        })
    }

    /// Ask the server whether this membership is still on the books.
    /// Any transport or parse failure counts as not-verified.
    async fn revalidate(&self, record: &MembershipRecord) -> bool {
        let response = match self
            .api
            .check_verified(&record.email, &record.whatsapp)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(%err, "membership check call failed");
                return false;
            }
        };

        if !response.success {
            return false;
        }

        response
            .data
            .as_ref()
            .map(interpret_verification)
            .unwrap_or(false)
    }

    /// Remove the membership record and its companion token marker.
    pub fn purge_membership(&self) {
        self.store.remove(Scope::Persistent, keys::VERIFIED_USER);
        self.store.remove(Scope::Persistent, keys::VERIFIED_TOKEN);
    }
}

/// Ordered-fallback decision table for the server's verified flag. Different
/// backend versions expose it as `status_pengecekan_` (boolean-ish), then
/// `status == "valid"`, then `column_3` (boolean-ish); the first field
/// present wins and absence means not verified.
#[must_use]
pub fn interpret_verification(data: &Value) -> bool {
    if let Some(flag) = data.get("status_pengecekan_") {
        return truthy(flag);
    }
    if let Some(status) = data.get("status") {
        return status
            .as_str()
            .map(|s| s.eq_ignore_ascii_case("valid"))
            .unwrap_or(false);
    }
    if let Some(flag) = data.get("column_3") {
        return truthy(flag);
    }
    false
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => text.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn remaining_label(expiry: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (expiry - now).num_seconds();
    if seconds <= 0 {
        return "expired".to_string();
    }
    let days = (seconds + 86_399) / 86_400;
    format!("{days} days left")
}

fn mask_token(token: &str) -> String {
    match token.get(..6) {
        Some(prefix) if token.len() > 6 => format!("viewer-{prefix}****"),
        _ => format!("viewer-{token}"),
    }
}
