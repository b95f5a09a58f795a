//! Wire types for the storefront API.
//!
//! The backend is inconsistent about envelopes: the dashboard and code
//! endpoints report success as `status`, the OTP/verification endpoints as
//! `success`, and the Mux listings nest a page inside `data.data`. Fields the
//! backend sometimes omits are defaulted so a sparse response still parses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// --- dashboard ---

#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub whatsapp: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<LoginData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    pub token: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub user: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<RegisterData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterData {
    #[serde(default)]
    pub user: Option<Value>,
}

// --- one-time codes ---

#[derive(Debug, Clone, Deserialize)]
pub struct CodeVerifyResponse {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub data: Option<CodeVerifyData>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CodeVerifyData {
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default)]
    pub is_used: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeListResponse {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub data: Option<CodeListData>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CodeListData {
    #[serde(default)]
    pub wotatokens: Vec<CodeRecord>,
}

/// One issued code and the IP it was first redeemed from, if any.
#[derive(Debug, Clone, Deserialize)]
pub struct CodeRecord {
    pub code: String,
    #[serde(default)]
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeUseResponse {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub message: Option<String>,
}

// --- OTP ---

#[derive(Debug, Clone, Deserialize)]
pub struct OtpSendResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<OtpSendData>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OtpSendData {
    #[serde(rename = "cooldownSeconds", default)]
    pub cooldown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtpVerifyResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(rename = "remainingAttempts", default)]
    pub remaining_attempts: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
}

// --- membership verification ---

/// `data` is kept as raw JSON: the verified flag arrives under one of three
/// different field names depending on backend version, and the membership
/// columns are equally unstable. The gate interprets it with an explicit
/// ordered fallback.
#[derive(Debug, Clone, Deserialize)]
pub struct MembershipCheckResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

// --- Mux listings ---

#[derive(Debug, Clone, Deserialize)]
pub struct LiveStreamsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<LiveStreamPage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LiveStreamPage {
    #[serde(default)]
    pub data: Vec<LiveStreamInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveStreamInfo {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub playback_ids: Vec<PlaybackId>,
    #[serde(default)]
    pub stream_key: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackId {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<AssetPage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetPage {
    #[serde(default)]
    pub data: Vec<AssetInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetInfo {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub playback_ids: Vec<PlaybackId>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub recording_times: Vec<RecordingTime>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordingTime {
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
}

// --- IP lookup ---

#[derive(Debug, Clone, Deserialize)]
pub struct IpResponse {
    pub ip: String,
}
