//! End-to-end exercises of the access flows against a mock backend:
//! redeem a code, survive a refresh, expire, and the parallel membership
//! path from OTP verification through a gated stream check.

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use streamgate::gate::otp::OtpFlow;
use streamgate::store::keys;
use streamgate::{
    AccessGate, ApiClient, Config, DenyReason, MembershipError, MembershipType, MemoryStore,
    Scope, SessionCheck, StateStore,
};

fn build(server: &MockServer) -> Result<(AccessGate, Arc<MemoryStore>, ApiClient)> {
    let store = Arc::new(MemoryStore::new());
    let config = Config::new()
        .with_api_base(server.uri())
        .with_verify_base(server.uri())
        .with_ip_lookup_url(format!("{}/ip", server.uri()));
    let api = ApiClient::new(config)?;
    let gate = AccessGate::new(api.clone(), store.clone());
    Ok((gate, store, api))
}

async fn mount_ip(server: &MockServer, ip: &str) {
    Mock::given(method("GET"))
        .and(path("/ip"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ip": ip })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn code_redemption_then_refresh_then_expiry() -> Result<()> {
    let server = MockServer::start().await;
    mount_ip(&server, "1.2.3.4").await;
    Mock::given(method("POST"))
        .and(path("/api/codes/verify"))
        .and(body_json(json!({
            "email": "a@b.com",
            "code": "ABC123",
            "apikey": "JKTCONNECT",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "data": { "is_valid": true, "is_used": false }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/codes/use"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": true })))
        .mount(&server)
        .await;

    let (gate, store, _api) = build(&server)?;
    let now = Utc::now();

    // before any redemption the gate asks for verification
    assert_eq!(
        gate.check_session_at(now).await,
        SessionCheck::Denied(DenyReason::VerificationRequired)
    );

    let session = gate.submit_code_at("a@b.com", "ABC123", now).await?;
    assert!(session.verified);
    assert_eq!(session.email, "a@b.com");
    assert_eq!(session.code, "ABC123");

    // a refresh within the window grants without touching the code endpoints
    assert_eq!(
        gate.check_session_at(now + Duration::hours(4)).await,
        SessionCheck::Granted
    );

    // past the five-hour window the session is purged
    assert_eq!(
        gate.check_session_at(now + Duration::hours(5) + Duration::minutes(1))
            .await,
        SessionCheck::Denied(DenyReason::Expired)
    );
    assert!(store
        .get(Scope::Persistent, keys::STREAM_VERIFICATION)
        .is_none());
    Ok(())
}

#[tokio::test]
async fn otp_verification_unlocks_membership_gate() -> Result<()> {
    let server = MockServer::start().await;
    mount_ip(&server, "1.2.3.4").await;
    Mock::given(method("POST"))
        .and(path("/api/otp/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "cooldownSeconds": 60 }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/otp/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/verify/check"))
        .and(body_json(json!({
            "email": "a@b.com",
            "whatsapp": "+62812",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "status_pengecekan_": "true" }
        })))
        .mount(&server)
        .await;

    let (gate, store, api) = build(&server)?;
    let now = Utc::now();

    let mut flow = OtpFlow::new(api, store.clone());
    flow.send_otp_at("a@b.com", now).await?;
    let record = flow
        .verify_otp_at("a@b.com", "+62812", MembershipType::Monthly, "123456", now)
        .await?;
    assert_eq!(record.token.len(), 32);

    let access = gate.check_membership_at("pb123", now).await?;
    assert_eq!(access.playback_id, "pb123");
    assert_eq!(access.membership_label, "Monthly");
    assert!(access.viewer_id.starts_with("viewer-"));
    // the full local token never leaks into the viewer id
    assert!(!access.viewer_id.contains(&record.token));

    // a month plus a week later the membership is expired and purged
    let later = now + Duration::days(40);
    assert_eq!(
        gate.check_membership_at("pb123", later).await.unwrap_err(),
        MembershipError::Expired
    );
    assert!(store.get(Scope::Persistent, keys::VERIFIED_USER).is_none());
    assert!(store.get(Scope::Persistent, keys::VERIFIED_TOKEN).is_none());
    Ok(())
}

#[tokio::test]
async fn code_and_membership_flows_are_independent() -> Result<()> {
    let server = MockServer::start().await;
    mount_ip(&server, "1.2.3.4").await;
    Mock::given(method("POST"))
        .and(path("/api/codes/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "data": { "is_valid": true, "is_used": false }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/codes/use"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": true })))
        .mount(&server)
        .await;

    let (gate, _store, _api) = build(&server)?;
    let now = Utc::now();

    gate.submit_code_at("a@b.com", "ABC123", now).await?;
    assert_eq!(gate.check_session_at(now).await, SessionCheck::Granted);

    // a code session says nothing about membership
    assert_eq!(
        gate.check_membership_at("pb123", now).await.unwrap_err(),
        MembershipError::NotFound
    );

    // and a code logout leaves nothing behind for either flow
    gate.logout();
    assert_eq!(
        gate.check_session_at(now).await,
        SessionCheck::Denied(DenyReason::VerificationRequired)
    );
    Ok(())
}
