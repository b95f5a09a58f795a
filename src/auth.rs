//! Login and registration session markers.
//!
//! The dashboard issues a real server-side session on login; this module
//! mirrors the storefront pages by caching the result under tab-scoped keys
//! (`userLogin`, `authToken`) so the header can show who is signed in. A
//! completed registration additionally leaves a persistent marker so the
//! header still greets the user on the next visit.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::types::RegisterRequest;
use crate::api::ApiClient;
use crate::store::{self, keys, Scope, StateStore};
use crate::validate;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("email and password are required")]
    MissingCredentials,
    #[error("invalid email format")]
    InvalidEmail,
    #[error("all fields are required")]
    MissingFields,
    #[error("passwords do not match")]
    PasswordMismatch,
    /// Server-reported failure, surfaced verbatim.
    #[error("{0}")]
    Rejected(String),
    #[error("could not reach the server, check your connection")]
    Unavailable,
}

/// Tab-scoped login marker, stored under `userLogin` with the storefront's
/// camelCase field names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginSession {
    pub is_logged_in: bool,
    pub token: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub user: Option<Value>,
    pub login_at: DateTime<Utc>,
}

/// Post-registration marker (`userRegistration`, `successfulRegistration`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationMarker {
    pub is_registered: bool,
    #[serde(default)]
    pub user: Option<Value>,
    pub registered_at: DateTime<Utc>,
}

/// Who the header should greet, in marker priority order.
#[derive(Debug, Clone)]
pub enum AuthStatus {
    LoggedIn(LoginSession),
    Registered(RegistrationMarker),
    SignedOut,
}

#[derive(Debug, Clone)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub whatsapp: String,
    pub password: SecretString,
    pub password_confirmation: SecretString,
}

/// Login/registration flows over the dashboard endpoints.
#[derive(Clone)]
pub struct AuthClient {
    api: ApiClient,
    store: Arc<dyn StateStore>,
}

impl AuthClient {
    #[must_use]
    pub fn new(api: ApiClient, store: Arc<dyn StateStore>) -> Self {
        Self { api, store }
    }

    /// Log in and cache the resulting session markers.
    ///
    /// # Errors
    /// Validation failures never reach the network; server refusals carry
    /// the server's message; transport problems map to a generic error and
    /// leave no markers behind.
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<LoginSession, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.expose_secret().is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        if !validate::is_valid_email(email) {
            return Err(AuthError::InvalidEmail);
        }

        let response = self.api.login(email, password).await.map_err(|err| {
            warn!(%err, "login call failed");
            AuthError::Unavailable
        })?;

        if !response.status {
            let message = response
                .message
                .unwrap_or_else(|| "login failed, please try again".to_string());
            return Err(AuthError::Rejected(message));
        }
        let Some(data) = response.data else {
            return Err(AuthError::Rejected(
                "login failed, please try again".to_string(),
            ));
        };

        let session = LoginSession {
            is_logged_in: true,
            token: data.token.clone(),
            session_id: data.session_id,
            expires_at: data.expires_at,
            user: data.user,
            login_at: Utc::now(),
        };
        store::set_json(self.store.as_ref(), Scope::Tab, keys::USER_LOGIN, &session);
        self.store.set(Scope::Tab, keys::AUTH_TOKEN, &data.token);
        debug!(email, "login markers stored");
        Ok(session)
    }

    /// Register a new account and leave the registration markers.
    ///
    /// # Errors
    /// Same taxonomy as [`login`](Self::login).
    pub async fn register(&self, form: &RegisterForm) -> Result<RegistrationMarker, AuthError> {
        let name = form.name.trim();
        let email = form.email.trim();
        let whatsapp = form.whatsapp.trim();
        if name.is_empty()
            || email.is_empty()
            || whatsapp.is_empty()
            || form.password.expose_secret().is_empty()
        {
            return Err(AuthError::MissingFields);
        }
        if !validate::is_valid_email(email) {
            return Err(AuthError::InvalidEmail);
        }
        if form.password.expose_secret() != form.password_confirmation.expose_secret() {
            return Err(AuthError::PasswordMismatch);
        }

        let request = RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            whatsapp: whatsapp.to_string(),
            password: form.password.expose_secret().to_string(),
            password_confirmation: form.password_confirmation.expose_secret().to_string(),
        };
        let response = self.api.register(&request).await.map_err(|err| {
            warn!(%err, "register call failed");
            AuthError::Unavailable
        })?;

        if !response.status {
            let message = response
                .message
                .unwrap_or_else(|| "registration failed, please try again".to_string());
            return Err(AuthError::Rejected(message));
        }

        let marker = RegistrationMarker {
            is_registered: true,
            user: response.data.and_then(|data| data.user),
            registered_at: Utc::now(),
        };
        store::set_json(
            self.store.as_ref(),
            Scope::Tab,
            keys::USER_REGISTRATION,
            &marker,
        );
        store::set_json(
            self.store.as_ref(),
            Scope::Persistent,
            keys::SUCCESSFUL_REGISTRATION,
            &marker,
        );
        // the saved form draft is no longer needed once registration went through
        self.store.remove(Scope::Persistent, keys::REGISTER_FORM_DATA);
        debug!(email, "registration markers stored");
        Ok(marker)
    }

    /// Current auth status from the stored markers, in priority order:
    /// active login, then this-tab registration, then the persistent
    /// registration marker.
    #[must_use]
    pub fn current_status(&self) -> AuthStatus {
        if let Some(session) =
            store::get_json::<LoginSession>(self.store.as_ref(), Scope::Tab, keys::USER_LOGIN)
        {
            if session.is_logged_in && !session.token.is_empty() {
                return AuthStatus::LoggedIn(session);
            }
        }
        if let Some(marker) = store::get_json::<RegistrationMarker>(
            self.store.as_ref(),
            Scope::Tab,
            keys::USER_REGISTRATION,
        ) {
            if marker.is_registered {
                return AuthStatus::Registered(marker);
            }
        }
        if let Some(marker) = store::get_json::<RegistrationMarker>(
            self.store.as_ref(),
            Scope::Persistent,
            keys::SUCCESSFUL_REGISTRATION,
        ) {
            if marker.is_registered {
                return AuthStatus::Registered(marker);
            }
        }
        AuthStatus::SignedOut
    }

    /// Clear every auth marker, tab-scoped and persistent.
    pub fn logout(&self) {
        self.store.remove(Scope::Tab, keys::USER_LOGIN);
        self.store.remove(Scope::Tab, keys::USER_REGISTRATION);
        self.store.remove(Scope::Tab, keys::AUTH_TOKEN);
        self.store
            .remove(Scope::Persistent, keys::SUCCESSFUL_REGISTRATION);
        self.store
            .remove(Scope::Persistent, keys::REGISTER_FORM_DATA);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::MemoryStore;
    use anyhow::Result;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> Result<(AuthClient, Arc<MemoryStore>)> {
        let store = Arc::new(MemoryStore::new());
        let config = Config::new()
            .with_api_base(server.uri())
            .with_verify_base(server.uri());
        let api = ApiClient::new(config)?;
        Ok((AuthClient::new(api, store.clone()), store))
    }

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[tokio::test]
    async fn test_login_validation_before_network() -> Result<()> {
        let server = MockServer::start().await;
        let (client, _store) = client_for(&server)?;

        assert_eq!(
            client.login("", &secret("pw")).await.unwrap_err(),
            AuthError::MissingCredentials
        );
        assert_eq!(
            client.login("a@b.com", &secret("")).await.unwrap_err(),
            AuthError::MissingCredentials
        );
        assert_eq!(
            client.login("a@b", &secret("pw")).await.unwrap_err(),
            AuthError::InvalidEmail
        );
        assert_eq!(server.received_requests().await.unwrap().len(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_login_success_stores_markers() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/dashboard/login"))
            .and(body_json(json!({ "email": "a@b.com", "password": "pw" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": true,
                "data": {
                    "token": "tok123",
                    "session_id": "s1",
                    "expires_at": "2026-09-01T00:00:00Z",
                    "user": { "name": "Aya" }
                }
            })))
            .mount(&server)
            .await;

        let (client, store) = client_for(&server)?;
        let session = client.login("a@b.com", &secret("pw")).await?;
        assert!(session.is_logged_in);
        assert_eq!(session.token, "tok123");

        assert_eq!(
            store.get(Scope::Tab, keys::AUTH_TOKEN).as_deref(),
            Some("tok123")
        );
        assert!(matches!(client.current_status(), AuthStatus::LoggedIn(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_login_rejection_stores_nothing() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/dashboard/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "status": false,
                "message": "Email atau password salah"
            })))
            .mount(&server)
            .await;

        let (client, store) = client_for(&server)?;
        let err = client.login("a@b.com", &secret("bad")).await.unwrap_err();
        assert_eq!(
            err,
            AuthError::Rejected("Email atau password salah".to_string())
        );
        assert!(store.get(Scope::Tab, keys::USER_LOGIN).is_none());
        assert!(store.get(Scope::Tab, keys::AUTH_TOKEN).is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_register_validation() -> Result<()> {
        let server = MockServer::start().await;
        let (client, _store) = client_for(&server)?;
        let mut form = RegisterForm {
            name: "Aya".to_string(),
            email: "a@b.com".to_string(),
            whatsapp: "+62812".to_string(),
            password: secret("pw123456"),
            password_confirmation: secret("different"),
        };
        assert_eq!(
            client.register(&form).await.unwrap_err(),
            AuthError::PasswordMismatch
        );

        form.password_confirmation = secret("pw123456");
        form.whatsapp = String::new();
        assert_eq!(
            client.register(&form).await.unwrap_err(),
            AuthError::MissingFields
        );
        assert_eq!(server.received_requests().await.unwrap().len(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_register_success_leaves_both_markers() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/dashboard/register"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": true,
                "data": { "user": { "name": "Aya" } }
            })))
            .mount(&server)
            .await;

        let (client, store) = client_for(&server)?;
        store.set(Scope::Persistent, keys::REGISTER_FORM_DATA, "{}");
        let form = RegisterForm {
            name: "Aya".to_string(),
            email: "a@b.com".to_string(),
            whatsapp: "+62812".to_string(),
            password: secret("pw123456"),
            password_confirmation: secret("pw123456"),
        };
        let marker = client.register(&form).await?;
        assert!(marker.is_registered);

        assert!(store.get(Scope::Tab, keys::USER_REGISTRATION).is_some());
        assert!(store
            .get(Scope::Persistent, keys::SUCCESSFUL_REGISTRATION)
            .is_some());
        assert!(store.get(Scope::Persistent, keys::REGISTER_FORM_DATA).is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_status_priority_and_logout() -> Result<()> {
        let server = MockServer::start().await;
        let (client, store) = client_for(&server)?;

        let marker = RegistrationMarker {
            is_registered: true,
            user: None,
            registered_at: Utc::now(),
        };
        store::set_json(
            store.as_ref(),
            Scope::Persistent,
            keys::SUCCESSFUL_REGISTRATION,
            &marker,
        );
        assert!(matches!(client.current_status(), AuthStatus::Registered(_)));

        let session = LoginSession {
            is_logged_in: true,
            token: "tok".to_string(),
            session_id: None,
            expires_at: None,
            user: None,
            login_at: Utc::now(),
        };
        store::set_json(store.as_ref(), Scope::Tab, keys::USER_LOGIN, &session);
        assert!(matches!(client.current_status(), AuthStatus::LoggedIn(_)));

        client.logout();
        assert!(matches!(client.current_status(), AuthStatus::SignedOut));
        assert!(store.get(Scope::Tab, keys::AUTH_TOKEN).is_none());
        Ok(())
    }
}
