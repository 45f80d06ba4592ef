use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::types::Credentials;

/// Authentication / registration failures, classified by HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("wrong email or PIN (HTTP 403)")]
    WrongCredentials,
    #[error("no account for this email (HTTP 404)")]
    NotRegistered,
    #[error("unexpected HTTP status {0}")]
    Unexpected(u16),
    #[error("auth request failed: {0}")]
    Transport(String),
    #[error("invalid auth response: {0}")]
    InvalidResponse(String),
}

impl AuthError {
    pub fn from_status(status: u16) -> Self {
        match status {
            403 => AuthError::WrongCredentials,
            404 => AuthError::NotRegistered,
            other => AuthError::Unexpected(other),
        }
    }

    /// Text shown to the user. No retry happens automatically.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::WrongCredentials => "Wrong email or PIN, please try again.".to_string(),
            AuthError::NotRegistered => {
                "This email is not registered yet. Register it first (use --register).".to_string()
            }
            AuthError::Unexpected(status) => format!("Login failed (HTTP {}). Please try again later.", status),
            AuthError::Transport(_) | AuthError::InvalidResponse(_) => {
                "Cannot reach the login service. Check the network and try again.".to_string()
            }
        }
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    pin: &'a str,
}

/// Device record returned by `POST /auth`.
#[derive(Debug, Deserialize)]
struct DeviceRecord {
    #[serde(rename = "type")]
    device_type: String,
    id: String,
    authtoken: String,
    orgid: String,
    #[serde(default)]
    clientid: Option<String>,
}

impl DeviceRecord {
    fn into_credentials(self) -> Credentials {
        Credentials {
            org: self.orgid,
            device_type: self.device_type,
            device_id: self.id,
            auth_token: self.authtoken,
            api_key: None,
            api_token: None,
        }
    }
}

/// Blocking client for the `POST /auth` and `POST /register` endpoints.
pub struct AuthClient {
    base_url: String,
    timeout: Duration,
}

impl AuthClient {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn authenticate(&self, email: &str, pin: &str) -> Result<Credentials, AuthError> {
        let record: DeviceRecord = self
            .post("auth", email, pin)?
            .into_json()
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        info!(
            "Authenticated {} as device {} (client {})",
            email,
            record.id,
            record.clientid.as_deref().unwrap_or("-")
        );
        Ok(record.into_credentials())
    }

    /// `/register` answers 201 with no body, so the device record is fetched
    /// with a follow-up `/auth`.
    pub fn register(&self, email: &str, pin: &str) -> Result<Credentials, AuthError> {
        let response = self.post("register", email, pin)?;
        info!("Registered {} (HTTP {})", email, response.status());
        self.authenticate(email, pin)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn post(&self, path: &str, email: &str, pin: &str) -> Result<ureq::Response, AuthError> {
        let response = ureq::post(&self.endpoint(path))
            .timeout(self.timeout)
            .send_json(LoginRequest { email, pin });

        match response {
            Ok(response) => Ok(response),
            Err(ureq::Error::Status(status, _)) => {
                let err = AuthError::from_status(status);
                warn!("POST /{} rejected: {}", path, err);
                Err(err)
            }
            Err(ureq::Error::Transport(transport)) => Err(AuthError::Transport(transport.to_string())),
        }
    }
}
