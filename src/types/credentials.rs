use std::env;

/// Connection credentials, from `POST /auth` or from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub org: String,
    pub device_type: String,
    pub device_id: String,
    pub auth_token: String,
    /// Application API key and token; only used to subscribe as an application.
    pub api_key: Option<String>,
    pub api_token: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),
}

impl Credentials {
    pub const ORG_VAR: &'static str = "MOTIONHUB_ORG";
    pub const DEVICE_TYPE_VAR: &'static str = "MOTIONHUB_DEVICE_TYPE";
    pub const DEVICE_ID_VAR: &'static str = "MOTIONHUB_DEVICE_ID";
    pub const TOKEN_VAR: &'static str = "MOTIONHUB_TOKEN";
    pub const API_KEY_VAR: &'static str = "MOTIONHUB_API_KEY";
    pub const API_TOKEN_VAR: &'static str = "MOTIONHUB_API_TOKEN";

    /// Load from the process environment (call `dotenv()` first to pick up `.env`).
    pub fn from_env() -> Result<Self, CredentialsError> {
        let var = |name: &'static str| env::var(name).map_err(|_| CredentialsError::MissingVar(name));

        let creds = Self {
            org: var(Self::ORG_VAR)?,
            device_type: var(Self::DEVICE_TYPE_VAR)?,
            device_id: var(Self::DEVICE_ID_VAR)?,
            auth_token: var(Self::TOKEN_VAR)?,
            api_key: None,
            api_token: None,
        };
        Ok(creds.with_env_api_key())
    }

    /// The auth service only knows the device; the application key comes from the environment.
    pub fn with_env_api_key(self) -> Self {
        self.with_api_key(env::var(Self::API_KEY_VAR).ok(), env::var(Self::API_TOKEN_VAR).ok())
    }

    /// Set whichever of key / token is given, keeping existing values otherwise.
    pub fn with_api_key(mut self, api_key: Option<String>, api_token: Option<String>) -> Self {
        if api_key.is_some() {
            self.api_key = api_key;
        }
        if api_token.is_some() {
            self.api_token = api_token;
        }
        self
    }

    pub fn is_quickstart(&self) -> bool {
        self.org == "quickstart"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> Credentials {
        Credentials {
            org: "abc123".to_string(),
            device_type: "zone-sample".to_string(),
            device_id: "0a1b".to_string(),
            auth_token: "tok".to_string(),
            api_key: None,
            api_token: None,
        }
    }

    #[test]
    fn api_key_fills_only_given_parts() {
        let creds = device().with_api_key(Some("a-abc123-key".to_string()), None);
        assert_eq!(creds.api_key.as_deref(), Some("a-abc123-key"));
        assert_eq!(creds.api_token, None);

        let creds = creds.with_api_key(None, Some("app-token".to_string()));
        assert_eq!(creds.api_key.as_deref(), Some("a-abc123-key"));
        assert_eq!(creds.api_token.as_deref(), Some("app-token"));
        assert_eq!(creds.auth_token, "tok");
    }

    #[test]
    fn quickstart_is_detected_by_org() {
        assert!(!device().is_quickstart());
        let quickstart = Credentials {
            org: "quickstart".to_string(),
            ..device()
        };
        assert!(quickstart.is_quickstart());
    }
}
