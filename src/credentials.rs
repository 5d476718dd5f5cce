//! Stream credentials
//!
//! Credentials are handed to `connect` once and are immutable afterwards.
//! Changing them means disconnecting and connecting again.

use crate::error::ValidationError;

/// Which side of a stream a session is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Sends media to the stream
    Publisher,
    /// Receives media from the stream
    Subscriber,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Publisher => write!(f, "publisher"),
            Role::Subscriber => write!(f, "subscriber"),
        }
    }
}

/// Credentials needed to reach a stream
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Name of the stream to publish or view
    pub stream_name: String,
    /// Publishing token, or subscribing token for secured streams
    pub token: String,
    /// Director API URL
    pub api_url: String,
    /// Account ID (required to subscribe)
    pub account_id: Option<String>,
}

impl Credentials {
    /// Credentials for publishing
    pub fn publisher(
        stream_name: impl Into<String>,
        token: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Self {
        Self {
            stream_name: stream_name.into(),
            token: token.into(),
            api_url: api_url.into(),
            account_id: None,
        }
    }

    /// Credentials for subscribing. The token may be empty for unsecured streams.
    pub fn subscriber(
        stream_name: impl Into<String>,
        account_id: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Self {
        Self {
            stream_name: stream_name.into(),
            token: String::new(),
            api_url: api_url.into(),
            account_id: Some(account_id.into()),
        }
    }

    /// Set the token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// Check the credentials are usable for the given role
    pub fn validate(&self, role: Role) -> Result<(), ValidationError> {
        if self.stream_name.trim().is_empty() {
            return Err(ValidationError::MissingField("stream_name"));
        }
        if self.api_url.trim().is_empty() {
            return Err(ValidationError::MissingField("api_url"));
        }

        const SCHEMES: [&str; 4] = ["http://", "https://", "ws://", "wss://"];
        let url = self.api_url.trim();
        let host = SCHEMES.iter().find_map(|scheme| url.strip_prefix(scheme));
        match host {
            Some(rest) if !rest.is_empty() => {}
            _ => return Err(ValidationError::InvalidUrl(self.api_url.clone())),
        }

        match role {
            Role::Publisher => {
                if self.token.trim().is_empty() {
                    return Err(ValidationError::MissingField("token"));
                }
            }
            Role::Subscriber => {
                let account = self.account_id.as_deref().unwrap_or_default();
                if account.trim().is_empty() {
                    return Err(ValidationError::MissingField("account_id"));
                }
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("stream_name", &self.stream_name)
            .field("token", &"[REDACTED]")
            .field("api_url", &self.api_url)
            .field("account_id", &self.account_id)
            .finish()
    }
}
