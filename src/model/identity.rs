//! Authenticated user identity and login credentials

use serde::{Deserialize, Serialize};
use std::fmt;

/// Username/password pair submitted at login
#[derive(Clone)]
pub struct LoginAttempt {
    pub username: String,
    pub password: String,
}

impl LoginAttempt {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Basic-auth credential derived from `username:password`
    pub fn credential(&self) -> Credential {
        Credential::new(&self.username, &self.password)
    }
}

impl fmt::Debug for LoginAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginAttempt")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// HTTP basic credential sent with every provider call.
///
/// Never serialized and redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    username: String,
    password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({}:<redacted>)", self.username)
    }
}

impl Default for Credential {
    fn default() -> Self {
        Self::new("", "")
    }
}

/// Canonical profile of an authenticated user.
///
/// Built once by an [`Authenticator`](crate::integrations::Authenticator) and
/// passed explicitly into every later provider call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub login: String,
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub provider_id: String,
    #[serde(skip)]
    credential: Credential,
}

impl Identity {
    pub fn new(
        login: impl Into<String>,
        display_name: impl Into<String>,
        provider_id: impl Into<String>,
        credential: Credential,
    ) -> Self {
        Self {
            login: login.into(),
            display_name: display_name.into(),
            email: None,
            avatar_url: None,
            provider_id: provider_id.into(),
            credential,
        }
    }

    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email.filter(|e| !e.is_empty());
        self
    }

    pub fn with_avatar_url(mut self, avatar_url: Option<String>) -> Self {
        self.avatar_url = avatar_url.filter(|a| !a.is_empty());
        self
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Rebind a deserialized identity to its credential
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }
}
