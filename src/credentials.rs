//! Credentials used to obtain bearer tokens from the identity provider.

use std::fmt;

use crate::ClientID;

/// Client secret shared with the identity provider.
///
/// It intentionally has no `Display` implementation and its `Debug` output is redacted, so it
/// cannot leak into logs or error messages by accident.
#[derive(Clone, PartialEq)]
pub struct ClientSecret(String);

impl<S: AsRef<str>> From<S> for ClientSecret {
    fn from(secret: S) -> Self {
        ClientSecret(secret.as_ref().to_string())
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientSecret: redacted")
    }
}

impl ClientSecret {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

/// Everything needed to request a client credentials token, except the token endpoint itself,
/// which belongs to the [crate::authenticator::HttpAuthenticator].
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub client_id: ClientID,
    pub client_secret: ClientSecret,
    pub grant_type: String,
    pub scope: String,
}
