//! Configuration required to build a [crate::client::UserRoleClient].

use http::Uri;
use thiserror::Error;

use crate::ClientID;
use crate::credentials::{ClientSecret, Credentials};
use crate::http::config::{HttpConfig, ProxyError};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required value `{0}`")]
    MissingValue(&'static str),
    #[error("invalid url set for `{0}`: `{1}`")]
    InvalidUrl(&'static str, String),
    #[error("invalid proxy configuration: `{0}`")]
    Proxy(#[from] ProxyError),
}

/// The six provider values plus the HTTP settings shared by every request.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// VTEX base URL, e.g. `https://vendor.myvtex.com`.
    pub vtex_base_url: String,
    /// OAuth2 token endpoint of the identity provider.
    pub okta_url: String,
    pub okta_client_id: ClientID,
    pub okta_secret: ClientSecret,
    pub okta_grant_type: String,
    pub okta_scope: String,
    pub http: HttpConfig,
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("vtex_base_url", self.vtex_base_url.trim().is_empty()),
            ("okta_url", self.okta_url.trim().is_empty()),
            ("okta_client_id", self.okta_client_id.trim().is_empty()),
            ("okta_secret", self.okta_secret.is_empty()),
            ("okta_grant_type", self.okta_grant_type.trim().is_empty()),
            ("okta_scope", self.okta_scope.trim().is_empty()),
        ];
        if let Some(&(name, _)) = required.iter().find(|(_, empty)| *empty) {
            return Err(ConfigError::MissingValue(name));
        }

        parse_absolute_url("vtex_base_url", &self.vtex_base_url)?;
        parse_absolute_url("okta_url", &self.okta_url)?;
        Ok(())
    }

    pub fn token_endpoint(&self) -> Result<Uri, ConfigError> {
        parse_absolute_url("okta_url", &self.okta_url)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            client_id: self.okta_client_id.to_owned(),
            client_secret: self.okta_secret.to_owned(),
            grant_type: self.okta_grant_type.to_owned(),
            scope: self.okta_scope.to_owned(),
        }
    }
}

fn parse_absolute_url(name: &'static str, value: &str) -> Result<Uri, ConfigError> {
    let uri = value
        .parse::<Uri>()
        .map_err(|e| ConfigError::InvalidUrl(name, e.to_string()))?;
    if uri.scheme().is_none() || uri.authority().is_none() {
        return Err(ConfigError::InvalidUrl(
            name,
            "scheme and host are required".to_string(),
        ));
    }
    Ok(uri)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    pub(crate) fn config(vtex_base_url: &str, okta_url: &str) -> ClientConfig {
        ClientConfig {
            vtex_base_url: vtex_base_url.into(),
            okta_url: okta_url.into(),
            okta_client_id: "client_id".into(),
            okta_secret: ClientSecret::from("client_secret"),
            okta_grant_type: "client_credentials".into(),
            okta_scope: "scope_vendor".into(),
            http: HttpConfig::default(),
        }
    }

    #[test]
    fn valid_config() {
        let config = config(
            "https://vendor.myvtex.com",
            "https://vendor.okta.com/oauth2/v1/token",
        );

        assert!(config.validate().is_ok());
        assert_eq!(
            config.token_endpoint().unwrap(),
            "https://vendor.okta.com/oauth2/v1/token"
        );
        assert_eq!(config.credentials().scope, "scope_vendor");
    }

    #[rstest]
    #[case::base_url(|c: &mut ClientConfig| c.vtex_base_url = " ".into(), "vtex_base_url")]
    #[case::okta_url(|c: &mut ClientConfig| c.okta_url = "".into(), "okta_url")]
    #[case::client_id(|c: &mut ClientConfig| c.okta_client_id = "".into(), "okta_client_id")]
    #[case::secret(|c: &mut ClientConfig| c.okta_secret = ClientSecret::from(""), "okta_secret")]
    #[case::grant_type(|c: &mut ClientConfig| c.okta_grant_type = "".into(), "okta_grant_type")]
    #[case::scope(|c: &mut ClientConfig| c.okta_scope = "".into(), "okta_scope")]
    fn missing_values(#[case] unset: fn(&mut ClientConfig), #[case] expected: &str) {
        let mut config = config("https://vendor.myvtex.com", "https://okta.com/token");
        unset(&mut config);

        assert_matches!(config.validate(), Err(ConfigError::MissingValue(name)) => {
            assert_eq!(name, expected);
        });
    }

    #[rstest]
    #[case("vendor.myvtex.com", "https://okta.com/token", "vtex_base_url")]
    #[case("https://vendor.myvtex.com", "/token", "okta_url")]
    #[case("https://vendor.myvtex.com", "http://", "okta_url")]
    fn invalid_urls(#[case] base: &str, #[case] okta: &str, #[case] expected: &str) {
        assert_matches!(config(base, okta).validate(), Err(ConfigError::InvalidUrl(name, _)) => {
            assert_eq!(name, expected);
        });
    }

    #[test]
    fn errors_never_contain_the_secret() {
        let mut config = config("https://vendor.myvtex.com", "not a url");
        config.okta_secret = ClientSecret::from("super-secret-value");

        let error = config.validate().unwrap_err();

        assert!(!error.to_string().contains("super-secret-value"));
        assert!(!format!("{config:?}").contains("super-secret-value"));
    }
}
