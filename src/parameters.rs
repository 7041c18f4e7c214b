use std::time::Duration;

use clap::{Args, Subcommand};

use crate::config::{ClientConfig, ConfigError};
use crate::credentials::ClientSecret;
use crate::http::config::{DEFAULT_HTTP_TIMEOUT, HttpConfig, ProxyConfig};
use crate::user_role::UserRole;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assigns a role to a user in a VTEX account and prints the assignment id.
    Create {
        #[command(flatten)]
        provider: ProviderArgs,

        #[command(flatten)]
        user_role: UserRoleArgs,
    },
    /// Removes a role from a user in a VTEX account.
    Delete {
        #[command(flatten)]
        provider: ProviderArgs,

        #[command(flatten)]
        user_role: UserRoleArgs,
    },
    /// Parses an assignment id with the `email:account:role_name` shape and prints it as JSON.
    ///
    /// The display name cannot be recovered from an id, the default one is derived from the email.
    ParseId {
        /// Id printed by a previous `create`
        id: String,
    },
}

/// Connection settings for VTEX and the Okta token endpoint.
#[derive(Args, Debug, Clone)]
pub struct ProviderArgs {
    /// VTEX base URL, e.g. https://vendor.myvtex.com
    #[arg(long, env = "VTEX_BASE_URL")]
    vtex_base_url: String,

    /// OAuth2 token endpoint of the Okta authorization server
    #[arg(long, env = "OKTA_URL")]
    okta_url: String,

    /// ID of the Okta client
    #[arg(long, env = "OKTA_CLIENT_ID")]
    okta_client_id: String,

    /// Secret of the Okta client
    #[arg(long, env = "OKTA_SECRET", hide_env_values = true)]
    okta_secret: ClientSecret,

    /// Grant type sent to the token endpoint
    #[arg(long, env = "OKTA_GRANT_TYPE")]
    okta_grant_type: String,

    /// Scope sent to the token endpoint
    #[arg(long, env = "OKTA_SCOPE")]
    okta_scope: String,

    /// Proxy for every request. HTTPS_PROXY and HTTP_PROXY are used when unset.
    #[arg(long)]
    proxy_url: Option<String>,

    /// Bound in seconds for a single HTTP exchange
    #[arg(
        long,
        default_value_t = DEFAULT_HTTP_TIMEOUT.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout_secs: u64,
}

impl ProviderArgs {
    pub fn try_into_config(self) -> Result<ClientConfig, ConfigError> {
        let proxy = ProxyConfig::new(self.proxy_url.as_deref().unwrap_or_default())?
            .try_with_url_from_env()?;
        let timeout = Duration::from_secs(self.timeout_secs);

        let config = ClientConfig {
            vtex_base_url: self.vtex_base_url,
            okta_url: self.okta_url,
            okta_client_id: self.okta_client_id,
            okta_secret: self.okta_secret,
            okta_grant_type: self.okta_grant_type,
            okta_scope: self.okta_scope,
            http: HttpConfig::new(timeout, timeout, proxy),
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Debug, Clone)]
pub struct UserRoleArgs {
    /// Email of the user
    #[arg(long, short)]
    email: String,

    /// Display name of the user. Defaults to the local part of the email.
    #[arg(long, short)]
    name: Option<String>,

    /// VTEX account the role belongs to
    #[arg(long, short)]
    account: String,

    /// Name of the role to assign
    #[arg(long, short)]
    role_name: String,
}

impl From<UserRoleArgs> for UserRole {
    fn from(args: UserRoleArgs) -> Self {
        UserRole::new(args.email, args.name, args.account, args.role_name)
    }
}
