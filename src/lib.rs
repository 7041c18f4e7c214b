pub mod authenticator;
pub mod backoff;
pub mod client;
pub mod config;
pub mod credentials;
pub mod http;
pub mod http_client;
pub mod parameters;
pub mod token;
pub mod token_retriever;
pub mod user_role;

use crate::token::Token;
use thiserror::Error;

pub type ClientID = String;

#[derive(Error, Debug)]
pub enum TokenRetrieverError {
    #[error("retrieving token: `{0}`")]
    TokenRetrieverError(String),
    #[error("fetching access token: `{0}`")]
    AuthenticatorError(#[from] authenticator::AuthenticateError),
    #[error("acquiring token cache lock")]
    PoisonError,
}

/// The TokenRetriever is responsible for handing out a usable authorization token.
pub trait TokenRetriever {
    /// Returns the cached token while it is valid, otherwise fetches a new one.
    fn retrieve(&self) -> Result<Token, TokenRetrieverError>;

    /// Discards the cached token, valid or not, and fetches a new one.
    ///
    /// Meant for tokens rejected by the upstream before their nominal expiration.
    fn invalidate_and_retrieve(&self) -> Result<Token, TokenRetrieverError>;
}
