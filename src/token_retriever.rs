use crate::authenticator::{Authenticator, TokenRetrievalRequest};
use crate::credentials::Credentials;
use crate::token::Token;
use crate::{TokenRetriever, TokenRetrieverError};

use std::sync::RwLock;
use tracing::debug;

/// Caches a single bearer token and refreshes it through the [Authenticator] when it is missing
/// or expired.
///
/// Readers holding a valid token only take the read lock. Refreshing takes the write lock for the
/// whole round trip to the identity provider and checks the cache again once it holds it, so
/// callers racing on an expired token share a single refresh.
#[derive(Debug)]
pub struct TokenRetrieverWithCache<A>
where
    A: Authenticator,
{
    credentials: Credentials,
    token: RwLock<Option<Token>>,
    authenticator: A,
}

impl<A> TokenRetriever for TokenRetrieverWithCache<A>
where
    A: Authenticator,
{
    fn retrieve(&self) -> Result<Token, TokenRetrieverError> {
        {
            let cached_token = self
                .token
                .read()
                .map_err(|_| TokenRetrieverError::PoisonError)?;
            if let Some(token) = valid(&cached_token) {
                return Ok(token.clone());
            }
        }

        let mut cached_token = self
            .token
            .write()
            .map_err(|_| TokenRetrieverError::PoisonError)?;
        self.refresh_if_needed(&mut cached_token)
    }

    fn invalidate_and_retrieve(&self) -> Result<Token, TokenRetrieverError> {
        let mut cached_token = self
            .token
            .write()
            .map_err(|_| TokenRetrieverError::PoisonError)?;
        debug!("invalidating cached authorization token");
        *cached_token = None;
        self.refresh_if_needed(&mut cached_token)
    }
}

impl<A> TokenRetrieverWithCache<A>
where
    A: Authenticator,
{
    pub fn new(credentials: Credentials, authenticator: A) -> Self {
        Self {
            credentials,
            token: RwLock::new(None),
            authenticator,
        }
    }

    // Must be called holding the write lock.
    fn refresh_if_needed(
        &self,
        cached_token: &mut Option<Token>,
    ) -> Result<Token, TokenRetrieverError> {
        if let Some(token) = valid(cached_token) {
            debug!("authorization token already refreshed");
            return Ok(token.clone());
        }

        let token = self.refresh_token().inspect_err(|e| {
            debug!("error refreshing token: {e}");
        })?;
        debug!(expires_at = %token.expires_at(), "authorization token refreshed");
        *cached_token = Some(token.clone());
        Ok(token)
    }

    fn refresh_token(&self) -> Result<Token, TokenRetrieverError> {
        let request = TokenRetrievalRequest {
            client_id: self.credentials.client_id.to_owned(),
            client_secret: self.credentials.client_secret.to_owned(),
            grant_type: self.credentials.grant_type.to_owned(),
            scope: self.credentials.scope.to_owned(),
        };

        let response = self.authenticator.authenticate(request)?;

        Token::try_from(response)
    }
}

fn valid(cached_token: &Option<Token>) -> Option<&Token> {
    cached_token.as_ref().filter(|t| !t.is_expired())
}
