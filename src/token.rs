use std::fmt;

use crate::{TokenRetrieverError, authenticator::TokenRetrievalResponse};
use chrono::{DateTime, TimeDelta, Utc};

pub type AccessToken = String;

/// Subtracted from the lifetime reported by the identity provider, so a token is never sent
/// right before it expires.
pub const EXPIRATION_SAFETY_MARGIN: TimeDelta = TimeDelta::seconds(300);

#[derive(Clone, PartialEq)]
pub struct Token {
    expires_at: DateTime<Utc>,
    access_token: AccessToken,
}

impl Token {
    pub fn new(access_token: AccessToken, expires_at: DateTime<Utc>) -> Self {
        Token {
            access_token,
            expires_at,
        }
    }

    /// Builds the token from an identity provider response received at `now`.
    ///
    /// The token is usable in `[now, now + expires_in - 300s)`. Lifetimes shorter than the safety
    /// margin produce a token that is already expired. An empty access token is an error.
    pub fn from_response_at(
        response: TokenRetrievalResponse,
        now: DateTime<Utc>,
    ) -> Result<Self, TokenRetrieverError> {
        if response.access_token.is_empty() {
            return Err(TokenRetrieverError::TokenRetrieverError(
                "empty access token received".to_string(),
            ));
        }

        let expires_in = i64::try_from(response.expires_in)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or_else(|| {
                TokenRetrieverError::TokenRetrieverError(format!(
                    "token lifetime out of range: {}",
                    response.expires_in
                ))
            })?;

        let expires_at = now
            .checked_add_signed(expires_in - EXPIRATION_SAFETY_MARGIN)
            .ok_or_else(|| {
                TokenRetrieverError::TokenRetrieverError(
                    "Failed to calculate expiration time".to_string(),
                )
            })?;

        Ok(Token::new(response.access_token, expires_at))
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"<hidden>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl TryFrom<TokenRetrievalResponse> for Token {
    type Error = TokenRetrieverError;

    fn try_from(response: TokenRetrievalResponse) -> Result<Self, Self::Error> {
        Token::from_response_at(response, Utc::now())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;
    use rstest::rstest;

    fn response(expires_in: u64) -> TokenRetrievalResponse {
        TokenRetrievalResponse {
            access_token: "some-token".to_string(),
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }

    #[test]
    fn token_is_expired() {
        let past = Utc::now() - Duration::milliseconds(10);
        let token = Token::new(AccessToken::from("some-token"), past);
        assert!(token.is_expired())
    }

    #[test]
    fn token_is_not_expired() {
        let future = Utc::now() + Duration::seconds(10);
        let token = Token::new(AccessToken::from("some-token"), future);
        assert!(!token.is_expired())
    }

    #[rstest]
    #[case(301)]
    #[case(3600)]
    #[case(86400)]
    fn token_valid_until_lifetime_minus_margin(#[case] expires_in: u64) {
        let fetched_at = Utc::now();
        let token = Token::from_response_at(response(expires_in), fetched_at).unwrap();
        let deadline = fetched_at + TimeDelta::seconds(expires_in as i64 - 300);

        assert_eq!(token.expires_at(), deadline);
        assert!(!token.is_expired_at(fetched_at));
        assert!(!token.is_expired_at(deadline - Duration::milliseconds(1)));
        assert!(token.is_expired_at(deadline));
        assert!(token.is_expired_at(deadline + Duration::seconds(1)));
    }

    #[rstest]
    #[case(0)]
    #[case(300)]
    fn short_lived_token_is_born_expired(#[case] expires_in: u64) {
        let fetched_at = Utc::now();
        let token = Token::from_response_at(response(expires_in), fetched_at).unwrap();

        assert!(token.is_expired_at(fetched_at));
    }

    #[test]
    fn empty_access_token_is_rejected() {
        let mut response = response(3600);
        response.access_token = String::new();

        assert_matches!(
            Token::from_response_at(response, Utc::now()),
            Err(TokenRetrieverError::TokenRetrieverError(msg)) => {
                assert!(msg.contains("empty access token"));
            }
        );
    }

    #[test]
    fn token_retrieval_response_incorrect_time() {
        let result = Token::try_from(response(u64::MAX));

        assert_matches!(result, Err(TokenRetrieverError::TokenRetrieverError(msg)) => {
            assert!(msg.contains("out of range"));
        });
    }

    #[test]
    fn debug_hides_access_token() {
        let token = Token::new("very-secret-bearer".into(), Utc::now());
        assert!(!format!("{token:?}").contains("very-secret-bearer"));
    }
}
