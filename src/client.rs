use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use http::{
    HeaderValue, Method, Request, StatusCode, Uri,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::authenticator::HttpAuthenticator;
use crate::backoff::{Backoff, MAX_ATTEMPTS, Pause, ThreadSleep};
use crate::config::{ClientConfig, ConfigError};
use crate::http::client::{HttpBuildError, HttpClient as ReqwestHttpClient};
use crate::http_client::HttpClient;
use crate::token::Token;
use crate::token_retriever::TokenRetrieverWithCache;
use crate::user_role::{UserRole, UserRoleRequest};
use crate::{TokenRetriever, TokenRetrieverError};

pub const CREATE_USER_ROLE_PATH: &str = "/_v/create-user-role";
pub const REMOVE_USER_ROLE_PATH: &str = "/_v/remove-user-role";

#[derive(Error, Debug)]
pub enum UserRoleClientError {
    #[error("invalid configuration: `{0}`")]
    Config(#[from] ConfigError),
    #[error("building client: `{0}`")]
    HttpBuild(#[from] HttpBuildError),
    #[error("error getting token: `{0}`")]
    Token(#[from] TokenRetrieverError),
    #[error("error computing the request: `{0}`")]
    Encoder(String),
    #[error("request failed: status `{0}`, body: `{1}`")]
    UnsuccessfulResponse(u16, String),
    #[error("max retries ({0}) exceeded, last failure: `{1}`")]
    RetriesExhausted(u8, String),
    #[error("request cancelled")]
    Cancelled,
}

/// Client creating and removing VTEX user roles.
///
/// Every mutation runs through [UserRoleClient::execute], which retries transient failures with an
/// adaptive backoff and renews the bearer token when the upstream rejects it. The client holds no
/// per-call state, so it can be shared between threads and used concurrently.
pub struct UserRoleClient<C, T, P = ThreadSleep> {
    http_client: C,
    token_retriever: T,
    base_url: String,
    pause: P,
    cancelled: Option<Arc<AtomicBool>>,
}

/// [UserRoleClient] talking HTTP through reqwest, with a cached client credentials token.
pub type HttpUserRoleClient = UserRoleClient<
    ReqwestHttpClient,
    TokenRetrieverWithCache<HttpAuthenticator<ReqwestHttpClient>>,
>;

impl HttpUserRoleClient {
    pub fn try_new(config: ClientConfig) -> Result<Self, UserRoleClientError> {
        config.validate()?;

        let http_client = ReqwestHttpClient::new(&config.http)?;
        let authenticator = HttpAuthenticator::new(http_client.clone(), config.token_endpoint()?);
        let token_retriever = TokenRetrieverWithCache::new(config.credentials(), authenticator);

        Ok(UserRoleClient::new(
            http_client,
            token_retriever,
            config.vtex_base_url,
        ))
    }
}

impl<C, T> UserRoleClient<C, T, ThreadSleep>
where
    C: HttpClient,
    T: TokenRetriever,
{
    pub fn new(http_client: C, token_retriever: T, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            token_retriever,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            pause: ThreadSleep,
            cancelled: None,
        }
    }
}

impl<C, T, P> UserRoleClient<C, T, P>
where
    C: HttpClient,
    T: TokenRetriever,
    P: Pause,
{
    pub fn with_pause<Q: Pause>(self, pause: Q) -> UserRoleClient<C, T, Q> {
        UserRoleClient {
            http_client: self.http_client,
            token_retriever: self.token_retriever,
            base_url: self.base_url,
            pause,
            cancelled: self.cancelled,
        }
    }

    /// Makes every execution stop before its next attempt once `cancelled` is set.
    pub fn with_cancellation(self, cancelled: Arc<AtomicBool>) -> Self {
        Self {
            cancelled: Some(cancelled),
            ..self
        }
    }

    pub fn create_user_role(&self, user_role: &UserRole) -> Result<(), UserRoleClientError> {
        debug!(
            email = %user_role.email,
            account = %user_role.account,
            role_name = %user_role.role_name,
            "creating user role"
        );
        self.execute(
            Method::POST,
            CREATE_USER_ROLE_PATH,
            &UserRoleRequest::from(user_role),
        )?;
        info!(id = %user_role.id(), "user role created");
        Ok(())
    }

    pub fn delete_user_role(&self, user_role: &UserRole) -> Result<(), UserRoleClientError> {
        debug!(
            email = %user_role.email,
            account = %user_role.account,
            role_name = %user_role.role_name,
            "deleting user role"
        );
        self.execute(
            Method::POST,
            REMOVE_USER_ROLE_PATH,
            &UserRoleRequest::from(user_role),
        )?;
        info!(id = %user_role.id(), "user role deleted");
        Ok(())
    }

    /// VTEX has no endpoint to query assignments, so nothing is fetched: the persisted assignment
    /// is assumed to still exist and is returned as is.
    pub fn read_user_role(&self, persisted: &UserRole) -> Result<UserRole, UserRoleClientError> {
        debug!(id = %persisted.id(), "reading user role is not supported upstream, keeping state");
        Ok(persisted.clone())
    }

    /// Sends `body` as JSON to `path`, retrying until it succeeds, fails permanently or runs out
    /// of attempts.
    pub fn execute<B>(&self, method: Method, path: &str, body: &B) -> Result<(), UserRoleClientError>
    where
        B: Serialize + ?Sized,
    {
        let uri = self.endpoint(path)?;
        let json_body = serde_json::to_vec(body)
            .map_err(|e| UserRoleClientError::Encoder(format!("Failed to encode JSON: {e}")))?;

        let mut backoff = Backoff::default();
        let mut pending_wait: Option<Duration> = None;
        let mut last_failure = String::new();

        while let Some(attempt) = backoff.next_attempt() {
            if let Some(wait) = pending_wait.take() {
                self.pause.pause(wait);
            }
            if self.is_cancelled() {
                debug!(attempt, %uri, "request cancelled");
                return Err(UserRoleClientError::Cancelled);
            }

            let failure = match self.attempt(&method, &uri, &json_body) {
                Ok(()) => {
                    debug!(attempt, %uri, "request succeeded");
                    return Ok(());
                }
                Err(failure) => failure,
            };

            match failure {
                Failure::Permanent(err) => return Err(err),
                Failure::Unauthorized(reason) => {
                    warn!(attempt, %uri, "{reason}, renewing token");
                    last_failure = reason;
                    if let Err(err) = self.token_retriever.invalidate_and_retrieve() {
                        if matches!(err, TokenRetrieverError::PoisonError) {
                            return Err(err.into());
                        }
                        last_failure = format!("error refreshing token: {err}");
                        pending_wait = Some(self.backoff_wait(
                            backoff.on_transient_failure(),
                            attempt,
                            &last_failure,
                        ));
                    }
                }
                Failure::RateLimited(reason) => {
                    pending_wait =
                        Some(self.backoff_wait(backoff.on_rate_limited(), attempt, &reason));
                    last_failure = reason;
                }
                Failure::Transient(reason) => {
                    pending_wait =
                        Some(self.backoff_wait(backoff.on_transient_failure(), attempt, &reason));
                    last_failure = reason;
                }
            }
        }

        warn!(%uri, "max retries ({MAX_ATTEMPTS}) exceeded");
        Err(UserRoleClientError::RetriesExhausted(MAX_ATTEMPTS, last_failure))
    }

    fn attempt(&self, method: &Method, uri: &Uri, body: &[u8]) -> Result<(), Failure> {
        let token = self.token_retriever.retrieve().map_err(|err| match err {
            TokenRetrieverError::PoisonError => Failure::Permanent(err.into()),
            err => Failure::Transient(format!("error getting token: {err}")),
        })?;

        let request = build_request(method, uri, &token, body).map_err(Failure::Permanent)?;

        let response = self
            .http_client
            .send(request)
            .map_err(|e| Failure::Transient(format!("error sending request: {e}")))?;

        let status = response.status();
        let body = String::from_utf8_lossy(response.body());
        match ResponseClass::from(status) {
            ResponseClass::Success => Ok(()),
            ResponseClass::Unauthorized => {
                Err(Failure::Unauthorized(format!(
                    "token rejected: status {status}, body: {body}"
                )))
            }
            ResponseClass::RateLimited => Err(Failure::RateLimited(format!(
                "rate limited: status {status}, body: {body}"
            ))),
            ResponseClass::ServerError => Err(Failure::Transient(format!(
                "server error: status {status}, body: {body}"
            ))),
            ResponseClass::ClientError => Err(Failure::Permanent(
                UserRoleClientError::UnsuccessfulResponse(status.as_u16(), body.into_owned()),
            )),
        }
    }

    fn backoff_wait(&self, wait: Duration, attempt: u8, reason: &str) -> Duration {
        warn!(
            attempt,
            wait_ms = wait.as_millis() as u64,
            "{reason}, retrying"
        );
        wait
    }

    fn endpoint(&self, path: &str) -> Result<Uri, UserRoleClientError> {
        format!("{}{}", self.base_url, path)
            .parse()
            .map_err(|e| UserRoleClientError::Encoder(format!("invalid endpoint url: {e}")))
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled
            .as_ref()
            .is_some_and(|cancelled| cancelled.load(Ordering::SeqCst))
    }
}

/// Reason why an attempt did not succeed.
enum Failure {
    /// Not worth retrying.
    Permanent(UserRoleClientError),
    /// The token was rejected: retry right away with a new one.
    Unauthorized(String),
    /// Retry after a wait, widening the backoff ceiling.
    RateLimited(String),
    /// Retry after a wait.
    Transient(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ResponseClass {
    Success,
    Unauthorized,
    RateLimited,
    ServerError,
    ClientError,
}

impl From<StatusCode> for ResponseClass {
    fn from(status: StatusCode) -> Self {
        match status {
            s if s.is_success() => ResponseClass::Success,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ResponseClass::Unauthorized,
            // VTEX answers 404 while the app service is warming up.
            StatusCode::NOT_FOUND | StatusCode::TOO_MANY_REQUESTS | StatusCode::GATEWAY_TIMEOUT => {
                ResponseClass::RateLimited
            }
            s if s.as_u16() >= 500 => ResponseClass::ServerError,
            _ => ResponseClass::ClientError,
        }
    }
}

fn build_request(
    method: &Method,
    uri: &Uri,
    token: &Token,
    body: &[u8],
) -> Result<Request<Vec<u8>>, UserRoleClientError> {
    let mut bearer_token_header =
        HeaderValue::from_str(&format!("Bearer {}", token.access_token())).map_err(|_| {
            UserRoleClientError::Encoder(
                "invalid HTTP header value set for Authorization".to_string(),
            )
        })?;
    bearer_token_header.set_sensitive(true);

    http::Request::builder()
        .uri(uri)
        .method(method.clone())
        .header(CONTENT_TYPE, "application/json")
        .header(AUTHORIZATION, bearer_token_header)
        .body(body.to_vec())
        .map_err(|e| UserRoleClientError::Encoder(format!("Failed to build request: {e}")))
}
