use base64::{Engine, engine::general_purpose};
use http::{
    HeaderValue, Request, Uri,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::form_urlencoded;

use crate::credentials::ClientSecret;
use crate::http_client::HttpClient;
use crate::{ClientID, token::AccessToken};

#[derive(Error, Debug)]
pub enum AuthenticateError {
    #[error("unable to serialize request: `{0}`")]
    SerializeError(String),
    #[error("unable to deserialize token: `{0}`")]
    DeserializeError(String),
    #[error("identity server error: Status code: `{0}`, response: `{1}`")]
    HttpResponseError(u16, String),
    #[error("http transport error: `{0}`")]
    HttpTransportError(String),
}

pub trait Authenticator {
    fn authenticate(
        &self,
        req: TokenRetrievalRequest,
    ) -> Result<TokenRetrievalResponse, AuthenticateError>;
}

/// The Authenticator is responsible for obtaining a bearer token from the OAuth2 identity provider.
pub struct HttpAuthenticator<C> {
    /// HTTP client
    http_client: C,
    /// Identity provider token endpoint
    url: Uri,
}

impl<C> HttpAuthenticator<C> {
    pub fn new(http_client: C, url: Uri) -> Self {
        Self { http_client, url }
    }
}

impl<C> Authenticator for HttpAuthenticator<C>
where
    C: HttpClient,
{
    /// Executes a form-encoded POST request against the token endpoint, authenticated with
    /// HTTP Basic, and decodes the token response.
    fn authenticate(
        &self,
        req: TokenRetrievalRequest,
    ) -> Result<TokenRetrievalResponse, AuthenticateError> {
        let request = build_request(&self.url, &req)?;

        let response = self
            .http_client
            .send(request)
            .map_err(|e| AuthenticateError::HttpTransportError(e.to_string()))?;

        let body = response.body();
        if !response.status().is_success() {
            return Err(AuthenticateError::HttpResponseError(
                response.status().as_u16(),
                String::from_utf8_lossy(body).to_string(),
            ));
        }

        serde_json::from_slice(body).map_err(|e| AuthenticateError::DeserializeError(e.to_string()))
    }
}

fn build_request(
    uri: &Uri,
    req: &TokenRetrievalRequest,
) -> Result<Request<Vec<u8>>, AuthenticateError> {
    let form_body = form_urlencoded::Serializer::new(String::new())
        .append_pair("grant_type", &req.grant_type)
        .append_pair("scope", &req.scope)
        .finish();

    let basic_credentials = general_purpose::STANDARD.encode(format!(
        "{}:{}",
        req.client_id,
        req.client_secret.expose()
    ));
    let mut basic_auth_header = HeaderValue::from_str(&format!("Basic {basic_credentials}"))
        .map_err(|_| {
            AuthenticateError::SerializeError(
                "invalid HTTP header value set for Authorization".to_string(),
            )
        })?;
    basic_auth_header.set_sensitive(true);

    http::Request::builder()
        .uri(uri)
        .method("POST")
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(AUTHORIZATION, basic_auth_header)
        .body(form_body.into_bytes())
        .map_err(|e| AuthenticateError::SerializeError(format!("Failed to build request: {e}")))
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenRetrievalRequest {
    pub client_id: ClientID,
    pub client_secret: ClientSecret,
    pub grant_type: String,
    pub scope: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TokenRetrievalResponse {
    pub access_token: AccessToken,
    /// Not used to build the `Authorization` header, which is always `Bearer`.
    #[serde(default)]
    pub token_type: String,
    /// The lifetime in seconds of the access token.
    pub expires_in: u64,
}
