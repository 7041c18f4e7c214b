use crate::http::config::HttpConfig;
use crate::http_client::{HttpClient as UserRoleHttpClient, HttpClientError};
use http::{Request, Response};
use reqwest::Proxy;
use reqwest::blocking::{Client, Response as BlockingResponse};

/// [UserRoleHttpClient] backed by a blocking reqwest client.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self, HttpBuildError> {
        let mut builder = Client::builder()
            .use_rustls_tls()
            .tls_built_in_native_certs(true)
            .timeout(config.timeout)
            .connect_timeout(config.conn_timeout);

        if !config.proxy.url().is_empty() {
            let proxy = Proxy::all(config.proxy.url().to_string())
                .map_err(|err| HttpBuildError::ClientBuilder(err.to_string()))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|err| HttpBuildError::ClientBuilder(err.to_string()))?;

        Ok(Self { client })
    }

    fn send(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, HttpResponseError> {
        let (parts, body) = request.into_parts();
        let req = self
            .client
            .request(parts.method, parts.uri.to_string().as_str())
            .headers(parts.headers)
            .body(body);

        let res = req
            .send()
            .map_err(|err| HttpResponseError::TransportError(err.to_string()))?;

        try_build_response(res)
    }
}

fn try_build_response(res: BlockingResponse) -> Result<Response<Vec<u8>>, HttpResponseError> {
    let status = res.status();
    let version = res.version();

    let body: Vec<u8> = res
        .bytes()
        .map_err(|err| HttpResponseError::ReadingResponse(err.to_string()))?
        .into();

    http::Response::builder()
        .status(status)
        .version(version)
        .body(body)
        .map_err(|err| HttpResponseError::BuildingResponse(err.to_string()))
}

impl UserRoleHttpClient for HttpClient {
    fn send(&self, req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, HttpClientError> {
        let response = self.send(req)?;

        Ok(response)
    }
}

impl From<HttpResponseError> for HttpClientError {
    fn from(err: HttpResponseError) -> Self {
        match err {
            HttpResponseError::TransportError(msg) => HttpClientError::TransportError(msg),
            HttpResponseError::BuildingResponse(msg) | HttpResponseError::ReadingResponse(msg) => {
                HttpClientError::InvalidResponse(msg)
            }
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum HttpBuildError {
    #[error("could not build the http client: {0}")]
    ClientBuilder(String),
}

#[derive(thiserror::Error, Debug)]
enum HttpResponseError {
    #[error("could not read response body: {0}")]
    ReadingResponse(String),
    #[error("could not build response: {0}")]
    BuildingResponse(String),
    #[error("http transport error: `{0}`")]
    TransportError(String),
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;
    use httpmock::{Method::POST, MockServer};

    use super::*;
    use crate::http::config::ProxyConfig;

    fn client(timeout: Duration) -> HttpClient {
        HttpClient::new(&HttpConfig::new(timeout, timeout, ProxyConfig::default())).unwrap()
    }

    #[test]
    fn non_success_statuses_are_responses() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/_v/create-user-role")
                .header("authorization", "Bearer abc")
                .body("{}");
            then.status(429).body("slow down");
        });

        let request = Request::builder()
            .method("POST")
            .uri(server.url("/_v/create-user-role"))
            .header("authorization", "Bearer abc")
            .body(b"{}".to_vec())
            .unwrap();

        let response = UserRoleHttpClient::send(&client(Duration::from_secs(5)), request).unwrap();

        assert_eq!(response.status(), 429);
        assert_eq!(response.body().as_slice(), b"slow down");
        mock.assert();
    }

    #[test]
    fn timeouts_are_transport_errors() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/slow");
            then.status(200).delay(Duration::from_millis(300));
        });

        let request = Request::builder()
            .method("POST")
            .uri(server.url("/slow"))
            .body(Vec::new())
            .unwrap();

        let error =
            UserRoleHttpClient::send(&client(Duration::from_millis(50)), request).unwrap_err();

        assert_matches!(error, HttpClientError::TransportError(_));
        mock.assert();
    }

    #[test]
    fn connection_refused_is_a_transport_error() {
        // Port 9 (discard) is not expected to be listening locally.
        let request = Request::builder()
            .method("POST")
            .uri("http://127.0.0.1:9/")
            .body(Vec::new())
            .unwrap();

        let error = UserRoleHttpClient::send(&client(Duration::from_secs(1)), request).unwrap_err();

        assert_matches!(error, HttpClientError::TransportError(_));
    }

    #[test]
    fn build_with_proxy() {
        let proxy = ProxyConfig::new("http://localhost:8888").unwrap();
        let config = HttpConfig::new(Duration::from_secs(1), Duration::from_secs(1), proxy);

        assert!(HttpClient::new(&config).is_ok());
    }
}
