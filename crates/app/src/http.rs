//! HTTP client for the storefront REST service.

use std::time::Duration;

use reqwest::{Client, IntoUrl, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::session::BearerToken;

/// Errors returned by any call to the storefront service.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport, timeout or body decoding failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("request failed with status {status}: {message}")]
    Status {
        /// Response status
        status: StatusCode,

        /// Response body, possibly empty
        message: String,
    },

    /// The server answered 2xx with a body that does not fit the contract.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The configured base URL cannot carry request paths.
    #[error("invalid base url `{0}`")]
    InvalidBaseUrl(String),
}

impl GatewayError {
    /// HTTP status, when the failure carried one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http(error) => error.status(),
            Self::Status { status, .. } => Some(*status),
            Self::UnexpectedResponse(_) | Self::InvalidBaseUrl(_) => None,
        }
    }

    /// Whether the credential was rejected (401/403), i.e. the session expired.
    pub fn is_auth(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        )
    }
}

/// Thin wrapper over `reqwest` that knows the API base URL and how to attach
/// the bearer credential.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
    base_url: String,
}

impl ApiClient {
    /// Creates a client for the given base URL.
    ///
    /// # Errors
    ///
    /// Returns an error when the base URL is not an http(s)-style URL or the
    /// underlying HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let base = Url::parse(base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| GatewayError::InvalidBaseUrl(base_url.to_string()))?;

        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Absolute URL for a path relative to the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// URL made of the given path segments under the base URL. Each segment
    /// is percent-encoded, so a `/`, `?` or `#` inside an id stays part of it.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();

        // Checked in `new`: the base URL can carry path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }

        url
    }

    /// Starts a request, attaching the credential when one is given.
    pub fn request(&self, method: Method, path: &str, token: Option<&BearerToken>) -> RequestBuilder {
        self.request_to(method, self.url(path), token)
    }

    /// Starts a request to an already built URL.
    pub fn request_to(
        &self,
        method: Method,
        url: impl IntoUrl,
        token: Option<&BearerToken>,
    ) -> RequestBuilder {
        let builder = self.http.request(method, url);

        match token {
            Some(token) => builder.bearer_auth(token.expose()),
            None => builder,
        }
    }

    /// Sends a request and turns non-2xx responses into [`GatewayError::Status`].
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-2xx status.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        let response = request.send().await?;
        let status = response.status();

        debug!(%status, url = %response.url(), "storefront api response");

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();

            return Err(GatewayError::Status { status, message });
        }

        Ok(response)
    }

    /// Sends a request and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-2xx status or a body
    /// that does not decode into `T`.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, GatewayError> {
        let response = self.execute(request).await?;

        Ok(response.json::<T>().await?)
    }
}
