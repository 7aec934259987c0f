//! HttpTransport - real transport against the remote JSON API.
//!
//! This transport implements the Transport trait with reqwest against the
//! backend's authentication and users endpoints. Cancellation works by
//! dropping the in-flight future, which aborts the underlying request.

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::time::Duration;

use optic_types::{AuthRequest, AuthResponse, ErrorBody, User};

const SIGN_UP_PATH: &str = "/auth/sign-up";
const SIGN_IN_PATH: &str = "/auth/sign-in";
const USERS_PATH: &str = "/users";

/// Configuration for HttpTransport.
#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    /// Base URL of the remote API, e.g. `http://localhost:3000/api/v1`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl HttpTransportConfig {
    /// Configuration with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// HttpTransport implements the Transport trait over HTTP/JSON.
///
/// # Example
///
/// ```ignore
/// let transport = HttpTransport::new("http://localhost:3000/api/v1")?;
/// let resp = transport.sign_in(&request).await?;
/// ```
pub struct HttpTransport {
    http: reqwest::Client,
    config: HttpTransportConfig,
}

impl HttpTransport {
    /// Create a new HttpTransport with the default configuration.
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        Self::with_config(HttpTransportConfig::new(base_url))
    }

    /// Create a new HttpTransport with custom configuration.
    pub fn with_config(config: HttpTransportConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn auth(&self, path: &str, request: &AuthRequest) -> Result<AuthResponse, TransportError> {
        let response = self
            .http
            .post(self.url(path))
            .json(request)
            .send()
            .await
            .map_err(map_send_error)?;
        let response = check_status(response).await?;
        response
            .json::<AuthResponse>()
            .await
            .map_err(|e| TransportError::InvalidBody(e.to_string()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn sign_up(&self, request: &AuthRequest) -> Result<AuthResponse, TransportError> {
        self.auth(SIGN_UP_PATH, request).await
    }

    async fn sign_in(&self, request: &AuthRequest) -> Result<AuthResponse, TransportError> {
        self.auth(SIGN_IN_PATH, request).await
    }

    async fn list_users(&self, token: &str) -> Result<Vec<User>, TransportError> {
        let mut request = self.http.get(self.url(USERS_PATH));
        if !token.is_empty() {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(map_send_error)?;
        let response = check_status(response).await?;
        response
            .json::<Vec<User>>()
            .await
            .map_err(|e| TransportError::InvalidBody(e.to_string()))
    }

    async fn create_user(&self, user: &User) -> Result<User, TransportError> {
        let response = self
            .http
            .post(self.url(USERS_PATH))
            .json(user)
            .send()
            .await
            .map_err(map_send_error)?;
        let response = check_status(response).await?;
        response
            .json::<User>()
            .await
            .map_err(|e| TransportError::InvalidBody(e.to_string()))
    }

    async fn update_user(&self, user: &User) -> Result<User, TransportError> {
        let url = format!("{}/{}", self.url(USERS_PATH), user.id);
        let response = self
            .http
            .put(url)
            .json(user)
            .send()
            .await
            .map_err(map_send_error)?;
        let response = check_status(response).await?;
        response
            .json::<User>()
            .await
            .map_err(|e| TransportError::InvalidBody(e.to_string()))
    }

    async fn delete_user(&self, user: &User) -> Result<(), TransportError> {
        let url = format!("{}/{}", self.url(USERS_PATH), user.id);
        let response = self.http.delete(url).send().await.map_err(map_send_error)?;
        check_status(response).await?;
        Ok(())
    }
}

/// Map a reqwest send error; everything at this layer is a network-level
/// failure (connection refused, DNS, timeout).
fn map_send_error(err: reqwest::Error) -> TransportError {
    TransportError::Network(err.to_string())
}

/// Turn a non-success response into a structured remote error, extracting
/// the server's `{message}` body when it parses.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .map(|b| b.message);
    Err(TransportError::Remote {
        status,
        message,
        body,
    })
}
