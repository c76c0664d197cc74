/// Remote data client
///
/// Thin wrapper around `reqwest` that knows how to reach the Taskboard REST
/// backend: it joins endpoint paths onto the configured base URL, attaches
/// the session's bearer token, and turns non-success responses into
/// [`ClientError`]s.
///
/// # Authentication
///
/// Every endpoint is authenticated except the two that issue credentials
/// (`auth/signin` and `auth/signup`, built with [`Endpoint::public`]).
/// An authenticated endpoint issued without a token fails with
/// [`ClientError::Unauthenticated`] and sends nothing. A `401` answer clears
/// the session.
///
/// # Example
///
/// ```no_run
/// use taskboard_client::config::Config;
/// use taskboard_client::http::{Endpoint, RemoteClient};
/// use taskboard_shared::models::project::Project;
/// use taskboard_shared::session::{MemoryPersistence, SessionStore};
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::with_base_url("http://localhost:8000");
/// let session = SessionStore::load(Arc::new(MemoryPersistence::default()));
/// let client = RemoteClient::new(&config.api, session)?;
///
/// let projects: Vec<Project> = client.send(Endpoint::get("projects")).await?;
/// # Ok(())
/// # }
/// ```

use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use taskboard_shared::session::SessionStore;

use crate::config::ApiConfig;
use crate::error::{ClientError, ClientResult, ErrorResponse};

/// Whether an endpoint carries the session token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    /// Sent without credentials
    None,
    /// Sent with `Authorization: Bearer <token>`
    Bearer,
}

/// One request against the backend
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub method: Method,
    pub path: String,
    /// Segments appended after `path`, each percent-encoded on its own
    pub segments: Vec<String>,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<serde_json::Value>,
    pub auth: Auth,
}

impl Endpoint {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Endpoint {
            method,
            path: path.into(),
            segments: Vec::new(),
            query: Vec::new(),
            body: None,
            auth: Auth::Bearer,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Sends the endpoint without a token
    pub fn public(mut self) -> Self {
        self.auth = Auth::None;
        self
    }

    /// Appends one path segment
    ///
    /// `/`, `?` and `#` in the value are encoded, so it can not change the
    /// route.
    pub fn segment(mut self, value: impl Into<String>) -> Self {
        self.segments.push(value.into());
        self
    }

    /// Appends a query parameter (URL-encoded when sent)
    pub fn query(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    /// Sets the JSON body
    pub fn json<B: Serialize>(mut self, body: &B) -> ClientResult<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| ClientError::InvalidRequest(format!("Failed to encode body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }
}

/// HTTP client bound to one backend and one session
#[derive(Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    base_url: Url,
    session: SessionStore,
}

impl RemoteClient {
    /// Creates a client from configuration
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidRequest` if the base URL does not parse
    /// or the HTTP client cannot be built.
    pub fn new(config: &ApiConfig, session: SessionStore) -> ClientResult<Self> {
        let base_url = parse_base_url(&config.base_url)?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("taskboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;

        Ok(RemoteClient {
            http,
            base_url,
            session,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Sends the endpoint and decodes the JSON response
    pub async fn send<T: DeserializeOwned>(&self, endpoint: Endpoint) -> ClientResult<T> {
        let response = self.execute(endpoint).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Sends the endpoint and discards the response body
    pub async fn send_unit(&self, endpoint: Endpoint) -> ClientResult<()> {
        self.execute(endpoint).await?;
        Ok(())
    }

    async fn execute(&self, endpoint: Endpoint) -> ClientResult<reqwest::Response> {
        let url = endpoint_url(&self.base_url, &endpoint)?;

        let mut request = self.http.request(endpoint.method.clone(), url);

        if !endpoint.query.is_empty() {
            request = request.query(&endpoint.query);
        }

        if endpoint.auth == Auth::Bearer {
            let token = self.session.token().ok_or_else(|| {
                tracing::debug!(path = %endpoint.path, "No session token, request not sent");
                ClientError::Unauthenticated
            })?;
            request = request.bearer_auth(token);
        }

        if let Some(body) = &endpoint.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(
                method = %endpoint.method,
                path = %endpoint.path,
                error = %e,
                "Request failed"
            );
            ClientError::from(e)
        })?;

        let status = response.status();
        tracing::debug!(
            method = %endpoint.method,
            path = %endpoint.path,
            status = status.as_u16(),
            "Request completed"
        );

        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED && endpoint.auth == Auth::Bearer {
            tracing::info!(path = %endpoint.path, "Token rejected, clearing session");
            self.session.sign_out();
        }

        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string(),
        };

        Err(ClientError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

fn endpoint_url(base_url: &Url, endpoint: &Endpoint) -> ClientResult<Url> {
    let mut url = base_url
        .join(endpoint.path.trim_start_matches('/'))
        .map_err(|e| ClientError::InvalidRequest(format!("Invalid path {}: {}", endpoint.path, e)))?;

    if !endpoint.segments.is_empty() {
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidRequest(format!("Base URL can not take a path: {}", base_url)))?
            .pop_if_empty()
            .extend(&endpoint.segments);
    }

    Ok(url)
}

fn parse_base_url(raw: &str) -> ClientResult<Url> {
    // Url::join replaces the last segment unless the base ends with '/'
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&normalized)
        .map_err(|e| ClientError::InvalidRequest(format!("Invalid base URL {}: {}", raw, e)))
}
