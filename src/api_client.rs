//! The HTTP client that every backend call goes through.
//!
//! The client attaches the stored access token to authenticated requests and
//! silently refreshes it once when the backend answers 401. See
//! [ApiClient::send] for the exact policy.

use std::{sync::Arc, time::Duration};

use reqwest::{
    Client, Method, Response, StatusCode,
    header::{self, HeaderMap, HeaderValue},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use url::Url;

use crate::{
    Error, endpoints,
    logging::{log_request, log_response},
    token_store::{TokenKind, TokenStore},
};

const USER_AGENT: &str = concat!("tally/", env!("CARGO_PKG_VERSION"));

/// A description of a single backend request.
///
/// Requests are plain values. The retry flag and the bearer override live
/// on the value itself, so concurrent requests never see each other's state.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    authenticated: bool,
    bearer: Option<String>,
    retried: bool,
}

impl ApiRequest {
    /// Create an authenticated request for `path`, relative to the base URL.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            authenticated: true,
            bearer: None,
            retried: false,
        }
    }

    /// Shortcut for a `GET` request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Shortcut for a `POST` request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Shortcut for a `PUT` request.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// Shortcut for a `DELETE` request.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Add a query parameter.
    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_owned(), value.into()));
        self
    }

    /// Set the JSON body.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidResponse] if `body` cannot be represented as
    /// JSON, which only happens for maps with non-string keys.
    pub fn json(mut self, body: &impl Serialize) -> Result<Self, Error> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Send the request without a bearer token and never refresh it.
    ///
    /// Used for the endpoints that establish a session, e.g. log in and refresh.
    pub fn anonymous(mut self) -> Self {
        self.authenticated = false;
        self
    }

    /// Use `token` as the bearer token instead of the stored access token.
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// Mark the request as already retried, so a 401 is returned as is.
    pub fn mark_retried(mut self) -> Self {
        self.retried = true;
        self
    }

    /// Whether the request has already been through a refresh and resend.
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    /// The HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The path relative to the base URL.
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// The body of a successful refresh.
///
/// Backends that rotate refresh tokens also send the new refresh token.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RefreshedTokens {
    /// The new access token.
    pub access: String,
    /// The new refresh token, if the backend rotated it.
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

/// The HTTP client for the Tally backend.
///
/// Cloning is cheap and clones share the connection pool and token store.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http: Client,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
    /// Create a client for the backend at `base_url`.
    ///
    /// `base_url` is treated as a directory, so `http://host/api` and
    /// `http://host/api/` both resolve `auth/login` to `http://host/api/auth/login`.
    ///
    /// # Errors
    ///
    /// Returns [Error::Network] if the HTTP client cannot be built, e.g. when
    /// the TLS backend fails to initialise.
    pub fn new(
        base_url: Url,
        tokens: Arc<dyn TokenStore>,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let http = Client::builder()
            .default_headers(default_headers)
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|error| Error::Network(format!("could not build HTTP client: {error}")))?;

        Ok(Self {
            base_url: as_directory(base_url),
            http,
            tokens,
        })
    }

    /// The token store shared with this client.
    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Send `request`, refreshing the access token once if it was rejected.
    ///
    /// When the response is 401, the request has not been retried yet, and a
    /// refresh token is stored, the client:
    /// 1. marks the request as retried,
    /// 2. exchanges the refresh token for a new access token,
    /// 3. on success stores the new token, resends the request with it, and
    ///    returns the outcome of that second attempt,
    /// 4. on failure returns the original 401 as [Error::Unauthorized].
    ///
    /// The client never clears stored tokens, even when the refresh fails.
    ///
    /// # Errors
    ///
    /// - [Error::Unauthorized] for a 401 that survived the refresh policy,
    /// - [Error::Server] for any other non-2xx status,
    /// - [Error::Network] if no response was received.
    pub async fn send(&self, request: ApiRequest) -> Result<Response, Error> {
        let response = self.dispatch(&request).await?;

        if response.status() != StatusCode::UNAUTHORIZED
            || request.is_retried()
            || !request.authenticated
        {
            return check_status(response).await;
        }

        let Some(refresh_token) = self.tokens.get(TokenKind::Refresh) else {
            return check_status(response).await;
        };

        let original_error = match check_status(response).await {
            Err(error) => error,
            Ok(response) => return Ok(response),
        };

        let request = request.mark_retried();

        let refreshed = match self.refresh_access_token(&refresh_token).await {
            Ok(refreshed) => refreshed,
            Err(error) => {
                tracing::warn!(
                    "could not refresh the access token for {} {}: {error}",
                    request.method(),
                    request.path()
                );
                return Err(original_error);
            }
        };

        self.tokens.set(TokenKind::Access, &refreshed.access);
        if let Some(rotated) = &refreshed.refresh {
            self.tokens.set(TokenKind::Refresh, rotated);
        }

        let request = request.with_bearer(refreshed.access);
        tracing::debug!("resending {} {} with a refreshed token", request.method(), request.path());
        let response = self.dispatch(&request).await?;
        check_status(response).await
    }

    /// Send `request` once and decode the JSON response body.
    ///
    /// # Errors
    ///
    /// See [ApiClient::send]. Also returns [Error::InvalidResponse] if the
    /// body does not decode into `T`.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, Error> {
        let response = self.send(request).await?;
        decode_json(response).await
    }

    /// Send `request` exactly once, without the refresh policy.
    ///
    /// The stored access token is still attached.
    ///
    /// # Errors
    ///
    /// See [ApiClient::send].
    pub async fn execute(&self, request: &ApiRequest) -> Result<Response, Error> {
        let response = self.dispatch(request).await?;
        check_status(response).await
    }

    /// Send `request` exactly once and decode the JSON response body.
    ///
    /// # Errors
    ///
    /// See [ApiClient::execute] and [ApiClient::send_json].
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> Result<T, Error> {
        let response = self.execute(request).await?;
        decode_json(response).await
    }

    /// Exchange `refresh_token` for a new access token.
    ///
    /// This does not touch the token store.
    ///
    /// # Errors
    ///
    /// Returns [Error::Unauthorized] if the backend rejected the refresh token,
    /// or any of the errors of [ApiClient::send].
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<RefreshedTokens, Error> {
        let request = ApiRequest::post(endpoints::REFRESH)
            .anonymous()
            .json(&RefreshRequest {
                refresh: refresh_token,
            })?;
        let response = self.execute(&request).await?;
        decode_json(response).await
    }

    /// Resolve `path` against the base URL.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidUrl] if the result is not a valid URL.
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|_| Error::InvalidUrl(format!("{}{path}", self.base_url)))
    }

    /// Attach headers and send, without looking at the status.
    async fn dispatch(&self, request: &ApiRequest) -> Result<Response, Error> {
        let url = self.url(&request.path)?;
        log_request(&request.method, &url, request.body.as_ref());

        let mut builder = self.http.request(request.method.clone(), url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        if request.authenticated {
            let token = request
                .bearer
                .clone()
                .or_else(|| self.tokens.get(TokenKind::Access));
            if let Some(token) = token {
                builder = builder.bearer_auth(token);
            }
        }

        Ok(builder.send().await?)
    }
}

fn as_directory(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Turn non-2xx responses into errors.
async fn check_status(response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    log_response(status, &url, &body);
    let message = error_message(status, &body);

    if status == StatusCode::UNAUTHORIZED {
        Err(Error::Unauthorized(message))
    } else {
        Err(Error::Server {
            status: status.as_u16(),
            message,
        })
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, Error> {
    let status = response.status();
    let url = response.url().clone();
    let body = response.text().await?;
    log_response(status, &url, &body);
    Ok(serde_json::from_str(&body)?)
}

/// Pull a human readable message out of an error body.
///
/// DRF style bodies carry the message in `detail`, validation errors map
/// field names to lists of messages. Anything else is returned verbatim.
fn error_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_owned();
    }

    let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(body) else {
        return body.to_owned();
    };

    if let Some(Value::String(detail)) = fields.get("detail") {
        return detail.clone();
    }

    let messages: Vec<String> = fields
        .iter()
        .map(|(field, value)| match value {
            Value::Array(items) => {
                let joined = items
                    .iter()
                    .map(|item| {
                        item.as_str()
                            .map(str::to_owned)
                            .unwrap_or_else(|| item.to_string())
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("{field}: {joined}")
            }
            Value::String(text) => format!("{field}: {text}"),
            other => format!("{field}: {other}"),
        })
        .collect();

    if messages.is_empty() {
        body.to_owned()
    } else {
        messages.join("; ")
    }
}
