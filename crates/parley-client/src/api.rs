//! HTTP client for the Parley REST API.
//!
//! History and contact discovery are request/response calls next to the
//! real-time socket. Every response is an [`ApiEnvelope`]; a `status: false`
//! envelope is surfaced as [`ApiError::Rejected`] with the server's message.
//!
//! Once [`ApiClient::login`] succeeds, the bearer token is attached to every
//! later request.

use parley_proto::{
    ApiEnvelope, ChatMessage, Contact, Credentials, LoginData, UsernameRequest,
};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// API client errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success HTTP status.
    #[error("server returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: StatusCode,
        /// Response body, trimmed.
        body: String,
    },

    /// The body was not a valid envelope.
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The server processed the request and refused it.
    #[error("{0}")]
    Rejected(String),

    /// A success envelope lacked its payload.
    #[error("response for {0} carried no data")]
    MissingData(&'static str),
}

/// Optional time window for [`ApiClient::chat_history`], seconds since epoch.
///
/// Unset bounds are left to the server, which defaults to the whole history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryWindow {
    /// Oldest timestamp to include.
    pub from_ts: Option<u64>,
    /// Newest timestamp to include.
    pub to_ts: Option<u64>,
}

/// Client for the REST endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a client for the API rooted at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http: reqwest::Client::new(), base_url, token: None }
    }

    /// Use an existing bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Bearer token from the last login, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Check that the server is reachable.
    pub async fn status(&self) -> Result<(), ApiError> {
        let request = self.http.get(self.url("/status"));
        self.call::<serde_json::Value>(request).await.map(drop)
    }

    /// Create an account.
    pub async fn register(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let body = Credentials { username: username.to_string(), password: password.to_string() };
        let request = self.http.post(self.url("/register")).json(&body);
        self.call::<serde_json::Value>(request).await.map(drop)
    }

    /// Log in and remember the returned token.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<String, ApiError> {
        let body = Credentials { username: username.to_string(), password: password.to_string() };
        let request = self.http.post(self.url("/login")).json(&body);
        let data: LoginData = self.call(request).await?.ok_or(ApiError::MissingData("login"))?;

        tracing::info!(user = %username, "logged in");
        self.token = Some(data.token.clone());
        Ok(data.token)
    }

    /// Check that `username` exists and can be added as a contact.
    pub async fn verify_contact(&self, username: &str) -> Result<(), ApiError> {
        let body = UsernameRequest { username: username.to_string() };
        let request = self.http.post(self.url("/verify-contact")).json(&body);
        self.call::<serde_json::Value>(request).await.map(drop)
    }

    /// Contacts of `username`. A missing list means none.
    pub async fn contact_list(&self, username: &str) -> Result<Vec<Contact>, ApiError> {
        let request = self.http.get(self.url("/contact-list")).query(&[("username", username)]);
        Ok(self.call(request).await?.unwrap_or_default())
    }

    /// Messages between `u1` and `u2` in the server's order, newest first.
    pub async fn chat_history(
        &self,
        u1: &str,
        u2: &str,
        window: HistoryWindow,
    ) -> Result<Vec<ChatMessage>, ApiError> {
        let mut query = vec![("u1", u1.to_string()), ("u2", u2.to_string())];
        if let Some(from_ts) = window.from_ts {
            query.push(("from-ts", from_ts.to_string()));
        }
        if let Some(to_ts) = window.to_ts {
            query.push(("to-ts", to_ts.to_string()));
        }

        let request = self.http.get(self.url("/chat-history")).query(&query);
        Ok(self.call(request).await?.unwrap_or_default())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Option<T>, ApiError> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(%status, "api request failed");
            return Err(ApiError::Status { status, body: body.trim().to_string() });
        }

        let envelope: ApiEnvelope<T> = serde_json::from_str(&body)?;
        envelope.into_result().map_err(ApiError::Rejected)
    }
}
