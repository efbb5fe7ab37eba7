//! Authenticated request pipeline
//!
//! Every request carries the current bearer token. A token about to expire is
//! refreshed before sending; a 401 triggers a refresh and one replay. Only one
//! refresh call is ever in flight: requests that hit a 401 while it runs wait
//! for its outcome instead of starting their own.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::multipart::{Form, Part};
use reqwest::{Client as HttpClient, Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{RwLock, oneshot};

use crate::error::ApiError;
use crate::token;

/// Tokens expiring within this many seconds are refreshed before sending
pub const PROACTIVE_SKEW_SECS: i64 = 5;

/// Replays allowed after a 401
const MAX_RETRIES: u32 = 1;

/// Shown when a refresh fails and the session is torn down
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";

type RefreshOutcome = std::result::Result<String, ApiError>;

/// Obtains a fresh bearer token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> RefreshOutcome;
}

/// Told about session changes made by the gateway itself.
pub trait SessionListener: Send + Sync {
    /// A refresh produced a new token
    fn token_refreshed(&self, token: &str);

    /// A refresh failed; the session must be logged out
    fn session_expired(&self);
}

/// Request payload. Kept in replayable form so a request can be resent
/// after a refresh.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(MultipartBody),
}

/// Multipart form description, turned into a fresh `Form` per attempt.
#[derive(Debug, Clone, Default)]
pub struct MultipartBody {
    fields: Vec<(String, String)>,
    files: Vec<FilePart>,
}

#[derive(Debug, Clone)]
struct FilePart {
    name: String,
    filename: String,
    bytes: Vec<u8>,
    mime_type: Option<String>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Add a binary file field
    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        bytes: Vec<u8>,
        mime_type: Option<String>,
    ) -> Self {
        self.files.push(FilePart {
            name: name.into(),
            filename: filename.into(),
            bytes,
            mime_type,
        });
        self
    }

    fn to_form(&self) -> std::result::Result<Form, ApiError> {
        let mut form = Form::new();
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }
        for file in &self.files {
            let mut part = Part::bytes(file.bytes.clone()).file_name(file.filename.clone());
            if let Some(mime) = &file.mime_type {
                part = part
                    .mime_str(mime)
                    .map_err(|e| ApiError::new(format!("Invalid MIME type {}: {}", mime, e)))?;
            }
            form = form.part(file.name.clone(), part);
        }
        Ok(form)
    }
}

/// Which path asked for a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshTrigger {
    /// Token close to expiry before sending; failure is tolerated
    Proactive,
    /// Server answered 401; failure ends the session
    Reactive,
}

/// Refresh flag and the requests waiting on it, always changed together.
#[derive(Default)]
struct RefreshState {
    in_progress: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// Ownership of the in-flight refresh.
///
/// Settling (or dropping, if the leading request is cancelled) clears the
/// flag and hands the same outcome to every waiter in enqueue order.
struct RefreshFlight<'a> {
    state: &'a Mutex<RefreshState>,
    settled: bool,
}

impl RefreshFlight<'_> {
    fn settle(mut self, outcome: &RefreshOutcome) {
        self.finish(outcome);
        self.settled = true;
    }

    fn finish(&self, outcome: &RefreshOutcome) {
        let waiters = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.in_progress = false;
            std::mem::take(&mut state.waiters)
        };

        debug!("Settling {} queued request(s)", waiters.len());
        for waiter in waiters {
            // A waiter whose request was dropped no longer cares
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl Drop for RefreshFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.finish(&Err(ApiError::new("Token refresh was cancelled")));
        }
    }
}

/// Authenticated HTTP client shared by every API call.
pub struct RequestGateway {
    http: HttpClient,
    base_url: String,
    token: RwLock<Option<String>>,
    refresher: Arc<dyn TokenRefresher>,
    listener: Option<Arc<dyn SessionListener>>,
    refresh: Mutex<RefreshState>,
}

impl RequestGateway {
    /// Build the underlying HTTP client.
    ///
    /// The cookie store carries the refresh credential set at login.
    pub fn http_client(timeout: Duration) -> std::result::Result<HttpClient, ApiError> {
        HttpClient::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| ApiError::new(format!("Failed to build HTTP client: {}", e)))
    }

    pub fn new(
        http: HttpClient,
        base_url: impl Into<String>,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: RwLock::new(None),
            refresher,
            listener: None,
            refresh: Mutex::new(RefreshState::default()),
        }
    }

    /// Report refreshes and forced logouts to `listener`
    pub fn with_listener(mut self, listener: Arc<dyn SessionListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Underlying HTTP client, for unauthenticated calls sharing the cookie store
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Replace the bearer token; `None` stops sending `Authorization`.
    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    /// Current bearer token
    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    fn refresh_state(&self) -> MutexGuard<'_, RefreshState> {
        self.refresh.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// GET `path` and decode the JSON response
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> std::result::Result<T, ApiError> {
        self.request(Method::GET, path, RequestBody::Empty).await
    }

    /// POST a JSON body to `path`
    pub async fn post<T, B>(&self, path: &str, body: &B) -> std::result::Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, path, json_body(body)?).await
    }

    /// PUT a JSON body to `path`
    #[allow(dead_code)]
    pub async fn put<T, B>(&self, path: &str, body: &B) -> std::result::Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::PUT, path, json_body(body)?).await
    }

    /// DELETE `path`
    #[allow(dead_code)]
    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> std::result::Result<T, ApiError> {
        self.request(Method::DELETE, path, RequestBody::Empty).await
    }

    /// POST a multipart form to `path`
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        form: MultipartBody,
    ) -> std::result::Result<T, ApiError> {
        self.request(Method::POST, path, RequestBody::Multipart(form))
            .await
    }

    /// Send an authenticated request, refreshing the token as needed.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> std::result::Result<T, ApiError> {
        let url = self.url(path);

        self.refresh_if_expiring().await;
        let mut token = self.token().await;
        let mut attempt = 0;

        loop {
            let response = self.send(&method, &url, &body, token.as_deref()).await?;

            if response.status() == StatusCode::UNAUTHORIZED && attempt < MAX_RETRIES {
                attempt += 1;
                debug!("{} {} returned 401, refreshing token", method, url);
                token = Some(self.single_flight_refresh(RefreshTrigger::Reactive).await?);
                continue;
            }

            return decode_response(response).await;
        }
    }

    async fn send(
        &self,
        method: &Method,
        url: &str,
        body: &RequestBody,
        token: Option<&str>,
    ) -> std::result::Result<Response, ApiError> {
        let mut builder = self.http.request(method.clone(), url);

        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(form) => builder.multipart(form.to_form()?),
        };

        builder
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(ApiError::from)
    }

    /// Refresh ahead of time when the token is within the skew window.
    ///
    /// Failure is only logged: the request goes out anyway and a 401 sends
    /// it down the reactive path.
    async fn refresh_if_expiring(&self) {
        let Some(token) = self.token().await else {
            return;
        };

        if !token::is_expired(Some(&token), PROACTIVE_SKEW_SECS) {
            return;
        }

        debug!("Token expires within {}s, refreshing first", PROACTIVE_SKEW_SECS);
        if let Err(e) = self.single_flight_refresh(RefreshTrigger::Proactive).await {
            debug!("Proactive refresh failed: {}", e);
        }
    }

    async fn single_flight_refresh(&self, trigger: RefreshTrigger) -> RefreshOutcome {
        let waiter = {
            let mut state = self.refresh_state();
            if state.in_progress {
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                Some(rx)
            } else {
                state.in_progress = true;
                None
            }
        };

        if let Some(rx) = waiter {
            debug!("Refresh already in flight, waiting for its result");
            return rx
                .await
                .unwrap_or_else(|_| Err(ApiError::new("Token refresh was cancelled")));
        }

        let flight = RefreshFlight {
            state: &self.refresh,
            settled: false,
        };

        let outcome = match self.refresher.refresh().await {
            Ok(token) if token.is_empty() => Err(ApiError::new("Refresh returned no token")),
            other => other,
        };

        if let Ok(token) = &outcome {
            debug!("Token refreshed");
            self.set_token(Some(token.clone())).await;
            if let Some(listener) = &self.listener {
                listener.token_refreshed(token);
            }
        }

        flight.settle(&outcome);

        if outcome.is_err() && trigger == RefreshTrigger::Reactive {
            self.expire_session().await;
        }

        outcome
    }

    async fn expire_session(&self) {
        warn!("{}", SESSION_EXPIRED_MESSAGE);
        self.set_token(None).await;
        if let Some(listener) = &self.listener {
            listener.session_expired();
        }
    }

    #[cfg(test)]
    fn pending_waiters(&self) -> usize {
        self.refresh_state().waiters.len()
    }

    #[cfg(test)]
    fn is_refreshing(&self) -> bool {
        self.refresh_state().in_progress
    }
}

fn json_body<B: Serialize + ?Sized>(body: &B) -> std::result::Result<RequestBody, ApiError> {
    serde_json::to_value(body)
        .map(RequestBody::Json)
        .map_err(|e| ApiError::new(format!("Failed to encode request body: {}", e)))
}

/// Decode a success body, or normalize a rejection.
pub(crate) async fn decode_response<T: DeserializeOwned>(
    response: Response,
) -> std::result::Result<T, ApiError> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(ApiError::from)?;

    if status.is_success() {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return serde_json::from_value(Value::Null).map_err(ApiError::invalid_response);
        }
        return serde_json::from_slice(&bytes).map_err(ApiError::invalid_response);
    }

    let data = if bytes.is_empty() {
        None
    } else {
        Some(serde_json::from_slice::<Value>(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).trim().to_string())
        }))
    };

    Err(ApiError::from_response(status.as_u16(), data))
}

/// Refresh through `POST <auth>/refresh`, relying on the refresh cookie.
pub struct HttpRefresher {
    http: HttpClient,
    url: String,
}

impl HttpRefresher {
    pub fn new(http: HttpClient, auth_base_url: &str) -> Self {
        Self {
            http,
            url: format!("{}/refresh", auth_base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl TokenRefresher for HttpRefresher {
    async fn refresh(&self) -> RefreshOutcome {
        let response = self
            .http
            .post(&self.url)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(ApiError::from)?;

        let body: Value = decode_response(response).await?;
        body.get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ApiError::invalid_response("refresh response carried no token"))
    }
}
