//! Request lifecycle tracking: loading/error state, per-request cancellation
//! handles, and teardown of everything still in flight.
//!
//! `is_loading` is a single flag shared by every call on the manager. With
//! concurrent calls the last one to settle decides its value; use
//! [`HttpClientManager::active_request_count`] when an exact count matters.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::error::ApiError;
use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tracing::{debug, warn};

use crate::transport::{
    HttpRequest, HttpTransport, RequestBuildError, ReqwestTransport, TransportResponse,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpRequestState {
    pub is_loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HttpError {
    #[error("{message}")]
    RequestFailed { status: u16, message: String },
    #[error("could not reach the server: {0}")]
    Network(String),
    #[error("could not build the request: {0}")]
    InvalidRequest(String),
    #[error("server returned an unreadable response: {0}")]
    InvalidBody(String),
    #[error("request cancelled")]
    Cancelled,
}

impl HttpError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Default)]
struct RequestRegistry {
    torn_down: bool,
    next_request_id: u64,
    handles: HashMap<u64, oneshot::Sender<()>>,
}

struct HttpClientInner {
    transport: Arc<dyn HttpTransport>,
    state: watch::Sender<HttpRequestState>,
    registry: Mutex<RequestRegistry>,
}

/// Cloning yields another handle onto the same state and registry.
#[derive(Clone)]
pub struct HttpClientManager {
    inner: Arc<HttpClientInner>,
}

impl Default for HttpClientManager {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClientManager {
    pub fn new() -> Self {
        Self::with_transport(Arc::new(ReqwestTransport::new()))
    }

    pub fn with_transport(transport: Arc<dyn HttpTransport>) -> Self {
        let (state, _) = watch::channel(HttpRequestState::default());
        Self {
            inner: Arc::new(HttpClientInner {
                transport,
                state,
                registry: Mutex::new(RequestRegistry::default()),
            }),
        }
    }

    pub async fn get(&self, url: &str) -> Result<Value, HttpError> {
        self.send_request(HttpRequest::new(url)).await
    }

    /// Runs `request` and returns the parsed JSON body.
    ///
    /// Failures other than [`HttpError::Cancelled`] are recorded in the error
    /// slot before being returned. A request cancelled by [`teardown`] leaves
    /// the state untouched.
    ///
    /// [`teardown`]: HttpClientManager::teardown
    pub async fn send_request(&self, request: HttpRequest) -> Result<Value, HttpError> {
        let Some((request_id, cancelled)) = self.register() else {
            debug!(url = %request.url, "http: manager torn down, request dropped");
            return Err(HttpError::Cancelled);
        };
        let in_flight = InFlight {
            manager: self,
            request_id,
            abandoned: true,
        };

        if !self.apply(|state| state.is_loading = true) {
            in_flight.settle();
            return Err(HttpError::Cancelled);
        }

        let method = request.method.clone();
        let url = request.url.clone();
        debug!(request_id, %method, %url, "http: request started");

        let outcome = tokio::select! {
            response = self.inner.transport.execute(request) => Some(response),
            _ = cancelled => None,
        };
        in_flight.settle();

        let Some(response) = outcome else {
            debug!(request_id, %method, %url, "http: request cancelled");
            return Err(HttpError::Cancelled);
        };

        let result = match response {
            Ok(response) => interpret_response(response),
            Err(err) if err.chain().any(|cause| cause.is::<RequestBuildError>()) => {
                Err(HttpError::InvalidRequest(format!("{err:#}")))
            }
            Err(err) => Err(HttpError::Network(format!("{err:#}"))),
        };

        let applied = match &result {
            Ok(_) => self.apply(|state| state.is_loading = false),
            Err(err) => {
                warn!(request_id, %method, %url, error = %err, "http: request failed");
                let message = err.to_string();
                self.apply(|state| {
                    state.error = Some(message);
                    state.is_loading = false;
                })
            }
        };
        if !applied {
            debug!(request_id, %method, %url, "http: settled after teardown");
            return Err(HttpError::Cancelled);
        }

        result
    }

    /// Like [`send_request`](Self::send_request) but decodes the body into `T`.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
    ) -> Result<T, HttpError> {
        let body = self.send_request(request).await?;
        self.decode(body)
    }

    /// Decodes an already settled body, recording a mismatch as the error.
    pub fn decode<T: DeserializeOwned>(&self, body: Value) -> Result<T, HttpError> {
        serde_json::from_value(body).map_err(|err| {
            let err = HttpError::InvalidBody(err.to_string());
            warn!(error = %err, "http: response did not match the expected shape");
            let message = err.to_string();
            self.apply(|state| state.error = Some(message));
            err
        })
    }

    pub fn clear_error(&self) {
        self.apply(|state| state.error = None);
    }

    /// Cancels every in-flight request and stops all further state changes.
    /// Safe to call more than once.
    pub fn teardown(&self) {
        let handles = {
            let mut registry = self.registry();
            registry.torn_down = true;
            std::mem::take(&mut registry.handles)
        };
        if !handles.is_empty() {
            debug!(count = handles.len(), "http: cancelling in-flight requests");
        }
        for (_, handle) in handles {
            let _ = handle.send(());
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.registry().torn_down
    }

    pub fn active_request_count(&self) -> usize {
        self.registry().handles.len()
    }

    pub fn snapshot(&self) -> HttpRequestState {
        self.inner.state.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.inner.state.borrow().error.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<HttpRequestState> {
        self.inner.state.subscribe()
    }

    fn registry(&self) -> MutexGuard<'_, RequestRegistry> {
        self.inner
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self) -> Option<(u64, oneshot::Receiver<()>)> {
        let mut registry = self.registry();
        if registry.torn_down {
            return None;
        }
        let request_id = registry.next_request_id;
        registry.next_request_id += 1;
        let (tx, rx) = oneshot::channel();
        registry.handles.insert(request_id, tx);
        Some((request_id, rx))
    }

    fn unregister(&self, request_id: u64) {
        self.registry().handles.remove(&request_id);
    }

    /// State writes happen under the registry lock so none can land after
    /// `teardown` has returned.
    fn apply(&self, update: impl FnOnce(&mut HttpRequestState)) -> bool {
        let registry = self.registry();
        if registry.torn_down {
            return false;
        }
        self.inner.state.send_modify(update);
        true
    }
}

/// Removes a request's cancel handle however its call ends. If the caller
/// drops the future before it settles, the loading flag is cleared as well.
struct InFlight<'a> {
    manager: &'a HttpClientManager,
    request_id: u64,
    abandoned: bool,
}

impl InFlight<'_> {
    fn settle(mut self) {
        self.abandoned = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.manager.unregister(self.request_id);
        if self.abandoned && self.manager.apply(|state| state.is_loading = false) {
            debug!(request_id = self.request_id, "http: request abandoned by caller");
        }
    }
}

fn interpret_response(response: TransportResponse) -> Result<Value, HttpError> {
    let parsed = if response.body.iter().all(u8::is_ascii_whitespace) {
        Ok(Value::Null)
    } else {
        serde_json::from_slice::<Value>(&response.body)
    };

    if !response.is_success() {
        let api_error = parsed
            .as_ref()
            .map(ApiError::from_body)
            .unwrap_or_default();
        return Err(HttpError::RequestFailed {
            status: response.status,
            message: api_error.message_or_default().to_string(),
        });
    }

    parsed.map_err(|err| HttpError::InvalidBody(err.to_string()))
}

/// Shorthand for building a request with an explicit method.
pub fn request(method: Method, url: impl Into<String>) -> HttpRequest {
    HttpRequest::new(url).method(method)
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
