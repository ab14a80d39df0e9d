//! Request/response interceptors.
//!
//! Every constructed client runs its interceptors around each request:
//! `on_request` before the request is sent, then exactly one of
//! `on_response` (2xx) or `on_error` (any other status or a transport
//! failure). A failure is reported to the interceptors and then swallowed;
//! the caller only sees `None`.

use crate::classifier::ErrorClassifier;
use crate::client::signals::LoadingSignal;
use crate::notify::{Notification, NotificationDispatcher};
use crate::store::StateStore;
use reqwest::StatusCode;
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

/// What the request interceptor captured about an outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Upper-cased HTTP method.
    pub method: String,
    /// Path as given by the caller, relative to the base URL.
    pub path: String,
}

impl RequestContext {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_uppercase(),
            path: path.to_string(),
        }
    }
}

/// Response context passed to interceptors.
#[derive(Debug, Clone)]
pub struct ResponseContext {
    pub status: StatusCode,
}

/// Why a request did not produce a 2xx response.
#[derive(Debug, thiserror::Error)]
pub enum RequestFailure {
    #[error("HTTP status {0}")]
    Status(StatusCode),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl RequestFailure {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RequestFailure::Transport(e) if e.is_timeout())
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RequestFailure::Status(status) => Some(*status),
            RequestFailure::Transport(e) => e.status(),
            RequestFailure::InvalidUrl(_) => None,
        }
    }
}

/// Hooks run around each request.
pub trait Interceptor: Send + Sync {
    fn on_request(&self, _ctx: &RequestContext) {}

    fn on_response(&self, _ctx: &RequestContext, _resp: &ResponseContext) {}

    fn on_error(&self, _ctx: &RequestContext, _err: &RequestFailure) {}
}

/// Runs interceptors in registration order.
#[derive(Clone, Default)]
pub struct InterceptorPipeline {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorPipeline {
    pub fn new() -> Self {
        Self {
            interceptors: Vec::new(),
        }
    }

    pub fn with(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Run hooks around a provided async function that performs the actual call.
    pub async fn execute<F, Fut>(&self, ctx: &RequestContext, f: F) -> Option<reqwest::Response>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<reqwest::Response, RequestFailure>>,
    {
        for ic in &self.interceptors {
            ic.on_request(ctx);
        }

        let outcome = match f().await {
            Ok(resp) if resp.status().is_success() => Ok(resp),
            Ok(resp) => Err(RequestFailure::Status(resp.status())),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(resp) => {
                let rctx = ResponseContext {
                    status: resp.status(),
                };
                for ic in &self.interceptors {
                    ic.on_response(ctx, &rctx);
                }
                Some(resp)
            }
            Err(err) => {
                for ic in &self.interceptors {
                    ic.on_error(ctx, &err);
                }
                None
            }
        }
    }
}

/// Drives the store's loading flag.
pub struct LoadingInterceptor {
    store: Arc<dyn StateStore>,
    signal: Arc<LoadingSignal>,
    engaged: bool,
}

impl LoadingInterceptor {
    pub fn new(store: Arc<dyn StateStore>, signal: Arc<LoadingSignal>, engaged: bool) -> Self {
        Self {
            store,
            signal,
            engaged,
        }
    }
}

impl Interceptor for LoadingInterceptor {
    fn on_request(&self, _ctx: &RequestContext) {
        if self.engaged {
            self.signal.begin(self.store.as_ref());
        }
    }

    fn on_response(&self, _ctx: &RequestContext, _resp: &ResponseContext) {
        self.signal.end(self.store.as_ref(), self.engaged);
    }

    fn on_error(&self, _ctx: &RequestContext, _err: &RequestFailure) {
        self.signal.end(self.store.as_ref(), self.engaged);
    }
}

/// Turns a failed request into one translated error notification.
pub struct ErrorNotifier {
    classifier: Arc<ErrorClassifier>,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl ErrorNotifier {
    pub fn new(classifier: Arc<ErrorClassifier>, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self {
            classifier,
            dispatcher,
        }
    }
}

impl Interceptor for ErrorNotifier {
    fn on_error(&self, ctx: &RequestContext, err: &RequestFailure) {
        warn!(method = %ctx.method, path = %ctx.path, error = %err, "request failed");
        let text = self.classifier.classify(&ctx.path, &ctx.method);
        self.dispatcher.dispatch(Notification::error(text));
    }
}
