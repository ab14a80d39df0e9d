use crate::classifier::ErrorClassifier;
use crate::client::config::{ClientConfig, LoadingOverride};
use crate::client::signals::{LoadingSignal, LoadingSnapshot};
use crate::interceptors::{ErrorNotifier, Interceptor, InterceptorPipeline, LoadingInterceptor};
use crate::notify::NotificationDispatcher;
use crate::store::StateStore;
use crate::transport::HttpClient;
use crate::Result;
use std::sync::Arc;
use tracing::info;

/// Builds one HTTP client per call site.
///
/// Clients are never pooled or shared: each call to
/// [`create_client`](Self::create_client) reads the connection settings
/// from the store again.
pub struct ClientFactory {
    pub(crate) store: Arc<dyn StateStore>,
    pub(crate) classifier: Arc<ErrorClassifier>,
    pub(crate) dispatcher: Arc<dyn NotificationDispatcher>,
    pub(crate) signal: Arc<LoadingSignal>,
    pub(crate) proxy_url: Option<String>,
    pub(crate) interceptors: Vec<Arc<dyn Interceptor>>,
}

impl ClientFactory {
    /// Construct a client from the store's current `host`, `username` and `apiKey`.
    ///
    /// Interceptor order: loading signal, error notification, then any
    /// interceptors registered on the builder. On failure the loading flag
    /// is therefore cleared before the notification is dispatched.
    pub fn create_client(&self, options: LoadingOverride) -> Result<HttpClient> {
        let config = ClientConfig::from_state(&self.store.state());
        let engaged = options.engages_loader();

        let mut pipeline = InterceptorPipeline::new()
            .with(Arc::new(LoadingInterceptor::new(
                self.store.clone(),
                self.signal.clone(),
                engaged,
            )))
            .with(Arc::new(ErrorNotifier::new(
                self.classifier.clone(),
                self.dispatcher.clone(),
            )));
        for ic in &self.interceptors {
            pipeline = pipeline.with(ic.clone());
        }

        info!(
            base_url = %config.base_url,
            user = %config.auth_user,
            loader = engaged,
            "creating http client"
        );
        HttpClient::new(config, self.proxy_url.as_deref(), pipeline)
    }

    /// Client with the loading signal engaged.
    pub fn client(&self) -> Result<HttpClient> {
        self.create_client(LoadingOverride::default())
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    pub fn loading(&self) -> LoadingSnapshot {
        self.signal.snapshot()
    }
}
