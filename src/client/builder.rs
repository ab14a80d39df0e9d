use crate::classifier::{default_rules, ErrorClassifier, ErrorRule};
use crate::client::core::ClientFactory;
use crate::client::signals::{LoadingMode, LoadingSignal};
use crate::config::Settings;
use crate::i18n::{CatalogLoader, Translate, TranslationCatalog, Translator};
use crate::interceptors::Interceptor;
use crate::notify::{NotificationDispatcher, StoreDispatcher};
use crate::store::StateStore;
use crate::Result;
use std::sync::Arc;

/// Builder for [`ClientFactory`].
///
/// Translator and notification dispatcher are injected here; when omitted
/// they default to a [`Translator`] over the configured catalog and a
/// [`StoreDispatcher`] on the same store.
pub struct ClientFactoryBuilder {
    store: Arc<dyn StateStore>,
    translator: Option<Arc<dyn Translate>>,
    catalog: Option<TranslationCatalog>,
    rules: Option<Vec<ErrorRule>>,
    dispatcher: Option<Arc<dyn NotificationDispatcher>>,
    loading_mode: LoadingMode,
    proxy_url: Option<String>,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl ClientFactoryBuilder {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            translator: None,
            catalog: None,
            rules: None,
            dispatcher: None,
            loading_mode: LoadingMode::default(),
            proxy_url: None,
            interceptors: Vec::new(),
        }
    }

    /// Use a custom translator. Takes precedence over [`catalog`](Self::catalog).
    pub fn translator(mut self, translator: Arc<dyn Translate>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn catalog(mut self, catalog: TranslationCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Replace the built-in rule table. Order is kept as given.
    pub fn error_rules(mut self, rules: Vec<ErrorRule>) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn dispatcher(mut self, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn loading_mode(mut self, mode: LoadingMode) -> Self {
        self.loading_mode = mode;
        self
    }

    pub fn proxy_url(mut self, url: impl Into<String>) -> Self {
        self.proxy_url = Some(url.into());
        self
    }

    /// Register an extra interceptor, run after the built-in ones.
    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Apply settings: loading mode, proxy, rule table and locale catalogs.
    ///
    /// Catalogs are loaded for every language in the store's registry.
    pub fn settings(mut self, settings: &Settings) -> Result<Self> {
        self.loading_mode = settings.loading_mode;
        if let Some(proxy) = &settings.proxy_url {
            self.proxy_url = Some(proxy.clone());
        }
        if let Some(rules) = settings.compiled_rules()? {
            self.rules = Some(rules);
        }
        if let Some(dir) = &settings.locale_dir {
            let languages = self.store.state().languages;
            self.catalog = Some(CatalogLoader::new(dir).load(languages.keys()));
        }
        Ok(self)
    }

    pub fn build(self) -> Result<ClientFactory> {
        let translator: Arc<dyn Translate> = match self.translator {
            Some(translator) => translator,
            None => Arc::new(Translator::new(
                Arc::new(self.catalog.unwrap_or_default()),
                self.store.clone(),
            )),
        };
        let rules = match self.rules {
            Some(rules) => rules,
            None => default_rules()?,
        };
        let dispatcher: Arc<dyn NotificationDispatcher> = match self.dispatcher {
            Some(dispatcher) => dispatcher,
            None => Arc::new(StoreDispatcher::new(self.store.clone())),
        };

        Ok(ClientFactory {
            classifier: Arc::new(ErrorClassifier::new(rules, translator)),
            dispatcher,
            signal: Arc::new(LoadingSignal::new(self.loading_mode)),
            proxy_url: self.proxy_url,
            interceptors: self.interceptors,
            store: self.store,
        })
    }
}
