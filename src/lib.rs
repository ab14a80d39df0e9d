//! # kimai-client
//!
//! Request orchestration for a Kimai timesheet client.
//!
//! ## Overview
//!
//! This crate sits between the application's state store and the Kimai
//! HTTP API. It builds authenticated HTTP clients on demand, drives the
//! shared loading indicator around requests, turns failed requests into
//! translated error notifications, and persists the connection settings
//! across restarts.
//!
//! ## Key Components
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`ClientFactory`] and its builder, per-client configuration, loading signal |
//! | [`transport`] | [`HttpClient`], the per-call-site HTTP client |
//! | [`interceptors`] | Request/response hooks: loading signal and error notifications |
//! | [`classifier`] | Ordered method + path rule table for failure messages |
//! | [`i18n`] | Translation catalogs and `:name` interpolation |
//! | [`notify`] | Notifications and their dispatch to the store |
//! | [`persist`] | Whitelisted state snapshot in durable storage |
//! | [`store`] | State container contract and an in-memory implementation |
//! | [`config`] | YAML and environment settings |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kimai_client::{ClientFactoryBuilder, LoadingOverride, MemoryStore, Mutation, StateStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> kimai_client::Result<()> {
//!     let store = Arc::new(MemoryStore::new());
//!     store.commit(Mutation::SetHost("https://kimai.example.com".into()));
//!     store.commit(Mutation::SetUsername("susan".into()));
//!     store.commit(Mutation::SetApiKey("api-token".into()));
//!
//!     let factory = ClientFactoryBuilder::new(store.clone()).build()?;
//!     let client = factory.create_client(LoadingOverride::default())?;
//!
//!     // `None` means the request failed and a notification was dispatched.
//!     if let Some(resp) = client.get("timesheets/active").await {
//!         println!("status {}", resp.status());
//!     }
//!     Ok(())
//! }
//! ```

pub mod classifier;
pub mod client;
pub mod config;
pub mod i18n;
pub mod interceptors;
pub mod notify;
pub mod persist;
pub mod store;
pub mod transport;

// Re-export main types for convenience
pub use classifier::{ErrorClassifier, ErrorRule};
pub use client::{ClientFactory, ClientFactoryBuilder, LoadingMode, LoadingOverride};
pub use config::Settings;
pub use i18n::{Translate, TranslationCatalog, Translator};
pub use notify::{Notification, NotificationDispatcher, NotificationKind};
pub use persist::{LocalStorage, PersistedSnapshot, StatePersister};
pub use store::{Action, AppState, MemoryStore, Mutation, StateStore};
pub use transport::HttpClient;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
