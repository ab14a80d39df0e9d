//! Client construction.
//!
//! A [`ClientFactory`] builds a fresh [`HttpClient`](crate::transport::HttpClient)
//! for every call site from the store's current connection settings, wired
//! with the loading and error-notification interceptors.

pub mod builder;
pub mod config;
pub mod core;
pub mod signals;

pub use builder::ClientFactoryBuilder;
pub use config::{ClientConfig, LoadingOverride, REQUEST_TIMEOUT};
pub use core::ClientFactory;
pub use signals::{LoadingMode, LoadingSignal, LoadingSnapshot};
