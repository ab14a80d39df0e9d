//! Per-client configuration.

use crate::store::AppState;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-request timeout of every constructed client.
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(60_000);

pub const AUTH_USER_HEADER: &str = "X-AUTH-USER";
pub const AUTH_TOKEN_HEADER: &str = "X-AUTH-TOKEN";

/// Connection settings captured from the store when a client is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub auth_user: String,
    pub auth_token: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            base_url: format!("{}/api", state.host),
            auth_user: state.username.clone(),
            auth_token: state.api_key.clone(),
            timeout: REQUEST_TIMEOUT,
        }
    }
}

/// Whether a client drives the shared loading signal.
///
/// With neither flag set the signal is engaged. `hide_loader: Some(true)` or
/// `show_loader: Some(false)` suppresses it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide_loader: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_loader: Option<bool>,
}

impl LoadingOverride {
    /// Client that never touches the loading signal on request start.
    pub fn hidden() -> Self {
        Self {
            hide_loader: Some(true),
            show_loader: None,
        }
    }

    pub fn engages_loader(&self) -> bool {
        !(self.hide_loader == Some(true) || self.show_loader == Some(false))
    }
}
