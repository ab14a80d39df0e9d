use crate::store::{Mutation, StateStore};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

/// How overlapping requests share the store's `loading` flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadingMode {
    /// Every start sets the flag and every completion clears it. When
    /// requests overlap, the first one to finish turns the indicator off
    /// even though others are still pending.
    #[default]
    Flag,
    /// Count in-flight requests; the flag is true while the count is above zero.
    Counter,
}

impl FromStr for LoadingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "flag" => Ok(LoadingMode::Flag),
            "counter" => Ok(LoadingMode::Counter),
            other => Err(format!("unknown loading mode '{}'", other)),
        }
    }
}

/// Loading-signal driver shared by all clients of one factory.
///
/// The in-flight count and the matching `SetLoading` commit happen under one
/// lock, so commits reach the store in the order the count changed.
#[derive(Debug, Default)]
pub struct LoadingSignal {
    mode: LoadingMode,
    inflight: Mutex<usize>,
}

impl LoadingSignal {
    pub fn new(mode: LoadingMode) -> Self {
        Self {
            mode,
            inflight: Mutex::new(0),
        }
    }

    /// An engaged request is about to be sent.
    pub fn begin(&self, store: &dyn StateStore) {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        if self.mode == LoadingMode::Counter {
            *inflight += 1;
        }
        store.commit(Mutation::SetLoading(true));
    }

    /// A request completed, successfully or not. `engaged` tells whether
    /// its start called [`begin`](Self::begin).
    pub fn end(&self, store: &dyn StateStore, engaged: bool) {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        let loading = match self.mode {
            LoadingMode::Flag => false,
            LoadingMode::Counter => {
                if engaged {
                    *inflight = inflight.saturating_sub(1);
                }
                *inflight > 0
            }
        };
        store.commit(Mutation::SetLoading(loading));
    }

    pub fn snapshot(&self) -> LoadingSnapshot {
        LoadingSnapshot {
            mode: self.mode,
            inflight: *self.inflight.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }
}

/// Facts about the loading signal at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadingSnapshot {
    pub mode: LoadingMode,
    /// Always zero in [`LoadingMode::Flag`].
    pub inflight: usize,
}
