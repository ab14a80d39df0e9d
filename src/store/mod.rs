//! Application state container contract.
//!
//! The real store lives outside this crate (it also drives the UI). The
//! orchestration layer only needs four operations from it: read the current
//! state, commit a mutation, dispatch an action, and subscribe to commits.
//! [`MemoryStore`] is an in-process implementation of that contract used by
//! the binary and by tests.

use crate::notify::Notification;
use crate::persist::PersistedSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::debug;

/// Full application state as seen by the store.
///
/// `extra` holds every top-level key this layer does not know about; it is
/// flattened into the serialized form so the shape matches the store's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub host: String,
    pub username: String,
    pub api_key: String,
    pub language: String,
    /// Language registry: code -> display name.
    pub languages: BTreeMap<String, String>,
    pub loading: bool,
    pub notifications: Vec<Notification>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Default for AppState {
    fn default() -> Self {
        let mut languages = BTreeMap::new();
        languages.insert("en".to_string(), "English".to_string());
        languages.insert("de".to_string(), "Deutsch".to_string());
        Self {
            host: String::new(),
            username: String::new(),
            api_key: String::new(),
            language: "en".to_string(),
            languages,
            loading: false,
            notifications: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }
}

impl AppState {
    /// Apply a mutation in place.
    pub fn apply(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::Initialize(snapshot) => {
                let fields = [
                    (&mut self.host, &snapshot.host),
                    (&mut self.username, &snapshot.username),
                    (&mut self.api_key, &snapshot.api_key),
                    (&mut self.language, &snapshot.language),
                ];
                for (field, stored) in fields {
                    if let Some(value) = stored {
                        *field = value.clone();
                    }
                }
            }
            Mutation::SetLoading(loading) => self.loading = *loading,
            Mutation::SetHost(host) => self.host = host.clone(),
            Mutation::SetUsername(username) => self.username = username.clone(),
            Mutation::SetApiKey(api_key) => self.api_key = api_key.clone(),
            Mutation::SetLanguage(language) => self.language = language.clone(),
            Mutation::PushNotification(notification) => {
                self.notifications.push(notification.clone())
            }
            Mutation::ClearNotifications => self.notifications.clear(),
            Mutation::SetExtra { key, value } => {
                self.extra.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Synchronous state changes.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Restore the persisted part of the state at startup.
    Initialize(PersistedSnapshot),
    SetLoading(bool),
    SetHost(String),
    SetUsername(String),
    SetApiKey(String),
    SetLanguage(String),
    PushNotification(Notification),
    ClearNotifications,
    /// Set a top-level key this layer has no typed field for.
    SetExtra { key: String, value: Value },
}

impl Mutation {
    /// Mutation name as registered in the store.
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::Initialize(_) => "initialize",
            Mutation::SetLoading(_) => "setLoading",
            Mutation::SetHost(_) => "setHost",
            Mutation::SetUsername(_) => "setUsername",
            Mutation::SetApiKey(_) => "setApiKey",
            Mutation::SetLanguage(_) => "setLanguage",
            Mutation::PushNotification(_) => "pushNotification",
            Mutation::ClearNotifications => "clearNotifications",
            Mutation::SetExtra { .. } => "setExtra",
        }
    }
}

/// Actions routed through the store's action channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    AddNotification(Notification),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::AddNotification(_) => "addNotification",
        }
    }
}

/// Callback invoked after every commit with the mutation and the new state.
pub trait StateSubscriber: Send + Sync {
    fn on_mutation(&self, mutation: &Mutation, state: &AppState);
}

impl<F> StateSubscriber for F
where
    F: Fn(&Mutation, &AppState) + Send + Sync,
{
    fn on_mutation(&self, mutation: &Mutation, state: &AppState) {
        self(mutation, state)
    }
}

/// The external state container.
pub trait StateStore: Send + Sync {
    /// Snapshot of the current state.
    fn state(&self) -> AppState;

    /// Commit a mutation; subscribers run before this returns.
    fn commit(&self, mutation: Mutation);

    /// Dispatch an action.
    fn dispatch(&self, action: Action);

    /// Register a subscriber for all subsequent commits.
    fn subscribe(&self, subscriber: Arc<dyn StateSubscriber>);

    /// Read a single top-level key in its serialized form.
    fn read(&self, key: &str) -> Option<Value> {
        match serde_json::to_value(self.state()) {
            Ok(Value::Object(mut map)) => map.remove(key),
            _ => None,
        }
    }
}

/// In-memory store.
///
/// Commits are serialized: subscribers see mutations in the order they were
/// applied, even when several threads commit at once. A subscriber must not
/// commit to the same store from inside its callback.
pub struct MemoryStore {
    state: RwLock<AppState>,
    subscribers: RwLock<Vec<Arc<dyn StateSubscriber>>>,
    commit_order: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_state(AppState::default())
    }

    pub fn with_state(state: AppState) -> Self {
        Self {
            state: RwLock::new(state),
            subscribers: RwLock::new(Vec::new()),
            commit_order: Mutex::new(()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore for MemoryStore {
    fn state(&self) -> AppState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn commit(&self, mutation: Mutation) {
        let _order = self.commit_order.lock().unwrap_or_else(PoisonError::into_inner);
        // Release the state lock before notifying so subscribers may read.
        let snapshot = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.apply(&mutation);
            state.clone()
        };
        debug!(mutation = mutation.name(), "state committed");

        let subscribers = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for subscriber in subscribers {
            subscriber.on_mutation(&mutation, &snapshot);
        }
    }

    fn dispatch(&self, action: Action) {
        debug!(action = action.name(), "action dispatched");
        match action {
            Action::AddNotification(notification) => {
                self.commit(Mutation::PushNotification(notification))
            }
        }
    }

    fn subscribe(&self, subscriber: Arc<dyn StateSubscriber>) {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(subscriber);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_commit_applies_mutation() {
        let store = MemoryStore::new();
        store.commit(Mutation::SetHost("https://kimai.example".into()));
        store.commit(Mutation::SetLoading(true));

        let state = store.state();
        assert_eq!(state.host, "https://kimai.example");
        assert!(state.loading);
    }

    #[test]
    fn test_subscribers_see_new_state() {
        let store = MemoryStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        store.subscribe(Arc::new(move |m: &Mutation, s: &AppState| {
            seen_clone.lock().unwrap().push((m.name(), s.username.clone()));
        }));

        store.commit(Mutation::SetUsername("susan".into()));
        store.commit(Mutation::SetLoading(false));

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![("setUsername", "susan".to_string()), ("setLoading", "susan".to_string())]
        );
    }

    #[test]
    fn test_dispatch_add_notification_commits() {
        let store = MemoryStore::new();
        let names = Arc::new(Mutex::new(Vec::new()));
        let names_clone = Arc::clone(&names);
        store.subscribe(Arc::new(move |m: &Mutation, _: &AppState| {
            names_clone.lock().unwrap().push(m.name());
        }));

        store.dispatch(Action::AddNotification(Notification::error("boom")));

        assert_eq!(*names.lock().unwrap(), vec!["pushNotification"]);
        assert_eq!(store.state().notifications.len(), 1);
    }

    #[test]
    fn test_read_uses_serialized_keys() {
        let store = MemoryStore::new();
        store.commit(Mutation::SetApiKey("secret".into()));
        store.commit(Mutation::SetExtra {
            key: "activeTimesheet".into(),
            value: serde_json::json!({"id": 42}),
        });

        assert_eq!(store.read("apiKey"), Some(Value::String("secret".into())));
        assert_eq!(store.read("activeTimesheet"), Some(serde_json::json!({"id": 42})));
        assert_eq!(store.read("missing"), None);
    }

    #[test]
    fn test_concurrent_commits_reach_subscribers_in_order() {
        let store = Arc::new(MemoryStore::new());
        let last_seen = Arc::new(Mutex::new(String::new()));
        let last_clone = Arc::clone(&last_seen);
        store.subscribe(Arc::new(move |_: &Mutation, s: &AppState| {
            if s.username == "slow" {
                thread::sleep(Duration::from_millis(100));
            }
            *last_clone.lock().unwrap() = s.username.clone();
        }));

        let first = {
            let store = Arc::clone(&store);
            thread::spawn(move || store.commit(Mutation::SetUsername("slow".into())))
        };
        thread::sleep(Duration::from_millis(20));
        let second = {
            let store = Arc::clone(&store);
            thread::spawn(move || store.commit(Mutation::SetUsername("fast".into())))
        };
        first.join().unwrap();
        second.join().unwrap();

        assert_eq!(store.state().username, "fast");
        assert_eq!(*last_seen.lock().unwrap(), "fast");
    }
}
