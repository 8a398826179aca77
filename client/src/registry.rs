//! Per-feed bookkeeping: identity, lifecycle state, pending completions.
//!
//! The registry is a passive store. Which transitions are legal, and when
//! entries appear and disappear, is enforced by the session.

use std::collections::BTreeMap;
use std::sync::Arc;

use feedme_protocol::FeedArgs;
use serde_json::Value;
use strum_macros::Display;

use crate::error::SessionError;
use crate::session::FeedCloseCallback;
use crate::session::FeedOpenCallback;

/// Feed lifecycle as visible to the application. The internal terminated
/// variant reports as `Closing`; the outside world never observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum FeedState {
    Closed,
    Opening,
    Open,
    Closing,
}

/// Canonical feed identity: name plus arguments. Ordered arguments make the
/// key deterministic, so equal feeds always collide and registry iteration
/// has a stable order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct FeedKey {
    pub name: String,
    pub args: FeedArgs,
}

/// Who asked for the close that is in flight.
pub(crate) enum CloseRequester {
    /// The application called `feed_close`; its completion is pending.
    App { close_callback: FeedCloseCallback },
    /// The session closed the feed itself after a bad revelation. The stored
    /// error is reported via `unexpected_feed_closed` once the server
    /// confirms the close.
    Session { error: SessionError },
}

/// A feed with a live entry. Absence of an entry means the feed is closed.
pub(crate) enum FeedEntry {
    /// `FeedOpen` sent, response awaited.
    Opening { open_callback: FeedOpenCallback },
    /// Open, with current reference data. The tree is never edited in place;
    /// every revelation installs a fresh `Arc`.
    Open { data: Arc<Value> },
    /// `FeedClose` sent, response awaited.
    Closing { requester: CloseRequester },
    /// `FeedClose` sent, but a termination arrived first. The close response
    /// is still owed and the termination stays hidden.
    Terminated { requester: CloseRequester },
}

impl FeedEntry {
    pub(crate) fn state(&self) -> FeedState {
        match self {
            FeedEntry::Opening { .. } => FeedState::Opening,
            FeedEntry::Open { .. } => FeedState::Open,
            FeedEntry::Closing { .. } | FeedEntry::Terminated { .. } => FeedState::Closing,
        }
    }
}

#[derive(Default)]
pub(crate) struct FeedRegistry {
    entries: BTreeMap<FeedKey, FeedEntry>,
}

impl FeedRegistry {
    pub(crate) fn get(&self, key: &FeedKey) -> Option<&FeedEntry> {
        self.entries.get(key)
    }

    pub(crate) fn put(&mut self, key: FeedKey, entry: FeedEntry) {
        self.entries.insert(key, entry);
    }

    pub(crate) fn remove(&mut self, key: &FeedKey) -> Option<FeedEntry> {
        self.entries.remove(key)
    }

    pub(crate) fn state(&self, key: &FeedKey) -> FeedState {
        self.entries
            .get(key)
            .map_or(FeedState::Closed, FeedEntry::state)
    }

    /// Snapshots every entry in key order and empties the registry; used by
    /// the disconnect handler.
    pub(crate) fn drain(&mut self) -> Vec<(FeedKey, FeedEntry)> {
        std::mem::take(&mut self.entries).into_iter().collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn key(name: &str) -> FeedKey {
        FeedKey {
            name: name.to_string(),
            args: FeedArgs::new(),
        }
    }

    #[test]
    fn absent_entries_report_closed() {
        let registry = FeedRegistry::default();
        assert_eq!(registry.state(&key("nope")), FeedState::Closed);
    }

    #[test]
    fn terminated_entries_report_closing() {
        let mut registry = FeedRegistry::default();
        registry.put(
            key("feed"),
            FeedEntry::Terminated {
                requester: CloseRequester::App {
                    close_callback: Box::new(|_| {}),
                },
            },
        );
        assert_eq!(registry.state(&key("feed")), FeedState::Closing);
    }

    #[test]
    fn equal_name_and_args_collide_and_argument_order_is_irrelevant() {
        let mut registry = FeedRegistry::default();
        let forward = FeedKey {
            name: "feed".to_string(),
            args: FeedArgs::from([
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
            ]),
        };
        let backward = FeedKey {
            name: "feed".to_string(),
            args: FeedArgs::from([
                ("b".to_string(), "2".to_string()),
                ("a".to_string(), "1".to_string()),
            ]),
        };
        registry.put(
            forward,
            FeedEntry::Open {
                data: Arc::new(Value::Object(feedme_protocol::JsonObject::new())),
            },
        );
        assert_eq!(registry.state(&backward), FeedState::Open);
    }

    #[test]
    fn drain_empties_the_registry_in_key_order() {
        let mut registry = FeedRegistry::default();
        registry.put(
            key("zeta"),
            FeedEntry::Opening {
                open_callback: Box::new(|_| {}),
            },
        );
        registry.put(
            key("alpha"),
            FeedEntry::Opening {
                open_callback: Box::new(|_| {}),
            },
        );
        let drained: Vec<String> = registry
            .drain()
            .into_iter()
            .map(|(key, _)| key.name)
            .collect();
        assert_eq!(drained, vec!["alpha".to_string(), "zeta".to_string()]);
        assert!(registry.is_empty());
    }
}
