//! Per-connection subscription manager.
//!
//! Tracks which user ids a WebSocket client is subscribed to and
//! provides server-side event filtering.

use std::collections::HashSet;

use serde_json::Value;

use crate::domain::UserId;

/// User selection parsed from a subscribe/unsubscribe command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Explicit user ids.
    pub ids: Vec<UserId>,
    /// Whether `"*"` was present.
    pub wildcard: bool,
    /// Entries that are neither an id nor `"*"`.
    pub rejected: usize,
}

impl Selection {
    /// Parses JSON entries: integers, numeric strings or `"*"`.
    #[must_use]
    pub fn parse(values: &[Value]) -> Self {
        let mut selection = Self::default();
        for value in values {
            match value {
                Value::String(s) if s == "*" => selection.wildcard = true,
                Value::String(s) => match s.parse::<UserId>() {
                    Ok(id) => selection.ids.push(id),
                    Err(_) => selection.rejected += 1,
                },
                Value::Number(n) => match n.as_i64() {
                    Some(raw) => selection.ids.push(UserId::new(raw)),
                    None => selection.rejected += 1,
                },
                _ => selection.rejected += 1,
            }
        }
        selection
    }
}

/// Manages the set of user subscriptions for a single WebSocket connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Subscribed user ids. If `subscribe_all` is true, this set is ignored.
    user_ids: HashSet<UserId>,
    /// Whether the client subscribes to all users (wildcard `"*"`).
    subscribe_all: bool,
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the selected users. A wildcard enables every user.
    pub fn subscribe(&mut self, selection: &Selection) {
        if selection.wildcard {
            self.subscribe_all = true;
        }
        self.user_ids.extend(selection.ids.iter().copied());
    }

    /// Removes the selected users. A wildcard clears the wildcard flag.
    pub fn unsubscribe(&mut self, selection: &Selection) {
        if selection.wildcard {
            self.subscribe_all = false;
        }
        for id in &selection.ids {
            self.user_ids.remove(id);
        }
    }

    /// Returns `true` if events for `user_id` should be forwarded.
    #[must_use]
    pub fn matches(&self, user_id: UserId) -> bool {
        self.subscribe_all || self.user_ids.contains(&user_id)
    }

    /// Returns the number of explicitly subscribed user ids.
    #[must_use]
    pub fn count(&self) -> usize {
        self.user_ids.len()
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn select(values: Value) -> Selection {
        Selection::parse(values.as_array().map(Vec::as_slice).unwrap_or_default())
    }

    #[test]
    fn empty_matches_nothing() {
        let mgr = SubscriptionManager::new();
        assert!(!mgr.matches(UserId::new(1)));
    }

    #[test]
    fn subscribe_specific_user() {
        let mut mgr = SubscriptionManager::new();
        mgr.subscribe(&select(json!([42, "43"])));
        assert!(mgr.matches(UserId::new(42)));
        assert!(mgr.matches(UserId::new(43)));
        assert!(!mgr.matches(UserId::new(44)));
        assert_eq!(mgr.count(), 2);
    }

    #[test]
    fn wildcard_matches_everything() {
        let mut mgr = SubscriptionManager::new();
        mgr.subscribe(&select(json!(["*"])));
        assert!(mgr.is_subscribed_all());
        assert!(mgr.matches(UserId::new(1)));
        assert!(mgr.matches(UserId::new(2)));

        mgr.unsubscribe(&select(json!(["*"])));
        assert!(!mgr.matches(UserId::new(1)));
    }

    #[test]
    fn unsubscribe_removes_user() {
        let mut mgr = SubscriptionManager::new();
        mgr.subscribe(&select(json!([7])));
        mgr.unsubscribe(&select(json!([7])));
        assert!(!mgr.matches(UserId::new(7)));
    }

    #[test]
    fn garbage_entries_are_counted() {
        let selection = select(json!([1, "abc", 1.5, null]));
        assert_eq!(selection.ids, [UserId::new(1)]);
        assert_eq!(selection.rejected, 3);
    }
}
