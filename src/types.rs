//! Core types shared by groups, subscriptions and producers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an [`ObservableGroup`](crate::ObservableGroup).
///
/// Serializable so lifecycle glue can stash it and look the group up again
/// through [`ObservableManager::get_group`](crate::ObservableManager::get_group).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub u64);

impl fmt::Debug for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupId({})", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one tagged subscription. A tag that is replaced gets a new id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Delivery state of a tagged subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    /// A live observer is attached and the group is unlocked.
    Delivering,
    /// No live observer, or the group is locked. Terminal events are held.
    Buffering,
    /// The outcome was handed off, or the subscription was cancelled.
    Terminated,
}

impl SubscriptionState {
    /// True once the subscription can deliver nothing more.
    pub fn is_cancelled(self) -> bool {
        self == SubscriptionState::Terminated
    }
}

/// A notification from a producer, as seen by an observer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event<T, E> {
    /// A success value. For request/response producers there is at most one.
    Value(T),
    /// Terminal failure, passed through untouched.
    Error(E),
    /// Terminal success.
    Complete,
}

impl<T, E> Event<T, E> {
    /// True for `Error` and `Complete`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Event::Value(_))
    }
}

/// Configuration for a new group.
#[derive(Clone, Debug, Default)]
pub struct GroupConfig {
    /// Create the group already locked.
    /// Default: false
    pub start_locked: bool,

    /// Human readable name, only used in log fields.
    pub label: Option<String>,
}

impl GroupConfig {
    /// Config for a group with the given label.
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }
}
