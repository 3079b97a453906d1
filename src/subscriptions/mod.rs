//! Tagged subscriptions: one in-flight operation each.
//!
//! A tagged subscription sits between a producer and an observer that may come
//! and go:
//! - values and terminal events are forwarded while an observer is attached
//!   and the owning group is unlocked
//! - otherwise the terminal outcome is buffered and replayed, exactly once,
//!   to the next eligible observer
//! - once the outcome has been handed off the subscription removes itself
//!   from its group
//!
//! Groups hold subscriptions of different value/error types side by side, so
//! they talk to them through the object-safe [`ManagedSubscription`] trait and
//! downcast when a typed handle is needed.

mod tagged;

pub(crate) use tagged::{RemoveHook, TaggedSubscription};

use crate::producers::CancelHandle;
use crate::types::{SubscriptionId, SubscriptionState};
use std::any::Any;
use std::sync::Arc;

/// Delivery prepared under a lock, to be run after the lock is released.
pub(crate) type PendingDelivery = Box<dyn FnOnce() + Send>;

/// Type-erased view of a tagged subscription, as stored by a group.
pub(crate) trait ManagedSubscription: Send + Sync {
    fn id(&self) -> SubscriptionId;

    fn tag(&self) -> &str;

    fn state(&self) -> SubscriptionState;

    /// Forget the current observer. The producer keeps running.
    fn detach(&self);

    /// Update the lock flag. When unlocking frees a buffered outcome for a
    /// live observer, the returned delivery must be run with no group lock
    /// held.
    fn set_locked(self: Arc<Self>, locked: bool) -> Option<PendingDelivery>;

    /// Move to `Terminated` and discard any buffered outcome. The caller runs
    /// the returned handle once no group lock is held.
    fn terminate(&self) -> CancelHandle;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}
