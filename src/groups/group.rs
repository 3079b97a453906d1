//! A group of tagged operations sharing one lifecycle.

use crate::error::{GroupError, Result};
use crate::observer::Observer;
use crate::producers::{CancelHandle, Producer};
use crate::subscriptions::{ManagedSubscription, PendingDelivery, RemoveHook, TaggedSubscription};
use crate::types::{GroupConfig, GroupId, SubscriptionId, SubscriptionState};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// Shared group state. Lock order is group, then subscription.
struct GroupInner {
    subscriptions: HashMap<String, Arc<dyn ManagedSubscription>>,
    locked: bool,
    destroyed: bool,
}

/// Tracks in-flight operations by tag for one scope, such as one screen.
///
/// Observers can be detached ([`unsubscribe`](Self::unsubscribe)) or held back
/// ([`lock`](Self::lock)) without cancelling anything; the terminal outcome of
/// each operation is kept until an observer can take it. Destroying the group
/// cancels everything.
pub struct ObservableGroup {
    id: GroupId,
    label: Option<String>,
    inner: Arc<RwLock<GroupInner>>,
    next_subscription: AtomicU64,
}

impl ObservableGroup {
    pub(crate) fn new(id: GroupId, config: GroupConfig) -> Self {
        Self {
            id,
            label: config.label,
            inner: Arc::new(RwLock::new(GroupInner {
                subscriptions: HashMap::new(),
                locked: config.start_locked,
                destroyed: false,
            })),
            next_subscription: AtomicU64::new(1),
        }
    }

    /// Id to look this group up again through the manager.
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Label from the group's config, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Start tracking `producer` under `tag` and attach `observer` to it.
    ///
    /// An operation already registered under `tag` is cancelled and replaced;
    /// its observer receives nothing more. The observer is held weakly.
    pub fn add<T, E, P, O>(
        &self,
        tag: impl Into<String>,
        producer: P,
        observer: &Arc<O>,
    ) -> Result<()>
    where
        T: Send + 'static,
        E: Send + 'static,
        P: Producer<T, E>,
        O: Observer<T, E> + 'static,
    {
        let tag = tag.into();
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::SeqCst));

        let (subscription, mut replaced) = {
            let mut inner = self.inner.write();
            if inner.destroyed {
                return Err(GroupError::Destroyed(self.id));
            }

            let subscription = TaggedSubscription::<T, E>::new(
                id,
                tag.clone(),
                self.id,
                inner.locked,
                self.remove_hook(&tag),
            );
            let erased: Arc<dyn ManagedSubscription> = Arc::clone(&subscription) as _;
            let replaced = inner
                .subscriptions
                .insert(tag.clone(), erased)
                .map(|old| old.terminate());
            (subscription, replaced)
        };

        if let Some(handle) = replaced.as_mut() {
            debug!(group = %self.id, tag = %tag, "replaced existing observable");
            handle.cancel();
        }

        trace!(group = %self.id, tag = %tag, subscription = %id, "starting observable");
        subscription.start(producer);
        let observer: Weak<dyn Observer<T, E>> = Arc::downgrade(observer) as Weak<O>;
        subscription.attach(observer);
        Ok(())
    }

    /// Whether an operation is registered under `tag`. False once its outcome
    /// has been delivered or it was cancelled.
    pub fn has_observable(&self, tag: &str) -> bool {
        self.inner.read().subscriptions.contains_key(tag)
    }

    /// Handle for attaching a new observer to the operation under `tag`.
    ///
    /// Nothing happens until [`Resubscription::subscribe`] is called. For an
    /// unknown tag the handle never delivers.
    pub fn observable<T, E>(&self, tag: &str) -> Result<Resubscription<T, E>>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        let inner = self.inner.read();
        if inner.destroyed {
            return Err(GroupError::Destroyed(self.id));
        }

        let subscription = match inner.subscriptions.get(tag) {
            Some(erased) => Some(
                Arc::clone(erased)
                    .into_any()
                    .downcast::<TaggedSubscription<T, E>>()
                    .map_err(|_| GroupError::TypeMismatch {
                        tag: tag.to_string(),
                    })?,
            ),
            None => None,
        };

        Ok(Resubscription {
            group: self.id,
            tag: tag.to_string(),
            group_state: Arc::downgrade(&self.inner),
            subscription,
        })
    }

    /// Delivery state of the operation under `tag`, if one is registered.
    pub fn subscription_state(&self, tag: &str) -> Option<SubscriptionState> {
        self.inner.read().subscriptions.get(tag).map(|s| s.state())
    }

    /// Detach every observer. Operations keep running and buffer their
    /// outcomes.
    pub fn unsubscribe(&self) {
        let inner = self.inner.read();
        for subscription in inner.subscriptions.values() {
            subscription.detach();
        }
        debug!(group = %self.id, count = inner.subscriptions.len(), "unsubscribed observers");
    }

    /// Hold back all deliveries, including already buffered outcomes.
    pub fn lock(&self) {
        self.set_locked(true);
    }

    /// Release the lock, delivering every outcome that now has a live observer.
    pub fn unlock(&self) {
        self.set_locked(false);
    }

    /// Whether deliveries are currently held back.
    pub fn is_locked(&self) -> bool {
        self.inner.read().locked
    }

    fn set_locked(&self, locked: bool) {
        let deliveries: Vec<PendingDelivery> = {
            let mut inner = self.inner.write();
            if inner.destroyed || inner.locked == locked {
                return;
            }
            inner.locked = locked;
            let deliveries = inner
                .subscriptions
                .values()
                .filter_map(|s| Arc::clone(s).set_locked(locked))
                .collect();
            deliveries
        };

        debug!(group = %self.id, locked, deliveries = deliveries.len(), "lock state changed");
        for deliver in deliveries {
            deliver();
        }
    }

    /// Cancel the operation under `tag` and forget it. No-op for unknown tags.
    pub fn cancel_and_remove(&self, tag: &str) {
        let removed = self.inner.write().subscriptions.remove(tag);
        if let Some(subscription) = removed {
            debug!(group = %self.id, tag, "cancelled observable");
            subscription.terminate().cancel();
        }
    }

    /// Cancel every operation and discard buffered outcomes. Afterwards
    /// [`add`](Self::add) and [`observable`](Self::observable) fail.
    /// Calling it again does nothing.
    ///
    /// A delivery already running on another thread is not waited for; it
    /// stops before handing out its next event.
    pub fn destroy(&self) {
        let handles: Vec<CancelHandle> = {
            let mut inner = self.inner.write();
            if inner.destroyed {
                return;
            }
            inner.destroyed = true;
            let handles = inner
                .subscriptions
                .drain()
                .map(|(_, subscription)| subscription.terminate())
                .collect();
            handles
        };

        debug!(group = %self.id, label = ?self.label, cancelled = handles.len(), "destroyed group");
        for mut handle in handles {
            handle.cancel();
        }
    }

    /// Whether [`destroy`](Self::destroy) has run.
    pub fn is_destroyed(&self) -> bool {
        self.inner.read().destroyed
    }

    /// Number of registered operations.
    pub fn len(&self) -> usize {
        self.inner.read().subscriptions.len()
    }

    /// True if no operation is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<String> {
        let inner = self.inner.read();
        let mut tags: Vec<String> = inner
            .subscriptions
            .values()
            .map(|s| s.tag().to_string())
            .collect();
        tags.sort();
        tags
    }

    /// Drops the tag's entry after delivery, unless it was replaced meanwhile.
    fn remove_hook(&self, tag: &str) -> RemoveHook {
        let state = Arc::downgrade(&self.inner);
        let group = self.id;
        let tag = tag.to_string();

        Box::new(move |id| {
            let Some(state) = state.upgrade() else {
                return;
            };
            let mut inner = state.write();
            let current = inner.subscriptions.get(&tag).map(|s| s.id());
            if current == Some(id) {
                inner.subscriptions.remove(&tag);
                trace!(group = %group, tag = %tag, "removed delivered observable");
            }
        })
    }
}

impl fmt::Debug for ObservableGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("ObservableGroup")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("observables", &inner.subscriptions.len())
            .field("locked", &inner.locked)
            .field("destroyed", &inner.destroyed)
            .finish()
    }
}

/// Typed handle to a tag's pending operation, from [`ObservableGroup::observable`].
pub struct Resubscription<T, E> {
    group: GroupId,
    tag: String,
    group_state: Weak<RwLock<GroupInner>>,
    subscription: Option<Arc<TaggedSubscription<T, E>>>,
}

impl<T, E> Resubscription<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Tag this handle was looked up with.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Attach `observer` in place of the current one. A buffered outcome is
    /// delivered right away unless the group is locked.
    ///
    /// Returns whether an operation was still pending to attach to.
    pub fn subscribe<O>(&self, observer: &Arc<O>) -> Result<bool>
    where
        O: Observer<T, E> + 'static,
    {
        let Some(state) = self.group_state.upgrade() else {
            return Err(GroupError::Destroyed(self.group));
        };
        if state.read().destroyed {
            return Err(GroupError::Destroyed(self.group));
        }
        drop(state);

        let Some(subscription) = &self.subscription else {
            return Ok(false);
        };
        let observer: Weak<dyn Observer<T, E>> = Arc::downgrade(observer) as Weak<O>;
        Ok(subscription.attach(observer))
    }
}
