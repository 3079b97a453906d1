//! A single tagged operation and the buffer for its outcome.

use super::{ManagedSubscription, PendingDelivery};
use crate::observer::Observer;
use crate::producers::{CancelHandle, Emitter, EventSink, Producer};
use crate::types::{Event, GroupId, SubscriptionId, SubscriptionState};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// Called with the subscription's id after its outcome has been delivered.
pub(crate) type RemoveHook = Box<dyn Fn(SubscriptionId) + Send + Sync>;

/// Terminal outcome held while nobody can receive it.
enum Outcome<T, E> {
    /// Completed, with the last value seen before completion (if any).
    Completed(Option<T>),
    Failed(E),
}

impl<T, E> Outcome<T, E> {
    fn into_events(self) -> Vec<Event<T, E>> {
        match self {
            Outcome::Completed(Some(value)) => vec![Event::Value(value), Event::Complete],
            Outcome::Completed(None) => vec![Event::Complete],
            Outcome::Failed(error) => vec![Event::Error(error)],
        }
    }
}

/// Events ready to hand to an observer.
struct Delivery<T, E> {
    observer: Arc<dyn Observer<T, E>>,
    events: Vec<Event<T, E>>,
    /// Set when this delivery ends the subscription.
    released: Option<CancelHandle>,
}

struct Inner<T, E> {
    /// Non-owning; the caller keeps the observer alive.
    observer: Option<Weak<dyn Observer<T, E>>>,
    locked: bool,
    /// Last value seen while not delivering. Only replayed with completion.
    pending: Option<T>,
    outcome: Option<Outcome<T, E>>,
    cancel: CancelHandle,
    terminated: bool,
}

impl<T, E> Inner<T, E> {
    /// The observer events may go to right now, if any.
    fn live_observer(&self) -> Option<Arc<dyn Observer<T, E>>> {
        if self.locked || self.terminated {
            return None;
        }
        self.observer.as_ref()?.upgrade()
    }

    /// Hand the buffered outcome to the live observer if both exist.
    fn take_delivery(&mut self) -> Option<Delivery<T, E>> {
        if self.outcome.is_none() {
            return None;
        }
        let observer = self.live_observer()?;
        let outcome = self.outcome.take()?;

        self.terminated = true;
        self.observer = None;
        Some(Delivery {
            observer,
            events: outcome.into_events(),
            released: Some(std::mem::take(&mut self.cancel)),
        })
    }
}

/// One asynchronous operation bound to a tag within a group.
pub(crate) struct TaggedSubscription<T, E> {
    id: SubscriptionId,
    tag: String,
    group: GroupId,
    inner: Mutex<Inner<T, E>>,
    /// Set by `terminate`. Checked outside `inner` before each event handed
    /// to an observer, so a delivery in flight stops once cancelled.
    discarded: AtomicBool,
    on_delivered: RemoveHook,
}

impl<T, E> TaggedSubscription<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub(crate) fn new(
        id: SubscriptionId,
        tag: String,
        group: GroupId,
        locked: bool,
        on_delivered: RemoveHook,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            tag,
            group,
            inner: Mutex::new(Inner {
                observer: None,
                locked,
                pending: None,
                outcome: None,
                cancel: CancelHandle::noop(),
                terminated: false,
            }),
            discarded: AtomicBool::new(false),
            on_delivered,
        })
    }

    /// Subscribe to `producer`. It may emit before this returns.
    pub(crate) fn start<P>(self: &Arc<Self>, producer: P)
    where
        P: Producer<T, E>,
    {
        let sink: Weak<dyn EventSink<T, E>> = Arc::downgrade(self) as Weak<Self>;
        let mut handle = producer.subscribe(Emitter::new(sink));

        let mut inner = self.inner.lock();
        if inner.terminated {
            drop(inner);
            trace!(group = %self.group, tag = %self.tag, "terminated while starting");
            handle.cancel();
            return;
        }
        inner.cancel = handle;
    }

    /// Attach `observer`, replacing any previous one. A buffered outcome is
    /// delivered right away unless the subscription is locked.
    ///
    /// Returns false if the subscription already terminated.
    pub(crate) fn attach(&self, observer: Weak<dyn Observer<T, E>>) -> bool {
        let delivery = {
            let mut inner = self.inner.lock();
            if inner.terminated {
                return false;
            }
            inner.observer = Some(observer);
            inner.take_delivery()
        };

        if let Some(delivery) = delivery {
            debug!(group = %self.group, tag = %self.tag, "replaying buffered outcome");
            self.dispatch(delivery);
        }
        true
    }

    fn deliver_or_buffer(&self, inner: &mut Inner<T, E>) -> Option<Delivery<T, E>> {
        let delivery = inner.take_delivery();
        if delivery.is_none() {
            debug!(group = %self.group, tag = %self.tag, "buffered terminal outcome");
        }
        delivery
    }

    fn dispatch(&self, delivery: Delivery<T, E>) {
        for event in delivery.events {
            if self.discarded.load(Ordering::Acquire) {
                trace!(group = %self.group, tag = %self.tag, "dropping delivery after cancel");
                break;
            }
            delivery.observer.on_event(event);
        }

        if let Some(mut handle) = delivery.released {
            handle.cancel();
            (self.on_delivered)(self.id);
        }
    }
}

impl<T, E> EventSink<T, E> for TaggedSubscription<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn emit(&self, event: Event<T, E>) {
        let delivery = {
            let mut inner = self.inner.lock();
            if inner.terminated || inner.outcome.is_some() {
                return;
            }

            match event {
                Event::Value(value) => match inner.live_observer() {
                    Some(observer) => {
                        inner.pending = None;
                        Some(Delivery {
                            observer,
                            events: vec![Event::Value(value)],
                            released: None,
                        })
                    }
                    None => {
                        inner.pending = Some(value);
                        None
                    }
                },
                Event::Complete => {
                    let last = inner.pending.take();
                    inner.outcome = Some(Outcome::Completed(last));
                    self.deliver_or_buffer(&mut inner)
                }
                Event::Error(error) => {
                    inner.pending = None;
                    inner.outcome = Some(Outcome::Failed(error));
                    self.deliver_or_buffer(&mut inner)
                }
            }
        };

        if let Some(delivery) = delivery {
            self.dispatch(delivery);
        }
    }

    fn is_closed(&self) -> bool {
        let inner = self.inner.lock();
        inner.terminated || inner.outcome.is_some()
    }
}

impl<T, E> ManagedSubscription for TaggedSubscription<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn id(&self) -> SubscriptionId {
        self.id
    }

    fn tag(&self) -> &str {
        &self.tag
    }

    fn state(&self) -> SubscriptionState {
        let inner = self.inner.lock();
        if inner.terminated {
            SubscriptionState::Terminated
        } else if inner.live_observer().is_some() {
            SubscriptionState::Delivering
        } else {
            SubscriptionState::Buffering
        }
    }

    fn detach(&self) {
        let mut inner = self.inner.lock();
        if !inner.terminated {
            inner.observer = None;
        }
    }

    fn set_locked(self: Arc<Self>, locked: bool) -> Option<PendingDelivery> {
        let delivery = {
            let mut inner = self.inner.lock();
            if inner.terminated {
                return None;
            }
            inner.locked = locked;
            if locked {
                return None;
            }
            inner.take_delivery()?
        };

        debug!(group = %self.group, tag = %self.tag, "unlocked with buffered outcome");
        Some(Box::new(move || self.dispatch(delivery)))
    }

    fn terminate(&self) -> CancelHandle {
        // Also stops a delivery that already left the lock.
        self.discarded.store(true, Ordering::Release);
        let mut inner = self.inner.lock();
        if inner.terminated {
            return CancelHandle::noop();
        }
        inner.terminated = true;
        inner.observer = None;
        inner.pending = None;
        if inner.outcome.take().is_some() {
            trace!(group = %self.group, tag = %self.tag, "discarding buffered outcome");
        }
        std::mem::take(&mut inner.cancel)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
