//! Observers receive the events of a tagged operation.
//!
//! Groups hold observers weakly: the caller keeps the `Arc`, and dropping it
//! has the same effect as unsubscribing. A later observer can pick up the
//! buffered outcome through [`ObservableGroup::observable`](crate::ObservableGroup::observable).

use crate::types::Event;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

/// Receiver of [`Event`]s.
pub trait Observer<T, E>: Send + Sync {
    fn on_event(&self, event: Event<T, E>);
}

impl<T, E, F> Observer<T, E> for F
where
    F: Fn(Event<T, E>) + Send + Sync,
{
    fn on_event(&self, event: Event<T, E>) {
        self(event)
    }
}

/// Observer that keeps every event it receives.
pub struct RecordingObserver<T, E> {
    events: Mutex<Vec<Event<T, E>>>,
}

impl<T, E> RecordingObserver<T, E> {
    /// Create an observer with no recorded events.
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// Number of events received so far.
    pub fn event_count(&self) -> usize {
        self.events.lock().len()
    }

    /// True once `Complete` was seen.
    pub fn is_completed(&self) -> bool {
        self.events
            .lock()
            .iter()
            .any(|e| matches!(e, Event::Complete))
    }

    /// True once either `Complete` or `Error` was seen.
    pub fn is_terminated(&self) -> bool {
        self.events.lock().iter().any(Event::is_terminal)
    }
}

impl<T: Clone, E: Clone> RecordingObserver<T, E> {
    /// All events in arrival order.
    pub fn events(&self) -> Vec<Event<T, E>> {
        self.events.lock().clone()
    }

    /// Received values, in order.
    pub fn values(&self) -> Vec<T> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Value(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    /// Received errors, in order.
    pub fn errors(&self) -> Vec<E> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Error(err) => Some(err.clone()),
                _ => None,
            })
            .collect()
    }
}

impl<T, E> Default for RecordingObserver<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send, E: Send> Observer<T, E> for RecordingObserver<T, E> {
    fn on_event(&self, event: Event<T, E>) {
        self.events.lock().push(event);
    }
}

/// Observer that forwards events into a channel.
pub struct ChannelObserver<T, E> {
    sender: Sender<Event<T, E>>,
}

impl<T: Send, E: Send> Observer<T, E> for ChannelObserver<T, E> {
    fn on_event(&self, event: Event<T, E>) {
        // Receiver gone means nobody is listening any more.
        let _ = self.sender.send(event);
    }
}

/// Receiving end of a [`ChannelObserver`].
pub struct ObserverHandle<T, E> {
    pub receiver: Receiver<Event<T, E>>,
}

impl<T, E> ObserverHandle<T, E> {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<Event<T, E>, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<Event<T, E>, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<Event<T, E>, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Create a channel-backed observer and the handle that drains it.
pub fn channel<T, E>() -> (ChannelObserver<T, E>, ObserverHandle<T, E>) {
    let (sender, receiver) = unbounded();
    (ChannelObserver { sender }, ObserverHandle { receiver })
}
