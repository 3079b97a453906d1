//! Producers: the asynchronous sources a group tracks.
//!
//! A producer is anything that, once subscribed, eventually emits zero or one
//! value followed by completion, or a single error. It may emit from any
//! thread. The group only needs two things from it:
//! - it pushes events into the [`Emitter`] it was given
//! - it returns a [`CancelHandle`] that stops it
//!
//! Ready-made producers:
//! - [`Subject`]: hot source driven by hand (tests, event buses)
//! - [`never`], [`just`], [`fail`]: constant sources
//! - [`from_receiver`], [`from_fn`]: worker-thread sources

mod subject;
mod thread;

pub use subject::Subject;
pub use thread::{from_fn, from_receiver, FnProducer, ReceiverProducer};

use crate::types::Event;
use std::fmt;
use std::sync::Weak;

/// An asynchronous source of events.
pub trait Producer<T, E>: Send + 'static {
    /// Start emitting into `emitter`. The returned handle stops the source.
    fn subscribe(self, emitter: Emitter<T, E>) -> CancelHandle;
}

/// Where an emitter delivers to. Implemented by tagged subscriptions.
pub(crate) trait EventSink<T, E>: Send + Sync {
    fn emit(&self, event: Event<T, E>);

    /// True once the sink accepts no more events.
    fn is_closed(&self) -> bool;
}

/// Handed to a [`Producer`] to push its events.
///
/// Emitting after the subscription terminated or was cancelled does nothing.
pub struct Emitter<T, E> {
    sink: Weak<dyn EventSink<T, E>>,
}

impl<T, E> Emitter<T, E> {
    pub(crate) fn new(sink: Weak<dyn EventSink<T, E>>) -> Self {
        Self { sink }
    }

    /// Push `event` to the subscription.
    pub fn emit(&self, event: Event<T, E>) {
        if let Some(sink) = self.sink.upgrade() {
            sink.emit(event);
        }
    }

    /// Push a value.
    pub fn next(&self, value: T) {
        self.emit(Event::Value(value));
    }

    /// Signal successful completion.
    pub fn complete(&self) {
        self.emit(Event::Complete);
    }

    /// Signal failure with `error`.
    pub fn error(&self, error: E) {
        self.emit(Event::Error(error));
    }

    /// Whether further events would be dropped.
    pub fn is_closed(&self) -> bool {
        self.sink.upgrade().map_or(true, |sink| sink.is_closed())
    }
}

impl<T, E> Clone for Emitter<T, E> {
    fn clone(&self) -> Self {
        Self {
            sink: self.sink.clone(),
        }
    }
}

/// Stops a running producer.
///
/// Cancellation is cooperative: it guarantees nothing more is delivered, not
/// that the producer's side effects have stopped.
pub struct CancelHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl CancelHandle {
    /// Handle that runs `cancel` on the first [`cancel`](Self::cancel).
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Handle for producers with nothing to stop.
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    /// Run the cancel action. Only the first call has an effect.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// True once there is nothing left to cancel.
    pub fn is_released(&self) -> bool {
        self.cancel.is_none()
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("released", &self.is_released())
            .finish()
    }
}

/// Source that never emits.
pub struct Never;

/// Create a source that never emits.
pub fn never() -> Never {
    Never
}

impl<T, E> Producer<T, E> for Never {
    fn subscribe(self, _emitter: Emitter<T, E>) -> CancelHandle {
        CancelHandle::noop()
    }
}

/// Source that emits one value and completes as soon as it is subscribed.
pub struct Just<T>(T);

/// Create a source that emits `value` then completes.
pub fn just<T>(value: T) -> Just<T> {
    Just(value)
}

impl<T: Send + 'static, E> Producer<T, E> for Just<T> {
    fn subscribe(self, emitter: Emitter<T, E>) -> CancelHandle {
        emitter.next(self.0);
        emitter.complete();
        CancelHandle::noop()
    }
}

/// Source that fails as soon as it is subscribed.
pub struct Fail<E>(E);

/// Create a source that fails with `error`.
pub fn fail<E>(error: E) -> Fail<E> {
    Fail(error)
}

impl<T, E: Send + 'static> Producer<T, E> for Fail<E> {
    fn subscribe(self, emitter: Emitter<T, E>) -> CancelHandle {
        emitter.error(self.0);
        CancelHandle::noop()
    }
}
