//! Producers that do their work on a dedicated thread.

use super::{CancelHandle, Emitter, Producer};
use crate::types::Event;
use crossbeam_channel::{bounded, select, Receiver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::trace;

/// Forwards events read from a channel. See [`from_receiver`].
pub struct ReceiverProducer<T, E> {
    receiver: Receiver<Event<T, E>>,
}

/// Source fed by a crossbeam channel.
///
/// A worker thread forwards events until it forwards a terminal one or is
/// cancelled. A disconnected sender counts as completion.
pub fn from_receiver<T, E>(receiver: Receiver<Event<T, E>>) -> ReceiverProducer<T, E> {
    ReceiverProducer { receiver }
}

impl<T, E> Producer<T, E> for ReceiverProducer<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn subscribe(self, emitter: Emitter<T, E>) -> CancelHandle {
        // Dropping the sender side wakes the worker through disconnection.
        let (cancel_tx, cancel_rx) = bounded::<()>(0);
        let receiver = self.receiver;

        thread::spawn(move || loop {
            select! {
                recv(receiver) -> msg => match msg {
                    Ok(event) => {
                        let terminal = event.is_terminal();
                        emitter.emit(event);
                        if terminal || emitter.is_closed() {
                            break;
                        }
                    }
                    Err(_) => {
                        emitter.complete();
                        break;
                    }
                },
                recv(cancel_rx) -> _ => {
                    trace!("channel producer cancelled");
                    break;
                }
            }
        });

        CancelHandle::new(move || drop(cancel_tx))
    }
}

/// Runs a closure on a worker thread. See [`from_fn`].
pub struct FnProducer<F> {
    work: F,
}

/// Source that runs `work` on its own thread and emits its result.
///
/// `Ok(v)` becomes a value followed by completion, `Err(e)` an error. If the
/// source is cancelled before `work` returns, the result is dropped.
pub fn from_fn<F>(work: F) -> FnProducer<F> {
    FnProducer { work }
}

impl<T, E, F> Producer<T, E> for FnProducer<F>
where
    T: Send + 'static,
    E: Send + 'static,
    F: FnOnce() -> Result<T, E> + Send + 'static,
{
    fn subscribe(self, emitter: Emitter<T, E>) -> CancelHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let work = self.work;

        thread::spawn(move || {
            let result = work();
            if flag.load(Ordering::Acquire) {
                trace!("dropping result of cancelled worker");
                return;
            }
            match result {
                Ok(value) => {
                    emitter.next(value);
                    emitter.complete();
                }
                Err(error) => emitter.error(error),
            }
        });

        CancelHandle::new(move || cancelled.store(true, Ordering::Release))
    }
}
