//! Hot subject that forwards whatever is pushed into it.

use super::{CancelHandle, Emitter, Producer};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

enum Terminal<E> {
    Completed,
    Failed(E),
}

struct SubjectState<T, E> {
    emitters: HashMap<u64, Emitter<T, E>>,
    next_id: u64,
    terminal: Option<Terminal<E>>,
}

/// Hot publish subject.
///
/// Subscribers only see events pushed after they subscribed. A subscriber that
/// arrives after termination receives the terminal event right away.
/// Clones share the same state.
pub struct Subject<T, E> {
    state: Arc<Mutex<SubjectState<T, E>>>,
}

impl<T, E> Subject<T, E> {
    /// Create a subject with no subscribers.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SubjectState {
                emitters: HashMap::new(),
                next_id: 0,
                terminal: None,
            })),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().emitters.len()
    }

    /// Whether `complete` or `error` was called.
    pub fn is_terminated(&self) -> bool {
        self.state.lock().terminal.is_some()
    }

    /// Push a value to every subscriber.
    pub fn next(&self, value: T)
    where
        T: Clone,
    {
        let emitters: Vec<Emitter<T, E>> = {
            let state = self.state.lock();
            if state.terminal.is_some() {
                return;
            }
            state.emitters.values().cloned().collect()
        };

        for emitter in emitters {
            emitter.next(value.clone());
        }
    }

    /// Complete every subscriber.
    pub fn complete(&self) {
        let emitters = {
            let mut state = self.state.lock();
            if state.terminal.is_some() {
                return;
            }
            state.terminal = Some(Terminal::Completed);
            std::mem::take(&mut state.emitters)
        };

        for emitter in emitters.into_values() {
            emitter.complete();
        }
    }

    /// Fail every subscriber with a copy of `error`.
    pub fn error(&self, error: E)
    where
        E: Clone,
    {
        let emitters = {
            let mut state = self.state.lock();
            if state.terminal.is_some() {
                return;
            }
            state.terminal = Some(Terminal::Failed(error.clone()));
            std::mem::take(&mut state.emitters)
        };

        for emitter in emitters.into_values() {
            emitter.error(error.clone());
        }
    }
}

impl<T, E> Clone for Subject<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T, E> Default for Subject<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Producer<T, E> for Subject<T, E>
where
    T: Send + 'static,
    E: Clone + Send + 'static,
{
    fn subscribe(self, emitter: Emitter<T, E>) -> CancelHandle {
        let mut state = self.state.lock();
        if let Some(terminal) = &state.terminal {
            let error = match terminal {
                Terminal::Completed => None,
                Terminal::Failed(e) => Some(e.clone()),
            };
            drop(state);

            match error {
                Some(error) => emitter.error(error),
                None => emitter.complete(),
            }
            return CancelHandle::noop();
        }

        let id = state.next_id;
        state.next_id += 1;
        state.emitters.insert(id, emitter);

        let weak: Weak<Mutex<SubjectState<T, E>>> = Arc::downgrade(&self.state);
        CancelHandle::new(move || {
            if let Some(state) = weak.upgrade() {
                state.lock().emitters.remove(&id);
            }
        })
    }
}
