//! Property tests: every interleaving of detach/lock/reattach delivers the
//! terminal outcome exactly once.

use observable_groups::{Event, ObservableManager, RecordingObserver, Subject};
use proptest::prelude::*;
use std::sync::Arc;

type Recorder = RecordingObserver<String, String>;

#[derive(Clone, Debug)]
enum Op {
    Detach,
    Lock,
    Unlock,
    Reattach,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Detach),
        Just(Op::Lock),
        Just(Op::Unlock),
        Just(Op::Reattach),
    ]
}

fn count(observers: &[Arc<Recorder>], pred: impl Fn(&Event<String, String>) -> bool) -> usize {
    observers
        .iter()
        .map(|o| o.events().iter().filter(|e| pred(*e)).count())
        .sum()
}

proptest! {
    #[test]
    fn prop_terminal_outcome_delivered_once(
        ops in prop::collection::vec(op(), 0..12),
        value_at in 0usize..16,
        terminal_at in 0usize..16,
        fails in any::<bool>(),
    ) {
        let value_at = value_at.min(ops.len());
        let terminal_at = terminal_at.min(ops.len()).max(value_at);

        let manager = ObservableManager::new();
        let group = manager.new_group();
        let subject = Subject::<String, String>::new();
        let mut observers = vec![Arc::new(Recorder::new())];
        group.add("tag", subject.clone(), &observers[0]).unwrap();

        for step in 0..=ops.len() {
            if step == value_at {
                subject.next("payload".to_string());
            }
            if step == terminal_at {
                if fails {
                    subject.error("failure".to_string());
                } else {
                    subject.complete();
                }
            }
            match ops.get(step) {
                Some(Op::Detach) => group.unsubscribe(),
                Some(Op::Lock) => group.lock(),
                Some(Op::Unlock) => group.unlock(),
                Some(Op::Reattach) => {
                    let observer = Arc::new(Recorder::new());
                    group
                        .observable::<String, String>("tag")
                        .unwrap()
                        .subscribe(&observer)
                        .unwrap();
                    observers.push(observer);
                }
                None => {}
            }
        }

        // Settle: unlocked, with a fresh observer attached.
        group.unlock();
        let last = Arc::new(Recorder::new());
        group
            .observable::<String, String>("tag")
            .unwrap()
            .subscribe(&last)
            .unwrap();
        observers.push(last);

        let values = count(&observers, |e| matches!(e, Event::Value(_)));
        let completes = count(&observers, |e| matches!(e, Event::Complete));
        let errors = count(&observers, |e| matches!(e, Event::Error(_)));

        if fails {
            prop_assert_eq!(errors, 1);
            prop_assert_eq!(completes, 0);
            prop_assert!(values <= 1);
        } else {
            prop_assert_eq!(completes, 1);
            prop_assert_eq!(errors, 0);
            prop_assert_eq!(values, 1);
        }
        prop_assert!(!group.has_observable("tag"));

        // Nobody ever sees anything after their terminal event.
        for observer in &observers {
            let events = observer.events();
            if let Some(pos) = events.iter().position(Event::is_terminal) {
                prop_assert_eq!(pos, events.len() - 1);
            }
        }
    }
}
