//! Concurrency tests: producers on worker threads racing group operations.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use observable_groups::{
    from_fn, from_receiver, observer, Event, ObservableManager, Observer, RecordingObserver,
    Subject,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

type Recorder = RecordingObserver<String, String>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn wait_until(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

#[test]
fn test_worker_result_delivered_through_channel_observer() {
    init_tracing();
    let manager = ObservableManager::new();
    let group = manager.new_group();
    let (observer, handle) = observer::channel::<String, String>();
    let observer = Arc::new(observer);

    group
        .add("work", from_fn(|| Ok("computed".to_string())), &observer)
        .unwrap();

    let first = handle.recv_timeout(Duration::from_secs(5)).unwrap();
    let second = handle.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(first, Event::Value("computed".to_string()));
    assert_eq!(second, Event::Complete);
    assert!(wait_until(|| !group.has_observable("work")));
}

#[test]
fn test_worker_finishes_while_detached() {
    init_tracing();
    let manager = ObservableManager::new();
    let group = manager.new_group();
    let (gate_tx, gate_rx) = bounded::<()>(0);
    let observer = Arc::new(Recorder::new());

    group
        .add(
            "slow",
            from_fn(move || {
                let _ = gate_rx.recv();
                Err::<String, _>("timed out upstream".to_string())
            }),
            &observer,
        )
        .unwrap();
    group.unsubscribe();
    drop(gate_tx);

    // Wait for the worker to buffer its outcome.
    thread::sleep(Duration::from_millis(50));
    assert_eq!(observer.event_count(), 0);
    assert!(group.has_observable("slow"));

    let rebuilt = Arc::new(Recorder::new());
    group
        .observable::<String, String>("slow")
        .unwrap()
        .subscribe(&rebuilt)
        .unwrap();
    assert_eq!(rebuilt.errors(), vec!["timed out upstream".to_string()]);
    assert_eq!(observer.event_count(), 0);
}

#[test]
fn test_destroy_cancels_channel_producer() {
    init_tracing();
    let manager = ObservableManager::new();
    let group = manager.new_group();
    let (tx, rx) = unbounded();
    let observer = Arc::new(Recorder::new());

    group.add("feed", from_receiver(rx), &observer).unwrap();
    manager.destroy(&group);

    // The worker exits on cancel; sends may fail once it is gone.
    let _ = tx.send(Event::Value("dropped".to_string()));
    let _ = tx.send(Event::Complete);
    thread::sleep(Duration::from_millis(30));

    assert_eq!(observer.event_count(), 0);
    assert!(!group.has_observable("feed"));
}

#[test]
fn test_reattach_racing_completion_delivers_once() {
    init_tracing();
    let manager = ObservableManager::new();

    for i in 0..200 {
        let group = manager.new_group();
        let subject = Subject::<String, String>::new();
        let first = Arc::new(Recorder::new());
        group.add("tag", subject.clone(), &first).unwrap();
        group.unsubscribe();

        let producer = subject.clone();
        let worker = thread::spawn(move || {
            producer.next(format!("value-{}", i));
            producer.complete();
        });

        let second = Arc::new(Recorder::new());
        group
            .observable::<String, String>("tag")
            .unwrap()
            .subscribe(&second)
            .unwrap();
        worker.join().unwrap();

        assert_eq!(
            second.events(),
            vec![Event::Value(format!("value-{}", i)), Event::Complete]
        );
        assert_eq!(first.event_count(), 0);
        assert!(!group.has_observable("tag"));
        manager.destroy(&group);
    }
}

/// Logs each event as its delivery starts and blocks inside the first value
/// until released.
struct GatedObserver {
    log: Arc<Mutex<Vec<String>>>,
    entered: Sender<()>,
    release: Receiver<()>,
}

impl Observer<String, String> for GatedObserver {
    fn on_event(&self, event: Event<String, String>) {
        let is_value = matches!(event, Event::Value(_));
        self.log.lock().push(format!("{:?}", event));
        if is_value {
            let _ = self.entered.send(());
            let _ = self.release.recv();
        }
    }
}

#[test]
fn test_no_delivery_starts_after_destroy_returns() {
    init_tracing();
    let manager = ObservableManager::new();
    let group = manager.new_group();
    let subject = Subject::<String, String>::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let (entered_tx, entered_rx) = bounded(1);
    let (release_tx, release_rx) = bounded(1);
    let observer = Arc::new(GatedObserver {
        log: Arc::clone(&log),
        entered: entered_tx,
        release: release_rx,
    });

    group.lock();
    group.add("tag", subject.clone(), &observer).unwrap();
    subject.next("v".to_string());
    subject.complete();
    assert!(log.lock().is_empty());

    // Unlocking replays [Value, Complete]; the observer stalls on the value.
    let unlocker = {
        let group = Arc::clone(&group);
        thread::spawn(move || group.unlock())
    };
    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    manager.destroy(&group);
    log.lock().push("destroyed".to_string());
    release_tx.send(()).unwrap();
    unlocker.join().unwrap();

    assert_eq!(
        *log.lock(),
        vec!["Value(\"v\")".to_string(), "destroyed".to_string()]
    );
    assert!(!group.has_observable("tag"));
}

#[test]
fn test_destroy_racing_completion_delivers_in_order() {
    init_tracing();
    let manager = ObservableManager::new();

    for _ in 0..200 {
        let group = manager.new_group();
        let subject = Subject::<String, String>::new();
        let observer = Arc::new(Recorder::new());
        group.add("tag", subject.clone(), &observer).unwrap();

        let producer = subject.clone();
        let worker = thread::spawn(move || {
            producer.next("value".to_string());
            producer.complete();
        });

        manager.destroy(&group);
        worker.join().unwrap();

        let events = observer.events();
        let full = vec![Event::Value("value".to_string()), Event::Complete];
        assert!(full.starts_with(&events), "unexpected events {:?}", events);
        assert!(!group.has_observable("tag"));
    }
}

#[test]
fn test_parallel_adds_to_one_group() {
    init_tracing();
    let manager = ObservableManager::new();
    let group = manager.new_group();
    let observers: Vec<Arc<Recorder>> = (0..16).map(|_| Arc::new(Recorder::new())).collect();

    let workers: Vec<_> = observers
        .iter()
        .enumerate()
        .map(|(i, observer)| {
            let group = Arc::clone(&group);
            let observer = Arc::clone(observer);
            thread::spawn(move || {
                let subject = Subject::<String, String>::new();
                group
                    .add(format!("tag-{}", i), subject.clone(), &observer)
                    .unwrap();
                subject.next(format!("result-{}", i));
                subject.complete();
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    for (i, observer) in observers.iter().enumerate() {
        assert_eq!(observer.values(), vec![format!("result-{}", i)]);
        assert!(observer.is_completed());
    }
    assert!(group.is_empty());
}

#[test]
fn test_lock_toggling_from_many_threads_settles() {
    init_tracing();
    let manager = ObservableManager::new();
    let group = manager.new_group();
    let subject = Subject::<String, String>::new();
    let observer = Arc::new(Recorder::new());
    group.add("tag", subject.clone(), &observer).unwrap();

    let togglers: Vec<_> = (0..4)
        .map(|_| {
            let group = Arc::clone(&group);
            thread::spawn(move || {
                for _ in 0..100 {
                    group.lock();
                    group.unlock();
                }
            })
        })
        .collect();

    subject.next("settled".to_string());
    subject.complete();
    for toggler in togglers {
        toggler.join().unwrap();
    }
    group.unlock();

    assert_eq!(
        observer.events(),
        vec![Event::Value("settled".to_string()), Event::Complete]
    );
    assert!(!group.has_observable("tag"));
}
