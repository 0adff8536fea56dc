//! Integration tests for moving work from the lookup pool onto the UI context.

use std::sync::Arc;
use std::time::Duration;

use lazy_combo_core::dispatch::{Mailbox, UiContext};
use lazy_combo_core::threadpool::{CancellationToken, ThreadPool, ThreadPoolConfig};
use lazy_combo_core::{ObservableProperty, Signal};
use parking_lot::Mutex;

fn setup() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("lazy_combo_core=trace")
        .with_test_writer()
        .try_init();
}

#[test]
fn results_posted_from_workers_apply_on_ui_thread() {
    setup();
    let ui = UiContext::new();
    let pool = ThreadPool::new(ThreadPoolConfig::with_threads(2)).unwrap();
    let applied_on = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..4)
        .map(|n| {
            let dispatcher = ui.dispatcher();
            let applied_on = applied_on.clone();
            pool.spawn(move || {
                dispatcher
                    .post(move || applied_on.lock().push((n, std::thread::current().id())))
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.wait();
    }

    assert!(applied_on.lock().is_empty());
    assert_eq!(ui.process_pending(), 4);

    let ui_thread = std::thread::current().id();
    let applied = applied_on.lock();
    assert_eq!(applied.len(), 4);
    assert!(applied.iter().all(|(_, thread)| *thread == ui_thread));
}

#[test]
fn slow_stale_worker_cannot_overwrite_newer_result() {
    setup();
    let pool = ThreadPool::new(ThreadPoolConfig::with_threads(2)).unwrap();
    let mailbox = Arc::new(Mailbox::new());
    let release_old = Arc::new(std::sync::Barrier::new(2));

    // Generation 1 stalls until generation 2 has already delivered.
    mailbox.advance(1);
    let old_token = CancellationToken::new();
    let inbox = mailbox.clone();
    let gate = release_old.clone();
    let old = pool.spawn_with_token(old_token.clone(), move |_token| {
        gate.wait();
        inbox.post(1, "al results")
    });

    old_token.cancel();
    mailbox.advance(2);
    let inbox = mailbox.clone();
    let new = pool.spawn(move || inbox.post(2, "ali results"));
    assert_eq!(new.wait(), Some(true));

    release_old.wait();
    assert!(old.join_timeout(Duration::from_secs(5)));
    assert_eq!(old.wait(), Some(false));

    let posted = mailbox.take().expect("newest result should be pending");
    assert_eq!(posted.generation, 2);
    assert_eq!(posted.value, "ali results");
}

#[test]
fn property_notifications_follow_writes() {
    setup();
    let loading = ObservableProperty::new(false);
    let opened = Signal::<()>::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    let log_clone = log.clone();
    loading
        .changed
        .connect(move |value| log_clone.lock().push(format!("loading={value}")));
    let log_clone = log.clone();
    opened.connect(move |_| log_clone.lock().push("opened".to_string()));

    loading.set(true);
    opened.emit(());
    loading.set(false);
    loading.set(false);

    assert_eq!(
        *log.lock(),
        vec!["loading=true", "opened", "loading=false"]
    );
}
