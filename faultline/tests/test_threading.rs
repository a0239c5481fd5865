use std::thread;

use faultline::{Hub, HubFutureExt};

#[test]
fn test_scopes_do_not_leak_between_threads() {
    let events = faultline::test::with_captured_events(|| {
        faultline::configure_scope(|scope| scope.set_tag("worker", "main"));

        let hub = Hub::new_from_top(&Hub::current());
        thread::spawn(move || {
            hub.run(|| {
                faultline::configure_scope(|scope| scope.set_tag("worker", "background"));
                faultline::capture_message("from thread", faultline::Level::Info);
            });
        })
        .join()
        .unwrap();

        faultline::capture_message("from main", faultline::Level::Info);
    });

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].tags["worker"], "background");
    assert_eq!(events[1].tags["worker"], "main");
}

#[test]
fn test_scope_push_in_thread_does_not_affect_parent() {
    let events = faultline::test::with_captured_events(|| {
        let hub = Hub::new_from_top(&Hub::current());
        thread::spawn(move || {
            hub.run(|| {
                let _guard = Hub::current().push_scope();
                faultline::configure_scope(|scope| scope.set_tag("transient", "yes"));
            });
        })
        .join()
        .unwrap();

        faultline::capture_message("after thread", faultline::Level::Info);
    });

    assert_eq!(events.len(), 1);
    assert!(!events[0].tags.contains_key("transient"));
}

#[test]
fn test_bound_futures_are_isolated() {
    let events = faultline::test::with_captured_events(|| {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        let make_task = |name: &'static str, delay_ms: u64| {
            async move {
                faultline::configure_scope(|scope| scope.set_tag("task", name));
                // yield so that the two tasks interleave on the one thread
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                faultline::capture_message(name, faultline::Level::Info);
            }
            .bind_hub(Hub::new_from_top(&Hub::current()))
        };

        rt.block_on(async {
            tokio::join!(make_task("first", 20), make_task("second", 10));
        });
    });

    assert_eq!(events.len(), 2);
    for event in &events {
        let name = event.message.as_deref().unwrap();
        assert_eq!(event.tags["task"], name);
    }
}

#[test]
fn test_unbound_futures_share_the_thread_hub() {
    // the documented degraded mode: tasks that skip bind_hub observe the
    // worker thread's hub, so scope writes interleave
    let events = faultline::test::with_captured_events(|| {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        rt.block_on(async {
            faultline::configure_scope(|scope| scope.set_tag("task", "shared"));
            async {
                faultline::capture_message("unbound", faultline::Level::Info);
            }
            .await;
        });
    });

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].tags["task"], "shared");
}
