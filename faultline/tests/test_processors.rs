use std::sync::Arc;

#[test]
fn test_processor_enriches_event() {
    let events = faultline::test::with_captured_events(|| {
        faultline::configure_scope(|scope| {
            scope.add_event_processor(|mut event| {
                event.user = Some(faultline::User {
                    email: Some("foo@example.com".into()),
                    ..Default::default()
                });
                Some(event)
            });
        });
        faultline::capture_message("Hello World!", faultline::Level::Warning);
    });

    assert_eq!(events.len(), 1);
    let event = events.into_iter().next().unwrap();
    assert_eq!(
        event.user,
        Some(faultline::User {
            email: Some("foo@example.com".into()),
            ..Default::default()
        })
    );
}

#[test]
fn test_processor_veto_drops_event() {
    let events = faultline::test::with_captured_events(|| {
        faultline::configure_scope(|scope| {
            scope.add_event_processor(|_| None);
        });
        faultline::capture_message("discarded", faultline::Level::Error);
    });
    assert!(events.is_empty());
}

#[test]
fn test_panicking_processor_does_not_block_delivery() {
    let events = faultline::test::with_captured_events(|| {
        faultline::configure_scope(|scope| {
            scope.add_event_processor(|_| panic!("misbehaving processor"));
            scope.add_event_processor(|mut event| {
                event.tags.insert("processed".into(), "yes".into());
                Some(event)
            });
        });
        faultline::capture_message("still delivered", faultline::Level::Error);
    });

    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.message.as_deref(), Some("still delivered"));
    assert_eq!(event.tags["processed"], "yes");
}

#[test]
fn test_before_send_can_mutate() {
    let options = faultline::ClientOptions {
        before_send: Some(Arc::new(|mut event| {
            event.message = Some("redacted".into());
            Some(event)
        })),
        ..Default::default()
    };
    let events = faultline::test::with_captured_events_options(
        || {
            faultline::capture_message("secret", faultline::Level::Info);
        },
        options,
    );
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].message.as_deref(), Some("redacted"));
}

#[test]
fn test_before_send_can_veto() {
    let options = faultline::ClientOptions {
        before_send: Some(Arc::new(|_| None)),
        ..Default::default()
    };
    let events = faultline::test::with_captured_events_options(
        || {
            faultline::capture_message("secret", faultline::Level::Info);
        },
        options,
    );
    assert!(events.is_empty());
}

#[test]
fn test_before_breadcrumb_filters() {
    let options = faultline::ClientOptions {
        before_breadcrumb: Some(Arc::new(|breadcrumb| {
            if breadcrumb.category.as_deref() == Some("noise") {
                None
            } else {
                Some(breadcrumb)
            }
        })),
        ..Default::default()
    };
    let events = faultline::test::with_captured_events_options(
        || {
            faultline::add_breadcrumb(faultline::Breadcrumb {
                category: Some("noise".into()),
                ..Default::default()
            });
            faultline::add_breadcrumb(faultline::Breadcrumb {
                category: Some("signal".into()),
                ..Default::default()
            });
            faultline::capture_message("crumbs", faultline::Level::Info);
        },
        options,
    );
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].breadcrumbs.len(), 1);
    assert_eq!(
        events[0].breadcrumbs.values[0].category.as_deref(),
        Some("signal")
    );
}

#[test]
fn test_sample_rate_zero_drops_everything() {
    let options = faultline::ClientOptions {
        sample_rate: 0.0,
        ..Default::default()
    };
    let events = faultline::test::with_captured_events_options(
        || {
            faultline::capture_message("unsampled", faultline::Level::Info);
        },
        options,
    );
    assert!(events.is_empty());
}
