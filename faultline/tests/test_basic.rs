use faultline::protocol::Value;

#[test]
fn test_basic_capture_message() {
    let events = faultline::test::with_captured_events(|| {
        faultline::configure_scope(|scope| {
            scope.set_tag("worker", "worker1");
        });
        faultline::capture_message("Hello World!", faultline::Level::Warning);
    });
    assert_eq!(events.len(), 1);
    let event = events.into_iter().next().unwrap();
    assert_eq!(event.message.unwrap(), "Hello World!");
    assert_eq!(event.level, faultline::Level::Warning);
    assert_eq!(
        event.tags.into_iter().collect::<Vec<(String, String)>>(),
        vec![("worker".to_string(), "worker1".to_string())]
    );
}

#[test]
fn test_breadcrumbs() {
    let events = faultline::test::with_captured_events(|| {
        faultline::add_breadcrumb(|| faultline::Breadcrumb {
            ty: "log".into(),
            message: Some("First breadcrumb".into()),
            ..Default::default()
        });
        faultline::add_breadcrumb(faultline::Breadcrumb {
            ty: "log".into(),
            message: Some("Second breadcrumb".into()),
            ..Default::default()
        });
        faultline::add_breadcrumb(|| {
            vec![
                faultline::Breadcrumb {
                    ty: "log".into(),
                    message: Some("Third breadcrumb".into()),
                    ..Default::default()
                },
                faultline::Breadcrumb {
                    ty: "log".into(),
                    message: Some("Fourth breadcrumb".into()),
                    ..Default::default()
                },
            ]
        });
        faultline::add_breadcrumb(|| None);
        faultline::capture_message("Hello World!", faultline::Level::Warning);
    });
    assert_eq!(events.len(), 1);
    let event = events.into_iter().next().unwrap();

    let messages: Vec<_> = event
        .breadcrumbs
        .iter()
        .map(|x| (x.message.as_deref().unwrap(), x.ty.as_str()))
        .collect();
    assert_eq!(
        messages,
        vec![
            ("First breadcrumb", "log"),
            ("Second breadcrumb", "log"),
            ("Third breadcrumb", "log"),
            ("Fourth breadcrumb", "log"),
        ]
    );
}

#[test]
fn test_breadcrumb_eviction_is_fifo() {
    let options = faultline::ClientOptions {
        max_breadcrumbs: 3,
        ..Default::default()
    };
    let events = faultline::test::with_captured_events_options(
        || {
            for i in 0..4 {
                faultline::add_breadcrumb(faultline::Breadcrumb {
                    message: Some(format!("crumb {i}")),
                    ..Default::default()
                });
            }
            faultline::capture_message("overflow", faultline::Level::Info);
        },
        options,
    );
    assert_eq!(events.len(), 1);
    let event = events.into_iter().next().unwrap();

    // the oldest breadcrumb is the one evicted
    let messages: Vec<_> = event
        .breadcrumbs
        .iter()
        .map(|x| x.message.as_deref().unwrap())
        .collect();
    assert_eq!(messages, vec!["crumb 1", "crumb 2", "crumb 3"]);
}

#[test]
fn test_pushed_scopes_unwind_on_drop() {
    let events = faultline::test::with_captured_events(|| {
        faultline::configure_scope(|scope| scope.set_tag("base", "yes"));
        {
            let _guard = faultline::Hub::current().push_scope();
            faultline::configure_scope(|scope| scope.set_tag("inner", "yes"));
            faultline::capture_message("inside", faultline::Level::Info);
        }
        faultline::capture_message("outside", faultline::Level::Info);
    });
    assert_eq!(events.len(), 2);
    assert!(events[0].tags.contains_key("inner"));
    assert!(events[0].tags.contains_key("base"));
    assert!(!events[1].tags.contains_key("inner"));
    assert!(events[1].tags.contains_key("base"));
}

#[test]
fn test_with_scope_pops_on_panic() {
    let events = faultline::test::with_captured_events(|| {
        let result = std::panic::catch_unwind(|| {
            faultline::with_scope(
                |scope| scope.set_tag("transient", "yes"),
                || -> () { panic!("boom") },
            )
        });
        assert!(result.is_err());
        faultline::capture_message("after panic", faultline::Level::Info);
    });
    assert_eq!(events.len(), 1);
    assert!(!events[0].tags.contains_key("transient"));
}

#[test]
fn test_scope_data_round_trip() {
    let events = faultline::test::with_captured_events(|| {
        faultline::configure_scope(|scope| {
            scope.set_extra("build", Value::from(42));
        });
        let mut event = faultline::protocol::Event::new();
        event.tags.insert("env".into(), "prod".into());
        faultline::capture_event(event);
    });
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.tags["env"], "prod");
    assert_eq!(event.extra["build"], Value::from(42));
}

#[test]
fn test_capture_error_chains_sources() {
    let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let events = faultline::test::with_captured_events(|| {
        faultline::capture_error(&io_error);
    });
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.level, faultline::Level::Error);
    assert!(!event.exception.values.is_empty());
    assert_eq!(
        event.exception.values.last().unwrap().value.as_deref(),
        Some("denied")
    );
}

#[test]
fn test_last_event_id_updates() {
    faultline::test::with_captured_events(|| {
        assert_eq!(faultline::last_event_id(), None);
        let id = faultline::capture_message("hello", faultline::Level::Info);
        assert_eq!(faultline::last_event_id(), Some(id));
    });
}
