use faultline::protocol::{EnvelopeItem, SessionStatus};

fn options_with_release() -> faultline::ClientOptions {
    faultline::ClientOptions {
        release: Some("app@1.0.0".into()),
        ..Default::default()
    }
}

#[test]
fn test_session_lifecycle_produces_updates() {
    let envelopes = faultline::test::with_captured_envelopes_options(
        || {
            faultline::start_session();
            faultline::capture_message("an error happened", faultline::Level::Error);
            faultline::end_session();
        },
        options_with_release(),
    );

    let mut updates = Vec::new();
    for envelope in &envelopes {
        for item in envelope.items() {
            if let EnvelopeItem::SessionUpdate(update) = item {
                updates.push(update.clone());
            }
        }
    }

    // one update rides along with the error, the terminal one on end
    assert_eq!(updates.len(), 2);
    assert!(updates[0].init);
    assert_eq!(updates[0].errors, 1);
    assert_eq!(updates[0].status, SessionStatus::Ok);
    assert!(!updates[1].init);
    assert_eq!(updates[1].status, SessionStatus::Exited);
    assert_eq!(updates[1].session_id, updates[0].session_id);
    assert_eq!(updates[1].attributes.release, "app@1.0.0");
}

#[test]
fn test_session_without_release_is_not_started() {
    let envelopes = faultline::test::with_captured_envelopes(|| {
        faultline::start_session();
        faultline::end_session();
    });
    assert!(envelopes.is_empty());
}

#[test]
fn test_abnormal_session_end() {
    let envelopes = faultline::test::with_captured_envelopes_options(
        || {
            faultline::start_session();
            faultline::end_session_with_status(SessionStatus::Abnormal);
        },
        options_with_release(),
    );

    let update = envelopes
        .iter()
        .flat_map(|envelope| envelope.items())
        .find_map(|item| match item {
            EnvelopeItem::SessionUpdate(update) => Some(update.clone()),
            _ => None,
        })
        .expect("expected a session update");
    assert_eq!(update.status, SessionStatus::Abnormal);
}

#[test]
fn test_transactions_are_captured() {
    let options = faultline::ClientOptions {
        traces_sample_rate: 1.0,
        ..Default::default()
    };
    let envelopes = faultline::test::with_captured_envelopes_options(
        || {
            let transaction =
                faultline::start_transaction(faultline::TransactionContext::new("checkout", "http"));
            let span = transaction.start_child("db.query", "SELECT * FROM carts");
            span.finish();
            transaction.finish();
        },
        options,
    );

    assert_eq!(envelopes.len(), 1);
    let transaction = envelopes[0]
        .items()
        .find_map(|item| match item {
            EnvelopeItem::Transaction(transaction) => Some(transaction.clone()),
            _ => None,
        })
        .expect("expected a transaction item");
    assert_eq!(transaction.name.as_deref(), Some("checkout"));
    assert_eq!(transaction.spans.len(), 1);
    assert_eq!(transaction.spans[0].op.as_deref(), Some("db.query"));
    assert!(transaction.timestamp.is_some());
}

#[test]
fn test_unsampled_transactions_are_not_sent() {
    let envelopes = faultline::test::with_captured_envelopes(|| {
        let transaction =
            faultline::start_transaction(faultline::TransactionContext::new("checkout", "http"));
        transaction.finish();
    });
    assert!(envelopes.is_empty());
}
