//! This provides testing functionality for building tests.
//!
//! **Feature:** `test` (*disabled by default*)
//!
//! If the crate is compiled with the `test` feature, this module becomes
//! available and provides functionality to capture events in a block, with a
//! transport that collects instead of sending.
//!
//! # Example usage
//!
//! ```
//! # use faultline_core as faultline;
//! use faultline::test::with_captured_events;
//! use faultline::{capture_message, Level};
//!
//! let events = with_captured_events(|| {
//!     capture_message("Hello World!", Level::Warning);
//! });
//! assert_eq!(events.len(), 1);
//! assert_eq!(events[0].message.as_ref().unwrap(), "Hello World!");
//! assert_eq!(events[0].level, Level::Warning);
//! ```

use std::sync::{Arc, Mutex};

use crate::protocol::{Envelope, EnvelopeItem, Event};
use crate::types::Dsn;
use crate::{Client, ClientOptions, Delivery, Hub, Scope, SendOutcome, Transport};

lazy_static::lazy_static! {
    static ref TEST_DSN: Dsn = "https://public@faultline.invalid/1".parse().unwrap();
}

/// Collects envelopes instead of sending them.
///
/// Example usage:
///
/// ```
/// # use faultline_core as faultline;
/// use std::sync::Arc;
/// use faultline::{ClientOptions, Hub};
/// use faultline::test::TestTransport;
///
/// let transport = TestTransport::new();
/// let options = ClientOptions {
///     dsn: Some("https://public@example.com/1".parse().unwrap()),
///     transport: Some(Arc::new(transport.clone())),
///     ..ClientOptions::default()
/// };
/// Hub::current().bind_client(Some(Arc::new(options.into())));
/// ```
pub struct TestTransport {
    collected: Mutex<Vec<Envelope>>,
}

impl TestTransport {
    /// Creates a new test transport.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> Arc<TestTransport> {
        Arc::new(TestTransport {
            collected: Mutex::new(vec![]),
        })
    }

    /// Fetches and clears the contained envelopes.
    pub fn fetch_and_clear_envelopes(&self) -> Vec<Envelope> {
        let mut guard = self.collected.lock().unwrap();
        std::mem::take(&mut *guard)
    }

    /// Fetches and clears the contained events.
    pub fn fetch_and_clear_events(&self) -> Vec<Event> {
        self.fetch_and_clear_envelopes()
            .into_iter()
            .filter_map(|envelope| {
                envelope.items().find_map(|item| match item {
                    EnvelopeItem::Event(event) => Some(event.clone()),
                    _ => None,
                })
            })
            .collect()
    }
}

impl Transport for TestTransport {
    fn send_envelope(&self, envelope: Envelope) -> Delivery {
        self.collected.lock().unwrap().push(envelope);
        Delivery::resolved(SendOutcome::Success)
    }
}

/// Runs some code with the default test hub and returns the captured events.
///
/// This is a shortcut for creating a testable hub with default options and
/// calling [`with_captured_events_options`].
pub fn with_captured_events<F: FnOnce()>(f: F) -> Vec<Event> {
    with_captured_events_options(f, ClientOptions::default())
}

/// Runs some code with a test hub with the given options and returns the
/// captured events.
///
/// If no DSN is set on the options a default test DSN is inserted. The
/// transport on the options is also overridden with a [`TestTransport`].
pub fn with_captured_events_options<F: FnOnce(), O: Into<ClientOptions>>(
    f: F,
    options: O,
) -> Vec<Event> {
    let transport = TestTransport::new();
    let mut options = options.into();
    options.dsn = Some(options.dsn.unwrap_or_else(|| TEST_DSN.clone()));
    options.transport = Some(Arc::new(transport.clone()));
    let hub = Hub::new(
        Some(Arc::new(Client::with_options(options))),
        Scope::default(),
    );
    hub.run(f);
    transport.fetch_and_clear_events()
}

/// Runs some code with the default test hub and returns the captured
/// envelopes, including sessions and transactions.
pub fn with_captured_envelopes<F: FnOnce()>(f: F) -> Vec<Envelope> {
    with_captured_envelopes_options(f, ClientOptions::default())
}

/// Runs some code with a test hub with the given options and returns the
/// captured envelopes.
pub fn with_captured_envelopes_options<F: FnOnce(), O: Into<ClientOptions>>(
    f: F,
    options: O,
) -> Vec<Envelope> {
    let transport = TestTransport::new();
    let mut options = options.into();
    options.dsn = Some(options.dsn.unwrap_or_else(|| TEST_DSN.clone()));
    options.transport = Some(Arc::new(transport.clone()));
    let hub = Hub::new(
        Some(Arc::new(Client::with_options(options))),
        Scope::default(),
    );
    hub.run(f);
    transport.fetch_and_clear_envelopes()
}
