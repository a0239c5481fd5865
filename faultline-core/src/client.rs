use std::fmt;
use std::panic::RefUnwindSafe;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use rand::random;

use crate::constants::SDK_INFO;
use crate::protocol::{Envelope, Event, SessionUpdate, Transaction};
use crate::types::{random_uuid, Dsn, Uuid};
use crate::{ClientOptions, Delivery, Scope, Transport};

impl<T: Into<ClientOptions>> From<T> for Client {
    fn from(o: T) -> Client {
        Client::with_options(o.into())
    }
}

pub(crate) type TransportArc = Arc<RwLock<Option<Arc<dyn Transport>>>>;

/// The Faultline client.
///
/// The client is responsible for event preparation and for handing finished
/// envelopes to its owned [`Transport`]. It is created from a
/// [`ClientOptions`] value and lives until it is explicitly closed, at which
/// point the transport is drained and released.
pub struct Client {
    options: ClientOptions,
    transport: TransportArc,
    sdk_info: crate::protocol::ClientSdkInfo,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("dsn", &self.dsn())
            .field("options", &self.options)
            .finish()
    }
}

impl Clone for Client {
    fn clone(&self) -> Client {
        let transport = Arc::new(RwLock::new(self.transport.read().unwrap().clone()));
        Client {
            options: self.options.clone(),
            transport,
            sdk_info: self.sdk_info.clone(),
        }
    }
}

impl Client {
    /// Creates a new client from a config.
    ///
    /// # Supported Configs
    ///
    /// The following common values are supported for the client config:
    ///
    /// * `ClientOptions`: configure the client with the given client options.
    /// * `()` or empty string: disable the client.
    /// * `&str` / `String`: configure the client with the given DSN.
    /// * `Dsn` / `&Dsn`: configure the client with a given DSN.
    /// * `(Dsn, ClientOptions)`: configure the client from the given DSN and
    ///   options.
    ///
    /// # Panics
    ///
    /// The `Into<ClientOptions>` implementations can panic for the forms
    /// where a DSN needs to be parsed. If you want to handle invalid DSNs,
    /// parse them manually beforehand.
    pub fn from_config<O: Into<ClientOptions>>(opts: O) -> Client {
        Client::with_options(opts.into())
    }

    /// Creates a new client for the given options.
    ///
    /// If the DSN on the options is set to `None` the client will be entirely
    /// disabled.
    pub fn with_options(options: ClientOptions) -> Client {
        // create the thread-local hub eagerly, so the transport's worker
        // thread can never be the first to initialize the process hub
        crate::Hub::with(|_| {});

        let create_transport = || {
            options.dsn.as_ref()?;
            let factory = options.transport.as_ref()?;
            Some(factory.create_transport(&options))
        };
        let transport = Arc::new(RwLock::new(create_transport()));

        Client {
            options,
            transport,
            sdk_info: SDK_INFO.clone(),
        }
    }

    /// Returns the options of this client.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Returns the DSN that constructed this client.
    pub fn dsn(&self) -> Option<&Dsn> {
        self.options.dsn.as_ref()
    }

    /// Quick check to see if the client is enabled.
    ///
    /// The client is enabled if it has a valid DSN and transport configured.
    pub fn is_enabled(&self) -> bool {
        self.options.dsn.is_some() && self.transport.read().unwrap().is_some()
    }

    /// Prepares an event for transmission.
    ///
    /// This never raises towards the caller; when enrichment fails the event
    /// proceeds with less context. A `None` return means the event was
    /// discarded, by a processor, a hook or sampling.
    pub fn prepare_event(&self, mut event: Event, scope: Option<&Scope>) -> Option<Event> {
        // event_id and sdk info are set before the processors run so that
        // processors can poke around in that data
        if event.event_id.is_nil() {
            event.event_id = random_uuid();
        }
        if event.sdk.is_none() {
            event.sdk = Some(self.sdk_info.clone());
        }

        if let Some(scope) = scope {
            event = match scope.apply_to_event(event) {
                Some(event) => event,
                None => {
                    faultline_debug!("event dropped by a scope processor");
                    return None;
                }
            };
        }

        if event.release.is_none() {
            event.release = self.options.release.as_ref().map(|x| x.to_string());
        }
        if event.environment.is_none() {
            event.environment = self.options.environment.as_ref().map(|x| x.to_string());
        }
        if event.server_name.is_none() {
            event.server_name = self.options.server_name.as_ref().map(|x| x.to_string());
        }
        if &event.platform == "other" {
            event.platform = "native".into();
        }

        if let Some(ref func) = self.options.before_send {
            let id = event.event_id;
            event = match func(event) {
                Some(event) => event,
                None => {
                    faultline_debug!("before_send dropped event {:?}", id);
                    return None;
                }
            };
        }

        if let Some(scope) = scope {
            scope.update_session_from_event(&event);
        }

        if !self.sample_should_send(self.options.sample_rate) {
            faultline_debug!("event dropped by sampling");
            None
        } else {
            Some(event)
        }
    }

    /// Captures an event and sends it to the ingestion endpoint.
    ///
    /// Returns the event id, or the nil id when the event was discarded or
    /// the client is disabled.
    pub fn capture_event(&self, event: Event, scope: Option<&Scope>) -> Uuid {
        let transport = self.transport.read().unwrap().clone();
        let Some(transport) = transport else {
            faultline_debug!("client is disabled or closed, dropping event");
            return Uuid::nil();
        };

        let Some(event) = self.prepare_event(event, scope) else {
            return Uuid::nil();
        };

        let event_id = event.event_id;
        let mut envelope: Envelope = event.into();

        // a dirty session update rides along in the same envelope
        let session_item = scope.and_then(|scope| {
            scope
                .session
                .lock()
                .unwrap()
                .as_mut()
                .and_then(|session| session.create_envelope_item())
        });
        if let Some(session_item) = session_item {
            envelope.add_item(session_item);
        }

        let _ = transport.send_envelope(envelope);
        event_id
    }

    /// Captures a release health session update.
    pub fn capture_session(&self, session_update: SessionUpdate) {
        if let Some(ref transport) = *self.transport.read().unwrap() {
            let _ = transport.send_envelope(session_update.into());
        } else {
            faultline_debug!("client is disabled or closed, dropping session update");
        }
    }

    /// Captures a finished performance transaction.
    ///
    /// The transaction passes through the `before_send_transaction` hook,
    /// which may modify or veto it.
    pub fn capture_transaction(&self, mut transaction: Transaction) -> Uuid {
        let transport = self.transport.read().unwrap().clone();
        let Some(transport) = transport else {
            faultline_debug!("client is disabled or closed, dropping transaction");
            return Uuid::nil();
        };

        if let Some(ref func) = self.options.before_send_transaction {
            let id = transaction.event_id;
            transaction = match func(transaction) {
                Some(transaction) => transaction,
                None => {
                    faultline_debug!("before_send_transaction dropped transaction {:?}", id);
                    return Uuid::nil();
                }
            };
        }

        let event_id = transaction.event_id;
        let _ = transport.send_envelope(transaction.into());
        event_id
    }

    /// Sends the specified [`Envelope`] directly.
    ///
    /// Returns the delivery promise for the envelope, which is already
    /// resolved as failed when the client is disabled or closed.
    pub fn send_envelope(&self, envelope: Envelope) -> Delivery {
        if let Some(ref transport) = *self.transport.read().unwrap() {
            transport.send_envelope(envelope)
        } else {
            faultline_debug!("client is disabled or closed, dropping envelope");
            Delivery::resolved(crate::SendOutcome::Failed)
        }
    }

    /// Drains all pending envelopes without shutting down.
    ///
    /// Returns `true` when everything in flight drained within the timeout.
    /// If no timeout is provided the `shutdown_timeout` of the client options
    /// is used.
    pub fn flush(&self, timeout: Option<Duration>) -> bool {
        if let Some(ref transport) = *self.transport.read().unwrap() {
            transport.flush(timeout.unwrap_or(self.options.shutdown_timeout))
        } else {
            true
        }
    }

    /// Drains all pending envelopes and shuts down the transport.
    ///
    /// After the transport is shut down it is removed; subsequent sends fail
    /// fast instead of attempting delivery.
    pub fn close(&self, timeout: Option<Duration>) -> bool {
        let transport_opt = self.transport.write().unwrap().take();
        if let Some(transport) = transport_opt {
            transport.shutdown(timeout.unwrap_or(self.options.shutdown_timeout))
        } else {
            true
        }
    }

    /// Returns a random boolean with a probability defined by rate.
    pub fn sample_should_send(&self, rate: f32) -> bool {
        if rate >= 1.0 {
            true
        } else if rate <= 0.0 {
            false
        } else {
            random::<f32>() < rate
        }
    }
}

// Make this unwind safe. It's not out of the box because of the
// `BeforeCallback`s inside `ClientOptions`.
impl RefUnwindSafe for Client {}
