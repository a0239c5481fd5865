use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::time::Duration;

use crate::protocol::Envelope;
use crate::ClientOptions;

/// The final outcome of handing an envelope to a transport.
///
/// Failure is always reported as a value, never as a panic: the application
/// error path must not be able to crash on its own telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SendOutcome {
    /// The envelope was accepted by the backend.
    Success,
    /// The envelope was suppressed by an active rate limit, or the backend
    /// asked the client to back off.
    RateLimited,
    /// The backend rejected the envelope as malformed. Not retried.
    Invalid,
    /// The envelope was shed because the transport queue was at capacity.
    QueueFull,
    /// The envelope could not be delivered due to a network level failure.
    ///
    /// The transport does not retry on its own; retry policy, if any, is the
    /// caller's responsibility.
    Failed,
}

impl std::fmt::Display for SendOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            SendOutcome::Success => write!(f, "success"),
            SendOutcome::RateLimited => write!(f, "rate limited"),
            SendOutcome::Invalid => write!(f, "invalid"),
            SendOutcome::QueueFull => write!(f, "queue full"),
            SendOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// The promise for the final [`SendOutcome`] of a single send.
///
/// A `Delivery` is returned from [`Transport::send_envelope`] and resolves
/// exactly once, when the envelope has either been handed to the network or
/// been shed. Waiting is optional; dropping the promise does not affect the
/// send.
pub struct Delivery {
    rx: Receiver<SendOutcome>,
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Delivery")
    }
}

impl Delivery {
    /// Creates a connected resolver/promise pair.
    pub fn channel() -> (DeliverySlot, Delivery) {
        let (tx, rx) = sync_channel(1);
        (DeliverySlot { tx }, Delivery { rx })
    }

    /// Creates a promise that is already resolved with the given outcome.
    pub fn resolved(outcome: SendOutcome) -> Delivery {
        let (slot, delivery) = Delivery::channel();
        slot.resolve(outcome);
        delivery
    }

    /// Returns the outcome if the delivery has already resolved.
    pub fn try_outcome(&self) -> Option<SendOutcome> {
        self.rx.try_recv().ok()
    }

    /// Waits for the outcome, giving up after `timeout`.
    ///
    /// A `None` return means the send was still in flight when the timeout
    /// elapsed, or the transport was torn down without resolving it.
    pub fn wait(&self, timeout: Duration) -> Option<SendOutcome> {
        self.rx.recv_timeout(timeout).ok()
    }
}

/// Resolves a [`Delivery`] exactly once.
pub struct DeliverySlot {
    tx: SyncSender<SendOutcome>,
}

impl DeliverySlot {
    /// Resolves the connected promise with the given outcome.
    ///
    /// A dropped promise is fine; the outcome is simply discarded.
    pub fn resolve(self, outcome: SendOutcome) {
        let _ = self.tx.try_send(outcome);
    }
}

/// The trait for transports.
///
/// A transport is responsible for shipping finished envelopes to the
/// ingestion endpoint. It must apply its own queueing and rate limiting
/// policy and must never block the caller on network I/O: backpressure is
/// applied by shedding, reported through the returned [`Delivery`].
pub trait Transport: Send + Sync + 'static {
    /// Accepts an envelope for delivery.
    ///
    /// Never panics and never blocks on the network; every failure mode is
    /// reported through the returned promise.
    fn send_envelope(&self, envelope: Envelope) -> Delivery;

    /// Blocks until everything in flight has drained or the timeout elapsed.
    ///
    /// Returns `true` when the transport drained completely. The default
    /// implementation is for transports that do not queue.
    fn flush(&self, timeout: Duration) -> bool {
        let _ = timeout;
        true
    }

    /// Flushes and then instructs the transport to shut down.
    fn shutdown(&self, timeout: Duration) -> bool {
        self.flush(timeout)
    }
}

/// A factory creating a transport for the given client options.
pub trait TransportFactory: Send + Sync {
    /// Given the options of a client, creates the transport it will own.
    fn create_transport(&self, options: &ClientOptions) -> std::sync::Arc<dyn Transport>;
}

impl<F> TransportFactory for F
where
    F: Fn(&ClientOptions) -> std::sync::Arc<dyn Transport> + Send + Sync,
{
    fn create_transport(&self, options: &ClientOptions) -> std::sync::Arc<dyn Transport> {
        self(options)
    }
}

impl<T: Transport> TransportFactory for std::sync::Arc<T> {
    fn create_transport(&self, options: &ClientOptions) -> std::sync::Arc<dyn Transport> {
        let _ = options;
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_delivery() {
        let delivery = Delivery::resolved(SendOutcome::QueueFull);
        assert_eq!(delivery.try_outcome(), Some(SendOutcome::QueueFull));
        // a promise resolves exactly once
        assert_eq!(delivery.try_outcome(), None);
    }

    #[test]
    fn test_wait_times_out_on_pending_delivery() {
        let (_slot, delivery) = Delivery::channel();
        assert_eq!(delivery.wait(Duration::from_millis(10)), None);
    }

    #[test]
    fn test_resolve_after_promise_dropped_is_harmless() {
        let (slot, delivery) = Delivery::channel();
        drop(delivery);
        slot.resolve(SendOutcome::Success);
    }
}
