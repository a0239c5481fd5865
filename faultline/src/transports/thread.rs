use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, SyncSender, TrySendError};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use faultline_core::faultline_debug;

use super::ratelimit::{RateLimiter, RateLimitingCategory};
use crate::{Delivery, DeliverySlot, Envelope, SendOutcome};

enum Task {
    SendEnvelope(Envelope, DeliverySlot),
    Shutdown,
}

// The number of admitted envelopes that have not completed yet. Admission,
// completion and flush all go through this one counter, so a slot can never
// leak: every admit is paired with exactly one release on the worker.
#[derive(Default)]
struct Inflight {
    count: Mutex<usize>,
    drained: Condvar,
}

impl Inflight {
    fn try_admit(&self, limit: usize) -> bool {
        let mut count = self.count.lock().unwrap();
        if *count >= limit {
            return false;
        }
        *count += 1;
        true
    }

    fn release(&self) {
        let mut count = self.count.lock().unwrap();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.drained.notify_all();
        }
    }

    fn wait_drained(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.count.lock().unwrap();
        while *count > 0 {
            let left = match deadline.checked_duration_since(Instant::now()) {
                Some(left) => left,
                None => return false,
            };
            let (guard, result) = self.drained.wait_timeout(count, left).unwrap();
            count = guard;
            if result.timed_out() && *count > 0 {
                return false;
            }
        }
        true
    }
}

/// The background worker shared by the HTTP transports.
///
/// Envelopes are admitted against a bounded in-flight budget and handed to a
/// dedicated worker thread driving a current-thread tokio runtime. The
/// producer is never blocked: a full queue or an active rate limit resolves
/// the returned [`Delivery`] immediately instead.
pub(crate) struct TransportThread {
    sender: SyncSender<Task>,
    inflight: Arc<Inflight>,
    limit: usize,
    limiter: Arc<Mutex<RateLimiter>>,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TransportThread {
    pub fn new<SendFn, SendFuture>(queue_size: usize, mut send: SendFn) -> Self
    where
        SendFn: FnMut(Envelope, RateLimiter) -> SendFuture + Send + 'static,
        // NOTE: the future returns the RateLimiter back to avoid borrow
        // entanglement between the closure and its returned future
        SendFuture: std::future::Future<Output = (RateLimiter, SendOutcome)>,
    {
        let limit = queue_size.max(1);
        let (sender, receiver) = sync_channel::<Task>(limit);
        let inflight = Arc::new(Inflight::default());
        let limiter = Arc::new(Mutex::new(RateLimiter::new()));
        let shutdown = Arc::new(AtomicBool::new(false));

        let inflight_worker = inflight.clone();
        let limiter_worker = limiter.clone();
        let shutdown_worker = shutdown.clone();
        let handle = thread::Builder::new()
            .name("faultline-transport".into())
            .spawn(move || {
                // a runtime on the transport thread drives the async sends
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(_) => return,
                };

                rt.block_on(async move {
                    for task in receiver.into_iter() {
                        let (envelope, slot) = match task {
                            Task::SendEnvelope(envelope, slot) => (envelope, slot),
                            Task::Shutdown => return,
                        };

                        if shutdown_worker.load(Ordering::SeqCst) {
                            inflight_worker.release();
                            slot.resolve(SendOutcome::Failed);
                            continue;
                        }

                        // a deadline may have been set while the envelope
                        // sat in the queue, so check again before the send
                        let rl = limiter_worker.lock().unwrap().clone();
                        let outcome = if let Some(time_left) =
                            rl.is_disabled(RateLimitingCategory::Any)
                        {
                            faultline_debug!(
                                "skipping send because of rate limits for {}s",
                                time_left.as_secs()
                            );
                            SendOutcome::RateLimited
                        } else {
                            match rl.filter_envelope(envelope) {
                                Some(envelope) => {
                                    let (rl, outcome) = send(envelope, rl).await;
                                    *limiter_worker.lock().unwrap() = rl;
                                    outcome
                                }
                                None => {
                                    faultline_debug!(
                                        "envelope was discarded due to per-item rate limits"
                                    );
                                    SendOutcome::RateLimited
                                }
                            }
                        };

                        inflight_worker.release();
                        slot.resolve(outcome);
                    }
                })
            })
            .ok();

        Self {
            sender,
            inflight,
            limit,
            limiter,
            shutdown,
            handle,
        }
    }

    pub fn send(&self, envelope: Envelope) -> Delivery {
        let (slot, delivery) = Delivery::channel();

        if self.handle.is_none() || self.shutdown.load(Ordering::SeqCst) {
            slot.resolve(SendOutcome::Failed);
            return delivery;
        }

        // a live deadline rejects the envelope before it touches the queue
        {
            let limiter = self.limiter.lock().unwrap();
            if let Some(time_left) = limiter.is_envelope_disabled(&envelope) {
                faultline_debug!(
                    "dropping envelope, rate limited for another {}s",
                    time_left.as_secs()
                );
                slot.resolve(SendOutcome::RateLimited);
                return delivery;
            }
        }

        // backpressure sheds instead of stalling the producer
        if !self.inflight.try_admit(self.limit) {
            faultline_debug!("dropping envelope, transport queue is full");
            slot.resolve(SendOutcome::QueueFull);
            return delivery;
        }

        if let Err(err) = self.sender.try_send(Task::SendEnvelope(envelope, slot)) {
            self.inflight.release();
            let (outcome, task) = match err {
                TrySendError::Full(task) => (SendOutcome::QueueFull, task),
                TrySendError::Disconnected(task) => (SendOutcome::Failed, task),
            };
            if let Task::SendEnvelope(_, slot) = task {
                slot.resolve(outcome);
            }
        }

        delivery
    }

    pub fn flush(&self, timeout: Duration) -> bool {
        self.inflight.wait_drained(timeout)
    }
}

impl Drop for TransportThread {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let _ = self.sender.send(Task::Shutdown);
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn event_envelope() -> Envelope {
        Envelope::from(crate::protocol::Event::new())
    }

    // a worker that parks on `gate` before resolving, to keep sends in flight
    fn gated_thread(
        queue_size: usize,
        outcome: SendOutcome,
    ) -> (TransportThread, mpsc::Sender<()>) {
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let gate_rx = Arc::new(Mutex::new(gate_rx));
        let thread = TransportThread::new(queue_size, move |_envelope, rl| {
            let gate_rx = gate_rx.clone();
            async move {
                let _ = gate_rx.lock().unwrap().recv();
                (rl, outcome)
            }
        });
        (thread, gate_tx)
    }

    #[test]
    fn test_send_resolves_success() {
        let thread =
            TransportThread::new(4, |_envelope, rl| async move { (rl, SendOutcome::Success) });
        let delivery = thread.send(event_envelope());
        assert_eq!(
            delivery.wait(Duration::from_secs(5)),
            Some(SendOutcome::Success)
        );
        assert!(thread.flush(Duration::from_secs(5)));
    }

    #[test]
    fn test_queue_capacity_one_sheds_second_send() {
        let (thread, gate) = gated_thread(1, SendOutcome::Success);

        let first = thread.send(event_envelope());
        let second = thread.send(event_envelope());

        // exactly one admitted attempt, one shed
        assert_eq!(second.try_outcome(), Some(SendOutcome::QueueFull));
        assert_eq!(first.try_outcome(), None);

        gate.send(()).unwrap();
        assert_eq!(
            first.wait(Duration::from_secs(5)),
            Some(SendOutcome::Success)
        );

        // the slot is free again after completion
        gate.send(()).unwrap();
        let third = thread.send(event_envelope());
        assert_eq!(
            third.wait(Duration::from_secs(5)),
            Some(SendOutcome::Success)
        );
    }

    #[test]
    fn test_rate_limited_send_makes_no_network_call() {
        use std::sync::atomic::AtomicUsize;

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_worker = calls.clone();
        let thread = TransportThread::new(4, move |_envelope, rl| {
            calls_worker.fetch_add(1, Ordering::SeqCst);
            async move { (rl, SendOutcome::Success) }
        });

        thread
            .limiter
            .lock()
            .unwrap()
            .update_from_retry_after("5");

        let delivery = thread.send(event_envelope());
        assert_eq!(delivery.try_outcome(), Some(SendOutcome::RateLimited));
        assert!(thread.flush(Duration::from_secs(5)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_flush_with_nothing_in_flight_is_immediate() {
        let thread =
            TransportThread::new(4, |_envelope, rl| async move { (rl, SendOutcome::Success) });
        let started = Instant::now();
        assert!(thread.flush(Duration::from_secs(5)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_flush_times_out_without_corrupting_the_counter() {
        let (thread, gate) = gated_thread(2, SendOutcome::Success);

        let delivery = thread.send(event_envelope());
        assert!(!thread.flush(Duration::from_millis(50)));

        // the pending send still completes and releases its slot
        gate.send(()).unwrap();
        assert_eq!(
            delivery.wait(Duration::from_secs(5)),
            Some(SendOutcome::Success)
        );
        assert!(thread.flush(Duration::from_secs(5)));
        assert_eq!(*thread.inflight.count.lock().unwrap(), 0);
    }

    #[test]
    fn test_worker_updates_shared_rate_limit_state() {
        let thread = TransportThread::new(4, |_envelope, mut rl| async move {
            rl.update_from_rate_limits("error:30");
            (rl, SendOutcome::RateLimited)
        });

        let first = thread.send(event_envelope());
        assert_eq!(
            first.wait(Duration::from_secs(5)),
            Some(SendOutcome::RateLimited)
        );

        // the deadline the worker learned now rejects sends up front
        let second = thread.send(event_envelope());
        assert_eq!(second.try_outcome(), Some(SendOutcome::RateLimited));
    }
}
