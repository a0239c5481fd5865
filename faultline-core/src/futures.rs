use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::Hub;

/// A future that binds a [`Hub`] to its execution.
///
/// The hub is re-entered around every poll, so whatever thread of a runtime
/// ends up driving the future, the code inside observes its own hub and not
/// the worker thread's. This is what keeps scope stacks of logically
/// concurrent tasks isolated from each other.
pub struct HubFuture<F> {
    hub: Hub,
    future: F,
}

impl<F> HubFuture<F> {
    /// Creates a new bound future with the given hub.
    pub fn new(hub: Hub, future: F) -> Self {
        Self { hub, future }
    }
}

impl<F> Future for HubFuture<F>
where
    F: Future,
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let hub = self.hub.clone();
        // https://doc.rust-lang.org/std/pin/index.html#pinning-is-structural-for-field
        let future = unsafe { self.map_unchecked_mut(|s| &mut s.future) };
        hub.run(|| future.poll(cx))
    }
}

/// Future extension trait that adds hub binding.
pub trait HubFutureExt: Sized {
    /// Binds a hub to the execution of this future.
    ///
    /// A task spawned onto a shared runtime should be bound to a fresh hub
    /// derived from the current one:
    ///
    /// ```
    /// # use faultline_core as faultline;
    /// use faultline::{Hub, HubFutureExt};
    ///
    /// let task = async { 1_u32 }.bind_hub(Hub::new_from_top(&Hub::current()));
    /// ```
    fn bind_hub(self, hub: Hub) -> HubFuture<Self>;
}

impl<F: Future> HubFutureExt for F {
    fn bind_hub(self, hub: Hub) -> HubFuture<F> {
        HubFuture::new(hub, self)
    }
}
