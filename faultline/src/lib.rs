//! Faultline is an error and tracing telemetry client.
//!
//! This crate is the main entry point of the Faultline SDK: it provides a
//! default HTTP transport, environment based configuration and re-exports the
//! whole core API.
//!
//! # Quickstart
//!
//! The most convenient way to use this library is the [`init`] function,
//! which starts the client and binds it to the current hub. The returned
//! guard drains buffered envelopes when dropped, so keep it alive for the
//! lifetime of the program:
//!
//! ```
//! let _guard = faultline::init("https://key@ingest.faultline.dev/42");
//!
//! faultline::capture_message("Hello World!", faultline::Level::Info);
//!
//! // guard goes out of scope here, and the transport drains
//! ```
//!
//! # Scopes
//!
//! Captured events are annotated with the data of the current [`Scope`].
//! Scopes form a stack per hub: pushing one yields an isolated copy to
//! mutate, and the guard returned from [`Hub::push_scope`] pops it again on
//! every exit path:
//!
//! ```
//! # let _guard = faultline::init("https://key@ingest.faultline.dev/42");
//! faultline::with_scope(
//!     |scope| scope.set_tag("stage", "checkout"),
//!     || faultline::capture_message("payment declined", faultline::Level::Warning),
//! );
//! ```
//!
//! # Concurrency and isolation
//!
//! Every thread lazily derives its own hub from the process hub. Logically
//! concurrent executions that share threads, such as async tasks, should
//! bind their own hub with [`HubFutureExt::bind_hub`] so concurrent
//! executions never observe each other's pushed scopes. Executions that skip
//! this fall back to sharing the worker thread's hub; this degraded mode is
//! documented on [`Hub`].
//!
//! # Shipping and backpressure
//!
//! Finished envelopes go through the configured [`Transport`]. The default
//! HTTP transport keeps a bounded number of envelopes in flight, sheds (and
//! reports) instead of blocking when the bound is reached, and honors rate
//! limits the backend communicates via `Retry-After` and
//! `X-Faultline-Rate-Limits` headers. The host application never observes
//! panics from telemetry calls.
#![warn(missing_docs)]

pub use faultline_core::*;
#[doc(no_inline)]
pub use faultline_core::{faultline_debug, release_name};

mod defaults;
mod init;

pub use crate::defaults::apply_defaults;
pub use crate::init::{init, ClientInitGuard};

pub mod transports;

#[cfg(feature = "reqwest")]
pub use crate::transports::{HttpTransport, ReqwestHttpTransport};
pub use crate::transports::DefaultTransportFactory;
