//! This crate provides the core of the Faultline SDK, which can be used to
//! capture events, track release health and deliver both to an ingestion
//! endpoint.
//!
//! `faultline-core` is meant for integration authors and transport
//! implementors. Applications should instead use the `faultline` crate, which
//! comes with a default HTTP transport and environment based configuration.
//!
//! # Core Concepts
//!
//! The crate is centered around the concepts of [`Client`], [`Hub`] and
//! [`Scope`], as well as the extension points via the [`Transport`] and
//! [`TransportFactory`] traits.
//!
//! # Parallelism, Concurrency and Async
//!
//! The main concurrency primitive is the [`Hub`]. Every thread gets its own
//! hub lazily, derived from the process-wide main hub. Code that runs
//! logically concurrent executions on shared threads (async tasks, request
//! handlers) needs to give every execution its own hub so pushed scopes stay
//! isolated:
//!
//! * for spawned threads or rayon-style parallelism, create a hub with
//!   [`Hub::new_from_top`] and enter it with [`Hub::run`];
//! * for futures, bind a hub with [`HubFutureExt::bind_hub`], which re-enters
//!   the hub around every poll.
//!
//! **Degraded mode**: executions that do neither share their worker thread's
//! hub. Pushed scopes then leak between logically concurrent executions.
//! This mode is deliberate and observable, not an error, but it forfeits the
//! per-execution isolation guarantee.
#![warn(missing_docs)]

// macros; these need to be first to be used by other modules
#[macro_use]
mod macros;

mod api;
mod breadcrumbs;
mod client;
mod clientoptions;
mod constants;
mod error;
mod futures;
mod hub;
mod intodsn;
mod performance;
mod scope;
mod session;
mod stack;
mod transport;

// public api or exports from this crate
pub use crate::api::*;
pub use crate::breadcrumbs::IntoBreadcrumbs;
pub use crate::client::Client;
pub use crate::clientoptions::{BeforeCallback, ClientOptions};
pub use crate::error::{capture_error, event_from_error, parse_type_from_debug};
pub use crate::futures::{HubFuture, HubFutureExt};
pub use crate::hub::{Hub, ScopeGuard};
pub use crate::intodsn::IntoDsn;
pub use crate::performance::{
    start_transaction, Span, Transaction, TransactionContext, TransactionOrSpan,
};
pub use crate::scope::{EventProcessor, Scope};
pub use crate::transport::{Delivery, DeliverySlot, SendOutcome, Transport, TransportFactory};

// test utilities
#[cfg(feature = "test")]
pub mod test;

// public api from other crates
#[doc(inline)]
pub use faultline_types as types;
pub use faultline_types::protocol::latest as protocol;
pub use faultline_types::protocol::latest::{Breadcrumb, Envelope, Level, User};
pub use faultline_types::Uuid;
