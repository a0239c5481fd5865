//! The provided transports.
//!
//! This module exposes all transports that are compiled into the crate.
//! The `reqwest` feature turns on the HTTP transport.

use std::sync::Arc;

use crate::{ClientOptions, Transport, TransportFactory};

#[cfg(feature = "httpdate")]
mod ratelimit;
#[cfg(feature = "reqwest")]
mod thread;

#[cfg(feature = "reqwest")]
mod reqwest;
#[cfg(feature = "reqwest")]
pub use self::reqwest::ReqwestHttpTransport;

#[cfg(feature = "httpdate")]
pub use ratelimit::{RateLimiter, RateLimitingCategory};

/// The default http transport.
#[cfg(feature = "reqwest")]
pub type HttpTransport = ReqwestHttpTransport;

/// Creates the default HTTP transport.
///
/// This is the default value for `transport` on the client options. It
/// creates an `HttpTransport`. If no http transport was compiled into the
/// crate it will panic on transport creation.
#[derive(Clone)]
pub struct DefaultTransportFactory;

impl TransportFactory for DefaultTransportFactory {
    fn create_transport(&self, options: &ClientOptions) -> Arc<dyn Transport> {
        #[cfg(feature = "reqwest")]
        {
            Arc::new(HttpTransport::new(options))
        }
        #[cfg(not(feature = "reqwest"))]
        {
            let _ = options;
            panic!("faultline crate was compiled without transport")
        }
    }
}
