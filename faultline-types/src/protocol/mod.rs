//! This module exposes the types for the Faultline protocol in different versions.

#[cfg(feature = "protocol")]
pub mod envelope;
#[cfg(feature = "protocol")]
pub mod session;
#[cfg(feature = "protocol")]
pub mod v1;

/// The latest version of the protocol.
pub const LATEST: u16 = 1;

/// The always latest protocol version.
#[cfg(feature = "protocol")]
pub mod latest {
    pub use super::envelope::*;
    pub use super::session::*;
    pub use super::v1::*;
}
