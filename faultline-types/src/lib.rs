//! This crate provides common types for working with the Faultline protocol
//! or the Faultline ingestion endpoint. This includes types for the connection
//! string (DSN), authentication headers, project identifiers, and the protocol
//! payloads themselves.
//!
//! Most users of the Faultline SDK will not use this crate directly but
//! through the re-exports on the `faultline` crate.
#![warn(missing_docs)]

mod auth;
mod dsn;
mod project_id;
mod utils;

pub mod protocol;

pub use crate::auth::*;
pub use crate::dsn::*;
pub use crate::project_id::*;
pub use crate::utils::*;

#[doc(no_inline)]
pub use url::Url;
#[doc(no_inline)]
pub use uuid::Uuid;

/// Generates a random, non-nil event id.
pub fn random_uuid() -> Uuid {
    Uuid::new_v4()
}
