use std::sync::Arc;

use faultline_core::faultline_debug;

use crate::defaults::apply_defaults;
use crate::{Client, ClientOptions, Hub};

/// Helper struct that is returned from [`init`].
///
/// When this is dropped, the client flushes any buffered envelopes with the
/// configured shutdown timeout and shuts the transport down.
#[must_use = "when the init guard is dropped the transport will be shut down and no further \
              events can be sent. If you do want to ignore this use mem::forget on it."]
pub struct ClientInitGuard(Arc<Client>);

impl std::ops::Deref for ClientInitGuard {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl ClientInitGuard {
    /// Quick check if the client is enabled.
    pub fn is_enabled(&self) -> bool {
        self.0.is_enabled()
    }
}

impl Drop for ClientInitGuard {
    fn drop(&mut self) {
        if self.0.options().auto_session_tracking {
            crate::end_session();
        }
        if self.is_enabled() {
            faultline_debug!("dropping client guard -> disposing client");
        } else {
            faultline_debug!("dropping client guard (no client to dispose)");
        }
        self.0.close(None);
    }
}

/// Creates the client for a given configuration and binds it.
///
/// This returns an init guard that must be kept in scope; when the guard is
/// dropped the transport is drained and shut down, and no further events can
/// be sent. If you don't want (or can't) keep the guard around, it's
/// permissible to call `mem::forget` on it.
///
/// Options not explicitly configured fall back to the environment, see
/// [`apply_defaults`](crate::apply_defaults).
///
/// # Examples
///
/// ```
/// let _guard = faultline::init("https://key@ingest.faultline.dev/1234");
/// ```
///
/// Or if draining on shutdown should be ignored:
///
/// ```
/// std::mem::forget(faultline::init("https://key@ingest.faultline.dev/1234"));
/// ```
pub fn init<C: Into<ClientOptions>>(opts: C) -> ClientInitGuard {
    let opts = apply_defaults(opts.into());
    let auto_session_tracking = opts.auto_session_tracking;
    let client = Arc::new(Client::from_config(opts));

    Hub::with(|hub| hub.bind_client(Some(client.clone())));
    if let Some(dsn) = client.dsn() {
        faultline_debug!("enabled client for DSN {}", dsn);
    } else {
        faultline_debug!("initialized disabled client due to disabled or invalid DSN");
    }

    if auto_session_tracking {
        crate::start_session();
    }

    ClientInitGuard(client)
}
