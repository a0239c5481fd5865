use std::borrow::Cow;
use std::env;
use std::sync::Arc;

use crate::transports::DefaultTransportFactory;
use crate::types::Dsn;
use crate::ClientOptions;

/// Applies the default options to an options value.
///
/// This fills in the default transport factory and picks up configuration
/// from the environment: `FAULTLINE_DSN`, `FAULTLINE_RELEASE`,
/// `FAULTLINE_ENVIRONMENT` and the usual proxy variables. Explicitly
/// configured values always win over the environment.
pub fn apply_defaults(mut opts: ClientOptions) -> ClientOptions {
    if opts.transport.is_none() {
        opts.transport = Some(Arc::new(DefaultTransportFactory));
    }
    if opts.dsn.is_none() {
        opts.dsn = env::var("FAULTLINE_DSN")
            .ok()
            .and_then(|dsn| dsn.parse::<Dsn>().ok());
    }
    if opts.release.is_none() {
        opts.release = env::var("FAULTLINE_RELEASE").ok().map(Cow::Owned);
    }
    if opts.environment.is_none() {
        opts.environment = env::var("FAULTLINE_ENVIRONMENT")
            .ok()
            .map(Cow::Owned)
            .or_else(|| {
                Some(Cow::Borrowed(if cfg!(debug_assertions) {
                    "debug"
                } else {
                    "release"
                }))
            });
    }
    if opts.http_proxy.is_none() {
        opts.http_proxy = env::var("HTTP_PROXY")
            .ok()
            .map(Cow::Owned)
            .or_else(|| env::var("http_proxy").ok().map(Cow::Owned));
    }
    if opts.https_proxy.is_none() {
        opts.https_proxy = env::var("HTTPS_PROXY")
            .ok()
            .map(Cow::Owned)
            .or_else(|| env::var("https_proxy").ok().map(Cow::Owned))
            .or_else(|| opts.http_proxy.clone());
    }
    opts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fills_transport_and_environment() {
        let opts = apply_defaults(ClientOptions::default());
        assert!(opts.transport.is_some());
        assert!(opts.environment.is_some());
    }

    #[test]
    fn test_explicit_values_win() {
        let opts = apply_defaults(ClientOptions {
            environment: Some("staging".into()),
            ..Default::default()
        });
        assert_eq!(opts.environment.as_deref(), Some("staging"));
    }
}
