use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::constants::USER_AGENT;
use crate::protocol::{Breadcrumb, Event, Transaction};
use crate::types::Dsn;
use crate::{IntoDsn, TransportFactory};

/// Type alias for before event/breadcrumb handlers.
pub type BeforeCallback<T> = Arc<dyn Fn(T) -> Option<T> + Send + Sync>;

/// Configuration settings for the client.
///
/// # Examples
///
/// ```
/// # use faultline_core as faultline;
/// let _options = faultline::ClientOptions {
///     debug: true,
///     ..Default::default()
/// };
/// ```
#[derive(Clone)]
pub struct ClientOptions {
    // Common options
    /// The DSN to use. If not set the client is effectively disabled.
    pub dsn: Option<Dsn>,
    /// Enables debug mode.
    ///
    /// In debug mode debug information is printed to stderr to help you
    /// understand what the SDK is doing.
    pub debug: bool,
    /// The release to be sent with events.
    pub release: Option<Cow<'static, str>>,
    /// The environment to be sent with events.
    pub environment: Option<Cow<'static, str>>,
    /// The sample rate for event submission. (0.0 - 1.0, defaults to 1.0)
    pub sample_rate: f32,
    /// The sample rate for tracing transactions. (0.0 - 1.0, defaults to 0.0)
    pub traces_sample_rate: f32,
    /// Maximum number of breadcrumbs a scope holds. (defaults to 100)
    pub max_breadcrumbs: usize,
    /// The server name to be reported.
    pub server_name: Option<Cow<'static, str>>,
    // Hooks
    /// Callback that is executed before event sending.
    pub before_send: Option<BeforeCallback<Event>>,
    /// Callback that is executed before a transaction is sent.
    pub before_send_transaction: Option<BeforeCallback<Transaction>>,
    /// Callback that is executed for each breadcrumb being added.
    pub before_breadcrumb: Option<BeforeCallback<Breadcrumb>>,
    // Transport options
    /// The transport to use.
    ///
    /// This is typically either a boxed function taking the client options by
    /// reference and returning a `Transport`, or the `DefaultTransportFactory`
    /// of the `faultline` crate.
    pub transport: Option<Arc<dyn TransportFactory>>,
    /// Maximum number of envelopes the transport keeps in flight before it
    /// starts shedding. (defaults to 30)
    pub max_queue_size: usize,
    /// Connect plus overall timeout for a single delivery attempt.
    /// (defaults to 5 seconds)
    pub http_timeout: Duration,
    /// An optional HTTP proxy to use.
    ///
    /// This will default to the `http_proxy` environment variable.
    pub http_proxy: Option<Cow<'static, str>>,
    /// An optional HTTPS proxy to use.
    ///
    /// This will default to the `HTTPS_PROXY` environment variable
    /// or `http_proxy` if that one exists.
    pub https_proxy: Option<Cow<'static, str>>,
    /// The timeout on client drop for draining events on shutdown.
    /// (defaults to 2 seconds)
    pub shutdown_timeout: Duration,
    // Other options
    /// Enable release health session tracking at `init` time.
    ///
    /// When enabled, a session is started when the client is bound and closed
    /// when it shuts down.
    pub auto_session_tracking: bool,
    /// The user agent that should be reported.
    pub user_agent: Cow<'static, str>,
}

impl ClientOptions {
    /// Creates new options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates new options and immediately configures them.
    pub fn configure<F>(f: F) -> Self
    where
        F: FnOnce(&mut ClientOptions) -> &mut ClientOptions,
    {
        let mut opts = Self::new();
        f(&mut opts);
        opts
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[derive(Debug)]
        struct BeforeSendSet(bool);
        #[derive(Debug)]
        struct BeforeSendTransactionSet(bool);
        #[derive(Debug)]
        struct BeforeBreadcrumbSet(bool);
        #[derive(Debug)]
        struct TransportFactorySet(bool);

        f.debug_struct("ClientOptions")
            .field("dsn", &self.dsn)
            .field("debug", &self.debug)
            .field("release", &self.release)
            .field("environment", &self.environment)
            .field("sample_rate", &self.sample_rate)
            .field("traces_sample_rate", &self.traces_sample_rate)
            .field("max_breadcrumbs", &self.max_breadcrumbs)
            .field("server_name", &self.server_name)
            .field("before_send", &BeforeSendSet(self.before_send.is_some()))
            .field(
                "before_send_transaction",
                &BeforeSendTransactionSet(self.before_send_transaction.is_some()),
            )
            .field(
                "before_breadcrumb",
                &BeforeBreadcrumbSet(self.before_breadcrumb.is_some()),
            )
            .field("transport", &TransportFactorySet(self.transport.is_some()))
            .field("max_queue_size", &self.max_queue_size)
            .field("http_timeout", &self.http_timeout)
            .field("http_proxy", &self.http_proxy)
            .field("https_proxy", &self.https_proxy)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("auto_session_tracking", &self.auto_session_tracking)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl Default for ClientOptions {
    fn default() -> ClientOptions {
        ClientOptions {
            dsn: None,
            debug: false,
            release: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.0,
            max_breadcrumbs: 100,
            server_name: None,
            before_send: None,
            before_send_transaction: None,
            before_breadcrumb: None,
            transport: None,
            max_queue_size: 30,
            http_timeout: Duration::from_secs(5),
            http_proxy: None,
            https_proxy: None,
            shutdown_timeout: Duration::from_secs(2),
            auto_session_tracking: false,
            user_agent: Cow::Borrowed(USER_AGENT),
        }
    }
}

impl<T: IntoDsn> From<(T, ClientOptions)> for ClientOptions {
    fn from((into_dsn, mut opts): (T, ClientOptions)) -> ClientOptions {
        opts.dsn = into_dsn.into_dsn().expect("invalid value for DSN");
        opts
    }
}

impl<T: IntoDsn> From<T> for ClientOptions {
    fn from(into_dsn: T) -> ClientOptions {
        ClientOptions {
            dsn: into_dsn.into_dsn().expect("invalid value for DSN"),
            ..ClientOptions::default()
        }
    }
}
