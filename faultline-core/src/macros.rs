/// Returns the intended release for the client as an `Option<Cow<'static, str>>`.
///
/// This can be used with `ClientOptions` to set the release name. It uses
/// the information supplied by cargo to calculate a release.
///
/// # Examples
///
/// ```
/// # use faultline_core as faultline;
/// let _options = faultline::ClientOptions {
///     release: faultline::release_name!(),
///     ..Default::default()
/// };
/// ```
#[macro_export]
macro_rules! release_name {
    () => {{
        option_env!("CARGO_PKG_NAME").and_then(|name| {
            option_env!("CARGO_PKG_VERSION").map(|version| {
                ::std::borrow::Cow::Owned(format!("{}@{}", name, version))
            })
        })
    }};
}

// Writes diagnostics to stderr when the currently bound client runs in debug
// mode. Telemetry must never raise towards the host application, so all
// internal failures funnel through here.
#[macro_export]
#[doc(hidden)]
macro_rules! faultline_debug {
    ($($arg:tt)*) => {
        $crate::Hub::with(|hub| {
            if hub.client().map_or(false, |c| c.options().debug) {
                eprint!("[faultline] ");
                eprintln!($($arg)*);
            }
        });
    }
}
