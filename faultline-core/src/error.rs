use std::error::Error;

use crate::protocol::{Event, Exception, Level};
use crate::types::Uuid;
use crate::Hub;

/// Captures a `std::error::Error` on the currently active hub.
///
/// The whole source chain of the error is captured as a chain of exceptions,
/// innermost first. The return value is the event id; in case the SDK is
/// disabled the nil id is returned.
///
/// # Examples
///
/// ```
/// # use faultline_core as faultline;
/// let err = std::io::Error::new(std::io::ErrorKind::Other, "unrelated file is corrupt");
/// faultline::capture_error(&err);
/// ```
pub fn capture_error<E: Error + ?Sized>(error: &E) -> Uuid {
    Hub::with_active(|hub| hub.capture_error(error))
}

/// Creates an event from a `std::error::Error`.
///
/// The event includes the error and all its sources as chained exceptions,
/// ordered from the root cause to the outermost error.
pub fn event_from_error<E: Error + ?Sized>(err: &E) -> Event {
    let mut exceptions = vec![exception_from_error(err)];

    let mut source = err.source();
    while let Some(err) = source {
        exceptions.push(exception_from_error(err));
        source = err.source();
    }

    exceptions.reverse();
    Event {
        exception: exceptions.into(),
        level: Level::Error,
        ..Default::default()
    }
}

fn exception_from_error<E: Error + ?Sized>(err: &E) -> Exception {
    let dbg = format!("{err:?}");
    let value = err.to_string();

    // `Debug` usually reveals the type name of an error; fall back to the
    // display representation when it does not look like one.
    let ty = parse_type_from_debug(&dbg);
    let ty = if ty.chars().all(|c| c.is_alphanumeric() || c == ':' || c == '_') && !ty.is_empty() {
        ty.to_owned()
    } else {
        "Error".to_owned()
    };

    Exception {
        ty,
        value: Some(value),
        ..Default::default()
    }
}

/// Parses the types name out of a `Debug` representation.
pub fn parse_type_from_debug(d: &str) -> &str {
    d.split(&['(', '{', '[', ' '][..])
        .next()
        .unwrap_or("Error")
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("inner quota exceeded")]
    struct QuotaExceeded;

    #[derive(Debug, thiserror::Error)]
    #[error("upload failed")]
    struct UploadFailed(#[source] QuotaExceeded);

    #[test]
    fn test_parse_type_from_debug() {
        assert_eq!(parse_type_from_debug("UploadFailed(QuotaExceeded)"), "UploadFailed");
        assert_eq!(parse_type_from_debug("Os { code: 2 }"), "Os");
        assert_eq!(parse_type_from_debug("QuotaExceeded"), "QuotaExceeded");
    }

    #[test]
    fn test_event_from_error_chains_sources() {
        let event = event_from_error(&UploadFailed(QuotaExceeded));
        assert_eq!(event.exception.len(), 2);
        // root cause first
        assert_eq!(event.exception.values[0].ty, "QuotaExceeded");
        assert_eq!(event.exception.values[1].ty, "UploadFailed");
        assert_eq!(
            event.exception.values[1].value.as_deref(),
            Some("upload failed")
        );
    }
}
