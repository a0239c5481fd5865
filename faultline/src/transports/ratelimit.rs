use std::time::{Duration, SystemTime};

use httpdate::parse_http_date;

use crate::protocol::EnvelopeItem;
use crate::Envelope;

// applied when the backend asks us to back off without a usable delay
const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

/// A utility that keeps track of backend imposed rate limits.
///
/// Deadlines are stored per payload category plus one global slot; expired
/// deadlines are simply ignored on check, there is no eager cleanup.
#[derive(Clone, Debug, Default)]
pub struct RateLimiter {
    global: Option<SystemTime>,
    error: Option<SystemTime>,
    session: Option<SystemTime>,
    transaction: Option<SystemTime>,
}

impl RateLimiter {
    /// Creates a new rate limiter with no active limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates the rate limiter with information from a `Retry-After` header.
    ///
    /// The header value may be a delay in seconds or an HTTP date. A value
    /// that parses as neither still quiets the client for a short default
    /// cooldown; the backend did ask us to back off, it just failed to say
    /// for how long.
    pub fn update_from_retry_after(&mut self, header: &str) {
        let header = header.trim();
        let new_time = if let Ok(value) = header.parse::<f64>() {
            SystemTime::now() + Duration::from_secs(value.ceil().max(0.0) as u64)
        } else if let Ok(value) = parse_http_date(header) {
            value
        } else {
            SystemTime::now() + DEFAULT_COOLDOWN
        };

        self.global = Some(new_time);
    }

    /// Updates the rate limiter from an `X-Faultline-Rate-Limits` header.
    ///
    /// The header carries comma separated groups of the form
    /// `category:seconds[:reason]`. An empty category or `all` limits every
    /// category. Unknown categories are ignored. If the header yields no
    /// valid group at all, a short default cooldown is applied instead of
    /// dropping the response on the floor.
    pub fn update_from_rate_limits(&mut self, header: &str) {
        let mut parsed_any = false;

        for group in header.split(',') {
            let group = group.trim();
            if group.is_empty() {
                continue;
            }
            let mut splits = group.split(':');
            let category = splits.next().unwrap_or("").trim();
            let seconds = match splits.next().and_then(|x| x.trim().parse::<f64>().ok()) {
                Some(seconds) if seconds >= 0.0 => seconds,
                _ => continue,
            };
            let _reason = splits.next();

            parsed_any = true;
            let new_time = Some(SystemTime::now() + Duration::from_secs(seconds.ceil() as u64));
            match category {
                "" | "all" => self.global = new_time,
                "error" => self.error = new_time,
                "transaction" => self.transaction = new_time,
                "session" => self.session = new_time,
                _ => {}
            }
        }

        if !parsed_any {
            self.global = Some(SystemTime::now() + DEFAULT_COOLDOWN);
        }
    }

    /// Queries the rate limiter for a certain category of payload.
    ///
    /// Returns the time left until sends of that category are allowed again,
    /// or `None` when the category is not currently limited.
    pub fn is_disabled(&self, category: RateLimitingCategory) -> Option<Duration> {
        if let Some(ts) = self.global {
            let time_left = ts.duration_since(SystemTime::now()).ok();
            if time_left.is_some() {
                return time_left;
            }
        }
        let time_left = match category {
            RateLimitingCategory::Any => self.global,
            RateLimitingCategory::Error => self.error,
            RateLimitingCategory::Session => self.session,
            RateLimitingCategory::Transaction => self.transaction,
        }?;
        time_left.duration_since(SystemTime::now()).ok()
    }

    /// Queries the rate limiter for a whole envelope.
    ///
    /// Returns the longest remaining deadline if every item of the envelope
    /// is currently limited; sending it would be pure futile work.
    pub fn is_envelope_disabled(&self, envelope: &Envelope) -> Option<Duration> {
        let mut worst: Option<Duration> = None;
        for item in envelope.items() {
            let time_left = self.is_disabled(RateLimitingCategory::from(item))?;
            worst = Some(worst.map_or(time_left, |worst| worst.max(time_left)));
        }
        worst
    }

    /// Removes limited items from an envelope.
    ///
    /// Returns `None` if no items remain.
    pub fn filter_envelope(&self, envelope: Envelope) -> Option<Envelope> {
        envelope.filter(|item| self.is_disabled(RateLimitingCategory::from(item)).is_none())
    }
}

/// The category of payload that a rate limit refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitingCategory {
    /// Rate limit for any kind of payload.
    Any,
    /// Rate limit pertaining to errors.
    Error,
    /// Rate limit pertaining to sessions.
    Session,
    /// Rate limit pertaining to transactions.
    Transaction,
}

impl From<&EnvelopeItem> for RateLimitingCategory {
    fn from(item: &EnvelopeItem) -> Self {
        match item {
            EnvelopeItem::Event(_) => RateLimitingCategory::Error,
            EnvelopeItem::Transaction(_) => RateLimitingCategory::Transaction,
            EnvelopeItem::SessionUpdate(_) => RateLimitingCategory::Session,
            _ => RateLimitingCategory::Any,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Event, SessionAttributes, SessionStatus, SessionUpdate};

    #[test]
    fn test_rate_limits_header() {
        let mut rl = RateLimiter::new();
        rl.update_from_rate_limits("error:120:quota, session:60");

        assert!(rl.is_disabled(RateLimitingCategory::Error).unwrap() <= Duration::from_secs(120));
        assert!(rl.is_disabled(RateLimitingCategory::Session).unwrap() <= Duration::from_secs(60));
        assert!(rl.is_disabled(RateLimitingCategory::Transaction).is_none());
        assert!(rl.is_disabled(RateLimitingCategory::Any).is_none());

        rl.update_from_rate_limits("all:30:spike, unknown_thing:120");

        assert!(
            rl.is_disabled(RateLimitingCategory::Transaction).unwrap() <= Duration::from_secs(30)
        );
        assert!(rl.is_disabled(RateLimitingCategory::Any).unwrap() <= Duration::from_secs(30));
    }

    #[test]
    fn test_empty_category_limits_everything() {
        let mut rl = RateLimiter::new();
        rl.update_from_rate_limits(":42");
        assert!(rl.is_disabled(RateLimitingCategory::Error).unwrap() <= Duration::from_secs(42));
        assert!(rl.is_disabled(RateLimitingCategory::Any).unwrap() <= Duration::from_secs(42));
    }

    #[test]
    fn test_unknown_category_alone_sets_no_limit() {
        let mut rl = RateLimiter::new();
        rl.update_from_rate_limits("profile:3600");
        assert!(rl.is_disabled(RateLimitingCategory::Any).is_none());
        assert!(rl.is_disabled(RateLimitingCategory::Error).is_none());
    }

    #[test]
    fn test_malformed_header_falls_back_to_cooldown() {
        let mut rl = RateLimiter::new();
        rl.update_from_rate_limits("total garbage");
        let left = rl.is_disabled(RateLimitingCategory::Any).unwrap();
        assert!(left <= Duration::from_secs(60));
    }

    #[test]
    fn test_retry_after() {
        let mut rl = RateLimiter::new();
        rl.update_from_retry_after("60");

        assert!(rl.is_disabled(RateLimitingCategory::Error).unwrap() <= Duration::from_secs(60));
        assert!(rl.is_disabled(RateLimitingCategory::Session).unwrap() <= Duration::from_secs(60));
        assert!(rl.is_disabled(RateLimitingCategory::Any).unwrap() <= Duration::from_secs(60));
    }

    #[test]
    fn test_malformed_retry_after_falls_back_to_cooldown() {
        let mut rl = RateLimiter::new();
        rl.update_from_retry_after("soon-ish");
        assert!(rl.is_disabled(RateLimitingCategory::Any).unwrap() <= Duration::from_secs(60));
    }

    #[test]
    fn test_expired_limits_are_ignored() {
        let mut rl = RateLimiter::new();
        rl.update_from_rate_limits("error:0");
        std::thread::sleep(Duration::from_millis(10));
        assert!(rl.is_disabled(RateLimitingCategory::Error).is_none());
    }

    fn session_update() -> SessionUpdate {
        SessionUpdate {
            session_id: crate::types::random_uuid(),
            distinct_id: None,
            sequence: None,
            timestamp: None,
            started: SystemTime::now(),
            init: true,
            duration: None,
            status: SessionStatus::Ok,
            errors: 0,
            attributes: SessionAttributes {
                release: "app@1.0.0".into(),
                environment: None,
                ip_address: None,
                user_agent: None,
            },
        }
    }

    #[test]
    fn test_filter_envelope_drops_limited_items() {
        let mut rl = RateLimiter::new();
        rl.update_from_rate_limits("session:60");

        let mut envelope = Envelope::from(Event::new());
        envelope.add_item(session_update());
        assert!(rl.is_envelope_disabled(&envelope).is_none());

        let filtered = rl.filter_envelope(envelope).unwrap();
        assert_eq!(filtered.items().count(), 1);

        let sessions_only = Envelope::from(session_update());
        assert!(rl.is_envelope_disabled(&sessions_only).is_some());
        assert!(rl.filter_envelope(sessions_only).is_none());
    }
}
