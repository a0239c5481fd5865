use std::time::{Duration, SystemTime};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Converts a `SystemTime` object into a float unix timestamp.
pub fn datetime_to_timestamp(st: &SystemTime) -> f64 {
    match st.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(duration) => duration.as_secs_f64(),
        Err(_) => 0.0,
    }
}

/// Converts a float unix timestamp back into a `SystemTime`.
///
/// Returns `None` if the timestamp is not representable.
pub fn timestamp_to_datetime(ts: f64) -> Option<SystemTime> {
    if !ts.is_finite() || ts < 0.0 {
        return None;
    }
    SystemTime::UNIX_EPOCH.checked_add(Duration::from_secs_f64(ts))
}

/// Formats a `SystemTime` as an RFC 3339 string.
pub fn to_rfc3339(st: &SystemTime) -> String {
    st.duration_since(SystemTime::UNIX_EPOCH)
        .ok()
        .and_then(|duration| duration.try_into().ok())
        .and_then(|duration: time::Duration| OffsetDateTime::UNIX_EPOCH.checked_add(duration))
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_default()
}

/// Parses an RFC 3339 string into a `SystemTime`.
pub fn from_rfc3339(s: &str) -> Option<SystemTime> {
    let dt = OffsetDateTime::parse(s, &Rfc3339).ok()?;
    let nanos = dt.unix_timestamp_nanos();
    if nanos < 0 {
        return None;
    }
    SystemTime::UNIX_EPOCH.checked_add(Duration::from_nanos(nanos as u64))
}

/// Serde support for timestamps expressed as float unix seconds.
pub mod ts_seconds_float {
    use std::fmt;

    use serde::{de, ser};

    use super::*;

    /// Deserializes a timestamp from unix seconds or an RFC 3339 string.
    pub fn deserialize<'de, D>(d: D) -> Result<SystemTime, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        d.deserialize_any(SecondsTimestampVisitor)
    }

    /// Serializes a timestamp as unix seconds, as an integer if possible.
    pub fn serialize<S>(st: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        match st.duration_since(SystemTime::UNIX_EPOCH) {
            Ok(duration) => {
                if duration.subsec_nanos() == 0 {
                    serializer.serialize_u64(duration.as_secs())
                } else {
                    serializer.serialize_f64(duration.as_secs_f64())
                }
            }
            Err(_) => Err(ser::Error::custom(format!(
                "invalid `SystemTime` instance: {st:?}"
            ))),
        }
    }

    /// Serde support for optional float unix second timestamps.
    pub mod option {
        use super::*;

        /// Deserializes an optional unix timestamp.
        pub fn deserialize<'de, D>(d: D) -> Result<Option<SystemTime>, D::Error>
        where
            D: de::Deserializer<'de>,
        {
            Ok(Some(super::deserialize(d)?))
        }

        /// Serializes an optional unix timestamp.
        pub fn serialize<S>(st: &Option<SystemTime>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: ser::Serializer,
        {
            match st {
                Some(st) => super::serialize(st, serializer),
                None => serializer.serialize_none(),
            }
        }
    }

    struct SecondsTimestampVisitor;

    impl de::Visitor<'_> for SecondsTimestampVisitor {
        type Value = SystemTime;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "a unix timestamp")
        }

        fn visit_f64<E>(self, value: f64) -> Result<SystemTime, E>
        where
            E: de::Error,
        {
            timestamp_to_datetime(value)
                .ok_or_else(|| E::custom(format!("invalid timestamp: {value}")))
        }

        fn visit_i64<E>(self, value: i64) -> Result<SystemTime, E>
        where
            E: de::Error,
        {
            let value = u64::try_from(value).map_err(|e| E::custom(e.to_string()))?;
            self.visit_u64(value)
        }

        fn visit_u64<E>(self, value: u64) -> Result<SystemTime, E>
        where
            E: de::Error,
        {
            SystemTime::UNIX_EPOCH
                .checked_add(Duration::from_secs(value))
                .ok_or_else(|| E::custom(format!("invalid timestamp: {value}")))
        }

        fn visit_str<E>(self, value: &str) -> Result<SystemTime, E>
        where
            E: de::Error,
        {
            from_rfc3339(value).ok_or_else(|| E::custom(format!("invalid timestamp: {value}")))
        }
    }
}

/// Serde support for timestamps expressed as RFC 3339 strings.
pub mod ts_rfc3339 {
    use std::fmt;

    use serde::{de, ser};

    use super::*;

    /// Deserializes a timestamp from an RFC 3339 string or unix seconds.
    pub fn deserialize<'de, D>(d: D) -> Result<SystemTime, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        d.deserialize_any(Rfc3339TimestampVisitor)
    }

    /// Serializes a timestamp as an RFC 3339 string.
    pub fn serialize<S>(st: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        serializer.serialize_str(&to_rfc3339(st))
    }

    struct Rfc3339TimestampVisitor;

    impl de::Visitor<'_> for Rfc3339TimestampVisitor {
        type Value = SystemTime;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "an RFC 3339 timestamp")
        }

        fn visit_str<E>(self, value: &str) -> Result<SystemTime, E>
        where
            E: de::Error,
        {
            from_rfc3339(value).ok_or_else(|| E::custom(format!("invalid timestamp: {value}")))
        }

        fn visit_f64<E>(self, value: f64) -> Result<SystemTime, E>
        where
            E: de::Error,
        {
            timestamp_to_datetime(value)
                .ok_or_else(|| E::custom(format!("invalid timestamp: {value}")))
        }

        fn visit_u64<E>(self, value: u64) -> Result<SystemTime, E>
        where
            E: de::Error,
        {
            self.visit_f64(value as f64)
        }
    }

    /// Serde support for optional RFC 3339 timestamps.
    pub mod option {
        use super::*;

        /// Deserializes an optional RFC 3339 timestamp.
        pub fn deserialize<'de, D>(d: D) -> Result<Option<SystemTime>, D::Error>
        where
            D: de::Deserializer<'de>,
        {
            Ok(Some(super::deserialize(d)?))
        }

        /// Serializes an optional RFC 3339 timestamp.
        pub fn serialize<S>(st: &Option<SystemTime>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: ser::Serializer,
        {
            match st {
                Some(st) => super::serialize(st, serializer),
                None => serializer.serialize_none(),
            }
        }
    }
}
