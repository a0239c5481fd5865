//! The current latest faultline protocol version.
//!
//! These types map directly onto the JSON payloads understood by the
//! ingestion endpoint.

use std::fmt;
use std::str;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::ts_seconds_float;

/// An arbitrary JSON value.
pub use serde_json::Value;

/// The type used for maps in the protocol.
pub type Map<K, V> = std::collections::BTreeMap<K, V>;

/// Represents the severity of an event or breadcrumb.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Indicates very spammy debug information.
    Debug,
    /// Informational messages.
    Info,
    /// A warning.
    Warning,
    /// An error.
    #[default]
    Error,
    /// Similar to an error but indicates a critical event that usually causes a shutdown.
    Fatal,
}

impl str::FromStr for Level {
    type Err = String;

    fn from_str(string: &str) -> Result<Level, Self::Err> {
        Ok(match string {
            "debug" => Level::Debug,
            "info" | "log" => Level::Info,
            "warning" => Level::Warning,
            "error" => Level::Error,
            "fatal" | "critical" => Level::Fatal,
            other => return Err(format!("invalid level: {other}")),
        })
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Level::Debug => write!(f, "debug"),
            Level::Info => write!(f, "info"),
            Level::Warning => write!(f, "warning"),
            Level::Error => write!(f, "error"),
            Level::Fatal => write!(f, "fatal"),
        }
    }
}

/// A wrapper around a plain `Vec` matching the `{"values": […]}` wire shape.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Values<T> {
    /// The values of the collection.
    pub values: Vec<T>,
}

impl<T> Values<T> {
    /// Creates an empty values struct.
    pub fn new() -> Values<T> {
        Values { values: Vec::new() }
    }

    /// Checks whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl<T> From<Vec<T>> for Values<T> {
    fn from(values: Vec<T>) -> Values<T> {
        Values { values }
    }
}

impl<T> std::ops::Deref for Values<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Self::Target {
        &self.values
    }
}

impl<T> std::ops::DerefMut for Values<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.values
    }
}

impl<'a, T> IntoIterator for &'a Values<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Represents user data.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The ID of the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The email address of the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// The remote ip address of the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// A human readable username of the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Additional arbitrary fields for forwards compatibility.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Represents a single breadcrumb.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Breadcrumb {
    /// The timestamp of the breadcrumb.
    #[serde(default = "SystemTime::now", with = "ts_seconds_float")]
    pub timestamp: SystemTime,
    /// The type of the breadcrumb.
    #[serde(rename = "type", default = "default_breadcrumb_type")]
    pub ty: String,
    /// The optional category of the breadcrumb.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// The non optional level of the breadcrumb. It defaults to info.
    #[serde(default = "default_breadcrumb_level")]
    pub level: Level,
    /// An optional human readable message for the breadcrumb.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Arbitrary breadcrumb data that should be sent along.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
}

fn default_breadcrumb_type() -> String {
    "default".into()
}

fn default_breadcrumb_level() -> Level {
    Level::Info
}

impl Default for Breadcrumb {
    fn default() -> Breadcrumb {
        Breadcrumb {
            timestamp: SystemTime::now(),
            ty: default_breadcrumb_type(),
            category: None,
            level: default_breadcrumb_level(),
            message: None,
            data: Map::new(),
        }
    }
}

/// The mechanism by which an exception was captured.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Mechanism {
    /// The mechanism type identifier.
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub ty: String,
    /// An optional flag indicating whether the exception was handled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handled: Option<bool>,
}

/// Represents a single exception.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Exception {
    /// The type of the exception.
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub ty: String,
    /// The optional value of the exception.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// An optional module for this exception.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// The mechanism of the exception including a flag indicating whether
    /// the exception was handled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mechanism: Option<Mechanism>,
}

/// Holds the identifier for a Span.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct SpanId([u8; 8]);

impl Default for SpanId {
    fn default() -> Self {
        let mut buf = [0; 8];
        getrandom::getrandom(&mut buf)
            .unwrap_or_else(|err| panic!("could not retrieve random bytes for SpanId: {err}"));
        Self(buf)
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", hex::encode(self.0))
    }
}

impl From<SpanId> for String {
    fn from(span_id: SpanId) -> Self {
        span_id.to_string()
    }
}

impl str::FromStr for SpanId {
    type Err = hex::FromHexError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut buf = [0; 8];
        hex::decode_to_slice(input, &mut buf)?;
        Ok(Self(buf))
    }
}

impl TryFrom<String> for SpanId {
    type Error = hex::FromHexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Holds the identifier for a Trace.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct TraceId([u8; 16]);

impl Default for TraceId {
    fn default() -> Self {
        let mut buf = [0; 16];
        getrandom::getrandom(&mut buf)
            .unwrap_or_else(|err| panic!("could not retrieve random bytes for TraceId: {err}"));
        Self(buf)
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", hex::encode(self.0))
    }
}

impl From<TraceId> for String {
    fn from(trace_id: TraceId) -> Self {
        trace_id.to_string()
    }
}

impl str::FromStr for TraceId {
    type Err = hex::FromHexError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut buf = [0; 16];
        hex::decode_to_slice(input, &mut buf)?;
        Ok(Self(buf))
    }
}

impl TryFrom<String> for TraceId {
    type Error = hex::FromHexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Describes the status of a span or transaction.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SpanStatus {
    /// The operation completed successfully.
    Ok,
    /// The operation was cancelled, typically by the caller.
    Cancelled,
    /// The operation included an invalid argument.
    InvalidArgument,
    /// The deadline expired before the operation could complete.
    DeadlineExceeded,
    /// Some requested entity was not found.
    NotFound,
    /// The caller does not have permission to execute the operation.
    PermissionDenied,
    /// Some resource has been exhausted.
    ResourceExhausted,
    /// The operation is not implemented or supported.
    Unimplemented,
    /// The service is currently unavailable.
    Unavailable,
    /// An internal error occurred.
    InternalError,
    /// The operation was aborted.
    Aborted,
    /// An unknown error occurred.
    UnknownError,
}

/// Holds information about the trace a payload belongs to.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TraceContext {
    /// The ID of the span this context describes.
    #[serde(default)]
    pub span_id: SpanId,
    /// Determines which trace the payload belongs to.
    #[serde(default)]
    pub trace_id: TraceId,
    /// Determines the parent of this span if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<SpanId>,
    /// Short code identifying the type of operation the span is measuring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    /// Human readable detail description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Describes the status of the span.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SpanStatus>,
}

/// A well-known context attached to an event.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Context {
    /// Trace data wiring the event into a distributed trace.
    Trace(Box<TraceContext>),
}

impl From<TraceContext> for Context {
    fn from(trace: TraceContext) -> Context {
        Context::Trace(Box::new(trace))
    }
}

/// An individual span of a transaction.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Span {
    /// The ID of the span.
    #[serde(default)]
    pub span_id: SpanId,
    /// Determines which trace the span belongs to.
    #[serde(default)]
    pub trace_id: TraceId,
    /// Determines the parent of this span if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<SpanId>,
    /// Short code identifying the type of operation the span is measuring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    /// Longer description of the span's operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The timestamp at the measuring of the span finished.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "ts_seconds_float::option")]
    pub timestamp: Option<SystemTime>,
    /// The timestamp at the measuring of the span started.
    #[serde(default = "SystemTime::now", with = "ts_seconds_float")]
    pub start_timestamp: SystemTime,
    /// Describes the status of the span.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SpanStatus>,
    /// Optional tags to be attached to the span.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub tags: Map<String, String>,
    /// Optional extra information to be sent with the span.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
}

impl Default for Span {
    fn default() -> Span {
        Span {
            span_id: Default::default(),
            trace_id: Default::default(),
            parent_span_id: None,
            op: None,
            description: None,
            timestamp: None,
            start_timestamp: SystemTime::now(),
            status: None,
            tags: Map::new(),
            data: Map::new(),
        }
    }
}

/// Represents a performance monitoring transaction.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Transaction {
    /// The ID of the transaction.
    #[serde(default = "crate::random_uuid")]
    pub event_id: Uuid,
    /// The name of the transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// A release identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    /// An environment identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Optional tags to be attached to the transaction.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub tags: Map<String, String>,
    /// SDK metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk: Option<ClientSdkInfo>,
    /// A platform identifier for this transaction.
    #[serde(default = "default_platform")]
    pub platform: String,
    /// The timestamp at which the transaction finished.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "ts_seconds_float::option")]
    pub timestamp: Option<SystemTime>,
    /// The timestamp at which the transaction started.
    #[serde(default = "SystemTime::now", with = "ts_seconds_float")]
    pub start_timestamp: SystemTime,
    /// The collection of finished spans part of this transaction.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spans: Vec<Span>,
    /// The contexts of the transaction, in particular its trace context.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub contexts: Map<String, Context>,
}

impl Default for Transaction {
    fn default() -> Transaction {
        Transaction {
            event_id: crate::random_uuid(),
            name: None,
            release: None,
            environment: None,
            tags: Map::new(),
            sdk: None,
            platform: default_platform(),
            timestamp: None,
            start_timestamp: SystemTime::now(),
            spans: Vec::new(),
            contexts: Map::new(),
        }
    }
}

/// The SDK Interface describes the client that is sending the payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientSdkInfo {
    /// The name of the SDK.
    pub name: String,
    /// The version of the SDK.
    pub version: String,
    /// A list of integrations with the platform or a framework that were
    /// activated.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub integrations: Vec<String>,
}

fn default_platform() -> String {
    "other".into()
}

fn default_fingerprint() -> Vec<String> {
    vec!["{{ default }}".into()]
}

fn is_default_fingerprint(fingerprint: &[String]) -> bool {
    fingerprint.len() == 1 && (fingerprint[0] == "{{ default }}" || fingerprint[0] == "{{default}}")
}

/// Represents a full event for the ingestion endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Event {
    /// The ID of the event.
    #[serde(default = "crate::random_uuid")]
    pub event_id: Uuid,
    /// The level of the event.
    #[serde(default)]
    pub level: Level,
    /// An optional fingerprint configuration to override the default.
    #[serde(default = "default_fingerprint", skip_serializing_if = "is_default_fingerprint")]
    pub fingerprint: Vec<String>,
    /// A message to be sent with the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// A platform identifier for this event.
    #[serde(default = "default_platform")]
    pub platform: String,
    /// The timestamp of when the event was created.
    #[serde(default = "SystemTime::now", with = "ts_seconds_float")]
    pub timestamp: SystemTime,
    /// An optional server name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    /// A release identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    /// An environment identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Optionally user data to be sent along.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// One or multiple chained (nested) exceptions.
    #[serde(default, skip_serializing_if = "Values::is_empty")]
    pub exception: Values<Exception>,
    /// List of breadcrumbs to send along.
    #[serde(default, skip_serializing_if = "Values::is_empty")]
    pub breadcrumbs: Values<Breadcrumb>,
    /// Optional tags to be attached to the event.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub tags: Map<String, String>,
    /// Optional extra information to be sent with the event.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
    /// An optional transaction name for this event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    /// The contexts of the event, such as its trace context.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub contexts: Map<String, Context>,
    /// SDK metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk: Option<ClientSdkInfo>,
    /// A logger identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
}

impl Default for Event {
    fn default() -> Event {
        Event {
            event_id: crate::random_uuid(),
            level: Level::default(),
            fingerprint: default_fingerprint(),
            message: None,
            platform: default_platform(),
            timestamp: SystemTime::now(),
            server_name: None,
            release: None,
            environment: None,
            user: None,
            exception: Values::new(),
            breadcrumbs: Values::new(),
            tags: Map::new(),
            extra: Map::new(),
            transaction: None,
            contexts: Map::new(),
            sdk: None,
            logger: None,
        }
    }
}

impl Event {
    /// Creates a new event with a random ID and the current timestamp.
    pub fn new() -> Event {
        Default::default()
    }

    /// Returns whether the default fingerprint is in use.
    pub fn has_default_fingerprint(&self) -> bool {
        is_default_fingerprint(&self.fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Fatal > Level::Error);
        assert!(Level::Error > Level::Warning);
        assert!("warning".parse::<Level>().unwrap() == Level::Warning);
    }

    #[test]
    fn test_event_serialization_defaults() {
        let event = Event {
            message: Some("Hello World!".into()),
            ..Default::default()
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["message"], "Hello World!");
        assert_eq!(value["level"], "error");
        assert_eq!(value["platform"], "other");
        // the default fingerprint is omitted on the wire
        assert!(value.get("fingerprint").is_none());
    }

    #[test]
    fn test_span_id_roundtrip() {
        let id: SpanId = "d42cd9d3de25b951".parse().unwrap();
        assert_eq!(id.to_string(), "d42cd9d3de25b951");
        assert!("not-hex!".parse::<SpanId>().is_err());
    }

    #[test]
    fn test_trace_context_wire_shape() {
        let context = Context::from(TraceContext::default());
        let value = serde_json::to_value(&context).unwrap();
        assert_eq!(value["type"], "trace");
    }
}
