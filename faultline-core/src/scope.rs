use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use crate::performance::{TransactionOrSpan, WeakTransactionOrSpan};
use crate::protocol::{Breadcrumb, Context, Event, Level, Map, User, Value};
use crate::session::Session;

/// A function that processes an event before it is attached to an envelope.
///
/// Processors run in registration order. Returning `None` drops the event
/// and short-circuits all remaining processors.
pub type EventProcessor = dyn Fn(Event) -> Option<Event> + Send + Sync;

/// Holds contextual data for the current scope.
///
/// The scope is an object that can be cloned efficiently and stores data that
/// is locally relevant to an event, such as recorded breadcrumbs, tags and
/// the user identity. Cloning copies tags and extra data by value, while
/// breadcrumbs and event processors share their persistent spine.
///
/// The scope can be interacted with in two ways:
///
/// 1. The scope is routinely updated by functions such as `add_breadcrumb`
///    which modify the currently top-most scope.
/// 2. The topmost scope can also be configured through `configure_scope`.
#[derive(Clone, Default)]
pub struct Scope {
    pub(crate) level: Option<Level>,
    pub(crate) fingerprint: Option<Arc<Vec<String>>>,
    pub(crate) transaction: Option<Arc<String>>,
    pub(crate) breadcrumbs: im::Vector<Breadcrumb>,
    pub(crate) user: Option<Arc<User>>,
    pub(crate) extra: Map<String, Value>,
    pub(crate) tags: Map<String, String>,
    pub(crate) event_processors: im::Vector<Arc<EventProcessor>>,
    pub(crate) span: Option<WeakTransactionOrSpan>,
    pub(crate) session: Arc<Mutex<Option<Session>>>,
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("level", &self.level)
            .field("fingerprint", &self.fingerprint)
            .field("transaction", &self.transaction)
            .field("breadcrumbs", &self.breadcrumbs)
            .field("user", &self.user)
            .field("extra", &self.extra)
            .field("tags", &self.tags)
            .field("event_processors", &self.event_processors.len())
            .finish()
    }
}

impl Scope {
    /// Creates a new empty scope.
    pub fn new() -> Self {
        Default::default()
    }

    /// Clear the scope.
    ///
    /// By default a scope inherits all values from the higher scope. Calling
    /// this method wipes all data contained within, but keeps the registered
    /// event processors.
    pub fn clear(&mut self) {
        let event_processors = self.event_processors.clone();
        *self = Scope {
            event_processors,
            ..Default::default()
        };
    }

    /// Sets a level override.
    ///
    /// This overrides the level of every event captured inside this scope.
    pub fn set_level(&mut self, level: Option<Level>) {
        self.level = level;
    }

    /// Sets the fingerprint to group specific events together.
    pub fn set_fingerprint(&mut self, fingerprint: Option<&[&str]>) {
        self.fingerprint =
            fingerprint.map(|fp| Arc::new(fp.iter().map(|x| (*x).to_string()).collect()));
    }

    /// Sets the name of the current transaction.
    pub fn set_transaction(&mut self, transaction: Option<&str>) {
        self.transaction = transaction.map(|txn| Arc::new(txn.to_string()));
    }

    /// Sets the user for the current scope.
    pub fn set_user(&mut self, user: Option<User>) {
        self.user = user.map(Arc::new);
    }

    /// Sets a tag to a specific value. Last write wins.
    pub fn set_tag<V: ToString>(&mut self, key: &str, value: V) {
        self.tags.insert(key.to_string(), value.to_string());
    }

    /// Removes a tag.
    pub fn remove_tag(&mut self, key: &str) {
        self.tags.remove(key);
    }

    /// Sets an extra to a specific value. Last write wins.
    ///
    /// An extra is free-form JSON data saved along with the event.
    pub fn set_extra(&mut self, key: &str, value: Value) {
        self.extra.insert(key.to_string(), value);
    }

    /// Removes an extra.
    pub fn remove_extra(&mut self, key: &str) {
        self.extra.remove(key);
    }

    /// Sets the active span for this scope.
    ///
    /// The span is held weakly: the scope only annotates events with trace
    /// data, it never keeps a finished span alive.
    pub fn set_span(&mut self, span: Option<TransactionOrSpan>) {
        self.span = span.map(|span| span.downgrade());
    }

    /// Returns the active span of this scope, if it is still in flight.
    pub fn get_span(&self) -> Option<TransactionOrSpan> {
        self.span.as_ref().and_then(WeakTransactionOrSpan::upgrade)
    }

    /// Add an event processor to the scope.
    ///
    /// The event processors are executed in order when `apply_to_event` is
    /// called, and may modify or discard the event.
    pub fn add_event_processor<F>(&mut self, f: F)
    where
        F: Fn(Event) -> Option<Event> + Send + Sync + 'static,
    {
        self.event_processors.push_back(Arc::new(f));
    }

    /// Records a breadcrumb, evicting the oldest one beyond `max_breadcrumbs`.
    ///
    /// Breadcrumbs are time ordered, so eviction is strictly FIFO.
    pub fn add_breadcrumb(&mut self, breadcrumb: Breadcrumb, max_breadcrumbs: usize) {
        self.breadcrumbs.push_back(breadcrumb);
        while self.breadcrumbs.len() > max_breadcrumbs {
            self.breadcrumbs.pop_front();
        }
    }

    /// Applies the contained scoped data to fill an event.
    ///
    /// Event processors are run as part of this and may discard the event
    /// altogether. A panicking processor is skipped so that a single
    /// misbehaving processor cannot block delivery of an otherwise valid
    /// event.
    pub fn apply_to_event(&self, mut event: Event) -> Option<Event> {
        if let Some(level) = self.level {
            event.level = level;
        }

        if event.user.is_none() {
            if let Some(ref user) = self.user {
                event.user = Some((**user).clone());
            }
        }

        event.breadcrumbs.extend(self.breadcrumbs.iter().cloned());
        event
            .extra
            .extend(self.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        event
            .tags
            .extend(self.tags.iter().map(|(k, v)| (k.clone(), v.clone())));

        if event.transaction.is_none() {
            if let Some(ref txn) = self.transaction {
                event.transaction = Some((**txn).clone());
            }
        }

        if event.has_default_fingerprint() {
            if let Some(ref fp) = self.fingerprint {
                event.fingerprint = (**fp).clone();
            }
        }

        if !event.contexts.contains_key("trace") {
            if let Some(trace) = self.span.as_ref().and_then(|span| span.trace_context()) {
                event.contexts.insert("trace".into(), Context::from(trace));
            }
        }

        for processor in &self.event_processors {
            let processor = processor.clone();
            let candidate = event.clone();
            match catch_unwind(AssertUnwindSafe(move || processor(candidate))) {
                Ok(Some(processed)) => event = processed,
                Ok(None) => return None,
                Err(_) => {
                    faultline_debug!("event processor panicked, skipping it");
                }
            }
        }
        Some(event)
    }

    pub(crate) fn update_session_from_event(&self, event: &Event) {
        if let Ok(mut guard) = self.session.lock() {
            if let Some(session) = guard.as_mut() {
                session.update_from_event(event);
            }
        }
    }
}
