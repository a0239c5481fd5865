use std::sync::{Arc, Mutex, Weak};
use std::time::SystemTime;

use crate::protocol::{self, Context, SpanStatus, TraceContext, TraceId, Value};
use crate::types::Uuid;
use crate::{Client, Hub};

// transactions with more spans than this silently drop the excess
const MAX_SPANS: usize = 1_000;

/// Start a new performance monitoring transaction on the current hub.
///
/// The transaction needs to be explicitly finished via
/// [`Transaction::finish`], otherwise it is discarded. The transaction
/// itself also represents the root span in the span hierarchy; child spans
/// are started with [`Transaction::start_child`].
pub fn start_transaction(ctx: TransactionContext) -> Transaction {
    let client = Hub::with_active(|hub| hub.client());
    Transaction::new(client, ctx)
}

impl Hub {
    /// Start a new performance monitoring transaction.
    ///
    /// See the global [`start_transaction`] for more documentation.
    pub fn start_transaction(&self, ctx: TransactionContext) -> Transaction {
        Transaction::new(self.client(), ctx)
    }
}

/// The metadata used to start a new [`Transaction`].
#[derive(Debug)]
pub struct TransactionContext {
    name: String,
    op: String,
    trace_id: TraceId,
    parent_span_id: Option<protocol::SpanId>,
    sampled: Option<bool>,
}

impl TransactionContext {
    /// Creates a new transaction context with the given `name` and `op`.
    #[must_use = "this must be used with `start_transaction`"]
    pub fn new(name: &str, op: &str) -> Self {
        Self {
            name: name.into(),
            op: op.into(),
            trace_id: TraceId::default(),
            parent_span_id: None,
            sampled: None,
        }
    }

    /// Creates a new transaction context that continues the trace of an
    /// existing span, for work spawned off the current execution.
    pub fn continue_from_span(name: &str, op: &str, span: Option<&TransactionOrSpan>) -> Self {
        let Some(span) = span else {
            return Self::new(name, op);
        };

        let trace = span.trace_context();
        Self {
            name: name.into(),
            op: op.into(),
            trace_id: trace.trace_id,
            parent_span_id: Some(trace.span_id),
            sampled: Some(span.is_sampled()),
        }
    }

    /// Set the sampling decision for this transaction.
    ///
    /// This can be either an explicit boolean flag, or [`None`], which falls
    /// back to the configured `traces_sample_rate` option.
    pub fn set_sampled(&mut self, sampled: impl Into<Option<bool>>) {
        self.sampled = sampled.into();
    }
}

pub(crate) struct TransactionInner {
    client: Option<Arc<Client>>,
    sampled: bool,
    context: TraceContext,
    transaction: Option<protocol::Transaction>,
}

type TransactionArc = Arc<Mutex<TransactionInner>>;

/// An in-flight performance monitoring transaction.
///
/// The transaction is the root of a span hierarchy. It is cheap to clone;
/// all clones refer to the same transaction.
#[derive(Clone)]
pub struct Transaction {
    pub(crate) inner: TransactionArc,
}

impl Transaction {
    fn new(mut client: Option<Arc<Client>>, ctx: TransactionContext) -> Self {
        let context = TraceContext {
            trace_id: ctx.trace_id,
            parent_span_id: ctx.parent_span_id,
            op: Some(ctx.op),
            ..Default::default()
        };

        let (sampled, mut transaction) = match client.as_ref() {
            Some(client) => (
                ctx.sampled.unwrap_or_else(|| {
                    client.sample_should_send(client.options().traces_sample_rate)
                }),
                Some(protocol::Transaction {
                    name: Some(ctx.name),
                    ..Default::default()
                }),
            ),
            None => (ctx.sampled.unwrap_or(false), None),
        };

        // unsampled transactions are hollow from the start, so all the span
        // bookkeeping along the way is free
        if !sampled {
            transaction = None;
            client = None;
        }

        Transaction {
            inner: Arc::new(Mutex::new(TransactionInner {
                client,
                sampled,
                context,
                transaction,
            })),
        }
    }

    /// Returns whether the transaction is sampled for sending.
    pub fn is_sampled(&self) -> bool {
        self.inner.lock().unwrap().sampled
    }

    /// The id this transaction will be sent under, if it is sampled.
    pub fn event_id(&self) -> Option<Uuid> {
        self.inner
            .lock()
            .unwrap()
            .transaction
            .as_ref()
            .map(|transaction| transaction.event_id)
    }

    /// Set a tag to be sent with this transaction.
    pub fn set_tag<V: ToString>(&self, key: &str, value: V) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(transaction) = inner.transaction.as_mut() {
            transaction.tags.insert(key.into(), value.to_string());
        }
    }

    /// Set the status of the transaction.
    pub fn set_status(&self, status: SpanStatus) {
        let mut inner = self.inner.lock().unwrap();
        inner.context.status = Some(status);
    }

    /// Returns the trace context of this transaction.
    pub fn trace_context(&self) -> TraceContext {
        self.inner.lock().unwrap().context.clone()
    }

    /// Starts a new child span from this transaction.
    pub fn start_child(&self, op: &str, description: &str) -> Span {
        let inner = self.inner.lock().unwrap();
        let span = protocol::Span {
            trace_id: inner.context.trace_id,
            parent_span_id: Some(inner.context.span_id),
            op: Some(op.into()),
            description: if description.is_empty() {
                None
            } else {
                Some(description.into())
            },
            ..Default::default()
        };
        Span {
            transaction: self.inner.clone(),
            sampled: inner.sampled,
            span: Arc::new(Mutex::new(span)),
        }
    }

    /// Finishes the transaction and sends it, if it is sampled.
    pub fn finish(self) {
        let mut inner = self.inner.lock().unwrap();
        if let (Some(mut transaction), Some(client)) =
            (inner.transaction.take(), inner.client.take())
        {
            transaction.timestamp = Some(SystemTime::now());
            let options = client.options();
            if transaction.release.is_none() {
                transaction.release = options.release.as_ref().map(|x| x.to_string());
            }
            if transaction.environment.is_none() {
                transaction.environment = options.environment.as_ref().map(|x| x.to_string());
            }
            transaction
                .contexts
                .insert("trace".into(), Context::Trace(Box::new(inner.context.clone())));
            client.capture_transaction(transaction);
        }
    }
}

/// An in-flight span of a transaction.
#[derive(Clone)]
pub struct Span {
    transaction: TransactionArc,
    sampled: bool,
    span: Arc<Mutex<protocol::Span>>,
}

impl Span {
    /// Returns whether the surrounding transaction is sampled.
    pub fn is_sampled(&self) -> bool {
        self.sampled
    }

    /// Set some extra data to be sent with this span.
    pub fn set_data(&self, key: &str, value: Value) {
        self.span.lock().unwrap().data.insert(key.into(), value);
    }

    /// Set the status of the span.
    pub fn set_status(&self, status: SpanStatus) {
        self.span.lock().unwrap().status = Some(status);
    }

    /// Returns the trace context of this span.
    pub fn trace_context(&self) -> TraceContext {
        let span = self.span.lock().unwrap();
        TraceContext {
            span_id: span.span_id,
            trace_id: span.trace_id,
            parent_span_id: span.parent_span_id,
            op: span.op.clone(),
            description: span.description.clone(),
            status: span.status,
        }
    }

    /// Starts a new child span from this span.
    pub fn start_child(&self, op: &str, description: &str) -> Span {
        let parent = self.span.lock().unwrap();
        let span = protocol::Span {
            trace_id: parent.trace_id,
            parent_span_id: Some(parent.span_id),
            op: Some(op.into()),
            description: if description.is_empty() {
                None
            } else {
                Some(description.into())
            },
            ..Default::default()
        };
        Span {
            transaction: self.transaction.clone(),
            sampled: self.sampled,
            span: Arc::new(Mutex::new(span)),
        }
    }

    /// Finishes the span and records it on its transaction.
    ///
    /// Finishing a span twice has no effect.
    pub fn finish(self) {
        let mut span = self.span.lock().unwrap();
        if span.timestamp.is_some() {
            return;
        }
        span.timestamp = Some(SystemTime::now());
        let mut inner = self.transaction.lock().unwrap();
        if let Some(transaction) = inner.transaction.as_mut() {
            if transaction.spans.len() < MAX_SPANS {
                transaction.spans.push(span.clone());
            }
        }
    }
}

/// Either an in-flight [`Transaction`] or one of its [`Span`]s.
#[derive(Clone)]
pub enum TransactionOrSpan {
    /// A [`Transaction`].
    Transaction(Transaction),
    /// A [`Span`].
    Span(Span),
}

impl From<Transaction> for TransactionOrSpan {
    fn from(transaction: Transaction) -> Self {
        Self::Transaction(transaction)
    }
}

impl From<Span> for TransactionOrSpan {
    fn from(span: Span) -> Self {
        Self::Span(span)
    }
}

impl TransactionOrSpan {
    /// Returns whether the transaction or span is sampled.
    pub fn is_sampled(&self) -> bool {
        match self {
            TransactionOrSpan::Transaction(transaction) => transaction.is_sampled(),
            TransactionOrSpan::Span(span) => span.is_sampled(),
        }
    }

    /// Returns the trace context of the transaction or span.
    pub fn trace_context(&self) -> TraceContext {
        match self {
            TransactionOrSpan::Transaction(transaction) => transaction.trace_context(),
            TransactionOrSpan::Span(span) => span.trace_context(),
        }
    }

    /// Starts a new child span.
    pub fn start_child(&self, op: &str, description: &str) -> Span {
        match self {
            TransactionOrSpan::Transaction(transaction) => {
                transaction.start_child(op, description)
            }
            TransactionOrSpan::Span(span) => span.start_child(op, description),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakTransactionOrSpan {
        match self {
            TransactionOrSpan::Transaction(transaction) => WeakTransactionOrSpan {
                transaction: Arc::downgrade(&transaction.inner),
                span: None,
                sampled: transaction.is_sampled(),
            },
            TransactionOrSpan::Span(span) => WeakTransactionOrSpan {
                transaction: Arc::downgrade(&span.transaction),
                span: Some(Arc::downgrade(&span.span)),
                sampled: span.sampled,
            },
        }
    }
}

/// A weak handle on an in-flight transaction or span.
///
/// Scopes hold their active span through this: the scope annotates events
/// with trace data while the span lives, but never keeps it alive.
#[derive(Clone)]
pub(crate) struct WeakTransactionOrSpan {
    transaction: Weak<Mutex<TransactionInner>>,
    span: Option<Weak<Mutex<protocol::Span>>>,
    sampled: bool,
}

impl WeakTransactionOrSpan {
    pub(crate) fn upgrade(&self) -> Option<TransactionOrSpan> {
        let transaction = self.transaction.upgrade()?;
        Some(match &self.span {
            Some(weak_span) => {
                let span = weak_span.upgrade()?;
                TransactionOrSpan::Span(Span {
                    transaction,
                    sampled: self.sampled,
                    span,
                })
            }
            None => TransactionOrSpan::Transaction(Transaction { inner: transaction }),
        })
    }

    pub(crate) fn trace_context(&self) -> Option<TraceContext> {
        self.upgrade().map(|span| span.trace_context())
    }
}
