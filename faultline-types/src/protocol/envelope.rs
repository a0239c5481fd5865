//! The envelope wire container.

use std::io::{self, Write};

use uuid::Uuid;

use super::session::SessionUpdate;
use super::v1::{Event, Transaction};

/// An Envelope Item.
///
/// Every item is shipped with a type-tagged header line followed by its
/// JSON payload.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
#[allow(clippy::large_enum_variant)]
pub enum EnvelopeItem {
    /// An error or message event.
    Event(Event),
    /// A performance monitoring transaction.
    Transaction(Transaction),
    /// A release health session update.
    SessionUpdate(SessionUpdate),
}

impl From<Event> for EnvelopeItem {
    fn from(event: Event) -> Self {
        EnvelopeItem::Event(event)
    }
}

impl From<Transaction> for EnvelopeItem {
    fn from(transaction: Transaction) -> Self {
        EnvelopeItem::Transaction(transaction)
    }
}

impl From<SessionUpdate> for EnvelopeItem {
    fn from(session: SessionUpdate) -> Self {
        EnvelopeItem::SessionUpdate(session)
    }
}

impl EnvelopeItem {
    /// The item type written to the item header.
    pub fn ty(&self) -> &'static str {
        match self {
            EnvelopeItem::Event(_) => "event",
            EnvelopeItem::Transaction(_) => "transaction",
            EnvelopeItem::SessionUpdate(_) => "session",
        }
    }
}

/// An Iterator over the items of an Envelope.
#[derive(Clone)]
pub struct EnvelopeItemIter<'s> {
    inner: std::slice::Iter<'s, EnvelopeItem>,
}

impl<'s> Iterator for EnvelopeItemIter<'s> {
    type Item = &'s EnvelopeItem;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// A Faultline envelope.
///
/// An envelope is the data format used for ingestion. It bundles one or more
/// related items, such as an event together with the session update it
/// affected, into a single request.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct Envelope {
    event_id: Option<Uuid>,
    items: Vec<EnvelopeItem>,
}

impl Envelope {
    /// Creates a new empty envelope.
    pub fn new() -> Envelope {
        Default::default()
    }

    /// Add a new envelope item.
    ///
    /// The first event or transaction item determines the envelope's id.
    pub fn add_item<I>(&mut self, item: I)
    where
        I: Into<EnvelopeItem>,
    {
        let item = item.into();
        if self.event_id.is_none() {
            if let EnvelopeItem::Event(ref event) = item {
                self.event_id = Some(event.event_id);
            } else if let EnvelopeItem::Transaction(ref transaction) = item {
                self.event_id = Some(transaction.event_id);
            }
        }
        self.items.push(item);
    }

    /// Creates an [`Iterator`] over all the [`EnvelopeItem`]s.
    pub fn items(&self) -> EnvelopeItemIter {
        EnvelopeItemIter {
            inner: self.items.iter(),
        }
    }

    /// Returns the envelope's id, if any.
    pub fn uuid(&self) -> Option<&Uuid> {
        self.event_id.as_ref()
    }

    /// Returns whether the envelope contains no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the [`Event`] contained in this envelope, if any.
    pub fn event(&self) -> Option<&Event> {
        self.items.iter().find_map(|item| match item {
            EnvelopeItem::Event(event) => Some(event),
            _ => None,
        })
    }

    /// Filters the envelope's items based on a predicate, returning a new
    /// envelope containing only the retained items.
    ///
    /// [`None`] is returned if no items remain after filtering.
    pub fn filter<P>(self, mut predicate: P) -> Option<Self>
    where
        P: FnMut(&EnvelopeItem) -> bool,
    {
        let mut filtered = Envelope::new();
        for item in self.items {
            if predicate(&item) {
                filtered.add_item(item);
            }
        }
        if filtered.is_empty() {
            None
        } else {
            Some(filtered)
        }
    }

    /// Serializes the envelope into the given [`Write`].
    pub fn to_writer<W>(&self, mut writer: W) -> io::Result<()>
    where
        W: Write,
    {
        match self.event_id {
            Some(uuid) => writeln!(writer, r#"{{"event_id":"{uuid}"}}"#)?,
            None => writeln!(writer, "{{}}")?,
        }

        let mut item_buf = Vec::new();
        for item in &self.items {
            match item {
                EnvelopeItem::Event(event) => serde_json::to_writer(&mut item_buf, event),
                EnvelopeItem::Transaction(transaction) => {
                    serde_json::to_writer(&mut item_buf, transaction)
                }
                EnvelopeItem::SessionUpdate(session) => {
                    serde_json::to_writer(&mut item_buf, session)
                }
            }
            .map_err(io::Error::other)?;

            writeln!(
                writer,
                r#"{{"type":"{}","length":{}}}"#,
                item.ty(),
                item_buf.len()
            )?;
            writer.write_all(&item_buf)?;
            writeln!(writer)?;
            item_buf.clear();
        }

        Ok(())
    }

    /// Serializes the envelope into a byte buffer.
    pub fn to_vec(&self) -> io::Result<Vec<u8>> {
        let mut body = Vec::new();
        self.to_writer(&mut body)?;
        Ok(body)
    }
}

impl From<Event> for Envelope {
    fn from(event: Event) -> Self {
        let mut envelope = Self::default();
        envelope.add_item(event);
        envelope
    }
}

impl From<Transaction> for Envelope {
    fn from(transaction: Transaction) -> Self {
        let mut envelope = Self::default();
        envelope.add_item(transaction);
        envelope
    }
}

impl From<SessionUpdate> for Envelope {
    fn from(session: SessionUpdate) -> Self {
        let mut envelope = Self::default();
        envelope.add_item(session);
        envelope
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_str(envelope: Envelope) -> String {
        String::from_utf8(envelope.to_vec().unwrap()).unwrap()
    }

    #[test]
    fn test_empty() {
        assert_eq!(to_str(Envelope::new()), "{}\n");
    }

    #[test]
    fn test_event_item() {
        let event_id: Uuid = "22d00b3f-d1b1-4b5d-8d20-49d138cd8a9c".parse().unwrap();
        let mut event = Event::new();
        event.event_id = event_id;
        event.timestamp = std::time::SystemTime::UNIX_EPOCH;

        let envelope: Envelope = event.into();
        let serialized = to_str(envelope);
        let mut lines = serialized.lines();

        assert_eq!(
            lines.next(),
            Some(r#"{"event_id":"22d00b3f-d1b1-4b5d-8d20-49d138cd8a9c"}"#)
        );
        let item_header = lines.next().unwrap();
        assert!(item_header.starts_with(r#"{"type":"event","length":"#));
        let payload = lines.next().unwrap();
        assert!(payload.contains(r#""event_id":"22d00b3f-d1b1-4b5d-8d20-49d138cd8a9c""#));
    }

    #[test]
    fn test_filter_drops_all() {
        let envelope: Envelope = Envelope::from(Event::new());
        assert!(envelope.filter(|_| false).is_none());
    }
}
