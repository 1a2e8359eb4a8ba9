//! Event types - the view of an event the relationship store needs
//!
//! The store only ever looks at four things on an event: its ID, the room it
//! belongs to, its origin timestamp and the raw JSON of its content.

use serde::Deserialize;
use serde_json::value::RawValue;

use crate::{Error, Result};

/// Anything the relationship store can ingest.
///
/// Implemented by [`Event`]; hosts with their own event type implement it
/// directly instead of converting.
pub trait RelationEvent: Send + Sync {
    /// The event's own identifier
    fn event_id(&self) -> &str;

    /// Room the event was sent in
    fn room_id(&self) -> &str;

    /// Milliseconds since the unix epoch, as claimed by the origin server
    fn origin_server_ts(&self) -> i64;

    /// Raw JSON bytes of the event content
    fn content(&self) -> &[u8];
}

/// An owned event with its content kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub event_id: String,
    pub room_id: String,
    pub origin_server_ts: i64,
    /// Content exactly as received; not required to be valid JSON
    pub content: String,
}

#[derive(Deserialize)]
struct WireEvent<'a> {
    event_id: String,
    room_id: String,
    origin_server_ts: i64,
    #[serde(borrow)]
    content: &'a RawValue,
}

impl Event {
    pub fn new(
        event_id: impl Into<String>,
        room_id: impl Into<String>,
        origin_server_ts: i64,
        content: impl Into<String>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            room_id: room_id.into(),
            origin_server_ts,
            content: content.into(),
        }
    }

    /// Decode an event from its JSON object form.
    ///
    /// `content` may hold any JSON value and is stored without re-encoding.
    pub fn from_json(json: &str) -> Result<Self> {
        let wire: WireEvent<'_> =
            serde_json::from_str(json).map_err(|e| Error::InvalidEvent(e.to_string()))?;

        Ok(Self {
            event_id: wire.event_id,
            room_id: wire.room_id,
            origin_server_ts: wire.origin_server_ts,
            content: wire.content.get().to_string(),
        })
    }
}

impl RelationEvent for Event {
    fn event_id(&self) -> &str {
        &self.event_id
    }

    fn room_id(&self) -> &str {
        &self.room_id
    }

    fn origin_server_ts(&self) -> i64 {
        self.origin_server_ts
    }

    fn content(&self) -> &[u8] {
        self.content.as_bytes()
    }
}
