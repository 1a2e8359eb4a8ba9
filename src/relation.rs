//! Relation types - typed edges between events
//!
//! An event declares its parent through a descriptor in its content:
//!
//! ```json
//! { "m.relationship": { "rel_type": "m.reference", "event_id": "$parent" } }
//! ```
//!
//! The declaring event is the child. Nothing else about the content matters.

use serde::{Deserialize, Serialize};

use crate::event::RelationEvent;

/// A directed, typed edge from a parent event to a child event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub parent_event_id: String,
    pub child_event_id: String,
    pub rel_type: String,
}

impl Relation {
    pub fn new(
        parent_event_id: impl Into<String>,
        child_event_id: impl Into<String>,
        rel_type: impl Into<String>,
    ) -> Self {
        Self {
            parent_event_id: parent_event_id.into(),
            child_event_id: child_event_id.into(),
            rel_type: rel_type.into(),
        }
    }
}

/// Cached metadata about an event that appeared as a child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub event_id: String,
    pub origin_server_ts: i64,
    pub room_id: String,
}

impl Node {
    pub fn from_event(event: &dyn RelationEvent) -> Self {
        Self {
            event_id: event.event_id().to_string(),
            origin_server_ts: event.origin_server_ts(),
            room_id: event.room_id().to_string(),
        }
    }
}

#[derive(Deserialize)]
struct RelationshipContent {
    #[serde(rename = "m.relationship", default)]
    relationship: Descriptor,
}

#[derive(Deserialize, Default)]
struct Descriptor {
    #[serde(default)]
    rel_type: String,
    #[serde(default)]
    event_id: String,
}

/// Derive the relation an event declares, if any.
///
/// Returns `None` for an absent event, unparseable content, or a descriptor
/// missing either field. Parse failures are never errors.
pub fn extract_relation<E: RelationEvent + ?Sized>(event: Option<&E>) -> Option<Relation> {
    let event = event?;

    let content: RelationshipContent = match serde_json::from_slice(event.content()) {
        Ok(content) => content,
        Err(e) => {
            tracing::debug!(
                event_id = event.event_id(),
                error = %e,
                "ignoring unparseable relationship content"
            );
            return None;
        }
    };

    let Descriptor { rel_type, event_id } = content.relationship;
    if rel_type.is_empty() || event_id.is_empty() || event.event_id().is_empty() {
        return None;
    }

    Some(Relation {
        parent_event_id: event_id,
        child_event_id: event.event_id().to_string(),
        rel_type,
    })
}
