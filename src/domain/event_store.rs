use crate::domain::models::{Event, EventId};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("event not found: {0}")]
    UnknownEvent(EventId),
}

/// Server-confirmed events keyed by identity, kept in insertion order.
///
/// Every mutation projects a successful remote response. The order sequence
/// and the key set of the map always hold the same identities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventCollection {
    ids: Vec<EventId>,
    events: HashMap<EventId, Event>,
    version: u64,
}

impl EventCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_all(&mut self, events: Vec<Event>) {
        let mut ids = Vec::with_capacity(events.len());
        let mut by_id = HashMap::with_capacity(events.len());
        for event in events {
            if by_id.insert(event.id, event.clone()).is_none() {
                ids.push(event.id);
            }
        }
        self.ids = ids;
        self.events = by_id;
        self.bump();
    }

    pub fn insert(&mut self, event: Event) {
        if self.events.insert(event.id, event.clone()).is_none() {
            self.ids.push(event.id);
        }
        self.bump();
    }

    pub fn replace(&mut self, event: Event) -> Result<(), StoreError> {
        let Some(slot) = self.events.get_mut(&event.id) else {
            return Err(StoreError::UnknownEvent(event.id));
        };
        *slot = event;
        self.bump();
        Ok(())
    }

    /// Returns `false` when the identity was already absent.
    pub fn remove(&mut self, event_id: EventId) -> bool {
        if self.events.remove(&event_id).is_none() {
            return false;
        }
        self.ids.retain(|id| *id != event_id);
        self.bump();
        true
    }

    pub fn get(&self, event_id: EventId) -> Option<&Event> {
        self.events.get(&event_id)
    }

    pub fn contains(&self, event_id: EventId) -> bool {
        self.events.contains_key(&event_id)
    }

    pub fn ids(&self) -> &[EventId] {
        &self.ids
    }

    pub fn events(&self) -> Vec<Event> {
        self.ids
            .iter()
            .filter_map(|id| self.events.get(id))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    fn bump(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}
