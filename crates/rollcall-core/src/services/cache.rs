//! In-memory name-to-participant index owned by the check-in service.

use std::collections::HashMap;

use crate::models::{normalize_name_for_search, Participant};

/// Last resolved participant per normalized name.
///
/// Entries are only a latency shortcut: mutations always re-read the sheet,
/// and entries are replaced only after a confirmed write.
#[derive(Debug, Clone, Default)]
pub struct ResolutionCache {
    entries: HashMap<String, Participant>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up by name; surrounding whitespace is ignored.
    pub fn get(&self, name: &str) -> Option<&Participant> {
        self.entries.get(normalize_name_for_search(name))
    }

    /// Store the latest known snapshot under its normalized name.
    pub fn refresh(&mut self, participant: Participant) {
        self.entries
            .insert(participant.search_key().to_string(), participant);
    }

    /// Record a confirmed write.
    ///
    /// The entry for the name is replaced only when it already holds the
    /// same participant, so a write to a later row sharing the name never
    /// displaces the first match.
    pub fn record_write(&mut self, participant: &Participant) {
        if let Some(entry) = self.entries.get_mut(participant.search_key()) {
            if entry.id == participant.id {
                *entry = participant.clone();
            }
        }
    }

    pub fn invalidate(&mut self, name: &str) -> Option<Participant> {
        self.entries.remove(normalize_name_for_search(name))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
