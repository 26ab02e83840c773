use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::Channel;

pub const UNKNOWN_CHANNEL: &str = "Unknown channel";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub badge: String,
}

/// Channel id to display metadata, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<ChannelEntry>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new(entries: Vec<ChannelEntry>) -> Self {
        let mut catalog = Catalog::default();
        for entry in entries {
            catalog.upsert(entry);
        }
        catalog
    }

    fn upsert(&mut self, entry: ChannelEntry) {
        match self.index.get(&entry.id) {
            Some(&pos) => self.entries[pos] = entry,
            None => {
                self.index.insert(entry.id.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn entries(&self) -> &[ChannelEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&ChannelEntry> {
        self.index.get(id).map(|&pos| &self.entries[pos])
    }

    pub fn name(&self, id: &str) -> &str {
        self.get(id)
            .map(|entry| entry.name.as_str())
            .unwrap_or(UNKNOWN_CHANNEL)
    }

    pub fn badge(&self, id: &str) -> &str {
        self.get(id)
            .map(|entry| entry.badge.as_str())
            .filter(|badge| !badge.is_empty())
            .unwrap_or("#")
    }

    /// Adds channels the backend knows about. Configured names win.
    pub fn merge_remote(&mut self, channels: &[Channel]) {
        for channel in channels {
            if self.index.contains_key(&channel.id) {
                continue;
            }
            self.upsert(ChannelEntry {
                id: channel.id.clone(),
                name: if channel.name.is_empty() {
                    channel.id.clone()
                } else {
                    channel.name.clone()
                },
                badge: String::new(),
            });
        }
    }
}
