//! Per-agent memo of which topics the agent handles.

use std::collections::HashMap;

use crate::switch::Topic;

/// Tri-state interest map: absent = unknown, `true` = handled, `false` = unhandled.
#[derive(Debug, Default)]
pub struct InterestCache {
    entries: HashMap<Topic, bool>,
}

impl InterestCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached result for `topic`, `None` while unknown.
    pub fn get(&self, topic: &Topic) -> Option<bool> {
        self.entries.get(topic).copied()
    }

    /// Records the dispatch result; returns `true` if the topic was unknown until now.
    pub fn record(&mut self, topic: Topic, handled: bool) -> bool {
        self.entries.insert(topic, handled).is_none()
    }

    /// Topics currently known, with their result.
    pub fn iter(&self) -> impl Iterator<Item = (&Topic, bool)> {
        self.entries.iter().map(|(t, h)| (t, *h))
    }
}
