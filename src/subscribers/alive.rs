//! # Agent liveness tracker with sequence-based ordering.
//!
//! Maintains authoritative state of which agents are currently alive, using event sequence
//! numbers to handle out-of-order delivery.
//!
//! ## Architecture
//! ```text
//! Runtime ──► EventBus ──► subscriber_listener() ──► AliveTracker::update()
//!                                                          │
//!                                                          ▼
//!                                           HashMap<AgentId, AgentState>
//!                                               (id → {name, seq, alive})
//! ```
//!
//! ## Rules
//! - Only `AgentStarted` / `AgentStopped` / `AgentFailed` / `AgentPanicked` change alive state
//! - Events without an agent id are ignored
//! - Events with `seq <= last_seq` are **rejected** (stale)

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::events::{Event, EventKind};
use crate::switch::AgentId;

#[derive(Debug, Clone)]
struct AgentState {
    name: String,
    last_seq: u64,
    alive: bool,
}

/// Thread-safe tracker of alive agents.
///
/// The runtime uses [`AliveTracker::snapshot`] to name the agents that did not stop within
/// the shutdown grace period.
#[derive(Debug, Default)]
pub struct AliveTracker {
    state: RwLock<HashMap<AgentId, AgentState>>,
}

impl AliveTracker {
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `ev` if it is newer than the last event seen for its agent.
    ///
    /// ```text
    /// update(AgentStopped, seq=100)  → alive=false, last_seq=100
    /// update(AgentStarted, seq=99)   → rejected (stale)
    /// ```
    ///
    /// Returns `true` if the event was applied.
    pub async fn update(&self, ev: &Event) -> bool {
        let Some(id) = ev.agent else {
            return false;
        };
        let alive = match ev.kind {
            EventKind::AgentStarted => true,
            EventKind::AgentStopped | EventKind::AgentFailed | EventKind::AgentPanicked => false,
            _ => return false,
        };

        let mut state = self.state.write().await;
        let entry = state.entry(id).or_insert_with(|| AgentState {
            name: ev.name.as_deref().unwrap_or_default().to_string(),
            last_seq: 0,
            alive: false,
        });
        if ev.seq <= entry.last_seq {
            return false;
        }
        entry.last_seq = ev.seq;
        entry.alive = alive;
        true
    }

    /// Sorted names of the agents that started and have not stopped yet.
    pub async fn snapshot(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut alive: Vec<String> = state
            .values()
            .filter(|s| s.alive)
            .map(|s| s.name.clone())
            .collect();
        alive.sort_unstable();
        alive
    }

    /// True if the agent is currently alive.
    pub async fn is_alive(&self, id: AgentId) -> bool {
        self.state
            .read()
            .await
            .get(&id)
            .is_some_and(|s| s.alive)
    }
}
