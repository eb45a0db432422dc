//! # Unbounded delivery queues with observable depth.
//!
//! Every agent owns two FIFO queues (high and low priority). Publishing into them never blocks
//! and never fails visibly; the only instrumentation is a shared depth gauge so tests and
//! debug tooling can watch queue growth.
//!
//! ```text
//! QueueSender ──► [ mpsc::unbounded ] ──► QueueReceiver
//!      └──────────── depth: Arc<AtomicUsize> ───┘
//! ```
//!
//! ## Rules
//! - The gauge is incremented **before** the send and decremented **after** the receive, so it
//!   never under-reports a pending message.
//! - A send to a dropped receiver is discarded and reported to the caller as `false`.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::time::Duration;

use tokio::sync::mpsc;

use super::envelope::Envelope;

/// Creates a connected sender/receiver pair.
pub fn queue() -> (QueueSender, QueueReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let depth = Arc::new(AtomicUsize::new(0));
    (
        QueueSender {
            tx,
            depth: Arc::clone(&depth),
        },
        QueueReceiver { rx, depth },
    )
}

/// Producer half, held by the bus subscription table.
#[derive(Clone, Debug)]
pub struct QueueSender {
    tx: mpsc::UnboundedSender<Arc<Envelope>>,
    depth: Arc<AtomicUsize>,
}

impl QueueSender {
    /// Enqueues an envelope. Returns `false` if the receiver is gone.
    pub fn send(&self, env: Arc<Envelope>) -> bool {
        self.depth.fetch_add(1, AtomicOrdering::AcqRel);
        if self.tx.send(env).is_err() {
            self.depth.fetch_sub(1, AtomicOrdering::AcqRel);
            return false;
        }
        true
    }

    /// Messages currently waiting in the queue.
    pub fn depth(&self) -> usize {
        self.depth.load(AtomicOrdering::Acquire)
    }

    /// True once the receiving agent dropped its end.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Outcome of a bounded wait on a queue.
#[derive(Debug)]
pub enum Recv {
    /// A message arrived.
    Message(Arc<Envelope>),
    /// Nothing arrived within the wait.
    TimedOut,
    /// Every sender is gone; nothing will ever arrive.
    Closed,
}

/// Consumer half, owned by the agent loop.
#[derive(Debug)]
pub struct QueueReceiver {
    rx: mpsc::UnboundedReceiver<Arc<Envelope>>,
    depth: Arc<AtomicUsize>,
}

impl QueueReceiver {
    /// Takes the next message without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<Envelope>> {
        let env = self.rx.try_recv().ok()?;
        self.depth.fetch_sub(1, AtomicOrdering::AcqRel);
        Some(env)
    }

    /// Waits at most `wait` for the next message.
    pub async fn recv_timeout(&mut self, wait: Duration) -> Recv {
        match tokio::time::timeout(wait, self.rx.recv()).await {
            Ok(Some(env)) => {
                self.depth.fetch_sub(1, AtomicOrdering::AcqRel);
                Recv::Message(env)
            }
            Ok(None) => Recv::Closed,
            Err(_elapsed) => Recv::TimedOut,
        }
    }

    /// Messages currently waiting in the queue.
    pub fn depth(&self) -> usize {
        self.depth.load(AtomicOrdering::Acquire)
    }

    /// True if no message is waiting.
    pub fn is_empty(&self) -> bool {
        self.depth() == 0
    }
}

/// The pair of queues an agent drains.
#[derive(Debug)]
pub struct Mailbox {
    /// High-priority queue (drained to exhaustion).
    pub high: QueueReceiver,
    /// Low-priority queue (drained in bursts).
    pub low: QueueReceiver,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::switch::envelope::{AgentId, Message};

    fn env() -> Arc<Envelope> {
        Arc::new(Envelope::new(AgentId::next(), Message::Quit))
    }

    #[test]
    fn depth_tracks_pending_messages() {
        let (tx, mut rx) = queue();
        assert!(tx.send(env()));
        assert!(tx.send(env()));
        assert_eq!(tx.depth(), 2);
        assert!(rx.try_recv().is_some());
        assert_eq!(rx.depth(), 1);
        assert!(rx.try_recv().is_some());
        assert!(rx.try_recv().is_none());
        assert!(rx.is_empty());
    }

    #[test]
    fn send_to_dropped_receiver_is_discarded() {
        let (tx, rx) = queue();
        drop(rx);
        assert!(!tx.send(env()));
        assert!(tx.is_closed());
        assert_eq!(tx.depth(), 0);
    }

    #[tokio::test]
    async fn bounded_wait_reports_timeout_and_close() {
        let (tx, mut rx) = queue();
        assert!(matches!(
            rx.recv_timeout(Duration::from_millis(5)).await,
            Recv::TimedOut
        ));
        tx.send(env());
        assert!(matches!(
            rx.recv_timeout(Duration::from_millis(5)).await,
            Recv::Message(_)
        ));
        drop(tx);
        assert!(matches!(
            rx.recv_timeout(Duration::from_millis(5)).await,
            Recv::Closed
        ));
    }
}
