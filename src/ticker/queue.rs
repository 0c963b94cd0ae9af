//! Outbound control messages parked until the connection is ready

use super::messages::ControlMessage;
use std::collections::VecDeque;

/// Result of parking a control message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// Appended to the back of the queue
    Queued,
    /// A remove met still-queued adds for the same symbol; the adds and the
    /// remove were all dropped
    Superseded { dropped: usize },
}

/// FIFO of control messages, drained once when a session opens
#[derive(Debug, Default)]
pub struct OutboundQueue {
    pending: VecDeque<ControlMessage>,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park `message` in call order
    ///
    /// A `SubRemove` cancels every queued `SubAdd` for its symbol. Since none
    /// of those adds reached the feed, the remove has nothing to undo and is
    /// dropped as well.
    pub fn push(&mut self, message: ControlMessage) -> Enqueued {
        if !message.is_add() {
            let before = self.pending.len();
            self.pending
                .retain(|queued| !(queued.is_add() && queued.symbol() == message.symbol()));
            let cancelled = before - self.pending.len();
            if cancelled > 0 {
                return Enqueued::Superseded {
                    dropped: cancelled + 1,
                };
            }
        }

        self.pending.push_back(message);
        Enqueued::Queued
    }

    /// Take every parked message, oldest first
    pub fn drain(&mut self) -> impl Iterator<Item = ControlMessage> + '_ {
        self.pending.drain(..)
    }

    /// Forget every parked message; returns how many were dropped
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
