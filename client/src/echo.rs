//! Matching of locally issued moves against the server's echoes.
//!
//! The server never tags its confirmations, so a sent move is correlated with
//! later board snapshots purely by comparing protocol strings. Each game owns
//! its own queue; nothing here is shared between games.

use log::debug;
use shared::Move;
use std::collections::VecDeque;

/// Moves sent for one game that the server has neither echoed nor rejected.
#[derive(Debug, Default, Clone)]
pub struct PendingMoves {
    queue: VecDeque<Move>,
}

impl PendingMoves {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a move that was just written to the server.
    pub fn push(&mut self, mv: Move) {
        self.queue.push_back(mv);
    }

    /// Checks a move derived from a snapshot against the oldest pending move.
    ///
    /// Returns true and pops the head when both encode to the same protocol
    /// string. Otherwise the derived move is taken to be the opponent's and
    /// the queue is left alone.
    pub fn confirm(&mut self, derived: &Move) -> bool {
        let matches = self
            .queue
            .front()
            .is_some_and(|head| head.to_protocol_string() == derived.to_protocol_string());

        if matches {
            self.queue.pop_front();
        }
        matches
    }

    /// Pops the oldest pending move after the server rejected a move.
    ///
    /// The rejected move's text is optional on the wire; when present it is
    /// only compared for diagnostics, never required for the pop.
    pub fn reject(&mut self, rejected: Option<&str>) -> Option<Move> {
        let head = self.queue.pop_front()?;

        if let Some(text) = rejected {
            if text != head.to_protocol_string() {
                debug!(
                    "Rejected move '{}' differs from oldest pending move '{}'",
                    text, head
                );
            }
        }

        Some(head)
    }

    /// Drops the oldest pending move without reporting it.
    pub fn discard_head(&mut self) -> Option<Move> {
        self.queue.pop_front()
    }

    pub fn front(&self) -> Option<&Move> {
        self.queue.front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
