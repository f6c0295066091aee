//! Nullable network: an in-memory broadcast fabric between elections.
//!
//! Every node's distinct outputs are broadcast to all other nodes. Delivery
//! order is chosen by a [`NullRandom`], and deliveries may be duplicated, so
//! a seed fully determines one interleaving.

use std::collections::HashSet;

use fedvote_consensus::{ConsensusError, Election};
use fedvote_messages::{ElectionMessage, PublishMessage};

use crate::NullRandom;

#[derive(Clone, Debug)]
struct Delivery {
    to: usize,
    msg: ElectionMessage,
    /// Copies are never duplicated again.
    copy: bool,
}

/// Connects a set of elections that share an authority set and location.
pub struct NullNetwork {
    nodes: Vec<Election>,
    in_flight: Vec<Delivery>,
    /// Per node: outputs already broadcast.
    sent: Vec<HashSet<ElectionMessage>>,
    random: NullRandom,
    /// Duplicate roughly one in `n` deliveries.
    duplicate_one_in: Option<usize>,
    delivered: usize,
}

impl NullNetwork {
    pub fn new(nodes: Vec<Election>, random: NullRandom) -> Self {
        let sent = nodes.iter().map(|_| HashSet::new()).collect();
        Self {
            nodes,
            in_flight: Vec::new(),
            sent,
            random,
            duplicate_one_in: None,
            delivered: 0,
        }
    }

    pub fn with_duplication(mut self, one_in: usize) -> Self {
        self.duplicate_one_in = Some(one_in.max(1));
        self
    }

    /// Queue `msg` for every node.
    pub fn broadcast(&mut self, msg: ElectionMessage) {
        for to in 0..self.nodes.len() {
            self.send(to, msg.clone());
        }
    }

    /// Queue `msg` for node `to`.
    pub fn send(&mut self, to: usize, msg: ElectionMessage) {
        self.in_flight.push(Delivery {
            to,
            msg,
            copy: false,
        });
    }

    /// Deliver one in-flight message. Returns false once nothing is left.
    pub fn step(&mut self) -> Result<bool, ConsensusError> {
        if self.in_flight.is_empty() {
            return Ok(false);
        }
        let index = self.random.below(self.in_flight.len());
        let delivery = self.in_flight.remove(index);

        if let Some(n) = self.duplicate_one_in {
            if !delivery.copy && self.random.below(n) == 0 {
                self.in_flight.push(Delivery {
                    copy: true,
                    ..delivery.clone()
                });
            }
        }

        let Delivery { to, msg, .. } = delivery;
        let out = self.nodes[to].execute_msg(&msg)?;
        self.delivered += 1;
        for reply in out {
            if !self.sent[to].insert(reply.clone()) {
                continue;
            }
            tracing::trace!(from = to, msg = %reply, "broadcast");
            for peer in (0..self.nodes.len()).filter(|&p| p != to) {
                self.send(peer, reply.clone());
            }
        }
        Ok(true)
    }

    /// Deliver until quiet or `max_steps` deliveries; returns the number of
    /// deliveries made.
    pub fn run(&mut self, max_steps: usize) -> Result<usize, ConsensusError> {
        let start = self.delivered;
        while self.delivered - start < max_steps && self.step()? {}
        Ok(self.delivered - start)
    }

    pub fn is_quiet(&self) -> bool {
        self.in_flight.is_empty()
    }

    pub fn node(&self, index: usize) -> &Election {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &[Election] {
        &self.nodes
    }

    /// Each node's published answer, in node order.
    pub fn published(&self) -> Vec<Option<&PublishMessage>> {
        self.nodes.iter().map(Election::publish).collect()
    }

    pub fn delivered(&self) -> usize {
        self.delivered
    }
}
