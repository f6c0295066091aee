//! Election adapter that keeps idle peers informed.

use fedvote_messages::ElectionMessage;

use crate::{ConsensusError, Election};

/// Wraps an [`Election`]; when a peer's message changes nothing locally,
/// answers with the local node's current vote for that message's slot so
/// lagging peers can catch up.
#[derive(Clone, Debug)]
pub struct RoutingElection {
    election: Election,
}

impl RoutingElection {
    pub fn new(election: Election) -> Self {
        Self { election }
    }

    pub fn execute_msg(&mut self, msg: &ElectionMessage) -> Result<Vec<ElectionMessage>, ConsensusError> {
        let out = self.election.execute_msg(msg)?;
        if !out.is_empty() || !self.election.config().rebroadcast_current_vote {
            return Ok(out);
        }

        let from_peer = msg
            .signer()
            .is_some_and(|signer| signer != self.election.self_id());
        let Some(volunteer) = msg.volunteer() else {
            return Ok(out);
        };
        if !from_peer {
            return Ok(out);
        }

        let slot = self.election.authset().round_slot(volunteer.signer);
        match self.election.current_vote(slot) {
            Some(vote) => {
                tracing::trace!(slot = %slot, level = vote.level, "re-sending current vote");
                Ok(vec![vote.clone().into()])
            }
            None => Ok(out),
        }
    }

    pub fn election(&self) -> &Election {
        &self.election
    }

    pub fn into_inner(self) -> Election {
        self.election
    }
}
