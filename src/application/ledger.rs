use std::{collections::BTreeMap, sync::Arc};

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{error, info};

use crate::application::repos::{NewVote, RepoError, VotesRepo};
use crate::domain::entities::{ActorId, SubjectId, TargetId, VoteRecord};

#[derive(Debug, Error)]
pub enum LedgerError {
    /// The actor already has a vote for this match. Expected, not a fault.
    #[error("actor {actor_id} already voted in match {subject_id}")]
    AlreadyRecorded {
        actor_id: ActorId,
        subject_id: SubjectId,
    },
    #[error("local storage failure: {0}")]
    Storage(#[from] RepoError),
}

/// Locally durable record of votes, independent of the match service.
#[derive(Clone)]
pub struct LocalLedger {
    repo: Arc<dyn VotesRepo>,
}

impl LocalLedger {
    pub fn new(repo: Arc<dyn VotesRepo>) -> Self {
        Self { repo }
    }

    pub async fn record_action(
        &self,
        actor_id: ActorId,
        subject_id: SubjectId,
        target_id: TargetId,
    ) -> Result<VoteRecord, LedgerError> {
        let vote = NewVote {
            actor_id,
            subject_id,
            target_id,
            created_at: OffsetDateTime::now_utc(),
        };

        match self.repo.insert_vote(vote).await {
            Ok(record) => Ok(record),
            Err(RepoError::Duplicate { .. }) => Err(LedgerError::AlreadyRecorded {
                actor_id,
                subject_id,
            }),
            Err(err) => {
                error!(
                    target = "matchday::ledger",
                    actor_id,
                    subject_id,
                    target_id,
                    error = %err,
                    "failed to record vote"
                );
                Err(LedgerError::Storage(err))
            }
        }
    }

    pub async fn list_actions_by(&self, actor_id: ActorId) -> Result<Vec<VoteRecord>, LedgerError> {
        Ok(self.repo.list_votes_by_actor(actor_id).await?)
    }

    pub async fn count_actions_by(
        &self,
        subject_id: SubjectId,
    ) -> Result<BTreeMap<TargetId, i64>, LedgerError> {
        let tallies = self.repo.count_votes_by_subject(subject_id).await?;
        Ok(tallies
            .into_iter()
            .map(|tally| (tally.target_id, tally.votes))
            .collect())
    }

    pub async fn total_actions(&self) -> Result<i64, LedgerError> {
        Ok(self.repo.count_votes().await?)
    }

    /// Administrative purge. `None` clears the whole ledger.
    pub async fn purge(&self, actor_id: Option<ActorId>) -> Result<u64, LedgerError> {
        let removed = self.repo.purge_votes(actor_id).await?;
        info!(
            target = "matchday::ledger",
            actor_id = actor_id.unwrap_or_default(),
            scope = if actor_id.is_some() { "actor" } else { "all" },
            removed,
            "purged votes"
        );
        Ok(removed)
    }
}
