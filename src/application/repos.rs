//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::entities::{
    ActorId, MatchRecord, PlayerRecord, SubjectId, TargetId, TargetTally, VoteRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct NewVote {
    pub actor_id: ActorId,
    pub subject_id: SubjectId,
    pub target_id: TargetId,
    pub created_at: OffsetDateTime,
}

/// Durable vote storage. Uniqueness of `(actor_id, subject_id)` is enforced by the store
/// and surfaces as [`RepoError::Duplicate`].
#[async_trait]
pub trait VotesRepo: Send + Sync {
    async fn insert_vote(&self, vote: NewVote) -> Result<VoteRecord, RepoError>;

    /// Newest first.
    async fn list_votes_by_actor(&self, actor_id: ActorId) -> Result<Vec<VoteRecord>, RepoError>;

    async fn count_votes_by_subject(
        &self,
        subject_id: SubjectId,
    ) -> Result<Vec<TargetTally>, RepoError>;

    async fn count_votes(&self) -> Result<i64, RepoError>;

    /// Delete every vote, or only those cast by `actor_id`. Returns the number removed.
    async fn purge_votes(&self, actor_id: Option<ActorId>) -> Result<u64, RepoError>;
}

/// Local copy of the match service catalog.
#[async_trait]
pub trait MirrorRepo: Send + Sync {
    /// Insert or replace by id. Returns the number of rows written.
    async fn upsert_players(&self, players: &[PlayerRecord]) -> Result<u64, RepoError>;

    async fn upsert_matches(&self, matches: &[MatchRecord]) -> Result<u64, RepoError>;

    /// Players and matches combined.
    async fn count_mirror_rows(&self) -> Result<i64, RepoError>;

    async fn list_players(&self) -> Result<Vec<PlayerRecord>, RepoError>;

    async fn list_matches(&self) -> Result<Vec<MatchRecord>, RepoError>;

    async fn find_player(&self, id: i64) -> Result<Option<PlayerRecord>, RepoError>;

    async fn find_match(&self, id: i64) -> Result<Option<MatchRecord>, RepoError>;
}
