use sqlx::{query, query_as, query_scalar};
use time::OffsetDateTime;

use crate::application::repos::{NewVote, RepoError, VotesRepo};
use crate::domain::entities::{ActorId, SubjectId, TargetTally, VoteRecord};

use super::{SqliteRepositories, map_sqlx_error};

#[derive(Debug, sqlx::FromRow)]
struct VoteRow {
    id: i64,
    actor_id: i64,
    subject_id: i64,
    target_id: i64,
    created_at: OffsetDateTime,
}

impl From<VoteRow> for VoteRecord {
    fn from(row: VoteRow) -> Self {
        VoteRecord {
            id: row.id,
            actor_id: row.actor_id,
            subject_id: row.subject_id,
            target_id: row.target_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TallyRow {
    target_id: i64,
    votes: i64,
}

#[async_trait::async_trait]
impl VotesRepo for SqliteRepositories {
    async fn insert_vote(&self, vote: NewVote) -> Result<VoteRecord, RepoError> {
        let row = query_as::<_, VoteRow>(
            r#"
            INSERT INTO votes (actor_id, subject_id, target_id, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, actor_id, subject_id, target_id, created_at
            "#,
        )
        .bind(vote.actor_id)
        .bind(vote.subject_id)
        .bind(vote.target_id)
        .bind(vote.created_at)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn list_votes_by_actor(&self, actor_id: ActorId) -> Result<Vec<VoteRecord>, RepoError> {
        let rows = query_as::<_, VoteRow>(
            r#"
            SELECT id, actor_id, subject_id, target_id, created_at
            FROM votes
            WHERE actor_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(actor_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(VoteRecord::from).collect())
    }

    async fn count_votes_by_subject(
        &self,
        subject_id: SubjectId,
    ) -> Result<Vec<TargetTally>, RepoError> {
        let rows = query_as::<_, TallyRow>(
            r#"
            SELECT target_id, COUNT(*) AS votes
            FROM votes
            WHERE subject_id = ?
            GROUP BY target_id
            ORDER BY votes DESC, target_id ASC
            "#,
        )
        .bind(subject_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| TargetTally {
                target_id: row.target_id,
                votes: row.votes,
            })
            .collect())
    }

    async fn count_votes(&self) -> Result<i64, RepoError> {
        query_scalar::<_, i64>("SELECT COUNT(*) FROM votes")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn purge_votes(&self, actor_id: Option<ActorId>) -> Result<u64, RepoError> {
        let result = match actor_id {
            Some(actor_id) => {
                query("DELETE FROM votes WHERE actor_id = ?")
                    .bind(actor_id)
                    .execute(self.pool())
                    .await
            }
            None => query("DELETE FROM votes").execute(self.pool()).await,
        }
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}
