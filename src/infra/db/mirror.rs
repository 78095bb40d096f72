use sqlx::{query, query_as, query_scalar};
use time::OffsetDateTime;

use crate::application::repos::{MirrorRepo, RepoError};
use crate::domain::entities::{MatchRecord, PlayerRecord};

use super::{SqliteRepositories, map_sqlx_error};

#[derive(Debug, sqlx::FromRow)]
struct PlayerRow {
    id: i64,
    name: String,
    position: String,
    team_id: Option<i64>,
    votes: i64,
}

impl From<PlayerRow> for PlayerRecord {
    fn from(row: PlayerRow) -> Self {
        PlayerRecord {
            id: row.id,
            name: row.name,
            position: row.position,
            team_id: row.team_id,
            votes: row.votes,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MatchRow {
    id: i64,
    team1: String,
    team2: String,
    match_date: String,
    is_active: bool,
    team1_formation: Option<String>,
    team2_formation: Option<String>,
}

impl From<MatchRow> for MatchRecord {
    fn from(row: MatchRow) -> Self {
        MatchRecord {
            id: row.id,
            team1: row.team1,
            team2: row.team2,
            date: row.match_date,
            is_active: row.is_active,
            team1_formation: row.team1_formation,
            team2_formation: row.team2_formation,
        }
    }
}

const PLAYER_COLUMNS: &str = "id, name, position, team_id, votes";
const MATCH_COLUMNS: &str =
    "id, team1, team2, match_date, is_active, team1_formation, team2_formation";

#[async_trait::async_trait]
impl MirrorRepo for SqliteRepositories {
    async fn upsert_players(&self, players: &[PlayerRecord]) -> Result<u64, RepoError> {
        let synced_at = OffsetDateTime::now_utc();
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;
        let mut written = 0;

        for player in players {
            let result = query(
                r#"
                INSERT INTO mirror_players (id, name, position, team_id, votes, synced_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT (id) DO UPDATE SET
                    name = excluded.name,
                    position = excluded.position,
                    team_id = excluded.team_id,
                    votes = excluded.votes,
                    synced_at = excluded.synced_at
                "#,
            )
            .bind(player.id)
            .bind(&player.name)
            .bind(&player.position)
            .bind(player.team_id)
            .bind(player.votes)
            .bind(synced_at)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
            written += result.rows_affected();
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(written)
    }

    async fn upsert_matches(&self, matches: &[MatchRecord]) -> Result<u64, RepoError> {
        let synced_at = OffsetDateTime::now_utc();
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;
        let mut written = 0;

        for record in matches {
            let result = query(
                r#"
                INSERT INTO mirror_matches
                    (id, team1, team2, match_date, is_active, team1_formation, team2_formation, synced_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (id) DO UPDATE SET
                    team1 = excluded.team1,
                    team2 = excluded.team2,
                    match_date = excluded.match_date,
                    is_active = excluded.is_active,
                    team1_formation = excluded.team1_formation,
                    team2_formation = excluded.team2_formation,
                    synced_at = excluded.synced_at
                "#,
            )
            .bind(record.id)
            .bind(&record.team1)
            .bind(&record.team2)
            .bind(&record.date)
            .bind(record.is_active)
            .bind(&record.team1_formation)
            .bind(&record.team2_formation)
            .bind(synced_at)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
            written += result.rows_affected();
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(written)
    }

    async fn count_mirror_rows(&self) -> Result<i64, RepoError> {
        query_scalar::<_, i64>(
            "SELECT (SELECT COUNT(*) FROM mirror_players) + (SELECT COUNT(*) FROM mirror_matches)",
        )
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_players(&self) -> Result<Vec<PlayerRecord>, RepoError> {
        let rows = query_as::<_, PlayerRow>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM mirror_players ORDER BY votes DESC, id ASC"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PlayerRecord::from).collect())
    }

    async fn list_matches(&self) -> Result<Vec<MatchRecord>, RepoError> {
        let rows = query_as::<_, MatchRow>(&format!(
            "SELECT {MATCH_COLUMNS} FROM mirror_matches ORDER BY match_date DESC, id DESC"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(MatchRecord::from).collect())
    }

    async fn find_player(&self, id: i64) -> Result<Option<PlayerRecord>, RepoError> {
        let row = query_as::<_, PlayerRow>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM mirror_players WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PlayerRecord::from))
    }

    async fn find_match(&self, id: i64) -> Result<Option<MatchRecord>, RepoError> {
        let row = query_as::<_, MatchRow>(&format!(
            "SELECT {MATCH_COLUMNS} FROM mirror_matches WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(MatchRecord::from))
    }
}
