use std::sync::Arc;

use futures::future::join;
use tracing::{error, info, warn};

use crate::application::payload::{MATCHES_KEY, PLAYERS_KEY, matches_from, players_from};
use crate::application::remote::RemoteService;
use crate::application::repos::{MirrorRepo, RepoError};
use crate::domain::entities::{MatchRecord, PlayerRecord};

/// A homogeneous set of catalog records written to the mirror in one call.
#[derive(Debug, Clone)]
pub enum CatalogBatch {
    Players(Vec<PlayerRecord>),
    Matches(Vec<MatchRecord>),
}

impl CatalogBatch {
    pub fn len(&self) -> usize {
        match self {
            CatalogBatch::Players(records) => records.len(),
            CatalogBatch::Matches(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn kind(&self) -> &'static str {
        match self {
            CatalogBatch::Players(_) => "players",
            CatalogBatch::Matches(_) => "matches",
        }
    }
}

/// Local copy of the catalog, refreshed lazily. The match service stays authoritative;
/// the mirror only answers lookups when it is unreachable or when joining vote history.
#[derive(Clone)]
pub struct AggregateMirror {
    repo: Arc<dyn MirrorRepo>,
    remote: Arc<dyn RemoteService>,
}

impl AggregateMirror {
    pub fn new(repo: Arc<dyn MirrorRepo>, remote: Arc<dyn RemoteService>) -> Self {
        Self { repo, remote }
    }

    /// Populate from the match service when the mirror holds no rows at all.
    /// Returns whether the mirror is usable afterwards.
    pub async fn ensure_populated(&self) -> bool {
        match self.repo.count_mirror_rows().await {
            Ok(count) if count > 0 => true,
            Ok(_) => self.refresh().await,
            Err(err) => {
                error!(
                    target = "matchday::mirror",
                    error = %err,
                    "failed to inspect catalog mirror"
                );
                false
            }
        }
    }

    /// Pull the full catalog and upsert it, whatever the current row count.
    /// Returns true only when both players and matches were written.
    pub async fn refresh(&self) -> bool {
        let (players, matches) = join(
            self.remote.fetch(PLAYERS_KEY),
            self.remote.fetch(MATCHES_KEY),
        )
        .await;

        let players = players
            .into_payload()
            .map_err(|outcome| outcome.to_string())
            .and_then(|payload| players_from(&payload).map_err(|err| err.to_string()))
            .map(CatalogBatch::Players);
        let matches = matches
            .into_payload()
            .map_err(|outcome| outcome.to_string())
            .and_then(|payload| matches_from(&payload).map_err(|err| err.to_string()))
            .map(CatalogBatch::Matches);

        let mut complete = true;
        for batch in [players, matches] {
            match batch {
                Ok(batch) => {
                    if let Err(err) = self.upsert_many(&batch).await {
                        error!(
                            target = "matchday::mirror",
                            kind = batch.kind(),
                            error = %err,
                            "failed to write catalog mirror"
                        );
                        complete = false;
                    }
                }
                Err(reason) => {
                    warn!(
                        target = "matchday::mirror",
                        reason = %reason,
                        "catalog fetch failed, mirror left as is"
                    );
                    complete = false;
                }
            }
        }
        complete
    }

    /// Idempotent replace-by-id.
    pub async fn upsert_many(&self, batch: &CatalogBatch) -> Result<u64, RepoError> {
        let written = match batch {
            CatalogBatch::Players(players) => self.repo.upsert_players(players).await?,
            CatalogBatch::Matches(matches) => self.repo.upsert_matches(matches).await?,
        };
        info!(
            target = "matchday::mirror",
            kind = batch.kind(),
            written,
            "catalog mirror updated"
        );
        Ok(written)
    }

    pub async fn row_count(&self) -> Result<i64, RepoError> {
        self.repo.count_mirror_rows().await
    }

    pub async fn players(&self) -> Result<Vec<PlayerRecord>, RepoError> {
        self.repo.list_players().await
    }

    pub async fn matches(&self) -> Result<Vec<MatchRecord>, RepoError> {
        self.repo.list_matches().await
    }

    pub async fn player(&self, id: i64) -> Result<Option<PlayerRecord>, RepoError> {
        self.repo.find_player(id).await
    }

    pub async fn match_record(&self, id: i64) -> Result<Option<MatchRecord>, RepoError> {
        self.repo.find_match(id).await
    }
}
