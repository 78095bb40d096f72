//! Read path: response cache first, then the match service, then the local mirror and
//! ledger when the service cannot answer.

use std::{collections::HashMap, sync::Arc};

use serde::Serialize;
use serde_json::{Value, json};
use time::OffsetDateTime;
use tracing::{error, warn};

use crate::application::ledger::{LedgerError, LocalLedger};
use crate::application::mirror::{AggregateMirror, CatalogBatch};
use crate::application::payload::{
    MATCH_STATS_KEY, MATCHES_KEY, PLAYERS_KEY, STATS_KEY, matches_from, players_from,
    stats_from, tallies_from, votes_key,
};
use crate::application::remote::{RemoteCallOutcome, RemoteService};
use crate::cache::{CacheConfig, CacheOrigin, CacheRead, ResponseCache};
use crate::domain::entities::{
    ActorId, GlobalStats, MatchRecord, PlayerRecord, SubjectId, TargetTally,
};
use crate::domain::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TallySource {
    Remote,
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    pub match_id: SubjectId,
    pub votes: Vec<TargetTally>,
    pub source: TallySource,
}

/// One of the actor's votes joined with catalog names from the mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteHistoryEntry {
    pub match_id: SubjectId,
    pub player_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub player_name: Option<String>,
    pub position: Option<String>,
    pub match_label: Option<String>,
    pub match_date: Option<String>,
}

#[derive(Clone)]
pub struct CatalogService {
    remote: Arc<dyn RemoteService>,
    cache: Arc<ResponseCache<Value>>,
    mirror: Arc<AggregateMirror>,
    ledger: Arc<LocalLedger>,
    config: CacheConfig,
}

impl CatalogService {
    pub fn new(
        remote: Arc<dyn RemoteService>,
        cache: Arc<ResponseCache<Value>>,
        mirror: Arc<AggregateMirror>,
        ledger: Arc<LocalLedger>,
        config: CacheConfig,
    ) -> Self {
        Self {
            remote,
            cache,
            mirror,
            ledger,
            config,
        }
    }

    pub async fn players(&self) -> Vec<PlayerRecord> {
        let read = self.read(PLAYERS_KEY, self.config.ttl, players_from).await;
        if read.origin == CacheOrigin::Default {
            return self.mirror.players().await.unwrap_or_else(|err| {
                error!(target = "matchday::catalog", error = %err, "mirror players unavailable");
                Vec::new()
            });
        }

        let players = decode_or_empty(PLAYERS_KEY, players_from(&read.value));
        if read.origin == CacheOrigin::Fetched {
            self.refresh_mirror(CatalogBatch::Players(players.clone()))
                .await;
        }
        players
    }

    pub async fn matches(&self) -> Vec<MatchRecord> {
        let read = self.read(MATCHES_KEY, self.config.ttl, matches_from).await;
        if read.origin == CacheOrigin::Default {
            return self.mirror.matches().await.unwrap_or_else(|err| {
                error!(target = "matchday::catalog", error = %err, "mirror matches unavailable");
                Vec::new()
            });
        }

        let matches = decode_or_empty(MATCHES_KEY, matches_from(&read.value));
        if read.origin == CacheOrigin::Fetched {
            self.refresh_mirror(CatalogBatch::Matches(matches.clone()))
                .await;
        }
        matches
    }

    pub async fn global_stats(&self) -> GlobalStats {
        let read = self.read(STATS_KEY, self.config.stats_ttl, stats_from).await;
        match read.origin {
            CacheOrigin::Default => self.local_stats().await,
            _ => stats_from(&read.value).unwrap_or_default(),
        }
    }

    /// Per-match statistics, passed through without interpretation.
    pub async fn match_stats(&self) -> Value {
        let read = self
            .read(MATCH_STATS_KEY, self.config.ttl, |payload: &Value| {
                if payload.is_object() {
                    Ok(())
                } else {
                    Err(DomainError::malformed("match stats must be a JSON object"))
                }
            })
            .await;

        match read.origin {
            CacheOrigin::Default => json!({ "matches": [] }),
            _ => read.value,
        }
    }

    pub async fn vote_tally(&self, subject_id: SubjectId) -> VoteTally {
        let key = votes_key(subject_id);
        let read = self.read(&key, self.config.ttl, tallies_from).await;

        if read.origin != CacheOrigin::Default {
            let mut votes = decode_or_empty(&key, tallies_from(&read.value));
            sort_tallies(&mut votes);
            return VoteTally {
                match_id: subject_id,
                votes,
                source: TallySource::Remote,
            };
        }

        let votes = match self.ledger.count_actions_by(subject_id).await {
            Ok(counts) => {
                let mut votes: Vec<TargetTally> = counts
                    .into_iter()
                    .map(|(target_id, votes)| TargetTally { target_id, votes })
                    .collect();
                sort_tallies(&mut votes);
                votes
            }
            Err(err) => {
                error!(
                    target = "matchday::catalog",
                    match_id = subject_id,
                    error = %err,
                    "local tally unavailable"
                );
                Vec::new()
            }
        };

        VoteTally {
            match_id: subject_id,
            votes,
            source: TallySource::Local,
        }
    }

    /// The actor's votes, newest first, with player and match names from the mirror.
    pub async fn voting_history(
        &self,
        actor_id: ActorId,
    ) -> Result<Vec<VoteHistoryEntry>, LedgerError> {
        let votes = self.ledger.list_actions_by(actor_id).await?;
        if votes.is_empty() {
            return Ok(Vec::new());
        }

        if !self.mirror.ensure_populated().await {
            warn!(
                target = "matchday::catalog",
                actor_id,
                "catalog mirror incomplete, history names may be missing"
            );
        }

        let players: HashMap<i64, PlayerRecord> = self
            .mirror
            .players()
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|player| (player.id, player))
            .collect();
        let matches: HashMap<i64, MatchRecord> = self
            .mirror
            .matches()
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|record| (record.id, record))
            .collect();

        Ok(votes
            .into_iter()
            .map(|vote| {
                let player = players.get(&vote.target_id);
                let record = matches.get(&vote.subject_id);
                VoteHistoryEntry {
                    match_id: vote.subject_id,
                    player_id: vote.target_id,
                    created_at: vote.created_at,
                    player_name: player.map(|p| p.name.clone()),
                    position: player.map(|p| p.position.clone()),
                    match_label: record.map(MatchRecord::label),
                    match_date: record.map(|m| m.date.clone()),
                }
            })
            .collect())
    }

    /// Cached read of `key`. Bodies that do not pass `check` are treated as a protocol
    /// failure so they never enter the cache.
    async fn read<T, C>(&self, key: &str, ttl: std::time::Duration, check: C) -> CacheRead<Value>
    where
        C: FnOnce(&Value) -> Result<T, DomainError> + Send,
    {
        let remote = Arc::clone(&self.remote);
        let resource = key.to_string();
        self.cache
            .get_or_fetch(key, ttl, Value::Null, move || async move {
                let payload = remote.fetch(&resource).await.into_payload()?;
                check(&payload)
                    .map_err(|err| RemoteCallOutcome::ProtocolError(err.to_string()))?;
                Ok::<_, RemoteCallOutcome>(payload)
            })
            .await
    }

    async fn refresh_mirror(&self, batch: CatalogBatch) {
        if batch.is_empty() {
            return;
        }
        if let Err(err) = self.mirror.upsert_many(&batch).await {
            error!(
                target = "matchday::catalog",
                error = %err,
                "failed to refresh catalog mirror"
            );
        }
    }

    async fn local_stats(&self) -> GlobalStats {
        let (players, matches) = match (self.mirror.players().await, self.mirror.matches().await) {
            (Ok(players), Ok(matches)) => (players.len() as i64, matches.len() as i64),
            _ => (0, 0),
        };
        let total_votes = self.ledger.total_actions().await.unwrap_or(0);

        GlobalStats {
            total_players: players,
            total_matches: matches,
            total_votes,
        }
    }
}

fn decode_or_empty<T>(key: &str, decoded: Result<Vec<T>, DomainError>) -> Vec<T> {
    decoded.unwrap_or_else(|err| {
        warn!(target = "matchday::catalog", key, error = %err, "cached body unreadable");
        Vec::new()
    })
}

fn sort_tallies(votes: &mut [TargetTally]) {
    votes.sort_by(|a, b| b.votes.cmp(&a.votes).then(a.target_id.cmp(&b.target_id)));
}
