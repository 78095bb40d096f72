#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use matchday::application::{
    catalog::CatalogService,
    ledger::LocalLedger,
    mirror::AggregateMirror,
    remote::{RemoteCallOutcome, RemoteService},
    repos::{MirrorRepo, VotesRepo},
    votes::VoteService,
};
use matchday::cache::{CacheConfig, ResponseCache};
use matchday::infra::db::SqliteRepositories;
use serde_json::{Value, json};

/// In-process stand-in for the match service. Every resource answers with a fixed
/// outcome until re-scripted; unscripted resources are unreachable.
#[derive(Default)]
pub struct ScriptedRemote {
    reads: Mutex<HashMap<String, RemoteCallOutcome>>,
    write: Mutex<Option<RemoteCallOutcome>>,
    read_log: Mutex<Vec<String>>,
    single_attempt_log: Mutex<Vec<String>>,
    write_log: Mutex<Vec<(String, Value)>>,
}

impl ScriptedRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn answer(&self, resource: &str, outcome: RemoteCallOutcome) {
        self.reads
            .lock()
            .unwrap()
            .insert(resource.to_string(), outcome);
    }

    pub fn answer_json(&self, resource: &str, body: Value) {
        self.answer(resource, RemoteCallOutcome::Success(body));
    }

    pub fn answer_writes(&self, outcome: RemoteCallOutcome) {
        *self.write.lock().unwrap() = Some(outcome);
    }

    /// Every read and write fails as if the service were down.
    pub fn go_down(&self) {
        self.reads.lock().unwrap().clear();
        *self.write.lock().unwrap() = Some(RemoteCallOutcome::ConnectionFailure);
    }

    pub fn reads_of(&self, resource: &str) -> usize {
        self.read_log
            .lock()
            .unwrap()
            .iter()
            .filter(|logged| logged.as_str() == resource)
            .count()
    }

    /// Reads made through `fetch_once`; these are also counted by `reads_of`.
    pub fn single_attempt_reads_of(&self, resource: &str) -> usize {
        self.single_attempt_log
            .lock()
            .unwrap()
            .iter()
            .filter(|logged| logged.as_str() == resource)
            .count()
    }

    pub fn writes(&self) -> Vec<(String, Value)> {
        self.write_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteService for ScriptedRemote {
    async fn fetch(&self, resource: &str) -> RemoteCallOutcome {
        self.read_log.lock().unwrap().push(resource.to_string());
        self.reads
            .lock()
            .unwrap()
            .get(resource)
            .cloned()
            .unwrap_or(RemoteCallOutcome::ConnectionFailure)
    }

    async fn fetch_once(&self, resource: &str) -> RemoteCallOutcome {
        self.single_attempt_log
            .lock()
            .unwrap()
            .push(resource.to_string());
        self.fetch(resource).await
    }

    async fn submit(&self, resource: &str, payload: &Value) -> RemoteCallOutcome {
        self.write_log
            .lock()
            .unwrap()
            .push((resource.to_string(), payload.clone()));
        self.write
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(RemoteCallOutcome::ConnectionFailure)
    }
}

/// Services wired the way the binary wires them, over in-memory SQLite.
pub struct Harness {
    pub remote: Arc<ScriptedRemote>,
    pub repos: Arc<SqliteRepositories>,
    pub cache: Arc<ResponseCache<Value>>,
    pub ledger: Arc<LocalLedger>,
    pub mirror: Arc<AggregateMirror>,
    pub votes: Arc<VoteService>,
    pub catalog: Arc<CatalogService>,
}

impl Harness {
    pub async fn new(check_eligibility: bool) -> Self {
        let remote = ScriptedRemote::new();
        let repos = Arc::new(
            SqliteRepositories::connect_in_memory()
                .await
                .expect("in-memory database"),
        );
        let config = CacheConfig::default();
        let cache = Arc::new(ResponseCache::new(&config));

        let dyn_remote: Arc<dyn RemoteService> = remote.clone();
        let votes_repo: Arc<dyn VotesRepo> = repos.clone();
        let mirror_repo: Arc<dyn MirrorRepo> = repos.clone();

        let ledger = Arc::new(LocalLedger::new(votes_repo));
        let mirror = Arc::new(AggregateMirror::new(mirror_repo, dyn_remote.clone()));
        let votes = Arc::new(VoteService::new(
            dyn_remote.clone(),
            ledger.clone(),
            cache.clone(),
            check_eligibility,
            config.ttl,
        ));
        let catalog = Arc::new(CatalogService::new(
            dyn_remote,
            cache.clone(),
            mirror.clone(),
            ledger.clone(),
            config,
        ));

        Self {
            remote,
            repos,
            cache,
            ledger,
            mirror,
            votes,
            catalog,
        }
    }
}

pub fn players_body() -> Value {
    json!({
        "players": [
            {"id": 100, "name": "Alves", "position": "GK", "team_id": 1, "votes": 4},
            {"id": 200, "name": "Brandt", "position": "FW", "team_id": 2, "votes": 7}
        ]
    })
}

pub fn matches_body(active: bool) -> Value {
    json!({
        "matches": [
            {
                "id": 10,
                "team1": "Reds",
                "team2": "Blues",
                "date": "2024-05-01",
                "isActive": if active { 1 } else { 0 }
            }
        ]
    })
}

pub fn accepted() -> RemoteCallOutcome {
    RemoteCallOutcome::Success(json!({"status": "success", "message": "Vote recorded"}))
}
