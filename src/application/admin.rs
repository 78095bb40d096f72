use std::sync::Arc;

use serde_json::{Value, json};
use thiserror::Error;
use tracing::info;

use crate::application::payload::{MATCH_STATS_KEY, MATCHES_KEY};
use crate::application::remote::{RemoteCallOutcome, RemoteService, rejection_message};
use crate::cache::ResponseCache;
use crate::domain::entities::SubjectId;

const CLOSE_RESOURCE: &str = "/matches/close";
const ACTIVATE_RESOURCE: &str = "/matches/set-active";

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("match id must be positive, got {0}")]
    InvalidMatch(SubjectId),
    #[error("match service unavailable: {0}")]
    Unavailable(RemoteCallOutcome),
    #[error("match service refused the change: {0}")]
    Rejected(String),
}

/// Match lifecycle changes, forwarded to the match service.
#[derive(Clone)]
pub struct MatchAdminService {
    remote: Arc<dyn RemoteService>,
    cache: Arc<ResponseCache<Value>>,
}

impl MatchAdminService {
    pub fn new(remote: Arc<dyn RemoteService>, cache: Arc<ResponseCache<Value>>) -> Self {
        Self { remote, cache }
    }

    pub async fn close_match(&self, match_id: SubjectId) -> Result<String, AdminError> {
        self.change(
            match_id,
            CLOSE_RESOURCE,
            json!({ "match_id": match_id.to_string() }),
        )
        .await
    }

    pub async fn activate_match(&self, match_id: SubjectId) -> Result<String, AdminError> {
        self.change(
            match_id,
            ACTIVATE_RESOURCE,
            json!({ "match_id": match_id.to_string(), "is_active": "1" }),
        )
        .await
    }

    async fn change(
        &self,
        match_id: SubjectId,
        resource: &'static str,
        payload: Value,
    ) -> Result<String, AdminError> {
        if match_id <= 0 {
            return Err(AdminError::InvalidMatch(match_id));
        }

        let body = match self.remote.submit(resource, &payload).await {
            RemoteCallOutcome::Success(body) => body,
            outcome if outcome.is_unavailable() => return Err(AdminError::Unavailable(outcome)),
            outcome => return Err(AdminError::Rejected(outcome.to_string())),
        };
        if let Some(reason) = rejection_message(&body) {
            return Err(AdminError::Rejected(reason));
        }

        self.cache.invalidate(&[MATCHES_KEY, MATCH_STATS_KEY]);
        info!(target = "matchday::admin", match_id, resource, "match updated");

        Ok(body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("match updated")
            .to_string())
    }
}
