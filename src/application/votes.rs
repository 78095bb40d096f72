//! Vote write path: try the match service first, fall back to the local ledger when it
//! is unreachable, and report exactly one outcome per request.

use std::{sync::Arc, time::Duration};

use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use crate::application::ledger::{LedgerError, LocalLedger};
use crate::application::payload::{
    MATCH_STATS_KEY, MATCHES_KEY, PLAYERS_KEY, STATS_KEY, matches_from, votes_key,
};
use crate::application::remote::{RemoteCallOutcome, RemoteService, rejection_message};
use crate::cache::{CacheOrigin, ResponseCache};
use crate::domain::votes::{CastVoteCommand, ValidVote};

const VOTE_RESOURCE: &str = "/vote";

/// What the caller is told about a vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Recorded. `degraded` means only the local ledger has it.
    Success { degraded: bool },
    /// The actor already voted in this match.
    AlreadyRecorded,
    /// The match service refused the vote.
    Rejected { reason: String },
    /// Neither the match service nor the local ledger could take the vote.
    Failure { message: String },
    /// The request itself was malformed; nothing was attempted.
    Invalid { message: String },
}

impl VoteOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            VoteOutcome::Success { degraded: false } => "success",
            VoteOutcome::Success { degraded: true } => "degraded",
            VoteOutcome::AlreadyRecorded => "already_recorded",
            VoteOutcome::Rejected { .. } => "rejected",
            VoteOutcome::Failure { .. } => "failure",
            VoteOutcome::Invalid { .. } => "invalid",
        }
    }

    fn changed_aggregates(&self) -> bool {
        matches!(self, VoteOutcome::Success { .. })
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Eligibility {
    Eligible,
    Ineligible(String),
    /// The check could not be completed; the write proceeds.
    Unknown,
}

#[derive(Debug, PartialEq, Eq)]
enum SubmitVerdict {
    Accepted,
    Unreachable,
    Refused(String),
}

impl From<RemoteCallOutcome> for SubmitVerdict {
    fn from(outcome: RemoteCallOutcome) -> Self {
        match outcome {
            RemoteCallOutcome::Success(payload) => match rejection_message(&payload) {
                Some(reason) => SubmitVerdict::Refused(reason),
                None => SubmitVerdict::Accepted,
            },
            RemoteCallOutcome::ConnectionFailure | RemoteCallOutcome::Timeout => {
                SubmitVerdict::Unreachable
            }
            RemoteCallOutcome::HttpError(status) => {
                SubmitVerdict::Refused(format!("match service answered with status {status}"))
            }
            RemoteCallOutcome::ProtocolError(detail) => {
                SubmitVerdict::Refused(format!("unreadable match service response: {detail}"))
            }
        }
    }
}

#[derive(Clone)]
pub struct VoteService {
    remote: Arc<dyn RemoteService>,
    ledger: Arc<LocalLedger>,
    cache: Arc<ResponseCache<Value>>,
    check_eligibility: bool,
    matches_ttl: Duration,
}

impl VoteService {
    pub fn new(
        remote: Arc<dyn RemoteService>,
        ledger: Arc<LocalLedger>,
        cache: Arc<ResponseCache<Value>>,
        check_eligibility: bool,
        matches_ttl: Duration,
    ) -> Self {
        Self {
            remote,
            ledger,
            cache,
            check_eligibility,
            matches_ttl,
        }
    }

    pub async fn cast_vote(&self, command: &CastVoteCommand) -> VoteOutcome {
        let outcome = match command.validate() {
            Ok(vote) => self.reconcile(vote).await,
            Err(err) => VoteOutcome::Invalid {
                message: err.to_string(),
            },
        };

        metrics::counter!("matchday_vote_total", "outcome" => outcome.label()).increment(1);
        outcome
    }

    async fn reconcile(&self, vote: ValidVote) -> VoteOutcome {
        if self.check_eligibility {
            match self.eligibility(vote.subject_id).await {
                Eligibility::Ineligible(reason) => {
                    info!(
                        target = "matchday::votes",
                        actor_id = vote.actor_id,
                        match_id = vote.subject_id,
                        reason = %reason,
                        "vote rejected before submission"
                    );
                    return VoteOutcome::Rejected { reason };
                }
                Eligibility::Eligible | Eligibility::Unknown => {}
            }
        }

        let payload = json!({
            "user_id": vote.actor_id,
            "match_id": vote.subject_id,
            "player_id": vote.target_id,
        });
        let verdict = SubmitVerdict::from(self.remote.submit(VOTE_RESOURCE, &payload).await);

        let outcome = match verdict {
            SubmitVerdict::Accepted => self.mirror_accepted(vote).await,
            SubmitVerdict::Unreachable => self.record_degraded(vote).await,
            SubmitVerdict::Refused(reason) => {
                info!(
                    target = "matchday::votes",
                    actor_id = vote.actor_id,
                    match_id = vote.subject_id,
                    reason = %reason,
                    "match service refused vote"
                );
                VoteOutcome::Rejected { reason }
            }
        };

        if outcome.changed_aggregates() {
            self.cache.invalidate(&[
                votes_key(vote.subject_id),
                STATS_KEY.to_string(),
                MATCH_STATS_KEY.to_string(),
                PLAYERS_KEY.to_string(),
            ]);
        }
        outcome
    }

    // Shares the catalog's `/matches` entry. A miss makes a single attempt.
    async fn eligibility(&self, subject_id: i64) -> Eligibility {
        let remote = Arc::clone(&self.remote);
        let read = self
            .cache
            .get_or_fetch(MATCHES_KEY, self.matches_ttl, Value::Null, move || async move {
                let payload = remote.fetch_once(MATCHES_KEY).await.into_payload()?;
                matches_from(&payload)
                    .map_err(|err| RemoteCallOutcome::ProtocolError(err.to_string()))?;
                Ok::<_, RemoteCallOutcome>(payload)
            })
            .await;

        if read.origin == CacheOrigin::Default {
            debug!(
                target = "matchday::votes",
                match_id = subject_id,
                "eligibility unknown, proceeding"
            );
            return Eligibility::Unknown;
        }

        let matches = match matches_from(&read.value) {
            Ok(matches) => matches,
            Err(err) => {
                warn!(
                    target = "matchday::votes",
                    error = %err,
                    "eligibility check got an unreadable match list"
                );
                return Eligibility::Unknown;
            }
        };

        match matches.iter().find(|record| record.id == subject_id) {
            None => Eligibility::Ineligible("match not found".to_string()),
            Some(record) if !record.is_active => {
                Eligibility::Ineligible("match is closed for voting".to_string())
            }
            Some(_) => Eligibility::Eligible,
        }
    }

    // The match service already has the vote; the ledger copy is best effort.
    async fn mirror_accepted(&self, vote: ValidVote) -> VoteOutcome {
        match self
            .ledger
            .record_action(vote.actor_id, vote.subject_id, vote.target_id)
            .await
        {
            Ok(_) | Err(LedgerError::AlreadyRecorded { .. }) => {}
            Err(LedgerError::Storage(err)) => {
                error!(
                    target = "matchday::votes",
                    actor_id = vote.actor_id,
                    match_id = vote.subject_id,
                    error = %err,
                    "vote accepted remotely but not mirrored locally"
                );
            }
        }
        VoteOutcome::Success { degraded: false }
    }

    async fn record_degraded(&self, vote: ValidVote) -> VoteOutcome {
        match self
            .ledger
            .record_action(vote.actor_id, vote.subject_id, vote.target_id)
            .await
        {
            Ok(record) => {
                warn!(
                    target = "matchday::votes",
                    vote_id = record.id,
                    actor_id = vote.actor_id,
                    match_id = vote.subject_id,
                    "match service unreachable, vote kept in local ledger only"
                );
                metrics::counter!("matchday_vote_degraded_total").increment(1);
                VoteOutcome::Success { degraded: true }
            }
            Err(LedgerError::AlreadyRecorded { .. }) => VoteOutcome::AlreadyRecorded,
            Err(LedgerError::Storage(err)) => VoteOutcome::Failure {
                message: format!("vote could not be stored: {err}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn status_error_body_is_refused() {
        let verdict = SubmitVerdict::from(RemoteCallOutcome::Success(json!({
            "status": "error",
            "message": "Player not found"
        })));
        assert_eq!(verdict, SubmitVerdict::Refused("Player not found".to_string()));
    }

    #[test]
    fn transport_failures_are_unreachable() {
        assert_eq!(
            SubmitVerdict::from(RemoteCallOutcome::Timeout),
            SubmitVerdict::Unreachable
        );
        assert_eq!(
            SubmitVerdict::from(RemoteCallOutcome::ConnectionFailure),
            SubmitVerdict::Unreachable
        );
    }

    #[test]
    fn http_errors_are_refused() {
        assert!(matches!(
            SubmitVerdict::from(RemoteCallOutcome::HttpError(500)),
            SubmitVerdict::Refused(_)
        ));
        assert_eq!(
            SubmitVerdict::from(RemoteCallOutcome::Success(json!({"status": "success"}))),
            SubmitVerdict::Accepted
        );
    }

    #[test]
    fn only_success_changes_aggregates() {
        assert!(VoteOutcome::Success { degraded: true }.changed_aggregates());
        assert!(!VoteOutcome::AlreadyRecorded.changed_aggregates());
        assert!(
            !VoteOutcome::Rejected {
                reason: "closed".into()
            }
            .changed_aggregates()
        );
    }
}
