//! Decoding of match service bodies into catalog records.
//!
//! List resources arrive wrapped (`{"players": [...]}`); a bare array is accepted too.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::entities::{GlobalStats, MatchRecord, PlayerRecord, TargetTally};
use crate::domain::error::DomainError;

pub const PLAYERS_KEY: &str = "/players";
pub const MATCHES_KEY: &str = "/matches";
pub const STATS_KEY: &str = "/stats";
pub const MATCH_STATS_KEY: &str = "/match-stats";

pub fn votes_key(subject_id: i64) -> String {
    format!("/votes/{subject_id}")
}

pub fn players_from(payload: &Value) -> Result<Vec<PlayerRecord>, DomainError> {
    list_from(payload, "players")
}

pub fn matches_from(payload: &Value) -> Result<Vec<MatchRecord>, DomainError> {
    list_from(payload, "matches")
}

pub fn tallies_from(payload: &Value) -> Result<Vec<TargetTally>, DomainError> {
    list_from(payload, "votes")
}

pub fn stats_from(payload: &Value) -> Result<GlobalStats, DomainError> {
    if !payload.is_object() {
        return Err(DomainError::malformed("stats must be a JSON object"));
    }
    serde_json::from_value(payload.clone())
        .map_err(|err| DomainError::malformed(format!("stats: {err}")))
}

fn list_from<T: DeserializeOwned>(payload: &Value, field: &str) -> Result<Vec<T>, DomainError> {
    let items = match payload {
        Value::Array(_) => payload,
        Value::Object(map) => map
            .get(field)
            .ok_or_else(|| DomainError::malformed(format!("missing `{field}`")))?,
        _ => {
            return Err(DomainError::malformed(format!(
                "`{field}` body must be an object or an array"
            )));
        }
    };

    serde_json::from_value(items.clone())
        .map_err(|err| DomainError::malformed(format!("{field}: {err}")))
}
