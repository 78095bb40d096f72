//! Records shared between the ledger, the catalog mirror and the remote wire format.

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

/// Voter identity as asserted at the HTTP boundary.
pub type ActorId = i64;
/// The match a vote is cast for.
pub type SubjectId = i64;
/// The player a vote is cast for.
pub type TargetId = i64;

/// A vote persisted in the local ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteRecord {
    pub id: i64,
    pub actor_id: ActorId,
    #[serde(rename = "match_id")]
    pub subject_id: SubjectId,
    #[serde(rename = "player_id")]
    pub target_id: TargetId,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub team_id: Option<i64>,
    #[serde(default)]
    pub votes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: i64,
    pub team1: String,
    pub team2: String,
    #[serde(default)]
    pub date: String,
    #[serde(
        rename = "isActive",
        alias = "is_active",
        default,
        deserialize_with = "flexible_bool"
    )]
    pub is_active: bool,
    #[serde(default)]
    pub team1_formation: Option<String>,
    #[serde(default)]
    pub team2_formation: Option<String>,
}

impl MatchRecord {
    pub fn label(&self) -> String {
        format!("{} vs {}", self.team1, self.team2)
    }
}

/// Site-wide counters served on the landing page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalStats {
    #[serde(default)]
    pub total_players: i64,
    #[serde(default)]
    pub total_matches: i64,
    #[serde(default)]
    pub total_votes: i64,
}

/// Number of votes one player received in one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetTally {
    #[serde(rename = "player_id")]
    pub target_id: TargetId,
    pub votes: i64,
}

// The match service has emitted both JSON booleans and 0/1 integers for this flag.
fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => value,
        Flag::Int(value) => value != 0,
        Flag::Text(value) => matches!(value.trim(), "1" | "true" | "TRUE" | "True"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_accepts_camel_case_and_integer_flag() {
        let record: MatchRecord = serde_json::from_str(
            r#"{"id":7,"team1":"Reds","team2":"Blues","date":"2024-05-01","isActive":1}"#,
        )
        .expect("match record");

        assert!(record.is_active);
        assert_eq!(record.team1_formation, None);
        assert_eq!(record.label(), "Reds vs Blues");
    }

    #[test]
    fn match_accepts_snake_case_flag() {
        let record: MatchRecord = serde_json::from_str(
            r#"{"id":7,"team1":"Reds","team2":"Blues","is_active":false}"#,
        )
        .expect("match record");

        assert!(!record.is_active);
        assert_eq!(record.date, "");
    }

    #[test]
    fn player_defaults_missing_counters() {
        let record: PlayerRecord =
            serde_json::from_str(r#"{"id":3,"name":"Nine"}"#).expect("player record");

        assert_eq!(record.votes, 0);
        assert_eq!(record.team_id, None);
    }
}
