use serde::{Deserialize, Serialize};

use crate::application::catalog::VoteHistoryEntry;
use crate::domain::entities::{MatchRecord, PlayerRecord};
use crate::domain::votes::IdentifierInput;

/// Vote request. Identifiers may arrive as numbers or numeric strings; missing ones
/// are reported by validation rather than by the extractor.
#[derive(Debug, Default, Deserialize)]
pub struct VoteRequest {
    #[serde(default)]
    pub match_id: Option<IdentifierInput>,
    #[serde(default)]
    pub player_id: Option<IdentifierInput>,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub status: &'static str,
    pub degraded: bool,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PlayersResponse {
    pub players: Vec<PlayerRecord>,
}

#[derive(Debug, Serialize)]
pub struct MatchesResponse {
    pub matches: Vec<MatchRecord>,
}

#[derive(Debug, Serialize)]
pub struct VoteHistoryResponse {
    pub votes: Vec<VoteHistoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct MatchChangeResponse {
    pub status: &'static str,
    pub message: String,
}
