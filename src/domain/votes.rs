//! Vote input as it arrives from callers, and its validated form.

use serde::Deserialize;

use super::entities::{ActorId, SubjectId, TargetId};
use super::error::DomainError;

/// Identifier as submitted by a form or a JSON client: either a number or numeric text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IdentifierInput {
    Number(i64),
    Text(String),
}

impl IdentifierInput {
    fn resolve(&self, field: &'static str) -> Result<i64, DomainError> {
        let value = match self {
            IdentifierInput::Number(value) => *value,
            IdentifierInput::Text(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(DomainError::missing(field));
                }
                trimmed
                    .parse::<i64>()
                    .map_err(|_| DomainError::invalid(field, raw.clone()))?
            }
        };

        if value <= 0 {
            return Err(DomainError::invalid(field, value.to_string()));
        }
        Ok(value)
    }
}

impl From<i64> for IdentifierInput {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

/// A write request before validation.
#[derive(Debug, Clone, Default)]
pub struct CastVoteCommand {
    pub actor_id: Option<ActorId>,
    pub subject_id: Option<IdentifierInput>,
    pub target_id: Option<IdentifierInput>,
}

impl CastVoteCommand {
    pub fn new(actor_id: ActorId, subject_id: SubjectId, target_id: TargetId) -> Self {
        Self {
            actor_id: Some(actor_id),
            subject_id: Some(subject_id.into()),
            target_id: Some(target_id.into()),
        }
    }

    pub fn validate(&self) -> Result<ValidVote, DomainError> {
        let actor_id = match self.actor_id {
            Some(id) if id > 0 => id,
            Some(id) => return Err(DomainError::invalid("actor_id", id.to_string())),
            None => return Err(DomainError::missing("actor_id")),
        };
        let subject_id = self
            .subject_id
            .as_ref()
            .ok_or(DomainError::missing("match_id"))?
            .resolve("match_id")?;
        let target_id = self
            .target_id
            .as_ref()
            .ok_or(DomainError::missing("player_id"))?
            .resolve("player_id")?;

        Ok(ValidVote {
            actor_id,
            subject_id,
            target_id,
        })
    }
}

/// A vote whose identifiers are present and positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidVote {
    pub actor_id: ActorId,
    pub subject_id: SubjectId,
    pub target_id: TargetId,
}
