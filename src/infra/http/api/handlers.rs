use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::admin::AdminError;
use crate::application::ledger::LedgerError;
use crate::application::votes::VoteOutcome;
use crate::domain::entities::SubjectId;
use crate::domain::votes::CastVoteCommand;

use super::error::{ApiError, codes};
use super::guards::Actor;
use super::models::*;
use super::state::ApiState;

pub async fn list_players(State(state): State<ApiState>) -> impl IntoResponse {
    Json(PlayersResponse {
        players: state.catalog.players().await,
    })
}

pub async fn list_matches(State(state): State<ApiState>) -> impl IntoResponse {
    Json(MatchesResponse {
        matches: state.catalog.matches().await,
    })
}

pub async fn global_stats(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.catalog.global_stats().await)
}

pub async fn match_stats(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.catalog.match_stats().await)
}

pub async fn vote_tally(
    State(state): State<ApiState>,
    Path(match_id): Path<SubjectId>,
) -> Result<impl IntoResponse, ApiError> {
    if match_id <= 0 {
        return Err(ApiError::bad_request(
            "match id must be positive",
            Some(match_id.to_string()),
        ));
    }
    Ok(Json(state.catalog.vote_tally(match_id).await))
}

pub async fn cast_vote(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<VoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = CastVoteCommand {
        actor_id: Some(actor.id),
        subject_id: body.match_id,
        target_id: body.player_id,
    };

    match state.votes.cast_vote(&command).await {
        VoteOutcome::Success { degraded } => Ok(Json(VoteResponse {
            status: "success",
            degraded,
            message: if degraded {
                "vote recorded locally, it will reach the match service later"
            } else {
                "vote recorded"
            },
        })),
        other => Err(outcome_to_api(other)),
    }
}

pub async fn voting_history(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse, ApiError> {
    let votes = state
        .catalog
        .voting_history(actor.id)
        .await
        .map_err(ledger_to_api)?;
    Ok(Json(VoteHistoryResponse { votes }))
}

pub async fn close_match(
    State(state): State<ApiState>,
    Path(id): Path<SubjectId>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state.admin.close_match(id).await.map_err(admin_to_api)?;
    Ok(Json(MatchChangeResponse {
        status: "success",
        message,
    }))
}

pub async fn activate_match(
    State(state): State<ApiState>,
    Path(id): Path<SubjectId>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state.admin.activate_match(id).await.map_err(admin_to_api)?;
    Ok(Json(MatchChangeResponse {
        status: "success",
        message,
    }))
}

fn outcome_to_api(outcome: VoteOutcome) -> ApiError {
    match outcome {
        VoteOutcome::Success { .. } => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::VOTE_FAILED,
            "unexpected vote outcome",
            None,
        ),
        VoteOutcome::AlreadyRecorded => ApiError::new(
            StatusCode::CONFLICT,
            codes::ALREADY_VOTED,
            "You have already voted in this match",
            None,
        ),
        VoteOutcome::Rejected { reason } => ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            codes::REJECTED,
            "Vote rejected by the match service",
            Some(reason),
        ),
        VoteOutcome::Invalid { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid vote",
            Some(message),
        ),
        VoteOutcome::Failure { message } => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::VOTE_FAILED,
            "Vote could not be recorded",
            Some(message),
        ),
    }
}

fn ledger_to_api(err: LedgerError) -> ApiError {
    ApiError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        codes::STORAGE,
        "Voting history unavailable",
        Some(err.to_string()),
    )
}

fn admin_to_api(err: AdminError) -> ApiError {
    match err {
        AdminError::InvalidMatch(_) => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid match id",
            Some(err.to_string()),
        ),
        AdminError::Unavailable(_) => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::REMOTE_UNAVAILABLE,
            "Match service unavailable",
            Some(err.to_string()),
        ),
        AdminError::Rejected(reason) => ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            codes::REJECTED,
            "Match change rejected",
            Some(reason),
        ),
    }
}
