pub mod error;
pub mod guards;
pub mod handlers;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

pub fn build_api_router(state: ApiState) -> Router {
    let public = Router::new()
        .route("/api/players", get(handlers::list_players))
        .route("/api/matches", get(handlers::list_matches))
        .route("/api/stats", get(handlers::global_stats))
        .route("/api/match-stats", get(handlers::match_stats))
        .route("/api/votes/{match_id}", get(handlers::vote_tally));

    let voter = Router::new()
        .route("/api/vote", post(handlers::cast_vote))
        .route("/api/profile/votes", get(handlers::voting_history))
        .route_layer(axum_middleware::from_fn(guards::require_actor));

    let admin = Router::new()
        .route(
            "/api/admin/matches/{id}/close",
            post(handlers::close_match),
        )
        .route(
            "/api/admin/matches/{id}/activate",
            post(handlers::activate_match),
        )
        .route_layer(axum_middleware::from_fn(guards::require_admin));

    public.merge(voter).merge(admin).with_state(state)
}
