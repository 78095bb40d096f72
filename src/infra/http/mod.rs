pub mod api;
mod middleware;

pub use api::{ApiState, build_api_router};
pub use middleware::RequestContext;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;

use crate::application::error::ErrorReport;
use crate::application::payload::STATS_KEY;

/// Full application router: health probe plus the JSON API, wrapped in request
/// context and response logging.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(state.clone())
        .merge(build_api_router(state))
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    database: bool,
    remote: bool,
}

async fn health(State(state): State<ApiState>) -> Response {
    let database = state.db.health_check().await;
    let remote = state.remote.fetch_once(STATS_KEY).await.is_success();

    match database {
        Ok(()) => {
            let body = HealthBody {
                status: if remote { "ok" } else { "degraded" },
                database: true,
                remote,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => {
            let body = HealthBody {
                status: "unavailable",
                database: false,
                remote,
            };
            let mut response = (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response();
            ErrorReport::from_error("infra::http::health", StatusCode::SERVICE_UNAVAILABLE, &err)
                .attach(&mut response);
            response
        }
    }
}
