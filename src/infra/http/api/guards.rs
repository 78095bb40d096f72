//! Boundary guards. Identity is asserted by the upstream auth proxy through headers;
//! nothing here verifies credentials.

use axum::{
    body::Body,
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::domain::entities::ActorId;

use super::error::ApiError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRole {
    Voter,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: ActorId,
    pub role: ActorRole,
}

impl Actor {
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let id = headers
            .get(ACTOR_ID_HEADER)?
            .to_str()
            .ok()?
            .trim()
            .parse::<ActorId>()
            .ok()
            .filter(|id| *id > 0)?;

        let role = match headers
            .get(ACTOR_ROLE_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            Some(value) if value.trim().eq_ignore_ascii_case("admin") => ActorRole::Admin,
            _ => ActorRole::Voter,
        };

        Some(Self { id, role })
    }
}

pub async fn require_actor(request: Request<Body>, next: Next) -> Response {
    match Actor::from_headers(request.headers()) {
        Some(actor) => run_as(actor, request, next).await,
        None => ApiError::unauthorized().into_response(),
    }
}

pub async fn require_admin(request: Request<Body>, next: Next) -> Response {
    match Actor::from_headers(request.headers()) {
        Some(actor) if actor.role == ActorRole::Admin => run_as(actor, request, next).await,
        Some(actor) => {
            let mut response = ApiError::forbidden().into_response();
            response.extensions_mut().insert(actor);
            response
        }
        None => ApiError::unauthorized().into_response(),
    }
}

async fn run_as(actor: Actor, mut request: Request<Body>, next: Next) -> Response {
    request.extensions_mut().insert(actor);
    let mut response = next.run(request).await;
    response.extensions_mut().insert(actor);
    response
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn actor_requires_a_positive_numeric_id() {
        assert_eq!(Actor::from_headers(&headers(&[])), None);
        assert_eq!(Actor::from_headers(&headers(&[(ACTOR_ID_HEADER, "abc")])), None);
        assert_eq!(Actor::from_headers(&headers(&[(ACTOR_ID_HEADER, "0")])), None);
        assert_eq!(
            Actor::from_headers(&headers(&[(ACTOR_ID_HEADER, " 42 ")])),
            Some(Actor {
                id: 42,
                role: ActorRole::Voter
            })
        );
    }

    #[test]
    fn admin_role_is_case_insensitive() {
        let actor = Actor::from_headers(&headers(&[
            (ACTOR_ID_HEADER, "7"),
            (ACTOR_ROLE_HEADER, "Admin"),
        ]))
        .expect("actor");
        assert_eq!(actor.role, ActorRole::Admin);
    }
}
