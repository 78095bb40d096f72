//! Port to the authoritative match service.
//!
//! Implementations never raise: every call resolves to a [`RemoteCallOutcome`], and
//! callers decide per outcome whether to fall back, reject or retry later.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

/// Result of a single logical call to the match service.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCallOutcome {
    Success(Value),
    ConnectionFailure,
    Timeout,
    HttpError(u16),
    ProtocolError(String),
}

impl RemoteCallOutcome {
    /// The service could not be reached, as opposed to answering with a refusal.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::ConnectionFailure | Self::Timeout)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::ConnectionFailure => "connection_failure",
            Self::Timeout => "timeout",
            Self::HttpError(_) => "http_error",
            Self::ProtocolError(_) => "protocol_error",
        }
    }

    /// Split into the payload or the failed outcome itself.
    pub fn into_payload(self) -> Result<Value, RemoteCallOutcome> {
        match self {
            Self::Success(value) => Ok(value),
            other => Err(other),
        }
    }
}

impl fmt::Display for RemoteCallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(_) => f.write_str("success"),
            Self::ConnectionFailure => f.write_str("match service unreachable"),
            Self::Timeout => f.write_str("match service timed out"),
            Self::HttpError(status) => write!(f, "match service answered with status {status}"),
            Self::ProtocolError(detail) => write!(f, "unreadable match service response: {detail}"),
        }
    }
}

#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Read a resource, retrying transport failures.
    async fn fetch(&self, resource: &str) -> RemoteCallOutcome;

    /// Read a resource with a single attempt, for callers that must answer within one
    /// read timeout. Adapters without a retry policy can rely on `fetch`.
    async fn fetch_once(&self, resource: &str) -> RemoteCallOutcome {
        self.fetch(resource).await
    }

    /// Send a write. Never retried.
    async fn submit(&self, resource: &str, payload: &Value) -> RemoteCallOutcome;
}

/// Well-formed refusal carried in a 2xx body as `{"status":"error","message":..}`.
pub fn rejection_message(payload: &Value) -> Option<String> {
    let status = payload.get("status")?.as_str()?;
    if status != "error" {
        return None;
    }
    Some(
        payload
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("rejected by match service")
            .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn only_transport_failures_count_as_unavailable() {
        assert!(RemoteCallOutcome::ConnectionFailure.is_unavailable());
        assert!(RemoteCallOutcome::Timeout.is_unavailable());
        assert!(!RemoteCallOutcome::HttpError(503).is_unavailable());
        assert!(!RemoteCallOutcome::ProtocolError("eof".into()).is_unavailable());
    }

    #[test]
    fn status_error_body_is_a_rejection() {
        let body = json!({"status": "error", "message": "Match is not active"});
        assert_eq!(
            rejection_message(&body).as_deref(),
            Some("Match is not active")
        );
        assert_eq!(rejection_message(&json!({"status": "success"})), None);
        assert_eq!(rejection_message(&json!({"players": []})), None);
    }
}
