//! HTTP adapter for the match service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::application::remote::{RemoteCallOutcome, RemoteService};
use crate::config::RemoteSettings;

use super::error::InfraError;

#[derive(Debug, Clone, Copy)]
enum Operation {
    Fetch,
    FetchOnce,
    Submit,
}

impl Operation {
    fn as_str(self) -> &'static str {
        match self {
            Operation::Fetch => "fetch",
            Operation::FetchOnce => "fetch_once",
            Operation::Submit => "submit",
        }
    }
}

/// Reads retry transport failures after a fixed pause; writes are sent exactly once.
#[derive(Debug, Clone)]
pub struct HttpRemoteClient {
    client: Client,
    base: String,
    read_timeout: Duration,
    write_timeout: Duration,
    read_retries: u32,
    retry_backoff: Duration,
}

impl HttpRemoteClient {
    pub fn new(settings: &RemoteSettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .build()
            .map_err(|err| InfraError::remote_client(err.to_string()))?;

        Ok(Self {
            client,
            base: settings.base_url.as_str().trim_end_matches('/').to_string(),
            read_timeout: settings.read_timeout,
            write_timeout: settings.write_timeout,
            read_retries: settings.read_retries,
            retry_backoff: settings.retry_backoff,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("matchday/", env!("CARGO_PKG_VERSION"))
    }

    fn url(&self, resource: &str) -> String {
        format!("{}{}", self.base, normalize_resource(resource))
    }

    async fn send_once(
        &self,
        operation: Operation,
        resource: &str,
        payload: Option<&Value>,
    ) -> RemoteCallOutcome {
        let (method, timeout) = match operation {
            Operation::Fetch | Operation::FetchOnce => (Method::GET, self.read_timeout),
            Operation::Submit => (Method::POST, self.write_timeout),
        };

        let mut request = self
            .client
            .request(method, self.url(resource))
            .timeout(timeout);
        if let Some(body) = payload {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => return classify_transport(&err),
        };

        let status = response.status();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => return classify_transport(&err),
        };
        classify_body(status, &bytes)
    }

    fn record(&self, operation: Operation, resource: &str, outcome: &RemoteCallOutcome) {
        metrics::counter!(
            "matchday_remote_call_total",
            "op" => operation.as_str(),
            "outcome" => outcome.kind()
        )
        .increment(1);

        if outcome.is_success() {
            debug!(
                target = "matchday::remote",
                op = operation.as_str(),
                resource,
                "match service call succeeded"
            );
        } else {
            warn!(
                target = "matchday::remote",
                op = operation.as_str(),
                resource,
                outcome = %outcome,
                "match service call failed"
            );
        }
    }
}

#[async_trait]
impl RemoteService for HttpRemoteClient {
    async fn fetch(&self, resource: &str) -> RemoteCallOutcome {
        let attempts = self.read_retries.saturating_add(1);
        let mut attempt = 1;
        loop {
            let outcome = self.send_once(Operation::Fetch, resource, None).await;
            self.record(Operation::Fetch, resource, &outcome);

            if !outcome.is_unavailable() || attempt >= attempts {
                return outcome;
            }

            debug!(
                target = "matchday::remote",
                resource,
                attempt,
                attempts,
                "retrying match service read"
            );
            tokio::time::sleep(self.retry_backoff).await;
            attempt += 1;
        }
    }

    async fn fetch_once(&self, resource: &str) -> RemoteCallOutcome {
        let outcome = self.send_once(Operation::FetchOnce, resource, None).await;
        self.record(Operation::FetchOnce, resource, &outcome);
        outcome
    }

    async fn submit(&self, resource: &str, payload: &Value) -> RemoteCallOutcome {
        let outcome = self
            .send_once(Operation::Submit, resource, Some(payload))
            .await;
        self.record(Operation::Submit, resource, &outcome);
        outcome
    }
}

/// Resource paths are relative to the base URL, which already carries any `/api` prefix.
fn normalize_resource(resource: &str) -> String {
    let trimmed = resource.trim();
    let without_prefix = match trimmed.trim_start_matches('/').strip_prefix("api") {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => trimmed,
    };
    let path = without_prefix.trim_start_matches('/');
    format!("/{path}")
}

fn classify_transport(err: &reqwest::Error) -> RemoteCallOutcome {
    if err.is_timeout() {
        RemoteCallOutcome::Timeout
    } else if err.is_decode() {
        RemoteCallOutcome::ProtocolError(err.to_string())
    } else {
        RemoteCallOutcome::ConnectionFailure
    }
}

fn classify_body(status: StatusCode, bytes: &[u8]) -> RemoteCallOutcome {
    if !status.is_success() {
        return RemoteCallOutcome::HttpError(status.as_u16());
    }
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return RemoteCallOutcome::Success(Value::Null);
    }
    match serde_json::from_slice(bytes) {
        Ok(value) => RemoteCallOutcome::Success(value),
        Err(err) => RemoteCallOutcome::ProtocolError(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_paths_drop_a_redundant_api_segment() {
        assert_eq!(normalize_resource("/api/players"), "/players");
        assert_eq!(normalize_resource("api/votes/3"), "/votes/3");
        assert_eq!(normalize_resource("/players"), "/players");
        assert_eq!(normalize_resource("matches/close"), "/matches/close");
        assert_eq!(normalize_resource("/apiary"), "/apiary");
        assert_eq!(normalize_resource(""), "/");
        assert_eq!(normalize_resource("/api"), "/");
    }

    #[test]
    fn non_success_status_is_an_http_error() {
        assert_eq!(
            classify_body(StatusCode::SERVICE_UNAVAILABLE, b"{}"),
            RemoteCallOutcome::HttpError(503)
        );
    }

    #[test]
    fn unparseable_success_body_is_a_protocol_error() {
        assert!(matches!(
            classify_body(StatusCode::OK, b"<html>"),
            RemoteCallOutcome::ProtocolError(_)
        ));
        assert_eq!(
            classify_body(StatusCode::OK, b"  "),
            RemoteCallOutcome::Success(Value::Null)
        );
    }

    #[test]
    fn base_url_trailing_slash_is_ignored() {
        let settings = RemoteSettings {
            base_url: url::Url::parse("http://localhost:8080/api/").expect("url"),
            read_timeout: Duration::from_millis(100),
            write_timeout: Duration::from_millis(200),
            read_retries: 0,
            retry_backoff: Duration::ZERO,
            check_eligibility: true,
        };
        let client = HttpRemoteClient::new(&settings).expect("client");

        assert_eq!(client.url("/players"), "http://localhost:8080/api/players");
        assert_eq!(client.url("/api/stats"), "http://localhost:8080/api/stats");
    }
}
