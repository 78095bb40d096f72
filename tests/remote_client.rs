use std::time::Duration;

use httpmock::MockServer;
use matchday::application::remote::{RemoteCallOutcome, RemoteService};
use matchday::config::RemoteSettings;
use matchday::infra::remote::HttpRemoteClient;
use serde_json::json;
use url::Url;

fn settings(base: &str) -> RemoteSettings {
    RemoteSettings {
        base_url: Url::parse(base).expect("base url"),
        read_timeout: Duration::from_millis(200),
        write_timeout: Duration::from_millis(400),
        read_retries: 2,
        retry_backoff: Duration::from_millis(10),
        check_eligibility: true,
    }
}

fn client(server: &MockServer) -> HttpRemoteClient {
    HttpRemoteClient::new(&settings(&server.url("/api"))).expect("client")
}

#[tokio::test]
async fn fetch_returns_the_decoded_body() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path("/api/players");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"players":[{"id":1,"name":"Keeper"}]}"#);
    });

    let outcome = client(&server).fetch("/players").await;

    mock.assert();
    assert_eq!(
        outcome,
        RemoteCallOutcome::Success(json!({"players": [{"id": 1, "name": "Keeper"}]}))
    );
}

#[tokio::test]
async fn api_prefixed_and_bare_resources_hit_the_same_url() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path("/api/players");
        then.status(200).body("[]");
    });
    let client = client(&server);

    assert!(client.fetch("/api/players").await.is_success());
    assert!(client.fetch("players").await.is_success());

    mock.assert_calls(2);
}

#[tokio::test]
async fn timed_out_reads_are_retried_twice() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path("/api/stats");
        then.status(200)
            .body("{}")
            .delay(Duration::from_millis(600));
    });

    let outcome = client(&server).fetch("/stats").await;

    assert_eq!(outcome, RemoteCallOutcome::Timeout);
    mock.assert_calls(3);
}

#[tokio::test]
async fn single_attempt_read_gives_up_after_one_timeout() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path("/api/stats");
        then.status(200)
            .body("{}")
            .delay(Duration::from_millis(600));
    });

    let outcome = client(&server).fetch_once("/stats").await;

    assert_eq!(outcome, RemoteCallOutcome::Timeout);
    mock.assert_calls(1);
}

#[tokio::test]
async fn single_attempt_read_decodes_like_fetch() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path("/api/stats");
        then.status(200).body(r#"{"total_votes":3}"#);
    });

    let outcome = client(&server).fetch_once("/api/stats").await;

    mock.assert();
    assert_eq!(outcome, RemoteCallOutcome::Success(json!({"total_votes": 3})));
}

#[tokio::test]
async fn server_errors_are_not_retried() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path("/api/matches");
        then.status(500);
    });

    let outcome = client(&server).fetch("/matches").await;

    assert_eq!(outcome, RemoteCallOutcome::HttpError(500));
    mock.assert_calls(1);
}

#[tokio::test]
async fn undecodable_body_is_a_protocol_error() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path("/api/matches");
        then.status(200).body("<html>maintenance</html>");
    });

    let outcome = client(&server).fetch("/matches").await;

    assert!(matches!(outcome, RemoteCallOutcome::ProtocolError(_)));
    mock.assert_calls(1);
}

#[tokio::test]
async fn submit_posts_json_once() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST")
            .path("/api/vote")
            .json_body(json!({"user_id": 1, "match_id": 10, "player_id": 100}));
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"status":"success","message":"Vote recorded"}"#);
    });

    let outcome = client(&server)
        .submit(
            "/vote",
            &json!({"user_id": 1, "match_id": 10, "player_id": 100}),
        )
        .await;

    mock.assert();
    assert!(outcome.is_success());
}

#[tokio::test]
async fn timed_out_writes_are_never_retried() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST").path("/api/vote");
        then.status(200)
            .body("{}")
            .delay(Duration::from_millis(900));
    });

    let outcome = client(&server).submit("/vote", &json!({})).await;

    assert_eq!(outcome, RemoteCallOutcome::Timeout);
    mock.assert_calls(1);
}

#[tokio::test]
async fn refused_connections_are_reported_not_raised() {
    let mut settings = settings("http://127.0.0.1:1/api");
    settings.read_retries = 1;
    let client = HttpRemoteClient::new(&settings).expect("client");

    assert_eq!(
        client.fetch("/players").await,
        RemoteCallOutcome::ConnectionFailure
    );
    assert_eq!(
        client.submit("/vote", &json!({})).await,
        RemoteCallOutcome::ConnectionFailure
    );
}
