mod common;

use common::{Harness, matches_body, players_body};
use matchday::application::mirror::CatalogBatch;
use matchday::application::payload::players_from;
use matchday::domain::entities::GlobalStats;
use matchday::domain::votes::CastVoteCommand;
use serde_json::json;

#[tokio::test]
async fn fetched_players_refresh_the_mirror() {
    let harness = Harness::new(false).await;
    harness.remote.answer_json("/players", players_body());

    let players = harness.catalog.players().await;

    assert_eq!(players.len(), 2);
    assert_eq!(harness.mirror.row_count().await.expect("rows"), 2);
}

#[tokio::test]
async fn players_come_from_the_mirror_when_the_remote_is_down() {
    let harness = Harness::new(false).await;
    let players = players_from(&players_body()).expect("players");
    harness
        .mirror
        .upsert_many(&CatalogBatch::Players(players))
        .await
        .expect("seed");
    harness.remote.go_down();

    let served = harness.catalog.players().await;

    assert_eq!(served.len(), 2);
    // Mirror lists players by votes, highest first.
    assert_eq!(served[0].id, 200);
}

#[tokio::test]
async fn cached_reads_within_ttl_fetch_once() {
    let harness = Harness::new(false).await;
    harness.remote.answer_json("/matches", matches_body(true));

    let first = harness.catalog.matches().await;
    let second = harness.catalog.matches().await;

    assert_eq!(first, second);
    assert_eq!(harness.remote.reads_of("/matches"), 1);
}

#[tokio::test]
async fn stats_are_computed_locally_when_the_remote_is_down() {
    let harness = Harness::new(false).await;
    harness.remote.answer_json("/players", players_body());
    harness.remote.answer_json("/matches", matches_body(true));
    assert!(harness.mirror.refresh().await);

    harness.remote.go_down();
    harness
        .votes
        .cast_vote(&CastVoteCommand::new(1, 10, 100))
        .await;

    let stats = harness.catalog.global_stats().await;

    assert_eq!(
        stats,
        GlobalStats {
            total_players: 2,
            total_matches: 1,
            total_votes: 1,
        }
    );
}

#[tokio::test]
async fn remote_stats_pass_through() {
    let harness = Harness::new(false).await;
    harness.remote.answer_json(
        "/stats",
        json!({"total_players": 30, "total_matches": 4, "total_votes": 120}),
    );

    let stats = harness.catalog.global_stats().await;

    assert_eq!(stats.total_votes, 120);
    assert_eq!(stats.total_players, 30);
}

#[tokio::test]
async fn match_stats_default_to_an_empty_list() {
    let harness = Harness::new(false).await;
    harness.remote.go_down();

    assert_eq!(harness.catalog.match_stats().await, json!({"matches": []}));
}

#[tokio::test]
async fn malformed_bodies_are_not_cached() {
    let harness = Harness::new(false).await;
    harness.remote.answer_json("/players", json!({"unexpected": true}));

    harness.catalog.players().await;
    harness.catalog.players().await;

    assert_eq!(harness.remote.reads_of("/players"), 2);
    assert!(harness.cache.is_empty());
}

#[tokio::test]
async fn history_for_an_actor_without_votes_is_empty() {
    let harness = Harness::new(false).await;

    let history = harness.catalog.voting_history(42).await.expect("history");

    assert!(history.is_empty());
    assert_eq!(harness.remote.reads_of("/players"), 0);
}
