mod common;

use common::{Harness, matches_body, players_body};
use matchday::application::mirror::CatalogBatch;
use matchday::application::payload::{matches_from, players_from};
use matchday::domain::entities::PlayerRecord;

#[tokio::test]
async fn upsert_many_twice_changes_nothing() {
    let harness = Harness::new(false).await;
    let players = players_from(&players_body()).expect("players");
    let batch = CatalogBatch::Players(players.clone());

    harness.mirror.upsert_many(&batch).await.expect("first upsert");
    let after_first = harness.mirror.players().await.expect("players");
    harness.mirror.upsert_many(&batch).await.expect("second upsert");
    let after_second = harness.mirror.players().await.expect("players");

    assert_eq!(harness.mirror.row_count().await.expect("rows"), 2);
    assert_eq!(after_first, after_second);
}

#[tokio::test]
async fn upsert_replaces_rows_by_id() {
    let harness = Harness::new(false).await;
    let players = players_from(&players_body()).expect("players");
    harness
        .mirror
        .upsert_many(&CatalogBatch::Players(players))
        .await
        .expect("seed");

    let renamed = PlayerRecord {
        id: 100,
        name: "Alves Jr".to_string(),
        position: "DF".to_string(),
        team_id: Some(1),
        votes: 9,
    };
    harness
        .mirror
        .upsert_many(&CatalogBatch::Players(vec![renamed.clone()]))
        .await
        .expect("replace");

    assert_eq!(harness.mirror.row_count().await.expect("rows"), 2);
    assert_eq!(
        harness.mirror.player(100).await.expect("lookup"),
        Some(renamed)
    );
}

#[tokio::test]
async fn matches_round_trip_through_the_mirror() {
    let harness = Harness::new(false).await;
    let matches = matches_from(&matches_body(true)).expect("matches");
    harness
        .mirror
        .upsert_many(&CatalogBatch::Matches(matches.clone()))
        .await
        .expect("upsert");

    let stored = harness
        .mirror
        .match_record(10)
        .await
        .expect("lookup")
        .expect("present");
    assert_eq!(stored, matches[0]);
    assert!(stored.is_active);
    assert_eq!(harness.mirror.match_record(11).await.expect("lookup"), None);
}

#[tokio::test]
async fn ensure_populated_fetches_only_when_empty() {
    let harness = Harness::new(false).await;
    harness.remote.answer_json("/players", players_body());
    harness.remote.answer_json("/matches", matches_body(true));

    assert!(harness.mirror.ensure_populated().await);
    assert_eq!(harness.mirror.row_count().await.expect("rows"), 3);
    assert_eq!(harness.remote.reads_of("/players"), 1);

    assert!(harness.mirror.ensure_populated().await);
    assert_eq!(harness.remote.reads_of("/players"), 1);
    assert_eq!(harness.remote.reads_of("/matches"), 1);
}

#[tokio::test]
async fn ensure_populated_reports_an_unreachable_remote() {
    let harness = Harness::new(false).await;
    harness.remote.go_down();

    assert!(!harness.mirror.ensure_populated().await);
    assert_eq!(harness.mirror.row_count().await.expect("rows"), 0);
}

#[tokio::test]
async fn partial_refresh_keeps_what_was_fetched() {
    let harness = Harness::new(false).await;
    harness.remote.answer_json("/players", players_body());

    assert!(!harness.mirror.refresh().await);
    assert_eq!(harness.mirror.row_count().await.expect("rows"), 2);
}
