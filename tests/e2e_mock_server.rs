//! E2E tests using the mock SonarCloud server.
//!
//! These tests exercise full workflows against the mock server,
//! testing realistic scenarios rather than individual endpoints.

#![cfg(feature = "test-server")]

use sonarmine::history::assemble;
use sonarmine::mock_server::{Fixtures, MockServer, MockState};
use sonarmine::output::{write_json, write_measure_table};
use sonarmine::{
    get_analysis_keys, get_metrics, CellValue, MetricOrder, MissingRepoPolicy, RangeEnumerator,
    RepoResolver, RepoTriple, SonarClient,
};

// =============================================================================
// Server Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn test_server_starts_on_random_port() {
    let server1 = MockServer::start().await;
    let server2 = MockServer::start().await;

    assert_ne!(server1.url(), server2.url());

    server1.shutdown().await;
    server2.shutdown().await;
}

#[tokio::test]
async fn test_server_shutdown_is_clean() {
    let server = MockServer::start().await;
    let url = server.url().to_string();

    server.shutdown().await;

    let client = reqwest::Client::new();
    let result = client.get(format!("{}/health", url)).send().await;

    assert!(result.is_err());
}

// =============================================================================
// Enumeration Workflow Tests
// =============================================================================

#[tokio::test]
async fn test_enumeration_beats_result_cap() {
    // 120 projects at ncloc 0, 7, 14, ... against a cap of 20.
    let state = MockState::new()
        .with_projects(Fixtures::spread("acme", "java", 120, 7))
        .with_projects(Fixtures::spread("acme", "py", 5, 1))
        .with_result_cap(20);
    let server = MockServer::with_state(state).await;
    let client = SonarClient::new(server.url(), None).unwrap();

    let enumeration = RangeEnumerator::new(&client, "java")
        .with_cap(20)
        .with_page_size(5)
        .with_initial_upper_bound(1000)
        .run()
        .await
        .expect("Failed to enumerate");

    assert_eq!(enumeration.records.len(), 120);
    assert!(enumeration.records.keys().all(|k| k.starts_with("acme/java-")));

    assert_eq!(enumeration.ranges[0].range.lower, 0);
    for pair in enumeration.ranges.windows(2) {
        assert_eq!(pair[0].range.upper, Some(pair[1].range.lower));
    }
    let (tail, finite) = enumeration.ranges.split_last().unwrap();
    assert!(tail.range.upper.is_none());
    assert!(finite.iter().all(|r| r.total < 20));
    assert!(finite.len() > 1);

    server.shutdown().await;
}

#[tokio::test]
async fn test_below_cap_uses_one_finite_range() {
    let server = MockServer::start().await;
    let client = SonarClient::new(server.url(), None).unwrap();

    let enumeration = RangeEnumerator::new(&client, "java").run().await.unwrap();

    assert_eq!(enumeration.ranges.len(), 2);
    assert_eq!(enumeration.ranges[0].total, 2);
    assert_eq!(enumeration.records.len(), 2);
    // One count query, one page for the finite range, one for the tail.
    assert_eq!(server.state().read().await.search_requests, 3);

    server.shutdown().await;
}

#[tokio::test]
async fn test_unbounded_tail_stops_at_cap() {
    let state = MockState::new()
        .with_projects(Fixtures::spread("acme", "rs", 30, 100))
        .with_result_cap(10);
    let server = MockServer::with_state(state).await;
    let client = SonarClient::new(server.url(), None).unwrap();

    let enumeration = RangeEnumerator::new(&client, "rs")
        .with_cap(10)
        .with_page_size(5)
        .with_initial_upper_bound(1)
        .run()
        .await
        .expect("tail over the cap should not fail");

    // [0, 1) holds one project; the tail reports 29 but only 10 are reachable.
    assert_eq!(enumeration.ranges[1].total, 29);
    assert_eq!(enumeration.records.len(), 11);

    server.shutdown().await;
}

// =============================================================================
// Resolution Workflow Tests
// =============================================================================

#[tokio::test]
async fn test_harvest_language_end_to_end() {
    let server = MockServer::start().await;
    let client = SonarClient::new(server.url(), None).unwrap();

    let enumeration = RangeEnumerator::new(&client, "java").run().await.unwrap();
    let report = RepoResolver::new(&client)
        .with_github_base(&server.github_url())
        .unwrap()
        .with_workers(4)
        .resolve_all(enumeration.into_records())
        .await
        .unwrap();

    assert_eq!(
        report.repos,
        vec![
            RepoTriple {
                full_name: "acme/gadget".to_string(),
                url: format!("{}acme/gadget", server.github_url()),
                commit_hash: Some("feedbeef".to_string()),
            },
            RepoTriple {
                full_name: "acme/widget".to_string(),
                url: "https://github.com/acme/widget".to_string(),
                commit_hash: Some("0a1b2c3d".to_string()),
            },
        ]
    );
    assert!(report.no_repo.is_empty());
    assert!(report.failures.is_empty());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("repos_java.json");
    write_json(&path, &report.repos).unwrap();
    let written: Vec<RepoTriple> =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written, report.repos);

    server.shutdown().await;
}

#[tokio::test]
async fn test_unresolved_project_dropped() {
    let server = MockServer::start().await;
    let client = SonarClient::new(server.url(), None).unwrap();

    let enumeration = RangeEnumerator::new(&client, "py").run().await.unwrap();
    let report = RepoResolver::new(&client)
        .with_github_base(&server.github_url())
        .unwrap()
        .with_policy(MissingRepoPolicy::Drop)
        .resolve_all(enumeration.into_records())
        .await
        .unwrap();

    assert!(report.projects.is_empty());
    assert_eq!(report.no_repo.len(), 1);
    assert_eq!(report.no_repo[0].full_name(), "acme/legacy");

    server.shutdown().await;
}

// =============================================================================
// Measure Workflow Tests
// =============================================================================

#[tokio::test]
async fn test_measure_table_end_to_end() {
    let server = MockServer::start().await;
    let client = SonarClient::new(server.url(), None).unwrap();

    let metrics = get_metrics(&client).await.unwrap();
    let order = MetricOrder::from_metrics(&metrics);
    let analysis_keys = get_analysis_keys(&client, "widget").await.unwrap();
    let table = assemble(&client, "widget", &analysis_keys, &order).await.unwrap();

    assert_eq!(analysis_keys, vec!["A2", "A1", "A0"]);
    assert_eq!(
        table.column("ncloc").unwrap(),
        &[CellValue::Int(1200), CellValue::Int(1100), CellValue::Int(1000)]
    );
    assert_eq!(
        table.column("coverage").unwrap(),
        &[CellValue::Float(82.5), CellValue::Float(81.0), CellValue::Null]
    );
    assert_eq!(
        table.column("alert_status").unwrap(),
        &[CellValue::Text("OK".to_string()), CellValue::Null, CellValue::Null]
    );

    let dir = tempfile::tempdir().unwrap();
    let path = write_measure_table(&dir.path().join("measures"), &table).unwrap();
    let content = std::fs::read_to_string(path).unwrap();
    assert_eq!(
        content.lines().next(),
        Some("project_key,analysis_key,ncloc,coverage,alert_status")
    );
    assert_eq!(content.lines().count(), 4);

    server.shutdown().await;
}
