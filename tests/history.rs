//! Measure history assembly tests.

use sonarmine::history::{assemble, fetch_histories};
use sonarmine::{get_analysis_keys, CellValue, MetricOrder, SonarClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HISTORY: &str = "/api/measures/search_history";

fn points(values: &[&str]) -> serde_json::Value {
    values
        .iter()
        .map(|v| serde_json::json!({ "date": "2023-01-01T00:00:00+0000", "value": v }))
        .collect()
}

fn order() -> MetricOrder {
    let mut pairs = vec![("ncloc".to_string(), "INT"), ("coverage".to_string(), "PERCENT")];
    pairs.extend((2..10).map(|i| (format!("m{i}"), "INT")));
    pairs.push(("alert_status".to_string(), "LEVEL"));
    pairs.push(("last_commit_date".to_string(), "MILLISEC"));
    MetricOrder::from_pairs(pairs)
}

const FIRST_BATCH: &str = "ncloc,coverage,m2,m3,m4,m5,m6,m7,m8,m9";

async fn mount_history(
    server: &MockServer,
    metrics: &str,
    page: u32,
    total: u64,
    measures: serde_json::Value,
) {
    let body = serde_json::json!({
        "paging": { "pageIndex": page, "pageSize": 1000, "total": total },
        "measures": measures
    });
    Mock::given(method("GET"))
        .and(path(HISTORY))
        .and(query_param("component", "proj"))
        .and(query_param("metrics", metrics))
        .and(query_param("p", page.to_string()))
        .and(query_param("ps", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_analyses(server: &MockServer, keys: &[&str]) {
    let analyses: Vec<serde_json::Value> = keys
        .iter()
        .map(|k| serde_json::json!({ "key": k, "date": "2023-01-01T00:00:00+0000" }))
        .collect();
    Mock::given(method("GET"))
        .and(path("/api/project_analyses/search"))
        .and(query_param("project", "proj"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "paging": { "pageIndex": 1, "pageSize": 500, "total": keys.len() },
            "analyses": analyses
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_assemble_batches_merges_and_aligns() {
    let server = MockServer::start().await;
    mount_analyses(&server, &["A2", "A1", "A0"]).await;

    // First batch spans two pages; ncloc continues on page 2.
    mount_history(
        &server,
        FIRST_BATCH,
        1,
        1001,
        serde_json::json!([
            { "metric": "ncloc", "history": points(&["100", "200"]) },
            { "metric": "coverage", "history": points(&["50.5"]) }
        ]),
    )
    .await;
    mount_history(
        &server,
        FIRST_BATCH,
        2,
        1001,
        serde_json::json!([
            { "metric": "ncloc", "history": points(&["300", "400", "500"]) },
            { "metric": "coverage", "history": [] }
        ]),
    )
    .await;
    mount_history(
        &server,
        "alert_status,last_commit_date",
        1,
        2,
        serde_json::json!([
            { "metric": "last_commit_date", "history": points(&["1700000000000", "abc"]) },
            { "metric": "alert_status", "history": points(&["OK", "ERROR"]) }
        ]),
    )
    .await;

    let client = SonarClient::new(&server.uri(), None).unwrap();
    let analysis_keys = get_analysis_keys(&client, "proj").await.unwrap();
    assert_eq!(analysis_keys, vec!["A2", "A1", "A0"]);

    let table = assemble(&client, "proj", &analysis_keys, &order()).await.unwrap();

    assert_eq!(
        table.columns(),
        vec![
            "project_key",
            "analysis_key",
            "ncloc",
            "coverage",
            "alert_status",
            "last_commit_date"
        ]
    );
    assert_eq!(table.num_rows(), 3);
    assert_eq!(
        table.column("ncloc").unwrap(),
        &[CellValue::Int(500), CellValue::Int(400), CellValue::Int(300)]
    );
    assert_eq!(
        table.column("coverage").unwrap(),
        &[CellValue::Float(50.5), CellValue::Null, CellValue::Null]
    );
    assert_eq!(
        table.column("alert_status").unwrap(),
        &[
            CellValue::Text("ERROR".to_string()),
            CellValue::Text("OK".to_string()),
            CellValue::Null
        ]
    );

    let dates = table.column("last_commit_date").unwrap();
    assert_eq!(dates[0], CellValue::Null);
    assert!(matches!(dates[1], CellValue::Timestamp(_)));

    let first_row: Vec<String> = table.rows().next().unwrap().iter().map(ToString::to_string).collect();
    assert_eq!(first_row, vec!["proj", "A2", "500", "50.5", "ERROR", ""]);
}

#[tokio::test]
async fn test_rejected_batch_is_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(HISTORY))
        .and(query_param("metrics", FIRST_BATCH))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({ "errors": [{ "msg": "Component not found" }] })),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_history(
        &server,
        "alert_status,last_commit_date",
        1,
        1,
        serde_json::json!([{ "metric": "alert_status", "history": points(&["OK"]) }]),
    )
    .await;

    let client = SonarClient::new(&server.uri(), None).unwrap();
    let histories = fetch_histories(&client, "proj", &order()).await.unwrap();

    assert_eq!(histories.len(), 1);
    assert_eq!(histories[0].metric, "alert_status");
}
