//! Retrieval against a mocked search API.

use std::time::Duration;

use chrono::NaiveDate;
use rds_harvester::acquisition::fetcher::PagedFetcher;
use rds_harvester::acquisition::orchestrator::retrieve_all;
use rds_harvester::acquisition::partition::partition_days;
use rds_harvester::acquisition::retry::RetryPolicy;
use rds_harvester::cli::links_cmd::collect_links;
use rds_harvester::config::{ApiConfig, FilterCodes, HarvestConfig, SessionConfig};
use rds_harvester::error::FetchError;
use rds_harvester::model::DatePartition;
use rds_harvester::session::RegistryClient;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH_PATH: &str = "/api/v1/rds/common/declarations/get";

fn api(server: &MockServer) -> ApiConfig {
    ApiConfig {
        origin: server.uri(),
        endpoint: format!("{}{SEARCH_PATH}", server.uri()),
        declaration_page: format!("{}/rds/declaration", server.uri()),
        detail_base: format!("{}/rds/declaration/view", server.uri()),
        page_size: 1000,
        request_timeout: Duration::from_millis(300),
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 5,
        min_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
        multiplier: Duration::from_millis(1),
    }
}

fn fetcher(server: &MockServer) -> PagedFetcher {
    let api = api(server);
    let session = SessionConfig {
        cookies: vec![("JSESSIONID".into(), "abc".into())],
        proxy: None,
    };
    let client = RegistryClient::new("tok", &api, &session).unwrap();
    PagedFetcher::new(
        client,
        api.endpoint.clone(),
        FilterCodes {
            status: vec![6],
            ..FilterCodes::default()
        },
        api.page_size,
        fast_retry(),
    )
}

fn items(ids: std::ops::Range<u64>) -> Vec<Value> {
    ids.map(|id| json!({"id": id, "declDate": "2024-03-01", "applicantName": format!("ООО {id}")}))
        .collect()
}

fn day(d: u32) -> DatePartition {
    let date = NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
    DatePartition::new(date, date)
}

#[tokio::test]
async fn test_paged_fetch_requests_every_page_in_order() {
    let server = MockServer::start().await;
    for page in 0..3u64 {
        let start = page * 1000;
        let end = (start + 1000).min(2500);
        Mock::given(method("POST"))
            .and(path(SEARCH_PATH))
            .and(header("authorization", "Bearer tok"))
            .and(body_partial_json(json!({
                "page": page,
                "size": 1000,
                "filter": {
                    "status": [6],
                    "regDate": {
                        "minDate": "2024-03-01T00:00:00.000Z",
                        "maxDate": "2024-03-01T23:59:59.999Z"
                    }
                }
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"total": 2500, "items": items(start..end)})),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let records = fetcher(&server).fetch_partition(&day(1)).await.unwrap();

    assert_eq!(records.len(), 2500);
    let ids: Vec<u64> = records.iter().map(|r| r.id).collect();
    assert_eq!(ids, (0..2500).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_single_page_when_total_fits() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 3, "items": items(1..4)})))
        .expect(1)
        .mount(&server)
        .await;

    let records = fetcher(&server).fetch_partition(&day(1)).await.unwrap();
    assert_eq!(records.len(), 3);
}

#[tokio::test]
async fn test_transport_timeouts_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"total": 1, "items": items(7..8)}))
                .set_delay(Duration::from_secs(2)),
        )
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 1, "items": items(7..8)})))
        .expect(1)
        .mount(&server)
        .await;

    let records = fetcher(&server).fetch_partition(&day(1)).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, 7);
}

#[tokio::test]
async fn test_error_status_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("token expired"))
        .expect(1)
        .mount(&server)
        .await;

    let err = fetcher(&server).fetch_partition(&day(1)).await.unwrap_err();

    match err {
        FetchError::Status { status, body } => {
            assert_eq!(status, 403);
            assert_eq!(body, "token expired");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_failed_partitions_count_as_empty() {
    let server = MockServer::start().await;
    // Day 1 answers with HTML, day 2 with a server error, day 3 works.
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"filter": {"regDate": {"minDate": "2024-03-01T00:00:00.000Z"}}})))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"filter": {"regDate": {"minDate": "2024-03-02T00:00:00.000Z"}}})))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"filter": {"regDate": {"minDate": "2024-03-03T00:00:00.000Z"}}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 2, "items": items(10..12)})))
        .expect(1)
        .mount(&server)
        .await;

    let partitions = partition_days(
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(),
    )
    .unwrap();
    let summary = retrieve_all(&fetcher(&server), partitions, 10).await;

    assert_eq!(summary.partitions_ok, 1);
    assert_eq!(summary.partitions_failed, 2);
    let mut ids: Vec<u64> = summary.records.iter().map(|r| r.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![10, 11]);
}

#[tokio::test]
async fn test_link_list_is_written_per_partition() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"filter": {"regDate": {"minDate": "2024-03-01T00:00:00.000Z"}}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 2, "items": items(1..3)})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"filter": {"regDate": {"minDate": "2024-03-02T00:00:00.000Z"}}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 1, "items": items(5..6)})))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("links.txt");
    std::fs::write(&out, "stale\n").unwrap();

    let mut config = HarvestConfig::default();
    config.api = api(&server);
    config.retry = fast_retry();
    let partitions = vec![day(1), day(2)];

    let (summary, written) = collect_links(&config, "tok", partitions, &out).await.unwrap();

    assert_eq!(summary.records.len(), 3);
    assert_eq!(written, 3);
    let content = std::fs::read_to_string(&out).unwrap();
    let mut lines: Vec<&str> = content.lines().collect();
    lines.sort_unstable();
    let base = format!("{}/rds/declaration/view", server.uri());
    assert_eq!(
        lines,
        vec![
            format!("{base}/1/common"),
            format!("{base}/2/common"),
            format!("{base}/5/common"),
        ]
    );
}
