//! OpenAlex search client and export tests against a mock server.

use futures::StreamExt;
use neurotrends::client::{OpenAlexClient, WorkQuery};
use neurotrends::config::OpenAlexConfig;
use neurotrends::harvest;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn page(ids: &[&str], next_cursor: Option<&str>) -> serde_json::Value {
    json!({
        "meta": {"count": 5, "next_cursor": next_cursor},
        "results": ids.iter().map(|id| json!({"id": id, "title": format!("Work {id}")})).collect::<Vec<_>>()
    })
}

async fn mount_two_pages(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("cursor", "*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&["W1", "W2", "W3"], Some("c2"))))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("cursor", "c2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&["W3", "W4"], None)))
        .mount(mock_server)
        .await;
}

fn client(mock_server: &MockServer) -> OpenAlexClient {
    OpenAlexClient::new(OpenAlexConfig::for_testing(&mock_server.uri())).unwrap()
}

#[tokio::test]
async fn test_search_follows_cursor() {
    let mock_server = MockServer::start().await;
    mount_two_pages(&mock_server).await;

    let client = client(&mock_server);
    let query = WorkQuery::recording_defaults();
    let works: Vec<_> = client.search_works(&query).collect().await;

    let ids: Vec<String> =
        works.into_iter().map(|w| w.unwrap()["id"].as_str().unwrap().to_string()).collect();
    assert_eq!(ids, vec!["W1", "W2", "W3", "W3", "W4"]);
}

#[tokio::test]
async fn test_search_sends_filters() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("filter", "from_publication_date:2023-05-01"))
        .and(query_param("per-page", "50"))
        .and(query_param("sort", "publication_date:desc"))
        .and(query_param("search", "GCaMP OR \"patch clamp\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&["W9"], None)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let query = WorkQuery {
        search: neurotrends::client::build_search_query(&["GCaMP", "patch clamp"]),
        start_date: "2023-05-01".into(),
        source_id: None,
        concept_id: None,
        per_page: 50,
        max_results: None,
    };
    let works: Vec<_> = client(&mock_server).search_works(&query).collect().await;
    assert_eq!(works.len(), 1);
}

#[tokio::test]
async fn test_search_stops_at_max_results() {
    let mock_server = MockServer::start().await;
    mount_two_pages(&mock_server).await;

    let query = WorkQuery { max_results: Some(2), ..WorkQuery::recording_defaults() };
    let works: Vec<_> = client(&mock_server).search_works(&query).collect().await;

    assert_eq!(works.len(), 2);
    // The second page is never requested.
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn test_rate_limited_page_is_repeated() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("cursor", "*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&["W1"], None)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let works: Vec<_> = client(&mock_server).search_works(&WorkQuery::recording_defaults()).collect().await;

    assert_eq!(works.len(), 1);
    assert!(works[0].is_ok());
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_server_error_ends_stream_with_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad filter"))
        .mount(&mock_server)
        .await;

    let works: Vec<_> = client(&mock_server).search_works(&WorkQuery::recording_defaults()).collect().await;

    assert_eq!(works.len(), 1);
    let err = works.into_iter().next().unwrap().unwrap_err();
    assert_eq!(err.status(), Some(400));
}

#[tokio::test]
async fn test_harvest_dedups_by_id() {
    let mock_server = MockServer::start().await;
    mount_two_pages(&mock_server).await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("data/works.jsonl");

    let summary = harvest::harvest(&client(&mock_server), &WorkQuery::recording_defaults(), &output)
        .await
        .unwrap();

    assert_eq!(summary.written, 4);
    assert_eq!(summary.duplicates, 1);

    let text = std::fs::read_to_string(&output).unwrap();
    assert_eq!(text.lines().count(), 4);
    assert_eq!(summary.bytes, text.len() as u64);
    let first: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
    assert_eq!(first["title"], "Work W1");
}
