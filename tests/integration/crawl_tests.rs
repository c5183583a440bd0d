//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the search API and the website
//! and exercise the client, the partitioner and the full crawl end-to-end.

use chrono::{NaiveDate, Utc};
use github_city::config::{parse_config, Config};
use github_city::crawler::{
    Credentials, GitHubClient, RateLimitedClient, RetryPolicy, SearchApi, UserProfile,
};
use github_city::state::SearchTarget;
use github_city::{CityError, ConfigError, Crawler};
use serde_json::json;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing both base URLs at the mock server
fn create_test_config(base_url: &str, state_path: &Path) -> Config {
    let toml = format!(
        r#"
[credentials]
client-id = "test-id"
client-secret = "test-secret"

[crawler]
workers = 3
max-retries = 1
retry-backoff-ms = 10
api-base-url = "{base}"
web-base-url = "{base}"

[target]
name = "Granada"
locations = ["Granada"]
excluded-users = ["c"]
excluded-locations = ["Nicaragua"]

[output]
state-path = "{state}"
results-path = "unused.json"
summary-path = "unused.md"
"#,
        base = base_url,
        state = state_path.display()
    );
    parse_config(&toml).expect("Failed to parse test config")
}

fn domain_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

fn crawler_for(config: &Config) -> Crawler<github_city::crawler::GitHubClient, github_city::storage::JsonStateStore> {
    let mut crawler =
        Crawler::from_config(config, CancellationToken::new()).expect("Failed to create crawler");
    crawler.options_mut().domain_end = Some(domain_end());
    crawler
}

fn client(max_retries: u32) -> RateLimitedClient {
    RateLimitedClient::new(
        reqwest::Client::new(),
        RetryPolicy {
            max_retries,
            initial_backoff: Duration::from_millis(10),
        },
    )
}

fn profile(login: &str, location: &str) -> serde_json::Value {
    json!({
        "login": login,
        "name": format!("User {}", login),
        "location": location,
        "followers": 7,
        "public_repos": 2,
        "created_at": "2012-03-04T05:06:07Z"
    })
}

async fn search_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/search/users")
        .count()
}

/// Mounts the search endpoint and the details of users `a`, `b` and `c`
async fn mount_city(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/search/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 4,
            "incomplete_results": false,
            "items": [{"login": "a"}, {"login": "b"}, {"login": "a"}, {"login": "c"}]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile("a", "Granada, Spain")))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/a/orgs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"login": "org1"}, {"login": "org2"}])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/a/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"stargazers_count": 5, "language": "Rust", "fork": false},
            {"stargazers_count": 1, "language": "Rust", "fork": false},
            {"stargazers_count": 100, "language": "Go", "fork": true}
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/a/contributions"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><svg><g>
            <rect class="day" data-date="2024-01-01" data-count="2"></rect>
            <rect class="day" data-date="2024-01-02" data-count="3"></rect>
            <rect class="day" data-date="2024-01-03" data-count="0"></rect>
            </g></svg></body></html>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile("b", "Granada, Nicaragua")))
        .mount(server)
        .await;

    // Excluded users and locations never get their details fetched
    Mock::given(method("GET"))
        .and(path("/users/b/orgs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/c"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile("c", "Granada")))
        .expect(0)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_rate_limit_waits_until_reset() {
    let mock_server = MockServer::start().await;
    let reset = Utc::now().timestamp() + 5;

    Mock::given(method("GET"))
        .and(path("/users/octocat"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-reset", reset.to_string().as_str()),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/octocat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile("octocat", "Granada")))
        .mount(&mock_server)
        .await;

    let url = Url::parse(&format!("{}/users/octocat?client_id=x", mock_server.uri())).unwrap();
    let started = Instant::now();
    let value = client(0).fetch_json(&url).await.expect("Rate limit was not absorbed");
    let elapsed = started.elapsed();

    assert_eq!(value["login"], "octocat");
    assert!(
        elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(8),
        "Expected a wait of about 5s, got {:?}",
        elapsed
    );

    // The identical URL was retried
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].url, requests[1].url);
}

/// Mounts a rate-limit response on `route` that resets an hour from now
async fn mount_long_rate_limit(server: &MockServer, route: &str) {
    let reset = Utc::now().timestamp() + 3600;

    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-reset", reset.to_string().as_str()),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_cancellation_interrupts_rate_limit_wait() {
    let mock_server = MockServer::start().await;
    mount_long_rate_limit(&mock_server, "/users/octocat").await;

    let cancel = CancellationToken::new();
    let client = client(0).with_cancellation(cancel.clone());
    let url = Url::parse(&format!("{}/users/octocat", mock_server.uri())).unwrap();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let result = tokio::time::timeout(Duration::from_secs(5), client.fetch_json(&url))
        .await
        .expect("Rate-limit wait was not interrupted");

    assert!(matches!(result, Err(CityError::Cancelled)), "Unexpected result: {:?}", result);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_transient_errors_are_bounded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let url = Url::parse(&format!("{}/flaky", mock_server.uri())).unwrap();
    let result = client(2).fetch_json(&url).await;

    assert!(
        matches!(result, Err(CityError::RetriesExhausted { attempts: 3, .. })),
        "Unexpected result: {:?}",
        result
    );
}

#[tokio::test]
async fn test_transient_error_then_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let url = Url::parse(&format!("{}/flaky", mock_server.uri())).unwrap();
    let value = client(3).fetch_json(&url).await.unwrap();

    assert_eq!(value["ok"], true);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/ghost"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = Url::parse(&format!("{}/users/ghost", mock_server.uri())).unwrap();
    let result = client(5).fetch_json(&url).await;

    assert!(matches!(result, Err(CityError::HttpStatus { status: 404, .. })));
}

#[tokio::test]
async fn test_invalid_json_is_malformed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"login\": "))
        .mount(&mock_server)
        .await;

    let url = Url::parse(&format!("{}/users/broken", mock_server.uri())).unwrap();
    let result = client(5).fetch_json(&url).await;

    assert!(matches!(result, Err(CityError::MalformedResponse { .. })));
}

#[tokio::test]
async fn test_partitioning_splits_crowded_domain() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), &dir.path().join("state.json"));

    Mock::given(method("GET"))
        .and(path("/search/users"))
        .and(query_param(
            "q",
            "type:user location:\"Granada\" created:2008-01-01..2020-01-01",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 2500,
            "incomplete_results": false,
            "items": []
        })))
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 900,
            "incomplete_results": false,
            "items": []
        })))
        .mount(&mock_server)
        .await;

    let mut crawler = crawler_for(&config);
    let state = crawler
        .prepare(config.search_target().unwrap(), config.exclusions())
        .await
        .expect("Partitioning failed");

    let intervals: Vec<String> = state.partitions().iter().map(|r| r.to_string()).collect();
    assert_eq!(
        intervals,
        vec!["2008-01-01..2013-12-31", "2014-01-01..2020-01-01"]
    );
    assert_eq!(search_requests(&mock_server).await, 3);

    // The partitions are checkpointed before any user is crawled
    assert!(dir.path().join("state.json").exists());
}

#[tokio::test]
async fn test_full_crawl_dedups_and_excludes() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), &dir.path().join("state.json"));
    mount_city(&mock_server).await;

    let mut crawler = crawler_for(&config);
    let outcome = crawler
        .run(config.search_target().unwrap(), config.exclusions())
        .await
        .expect("Crawl failed");

    assert_eq!(outcome.records.len(), 1);
    let user = &outcome.records[0];
    assert_eq!(user.login, "a");
    assert_eq!(user.name.as_deref(), Some("User a"));
    assert_eq!(user.location, "Granada, Spain");
    assert_eq!(user.organizations, 2);
    assert_eq!(user.stars, 6);
    assert_eq!(user.language.as_deref(), Some("Rust"));
    assert_eq!(user.contributions, 5);
    assert_eq!(user.longest_streak, 2);
    assert_eq!(user.current_streak, 2);

    assert_eq!(outcome.stats.discovered, 4);
    assert_eq!(outcome.stats.duplicates, 1);
    assert_eq!(outcome.stats.excluded_users, 1);
    assert_eq!(outcome.stats.excluded_locations, 1);
    assert_eq!(outcome.stats.accepted, 1);

    // Dropping the server verifies the `expect(0)` mocks
    drop(mock_server);
}

#[tokio::test]
async fn test_state_is_persisted_and_reused() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");
    let config = create_test_config(&mock_server.uri(), &state_path);
    mount_city(&mock_server).await;

    crawler_for(&config)
        .run(config.search_target().unwrap(), config.exclusions())
        .await
        .expect("First crawl failed");

    // One count probe plus one page
    assert_eq!(search_requests(&mock_server).await, 2);

    let raw = std::fs::read_to_string(&state_path).unwrap();
    let saved: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(saved["name"], "Granada");
    assert_eq!(saved["locations"], json!(["Granada"]));
    assert_eq!(saved["excludedUsers"], json!(["c"]));
    assert_eq!(saved["excludedLocations"], json!(["Nicaragua"]));
    assert_eq!(saved["intervals"], json!([["2008-01-01", "2020-01-01"]]));
    assert_eq!(
        saved["last_date"],
        json!(Utc::now().date_naive().format("%Y-%m-%d").to_string())
    );

    // Keys are written in sorted order
    let positions: Vec<usize> = [
        "\"excludedLocations\"",
        "\"excludedUsers\"",
        "\"intervals\"",
        "\"last_date\"",
        "\"locations\"",
        "\"name\"",
    ]
    .iter()
    .map(|key| raw.find(key).unwrap())
    .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));

    // The second run pages the saved partition without probing again
    let outcome = crawler_for(&config)
        .run(config.search_target().unwrap(), config.exclusions())
        .await
        .expect("Second crawl failed");

    assert_eq!(search_requests(&mock_server).await, 3);
    assert_eq!(outcome.records.len(), 1);
}

#[tokio::test]
async fn test_cancelled_crawl_drains_rate_limited_workers() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");
    let config = create_test_config(&mock_server.uri(), &state_path);

    Mock::given(method("GET"))
        .and(path("/search/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 2,
            "incomplete_results": false,
            "items": [{"login": "a"}, {"login": "b"}]
        })))
        .mount(&mock_server)
        .await;
    mount_long_rate_limit(&mock_server, "/users/a").await;
    mount_long_rate_limit(&mock_server, "/users/b").await;

    let cancel = CancellationToken::new();
    let mut crawler =
        Crawler::from_config(&config, cancel.clone()).expect("Failed to create crawler");
    crawler.options_mut().domain_end = Some(domain_end());

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        canceller.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        crawler.run(config.search_target().unwrap(), config.exclusions()),
    )
    .await
    .expect("Workers did not shut down");

    assert!(
        matches!(result, Err(CityError::Cancelled)),
        "Unexpected result: {:?}",
        result.map(|o| o.records.len())
    );

    // Only the partition checkpoint was written; the run was not recorded
    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&state_path).unwrap()).unwrap();
    assert_eq!(saved["last_date"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_unreachable_search_is_fatal_at_paging() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");
    let config = create_test_config(&mock_server.uri(), &state_path);

    // The count request succeeds, paging then keeps failing
    Mock::given(method("GET"))
        .and(path("/search/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 3,
            "incomplete_results": false,
            "items": []
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search/users"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let mut crawler = crawler_for(&config);
    let result = crawler
        .run(config.search_target().unwrap(), config.exclusions())
        .await;

    match result {
        Err(CityError::Stage { stage, source }) => {
            assert_eq!(stage, github_city::CrawlStage::Paging);
            assert!(matches!(*source, CityError::RetriesExhausted { .. }));
        }
        other => panic!("Expected a paging failure, got {:?}", other.map(|o| o.records.len())),
    }

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&state_path).unwrap()).unwrap();
    assert_eq!(saved["last_date"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_organizations_are_paged() {
    let mock_server = MockServer::start().await;
    let orgs = |n: usize| {
        let items: Vec<serde_json::Value> =
            (0..n).map(|i| json!({"login": format!("org{}", i)})).collect();
        json!(items)
    };

    Mock::given(method("GET"))
        .and(path("/users/joiner/orgs"))
        .and(query_param("page", "1"))
        .and(query_param("per_page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(orgs(100)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/joiner/orgs"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(orgs(5)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/joiner/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/joiner/contributions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<svg></svg>"))
        .mount(&mock_server)
        .await;

    let api = GitHubClient::new(
        client(0),
        Credentials::new("id", "secret").unwrap(),
        &mock_server.uri(),
        &mock_server.uri(),
    )
    .unwrap();
    let profile: UserProfile = serde_json::from_value(profile("joiner", "Granada")).unwrap();

    let record = api.user_record(profile).await.expect("Enrichment failed");

    assert_eq!(record.organizations, 105);
    assert_eq!(record.stars, 0);
    assert_eq!(record.language, None);
}

#[tokio::test]
async fn test_missing_credentials_fail_before_network() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&mock_server.uri(), &dir.path().join("state.json"));
    config.credentials.client_secret = None;

    let result = Crawler::from_config(&config, CancellationToken::new());

    assert!(matches!(
        result,
        Err(CityError::Config(ConfigError::MissingCredential("client-secret")))
    ));
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_target_is_rejected() {
    let result = SearchTarget::new("  ", vec![" ".to_string()]);
    assert!(matches!(result, Err(ConfigError::EmptyTarget)));
}
