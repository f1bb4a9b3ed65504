//! REST client behaviour against a mock GitHub API.

use collector::{Credential, FetchError, GithubRestSource, RecordSource, RepoRef, SourceError};
use common::config::GithubConfig;
use http::StatusCode;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn source(server: &MockServer, page_size: u32) -> GithubRestSource {
    let config = GithubConfig {
        api_base: format!("{}/", server.uri()),
        page_size,
        ..GithubConfig::default()
    };
    GithubRestSource::new(&config).unwrap()
}

fn repo() -> RepoRef {
    RepoRef::new("octocat", "hello")
}

fn items(numbers: &[i64]) -> Value {
    Value::Array(numbers.iter().map(|n| json!({ "number": n })).collect())
}

async fn mount_page(server: &MockServer, resource: &str, page: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/repos/octocat/hello/{resource}")))
        .and(query_param("page", page))
        .and(query_param("state", "all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap_or_default().len()
}

#[tokio::test]
async fn pages_are_joined_until_a_short_page() {
    let server = MockServer::start().await;
    mount_page(&server, "pulls", "1", items(&[1, 2])).await;
    mount_page(&server, "pulls", "2", items(&[3])).await;
    mount_page(&server, "pulls", "3", items(&[99])).await;

    let pulls = source(&server, 2)
        .list_pull_requests(&repo(), &Credential::new("t0ken"))
        .await
        .unwrap();

    let numbers: Vec<_> = pulls.iter().map(|p| p["number"].as_i64().unwrap()).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn full_last_page_is_followed_by_an_empty_one() {
    let server = MockServer::start().await;
    mount_page(&server, "issues", "1", items(&[1, 2])).await;
    mount_page(&server, "issues", "2", items(&[])).await;

    let issues = source(&server, 2)
        .list_issues(&repo(), &Credential::new("t0ken"))
        .await
        .unwrap();

    assert_eq!(issues.len(), 2);
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn credential_is_sent_as_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octocat/hello"))
        .and(header("authorization", "Bearer t0ken"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "full_name": "octocat/hello" })),
        )
        .mount(&server)
        .await;

    let body = source(&server, 100)
        .get_repository(&repo(), &Credential::new("t0ken"))
        .await
        .unwrap();
    assert_eq!(body["full_name"], "octocat/hello");
}

#[tokio::test]
async fn unauthorized_maps_to_authentication() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = source(&server, 100)
        .get_repository(&repo(), &Credential::new("expired"))
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Authentication { .. }));
    assert!(matches!(FetchError::from(err), FetchError::Authentication(_)));
}

#[tokio::test]
async fn not_found_maps_to_repository_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = source(&server, 100)
        .get_repository(&repo(), &Credential::new("t0ken"))
        .await
        .unwrap_err();
    match err {
        SourceError::RepositoryNotFound(name) => assert_eq!(name, "octocat/hello"),
        other => panic!("expected RepositoryNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn other_statuses_are_http_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = source(&server, 100)
        .list_pull_requests(&repo(), &Credential::new("t0ken"))
        .await
        .unwrap_err();
    match err {
        SourceError::Http { status, endpoint } => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(endpoint, "repos/octocat/hello/pulls");
        }
        other => panic!("expected Http, got {other:?}"),
    }
}

#[tokio::test]
async fn listing_that_is_not_an_array_is_a_decode_error() {
    let server = MockServer::start().await;
    mount_page(&server, "pulls", "1", json!({ "message": "rate limited" })).await;

    let err = source(&server, 100)
        .list_pull_requests(&repo(), &Credential::new("t0ken"))
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Decode { .. }));
}

#[tokio::test]
async fn invalid_json_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octocat/hello"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = source(&server, 100)
        .get_repository(&repo(), &Credential::new("t0ken"))
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Decode { .. }));
}
