mod common;

use common::{client, Reply, StubTransport};
use repo_stars::error::GitHubStarsError;
use repo_stars::github::GitHubClient;
use repo_stars::tasks::get_stars;
use repo_stars::types::RepositoryIdentifier;
use serde_json::json;
use std::time::Duration;

fn repo(name: &str) -> RepositoryIdentifier {
    name.parse().expect("valid identifier")
}

#[tokio::test]
async fn test_github_client_creation() {
    tokio_test::assert_ok!(GitHubClient::new(Duration::from_secs(30)));
}

#[tokio::test]
async fn test_get_repository_stats_returns_object() {
    let transport = StubTransport::new();
    transport.reply(
        "rust-lang/rust",
        Reply::Json(json!({ "full_name": "rust-lang/rust", "stargazers_count": 100 })),
    );
    let client = client(transport.clone());

    let stats = client
        .get_repository_stats(&repo("rust-lang/rust"))
        .await
        .expect("Failed to get repository stats");

    assert_eq!(stats["full_name"], "rust-lang/rust");
    assert_eq!(transport.calls_for("rust-lang/rust"), 1);
}

#[tokio::test]
async fn test_non_object_body_is_malformed() {
    let transport = StubTransport::new();
    transport.reply("a/b", Reply::Json(json!([1, 2, 3])));
    let client = client(transport);

    let result = client.get_repository_stats(&repo("a/b")).await;

    match result.unwrap_err() {
        GitHubStarsError::MalformedResponse(_) => {} // Expected
        other => panic!("Expected MalformedResponse error, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_client_does_not_retry_on_its_own() {
    let transport = StubTransport::new();
    transport.reply("a/b", Reply::ServerError);
    let client = client(transport.clone());

    tokio_test::assert_err!(client.get_repository_stats(&repo("a/b")).await);
    assert_eq!(transport.calls_for("a/b"), 1);
}

#[tokio::test]
#[ignore = "Requires network access to api.github.com"]
async fn test_get_repository_stats_live() {
    let client = GitHubClient::new(Duration::from_secs(30)).expect("Failed to create client");

    let stats = client
        .get_repository_stats(&repo("rust-lang/rust"))
        .await
        .expect("Failed to get repository stats");

    assert_eq!(stats["full_name"], "rust-lang/rust");
    assert!(get_stars(&stats).expect("stargazers_count present") > 0);
}

#[tokio::test]
#[ignore = "Requires network access to api.github.com"]
async fn test_repository_not_found_live() {
    let client = GitHubClient::new(Duration::from_secs(30)).expect("Failed to create client");

    let result = client
        .get_repository_stats(&repo("nonexistent-owner-0000/repository"))
        .await;

    match result.unwrap_err() {
        GitHubStarsError::NotFound(_) => {} // Expected
        GitHubStarsError::RateLimitExceeded(_) => {} // Unauthenticated quota is small
        other => panic!("Expected NotFound error, got: {:?}", other),
    }
}
