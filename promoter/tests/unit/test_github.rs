//! Hosting API client tests against a mock server

use chrono::Utc;
use gitops_promoter::authn::{Credential, CredentialMode, CredentialOptions};
use gitops_promoter::errors::{GitHubError, PromoterError};
use gitops_promoter::github::{GitHubClient, PullRequestApi};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/test-app-key.pem");

fn pull(number: u64, head: &str, base: &str) -> Value {
    json!({
        "number": number,
        "html_url": format!("https://github.com/acme/k8s-config/pull/{}", number),
        "state": "open",
        "title": format!("[CI] Automated PR to update {}", head),
        "head": { "ref": head, "sha": "abc123" },
        "base": { "ref": base, "sha": "def456" }
    })
}

fn rate_limit() -> Value {
    json!({
        "resources": {
            "core": { "limit": 5000, "remaining": 4990, "reset": Utc::now().timestamp() + 600 }
        }
    })
}

async fn client(server: &MockServer) -> GitHubClient {
    GitHubClient::without_rate_limit_check(&server.uri(), Credential::token("ghp_test")).unwrap()
}

#[tokio::test]
async fn test_rate_limit_check_accepts_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rate_limit"))
        .and(header("authorization", "Bearer ghp_test"))
        .and(header("user-agent", "gitops-promoter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rate_limit()))
        .expect(1)
        .mount(&server)
        .await;

    GitHubClient::new(&server.uri(), Credential::token("ghp_test"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rate_limit_check_tolerates_missing_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rate_limit"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
        .mount(&server)
        .await;

    GitHubClient::new(&server.uri(), Credential::token("ghp_test"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rate_limit_check_failure_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rate_limit"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Bad credentials" })))
        .mount(&server)
        .await;

    let err = GitHubClient::new(&server.uri(), Credential::token("ghp_bad"))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, PromoterError::GitHub(GitHubError::Auth(_))));
}

#[tokio::test]
async fn test_create_pr() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/k8s-config/pulls"))
        .and(body_json(json!({
            "title": "[CI] Automated PR to update web/dev",
            "head": "web/dev",
            "base": "main",
            "body": "Automated PR to web/dev with the new value"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(pull(7, "web/dev", "main")))
        .expect(1)
        .mount(&server)
        .await;

    let pr = client(&server)
        .await
        .create_pr(
            "acme",
            "k8s-config",
            "web/dev",
            "main",
            "[CI] Automated PR to update web/dev",
            "Automated PR to web/dev with the new value",
        )
        .await
        .unwrap();

    assert_eq!(pr.number(), 7);
    assert_eq!(pr.owner, "acme");
    assert_eq!(pr.head_branch(), "web/dev");
    assert_eq!(pr.base_branch(), "main");
    assert_eq!(pr.check_ref(), "refs/pull/7/head");
}

#[tokio::test]
async fn test_create_pr_already_exists() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/k8s-config/pulls"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "Validation Failed",
            "errors": [{
                "resource": "PullRequest",
                "code": "custom",
                "message": "A pull request already exists for acme:web/dev."
            }]
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .await
        .create_pr("acme", "k8s-config", "web/dev", "main", "t", "b")
        .await
        .unwrap_err();
    assert!(err.is_already_exists());
}

#[tokio::test]
async fn test_get_pr_by_head_branch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/k8s-config/pulls"))
        .and(query_param("head", "acme:web/dev"))
        .and(query_param("state", "open"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([pull(9, "web/dev", "main")])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/k8s-config/pulls"))
        .and(query_param("head", "acme:web/prod"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let github = client(&server).await;
    let pr = github.get_pr("acme", "k8s-config", "web/dev").await.unwrap();
    assert_eq!(pr.number(), 9);

    let err = github
        .get_pr("acme", "k8s-config", "web/prod")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_list_check_suites_for_pull_ref() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/k8s-config/commits/refs/pull/7/head/check-suites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 2,
            "check_suites": [
                { "id": 1, "status": "completed", "conclusion": "success", "app": { "slug": "github-actions" } },
                { "id": 2, "status": "queued", "conclusion": null, "app": { "slug": "dependabot" } }
            ]
        })))
        .mount(&server)
        .await;

    let github = client(&server).await;
    let pr = github_pr(7);
    let suites = github.list_check_suites(&pr).await.unwrap();
    assert_eq!(suites.total_count, 2);
    assert_eq!(suites.check_suites[0].app_slug(), "github-actions");
    assert_eq!(suites.check_suites[1].conclusion(), "");
}

#[tokio::test]
async fn test_merge_pr_squash() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/repos/acme/k8s-config/pulls/7/merge"))
        .and(body_json(json!({ "merge_method": "squash" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sha": "fff",
            "merged": true,
            "message": "Pull Request successfully merged"
        })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).await.merge_pr(&github_pr(7)).await.unwrap();
}

#[tokio::test]
async fn test_merge_pr_blocked() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/repos/acme/k8s-config/pulls/7/merge"))
        .respond_with(
            ResponseTemplate::new(405).set_body_json(json!({ "message": "Base branch was modified" })),
        )
        .mount(&server)
        .await;

    let err = client(&server).await.merge_pr(&github_pr(7)).await.unwrap_err();
    match err {
        GitHubError::Api { status, message } => {
            assert_eq!(status, 405);
            assert_eq!(message, "Base branch was modified");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_installation_token_minted_and_used() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/app/installations/99/access_tokens"))
        .and(header_exists("authorization"))
        .and(header("accept", "application/vnd.github+json"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "token": "ghs_minted",
            "expires_at": (Utc::now() + chrono::Duration::hours(1)).to_rfc3339()
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rate_limit"))
        .and(header("authorization", "Bearer ghs_minted"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rate_limit()))
        .expect(1)
        .mount(&server)
        .await;

    let options = CredentialOptions {
        token: None,
        app_key_path: Some(KEY_PATH.into()),
        app_id: Some(42),
        installation_id: Some(99),
    };
    let credential = Credential::from_options(&options, &server.uri()).await.unwrap();
    assert_eq!(credential.mode(), CredentialMode::Installation);

    GitHubClient::new(&server.uri(), credential).await.unwrap();
}

#[tokio::test]
async fn test_installation_mint_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/app/installations/99/access_tokens"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "A JSON web token could not be decoded"
        })))
        .mount(&server)
        .await;

    let options = CredentialOptions {
        token: None,
        app_key_path: Some(KEY_PATH.into()),
        app_id: Some(42),
        installation_id: Some(99),
    };
    let mut credential = Credential::from_options(&options, &server.uri()).await.unwrap();
    let err = credential.refresh().await.unwrap_err();
    assert!(matches!(err, PromoterError::AuthError(_)));
    assert!(err.to_string().contains("could not be decoded"));
}

fn github_pr(number: u64) -> gitops_promoter::github::PullRequestHandle {
    let pull = serde_json::from_value(pull(number, "web/dev", "main")).unwrap();
    gitops_promoter::github::PullRequestHandle::new("acme", "k8s-config", pull)
}
