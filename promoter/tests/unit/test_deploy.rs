//! Deploy state machine tests against a scripted API

mod common;

use std::time::Duration;

use common::{pull, suites, FakeApi, OWNER, REPO};
use gitops_promoter::deploy::fsm::{DeploySettings, DeployState};
use gitops_promoter::deploy::retry::{no_sleep, tokio_sleep};
use gitops_promoter::deploy::DeployExecutor;
use gitops_promoter::errors::PromoterError;
use gitops_promoter::github::PullRequestHandle;

fn settings(check_attempts: u32, merge_attempts: u32) -> DeploySettings {
    DeploySettings {
        check_attempts,
        merge_attempts,
        ..Default::default()
    }
}

fn pr() -> PullRequestHandle {
    PullRequestHandle::new(OWNER, REPO, pull(7, "web/dev", "main"))
}

fn pending() -> Option<github_models::CheckSuiteList> {
    Some(suites(&[("github-actions", "in_progress", "")]))
}

fn success() -> Option<github_models::CheckSuiteList> {
    Some(suites(&[("github-actions", "completed", "success")]))
}

fn failed() -> Option<github_models::CheckSuiteList> {
    Some(suites(&[("github-actions", "completed", "failure")]))
}

#[tokio::test]
async fn test_checks_pass_after_exactly_n_plus_one_polls() {
    for n in [0usize, 1, 4] {
        let mut script = vec![pending(); n];
        script.push(success());
        let api = FakeApi::new(script, vec![true]);
        let settings = settings(10, 3);

        let mut executor = DeployExecutor::new(&api, &settings, no_sleep());
        executor.deploy(&pr()).await.unwrap();

        assert_eq!(api.polls(), n as u32 + 1);
        assert_eq!(api.merges(), 1);
        assert_eq!(executor.state(), &DeployState::Merged);
    }
}

#[tokio::test]
async fn test_failing_checks_exhaust_without_merge() {
    let api = FakeApi::new(vec![pending(), failed()], vec![true]);
    let settings = settings(5, 3);

    let mut executor = DeployExecutor::new(&api, &settings, no_sleep());
    let err = executor.deploy(&pr()).await.unwrap_err();

    assert!(matches!(err, PromoterError::DeployError(_)));
    assert!(err.to_string().contains("CheckFailed"));
    assert_eq!(api.polls(), 5);
    assert_eq!(api.merges(), 0);
    assert_eq!(executor.state(), &DeployState::ChecksExhausted);
    assert_eq!(executor.error(), Some("CheckFailed"));
}

#[tokio::test]
async fn test_no_checks_found_surfaces_last_classification() {
    let api = FakeApi::new(vec![failed(), Some(suites(&[]))], vec![true]);
    let settings = settings(3, 3);

    let mut executor = DeployExecutor::new(&api, &settings, no_sleep());
    executor.deploy(&pr()).await.unwrap_err();

    assert_eq!(executor.error(), Some("NoChecksFound"));
    assert_eq!(api.merges(), 0);
}

#[tokio::test]
async fn test_failed_check_is_retried() {
    let api = FakeApi::new(vec![failed(), failed(), success()], vec![true]);
    let settings = settings(5, 1);

    let mut executor = DeployExecutor::new(&api, &settings, no_sleep());
    executor.deploy(&pr()).await.unwrap();
    assert_eq!(api.polls(), 3);
}

#[tokio::test]
async fn test_fetch_errors_are_retried() {
    let api = FakeApi::new(vec![None, None, success()], vec![true]);
    let settings = settings(5, 1);

    let mut executor = DeployExecutor::new(&api, &settings, no_sleep());
    executor.deploy(&pr()).await.unwrap();
    assert_eq!(api.polls(), 3);
}

#[tokio::test]
async fn test_other_integrations_ignored() {
    let checks = suites(&[
        ("dependabot", "queued", ""),
        ("github-actions", "completed", "success"),
        ("codecov", "completed", "failure"),
    ]);
    let api = FakeApi::new(vec![Some(checks)], vec![true]);
    let settings = settings(1, 1);

    let mut executor = DeployExecutor::new(&api, &settings, no_sleep());
    executor.deploy(&pr()).await.unwrap();
    assert_eq!(api.polls(), 1);
}

#[tokio::test]
async fn test_merge_retried_until_success() {
    let api = FakeApi::new(vec![success()], vec![false, false, true]);
    let settings = settings(1, 5);

    let mut executor = DeployExecutor::new(&api, &settings, no_sleep());
    executor.deploy(&pr()).await.unwrap();
    assert_eq!(api.merges(), 3);
    assert_eq!(executor.state(), &DeployState::Merged);
}

#[tokio::test]
async fn test_merge_exhausted() {
    let api = FakeApi::new(vec![success()], vec![false]);
    let settings = settings(1, 4);

    let mut executor = DeployExecutor::new(&api, &settings, no_sleep());
    let err = executor.deploy(&pr()).await.unwrap_err();

    assert!(err.to_string().contains("not mergeable"));
    assert_eq!(api.merges(), 4);
    assert_eq!(executor.state(), &DeployState::MergeExhausted);
}

#[tokio::test(start_paused = true)]
async fn test_fixed_delays_between_polls() {
    let api = FakeApi::new(vec![pending(), pending(), success()], vec![false, true]);
    let settings = settings(10, 3);

    let started = tokio::time::Instant::now();
    let mut executor = DeployExecutor::new(&api, &settings, tokio_sleep());
    executor.deploy(&pr()).await.unwrap();

    // initial delay, two check retries and one merge retry
    let expected = settings.initial_delay + settings.check_delay * 2 + settings.merge_delay;
    let elapsed = started.elapsed();
    assert!(elapsed >= expected, "elapsed {:?}", elapsed);
    assert!(elapsed < expected + Duration::from_secs(1), "elapsed {:?}", elapsed);
}
