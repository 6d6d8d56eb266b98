//! Promotion run: one pipeline per deployment entry

use tracing::{info, info_span, warn, Instrument};

use crate::app::options::{AppOptions, CLONE_DIR_PREFIX};
use crate::authn::Credential;
use crate::config::{get_config, Deployment, GitOpsConfig};
use crate::deploy::executor::DeployExecutor;
use crate::deploy::retry::{tokio_sleep, SleepFn};
use crate::errors::PromoterError;
use crate::filesys::dir::Dir;
use crate::git::GitClient;
use crate::github::{GitHubClient, PullRequestApi, PullRequestHandle};
use crate::mutate::ReplacerRegistry;

/// What happened to the pull request of one deployment entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionStatus {
    /// The branch already carried the value; nothing was pushed
    NoChanges,
    /// A new pull request was opened
    Opened,
    /// A pull request for the branch was already open
    Reused,
}

/// Result of promoting into one deployment entry
#[derive(Debug, Clone)]
pub struct PromotionOutcome {
    pub stack: String,
    pub branch: String,
    pub status: PromotionStatus,
    /// Known when the request was opened, or looked up for a deploy
    pub pull_request: Option<PullRequestHandle>,
    pub deployed: bool,
}

/// Run the promoter
pub async fn run(options: AppOptions) -> Result<Vec<PromotionOutcome>, PromoterError> {
    info!("Promoting {} ...", options.value);

    let config = get_config(
        options.global_config.as_deref(),
        options.app_config.as_deref(),
        options.app_name.as_deref(),
    )
    .await?;

    // The git and API clients each own their credential
    let git_credential = Credential::from_options(&options.credentials, &options.api_url).await?;
    let api_credential = Credential::from_options(&options.credentials, &options.api_url).await?;
    info!("using {:?} credential", git_credential.mode());

    let git = GitClient::new(git_credential, options.author.clone()).await?;
    let github = GitHubClient::new(&options.api_url, api_credential).await?;

    let mut promoter = Promoter::new(&options, config, git, &github, tokio_sleep());
    promoter.run().await
}

/// Drives the deployment entries of one resolved config
pub struct Promoter<'a, A: PullRequestApi + ?Sized> {
    options: &'a AppOptions,
    config: GitOpsConfig,
    git: GitClient,
    api: &'a A,
    replacers: ReplacerRegistry,
    sleep: SleepFn,
}

impl<'a, A: PullRequestApi + ?Sized> Promoter<'a, A> {
    pub fn new(
        options: &'a AppOptions,
        config: GitOpsConfig,
        git: GitClient,
        api: &'a A,
        sleep: SleepFn,
    ) -> Self {
        Self {
            options,
            config,
            git,
            api,
            replacers: ReplacerRegistry::with_defaults(),
            sleep,
        }
    }

    /// Process every deployment entry in order; the first failure aborts the run
    pub async fn run(&mut self) -> Result<Vec<PromotionOutcome>, PromoterError> {
        let deployments = self.config.spec.deployments.clone();
        let mut outcomes = Vec::with_capacity(deployments.len());
        for deployment in &deployments {
            let span = info_span!("deployment", stack = %deployment.target_stack);
            let outcome = self.promote(deployment).instrument(span).await?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    async fn promote(&mut self, deployment: &Deployment) -> Result<PromotionOutcome, PromoterError> {
        let branch = self.config.branch_name(deployment);
        let mut outcome = PromotionOutcome {
            stack: deployment.target_stack.clone(),
            branch: branch.clone(),
            status: PromotionStatus::NoChanges,
            pull_request: None,
            deployed: false,
        };

        let dir = match &self.options.work_dir {
            Some(parent) => Dir::create_unique_in(parent, CLONE_DIR_PREFIX).await?,
            None => Dir::create_temp_dir(CLONE_DIR_PREFIX).await?,
        };
        let pushed = self.update_branch(&dir, deployment, &branch).await;
        if let Err(e) = dir.delete().await {
            warn!("failed to remove {}: {}", dir.path().display(), e);
        }
        if !pushed? {
            info!("no changes detected for {}, skipping pull request", branch);
            return Ok(outcome);
        }

        let (status, pull_request) = self.open_pull_request(deployment, &branch).await?;
        outcome.status = status;
        outcome.pull_request = pull_request;

        if deployment.auto_deploy {
            if let Some(pr) = &outcome.pull_request {
                info!("deploying PR #{} into {}", pr.number(), deployment.source_branch);
                let mut executor =
                    DeployExecutor::new(self.api, &self.options.deploy, self.sleep.clone());
                executor.deploy(pr).await?;
                outcome.deployed = true;
            }
        }
        Ok(outcome)
    }

    /// Clone, mutate and push the stack branch; `false` when nothing changed
    async fn update_branch(
        &mut self,
        dir: &Dir,
        deployment: &Deployment,
        branch: &str,
    ) -> Result<bool, PromoterError> {
        let url = self.config.repo_url(&self.options.server_url);
        let handle = self.git.clone_and_checkout(&url, dir.path(), branch).await?;

        let app_path = self.config.app_path(handle.path(), deployment);
        self.replacers
            .apply_all(&self.config.spec.target_files, &app_path, &self.options.value)
            .await?;

        self.git
            .commit_and_push(&handle, &self.options.commit_message())
            .await
    }

    async fn open_pull_request(
        &self,
        deployment: &Deployment,
        branch: &str,
    ) -> Result<(PromotionStatus, Option<PullRequestHandle>), PromoterError> {
        let repo = &self.config.spec.config_repo;
        let created = self
            .api
            .create_pr(
                &repo.owner,
                &repo.repo,
                branch,
                &deployment.source_branch,
                &self.options.pr_title(branch),
                &self.options.pr_body(branch),
            )
            .await;

        match created {
            Ok(pr) => {
                info!("PR created: {}", pr.html_url());
                Ok((PromotionStatus::Opened, Some(pr)))
            }
            Err(e) if e.is_already_exists() => {
                info!("PR already exists for {}", branch);
                if !deployment.auto_deploy {
                    return Ok((PromotionStatus::Reused, None));
                }
                let pr = self.api.get_pr(&repo.owner, &repo.repo, branch).await?;
                info!("found PR #{}: {}", pr.number(), pr.html_url());
                Ok((PromotionStatus::Reused, Some(pr)))
            }
            Err(e) => Err(e.into()),
        }
    }
}
