//! Local git remotes for integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use git2::build::RepoBuilder;
use git2::{IndexAddOption, Oid, Repository, RepositoryInitOptions, Signature};
use github_models::{CheckApp, CheckSuite, CheckSuiteList, PullRequest, PullRequestRef};
use gitops_promoter::errors::GitHubError;
use gitops_promoter::github::{PullRequestApi, PullRequestHandle};
use tempfile::TempDir;

pub const OWNER: &str = "acme";
pub const REPO: &str = "k8s-config";

/// A bare repository laid out as `{server_url}/{owner}/{repo}`
pub struct LocalRemote {
    pub root: TempDir,
    pub bare: PathBuf,
}

impl LocalRemote {
    /// Create a remote whose `main` branch holds `files`
    pub fn seed(files: &[(&str, &str)]) -> Self {
        Self::seed_with_executables(files, &[])
    }

    /// Like `seed`, committing the paths in `executables` with mode 0755
    pub fn seed_with_executables(files: &[(&str, &str)], executables: &[&str]) -> Self {
        let root = TempDir::new().unwrap();
        let work = root.path().join("seed");

        let mut init = RepositoryInitOptions::new();
        init.initial_head("main");
        let repo = Repository::init_opts(&work, &init).unwrap();
        for (path, contents) in files {
            let full = work.join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(&full, contents).unwrap();
            #[cfg(unix)]
            if executables.contains(path) {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&full, std::fs::Permissions::from_mode(0o755)).unwrap();
            }
        }
        let mut index = repo.index().unwrap();
        index.add_all(["*"], IndexAddOption::DEFAULT, None).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let signature = Signature::now("seed", "seed@example.com").unwrap();
        repo.commit(Some("HEAD"), &signature, &signature, "seed", &tree, &[])
            .unwrap();

        let bare = root.path().join(OWNER).join(REPO);
        std::fs::create_dir_all(bare.parent().unwrap()).unwrap();
        RepoBuilder::new()
            .bare(true)
            .clone(work.to_str().unwrap(), &bare)
            .unwrap();

        Self { root, bare }
    }

    /// Value for `AppOptions::server_url`
    pub fn server_url(&self) -> String {
        self.root.path().to_string_lossy().into_owned()
    }

    pub fn url(&self) -> String {
        self.bare.to_string_lossy().into_owned()
    }

    /// Tip of `branch`, if the branch exists
    pub fn branch_tip(&self, branch: &str) -> Option<Oid> {
        let repo = Repository::open_bare(&self.bare).unwrap();
        let reference = repo.find_reference(&format!("refs/heads/{}", branch)).ok()?;
        reference.target()
    }

    /// Git file mode of `path` at the tip of `branch`
    pub fn file_mode(&self, branch: &str, path: &str) -> Option<i32> {
        let repo = Repository::open_bare(&self.bare).unwrap();
        let reference = repo.find_reference(&format!("refs/heads/{}", branch)).ok()?;
        let tree = reference.peel_to_tree().ok()?;
        let mode = tree.get_path(Path::new(path)).ok()?.filemode();
        Some(mode)
    }

    /// Contents of `path` at the tip of `branch`
    pub fn read(&self, branch: &str, path: &str) -> Option<String> {
        let repo = Repository::open_bare(&self.bare).unwrap();
        let reference = repo.find_reference(&format!("refs/heads/{}", branch)).ok()?;
        let tree = reference.peel_to_tree().ok()?;
        let entry = tree.get_path(Path::new(path)).ok()?;
        let blob = repo.find_blob(entry.id()).ok()?;
        let contents = String::from_utf8_lossy(blob.content()).into_owned();
        Some(contents)
    }
}

/// Head commit of a working clone
pub fn head_of(path: &Path) -> Oid {
    let repo = Repository::open(path).unwrap();
    let oid = repo.head().unwrap().peel_to_commit().unwrap().id();
    oid
}

/// Build a check suite listing from `(slug, status, conclusion)` triples
pub fn suites(entries: &[(&str, &str, &str)]) -> CheckSuiteList {
    let check_suites: Vec<CheckSuite> = entries
        .iter()
        .enumerate()
        .map(|(i, (slug, status, conclusion))| CheckSuite {
            id: i as u64 + 1,
            status: Some(status.to_string()),
            conclusion: (!conclusion.is_empty()).then(|| conclusion.to_string()),
            app: Some(CheckApp {
                slug: Some(slug.to_string()),
            }),
        })
        .collect();
    CheckSuiteList {
        total_count: check_suites.len() as u64,
        check_suites,
    }
}

pub fn pull(number: u64, head: &str, base: &str) -> PullRequest {
    let side = |name: &str| PullRequestRef {
        ref_name: name.to_string(),
        sha: String::new(),
        repo: None,
    };
    PullRequest {
        number,
        html_url: format!("https://github.com/{}/{}/pull/{}", OWNER, REPO, number),
        state: "open".to_string(),
        title: String::new(),
        head: side(head),
        base: side(base),
    }
}

/// A pull request created through the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPull {
    pub head: String,
    pub base: String,
    pub title: String,
    pub body: String,
}

/// Scripted in-memory hosting API.
///
/// Poll `n` answers `checks[n]` (the last entry repeats); `None` answers
/// with a server error. Merge attempt `n` answers `merges[n]` the same way.
pub struct FakeApi {
    pub checks: Vec<Option<CheckSuiteList>>,
    pub merges: Vec<bool>,
    /// Head branches that already have an open pull request
    pub open_heads: Vec<String>,
    pub created: Mutex<Vec<CreatedPull>>,
    pub polls: AtomicU32,
    pub merge_attempts: AtomicU32,
    pub lookups: AtomicU32,
}

impl FakeApi {
    pub fn new(checks: Vec<Option<CheckSuiteList>>, merges: Vec<bool>) -> Self {
        Self {
            checks,
            merges,
            open_heads: Vec::new(),
            created: Mutex::new(Vec::new()),
            polls: AtomicU32::new(0),
            merge_attempts: AtomicU32::new(0),
            lookups: AtomicU32::new(0),
        }
    }

    /// Checks pass on the first poll and the first merge succeeds
    pub fn passing() -> Self {
        Self::new(
            vec![Some(suites(&[("github-actions", "completed", "success")]))],
            vec![true],
        )
    }

    pub fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn merges(&self) -> u32 {
        self.merge_attempts.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> Vec<CreatedPull> {
        self.created.lock().unwrap().clone()
    }
}

fn scripted<T: Clone>(script: &[T], counter: &AtomicU32) -> T {
    let n = counter.fetch_add(1, Ordering::SeqCst) as usize;
    script[n.min(script.len() - 1)].clone()
}

#[async_trait]
impl PullRequestApi for FakeApi {
    async fn create_pr(
        &self,
        owner: &str,
        repo: &str,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequestHandle, GitHubError> {
        if self.open_heads.iter().any(|h| h == head) {
            return Err(GitHubError::AlreadyExists(format!(
                "A pull request already exists for {}:{}.",
                owner, head
            )));
        }
        let mut created = self.created.lock().unwrap();
        created.push(CreatedPull {
            head: head.to_string(),
            base: base.to_string(),
            title: title.to_string(),
            body: body.to_string(),
        });
        let number = created.len() as u64;
        Ok(PullRequestHandle::new(owner, repo, pull(number, head, base)))
    }

    async fn get_pr(
        &self,
        owner: &str,
        repo: &str,
        head_branch: &str,
    ) -> Result<PullRequestHandle, GitHubError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.open_heads.iter().any(|h| h == head_branch) {
            Ok(PullRequestHandle::new(owner, repo, pull(100, head_branch, "main")))
        } else {
            Err(GitHubError::NotFound(format!("no PR found for branch {}", head_branch)))
        }
    }

    async fn list_check_suites(
        &self,
        _pr: &PullRequestHandle,
    ) -> Result<CheckSuiteList, GitHubError> {
        scripted(&self.checks, &self.polls).ok_or_else(|| GitHubError::Api {
            status: 502,
            message: "Bad Gateway".to_string(),
        })
    }

    async fn merge_pr(&self, _pr: &PullRequestHandle) -> Result<(), GitHubError> {
        if scripted(&self.merges, &self.merge_attempts) {
            Ok(())
        } else {
            Err(GitHubError::Api {
                status: 405,
                message: "Pull Request is not mergeable".to_string(),
            })
        }
    }
}
