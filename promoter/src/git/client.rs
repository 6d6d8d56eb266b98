//! Git sync client: clone, branch checkout, commit and push

use std::path::{Path, PathBuf};

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    Cred, ErrorClass, ErrorCode, FetchOptions, IndexAddOption, PushOptions, RemoteCallbacks,
    Repository, Signature, StatusOptions,
};
use tracing::{debug, info};

use crate::authn::{Credential, GIT_USERNAME};
use crate::errors::{GitError, PromoterError};

/// A cloned repository with its working branch checked out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryHandle {
    path: PathBuf,
    branch: String,
}

impl RepositoryHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }
}

/// Commit author identity
#[derive(Debug, Clone)]
pub struct Author {
    pub name: String,
    pub email: String,
}

/// Owns the git credential and the author identity
#[derive(Debug)]
pub struct GitClient {
    credential: Credential,
    author: Author,
}

impl GitClient {
    /// Create the client; an installation credential is minted right away so
    /// key problems surface at construction.
    pub async fn new(mut credential: Credential, author: Author) -> Result<Self, PromoterError> {
        credential.refresh().await?;
        Ok(Self { credential, author })
    }

    /// Replace the live credential; must run before every clone or push
    pub async fn refresh_credential(&mut self) -> Result<(), PromoterError> {
        self.credential.refresh().await
    }

    /// Clone `url` into `local_path` and force-checkout `branch` at the tip of
    /// the default branch, creating or resetting it.
    pub async fn clone_and_checkout(
        &mut self,
        url: &str,
        local_path: &Path,
        branch: &str,
    ) -> Result<RepositoryHandle, PromoterError> {
        self.refresh_credential().await?;
        let token = self.credential.expose()?;

        let handle = RepositoryHandle {
            path: local_path.to_path_buf(),
            branch: branch.to_string(),
        };
        let url = url.to_string();
        let path = handle.path.clone();
        let branch = handle.branch.clone();

        info!("cloning {} into {}", url, path.display());
        tokio::task::spawn_blocking(move || clone_and_checkout_blocking(&url, &path, &branch, &token))
            .await
            .map_err(|e| PromoterError::Internal(format!("git clone task failed: {}", e)))??;

        Ok(handle)
    }

    /// Stage everything, commit and force-push the branch.
    ///
    /// Returns `Ok(false)` without committing when the working tree is clean,
    /// and `Ok(false)` when the remote reports it is already up to date.
    pub async fn commit_and_push(
        &mut self,
        handle: &RepositoryHandle,
        message: &str,
    ) -> Result<bool, PromoterError> {
        self.refresh_credential().await?;
        let token = self.credential.expose()?;

        let handle = handle.clone();
        let message = message.to_string();
        let author = self.author.clone();

        let result = tokio::task::spawn_blocking(move || {
            commit_and_push_blocking(&handle, &message, &author, &token)
        })
        .await
        .map_err(|e| PromoterError::Internal(format!("git push task failed: {}", e)))?;

        push_outcome(result)
    }
}

/// A remote that already holds the content counts as no change
fn push_outcome(result: Result<bool, GitError>) -> Result<bool, PromoterError> {
    match result {
        Ok(pushed) => Ok(pushed),
        Err(GitError::UpToDate) => {
            info!("branch is already up-to-date");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

fn auth_callbacks(token: &str) -> RemoteCallbacks<'_> {
    let mut callbacks = RemoteCallbacks::new();
    let mut attempted = false;
    callbacks.credentials(move |_url, _username, _allowed| {
        // libgit2 keeps asking while the server rejects the credential
        if attempted {
            return Err(git2::Error::new(
                ErrorCode::Auth,
                ErrorClass::Http,
                "credential rejected by remote",
            ));
        }
        attempted = true;
        Cred::userpass_plaintext(GIT_USERNAME, token)
    });
    callbacks
}

fn clone_and_checkout_blocking(
    url: &str,
    path: &Path,
    branch: &str,
    token: &str,
) -> Result<(), GitError> {
    let mut fetch = FetchOptions::new();
    fetch.remote_callbacks(auth_callbacks(token));

    let repo = RepoBuilder::new().fetch_options(fetch).clone(url, path)?;
    checkout_branch(&repo, branch).map_err(|e| GitError::Checkout(e.message().to_string()))
}

fn checkout_branch(repo: &Repository, branch: &str) -> Result<(), git2::Error> {
    let tip = repo.head()?.peel_to_commit()?;
    debug!("creating branch {} at {}", branch, tip.id());
    repo.branch(branch, &tip, true)?;
    repo.set_head(&format!("refs/heads/{}", branch))?;
    repo.checkout_head(Some(CheckoutBuilder::new().force()))?;
    Ok(())
}

fn commit_and_push_blocking(
    handle: &RepositoryHandle,
    message: &str,
    author: &Author,
    token: &str,
) -> Result<bool, GitError> {
    let repo = Repository::open(&handle.path)?;

    let mut index = repo.index()?;
    index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
    index.update_all(["*"], None)?;
    index.write()?;

    let mut status_opts = StatusOptions::new();
    status_opts.include_untracked(true).include_ignored(false);
    if repo.statuses(Some(&mut status_opts))?.is_empty() {
        debug!("working tree is clean");
        return Ok(false);
    }

    let tree = repo.find_tree(index.write_tree()?)?;
    let parent = repo.head()?.peel_to_commit()?;
    let signature = Signature::now(&author.name, &author.email)?;
    let commit = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &[&parent])?;
    info!("committed {} on {}", commit, handle.branch);

    push(&repo, &handle.branch, token)?;
    Ok(true)
}

fn push(repo: &Repository, branch: &str, token: &str) -> Result<(), GitError> {
    let mut remote = repo.find_remote("origin")?;
    let refspec = format!("+refs/heads/{0}:refs/heads/{0}", branch);

    let mut rejected: Option<GitError> = None;
    {
        let mut callbacks = auth_callbacks(token);
        callbacks.push_update_reference(|reference, status| {
            if let Some(message) = status {
                rejected = Some(GitError::Rejected {
                    reference: reference.to_string(),
                    message: message.to_string(),
                });
            }
            Ok(())
        });
        let mut options = PushOptions::new();
        options.remote_callbacks(callbacks);
        remote.push(&[refspec.as_str()], Some(&mut options))?;
    }

    match rejected {
        Some(err) => Err(err),
        None => {
            info!("pushed {}", refspec);
            Ok(())
        }
    }
}
