//! Clone and pull operations against remote repositories
//!
//! Clones go through the `git` command line first (it tolerates constrained
//! filesystems better via `core.symlinks`/`core.longpaths`), falling back to
//! an in-process git2 clone when the command line fails or cannot start.
//! The whole sequence is attempted twice before the failure is surfaced.

use crate::config::TransportConfig;
use crate::error::{SyncError, TransportError};
use crate::history::HistoryReader;
use crate::location;
use crate::types::{CommitRecord, Credentials, RepositorySnapshot};
use anyhow::{Context, Result, anyhow};
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{ErrorClass, FetchOptions, RemoteCallbacks, Repository, Signature};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use url::Url;

/// Full attempt sequences (clean dir, command line, library fallback) per clone
pub const CLONE_ATTEMPTS: u32 = 2;

/// Branch checked out when the caller does not name one
pub const DEFAULT_BRANCH: &str = "master";

/// Behavioral options for the transport layer
///
/// Carried explicitly instead of through process-global environment
/// variables so concurrent jobs with different settings cannot interfere.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Disable symbolic-link materialization during clone
    pub disable_symlinks: bool,
    /// Enable long-path support during clone
    pub long_path_support: bool,
    /// Attempts for the raw data-transfer step on transient failures
    pub fetch_attempts: u32,
    /// Base delay for exponential fetch backoff
    pub fetch_base_delay: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            disable_symlinks: true,
            long_path_support: false,
            fetch_attempts: 3,
            fetch_base_delay: Duration::from_secs(1),
        }
    }
}

impl From<&TransportConfig> for TransportOptions {
    fn from(config: &TransportConfig) -> Self {
        Self {
            disable_symlinks: config.disable_symlinks,
            long_path_support: config.long_path_support,
            fetch_attempts: config.fetch_attempts,
            fetch_base_delay: Duration::from_millis(config.fetch_base_delay_ms),
        }
    }
}

/// Clone/pull engine for remote repositories
pub struct GitTransport {
    root: PathBuf,
    options: TransportOptions,
}

impl GitTransport {
    /// Create a transport rooted at the given working-tree directory
    pub fn new(root: impl Into<PathBuf>, options: TransportOptions) -> Self {
        Self {
            root: root.into(),
            options,
        }
    }

    /// Root directory under which working trees are laid out
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Clone a remote repository into its deterministic local path
    ///
    /// The requested branch becomes a path segment so distinct branches of
    /// the same repository occupy distinct working trees. The target
    /// directory is forcibly recreated: a stale partial clone is never
    /// reused.
    pub async fn clone(
        &self,
        remote: &str,
        credentials: Option<&Credentials>,
        branch: &str,
    ) -> Result<RepositorySnapshot, SyncError> {
        let resolved = location::resolve(remote, &self.root)?;
        let local = resolved.local_path.join(branch);

        tracing::info!(
            "Cloning '{}' (branch '{}') into {}",
            remote,
            branch,
            local.display()
        );

        let target = local.as_path();
        clone_with_retry(CLONE_ATTEMPTS, move |attempt| {
            self.attempt_clone(remote, credentials, branch, target, attempt)
        })
        .await
        .map_err(|reason| TransportError::CloneFailed {
            remote: remote.to_string(),
            attempts: CLONE_ATTEMPTS,
            reason,
        })?;

        let snapshot = read_snapshot(&local).await?;
        tracing::info!(
            "Cloned '{}' at {} ({})",
            remote,
            snapshot.head_sha,
            snapshot.branch_name
        );
        Ok(snapshot)
    }

    /// Merge-pull an already-cloned working tree and compute the commit range
    ///
    /// The address here is a filesystem path. A missing path is cloned in
    /// place first; if it still does not exist the pull fails. Returns the
    /// commits made since `last_known` (or the full history when the
    /// checkpoint is absent or unresolvable), oldest first, plus the new
    /// HEAD sha for the caller to persist as the next checkpoint.
    pub async fn pull(
        &self,
        local: &Path,
        last_known: Option<&str>,
        credentials: Option<&Credentials>,
    ) -> Result<(Vec<CommitRecord>, String), SyncError> {
        if !local.exists() {
            let address = local.to_string_lossy().to_string();
            if let Err(err) = self.clone_via_lib(&address, credentials, None, local).await {
                tracing::warn!("In-place clone of '{}' failed: {:#}", address, err);
            }
        }

        if !local.exists() {
            return Err(TransportError::CloneFailed {
                remote: local.display().to_string(),
                attempts: 1,
                reason: "path does not exist after clone".to_string(),
            }
            .into());
        }

        let path = local.to_path_buf();
        let last = last_known.map(str::to_string);
        let credentials = credentials.cloned();
        let attempts = self.options.fetch_attempts;
        let base_delay = self.options.fetch_base_delay;

        tokio::task::spawn_blocking(move || {
            pull_blocking(&path, last.as_deref(), credentials.as_ref(), attempts, base_delay)
        })
        .await
        .context("Failed to spawn blocking task for pull")
        .map_err(SyncError::from)?
    }

    /// One full clone attempt: clean directory, command line, library fallback
    async fn attempt_clone(
        &self,
        remote: &str,
        credentials: Option<&Credentials>,
        branch: &str,
        local: &Path,
        attempt: u32,
    ) -> Result<()> {
        tracing::debug!("Clone attempt {} for '{}'", attempt, remote);
        prepare_clone_dir(local);

        match self.clone_via_cli(remote, credentials, branch, local).await {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!(
                    "Command-line clone failed, falling back to library clone: {:#}",
                    err
                );
                // The command line may have left partial state behind.
                prepare_clone_dir(local);
                self.clone_via_lib(remote, credentials, Some(branch), local)
                    .await
            }
        }
    }

    /// Clone through the external `git` binary
    async fn clone_via_cli(
        &self,
        remote: &str,
        credentials: Option<&Credentials>,
        branch: &str,
        local: &Path,
    ) -> Result<()> {
        let mut args: Vec<String> = vec!["clone".to_string()];
        if self.options.disable_symlinks {
            args.push("-c".to_string());
            args.push("core.symlinks=false".to_string());
        }
        if self.options.long_path_support {
            args.push("-c".to_string());
            args.push("core.longpaths=true".to_string());
        }
        args.push(authenticated_url(remote, credentials));
        args.push(local.display().to_string());
        args.push("--branch".to_string());
        args.push(branch.to_string());

        let output = Command::new("git")
            .args(&args)
            .output()
            .await
            .context("Failed to start git process")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("git clone exited with {}: {}", output.status, stderr.trim());
        }

        Ok(())
    }

    /// Clone through the in-process git2 client
    async fn clone_via_lib(
        &self,
        remote: &str,
        credentials: Option<&Credentials>,
        branch: Option<&str>,
        local: &Path,
    ) -> Result<()> {
        let remote = remote.to_string();
        let branch = branch.map(str::to_string);
        let local = local.to_path_buf();
        let credentials = credentials.cloned();
        let attempts = self.options.fetch_attempts;
        let base_delay = self.options.fetch_base_delay;

        tokio::task::spawn_blocking(move || {
            retry_transient(attempts, base_delay, "library clone", || {
                let mut builder = RepoBuilder::new();
                if let Some(branch) = branch.as_deref() {
                    builder.branch(branch);
                }
                builder.fetch_options(fetch_options(credentials.as_ref()));
                builder.clone(&remote, &local).map(|_| ())
            })
            .map_err(|e| anyhow!("library clone failed: {}", e.message()))
        })
        .await
        .context("Failed to spawn blocking task for library clone")?
    }
}

/// Run full clone attempt sequences until one succeeds
///
/// Collapses the attempt/retry logic into one place; each attempt is the
/// complete [clean dir, command line, library fallback] sequence. Returns
/// the last failure rendered as a string once all attempts are exhausted.
pub(crate) async fn clone_with_retry<F, Fut>(max_attempts: u32, mut attempt: F) -> Result<(), String>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut last_error = String::from("no attempts were made");

    for n in 1..=max_attempts {
        match attempt(n).await {
            Ok(()) => return Ok(()),
            Err(err) => {
                tracing::warn!("Clone attempt {}/{} failed: {:#}", n, max_attempts, err);
                last_error = format!("{:#}", err);
            }
        }
    }

    Err(last_error)
}

/// Forcibly recreate the clone target directory
///
/// Failure is logged but non-fatal: an existing writable directory may
/// still allow the clone to proceed.
fn prepare_clone_dir(local: &Path) {
    if local.exists()
        && let Err(err) = std::fs::remove_dir_all(local)
    {
        tracing::warn!(
            "Failed to remove stale clone directory {}: {}",
            local.display(),
            err
        );
    }

    if let Err(err) = std::fs::create_dir_all(local) {
        tracing::warn!(
            "Failed to create clone directory {}: {}",
            local.display(),
            err
        );
    }
}

/// Embed credentials in the URL user-info component
///
/// The command line has no separate credential channel, so the URL carries
/// them; `Url` percent-encodes both parts. Addresses that cannot carry
/// user-info are returned unchanged.
fn authenticated_url(remote: &str, credentials: Option<&Credentials>) -> String {
    let Some(creds) = credentials else {
        return remote.to_string();
    };

    match Url::parse(remote) {
        Ok(mut url) => {
            let user_set = url.set_username(&creds.username).is_ok();
            let pass_set = url.set_password(Some(&creds.password)).is_ok();
            if user_set && pass_set {
                url.to_string()
            } else {
                remote.to_string()
            }
        }
        Err(_) => remote.to_string(),
    }
}

/// Fetch options with credential injection and permissive certificates
///
/// Certificate validation is intentionally accept-all: target deployments
/// sync from self-hosted remotes presenting self-signed certificates.
fn fetch_options(credentials: Option<&Credentials>) -> FetchOptions<'static> {
    let mut callbacks = RemoteCallbacks::new();

    if let Some(creds) = credentials {
        let username = creds.username.clone();
        let password = creds.password.clone();
        callbacks.credentials(move |_url, _username_from_url, _allowed| {
            git2::Cred::userpass_plaintext(&username, &password)
        });
    }

    callbacks
        .certificate_check(|_cert, _host| Ok(git2::CertificateCheckStatus::CertificateOk));

    let mut options = FetchOptions::new();
    options.remote_callbacks(callbacks);
    options
}

/// Retry a raw data-transfer operation on transient failures
///
/// Exponential backoff with a doubling delay, capped at `attempts` tries.
/// Non-transient errors are surfaced immediately.
fn retry_transient<T>(
    attempts: u32,
    base_delay: Duration,
    what: &str,
    mut op: impl FnMut() -> Result<T, git2::Error>,
) -> Result<T, git2::Error> {
    let mut delay = base_delay;
    let mut attempt = 1;

    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if attempt < attempts && is_transient(&err) => {
                tracing::warn!(
                    "Transient failure during {} (attempt {}/{}): {}. Retrying in {:?}",
                    what,
                    attempt,
                    attempts,
                    err.message(),
                    delay
                );
                std::thread::sleep(delay);
                delay *= 2;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

fn is_transient(err: &git2::Error) -> bool {
    matches!(
        err.class(),
        ErrorClass::Net | ErrorClass::Ssl | ErrorClass::Http | ErrorClass::Os
    )
}

/// Read HEAD metadata from a freshly-populated working tree
async fn read_snapshot(local: &Path) -> Result<RepositorySnapshot, SyncError> {
    let path = local.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<RepositorySnapshot, SyncError> {
        let reader = HistoryReader::open(&path)
            .map_err(|e| TransportError::HeadUnreadable(e.to_string()))?;
        reader
            .head_snapshot(&path)
            .map_err(|e| TransportError::HeadUnreadable(e.to_string()).into())
    })
    .await
    .context("Failed to spawn blocking task for snapshot read")
    .map_err(SyncError::from)?
}

/// Fetch origin, merge, and compute the commit range, all on a blocking thread
fn pull_blocking(
    local: &Path,
    last_known: Option<&str>,
    credentials: Option<&Credentials>,
    attempts: u32,
    base_delay: Duration,
) -> Result<(Vec<CommitRecord>, String), SyncError> {
    let repo = Repository::open(local).map_err(|e| TransportError::PullFailed {
        path: local.display().to_string(),
        reason: format!("cannot open repository: {}", e.message()),
    })?;

    merge_pull(&repo, credentials, attempts, base_delay).map_err(|e| {
        TransportError::PullFailed {
            path: local.display().to_string(),
            reason: e.message().to_string(),
        }
    })?;
    drop(repo);

    let reader = HistoryReader::open(local)?;
    let commits = reader.range_since(last_known)?;
    let head = reader.head_sha()?;

    tracing::info!(
        "Pulled {}: {} new commits, HEAD {}",
        local.display(),
        commits.len(),
        head
    );
    Ok((commits, head))
}

/// Fetch origin and merge into the current branch
///
/// Fast-forwards when possible; otherwise creates a merge commit. A
/// conflicted merge aborts the pull (state cleaned up) since an unattended
/// job cannot resolve conflicts.
fn merge_pull(
    repo: &Repository,
    credentials: Option<&Credentials>,
    attempts: u32,
    base_delay: Duration,
) -> Result<(), git2::Error> {
    let mut remote = repo.find_remote("origin")?;

    retry_transient(attempts, base_delay, "fetch", || {
        let mut options = fetch_options(credentials);
        remote.fetch(&[] as &[&str], Some(&mut options), None)
    })?;

    let fetch_head = repo.find_reference("FETCH_HEAD")?;
    let fetch_commit = repo.reference_to_annotated_commit(&fetch_head)?;
    let (analysis, _) = repo.merge_analysis(&[&fetch_commit])?;

    if analysis.is_up_to_date() {
        tracing::debug!("Pull: already up to date");
        return Ok(());
    }

    if analysis.is_fast_forward() {
        let mut head_ref = repo.head()?;
        head_ref.set_target(fetch_commit.id(), "pull: fast-forward")?;
        repo.checkout_head(Some(CheckoutBuilder::default().force()))?;
        return Ok(());
    }

    repo.merge(&[&fetch_commit], None, None)?;

    let mut index = repo.index()?;
    if index.has_conflicts() {
        repo.cleanup_state()?;
        return Err(git2::Error::from_str("merge produced conflicts"));
    }

    let tree_id = index.write_tree_to(repo)?;
    let tree = repo.find_tree(tree_id)?;
    let head_commit = repo.head()?.peel_to_commit()?;
    let their_commit = repo.find_commit(fetch_commit.id())?;
    let signature = Signature::now("repo-sync", "repo-sync@localhost")?;

    repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        "Merge remote changes",
        &tree,
        &[&head_commit, &their_commit],
    )?;
    repo.checkout_head(Some(CheckoutBuilder::default().force()))?;
    repo.cleanup_state()?;
    Ok(())
}

#[cfg(test)]
mod tests;
