//! One sync cycle: clone, commit range, summarize, record
//!
//! Each repository/branch pair is one logical unit of work, invoked from a
//! background job. Steps are strictly sequential; each depends on the
//! previous step's filesystem state. The working tree is a single-writer
//! resource: the orchestrating layer must not run two cycles against the
//! same repository/branch concurrently.

use crate::error::SyncError;
use crate::generation::TextGenerator;
use crate::summarizer::ChangeSummarizer;
use crate::transport::GitTransport;
use crate::types::{ChangelogEntry, CommitRecord, Credentials, RepositorySnapshot};
use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Persistence collaborator (interface only)
///
/// Supplies the checkpoint from the previous cycle and stores the outcome
/// of this one. Implementations live outside this crate.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// HEAD sha recorded by the previous cycle, if any
    async fn last_known_commit(
        &self,
        remote_address: &str,
        branch: &str,
    ) -> anyhow::Result<Option<String>>;

    /// Record the outcome of a completed cycle
    async fn record(
        &self,
        remote_address: &str,
        snapshot: &RepositorySnapshot,
        head_sha: &str,
        entries: &[ChangelogEntry],
    ) -> anyhow::Result<()>;
}

/// Result of one completed sync cycle
#[derive(Debug)]
pub struct SyncOutcome {
    /// State of the working tree after the clone
    pub snapshot: RepositorySnapshot,
    /// Commits since the previous checkpoint, oldest first
    pub commits: Vec<CommitRecord>,
    /// Generated changelog entries (empty when summarization degraded)
    pub entries: Vec<ChangelogEntry>,
    /// HEAD sha to persist as the next checkpoint
    pub head_sha: String,
}

/// Run one full sync cycle for a repository branch
///
/// Transport failures (clone/pull exhausted) and store failures propagate;
/// summarization failures never do — a failed changelog is indistinguishable
/// from "no changes this cycle".
#[allow(clippy::too_many_arguments)]
pub async fn run_cycle(
    transport: &GitTransport,
    summarizer: &ChangeSummarizer,
    generator: &dyn TextGenerator,
    store: &dyn SnapshotStore,
    remote_address: &str,
    branch: &str,
    credentials: Option<&Credentials>,
    cancel: &CancellationToken,
) -> Result<SyncOutcome, SyncError> {
    let snapshot = transport.clone(remote_address, credentials, branch).await?;

    let last_known = store
        .last_known_commit(remote_address, branch)
        .await
        .map_err(SyncError::from)?;

    let (commits, head_sha) = transport
        .pull(&snapshot.local_path, last_known.as_deref(), credentials)
        .await?;

    let readme = read_readme(&snapshot.local_path).await;
    let entries = summarizer
        .summarize(&commits, &readme, remote_address, branch, generator, cancel)
        .await;

    store
        .record(remote_address, &snapshot, &head_sha, &entries)
        .await
        .map_err(SyncError::from)?;

    tracing::info!(
        "Sync cycle complete for '{}' ({}): {} commits, {} changelog entries",
        remote_address,
        branch,
        commits.len(),
        entries.len()
    );

    Ok(SyncOutcome {
        snapshot,
        commits,
        entries,
        head_sha,
    })
}

/// Generate an update log against an already-checked-out working tree
///
/// The no-fresh-pull path: reads at most `window` recent commits (or the
/// range since `last_known` when a checkpoint exists) straight from the
/// tree. Best-effort throughout; any extraction failure yields an empty
/// changelog.
pub async fn update_log(
    summarizer: &ChangeSummarizer,
    generator: &dyn TextGenerator,
    snapshot: &RepositorySnapshot,
    remote_address: &str,
    last_known: Option<&str>,
    window: usize,
    cancel: &CancellationToken,
) -> Vec<ChangelogEntry> {
    let commits = {
        let snapshot = snapshot.clone();
        let last_known = last_known.map(str::to_string);
        tokio::task::spawn_blocking(move || {
            crate::history::extract_range(&snapshot, last_known.as_deref(), window)
        })
        .await
        .unwrap_or_else(|err| {
            tracing::warn!("Range extraction task failed: {}", err);
            Vec::new()
        })
    };

    let readme = read_readme(&snapshot.local_path).await;
    summarizer
        .summarize(
            &commits,
            &readme,
            remote_address,
            &snapshot.branch_name,
            generator,
            cancel,
        )
        .await
}

/// README text for the prompt payload, empty when the tree has none
async fn read_readme(local: &Path) -> String {
    match tokio::fs::read_to_string(local.join("README.md")).await {
        Ok(text) => text,
        Err(err) => {
            tracing::debug!("No readable README.md in {}: {}", local.display(), err);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_readme_present() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("README.md"), "# Widgets\n").unwrap();

        let text = read_readme(dir.path()).await;
        assert_eq!(text, "# Widgets\n");
    }

    #[tokio::test]
    async fn test_read_readme_missing_is_empty() {
        let dir = TempDir::new().unwrap();
        let text = read_readme(dir.path()).await;
        assert!(text.is_empty());
    }
}
