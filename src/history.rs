/// Commit history reading and incremental range extraction
///
/// Wraps a local working tree and answers "what changed since this commit"
/// as a reachability difference, so merges and rebases are handled
/// correctly. Ranges handed to the summarizer are always chronological
/// ascending, regardless of the order the underlying revwalk yields.
use crate::error::HistoryError;
use crate::types::{CommitRecord, RepositorySnapshot};
use chrono::{DateTime, Utc};
use git2::{Oid, Repository, Sort};
use std::path::Path;

/// Bounded recency window for the no-checkpoint update-log path
pub const RECENT_WINDOW: usize = 20;

/// Reader over the commit history of a local working tree
pub struct HistoryReader {
    repo: Repository,
}

impl std::fmt::Debug for HistoryReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryReader")
            .field("repo", &self.repo.path())
            .finish()
    }
}

impl HistoryReader {
    /// Open the repository at the given working tree path
    pub fn open(path: &Path) -> Result<Self, HistoryError> {
        let repo = Repository::open(path).map_err(|e| HistoryError::RepositoryUnreadable {
            path: path.display().to_string(),
            reason: e.message().to_string(),
        })?;

        tracing::debug!("Opened git repository at: {}", path.display());
        Ok(Self { repo })
    }

    /// SHA of the commit at HEAD
    pub fn head_sha(&self) -> Result<String, HistoryError> {
        let head = self
            .repo
            .head()
            .map_err(|e| HistoryError::IterFailed(e.message().to_string()))?;
        let oid = head
            .target()
            .ok_or_else(|| HistoryError::IterFailed("HEAD is not a direct reference".into()))?;
        Ok(oid.to_string())
    }

    /// Read HEAD metadata into a snapshot of the working tree
    pub fn head_snapshot(&self, local_path: &Path) -> Result<RepositorySnapshot, HistoryError> {
        let head = self
            .repo
            .head()
            .map_err(|e| HistoryError::IterFailed(e.message().to_string()))?;
        let branch_name = head.shorthand().unwrap_or("HEAD").to_string();

        let commit = head
            .peel_to_commit()
            .map_err(|e| HistoryError::ParseFailed(e.message().to_string()))?;

        Ok(RepositorySnapshot {
            local_path: local_path.to_path_buf(),
            branch_name,
            head_sha: commit.id().to_string(),
            commit_time: timestamp(commit.time().seconds()),
            commit_author: commit.committer().name().unwrap_or("Unknown").to_string(),
            commit_message: commit.message().unwrap_or("").to_string(),
        })
    }

    /// Resolve a commit identifier within this repository's history
    pub fn resolve_commit(&self, sha: &str) -> Option<Oid> {
        let object = self.repo.revparse_single(sha).ok()?;
        let commit = object.peel_to_commit().ok()?;
        Some(commit.id())
    }

    /// Commits reachable from HEAD but not from `last_known`, oldest first
    ///
    /// An absent or unresolvable checkpoint falls back to the full history:
    /// a missing checkpoint just means "summarize everything known."
    pub fn range_since(&self, last_known: Option<&str>) -> Result<Vec<CommitRecord>, HistoryError> {
        let exclude = last_known.and_then(|sha| self.resolve_commit(sha));
        if last_known.is_some() && exclude.is_none() {
            tracing::warn!(
                "Checkpoint commit '{}' not found in history, returning full history",
                last_known.unwrap_or_default()
            );
        }

        let mut revwalk = self
            .repo
            .revwalk()
            .map_err(|e| HistoryError::IterFailed(e.message().to_string()))?;
        revwalk
            .set_sorting(Sort::TIME)
            .map_err(|e| HistoryError::IterFailed(e.message().to_string()))?;
        revwalk
            .push_head()
            .map_err(|e| HistoryError::IterFailed(e.message().to_string()))?;

        if let Some(oid) = exclude {
            revwalk
                .hide(oid)
                .map_err(|e| HistoryError::IterFailed(e.message().to_string()))?;
        }

        let mut commits = self.collect_records(revwalk, usize::MAX)?;
        // The revwalk yields newest first; presentation order is ascending.
        commits.sort_by_key(|c| c.committed_at);
        Ok(commits)
    }

    /// The newest `window` commits, re-ordered oldest first
    pub fn recent(&self, window: usize) -> Result<Vec<CommitRecord>, HistoryError> {
        let mut revwalk = self
            .repo
            .revwalk()
            .map_err(|e| HistoryError::IterFailed(e.message().to_string()))?;
        revwalk
            .set_sorting(Sort::TIME)
            .map_err(|e| HistoryError::IterFailed(e.message().to_string()))?;
        revwalk
            .push_head()
            .map_err(|e| HistoryError::IterFailed(e.message().to_string()))?;

        let mut commits = self.collect_records(revwalk, window)?;
        commits.sort_by_key(|c| c.committed_at);
        Ok(commits)
    }

    fn collect_records(
        &self,
        revwalk: git2::Revwalk<'_>,
        max: usize,
    ) -> Result<Vec<CommitRecord>, HistoryError> {
        let mut commits = Vec::new();

        for oid in revwalk {
            if commits.len() >= max {
                break;
            }

            let oid = oid.map_err(|e| HistoryError::IterFailed(e.message().to_string()))?;
            let commit = self
                .repo
                .find_commit(oid)
                .map_err(|e| HistoryError::ParseFailed(e.message().to_string()))?;

            commits.push(CommitRecord {
                sha: commit.id().to_string(),
                committer_name: commit.committer().name().unwrap_or("Unknown").to_string(),
                message: commit.message().unwrap_or("").to_string(),
                committed_at: timestamp(commit.time().seconds()),
            });
        }

        Ok(commits)
    }
}

/// Extract the commit range for changelog generation, failing soft
///
/// Changelog generation is a best-effort enhancement: a corrupted, missing,
/// or permission-denied repository yields an empty range rather than an
/// error. With a checkpoint the range is the reachability difference against
/// HEAD; without one, a bounded window of the most recent commits
/// ([`RECENT_WINDOW`] by convention).
pub fn extract_range(
    snapshot: &RepositorySnapshot,
    last_known: Option<&str>,
    window: usize,
) -> Vec<CommitRecord> {
    let reader = match HistoryReader::open(&snapshot.local_path) {
        Ok(reader) => reader,
        Err(err) => {
            tracing::warn!("Skipping changelog range extraction: {}", err);
            return Vec::new();
        }
    };

    let result = match last_known {
        Some(sha) => reader.range_since(Some(sha)),
        None => reader.recent(window),
    };

    match result {
        Ok(commits) => {
            tracing::info!("Extracted {} commits for changelog", commits.len());
            commits
        }
        Err(err) => {
            tracing::warn!("Commit range extraction failed: {}", err);
            Vec::new()
        }
    }
}

fn timestamp(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn fixture_repo() -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        (dir, repo)
    }

    fn add_commit(repo: &Repository, file: &str, message: &str, time_secs: i64) -> Oid {
        let workdir = repo.workdir().unwrap().to_path_buf();
        std::fs::write(workdir.join(file), message).unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new(file)).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();

        let sig = Signature::new("Test Author", "test@example.com", &git2::Time::new(time_secs, 0))
            .unwrap();
        let parent = repo
            .head()
            .ok()
            .and_then(|h| h.target())
            .map(|t| repo.find_commit(t).unwrap());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }

    fn snapshot_for(dir: &TempDir) -> RepositorySnapshot {
        let reader = HistoryReader::open(dir.path()).unwrap();
        reader.head_snapshot(dir.path()).unwrap()
    }

    #[test]
    fn test_open_missing_repo_fails() {
        let err = HistoryReader::open(Path::new("/nonexistent/repo")).unwrap_err();
        assert!(matches!(err, HistoryError::RepositoryUnreadable { .. }));
    }

    #[test]
    fn test_head_snapshot() {
        let (dir, repo) = fixture_repo();
        let oid = add_commit(&repo, "a.txt", "first commit", 1_700_000_000);

        let reader = HistoryReader::open(dir.path()).unwrap();
        let snapshot = reader.head_snapshot(dir.path()).unwrap();

        assert_eq!(snapshot.head_sha, oid.to_string());
        assert_eq!(snapshot.commit_author, "Test Author");
        assert_eq!(snapshot.commit_message, "first commit");
        assert_eq!(snapshot.commit_time.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_range_since_none_returns_full_history_ascending() {
        let (dir, repo) = fixture_repo();
        add_commit(&repo, "a.txt", "one", 1_700_000_000);
        add_commit(&repo, "b.txt", "two", 1_700_000_100);
        add_commit(&repo, "c.txt", "three", 1_700_000_200);

        let reader = HistoryReader::open(dir.path()).unwrap();
        let commits = reader.range_since(None).unwrap();

        assert_eq!(commits.len(), 3);
        assert_eq!(commits[0].message, "one");
        assert_eq!(commits[2].message, "three");
        assert!(commits[0].committed_at < commits[1].committed_at);
    }

    #[test]
    fn test_range_since_checkpoint_excludes_reachable() {
        let (dir, repo) = fixture_repo();
        let first = add_commit(&repo, "a.txt", "one", 1_700_000_000);
        add_commit(&repo, "b.txt", "two", 1_700_000_100);
        add_commit(&repo, "c.txt", "three", 1_700_000_200);

        let reader = HistoryReader::open(dir.path()).unwrap();
        let commits = reader.range_since(Some(&first.to_string())).unwrap();

        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].message, "two");
        assert_eq!(commits[1].message, "three");
    }

    #[test]
    fn test_range_since_head_is_empty() {
        let (dir, repo) = fixture_repo();
        add_commit(&repo, "a.txt", "one", 1_700_000_000);
        let head = add_commit(&repo, "b.txt", "two", 1_700_000_100);

        let reader = HistoryReader::open(dir.path()).unwrap();
        let commits = reader.range_since(Some(&head.to_string())).unwrap();
        assert!(commits.is_empty());
    }

    #[test]
    fn test_range_since_unresolvable_falls_back_to_full_history() {
        let (dir, repo) = fixture_repo();
        add_commit(&repo, "a.txt", "one", 1_700_000_000);
        add_commit(&repo, "b.txt", "two", 1_700_000_100);

        let reader = HistoryReader::open(dir.path()).unwrap();
        let bogus = "deadbeefdeadbeefdeadbeefdeadbeefdeadbeef";
        let commits = reader.range_since(Some(bogus)).unwrap();
        assert_eq!(commits.len(), 2);
    }

    #[test]
    fn test_recent_is_bounded_and_ascending() {
        let (dir, repo) = fixture_repo();
        for i in 0..30 {
            add_commit(
                &repo,
                &format!("f{i}.txt"),
                &format!("commit {i}"),
                1_700_000_000 + i * 60,
            );
        }

        let reader = HistoryReader::open(dir.path()).unwrap();
        let commits = reader.recent(RECENT_WINDOW).unwrap();

        assert_eq!(commits.len(), RECENT_WINDOW);
        // Window keeps the newest 20 of 30, re-ordered oldest first.
        assert_eq!(commits[0].message, "commit 10");
        assert_eq!(commits[19].message, "commit 29");
    }

    #[test]
    fn test_extract_range_fails_soft_on_missing_repo() {
        let snapshot = RepositorySnapshot {
            local_path: PathBuf::from("/nonexistent/repo"),
            branch_name: "master".to_string(),
            head_sha: String::new(),
            commit_time: DateTime::UNIX_EPOCH,
            commit_author: String::new(),
            commit_message: String::new(),
        };

        let commits = extract_range(&snapshot, None, RECENT_WINDOW);
        assert!(commits.is_empty());
    }

    #[test]
    fn test_extract_range_with_checkpoint() {
        let (dir, repo) = fixture_repo();
        let first = add_commit(&repo, "a.txt", "one", 1_700_000_000);
        add_commit(&repo, "b.txt", "two", 1_700_000_100);

        let commits = extract_range(&snapshot_for(&dir), Some(&first.to_string()), RECENT_WINDOW);
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].message, "two");
    }
}
