/// Core data model shared across the sync pipeline
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Username/password credentials for a remote repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// State of a checked-out working tree at a point in time
///
/// Created by a successful clone or pull; superseded, never mutated, by each
/// subsequent pull.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    /// Local working tree path
    pub local_path: PathBuf,
    /// Friendly name of the checked-out branch
    pub branch_name: String,
    /// SHA of the commit at HEAD
    pub head_sha: String,
    /// Committer timestamp of HEAD
    pub commit_time: DateTime<Utc>,
    /// Committer name of HEAD
    pub commit_author: String,
    /// Full commit message of HEAD
    pub commit_message: String,
}

/// A single commit sourced from the version-control engine
///
/// Ordering key is `committed_at`: ascending for presentation to the
/// summarizer, descending for the bounded recency window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Full commit SHA hash (40 characters)
    pub sha: String,
    /// Committer's name
    pub committer_name: String,
    /// Commit message (first line and body)
    pub message: String,
    /// Committer timestamp
    pub committed_at: DateTime<Utc>,
}

/// One generated changelog entry
///
/// Produced only by the change summarizer; a parse failure yields an empty
/// list of these, never a null collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    /// Date the change applies to
    #[serde(deserialize_with = "flexible_date::deserialize")]
    pub date: DateTime<Utc>,
    /// Short human-readable title
    pub title: String,
    /// Longer description of the change
    pub description: String,
}

/// Permissive date decoding for model-produced changelog entries
///
/// Accepts RFC 3339 timestamps, naive datetimes, and bare `YYYY-MM-DD`
/// dates; model output uses all three.
pub mod flexible_date {
    use super::*;
    use serde::Deserializer;
    use serde::de::Error as _;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("unrecognized date format: {raw}")))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }

        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
            return Some(naive.and_utc());
        }

        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
            return Some(naive.and_utc());
        }

        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
        }

        None
    }
}
