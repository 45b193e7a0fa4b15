//! Changelog generation from a commit range
//!
//! Formats the range into a prompt payload, streams the model response, and
//! parses it defensively. Model output is adversarial: the changelog may be
//! wrapped in sentinel tags, buried in prose, or missing entirely. Every
//! failure mode here collapses to an empty entry list; callers cannot tell
//! "no changes" from "extraction failed", and that is the contract.

use crate::error::SummarizeError;
use crate::generation::{COMMIT_ANALYSIS, FragmentStream, GenerationArgs, TextGenerator};
use crate::types::{ChangelogEntry, CommitRecord};
use futures::StreamExt;
use regex::Regex;
use tokio_util::sync::CancellationToken;

/// Default bound on model output echoed into logs on parse failure
pub const DEFAULT_PREVIEW_LEN: usize = 500;

/// Turns commit ranges into structured changelog entries
pub struct ChangeSummarizer {
    preview_len: usize,
}

impl Default for ChangeSummarizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeSummarizer {
    pub fn new() -> Self {
        Self {
            preview_len: DEFAULT_PREVIEW_LEN,
        }
    }

    /// Create with a custom log-preview bound
    pub fn with_preview_len(preview_len: usize) -> Self {
        Self { preview_len }
    }

    /// Create from the changelog configuration section
    pub fn from_config(config: &crate::config::ChangelogConfig) -> Self {
        Self {
            preview_len: config.preview_len,
        }
    }

    /// Summarize a commit range into changelog entries
    ///
    /// Never fails: generation errors, parse failures, and cancellation all
    /// yield an empty list. Cancellation discards partial output; no entries
    /// from a cancelled stream are ever returned.
    pub async fn summarize(
        &self,
        commits: &[CommitRecord],
        readme: &str,
        remote_address: &str,
        branch: &str,
        generator: &dyn TextGenerator,
        cancel: &CancellationToken,
    ) -> Vec<ChangelogEntry> {
        let branch = if branch.is_empty() {
            tracing::warn!("Branch is empty, defaulting to 'main'");
            "main"
        } else {
            branch
        };

        tracing::info!(
            "Summarizing {} commits for '{}' (branch '{}')",
            commits.len(),
            remote_address,
            branch
        );

        let args = GenerationArgs {
            readme: readme.to_string(),
            git_repository: remote_address.to_string(),
            commit_message: format_commits(commits),
            git_branch: branch.to_string(),
        };

        let stream = match generator.generate(COMMIT_ANALYSIS, args).await {
            Ok(stream) => stream,
            Err(err) => {
                let err = SummarizeError::GenerationFailed(format!("{err:#}"));
                tracing::warn!("{}", err);
                return Vec::new();
            }
        };

        let response = match collect_stream(stream, cancel).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!("{}", err);
                return Vec::new();
            }
        };

        tracing::debug!("Received {} characters of model output", response.len());
        parse_changelog(&response, self.preview_len)
    }
}

/// Format commits as delimited records for the prompt payload
///
/// Message bodies are wrapped in paired open/close markers rather than
/// separated by a single delimiter character, so messages that themselves
/// contain delimiter-like text stay unambiguous.
pub(crate) fn format_commits(commits: &[CommitRecord]) -> String {
    let mut payload = String::new();

    for commit in commits {
        payload.push_str("Author: ");
        payload.push_str(&commit.committer_name);
        payload.push_str("\n<message>\n");
        payload.push_str(&commit.message);
        if !commit.message.ends_with('\n') {
            payload.push('\n');
        }
        payload.push_str("</message>\nDate: ");
        payload.push_str(&commit.committed_at.format("%Y-%m-%d %H:%M:%S").to_string());
        payload.push_str("\n\n");
    }

    payload
}

/// Concatenate stream fragments, honoring cooperative cancellation
async fn collect_stream(
    mut stream: FragmentStream,
    cancel: &CancellationToken,
) -> Result<String, SummarizeError> {
    let mut response = String::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Err(SummarizeError::Cancelled),
            fragment = stream.next() => match fragment {
                Some(Ok(text)) => response.push_str(&text),
                Some(Err(err)) => {
                    return Err(SummarizeError::GenerationFailed(format!("{err:#}")));
                }
                None => break,
            }
        }
    }

    Ok(response)
}

/// Parse changelog entries out of unstructured model text
///
/// Pipeline: sentinel-tag extraction, trim, bracketed-list search, strict
/// decode. Each stage is skipped if the prior one already produced usable
/// structure; any failure yields an empty list. Degraded parses are
/// distinguishable in logs via the `degraded` field.
pub(crate) fn parse_changelog(response: &str, preview_len: usize) -> Vec<ChangelogEntry> {
    let mut text = response.to_string();

    if let Ok(tag_pattern) = Regex::new(r"(?s)<changelog>(.*?)</changelog>") {
        match tag_pattern.captures(&text) {
            Some(captures) => {
                text = captures[1].to_string();
                tracing::debug!("Extracted content from <changelog> tags");
            }
            None => tracing::debug!("No <changelog> tags found in response"),
        }
    }

    let trimmed = text.trim().to_string();

    let list_text = if trimmed.starts_with('[') {
        trimmed
    } else {
        let embedded = Regex::new(r"(?s)\[.*\]")
            .ok()
            .and_then(|pattern| pattern.find(&trimmed).map(|m| m.as_str().to_string()));

        match embedded {
            Some(body) => {
                tracing::debug!("Found bracketed list inside response text");
                body
            }
            None => {
                tracing::warn!(
                    degraded = true,
                    "No changelog list found in response: {}",
                    preview(&trimmed, preview_len)
                );
                return Vec::new();
            }
        }
    };

    match serde_json::from_str::<Vec<ChangelogEntry>>(&list_text) {
        Ok(entries) => {
            tracing::info!("Parsed {} changelog entries", entries.len());
            entries
        }
        Err(err) => {
            tracing::warn!(
                degraded = true,
                "Failed to decode changelog entries: {}. Content: {}",
                err,
                preview(&list_text, preview_len)
            );
            Vec::new()
        }
    }
}

/// Bounded, char-boundary-safe preview of model output for logs
fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max_chars).collect();
        cut.push_str("...");
        cut
    }
}
