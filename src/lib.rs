//! # repo-sync - Repository Synchronization and Changelog Core
//!
//! The synchronization core of a documentation-generation service: it clones
//! remote version-controlled repositories into deterministic local paths,
//! computes the incremental commit range since the previous snapshot, and
//! turns that range into structured changelog entries by defensively parsing
//! the output of a streaming text-generation collaborator.
//!
//! ## Overview
//!
//! Repositories are synchronized one unit of work at a time: clone (or pull)
//! the working tree, extract the commits made since the last recorded
//! checkpoint, and hand them to a language model for changelog prose. The
//! model's output carries no schema guarantees, so parsing is fail-soft
//! end to end: a missing or mangled changelog is indistinguishable from
//! "no changes this cycle".
//!
//! ## Key Features
//!
//! - **Deterministic layout**: hash-prefixed short local paths, stable
//!   across runs, collision-resistant across repositories
//! - **Resilient clones**: command-line clone with library fallback, two
//!   full attempt sequences, clean target directory every time
//! - **Incremental ranges**: reachability-difference commit ranges so
//!   merges and rebases are handled correctly
//! - **Defensive parsing**: sentinel-tag extraction, bracketed-list search,
//!   strict decode, every failure absorbed into an empty changelog
//! - **Cooperative cancellation**: a cancelled generation stream discards
//!   all partial output
//!
//! ## Data Flow
//!
//! ```text
//! remote URL
//!     │ location::resolve
//!     ▼
//! local path ──► GitTransport::clone ──► RepositorySnapshot
//!                                             │ GitTransport::pull
//!                                             ▼
//!                              ordered CommitRecord range + new HEAD
//!                                             │ ChangeSummarizer
//!                                             ▼
//!                                    Vec<ChangelogEntry> ──► SnapshotStore
//! ```
//!
//! ## Modules
//!
//! - [`location`]: deterministic remote-address to local-path resolution
//! - [`transport`]: clone/pull with credential injection and fallback
//! - [`history`]: commit range extraction from local working trees
//! - [`summarizer`]: prompt formatting, streaming, defensive parsing
//! - [`generation`]: text-generation collaborator seam and request shaping
//! - [`pipeline`]: one sync cycle end to end, persistence seam
//! - [`config`]: configuration management with environment variable support
//! - [`types`]: core data model
//! - [`error`]: error types and utilities
//! - [`paths`]: platform path computation
//!
//! ## Usage Example
//!
//! ```no_run
//! use repo_sync::transport::{GitTransport, TransportOptions, DEFAULT_BRANCH};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let transport = GitTransport::new("/var/lib/repo-sync/repos", TransportOptions::default());
//!
//!     let snapshot = transport
//!         .clone("https://git.example.com/acme/widgets", None, DEFAULT_BRANCH)
//!         .await?;
//!
//!     let (commits, head) = transport.pull(&snapshot.local_path, None, None).await?;
//!     println!("{} commits up to {}", commits.len(), head);
//!
//!     Ok(())
//! }
//! ```

/// Configuration management with environment variable overrides
pub mod config;

/// Error types and utilities
pub mod error;

/// Text-generation collaborator seam and request shaping
pub mod generation;

/// Commit history reading and incremental range extraction
pub mod history;

/// Deterministic remote-address to local-path resolution
pub mod location;

/// Platform path computation
pub mod paths;

/// End-to-end sync cycle orchestration and the persistence seam
pub mod pipeline;

/// Changelog generation from commit ranges
pub mod summarizer;

/// Clone and pull operations against remote repositories
pub mod transport;

/// Core data model shared across the pipeline
pub mod types;
