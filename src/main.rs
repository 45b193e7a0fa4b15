use anyhow::Result;
use clap::Parser;
use repo_sync::config::Config;
use repo_sync::transport::{DEFAULT_BRANCH, GitTransport, TransportOptions};
use repo_sync::types::Credentials;
use std::path::PathBuf;

/// Synchronize a repository and report its incremental commit range as JSON
#[derive(Parser)]
#[command(name = "repo-sync", version, about)]
struct Cli {
    /// Remote repository address
    remote: String,

    /// Branch to check out
    #[arg(long, default_value = DEFAULT_BRANCH)]
    branch: String,

    /// Username for authenticated remotes
    #[arg(long, env = "REPO_SYNC_USERNAME")]
    username: Option<String>,

    /// Password or token for authenticated remotes
    #[arg(long, env = "REPO_SYNC_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Checkpoint commit recorded by the previous sync
    #[arg(long)]
    since: Option<String>,

    /// Override the working-tree root directory
    #[arg(long)]
    root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the JSON report
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    let mut config = Config::new()?;
    if let Some(root) = cli.root {
        config.sync.repos_root = root;
    }

    let credentials = match (cli.username, cli.password) {
        (Some(username), Some(password)) => Some(Credentials { username, password }),
        _ => None,
    };

    let transport = GitTransport::new(
        config.sync.repos_root.clone(),
        TransportOptions::from(&config.transport),
    );

    let snapshot = transport
        .clone(&cli.remote, credentials.as_ref(), &cli.branch)
        .await?;
    let (commits, head_sha) = transport
        .pull(&snapshot.local_path, cli.since.as_deref(), credentials.as_ref())
        .await?;

    let report = serde_json::json!({
        "snapshot": snapshot,
        "head_sha": head_sha,
        "commits": commits,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
