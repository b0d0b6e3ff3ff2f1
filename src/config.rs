//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::store::{FileStore, MemoryStore, Store, StoreError};
use crate::types::{InvalidProjectId, ProjectId};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    InvalidProjectId(#[from] InvalidProjectId),

    /// The data directory could not be opened.
    #[error("cannot open store: {0}")]
    Store(#[from] StoreError),
}

/// Commit feed server
#[derive(Parser, Debug)]
#[command(name = "commit-feed")]
#[command(about = "Ingests push webhooks and serves a commit activity feed", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Address to listen on (can also be set via BIND_ADDRESS env var)
    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0:5000", global = true)]
    pub bind: SocketAddr,

    /// Directory for project and commit records (can also be set via DATA_DIR env var)
    #[arg(long, env = "DATA_DIR", default_value = "./data", global = true)]
    pub data_dir: PathBuf,

    /// Public base URL used in webhook URLs (can also be set via BASE_URL env var)
    #[arg(long, env = "BASE_URL", default_value = "http://localhost:5000", global = true)]
    pub base_url: String,

    /// Keep everything in memory; nothing survives a restart
    #[arg(long, global = true)]
    pub ephemeral: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server (the default)
    Serve,

    /// Recompute project aggregates from stored commits
    Reconcile {
        /// Only this project; all projects when omitted
        #[arg(short, long)]
        project: Option<String>,
    },
}

impl Cli {
    /// The subcommand to run, defaulting to `serve`.
    pub fn action(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }

    pub fn open_store(&self) -> Result<Arc<dyn Store>, ConfigError> {
        if self.ephemeral {
            return Ok(Arc::new(MemoryStore::new()));
        }
        Ok(Arc::new(FileStore::open(&self.data_dir)?))
    }
}

/// Parses the `--project` argument of `reconcile`.
pub fn reconcile_target(project: Option<&str>) -> Result<Option<ProjectId>, ConfigError> {
    Ok(project.map(ProjectId::parse).transpose()?)
}
