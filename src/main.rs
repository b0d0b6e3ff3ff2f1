use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commit_feed::config::{Cli, Command, reconcile_target};
use commit_feed::ingest::{reconcile_all, reconcile_project};
use commit_feed::server::{AppState, build_router};
use commit_feed::store::Store;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "commit_feed=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    if cli.ephemeral {
        warn!("Running with an in-memory store; data will not survive a restart");
    }
    let store = cli.open_store()?;

    match cli.action() {
        Command::Serve => serve(&cli, store).await,
        Command::Reconcile { project } => reconcile(store, project.as_deref()),
    }
}

async fn serve(cli: &Cli, store: Arc<dyn Store>) -> Result<(), Box<dyn Error>> {
    let app = build_router(AppState::new(store, cli.base_url.clone()));

    let listener = tokio::net::TcpListener::bind(cli.bind).await?;
    info!("listening on {}", cli.bind);
    axum::serve(listener, app).await?;
    Ok(())
}

fn reconcile(store: Arc<dyn Store>, project: Option<&str>) -> Result<(), Box<dyn Error>> {
    let results = match reconcile_target(project)? {
        Some(id) => match reconcile_project(store.as_ref(), &id)? {
            Some(result) => vec![result],
            None => return Err(format!("project not found: {id}").into()),
        },
        None => reconcile_all(store.as_ref())?,
    };

    let repaired = results.iter().filter(|r| r.changed()).count();
    info!(projects = results.len(), repaired, "Reconciliation finished");
    Ok(())
}
