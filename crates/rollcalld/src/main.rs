use anyhow::{Context, Result};
use rollcall_core::{CsvLedgerFile, Gallery, Ledger, OnnxFaceEncoder, Roster};
use tracing_subscriber::EnvFilter;

mod config;
mod engine;
mod error;
mod routes;
mod workflow;

#[cfg(test)]
mod test_support;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = config::Config::from_env();
    config.validate()?;
    tracing::info!(?config, "rollcalld starting");

    let roster = Roster::open(&config.roster_dir)
        .with_context(|| format!("opening roster {}", config.roster_dir.display()))?;

    let mut encoder = OnnxFaceEncoder::load(&config.model_dir)
        .with_context(|| format!("loading models from {}", config.model_dir.display()))?;

    // The startup gallery is built once, then owned by the engine thread.
    let gallery = Gallery::scan(&roster, &mut encoder)?;
    let engine = engine::spawn_engine(Box::new(encoder), gallery, config.match_tolerance)?;

    let ledger = Ledger::new(CsvLedgerFile::new(&config.ledger_path));
    let service = workflow::Service::new(engine, roster, ledger, config.images_per_registration);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()?)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    tracing::info!(addr = %config.bind, "rollcalld ready");

    axum::serve(listener, routes::router(service))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("rollcalld shutting down");
        })
        .await?;

    Ok(())
}
