use std::sync::Arc;

use crewforge_api::app::{build_app, services::AppServices};
use crewforge_infra::db;
use crewforge_ledger::LedgerClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    crewforge_observability::init();

    let ledger = LedgerClient::from_env();
    if !ledger.is_enabled() {
        tracing::warn!("ledger settings absent; running with ledger disabled");
    }

    let services = match std::env::var(db::ENV_DATABASE_URL) {
        Ok(url) => {
            let pool = db::connect(&url).await?;
            Arc::new(AppServices::postgres(pool, ledger))
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; using volatile in-memory storage");
            Arc::new(AppServices::in_memory(ledger))
        }
    };

    let scoring_worker = services.scoring_worker().spawn();
    let ledger_worker = services.ledger_worker().spawn();

    let app = build_app(services);
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    scoring_worker.shutdown().await;
    ledger_worker.shutdown().await;
    Ok(())
}
