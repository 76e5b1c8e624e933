use std::sync::Arc;

use marstrade_infra::{MemoryStore, PostgresStore, TradeStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    marstrade_observability::init();

    let store: Arc<dyn TradeStore> = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = sqlx::PgPool::connect(&url).await?;
            let store = PostgresStore::new(pool);
            store.migrate().await?;
            Arc::new(store)
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; using in-memory store (state is not persisted)");
            Arc::new(MemoryStore::new())
        }
    };

    let app = marstrade_api::app::build_app(store);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
