use std::net::SocketAddr;
use std::sync::Arc;

use screening_backend::{
    config::{get_config, init_config},
    database::{
        pool::{create_pool, run_migrations},
        MemoryStore, PgStore, Store,
    },
    routes, AppState,
};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    init_config()?;
    let config = Arc::new(get_config()?.clone());

    let store: Arc<dyn Store> = match config.database_url.as_deref() {
        Some(url) => {
            let pool = create_pool(url).await?;
            run_migrations(&pool).await?;
            info!("using PostgreSQL store");
            Arc::new(PgStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, state is kept in memory and lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let app_state = AppState::new(config.clone(), store)?;
    let app = routes::app_router(app_state);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
