use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use jobboard_backend::{
    config::{get_config, init_config},
    database::pool::{create_pool, run_migrations},
    routes,
    services::{memory_store::MemoryStore, pg_store::PgStore, store::Store},
    AppState,
};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    init_config()?;
    let config = Arc::new(get_config()?.clone());

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            run_migrations(&pool).await?;
            info!("Connected to Postgres, migrations applied");
            Arc::new(PgStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let app_state = AppState::from_config(config.clone(), store)?;

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        app_state.auth_service.bootstrap_admin(email, password).await?;
    }

    {
        let reconcile = app_state.reconcile_service.clone();
        let interval = Duration::from_secs(config.reconcile_interval_secs.max(1));
        tokio::spawn(async move {
            loop {
                match reconcile.run_once().await {
                    Ok(report) if report.is_clean() => {}
                    Ok(report) => info!(?report, "Reconciliation pass repaired records"),
                    Err(e) => tracing::error!(error = ?e, "Reconciliation worker error"),
                }
                tokio::time::sleep(interval).await;
            }
        });
    }

    info!("Serving uploads from: {}", config.uploads_dir);
    let app = routes::create_router(app_state);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
