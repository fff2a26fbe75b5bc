mod api;
mod middleware;
mod worker;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
    worker::{spawn_dispatcher, Sources},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(dvdscout_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::debug!(?config, "loaded configuration");

    let pool_config = dvdscout_db::PoolConfig::from_app_config(&config);
    let pool = dvdscout_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = dvdscout_db::run_migrations(&pool).await?;
    tracing::info!(applied, "migrations up to date");

    let sources = Arc::new(Sources::from_config(&config)?);
    let email_provider = sources.email.clone();
    let (queue, _dispatcher) = spawn_dispatcher(pool.clone(), sources);

    let auth = AuthState::from_env(
        matches!(config.env, dvdscout_core::Environment::Development),
        config.api_key_hash_salt.as_deref(),
    )?;
    let app = build_app(
        AppState {
            pool,
            queue,
            email_provider,
        },
        auth,
        default_rate_limit_state(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "dvdscout-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
