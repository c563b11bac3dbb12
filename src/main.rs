mod assets;
mod config;
mod error;
mod gate;
mod links;
mod relay;
mod server;
mod session;

use anyhow::Context;
use clap::Parser;
use config::Config;
use server::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "link_console=info,tower_http=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cfg = Config::parse();
    let state = AppState::from_config(&cfg)?;

    if state.auth.password.is_none() {
        tracing::warn!("CONSOLE_PASSWORD is not set; every login attempt will fail with 500");
    }
    if state.admin.is_none() {
        tracing::warn!("API_BASE_URL or ADMIN_TOKEN is not set; link operations will fail with 500");
    }
    if !cfg.production {
        tracing::info!("session cookie is issued without the Secure flag (pass --production behind TLS)");
    }

    let addr = cfg.bind_addr();
    let app = server::router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        "{} listening on http://{}",
        cfg.site_title,
        listener.local_addr()?
    );
    if let Some(base) = cfg.api_base_url() {
        tracing::info!("relaying link operations to {base}");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("shutdown requested by Ctrl+C"),
        _ = terminate => tracing::info!("shutdown requested by SIGTERM"),
    }
}
