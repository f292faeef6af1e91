use headache_tracker::{
    database_file, resolve_config_dir, resolve_database_url, router, AppState, ConfigStore, EntryStore,
};
use std::{env, net::SocketAddr};
use tokio::{fs, signal};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = ConfigStore::new(resolve_config_dir());
    let settings = config.load_settings().await;
    info!(dir = %config.dir().display(), "loaded setup files");

    let url = resolve_database_url(settings.datastore.as_ref().map(|datastore| datastore.url.as_str()));
    if let Some(parent) = database_file(&url).as_deref().and_then(|path| path.parent()) {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let store = EntryStore::open(&url).await?;
    info!(%url, "opened entry store");

    let app = router(AppState::new(store, config, settings));

    let host = env::var("HOST")
        .ok()
        .and_then(|value| value.parse::<std::net::IpAddr>().ok())
        .unwrap_or([0, 0, 0, 0].into());
    let port = env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from((host, port));

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {err}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutting down");
}
