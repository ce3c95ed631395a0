use weblog_app::config::AppConfig;
use weblog_app::error::AppResult;
use weblog_app::state::AppState;
use weblog_app::telemetry;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {err}");
            std::process::exit(2);
        }
    };

    // --- Tracing ---
    telemetry::init(config.log_format);

    if let Err(err) = run(config).await {
        tracing::error!(error = %err, "Fatal error");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> AppResult<()> {
    tracing::info!(
        themes_dir = %config.themes_dir.display(),
        max_connections = config.db_max_connections,
        "Loaded configuration",
    );

    // --- Database ---
    let pool = weblog_db::create_pool(&config.database_url, config.db_max_connections).await?;
    tracing::info!("Database connection pool created");

    weblog_db::health_check(&pool).await?;
    tracing::info!("Database health check passed");

    weblog_db::run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    // --- Themes ---
    let state = AppState::new(pool, config);
    let report = state.reload_themes()?;
    tracing::info!(
        loaded = report.loaded.len(),
        failed = report.failed.len(),
        "Shared themes loaded",
    );

    // --- Serve until shutdown; SIGHUP reloads themes ---
    wait_for_signals(&state).await;

    state.pool.close().await;
    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Reload themes on SIGHUP and return on SIGINT (Ctrl-C) or SIGTERM.
#[cfg(unix)]
async fn wait_for_signals(state: &AppState) {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut hangup, mut terminate) =
        match (signal(SignalKind::hangup()), signal(SignalKind::terminate())) {
            (Ok(hangup), Ok(terminate)) => (hangup, terminate),
            (Err(err), _) | (_, Err(err)) => {
                tracing::error!(error = %err, "Failed to install signal handlers");
                return;
            }
        };

    loop {
        tokio::select! {
            _ = hangup.recv() => {
                tracing::info!("Received SIGHUP, reloading shared themes");
                if let Err(err) = state.reload_themes() {
                    tracing::error!(error = %err, "Theme reload failed");
                }
            }
            _ = terminate.recv() => {
                tracing::info!("Received SIGTERM, shutting down");
                return;
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(err) = result {
                    tracing::error!(error = %err, "Failed to listen for Ctrl-C");
                }
                tracing::info!("Received SIGINT (Ctrl-C), shutting down");
                return;
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signals(_state: &AppState) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for Ctrl-C");
    }
    tracing::info!("Received Ctrl-C, shutting down");
}
