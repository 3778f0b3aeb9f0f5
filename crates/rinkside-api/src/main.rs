//! Rinkside API Server

use rinkside_api::{AppState, routes};
use rinkside_config::{PipelineConfig, SystemConfig, load_pipeline_config};
use rinkside_db::{PgGameRepo, PgQuoteRepo, PgVideoRepo, create_pool, run_migrations};
use rinkside_scheduler::{Scheduler, Sources, Stores};
use rinkside_sources::{AnthropicRecapWriter, NhlClient, RedditClient, YouTubeClient};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let system = SystemConfig::from_env()?;

    let pipeline = match &system.pipeline_config {
        Some(path) => {
            info!(path = %path.display(), "Loading pipeline config");
            load_pipeline_config(path)?
        }
        None => PipelineConfig::default(),
    };
    let pipeline = Arc::new(pipeline);

    info!("Connecting to database...");
    let pool = create_pool(&system.database_url).await?;
    run_migrations(&pool).await?;
    info!("Database connected");

    let stores = Stores {
        games: Arc::new(PgGameRepo::new(pool.clone())),
        videos: Arc::new(PgVideoRepo::new(pool.clone())),
        quotes: Arc::new(PgQuoteRepo::new(pool)),
    };

    let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

    let reddit = Arc::new(RedditClient::new(
        http.clone(),
        &system.reddit_base_url,
        &system.reddit_user_agent,
    ));
    let feed = Arc::new(NhlClient::new(http.clone(), &system.nhl_api_base_url));
    let mut sources = Sources::new(feed, reddit.clone());

    match &system.youtube_api_key {
        Some(key) => {
            sources = sources.with_highlights(Arc::new(YouTubeClient::new(
                http.clone(),
                &system.youtube_api_base_url,
                key,
            )));
        }
        None => warn!("YOUTUBE_API_KEY not set, highlight search disabled"),
    }

    match &system.anthropic_api_key {
        Some(key) => {
            sources = sources.with_recaps(Arc::new(AnthropicRecapWriter::new(
                http,
                &system.anthropic_api_base_url,
                key,
                &system.recap_model,
            )));
        }
        None => warn!("ANTHROPIC_API_KEY not set, recaps use the template"),
    }

    let scheduler = Arc::new(Scheduler::new(
        sources,
        stores.clone(),
        pipeline.clone(),
        system.worker_id.clone(),
    ));

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let scheduler_task = if system.scheduler_enabled {
        info!(
            team = %pipeline.team,
            worker_id = %system.worker_id,
            "Starting scheduler"
        );
        let scheduler = scheduler.clone();
        Some(tokio::spawn(async move {
            scheduler
                .run(async move {
                    let _ = shutdown_rx.changed().await;
                })
                .await;
        }))
    } else {
        info!("Scheduler disabled");
        None
    };

    let state = AppState::new(stores, reddit, scheduler);

    // Build router
    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    info!("Starting server on {}", system.bind_addr);
    let listener = TcpListener::bind(system.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(task) = scheduler_task {
        if let Err(e) = task.await {
            error!(error = %e, "Scheduler task failed");
        }
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
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

    info!("Shutdown signal received");
}
