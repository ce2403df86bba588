use theta_desk::commentary;
use theta_desk::config::AppConfig;
use theta_desk::desk::Desk;
use theta_desk::engine::{run_desk, Commentator};
use theta_desk::models::build_model;
use theta_desk::server;
use theta_desk::state::{AppState, DeskEvent};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() {
    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("theta_desk starting");

    // Load config
    let cfg = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    let desk = match Desk::new(&cfg, build_model(cfg.pricing_model)) {
        Ok(d) => d,
        Err(e) => {
            tracing::error!("desk init error: {e}");
            std::process::exit(1);
        }
    };

    // Without a key the static fallback text is shown on commentary days
    let commentator: Commentator = Some(commentary::build_provider(&cfg));

    // Bounded event channel: routes + commentary tasks -> desk engine
    let (engine_tx, engine_rx) = mpsc::channel::<DeskEvent>(256);
    let app_state = AppState::new(cfg.clone(), engine_tx.clone());

    // Desk engine task (sole owner of the simulation state)
    let engine_state = app_state.clone();
    let engine = tokio::spawn(async move {
        run_desk(engine_state, desk, commentator, engine_rx).await;
    });

    let app = server::router(app_state.clone());

    let addr = format!("0.0.0.0:{}", cfg.server_port);
    tracing::info!("server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("bind error: {e}");
            std::process::exit(1);
        });

    let shutdown_tx = engine_tx.clone();
    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("ctrl-c received");
        let _ = shutdown_tx.send(DeskEvent::Shutdown).await;
    });

    if let Err(e) = serve.await {
        tracing::error!("server error: {e}");
    }

    let _ = engine_tx.send(DeskEvent::Shutdown).await;
    let _ = engine.await;
}
