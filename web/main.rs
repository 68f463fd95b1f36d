mod book;
mod error;

use axum::{
    Router,
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    routing::get,
};
use clap::Parser;
use shelf::{
    config::{self, DatabaseSettings, LogSettings, ServerSettings},
    database::Database,
    telemetry,
};
use std::sync::Arc;
use thiserror::Error;
use tower::{ServiceBuilder, timeout::TimeoutLayer};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Parser)]
#[command(name = "shelf-web")]
#[command(about = "Book catalog REST API", long_about = None)]
struct Cli {
    #[command(flatten)]
    database: DatabaseSettings,

    #[command(flatten)]
    server: ServerSettings,

    #[command(flatten)]
    log: LogSettings,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
}

#[derive(Debug, Error)]
enum StartupError {
    #[error("failed to open database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to serve: {0}")]
    Io(#[from] std::io::Error),
}

pub fn router(state: AppState, settings: &ServerSettings) -> Router {
    let routes = Router::new()
        .route("/api/books", get(book::list_books).post(book::post_book))
        .route("/api/books/tags", get(book::get_tags))
        .route(
            "/api/books/{id}",
            get(book::get_book)
                .put(book::put_book)
                .delete(book::delete_book),
        )
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state);

    with_layers(routes, settings)
}

fn with_layers(app: Router, settings: &ServerSettings) -> Router {
    app.layer(DefaultBodyLimit::max(settings.max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(error::handle_layer_error))
                .layer(TimeoutLayer::new(settings.request_timeout())),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    config::load_dotenv();
    let cli = Cli::parse();
    telemetry::init(&cli.log);

    let db = Database::open(&cli.database.url).await?;
    let state = AppState { db: Arc::new(db) };
    let app = router(state.clone(), &cli.server);

    let listener = tokio::net::TcpListener::bind(cli.server.bind).await?;
    tracing::info!(addr = %cli.server.bind, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.db.close().await;
    Ok(())
}
