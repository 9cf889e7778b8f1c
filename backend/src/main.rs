use std::net::SocketAddr;

use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, Level};

mod db;
mod report;
mod rest;

use rest::AppState;

// Where generated CSV reports land on disk.
const REPORTS_DIR: &str = "reports";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("Setting up database");
    let db = db::DbConnection::init().await?;
    let reports = report::ReportService::new(REPORTS_DIR);

    let state = AppState::new(db, reports);

    // CORS setup to allow the web client to make requests
    let cors = CorsLayer::new()
        .allow_origin("http://localhost:8080".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let app = Router::new()
        .route("/users", post(rest::create_user))
        .route("/users/:user_id", get(rest::get_user).put(rest::update_user))
        .route("/expenses", post(rest::create_expense))
        .route(
            "/expenses/:expense_id",
            get(rest::get_expense)
                .put(rest::update_expense)
                .delete(rest::delete_expense),
        )
        .route("/expenses/user/:user_id", get(rest::list_user_expenses))
        .route("/reports/:user_id", get(rest::generate_report))
        .route("/reports/download/:token", get(rest::download_report))
        .layer(cors)
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
