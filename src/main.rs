use std::path::PathBuf;
use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use tracing::info;

use innkeep::compactor;
use innkeep::engine::{BookingPolicy, Engine};
use innkeep::http;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let metrics_port: Option<u16> = std::env::var("INNKEEP_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    innkeep::observability::init(metrics_port);

    let port: u16 = std::env::var("INNKEEP_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);
    let bind = std::env::var("INNKEEP_BIND").unwrap_or_else(|_| "0.0.0.0".into());
    let data_dir = std::env::var("INNKEEP_DATA_DIR").unwrap_or_else(|_| "./data".into());
    let compact_threshold: u64 = std::env::var("INNKEEP_COMPACT_THRESHOLD")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1000);
    let maintenance_bookable = std::env::var("INNKEEP_MAINTENANCE_BOOKABLE")
        .map(|s| s == "true" || s == "1")
        .unwrap_or(false);

    // Ensure data directory exists
    std::fs::create_dir_all(&data_dir)?;
    let wal_path = PathBuf::from(&data_dir).join("innkeep.wal");

    let policy = BookingPolicy::new(maintenance_bookable);
    let engine = Arc::new(Engine::new(wal_path, policy)?);

    let compactor_engine = engine.clone();
    tokio::spawn(async move {
        compactor::run_compactor(compactor_engine, compact_threshold).await;
    });

    let addr = format!("{bind}:{port}");
    info!("innkeep listening on {addr}");
    info!("  data_dir: {data_dir}");
    info!("  rooms: {}", engine.room_count());
    info!("  guests: {}", engine.guest_count());
    info!("  maintenance_bookable: {maintenance_bookable}");
    info!(
        "  metrics: {}",
        metrics_port.map_or("disabled".to_string(), |p| format!(
            "http://0.0.0.0:{p}/metrics"
        ))
    );

    let app_engine = web::Data::new(engine);
    HttpServer::new(move || {
        App::new()
            .app_data(app_engine.clone())
            .wrap(middleware::NormalizePath::trim())
            .wrap(middleware::Logger::default())
            .configure(http::configure)
    })
    .bind(addr)?
    .run()
    .await?;

    info!("innkeep stopped");
    Ok(())
}
