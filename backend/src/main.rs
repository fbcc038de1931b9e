mod config;
mod flash;
mod gateway;
mod pages;
mod routes;
mod storage;

use actix_web::{App, HttpServer, middleware};
use config::GatewayConfig;
use routes::configure_routes;
use std::env;
use storage::disk_service::DiskService;
use storage::retention::spawn_sweeper;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = match GatewayConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e));
        }
    };

    let disk = DiskService::new(config.upload_dir.clone());
    if let Err(e) = disk.ensure_root() {
        log::error!("Cannot prepare upload directory: {}", e);
        return Err(std::io::Error::other(e));
    }
    log::info!(
        "Storing uploads in {} (max {} bytes, extensions: {})",
        disk.root().display(),
        config.max_bytes,
        config
            .allowed_extensions
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    );

    spawn_sweeper(
        config.retention.policy(),
        config.upload_dir.clone(),
        config.allowed_extensions.clone(),
        config.retention.sweep_interval(),
    );

    let key = flash::signing_key(config.secret_key.as_deref());
    let bind_address = config.bind_address.clone();

    log::info!("Starting SDSS galaxy classification server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(flash::session_middleware(key.clone(), config.cookie_secure))
            .wrap(middleware::Logger::default())
            .configure(|cfg| configure_routes(cfg, &config))
    })
    .bind(&bind_address)?
    .run()
    .await
}
