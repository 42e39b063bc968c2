use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use std::sync::Arc;

use ponto::clock::SystemClock;
use ponto::config::{Config, StorageBackend};
use ponto::db::init_db;
use ponto::docs::ApiDoc;
use ponto::routes;
use ponto::state::AppState;
use ponto::store::{MemoryStore, MySqlStore, PersistencePort};
use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Ponto"
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn PersistencePort>> {
    match config.storage_backend {
        StorageBackend::Mysql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            let pool = init_db(url).await.context("Failed to connect to MySQL")?;
            let store = MySqlStore::new(pool);
            store.ensure_schema().await.context("Failed to create schema")?;
            info!("MySQL store ready");
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory store; data is lost on shutdown");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // One file per day under LOG_DIR.
    let file_appender = rolling::daily(&config.log_dir, "ponto.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    info!(backend = %config.storage_backend, "Server starting...");

    let store = open_store(&config).await?;
    let state = Data::new(AppState::new(
        store.clone(),
        Arc::new(SystemClock),
        config.calendar()?,
    ));

    let admin = state
        .identities
        .bootstrap_admin(&config.admin_seed())
        .await
        .context("Failed to bootstrap administrator")?;
    info!(matricula = %admin.matricula, "Administrator available");

    let warmup_state = state.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = warmup_state.identities.warmup().await {
            error!(error = %e, "Failed to warm up registration index");
        }
    });

    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config.clone());

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                // Tail segment serves the UI's static assets.
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(state.clone())
            .app_data(config_data.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, &config))
    })
    .bind(server_addr)?
    .run()
    .await?;

    store.close().await;
    info!("Server stopped");
    Ok(())
}
