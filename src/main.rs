use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod documents;
mod error;
mod model;
mod models;
mod routes;
mod salary;
mod utils;

use config::Config;
use db::init_db;

use crate::auth::bootstrap::seed_admin;
use crate::auth::session::SessionStore;
use crate::docs::ApiDoc;
use crate::documents::DocumentStore;
use crate::utils::presence::USERNAMES;
use tracing::{info, warn};
use tracing_appender::rolling;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "HR letters service"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(EnvFilter::new(&config.log_level))
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(addr = %config.server_addr, "Server starting...");

    let pool = init_db(&config.database_url).await?;

    match &config.admin_seed {
        Some(seed) => {
            if seed_admin(&pool, seed).await? {
                USERNAMES.mark_taken(&seed.username).await;
            }
        }
        None => info!("ADMIN_USERNAME not set, no admin seeded"),
    }

    let pool_for_warmup = pool.clone();
    actix_web::rt::spawn(async move {
        // Users seen in the last 30 days, in batches of 250
        if let Err(e) = USERNAMES.warmup(&pool_for_warmup, 250, 30).await {
            warn!(error = ?e, "Failed to warm up username index");
        }
    });

    let server_addr = config.server_addr.clone();
    let sessions = Data::new(SessionStore::with_timeout_secs(config.session_timeout));
    let store = Data::new(DocumentStore::from_config(&config));
    let pool = Data::new(pool);
    let config_data = Data::new(config.clone());

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(pool.clone())
            .app_data(config_data.clone())
            .app_data(sessions.clone())
            .app_data(store.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, config.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
