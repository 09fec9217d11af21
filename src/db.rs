use anyhow::Context;
use sqlx::{MySqlPool, mysql::MySqlPoolOptions};
use tracing::info;

pub async fn init_db(database_url: &str) -> anyhow::Result<MySqlPool> {
    let pool = MySqlPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    info!("Database ready");

    Ok(pool)
}
