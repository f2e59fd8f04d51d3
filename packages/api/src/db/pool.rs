//! Database connection pool using the OnceCell pattern.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::OnceCell;

static POOL: OnceCell<PgPool> = OnceCell::const_new();

/// Get or initialize the database connection pool.
pub async fn get_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<&'static PgPool, sqlx::Error> {
    POOL.get_or_try_init(|| async {
        tracing::info!(max_connections, "Opening database pool");

        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
    })
    .await
}

/// Apply pending schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
