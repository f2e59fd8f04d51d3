//! Dashboard server: auth callback, session endpoints and connected accounts.

use anyhow::Context;
use api::auth::{AuthConfig, GoTrueClient};
use api::registry::{PgProviderAccountStore, ProviderAccountRegistry};
use api::{router, AppState};
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::EnvFilter;

use settings::Settings;

mod settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::new().context("Failed to load settings")?;

    let pool = api::db::get_pool(&settings.database.url(), settings.database.max_connections)
        .await
        .context("Failed to connect to database")?;

    api::db::run_migrations(pool)
        .await
        .context("Failed to run migrations")?;

    let session_store = PostgresStore::new(pool.clone());
    session_store
        .migrate()
        .await
        .context("Failed to migrate session store")?;

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(settings.session.secure)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(
            settings.session.inactivity_days,
        )));

    let auth_config = AuthConfig::new(
        &settings.auth.url,
        &settings.auth.anon_key,
        &settings.auth.site_url,
    )?;
    let auth = GoTrueClient::new(auth_config.clone())?;
    let registry = ProviderAccountRegistry::new(PgProviderAccountStore::new(pool.clone()));

    let app = router(AppState::new(auth, auth_config, registry))
        .layer(session_layer)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&settings.server.addr)
        .await
        .with_context(|| format!("Failed to bind {}", settings.server.addr))?;
    tracing::info!("Server listening on {}", settings.server.addr);

    axum::serve(listener, app).await?;
    Ok(())
}
