use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Database {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: String,
    pub database: String,
    pub max_connections: u32,
}

impl Database {
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct Server {
    /// Socket address to listen on.
    pub addr: String,
}

/// Hosted auth service.
#[derive(Debug, Deserialize)]
pub struct Auth {
    pub url: String,
    pub anon_key: String,
    /// Public origin of this site, used to build callback URLs.
    pub site_url: String,
}

#[derive(Debug, Deserialize)]
pub struct Session {
    /// Send the cookie over HTTPS only.
    pub secure: bool,
    pub inactivity_days: i64,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub database: Database,
    pub server: Server,
    pub auth: Auth,
    pub session: Session,
}

impl Settings {
    /// Defaults, then `config.toml`, then `SECTION__KEY` environment variables.
    pub fn new() -> Result<Self, ConfigError> {
        Self::build(Environment::default().separator("__").try_parsing(true))
    }

    fn build(environment: Environment) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("database.user", "dashboard")?
            .set_default("database.password", "password")?
            .set_default("database.host", "localhost")?
            .set_default("database.port", "5432")?
            .set_default("database.database", "dashboard")?
            .set_default("database.max_connections", 5)?
            .set_default("server.addr", "127.0.0.1:8080")?
            .set_default("auth.url", "http://localhost:54321")?
            .set_default("auth.anon_key", "")?
            .set_default("auth.site_url", "http://localhost:8080")?
            .set_default("session.secure", false)?
            .set_default("session.inactivity_days", 7)?
            .add_source(
                File::with_name("config.toml")
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(environment)
            .build()?;

        config.try_deserialize()
    }
}
