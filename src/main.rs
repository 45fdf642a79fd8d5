use jwt_session::auth::{BcryptHasher, SessionManager, TokenCodec};
use jwt_session::configuration::get_configuration;
use jwt_session::error::AppError;
use jwt_session::startup::run;
use jwt_session::telemetry::init_telemetry;
use jwt_session::users::{PgUserStore, UserStore};
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry("info");

    tracing::info!("Starting application");

    let configuration = get_configuration().map_err(|e| {
        let e = AppError::from(e);
        tracing::error!("Failed to read configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;
    tracing::info!("Configuration loaded successfully");

    // Signing keys are loaded once; a missing or unreadable key is fatal.
    let codec = TokenCodec::from_settings(&configuration.jwt).map_err(|e| {
        tracing::error!("Failed to load JWT key material: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "JWT key material error")
    })?;
    tracing::info!(algorithm = ?codec.algorithm(), "JWT key pair loaded");

    tracing::info!("Attempting to connect to database");
    let pool = PgPoolOptions::new()
        .max_connections(configuration.database.max_connections)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        tracing::error!("Failed to run migrations: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, "Migration error")
    })?;
    tracing::info!("Database ready");

    let store: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool));
    let sessions = SessionManager::new(
        store.clone(),
        Arc::new(BcryptHasher::new(configuration.password.hash_cost)),
        Arc::new(codec),
        &configuration.jwt,
    )
    .with_secure_cookies(configuration.application.cookie_secure);

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, store, sessions)?.await
}
