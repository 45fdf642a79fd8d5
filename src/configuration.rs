use config::ConfigError;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    #[serde(default)]
    pub jwt: JwtSettings,
    #[serde(default)]
    pub password: PasswordSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    /// Adds the `Secure` attribute to session cookies. Off for plain-HTTP local runs.
    #[serde(default)]
    pub cookie_secure: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// JWT signing settings. Keys are PEM files; only asymmetric algorithms are accepted.
#[derive(serde::Deserialize, Clone, Debug)]
pub struct JwtSettings {
    #[serde(default = "default_private_key_path")]
    pub private_key_path: String,
    #[serde(default = "default_public_key_path")]
    pub public_key_path: String,
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    #[serde(default = "default_access_minutes")]
    pub access_token_expire_minutes: i64,
    #[serde(default = "default_refresh_days")]
    pub refresh_token_expire_days: i64,
}

fn default_private_key_path() -> String {
    "certs/jwt-private.pem".to_string()
}

fn default_public_key_path() -> String {
    "certs/jwt-public.pem".to_string()
}

fn default_algorithm() -> String {
    "RS256".to_string()
}

fn default_access_minutes() -> i64 {
    1
}

fn default_refresh_days() -> i64 {
    30
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self {
            private_key_path: default_private_key_path(),
            public_key_path: default_public_key_path(),
            algorithm: default_algorithm(),
            access_token_expire_minutes: default_access_minutes(),
            refresh_token_expire_days: default_refresh_days(),
        }
    }
}

impl JwtSettings {
    pub fn access_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.access_token_expire_minutes)
    }

    pub fn refresh_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.refresh_token_expire_days)
    }
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct PasswordSettings {
    pub hash_cost: u32,
}

impl Default for PasswordSettings {
    fn default() -> Self {
        Self {
            hash_cost: bcrypt::DEFAULT_COST,
        }
    }
}

/// Reads `configuration.{yaml,toml,json}` if present, then `APP_*` environment
/// overrides (`APP_JWT__ALGORITHM=ES256`).
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}
