use anyhow::Context;
use once_cell::sync::OnceCell;

static CONFIG: OnceCell<Config> = OnceCell::new();

/// Process-wide settings read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    /// Cookie key material. `None` means a random key per process.
    pub secret_key: Option<Vec<u8>>,
    pub db_max_connections: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1:8080".to_owned());

        let secret_key = match std::env::var("SECRET_KEY") {
            Ok(key) if key.len() < 64 => {
                anyhow::bail!("SECRET_KEY must be at least 64 bytes long")
            }
            Ok(key) => Some(key.into_bytes()),
            Err(_) => None,
        };

        let db_max_connections = match std::env::var("DB_MAX_CONNECTIONS") {
            Ok(max) => max
                .parse::<u32>()
                .context("DB_MAX_CONNECTIONS cannot be parsed as an integer")?,
            Err(_) => 100,
        };
        if db_max_connections == 0 {
            anyhow::bail!("DB_MAX_CONNECTIONS must be positive");
        }

        Ok(Self {
            database_url,
            bind_address,
            secret_key,
            db_max_connections,
        })
    }
}

/// Panics if the environment is incomplete.
pub fn init() -> &'static Config {
    let config = Config::from_env().expect("Configuration failed to load.");
    CONFIG.get_or_init(|| config)
}
