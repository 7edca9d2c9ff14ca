use log::warn;
use std::env;
use std::path::PathBuf;

const DEV_JWT_SECRET: &str = "salat-circle-development-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub uploads_dir: PathBuf,
    pub public_base_url: String,
    pub max_db_connections: u32,
}

impl Config {
    /// Reads the server configuration from the environment. Call after
    /// `dotenv` so `.env` values are visible.
    pub fn from_env() -> Self {
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!("JWT_SECRET not set, falling back to the development secret.");
            DEV_JWT_SECRET.to_string()
        });

        let max_db_connections = env::var("MAX_DB_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://prayers.db".to_string()),
            jwt_secret,
            uploads_dir: env::var("UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            max_db_connections,
        }
    }

    pub fn avatars_dir(&self) -> PathBuf {
        self.uploads_dir.join("avatars")
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests(uploads_dir: PathBuf) -> Self {
        Config {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "test-secret".to_string(),
            uploads_dir,
            public_base_url: "http://localhost:8000".to_string(),
            max_db_connections: 1,
        }
    }
}
