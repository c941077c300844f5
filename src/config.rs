use crate::common::validation::ValidationMode;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub db_url: Option<String>,
    pub app_name: String,
    pub deployment: String,
    pub bind_address: String,
    pub validation_mode: ValidationMode,
}

impl Config {
    /// Loads configuration from the environment, reading `.env` first when present
    ///
    /// # Errors
    /// Returns a description of the first missing or malformed variable.
    pub fn from_env() -> Result<Self, String> {
        dotenv().ok(); // Load from .env file if available

        let db_url = match env::var("DB_URL") {
            Ok(url) => url,
            Err(_) => format!(
                "{}://{}:{}@{}:{}/{}",
                env::var("DB_PREFIX").unwrap_or_else(|_| "postgresql".to_string()),
                required("DB_USER")?,
                required("DB_PASSWORD")?,
                required("DB_HOST")?,
                env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string()),
                required("DB_NAME")?,
            ),
        };

        let validation_mode = match env::var("VALIDATION_MODE") {
            Ok(raw) => raw.parse()?,
            Err(_) => ValidationMode::default(),
        };

        Ok(Config {
            db_url: Some(db_url),
            app_name: env::var("APP_NAME").unwrap_or_else(|_| "plant-sampling-api".to_string()),
            deployment: required("DEPLOYMENT")
                .map_err(|e| format!("{e}, this can be local, dev, stage, or prod"))?,
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            validation_mode,
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            app_name: "plant-sampling-api-test".to_string(),
            deployment: "test".to_string(),
            bind_address: "127.0.0.1:0".to_string(),
            validation_mode: ValidationMode::FailFast,
            db_url: None,
        }
    }
}

fn required(name: &str) -> Result<String, String> {
    env::var(name).map_err(|_| format!("{name} must be set"))
}
