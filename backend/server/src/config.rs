use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

use crate::{abacus::DEFAULT_BASE, error::AppError};

const DEV_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://127.0.0.1:5173"];
const DEFAULT_FRONTEND_URL: &str = "https://easy-abacus-2.onrender.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub base: i64,
    pub production: bool,
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup, `load` uses the process environment.
    pub fn from_source<F>(source: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = try_load(&source, "RUST_PORT", "1111")?;
        let base = try_load(&source, "ABACUS_BASE", &DEFAULT_BASE.to_string())?;
        let app_env: String = try_load(&source, "APP_ENV", "development")?;

        let production = app_env == "production";

        let mut allowed_origins: Vec<String> =
            DEV_ORIGINS.iter().map(|origin| origin.to_string()).collect();
        if production {
            allowed_origins.push(try_load(&source, "FRONTEND_URL", DEFAULT_FRONTEND_URL)?);
        }

        Self {
            port,
            base,
            production,
            allowed_origins,
        }
        .validated()
    }

    /// Applies command line overrides on top of the environment.
    pub fn with_overrides(mut self, port: Option<u16>, base: Option<i64>) -> Result<Self, AppError> {
        if let Some(port) = port {
            info!("Port overridden: {port}");
            self.port = port;
        }

        if let Some(base) = base {
            info!("Base overridden: {base}");
            self.base = base;
        }

        self.validated()
    }

    pub fn address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    fn validated(self) -> Result<Self, AppError> {
        if self.base < 2 {
            warn!("Invalid base {}", self.base);
            return Err(AppError::Config(format!(
                "base must be at least 2, got {}",
                self.base
            )));
        }

        Ok(self)
    }
}

fn try_load<T, F>(source: &F, key: &str, default: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    source(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            AppError::Config(format!("Invalid {key} value: {e}"))
        })
}
