use config::{Config, ConfigError};
use secrecy::Secret;
use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub app: ApplicationSettings,
    pub backend: BackendSettings,
}

#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub origin: String,
    pub session_secret: Secret<String>,
}

impl ApplicationSettings {
    pub fn get_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| ConfigError::Message(format!("Failed to parse address {addr}: {e}")))
    }

    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: "0.0.0.0".into(),
            port: get_env("PORT")?
                .parse::<u16>()
                .map_err(|e| ConfigError::Message(format!("Invalid port number: {e}")))?,
            origin: get_env("WEBSITE_URL")?,
            session_secret: get_secret_env("SESSION_SECRET")?,
        })
    }
}

#[derive(Deserialize, Clone)]
pub struct BackendSettings {
    pub project_id: String,
    /// Buffered store changes before a live query has to re-read from scratch.
    pub change_feed_capacity: usize,
}

impl BackendSettings {
    const DEFAULT_CHANGE_FEED_CAPACITY: usize = 256;

    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            project_id: get_env("PROJECT_ID")?,
            change_feed_capacity: try_get_env("CHANGE_FEED_CAPACITY")
                .and_then(|v| v.parse().ok())
                .unwrap_or(Self::DEFAULT_CHANGE_FEED_CAPACITY),
        })
    }
}

enum Environment {
    Local,
    Production,
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{other} is not supported environment. Use either `local` or `production`"
            )),
        }
    }
}

pub fn get_config() -> Result<Settings, ConfigError> {
    let environment: Environment = match std::env::var("APP_ENVIRONMENT") {
        Ok(env) => env.try_into().map_err(ConfigError::Message)?,
        Err(_) => Environment::Local,
    };

    match environment {
        Environment::Local => {
            let base_path = std::env::current_dir().map_err(|e| {
                ConfigError::Message(format!("Failed to determine the current directory: {e}"))
            })?;
            let config_dir = base_path.join("configuration");

            let settings = Config::builder()
                .add_source(config::File::from(config_dir.join("settings.toml")))
                .add_source(
                    config::Environment::with_prefix("APP")
                        .prefix_separator("_")
                        .separator("__"),
                );
            settings.build()?.try_deserialize()
        }

        Environment::Production => Ok(Settings {
            app: ApplicationSettings::from_env()?,
            backend: BackendSettings::from_env()?,
        }),
    }
}

fn try_get_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn get_env(name: &str) -> Result<String, ConfigError> {
    try_get_env(name).ok_or_else(|| ConfigError::NotFound(name.to_string()))
}

fn get_secret_env(name: &str) -> Result<Secret<String>, ConfigError> {
    Ok(Secret::from(get_env(name)?))
}
