use std::env;

use anyhow::Context;
use config::{Config, Environment, File};
use dotenvy::dotenv;
use serde::Deserialize;
use spins_common::database::DatabaseSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_port: String,
    #[serde(default)]
    pub store: StoreKind,
    pub database: Option<DatabaseSettings>,
    #[serde(default)]
    pub images: ImageSettings,
}

/// Which document store backs the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageSettings {
    pub imgbb_api_key: Option<String>,
    pub upload_url: Option<String>,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        let run_mode = load_env("RUN_MODE", "development");

        let s = Config::builder()
            .add_source(File::with_name("./config/default"))
            .add_source(File::with_name(&format!("./config/{run_mode}")).required(false))
            .add_source(Environment::with_prefix("app").separator("__"))
            .build()?;

        s.try_deserialize().with_context(|| "failed to read config")
    }
}

fn load_env(key: &str, default_value: &'static str) -> String {
    env::var(key).unwrap_or_else(|_| default_value.into())
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    #[test]
    fn reads_yaml_settings() {
        let yaml = r#"
server_port: "3000"
store: postgres
database:
  host: localhost
  db: spins
  schema: spins
  credentials:
    username: spins
    password: secret
  connection:
    min_connections: 1
    max_connections: 5
    acquire_timeout_seconds: 3
images:
  imgbb_api_key: abc
"#;
        let settings: Settings = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.store, StoreKind::Postgres);
        assert_eq!(settings.database.unwrap().port, 5432);
        assert_eq!(settings.images.imgbb_api_key.as_deref(), Some("abc"));
        assert_eq!(settings.images.upload_url, None);
    }

    #[test]
    fn memory_store_is_the_default() {
        let settings: Settings = Config::builder()
            .add_source(File::from_str("server_port: \"3000\"", FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.store, StoreKind::Memory);
        assert!(settings.database.is_none());
    }
}
