//! Configuration loader for engine connections.
//!
//! Uses Figment to merge `pointmap.toml` + `pointmap.<env>.toml` + `POINTMAP_*`
//! env vars. Concrete engine clients extract a [`ConnectionConfig`] from the
//! merged view; any other key is reachable through [`Config::get`].

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;

/// Connection parameters for a remote vector engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub url: String,
    pub port: u16,
    pub api_key: Option<String>,
    pub https: bool,
    pub prefix: Option<String>,
    pub timeout_secs: f64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: "localhost".to_string(),
            port: 6333,
            api_key: None,
            https: false,
            prefix: None,
            timeout_secs: 5.0,
        }
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("pointmap.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("pointmap.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("pointmap.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("pointmap.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("POINTMAP_"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Connection section, falling back to defaults when absent.
    pub fn connection(&self) -> ConnectionConfig {
        self.get("connection").unwrap_or_default()
    }
}
