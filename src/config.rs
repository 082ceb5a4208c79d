use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub llm: LlmConfig,
    pub network: NetworkConfig,
    pub scenario: ScenarioConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub enable_cors: bool,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub http_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Built-in case loaded at startup.
    pub case: String,
    /// Number of spatial regions (K).
    pub regions: usize,
    /// Clustering seed, fixed for reproducible partitions.
    pub seed: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    pub max_attempts: u32,
    /// Commit a successful candidate back into the session model. Off by
    /// default: scenario runs are dry runs unless explicitly requested.
    pub auto_commit: bool,
    /// Generation shortfall tolerated by the balance validator, in MW.
    pub balance_margin_mw: f64,
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("OGO__").split("__"));
        Ok(figment.extract()?)
    }
}
