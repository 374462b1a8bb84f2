//! Configuration: built-in defaults, then a YAML file, then `POINTSD_` environment variables.
//!
//! Nested keys are addressed in the environment with a double underscore, e.g.
//! `POINTSD_REWARDS__REFERRAL_BASE_POINTS=50` or `POINTSD_TASKS__TTL=30m`.

use crate::types::Points;
use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

#[derive(Parser, Debug)]
#[command(author, version, about = "Points ledger and referral settlement service")]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(short = 'f', long, env = "POINTSD_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Load and validate the configuration, then exit
    #[arg(long)]
    pub validate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    pub rewards: RewardsConfig,
    pub charges: ChargesConfig,
    pub tasks: TasksConfig,
    pub provider: ProviderConfig,
    pub cors: CorsConfig,
    pub enable_metrics: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardsConfig {
    /// Points credited to an inviter for each completed referral
    pub referral_base_points: Points,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargesConfig {
    /// How long a paid provider call may take before it is refunded
    #[serde(with = "humantime_serde")]
    pub provider_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TasksConfig {
    /// Lifetime of an async charge's state after its last update
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

/// An OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL; `chat/completions` is resolved against it. Required.
    pub url: Option<Url>,
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<CorsOrigin>,
    pub allow_credentials: bool,
    /// Preflight cache lifetime in seconds
    pub max_age: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CorsOrigin {
    Wildcard,
    Url(Url),
}

impl TryFrom<String> for CorsOrigin {
    type Error = url::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "*" {
            Ok(CorsOrigin::Wildcard)
        } else {
            Url::parse(&value).map(CorsOrigin::Url)
        }
    }
}

impl From<CorsOrigin> for String {
    fn from(origin: CorsOrigin) -> Self {
        match origin {
            CorsOrigin::Wildcard => "*".to_string(),
            // Origins never carry a path; drop the trailing slash Url adds
            CorsOrigin::Url(url) => url.as_str().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            database_url: "postgres://localhost:5432/pointsd".to_string(),
            max_connections: 10,
            rewards: RewardsConfig::default(),
            charges: ChargesConfig::default(),
            tasks: TasksConfig::default(),
            provider: ProviderConfig::default(),
            cors: CorsConfig::default(),
            enable_metrics: false,
        }
    }
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self { referral_base_points: 30 }
    }
}

impl Default for ChargesConfig {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(60),
        }
    }
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60 * 60),
            sweep_interval: Duration::from_secs(5 * 60),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            model: "gpt-4o-mini".to_string(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Wildcard],
            allow_credentials: false,
            max_age: Some(3600),
        }
    }
}

impl Config {
    pub fn load(args: &Args) -> anyhow::Result<Self> {
        let config: Config = Self::figment(args).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("POINTSD_").split("__"))
            // Conventional name honoured for compatibility with sqlx tooling
            .merge(Env::raw().only(&["DATABASE_URL"]).map(|_| "database_url".into()))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rewards.referral_base_points <= 0 {
            anyhow::bail!("rewards.referral_base_points must be positive");
        }
        if self.charges.provider_timeout.is_zero() {
            anyhow::bail!("charges.provider_timeout must be non-zero");
        }
        if self.tasks.ttl.is_zero() || self.tasks.sweep_interval.is_zero() {
            anyhow::bail!("tasks.ttl and tasks.sweep_interval must be non-zero");
        }
        if self.provider.url.is_none() {
            anyhow::bail!("provider.url must be set");
        }
        if self.max_connections == 0 {
            anyhow::bail!("max_connections must be at least 1");
        }
        if self.cors.allow_credentials && self.cors.allowed_origins.contains(&CorsOrigin::Wildcard) {
            anyhow::bail!("cors.allow_credentials cannot be combined with a wildcard origin");
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
