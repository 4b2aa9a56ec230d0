use anyhow::anyhow;
use fruitreels_core::{SnapshotPolicy, StoreConfig};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub database_url: String,
    pub api_key: String,
    pub store: StoreConfig,
    /// `None` disables the depleted-session reset task.
    pub depleted_reset: Option<Duration>,
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| anyhow!("invalid {key}={raw:?}: {e}")),
        Err(_) => Ok(default),
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = StoreConfig::default();
        let store = StoreConfig {
            snapshot_policy: env_or("SNAPSHOT_POLICY", SnapshotPolicy::Validated)?,
            credit_rewards: env_or("CREDIT_REWARDS", defaults.credit_rewards)?,
            max_snapshot_credits: env_or("MAX_SNAPSHOT_CREDITS", defaults.max_snapshot_credits)?,
            ..defaults
        };
        let depleted_secs: u64 = env_or("DEPLETED_RESET_SECS", 15)?;
        Ok(Self {
            bind: env_or("BIND", "127.0.0.1:8080".to_string())?,
            database_url: env_or("DATABASE_URL", "sqlite://fruitreels.db".to_string())?,
            api_key: env_or("API_KEY", "dev-key".to_string())?,
            store,
            depleted_reset: (depleted_secs > 0).then(|| Duration::from_secs(depleted_secs)),
        })
    }
}
