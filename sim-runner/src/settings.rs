use config::{Config, Environment, File};
use price_gateway::coingecko;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SimSettings {
    pub db_path: String,
    /// Starting cash for new accounts, in cents.
    pub seed_cash: i64,
    pub refresh_secs: u64,
    pub admin_ids: Vec<i64>,
    pub feed_url: String,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            db_path: "sim.db".to_string(),
            seed_cash: 100_000,
            refresh_secs: 60,
            admin_ids: vec![],
            feed_url: coingecko::DEFAULT_URL.to_string(),
        }
    }
}

impl SimSettings {
    /// Defaults, then the optional TOML file, then `SIM_*` environment
    /// variables. Later layers win.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let settings = builder
            .add_source(Environment::with_prefix("SIM"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}
