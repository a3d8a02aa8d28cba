use std::time::Duration;

use anyhow::{bail, Result};

/// Runtime configuration, resolved once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Application table holding account registrations and sync status.
    pub app_table: String,
    /// Inventory table holding discovered resource records.
    pub inventory_table: String,
    /// Bucket receiving the raw per-run snapshots.
    pub inventory_bucket: String,
    /// Restrict the run to a single account id.
    pub account_id: Option<String>,
    /// Flat pause between successive resource-type calls.
    pub call_delay: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let app_table = require("APP_TABLE_NAME")?;
        let inventory_table = require("INVENTORY_TABLE_NAME")?;
        let inventory_bucket = require("INVENTORY_BUCKET")?;
        let account_id = std::env::var("ACCOUNT_ID").ok().filter(|s| !s.is_empty());
        let delay_ms = env_or("CALL_DELAY_MS", "100")
            .parse::<u64>()
            .unwrap_or(100);

        Ok(Self {
            app_table,
            inventory_table,
            inventory_bucket,
            account_id,
            call_delay: Duration::from_millis(delay_ms),
        })
    }
}

fn require(key: &str) -> Result<String> {
    match std::env::var(key) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => bail!("{key} environment variable is required"),
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back() {
        assert_eq!(env_or("INVENTORY_TEST_UNSET_VAR", "fallback"), "fallback");
    }

    #[test]
    fn require_rejects_missing() {
        assert!(require("INVENTORY_TEST_UNSET_VAR").is_err());
    }
}
