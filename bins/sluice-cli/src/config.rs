//! Layered ledger configuration for the CLI.
//!
//! Precedence, lowest first: built-in defaults, the TOML (or JSON) file,
//! then `SLUICE_*` environment variables. Nested keys use a double
//! underscore, e.g. `SLUICE_DEPOSIT_FEE__ACCOUNT_FEE_BPS=50`.
//!
//! Environment values stay strings until deserialization; amounts above
//! `i64::MAX` would otherwise be parsed into lossy floats.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use sluice_ledger::LedgerConfig;

const ENV_PREFIX: &str = "SLUICE";

/// `<config_dir>/sluice/sluice.toml`, or `./sluice.toml` when the platform
/// has no config directory.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sluice")
        .join("sluice.toml")
}

/// Load from `path` (required) or the default path (optional), with the
/// process environment on top.
pub fn load(path: Option<&Path>) -> Result<LedgerConfig> {
    match path {
        Some(path) => load_from(path, true, None),
        None => load_from(&default_path(), false, None),
    }
}

/// Load with an explicit environment map in place of the process
/// environment when `env` is given.
pub fn load_from(path: &Path, required: bool, env: Option<HashMap<String, String>>) -> Result<LedgerConfig> {
    let defaults = Config::try_from(&LedgerConfig::default()).context("failed to encode default config")?;
    let settings = Config::builder()
        .add_source(defaults)
        .add_source(File::from(path).required(required))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .source(env),
        )
        .build()
        .with_context(|| format!("failed to read config from {}", path.display()))?;
    let config: LedgerConfig = settings.try_deserialize().context("invalid ledger config")?;
    config.validate().context("ledger config rejected")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use sluice_core::constants::ONE_TOKEN;
    use sluice_core::types::AssetId;

    fn write_toml(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_optional_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_from(&dir.path().join("absent.toml"), false, Some(HashMap::new())).unwrap();
        assert_eq!(config, LedgerConfig::default());
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_from(&dir.path().join("absent.toml"), true, Some(HashMap::new())).is_err());
    }

    #[test]
    fn file_overrides_defaults() {
        let file = write_toml(
            r#"
            start_height = 100
            halving_interval = 1000
            base_reward_per_block = "1000000000000000000"

            [[pools]]
            stake_asset = "0x1111111111111111111111111111111111111111"
            allocation_weight = 2
            "#,
        );
        let config = load_from(file.path(), true, Some(HashMap::new())).unwrap();
        assert_eq!(config.start_height, 100);
        assert_eq!(config.halving_interval, 1_000);
        assert_eq!(config.base_reward_per_block, ONE_TOKEN);
        assert_eq!(config.pools.len(), 1);
        assert_eq!(config.pools[0].stake_asset, AssetId([0x11; 20]));
        assert_eq!(config.multipliers.len(), 104);
    }

    #[test]
    fn environment_overrides_file() {
        let file = write_toml("start_height = 100\n");
        let env = HashMap::from([
            ("SLUICE_START_HEIGHT".to_string(), "250".to_string()),
            ("SLUICE_DEPOSIT_FEE__ACCOUNT_FEE_BPS".to_string(), "10".to_string()),
            ("SLUICE_DEPOSIT_FEE__REDISTRIBUTION_FEE_BPS".to_string(), "5".to_string()),
        ]);
        let config = load_from(file.path(), true, Some(env)).unwrap();
        assert_eq!(config.start_height, 250);
        assert_eq!(config.deposit_fee.account_fee_bps, 10);
        assert_eq!(config.deposit_fee.redistribution_fee_bps, 5);
    }

    #[test]
    fn environment_amounts_keep_full_precision() {
        let dir = tempfile::tempdir().unwrap();
        let env = HashMap::from([
            ("SLUICE_CAP".to_string(), "500000000000000000000000001".to_string()),
            ("SLUICE_BASE_REWARD_PER_BLOCK".to_string(), "10000000000000000000".to_string()),
            ("SLUICE_MANUAL_MINT_LIMIT".to_string(), "2000000000000000000".to_string()),
        ]);
        let config = load_from(&dir.path().join("absent.toml"), false, Some(env)).unwrap();
        assert_eq!(config.cap, 500_000_000_000_000_000_000_000_001);
        assert_eq!(config.base_reward_per_block, 10 * ONE_TOKEN);
        assert_eq!(config.manual_mint_limit, 2 * ONE_TOKEN);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let file = write_toml("lock_from_height = 10\nlock_to_height = 5\n");
        let err = load_from(file.path(), true, Some(HashMap::new())).unwrap_err();
        assert!(format!("{err:#}").contains("lock window"), "{err:#}");
    }

    #[test]
    fn default_path_ends_in_sluice_toml() {
        assert!(default_path().ends_with("sluice/sluice.toml"));
    }
}
