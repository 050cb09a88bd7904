use crate::error::ConfigError;
use crate::settings::Config;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    AnnualOpex, DataSource, ExportConfig, OpexBreakdown, PLConfig, QueryApiConfig, ScenarioParams,
};

/// Prefix for environment overrides, e.g. `REVENUE_MODEL__PL__MONTHS=12`.
const ENV_PREFIX: &str = "REVENUE_MODEL";

/// Loads the application configuration from a TOML file plus environment overrides.
///
/// The file is optional: every section falls back to the model's default
/// assumptions. The result is validated before it is returned.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    tracing::debug!(path = %path.display(), "Configuration loaded.");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("revenue-model-{}-{name}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config(Path::new("/nonexistent/revenue-model.toml")).unwrap();
        assert_eq!(config.pl, PLConfig::default());
        assert_eq!(config.query_api.poll_interval_secs, 2);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let path = write_temp(
            "partial",
            "[pl]\ndefault_fee_rate = 0.15\nmonths = 12\n\n[scenario]\ntvl_base = 2.5\n",
        );
        let config = load_config(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.pl.default_fee_rate, dec!(0.15));
        assert_eq!(config.pl.months, 12);
        assert_eq!(config.pl.monthly_opex, dec!(474000));
        assert_eq!(config.scenario.tvl_base, dec!(2.5));
        assert_eq!(config.scenario.networks_year1, 3);
    }

    #[test]
    fn invalid_breakdown_fails_to_load() {
        let path = write_temp("invalid", "[pl.opex_breakdown]\npersonnel = 0.9\n");
        let result = load_config(&path);
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
