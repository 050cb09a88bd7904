use crate::error::ConfigError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::BTreeMap;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pl: PLConfig,
    pub scenario: ScenarioParams,
    pub query_api: QueryApiConfig,
    pub exports: ExportConfig,
}

impl Config {
    /// Checks every section that carries invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pl.validate()
    }
}

/// Where the CLI should read its tables from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Use the query API when a key is available, otherwise the CSV exports.
    #[default]
    Auto,
    Api,
    Exports,
}

/// Parameters for the protocol P&L statement.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PLConfig {
    /// Fee overrides by vault/network category.
    pub vault_fees: BTreeMap<String, Decimal>,
    /// Fee applied when no category breakdown is used.
    pub default_fee_rate: Decimal,
    pub monthly_opex: Decimal,
    pub opex_breakdown: OpexBreakdown,
    pub months: u32,
}

/// Share of operating expenses per category. The five shares must sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct OpexBreakdown {
    pub personnel: Decimal,
    pub audit: Decimal,
    pub marketing: Decimal,
    pub legal: Decimal,
    pub other: Decimal,
}

impl OpexBreakdown {
    pub fn total(&self) -> Decimal {
        self.personnel + self.audit + self.marketing + self.legal + self.other
    }
}

impl Default for OpexBreakdown {
    fn default() -> Self {
        Self {
            personnel: dec!(0.54),
            audit: dec!(0.23),
            marketing: dec!(0.11),
            legal: dec!(0.03),
            other: dec!(0.09),
        }
    }
}

impl Default for PLConfig {
    fn default() -> Self {
        let vault_fees = [
            ("Relay", dec!(0.05)),
            ("Staking", dec!(0.10)),
            ("Insurance", dec!(0.15)),
            ("LRT", dec!(0.08)),
            ("Liquid", dec!(0.10)),
            ("Default", dec!(0.10)),
        ]
        .into_iter()
        .map(|(name, rate)| (name.to_string(), rate))
        .collect();

        Self {
            vault_fees,
            default_fee_rate: dec!(0.10),
            monthly_opex: dec!(474000),
            opex_breakdown: OpexBreakdown::default(),
            months: 6,
        }
    }
}

impl PLConfig {
    /// Returns a copy of this configuration with a different default fee rate.
    pub fn with_fee_rate(&self, fee_rate: Decimal) -> Self {
        Self {
            default_fee_rate: fee_rate,
            ..self.clone()
        }
    }

    /// The fee rate for a category: its override if one exists, else the default.
    ///
    /// Category names match case-insensitively, since the config loader
    /// lowercases table keys read from files.
    pub fn fee_rate_for(&self, category: &str) -> Decimal {
        self.vault_fees
            .get(category)
            .or_else(|| {
                self.vault_fees
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(category))
                    .map(|(_, rate)| rate)
            })
            .copied()
            .unwrap_or(self.default_fee_rate)
    }

    /// Rejects fee rates outside [0, 1], negative OpEx and an OpEx breakdown
    /// that does not sum to exactly 1.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_rate("default_fee_rate", self.default_fee_rate)?;
        for (category, rate) in &self.vault_fees {
            check_rate(&format!("vault_fees.{category}"), *rate)?;
        }
        if self.monthly_opex.is_sign_negative() {
            return Err(ConfigError::ValidationError(format!(
                "monthly_opex must not be negative, got {}",
                self.monthly_opex
            )));
        }
        let total = self.opex_breakdown.total();
        if total != Decimal::ONE {
            return Err(ConfigError::ValidationError(format!(
                "opex_breakdown shares must sum to 1, got {total}"
            )));
        }
        Ok(())
    }
}

fn check_rate(name: &str, rate: Decimal) -> Result<(), ConfigError> {
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(ConfigError::ValidationError(format!(
            "{name} must be within [0, 1], got {rate}"
        )));
    }
    Ok(())
}

/// Assumptions behind the multi-year revenue projection.
///
/// Monetary figures are in millions of USD, TVL in billions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScenarioParams {
    pub tvl_base: Decimal,
    pub networks_year1: u32,
    pub tvl_growth_yoy: Decimal,
    /// Network count multiplier for year 2, applied to `networks_year1`.
    pub network_growth_year2: Decimal,
    /// Network count multiplier for year 3 onwards.
    pub network_growth_year3: Decimal,

    pub relay_fee_rate: Decimal,
    pub relay_revenue_per_network: Decimal,
    pub insurance_premium_rate: Decimal,
    pub insurance_protocol_take: Decimal,
    pub credit_vault_pct_tvl: Decimal,
    pub credit_net_margin: Decimal,
    pub credit_protocol_take: Decimal,
    pub da_revenue_year1: Decimal,
    pub da_growth_yoy: Decimal,
    pub derivatives_volume: Decimal,
    pub derivatives_fee: Decimal,

    pub opex: AnnualOpex,
    /// OpEx grows linearly by this fraction for every year after the first.
    pub opex_growth_per_year: Decimal,
    /// Annual revenue target used by the scenario summary.
    pub revenue_target: Decimal,
}

/// Annual operating expense lines, in millions of USD.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnnualOpex {
    pub contractors: Decimal,
    pub it_audit: Decimal,
    pub marketing: Decimal,
    pub legal: Decimal,
    pub other: Decimal,
}

impl AnnualOpex {
    pub fn total(&self) -> Decimal {
        self.contractors + self.it_audit + self.marketing + self.legal + self.other
    }
}

impl Default for AnnualOpex {
    fn default() -> Self {
        Self {
            contractors: dec!(3.06),
            it_audit: dec!(1.28),
            marketing: dec!(0.70),
            legal: dec!(0.18),
            other: dec!(0.41),
        }
    }
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            tvl_base: dec!(1.32),
            networks_year1: 3,
            tvl_growth_yoy: dec!(0.30),
            network_growth_year2: dec!(1.8),
            network_growth_year3: dec!(2.5),
            relay_fee_rate: dec!(0.10),
            relay_revenue_per_network: dec!(0.6),
            insurance_premium_rate: dec!(0.02),
            insurance_protocol_take: dec!(0.15),
            credit_vault_pct_tvl: dec!(0.20),
            credit_net_margin: dec!(0.005),
            credit_protocol_take: dec!(0.25),
            da_revenue_year1: dec!(2.0),
            da_growth_yoy: dec!(0.40),
            derivatives_volume: dec!(100),
            derivatives_fee: dec!(0.0005),
            opex: AnnualOpex::default(),
            opex_growth_per_year: dec!(0.20),
            revenue_target: dec!(20),
        }
    }
}

/// Connection settings for the analytics query API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct QueryApiConfig {
    pub base_url: String,
    /// Usually supplied through the environment rather than the config file.
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub poll_interval_secs: u64,
    /// Named datasets and the saved query that produces each of them.
    pub queries: BTreeMap<String, u64>,
}

impl Default for QueryApiConfig {
    fn default() -> Self {
        let queries = [
            ("rewards_total", 5734268),
            ("network_rewards", 5845829),
            ("tvl_by_vault", 4627837),
            ("tvl_over_time", 4921148),
            ("tvl_by_collateral", 4921564),
            ("operator_count", 4543572),
        ]
        .into_iter()
        .map(|(name, id)| (name.to_string(), id))
        .collect();

        Self {
            base_url: "https://api.dune.com/api/v1".to_string(),
            api_key: None,
            timeout_secs: 60,
            poll_interval_secs: 2,
            queries,
        }
    }
}

/// Location of the static CSV exports used when no API key is available.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub base_url: String,
    /// Dataset name to file name, fetched as `base_url + file`.
    pub datasets: BTreeMap<String, String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        let datasets = [
            "rewards_total",
            "rewards_by_network",
            "tvl_over_time",
            "tvl_by_vault",
            "tvl_by_collateral",
            "operator_count",
            "operator_registrations",
            "network_rewards",
        ]
        .into_iter()
        .map(|name| (name.to_string(), format!("{name}.csv")))
        .collect();

        Self {
            base_url: "https://raw.githubusercontent.com/Lianefiligrane56/symbiotic-revenue-model-content/main/data/"
                .to_string(),
            datasets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pl_config_is_valid() {
        let config = PLConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.opex_breakdown.total(), Decimal::ONE);
    }

    #[test]
    fn breakdown_that_misses_one_is_rejected() {
        let mut config = PLConfig::default();
        config.opex_breakdown.other = dec!(0.10);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sum to 1"));
    }

    #[test]
    fn fee_rates_outside_unit_interval_are_rejected() {
        assert!(PLConfig::default().with_fee_rate(dec!(1.5)).validate().is_err());
        assert!(PLConfig::default().with_fee_rate(dec!(-0.01)).validate().is_err());

        let mut config = PLConfig::default();
        config.vault_fees.insert("Bad".to_string(), dec!(2));
        assert!(config.validate().is_err());
    }

    #[test]
    fn category_fee_falls_back_to_default() {
        let config = PLConfig::default().with_fee_rate(dec!(0.12));
        assert_eq!(config.fee_rate_for("Insurance"), dec!(0.15));
        assert_eq!(config.fee_rate_for("Unknown"), dec!(0.12));
    }

    #[test]
    fn category_fee_ignores_case() {
        let mut config = PLConfig::default();
        config.vault_fees = [("relay".to_string(), dec!(0.07))].into();
        assert_eq!(config.fee_rate_for("Relay"), dec!(0.07));
        assert_eq!(config.fee_rate_for("RELAY"), dec!(0.07));
    }

    #[test]
    fn export_catalog_has_eight_datasets() {
        let exports = ExportConfig::default();
        assert_eq!(exports.datasets.len(), 8);
        assert_eq!(exports.datasets["tvl_over_time"], "tvl_over_time.csv");
    }
}
