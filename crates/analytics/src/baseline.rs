use crate::aggregation::sum_column;
use crate::columns::find_column;
use crate::error::AnalyticsError;
use configuration::ScenarioParams;
use core_types::Table;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// Networks assumed by the scenario model even when fewer are live.
const MIN_NETWORKS: u32 = 3;

/// Current protocol figures used to seed the scenario model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineMetrics {
    /// In billions of USD.
    pub current_tvl: Decimal,
    pub active_networks: u32,
    /// In millions of USD.
    pub total_rewards: Decimal,
    pub operator_count: u64,
}

impl BaselineMetrics {
    /// Figures used when no live data could be loaded.
    pub fn offline() -> Self {
        Self {
            current_tvl: dec!(1.32),
            active_networks: 3,
            total_rewards: dec!(1.41),
            operator_count: 181,
        }
    }

    /// Derives the baseline from live tables. Each figure falls back to a
    /// fixed placeholder when its table lacks the expected column or rows.
    pub fn from_tables(
        tvl: &Table,
        networks: &Table,
        rewards: &Table,
        operators: &Table,
    ) -> Result<Self, AnalyticsError> {
        let current_tvl = if tvl.has_column("tvl") {
            sum_column(tvl, "tvl")? / dec!(1000000000)
        } else {
            Decimal::ONE
        };

        let active_networks = if networks.is_empty() {
            MIN_NETWORKS
        } else {
            u32::try_from(networks.len()).unwrap_or(u32::MAX)
        };

        let total_rewards = match find_column(rewards, &["rewards_usd", "total_distributed_usd"]) {
            Some(col) => sum_column(rewards, &col)? / dec!(1000000),
            None => Decimal::ONE,
        };

        let operator_count = match operators.column("registered_operators") {
            Some(cells) => {
                let mut max = Decimal::ZERO;
                for cell in cells.filter(|v| !v.is_null()) {
                    max = max.max(cell.to_decimal()?);
                }
                max.trunc().to_u64().unwrap_or(0)
            }
            None => operators.len() as u64,
        };

        let metrics = Self {
            current_tvl,
            active_networks,
            total_rewards,
            operator_count,
        };
        tracing::info!(
            tvl_b = %metrics.current_tvl,
            networks = metrics.active_networks,
            rewards_m = %metrics.total_rewards,
            operators = metrics.operator_count,
            "Derived baseline metrics."
        );
        Ok(metrics)
    }

    /// Seeds the scenario assumptions with this baseline.
    pub fn apply_to(&self, params: &ScenarioParams) -> ScenarioParams {
        ScenarioParams {
            tvl_base: self.current_tvl,
            networks_year1: self.active_networks.max(MIN_NETWORKS),
            ..params.clone()
        }
    }
}
