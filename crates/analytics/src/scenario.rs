//! Multi-year revenue projections under named parameter presets.

use crate::checked::{self, product};
use crate::error::AnalyticsError;
use configuration::ScenarioParams;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Years projected for each of the multiplier scenarios.
pub const PROJECTION_YEARS: std::ops::RangeInclusive<u32> = 1..=3;

/// Latest year [`build_scenario`] will project. Compounding is iterative, so
/// this also caps the work done for one record.
pub const MAX_PROJECTION_YEAR: u32 = 1000;

/// TVL is held in billions while revenue is in millions.
const MILLIONS_PER_BILLION: Decimal = dec!(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Scenario {
    Downside,
    Base,
    Upside,
    /// A one-year shock with its own haircuts instead of table multipliers.
    Stress,
}

impl Scenario {
    /// The scenarios driven by the multiplier table, in display order.
    pub const PROJECTED: [Scenario; 3] = [Scenario::Downside, Scenario::Base, Scenario::Upside];

    /// The multiplier tuple for this scenario. `None` for `Stress`.
    pub fn multipliers(&self, params: &ScenarioParams) -> Option<ScenarioMultipliers> {
        let m = match self {
            Scenario::Downside => ScenarioMultipliers {
                tvl: dec!(0.70),
                networks: dec!(0.70),
                fee: dec!(0.90),
                da_growth: dec!(0.20),
            },
            Scenario::Base => ScenarioMultipliers {
                tvl: Decimal::ONE,
                networks: Decimal::ONE,
                fee: Decimal::ONE,
                da_growth: params.da_growth_yoy,
            },
            Scenario::Upside => ScenarioMultipliers {
                tvl: dec!(1.30),
                networks: dec!(1.20),
                fee: dec!(1.15),
                da_growth: dec!(0.50),
            },
            Scenario::Stress => return None,
        };
        Some(m)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scenario::Downside => "Downside",
            Scenario::Base => "Base",
            Scenario::Upside => "Upside",
            Scenario::Stress => "Stress",
        };
        f.write_str(name)
    }
}

impl FromStr for Scenario {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "downside" => Ok(Scenario::Downside),
            "base" => Ok(Scenario::Base),
            "upside" => Ok(Scenario::Upside),
            "stress" => Ok(Scenario::Stress),
            other => Err(AnalyticsError::InvalidScenario(format!(
                "unknown scenario '{other}'"
            ))),
        }
    }
}

/// Multipliers applied to the baseline assumptions.
/// `da_growth` replaces the data-availability growth rate outright.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScenarioMultipliers {
    pub tvl: Decimal,
    pub networks: Decimal,
    pub fee: Decimal,
    pub da_growth: Decimal,
}

/// Fixed haircuts of the stress scenario, each applied to a year-one input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StressHaircuts {
    pub tvl: Decimal,
    pub networks: Decimal,
    pub relay_revenue: Decimal,
    pub insurance_premium: Decimal,
    pub credit_utilisation: Decimal,
    pub data_availability: Decimal,
    pub derivatives_volume: Decimal,
}

pub const STRESS_HAIRCUTS: StressHaircuts = StressHaircuts {
    tvl: dec!(0.56),
    networks: dec!(0.6),
    relay_revenue: dec!(0.35),
    insurance_premium: dec!(0.25),
    credit_utilisation: dec!(0.3),
    data_availability: dec!(0.5),
    derivatives_volume: dec!(0.3),
};

/// One projected year of one scenario. Revenue figures are in $M, TVL in $B.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioRecord {
    pub scenario: Scenario,
    pub year: u32,
    pub tvl: Decimal,
    pub networks: u32,
    pub relay: Decimal,
    pub insurance: Decimal,
    pub credit: Decimal,
    pub data_availability: Decimal,
    pub derivatives: Decimal,
    pub total_revenue: Decimal,
    pub opex: Decimal,
    pub ebitda: Decimal,
    pub ebitda_margin_pct: Decimal,
}

impl ScenarioRecord {
    /// The five revenue streams with their display names.
    pub fn streams(&self) -> [(&'static str, Decimal); 5] {
        [
            ("Relay", self.relay),
            ("Insurance", self.insurance),
            ("Credit", self.credit),
            ("DA", self.data_availability),
            ("Derivatives", self.derivatives),
        ]
    }
}

/// Headline figures of a scenario against the revenue target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioSummary {
    pub scenario: Scenario,
    pub year: u32,
    pub tvl: Decimal,
    pub networks: u32,
    pub revenue: Decimal,
    pub ebitda: Decimal,
    pub ebitda_margin_pct: Decimal,
    /// `(revenue / target - 1) * 100`; `None` when the target is zero.
    pub vs_target_pct: Option<Decimal>,
}

/// Projects one year of one scenario.
///
/// `Stress` only exists for year 1; any other year is rejected, as is year 0
/// and anything past [`MAX_PROJECTION_YEAR`]. Years whose compounded figures
/// leave the `Decimal` range fail with [`AnalyticsError::Overflow`].
pub fn build_scenario(
    params: &ScenarioParams,
    scenario: Scenario,
    year: u32,
) -> Result<ScenarioRecord, AnalyticsError> {
    if year == 0 {
        return Err(AnalyticsError::InvalidScenario(
            "projection years start at 1".to_string(),
        ));
    }
    if year > MAX_PROJECTION_YEAR {
        return Err(AnalyticsError::InvalidScenario(format!(
            "year {year} is past the last projectable year {MAX_PROJECTION_YEAR}"
        )));
    }
    match scenario.multipliers(params) {
        Some(multipliers) => project(params, scenario, multipliers, year),
        None if year == 1 => build_stress(params),
        None => Err(AnalyticsError::InvalidScenario(format!(
            "the stress scenario is a one-year shock, year {year} was requested"
        ))),
    }
}

/// Every projected scenario for years 1 to 3, followed by the stress year.
pub fn build_model(params: &ScenarioParams) -> Result<Vec<ScenarioRecord>, AnalyticsError> {
    let mut records = Scenario::PROJECTED
        .iter()
        .filter_map(|s| s.multipliers(params).map(|m| (*s, m)))
        .flat_map(|(s, m)| PROJECTION_YEARS.map(move |year| project(params, s, m, year)))
        .collect::<Result<Vec<_>, _>>()?;
    records.push(build_stress(params)?);
    tracing::debug!(records = records.len(), "Built scenario model.");
    Ok(records)
}

/// The final projected year of each multiplier scenario plus the stress year,
/// compared to the revenue target.
pub fn summarize(
    model: &[ScenarioRecord],
    params: &ScenarioParams,
) -> Result<Vec<ScenarioSummary>, AnalyticsError> {
    let final_year = *PROJECTION_YEARS.end();
    let target = params.revenue_target;
    model
        .iter()
        .filter(|r| r.scenario == Scenario::Stress || r.year == final_year)
        .map(|r| {
            let vs_target_pct = if target.is_zero() {
                None
            } else {
                let ratio = checked::div(r.total_revenue, target, "revenue vs target")?;
                let excess = checked::sub(ratio, Decimal::ONE, "revenue vs target")?;
                Some(checked::mul(excess, Decimal::ONE_HUNDRED, "revenue vs target")?)
            };
            Ok(ScenarioSummary {
                scenario: r.scenario,
                year: r.year,
                tvl: r.tvl,
                networks: r.networks,
                revenue: r.total_revenue,
                ebitda: r.ebitda,
                ebitda_margin_pct: r.ebitda_margin_pct,
                vs_target_pct,
            })
        })
        .collect()
}

/// `(1 + rate)^periods`, by repeated multiplication.
fn compound(rate: Decimal, periods: u32) -> Result<Decimal, AnalyticsError> {
    let factor = checked::add(Decimal::ONE, rate, "compound growth")?;
    product((0..periods).map(|_| factor), "compound growth")
}

/// Network count before scenario multipliers. Later years grow from the
/// year-one count and are truncated to whole networks.
fn baseline_networks(params: &ScenarioParams, year: u32) -> Result<Decimal, AnalyticsError> {
    let year1 = Decimal::from(params.networks_year1);
    let growth = match year {
        1 => return Ok(year1),
        2 => params.network_growth_year2,
        _ => params.network_growth_year3,
    };
    Ok(checked::mul(year1, growth, "network count")?.trunc())
}

fn project(
    params: &ScenarioParams,
    scenario: Scenario,
    m: ScenarioMultipliers,
    year: u32,
) -> Result<ScenarioRecord, AnalyticsError> {
    let elapsed = year - 1;

    let tvl_growth = compound(params.tvl_growth_yoy, elapsed)?;
    let tvl = product([params.tvl_base, tvl_growth, m.tvl], "TVL")?;
    let networks = checked::mul(baseline_networks(params, year)?, m.networks, "network count")?;
    let tvl_millions = checked::mul(tvl, MILLIONS_PER_BILLION, "TVL")?;

    let fee_uplift = checked::add(
        Decimal::ONE,
        checked::mul(params.relay_fee_rate, m.fee, "relay revenue")?,
        "relay revenue",
    )?;
    let relay = product(
        [networks, params.relay_revenue_per_network, fee_uplift],
        "relay revenue",
    )?;
    let insurance = product(
        [tvl_millions, params.insurance_premium_rate, params.insurance_protocol_take],
        "insurance revenue",
    )?;
    let credit = product(
        [
            tvl_millions,
            params.credit_vault_pct_tvl,
            params.credit_net_margin,
            params.credit_protocol_take,
        ],
        "credit revenue",
    )?;
    let data_availability = checked::mul(
        params.da_revenue_year1,
        compound(m.da_growth, elapsed)?,
        "data availability revenue",
    )?;
    let derivatives = product(
        [params.derivatives_volume, m.tvl, params.derivatives_fee],
        "derivatives revenue",
    )?;

    let opex_growth = checked::mul(Decimal::from(elapsed), params.opex_growth_per_year, "OpEx")?;
    let opex = checked::mul(
        params.opex.total(),
        checked::add(Decimal::ONE, opex_growth, "OpEx")?,
        "OpEx",
    )?;

    finish(
        scenario,
        year,
        tvl,
        networks,
        [relay, insurance, credit, data_availability, derivatives],
        opex,
    )
}

fn build_stress(params: &ScenarioParams) -> Result<ScenarioRecord, AnalyticsError> {
    let h = STRESS_HAIRCUTS;
    let networks = checked::mul(Decimal::from(params.networks_year1), h.networks, "network count")?;
    let tvl = checked::mul(params.tvl_base, h.tvl, "TVL")?;
    let tvl_millions = checked::mul(tvl, MILLIONS_PER_BILLION, "TVL")?;

    let relay = product(
        [networks, params.relay_revenue_per_network, h.relay_revenue],
        "relay revenue",
    )?;
    let insurance = product(
        [
            tvl_millions,
            params.insurance_premium_rate,
            h.insurance_premium,
            params.insurance_protocol_take,
        ],
        "insurance revenue",
    )?;
    let credit = product(
        [
            tvl_millions,
            params.credit_vault_pct_tvl,
            h.credit_utilisation,
            params.credit_net_margin,
            params.credit_protocol_take,
        ],
        "credit revenue",
    )?;
    let data_availability =
        checked::mul(params.da_revenue_year1, h.data_availability, "data availability revenue")?;
    let derivatives = product(
        [params.derivatives_volume, h.derivatives_volume, params.derivatives_fee],
        "derivatives revenue",
    )?;

    finish(
        Scenario::Stress,
        1,
        tvl,
        networks,
        [relay, insurance, credit, data_availability, derivatives],
        params.opex.total(),
    )
}

fn finish(
    scenario: Scenario,
    year: u32,
    tvl: Decimal,
    networks: Decimal,
    streams: [Decimal; 5],
    opex: Decimal,
) -> Result<ScenarioRecord, AnalyticsError> {
    let [relay, insurance, credit, data_availability, derivatives] = streams;
    let total_revenue = checked::sum(streams, "total revenue")?;
    let ebitda = checked::sub(total_revenue, opex, "EBITDA")?;

    Ok(ScenarioRecord {
        scenario,
        year,
        tvl,
        networks: networks.trunc().to_u32().unwrap_or(0),
        relay,
        insurance,
        credit,
        data_availability,
        derivatives,
        total_revenue,
        opex,
        ebitda,
        ebitda_margin_pct: checked::percent_of(ebitda, total_revenue, "EBITDA margin")?,
    })
}
