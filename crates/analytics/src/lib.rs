//! # Revenue Model Analytics
//!
//! The calculation core of the workspace: P&L statements, time and category
//! aggregations, and multi-year revenue scenarios.
//!
//! ## Architectural Principles
//!
//! - **Pure logic:** This crate has no knowledge of external systems. It reads
//!   `core-types` tables and `configuration` records and nothing else.
//! - **Stateless calculation:** Every operation is a pure function of its
//!   inputs. Reports are value objects recomputed on every call.
//!
//! ## Public API
//!
//! - `PlCalculator`: P&L statement, monthly P&L, fee sensitivity.
//! - `aggregation`: monthly, daily and categorical breakdowns.
//! - `scenario`: `build_scenario`, `build_model`, `summarize`.
//! - `BaselineMetrics`: live figures that seed the scenario model.
//! - `AnalyticsError`: the error type returned from this crate.

// Declare the modules that constitute this crate.
pub mod aggregation;
pub mod baseline;
mod checked;
pub mod columns;
pub mod error;
pub mod pl;
pub mod report;
pub mod scenario;

// Re-export the key components to create a clean, public-facing API.
pub use baseline::BaselineMetrics;
pub use error::AnalyticsError;
pub use pl::{PlCalculator, DEFAULT_FEE_RATES};
pub use report::{
    CategoryRevenue, CategoryShare, DailyTvl, FeeScenario, Month, MonthlyPl, MonthlyPlReport,
    MonthlyRewards, PLMetrics, PeriodTotals, TvlSummary,
};
pub use scenario::{Scenario, ScenarioRecord, ScenarioSummary};
