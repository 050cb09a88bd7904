use analytics::aggregation::{aggregate_by_category, aggregate_by_month, aggregate_tvl_by_day, summarize_tvl};
use analytics::columns::{resolve_column, AMOUNT_COLUMNS, TIME_COLUMNS, TVL_COLUMNS};
use analytics::scenario::{build_model, summarize, Scenario};
use analytics::{BaselineMetrics, PlCalculator, DEFAULT_FEE_RATES};
use anyhow::Context;
use api_client::{
    fetch_latest, fetch_query, load_all_data, CsvExportClient, DuneClient, PollSettings, QueryApi,
};
use clap::{Parser, Subcommand};
use configuration::settings::Config;
use configuration::{load_config, DataSource};
use core_types::Table;
use indicatif::{ProgressBar, ProgressStyle};
use presentation::{reports, Grid, OutputFormat};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Environment variable holding the query API key.
const API_KEY_ENV: &str = "DUNE_API_KEY";

/// The main entry point for the revenue model CLI.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the key may come from the environment or config.
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    let app = App::new(&cli, config);

    match &cli.command {
        Commands::Pl(args) => app.handle_pl(args).await,
        Commands::Historic(args) => app.handle_historic(args).await,
        Commands::FeeScenarios(args) => app.handle_fee_scenarios(args).await,
        Commands::Scenarios(args) => app.handle_scenarios(args).await,
        Commands::Fetch(args) => app.handle_fetch(args).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Protocol revenue model: P&L, historic trends and multi-year scenarios.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Missing files fall back to defaults.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Render reports as HTML fragments instead of text tables.
    #[arg(long, global = true)]
    html: bool,

    /// Print reports as JSON.
    #[arg(long, global = true, conflicts_with = "html")]
    json: bool,

    /// Skip every network call and use the built-in baseline.
    #[arg(long, global = true)]
    offline: bool,

    /// Where datasets are loaded from.
    #[arg(long, global = true, value_enum, default_value_t = DataSource::Auto)]
    source: DataSource,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Protocol P&L statement from total rewards.
    Pl(PlArgs),
    /// Monthly rewards, top networks and vaults, TVL trend and monthly P&L.
    Historic(HistoricArgs),
    /// P&L outcome across a range of protocol fee rates.
    FeeScenarios(FeeArgs),
    /// Downside, base, upside and stress revenue projections.
    Scenarios(ScenarioArgs),
    /// Fetch a single saved query and print its rows.
    Fetch(FetchArgs),
}

#[derive(Parser)]
struct PlArgs {
    /// Override the protocol fee rate (e.g. 0.15).
    #[arg(long)]
    fee_rate: Option<Decimal>,

    /// Override the number of months of OpEx charged.
    #[arg(long)]
    months: Option<u32>,

    /// Also break revenue down by category using per-category fee rates.
    #[arg(long)]
    by_category: bool,
}

#[derive(Parser)]
struct HistoricArgs {
    /// Number of most recent days of TVL to show.
    #[arg(long, default_value_t = 20)]
    days: usize,

    /// Number of networks and vaults to list.
    #[arg(long, default_value_t = 10)]
    top: usize,
}

#[derive(Parser)]
struct FeeArgs {
    /// Comma-separated fee rates, e.g. 0.05,0.1.
    #[arg(long, value_delimiter = ',')]
    rates: Vec<Decimal>,
}

#[derive(Parser)]
struct ScenarioArgs {
    /// Show a single scenario (downside, base, upside or stress).
    #[arg(long)]
    only: Option<Scenario>,
}

#[derive(Parser)]
struct FetchArgs {
    /// The saved query to fetch.
    #[arg(long)]
    query_id: u64,

    /// Run the query now and wait for it, instead of reading cached results.
    #[arg(long)]
    execute: bool,

    /// Number of rows to print.
    #[arg(long, default_value_t = 20)]
    limit: usize,
}

// ==============================================================================
// Output
// ==============================================================================

#[derive(Clone, Copy)]
enum Output {
    Rendered(OutputFormat),
    Json,
}

impl Output {
    fn from_cli(cli: &Cli) -> Self {
        match (cli.json, cli.html) {
            (true, _) => Output::Json,
            (false, true) => Output::Rendered(OutputFormat::Html),
            (false, false) => Output::Rendered(OutputFormat::Text),
        }
    }

    /// Prints a report either as its grid or as JSON.
    fn emit<T: Serialize + ?Sized>(&self, report: &T, grid: Grid) -> anyhow::Result<()> {
        match self {
            Output::Rendered(format) => println!("{}\n", grid.render(*format)),
            Output::Json => println!("{}", serde_json::to_string_pretty(report)?),
        }
        Ok(())
    }
}

// ==============================================================================
// Command Logic
// ==============================================================================

struct App {
    config: Config,
    output: Output,
    source: DataSource,
    offline: bool,
    api_key: Option<String>,
}

impl App {
    fn new(cli: &Cli, config: Config) -> Self {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .or_else(|| config.query_api.api_key.clone())
            .filter(|k| !k.trim().is_empty());

        Self {
            config,
            output: Output::from_cli(cli),
            source: cli.source,
            offline: cli.offline,
            api_key,
        }
    }

    fn query_client(&self) -> anyhow::Result<DuneClient> {
        DuneClient::new(&self.config.query_api, self.api_key.as_deref())
            .with_context(|| format!("The query API needs a key; set {API_KEY_ENV}"))
    }

    /// Loads every dataset from the configured source.
    async fn load_datasets(&self) -> anyhow::Result<BTreeMap<String, Table>> {
        if self.offline {
            anyhow::bail!("This command needs datasets and cannot run with --offline");
        }

        let client = match (self.source, &self.api_key) {
            (DataSource::Exports, _) | (DataSource::Auto, None) => None,
            (DataSource::Api, _) | (DataSource::Auto, Some(_)) => Some(self.query_client()?),
        };
        let exports = CsvExportClient::new(&self.config.exports);

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner.set_message(if client.is_some() { "Loading query results..." } else { "Loading CSV exports..." });

        let result = load_all_data(
            client.as_ref().map(|c| c as &dyn QueryApi),
            &self.config.query_api.queries,
            &exports,
            &self.config.exports.datasets,
        )
        .await;
        spinner.finish_and_clear();

        let tables = result.context("Failed to load datasets")?;
        tracing::info!(datasets = tables.len(), "Datasets loaded.");
        Ok(tables)
    }

    async fn handle_pl(&self, args: &PlArgs) -> anyhow::Result<()> {
        let data = self.load_datasets().await?;
        let rewards = dataset(&data, &["rewards_total"]);

        let mut pl_config = self.config.pl.clone();
        if let Some(rate) = args.fee_rate {
            pl_config = pl_config.with_fee_rate(rate);
        }
        if let Some(months) = args.months {
            pl_config.months = months;
        }
        let calculator = PlCalculator::new(pl_config)?;

        let metrics = calculator.calculate(rewards, None)?;
        self.output.emit(&metrics, reports::pl_statement(&metrics))?;

        if args.by_category {
            let by_network = dataset(&data, &["rewards_by_network", "network_rewards"]);
            let categories = calculator.calculate_by_category(by_network, None, None)?;
            self.output.emit(&categories, reports::category_revenue(&categories))?;
        }
        Ok(())
    }

    async fn handle_historic(&self, args: &HistoricArgs) -> anyhow::Result<()> {
        let data = self.load_datasets().await?;
        let rewards = dataset(&data, &["rewards_total"]);

        // Each section stands alone; a dataset without the needed columns is skipped.
        match monthly_rewards_section(rewards) {
            Ok(months) => self.output.emit(&months, reports::monthly_rewards(&months))?,
            Err(e) => tracing::warn!(error = %e, "Skipping monthly rewards."),
        }

        let by_network = dataset(&data, &["network_rewards", "rewards_by_network"]);
        match aggregate_by_category(by_network, None, None) {
            Ok(shares) => {
                let top: Vec<_> = shares.into_iter().take(args.top).collect();
                self.output.emit(&top, reports::top_categories("TOP NETWORKS", &top, args.top))?
            }
            Err(e) => tracing::warn!(error = %e, "Skipping network breakdown."),
        }

        let by_vault = dataset(&data, &["tvl_by_vault"]);
        match resolve_column(by_vault, None, TVL_COLUMNS, true)
            .and_then(|tvl| aggregate_by_category(by_vault, None, Some(&tvl)))
        {
            Ok(shares) => {
                let top: Vec<_> = shares.into_iter().take(args.top).collect();
                self.output.emit(&top, reports::top_categories("TOP VAULTS BY TVL", &top, args.top))?
            }
            Err(e) => tracing::warn!(error = %e, "Skipping vault breakdown."),
        }

        let tvl = dataset(&data, &["tvl_over_time"]);
        match tvl_section(tvl) {
            Ok((days, summary)) => {
                self.output.emit(&summary, reports::tvl_summary(&summary))?;
                let start = days.len().saturating_sub(args.days);
                self.output.emit(&days[start..], reports::recent_tvl(&days, args.days))?;
            }
            Err(e) => tracing::warn!(error = %e, "Skipping TVL trend."),
        }

        let calculator = PlCalculator::new(self.config.pl.clone())?;
        match calculator.calculate_monthly(rewards, None, None) {
            Ok(report) => self.output.emit(&report, reports::monthly_pl(&report))?,
            Err(e) => tracing::warn!(error = %e, "Skipping monthly P&L."),
        }
        Ok(())
    }

    async fn handle_fee_scenarios(&self, args: &FeeArgs) -> anyhow::Result<()> {
        let data = self.load_datasets().await?;
        let rewards = dataset(&data, &["rewards_total"]);
        let rates = if args.rates.is_empty() {
            DEFAULT_FEE_RATES.to_vec()
        } else {
            args.rates.clone()
        };

        let calculator = PlCalculator::new(self.config.pl.clone())?;
        let scenarios = calculator.fee_sensitivity(rewards, &rates)?;
        self.output.emit(&scenarios, reports::fee_scenarios(&scenarios))
    }

    async fn handle_scenarios(&self, args: &ScenarioArgs) -> anyhow::Result<()> {
        let baseline = if self.offline {
            BaselineMetrics::offline()
        } else {
            match self.load_datasets().await {
                Ok(data) => BaselineMetrics::from_tables(
                    dataset(&data, &["tvl_by_vault"]),
                    dataset(&data, &["network_rewards", "rewards_by_network"]),
                    dataset(&data, &["rewards_total"]),
                    dataset(&data, &["operator_count", "operator_registrations"]),
                )?,
                Err(e) => {
                    tracing::warn!(error = %e, "Live data unavailable, using the offline baseline.");
                    BaselineMetrics::offline()
                }
            }
        };
        self.output.emit(&baseline, reports::baseline(&baseline))?;

        let params = baseline.apply_to(&self.config.scenario);
        let mut model = build_model(&params)?;
        if let Some(only) = args.only {
            model.retain(|r| r.scenario == only);
        }
        let summary = summarize(&model, &params)?;
        self.output.emit(&model, reports::scenario_model(&model))?;
        self.output.emit(&summary, reports::scenario_summary(&summary))
    }

    async fn handle_fetch(&self, args: &FetchArgs) -> anyhow::Result<()> {
        if self.offline {
            anyhow::bail!("fetch needs the query API and cannot run with --offline");
        }
        let client = self.query_client()?;

        let table = if args.execute {
            let poll = PollSettings::from_config(&self.config.query_api);
            fetch_query(&client, args.query_id, &poll).await
        } else {
            fetch_latest(&client, args.query_id).await
        }
        .with_context(|| format!("Failed to fetch query {}", args.query_id))?;

        let title = format!("QUERY {} ({} rows)", args.query_id, table.len());
        self.output.emit(&table, reports::raw_table(&title, &table, args.limit))
    }
}

/// The first of `names` that was loaded, or an empty table.
fn dataset<'a>(data: &'a BTreeMap<String, Table>, names: &[&str]) -> &'a Table {
    static EMPTY: Table = Table::empty();
    names
        .iter()
        .find_map(|name| data.get(*name).filter(|t| !t.is_empty()))
        .unwrap_or(&EMPTY)
}

fn monthly_rewards_section(rewards: &Table) -> anyhow::Result<Vec<analytics::MonthlyRewards>> {
    let time_col = resolve_column(rewards, None, TIME_COLUMNS, false)?;
    let amount_col = resolve_column(rewards, None, AMOUNT_COLUMNS, true)?;
    Ok(aggregate_by_month(rewards, &time_col, &amount_col)?)
}

fn tvl_section(tvl: &Table) -> anyhow::Result<(Vec<analytics::DailyTvl>, analytics::TvlSummary)> {
    let time_col = resolve_column(tvl, None, TIME_COLUMNS, false)?;
    let tvl_col = resolve_column(tvl, None, TVL_COLUMNS, true)?;
    let days = aggregate_tvl_by_day(tvl, &time_col, &tvl_col)?;
    let summary = summarize_tvl(&days)?;
    Ok((days, summary))
}
