//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::BacktestConfig;
use crate::domain::basket::{BasketReport, RunSummary, build_report, run_basket};
use crate::domain::config_validation::{
    parse_date, validate_codes, validate_data_config, validate_regime_config,
    validate_strategy_config,
};
use crate::domain::error::BackfolioError;
use crate::domain::ohlcv::BarSeries;
use crate::domain::regime::{DEFAULT_LONG_PERIOD, DEFAULT_SHORT_PERIOD, RegimeCache};
use crate::domain::strategy::StrategySpec;
use crate::domain::universe::{load_universe, parse_codes};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

const DEFAULT_INTERVAL: &str = "1d";
const DEFAULT_OUTPUT_DIR: &str = "reports";

#[derive(Parser, Debug)]
#[command(name = "backfolio", about = "Basket backtester with multi-window performance reports")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over a basket of instruments
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Strategy name, overriding [strategy] name
        #[arg(short, long)]
        strategy: Option<String>,
        /// Comma-separated codes, overriding [backtest] codes
        #[arg(long)]
        codes: Option<String>,
        #[arg(long)]
        interval: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        start: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        end: Option<String>,
        /// Directory that receives the timestamped report directory
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// List symbols available at an interval
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        interval: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for symbol(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        codes: Option<String>,
        #[arg(long)]
        interval: Option<String>,
    },
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub strategy: Option<String>,
    pub codes: Option<String>,
    pub interval: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub output: Option<PathBuf>,
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            strategy,
            codes,
            interval,
            start,
            end,
            output,
            dry_run,
        } => {
            let overrides = Overrides {
                strategy,
                codes,
                interval,
                start,
                end,
                output,
            };
            if dry_run {
                run_dry_run(&config, &overrides)
            } else {
                run_backtest(&config, &overrides).map(|dir| {
                    println!("Report written to: {}", dir.display());
                })
            }
        }
        Command::ListSymbols { config, interval } => run_list_symbols(&config, interval.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Info {
            config,
            codes,
            interval,
        } => run_info(&config, codes.as_deref(), interval.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Everything a run needs, resolved from config and overrides.
#[derive(Debug)]
pub struct RunPlan {
    pub backtest: BacktestConfig,
    pub spec: StrategySpec,
    pub codes: Vec<String>,
    pub interval: String,
    pub data_path: PathBuf,
    pub benchmark: Option<String>,
    pub regime_periods: (usize, usize),
    pub output_dir: PathBuf,
}

pub fn build_plan(config: &dyn ConfigPort, overrides: &Overrides) -> Result<RunPlan, BackfolioError> {
    validate_data_config(config)?;
    validate_regime_config(config)?;

    let name = match &overrides.strategy {
        Some(name) => name.trim().to_string(),
        None => {
            validate_strategy_config(config)?;
            config.get_string("strategy", "name").unwrap_or_default().trim().to_string()
        }
    };
    let spec = StrategySpec::from_config(&name, config)?;

    let mut backtest = BacktestConfig::from_config(config)?;
    if let Some(start) = overrides.start.as_deref() {
        backtest.start_date = parse_date(Some(start), "start_date")?;
    }
    if let Some(end) = overrides.end.as_deref() {
        backtest.end_date = parse_date(Some(end), "end_date")?;
    }
    if backtest.start_date >= backtest.end_date {
        return Err(BackfolioError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "start_date".to_string(),
            reason: "start_date must be before end_date".to_string(),
        });
    }

    let codes = resolve_codes(overrides.codes.as_deref(), config)?;
    let interval = overrides
        .interval
        .clone()
        .or_else(|| config.get_string("data", "interval"))
        .unwrap_or_else(|| DEFAULT_INTERVAL.to_string());
    let data_path = PathBuf::from(config.get_string("data", "path").unwrap_or_default().trim());
    let benchmark = config
        .get_string("data", "benchmark")
        .map(|b| b.trim().to_uppercase())
        .filter(|b| !b.is_empty());
    let regime_periods = (
        config.get_int("regime", "short_period", DEFAULT_SHORT_PERIOD as i64) as usize,
        config.get_int("regime", "long_period", DEFAULT_LONG_PERIOD as i64) as usize,
    );
    let output_dir = overrides
        .output
        .clone()
        .or_else(|| config.get_string("report", "output_dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

    Ok(RunPlan {
        backtest,
        spec,
        codes,
        interval,
        data_path,
        benchmark,
        regime_periods,
        output_dir,
    })
}

pub fn resolve_codes(
    code_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, BackfolioError> {
    if let Some(codes) = code_override {
        return Ok(parse_codes(codes)?);
    }
    validate_codes(config)?;
    let codes = config.get_string("backtest", "codes").unwrap_or_default();
    Ok(parse_codes(&codes)?)
}

fn load_benchmark(data_port: &dyn DataPort, plan: &RunPlan) -> Option<BarSeries> {
    let symbol = plan.benchmark.as_deref()?;
    // history before the start date warms up the regime averages
    match data_port.fetch_bars(symbol, &plan.interval, NaiveDate::MIN, plan.backtest.end_date) {
        Ok(series) => Some(series),
        Err(e) => {
            warn!(benchmark = symbol, error = %e, "benchmark unavailable");
            None
        }
    }
}

/// Run the whole pipeline against `data_port` and return the report.
pub fn execute(data_port: &dyn DataPort, plan: &RunPlan) -> Result<BasketReport, BackfolioError> {
    let start = plan.backtest.start_date;
    let end = plan.backtest.end_date;

    let loaded = load_universe(data_port, plan.codes.clone(), &plan.interval, start, end)?;

    let benchmark = load_benchmark(data_port, plan);
    let regime = match &benchmark {
        Some(series) if plan.spec.risk().regime_filter => {
            let (short, long) = plan.regime_periods;
            Some(RegimeCache::build(series.bars(), short, long))
        }
        None if plan.spec.risk().regime_filter => {
            warn!("regime filter enabled without a benchmark; entries are not filtered");
            None
        }
        _ => None,
    };

    info!(
        strategy = plan.spec.name(),
        codes = loaded.universe.count(),
        %start,
        %end,
        "running backtest"
    );

    // codes rejected at load time count as failed instruments
    let mut summary = RunSummary::default();
    for skip in &loaded.skipped {
        summary.record_failure(skip.code.as_str(), skip.reason.to_string());
    }

    let basket = plan.backtest.basket_config();
    let allocator = plan.backtest.allocator();
    let (runs, worker_summary) = run_basket(
        &loaded.series,
        &plan.spec,
        allocator.as_ref(),
        regime.as_ref(),
        &basket,
    )?;
    summary.merge(worker_summary);

    let bench_bars = benchmark
        .as_ref()
        .map(|series| series.between(start, end))
        .filter(|series| !series.is_empty());
    build_report(
        plan.spec.name(),
        &runs,
        summary,
        bench_bars.as_ref().map(|s| s.bars()),
        basket.risk_free_rate,
    )
}

fn print_summary(report: &BasketReport) {
    println!("\n=== {} ===", report.strategy);
    println!(
        "Instruments: {} completed, {} failed",
        report.summary.completed.len(),
        report.summary.failed.len()
    );
    for failure in &report.summary.failed {
        println!("  {}: {}", failure.symbol, failure.reason);
    }
    if report.summary.skipped_entries > 0 {
        println!("Entries skipped (zero quantity): {}", report.summary.skipped_entries);
    }

    let pct = |v: Option<f64>| v.map_or("n/a".to_string(), |v| format!("{:.2}%", v * 100.0));
    let num = |v: Option<f64>| v.map_or("n/a".to_string(), |v| format!("{:.2}", v));

    println!(
        "\n{:<6} {:>10} {:>10} {:>10} {:>8} {:>10} {:>7} {:>8}",
        "Window", "Return", "CAGR", "IRR", "Sharpe", "MaxDD", "Trades", "WinRate"
    );
    for w in &report.windows {
        let s = &w.snapshot;
        let label = if s.partial {
            format!("{}*", s.window)
        } else {
            s.window.to_string()
        };
        println!(
            "{:<6} {:>10} {:>10} {:>10} {:>8} {:>10} {:>7} {:>8}",
            label,
            pct(s.total_return),
            pct(s.cagr),
            pct(s.irr),
            num(s.sharpe_ratio),
            format!("{:.2}%", s.max_drawdown * 100.0),
            s.total_trades,
            pct(s.win_rate),
        );
    }
    if report.windows.iter().any(|w| w.snapshot.partial) {
        println!("* window longer than the available history");
    }
}

pub fn run_backtest(config_path: &Path, overrides: &Overrides) -> Result<PathBuf, BackfolioError> {
    info!(path = %config_path.display(), "loading config");
    let adapter = FileConfigAdapter::from_file(config_path)?;
    let plan = build_plan(&adapter, overrides)?;

    let data_port = CsvAdapter::new(plan.data_path.clone());
    let report = execute(&data_port, &plan)?;
    print_summary(&report);

    CsvReportAdapter::new().write(&report, &plan.output_dir)
}

pub fn run_dry_run(config_path: &Path, overrides: &Overrides) -> Result<(), BackfolioError> {
    let adapter = FileConfigAdapter::from_file(config_path)?;
    let plan = build_plan(&adapter, overrides)?;

    println!("Config validated successfully");
    println!("\nStrategy: {}", plan.spec.name());
    println!("  {:?}", plan.spec);
    println!("\nUniverse:");
    println!("  interval: {}", plan.interval);
    println!("  codes: {}", plan.codes.join(", "));
    println!("  period: {} to {}", plan.backtest.start_date, plan.backtest.end_date);
    match &plan.backtest.weights {
        Some(_) => println!("  allocation: fixed weights"),
        None => println!("  allocation: equal weight"),
    }
    if let Some(benchmark) = &plan.benchmark {
        println!("  benchmark: {}", benchmark);
    }
    println!("\nReports go to: {}", plan.output_dir.display());
    println!("\nDry run complete: configuration is valid");
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), BackfolioError> {
    let adapter = FileConfigAdapter::from_file(config_path)?;
    let plan = build_plan(&adapter, &Overrides::default())?;
    println!(
        "Configuration is valid: {} on {} codes",
        plan.spec.name(),
        plan.codes.len()
    );
    Ok(())
}

fn data_port_from(config: &dyn ConfigPort) -> Result<CsvAdapter, BackfolioError> {
    validate_data_config(config)?;
    let path = config.get_string("data", "path").unwrap_or_default();
    Ok(CsvAdapter::new(PathBuf::from(path.trim())))
}

fn interval_from(config: &dyn ConfigPort, interval: Option<&str>) -> String {
    interval
        .map(str::to_string)
        .or_else(|| config.get_string("data", "interval"))
        .unwrap_or_else(|| DEFAULT_INTERVAL.to_string())
}

fn run_list_symbols(config_path: &Path, interval: Option<&str>) -> Result<(), BackfolioError> {
    let config = FileConfigAdapter::from_file(config_path)?;
    let data_port = data_port_from(&config)?;
    let interval = interval_from(&config, interval);

    let symbols = data_port.list_symbols(&interval)?;
    if symbols.is_empty() {
        eprintln!("No symbols found for interval {}", interval);
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    Ok(())
}

fn run_info(config_path: &Path, codes: Option<&str>, interval: Option<&str>) -> Result<(), BackfolioError> {
    let config = FileConfigAdapter::from_file(config_path)?;
    let data_port = data_port_from(&config)?;
    let interval = interval_from(&config, interval);
    let codes = resolve_codes(codes, &config)?;

    for code in &codes {
        match data_port.get_data_range(code, &interval) {
            Ok(Some((first, last, count))) => {
                println!("{} ({}): {} bars, {} to {}", code, interval, count, first, last);
            }
            Ok(None) => eprintln!("{} ({}): no data found", code, interval),
            Err(e) => eprintln!("error querying {} ({}): {}", code, interval, e),
        }
    }
    Ok(())
}
