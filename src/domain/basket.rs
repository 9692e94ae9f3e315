//! Basket runs: one simulation per instrument on a worker pool, then
//! single-threaded aggregation, window slicing and metrics.

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::engine::{EngineConfig, InstrumentRun, run_instrument};
use super::error::BackfolioError;
use super::metrics::PerformanceSnapshot;
use super::ohlcv::{BarSeries, OhlcvBar};
use super::portfolio::{CapitalAllocator, PortfolioResult, aggregate};
use super::regime::RegimeCache;
use super::strategy::StrategySpec;
use super::window::{WindowView, slice_all};

#[derive(Debug, Clone, PartialEq)]
pub struct BasketConfig {
    /// Total capital split across the basket by the allocator.
    pub total_capital: f64,
    /// Per-instrument engine settings; `initial_capital` is replaced by the
    /// instrument's allocation.
    pub engine: EngineConfig,
    /// Worker threads; 0 lets rayon decide.
    pub threads: usize,
    pub worker_timeout: Option<Duration>,
    pub risk_free_rate: f64,
}

impl Default for BasketConfig {
    fn default() -> Self {
        Self {
            total_capital: 100_000.0,
            engine: EngineConfig::default(),
            threads: 0,
            worker_timeout: None,
            risk_free_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentFailure {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub completed: Vec<String>,
    pub failed: Vec<InstrumentFailure>,
    pub skipped_entries: usize,
}

impl RunSummary {
    pub fn record_failure(&mut self, symbol: impl Into<String>, reason: impl Into<String>) {
        self.failed.push(InstrumentFailure {
            symbol: symbol.into(),
            reason: reason.into(),
        });
    }

    pub fn is_success(&self) -> bool {
        !self.completed.is_empty()
    }

    /// Append `other`'s outcomes after this summary's.
    pub fn merge(&mut self, other: RunSummary) {
        self.completed.extend(other.completed);
        self.failed.extend(other.failed);
        self.skipped_entries += other.skipped_entries;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowReport {
    pub view: WindowView,
    pub snapshot: PerformanceSnapshot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasketReport {
    pub strategy: String,
    pub summary: RunSummary,
    pub portfolio: PortfolioResult,
    pub windows: Vec<WindowReport>,
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

fn run_one(
    series: &BarSeries,
    spec: &StrategySpec,
    regime: Option<&RegimeCache>,
    config: &EngineConfig,
) -> Result<InstrumentRun, BackfolioError> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut strategy = spec.build();
        run_instrument(series, strategy.as_mut(), regime, config)
    }));
    match outcome {
        Ok(result) => result,
        Err(payload) => Err(BackfolioError::Worker {
            symbol: series.symbol().to_string(),
            reason: panic_reason(payload.as_ref()),
        }),
    }
}

/// Simulate every instrument in parallel. Failures are isolated per
/// instrument and reported in the summary; the returned runs keep the input
/// order.
pub fn run_basket(
    instruments: &[BarSeries],
    spec: &StrategySpec,
    allocator: &dyn CapitalAllocator,
    regime: Option<&RegimeCache>,
    config: &BasketConfig,
) -> Result<(Vec<InstrumentRun>, RunSummary), BackfolioError> {
    let symbols: Vec<String> = instruments.iter().map(|s| s.symbol().to_string()).collect();
    let allocations = allocator.allocate(config.total_capital, &symbols)?;

    let mut builder = rayon::ThreadPoolBuilder::new();
    if config.threads > 0 {
        builder = builder.num_threads(config.threads);
    }
    let pool = builder.build()?;

    info!(
        strategy = spec.name(),
        instruments = instruments.len(),
        threads = pool.current_num_threads(),
        "dispatching basket"
    );

    let results: Vec<Result<InstrumentRun, BackfolioError>> = pool.install(|| {
        instruments
            .par_iter()
            .zip(allocations.par_iter())
            .map(|(series, &capital)| {
                let engine = EngineConfig {
                    initial_capital: capital,
                    time_budget: config.worker_timeout,
                    ..config.engine.clone()
                };
                run_one(series, spec, regime, &engine)
            })
            .collect()
    });

    let mut summary = RunSummary::default();
    let mut runs = Vec::with_capacity(results.len());
    for (symbol, result) in symbols.into_iter().zip(results) {
        match result {
            Ok(run) => {
                debug!(
                    symbol = %symbol,
                    trades = run.trades.len(),
                    final_equity = ?run.final_equity(),
                    "instrument completed"
                );
                summary.skipped_entries += run.skipped_entries;
                summary.completed.push(symbol);
                runs.push(run);
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "instrument failed");
                summary.record_failure(symbol, e.to_string());
            }
        }
    }

    info!(
        completed = summary.completed.len(),
        failed = summary.failed.len(),
        "basket finished"
    );
    Ok((runs, summary))
}

/// Aggregate completed runs and compute every window's metrics.
pub fn build_report(
    strategy: &str,
    runs: &[InstrumentRun],
    summary: RunSummary,
    benchmark: Option<&[OhlcvBar]>,
    risk_free_rate: f64,
) -> Result<BasketReport, BackfolioError> {
    if runs.is_empty() {
        return Err(BackfolioError::NoCompletedInstruments {
            failed: summary.failed.len(),
        });
    }

    let portfolio = aggregate(runs);
    let windows = slice_all(&portfolio.trades, &portfolio.equity)
        .into_iter()
        .filter_map(|view| {
            let snapshot = PerformanceSnapshot::compute(&view, benchmark, risk_free_rate)?;
            Some(WindowReport { view, snapshot })
        })
        .collect();

    Ok(BasketReport {
        strategy: strategy.to_string(),
        summary,
        portfolio,
        windows,
    })
}
