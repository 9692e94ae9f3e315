//! CSV report adapter.
//!
//! Writes one directory per run, named `<strategy>_<YYYYmmdd_HHMMSS>`, holding
//! for every window:
//!
//! - `trades_<W>.csv` (closed trades),
//! - `open_positions_<W>.csv` (positions still open at the last bar),
//! - `key_metrics_<W>.csv` (one row),
//! - `equity_daily_<W>.csv` and `equity_monthly_<W>.csv`,
//!
//! plus `summary.csv` listing each instrument's outcome.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::info;

use crate::domain::basket::{BasketReport, WindowReport};
use crate::domain::error::BackfolioError;
use crate::domain::portfolio::EquityPoint;
use crate::domain::position::{Direction, ExitReason, Trade};
use crate::ports::report_port::ReportPort;

#[derive(Debug, Clone, Default)]
pub struct CsvReportAdapter {
    /// Fixed directory timestamp; the local clock when absent.
    timestamp: Option<NaiveDateTime>,
}

#[derive(Serialize)]
struct TradeRow<'a> {
    symbol: &'a str,
    direction: Direction,
    quantity: u64,
    entry_date: NaiveDate,
    entry_price: f64,
    exit_date: NaiveDate,
    exit_price: f64,
    stop: Option<f64>,
    target: Option<f64>,
    realized_pnl: f64,
    realized_pnl_pct: f64,
    commission: f64,
    net_pnl: f64,
    bars_held: usize,
    exit_reason: ExitReason,
    /// `key=value` pairs joined with `;`.
    entry_notes: String,
}

impl<'a> From<&'a Trade> for TradeRow<'a> {
    fn from(t: &'a Trade) -> Self {
        TradeRow {
            symbol: &t.symbol,
            direction: t.direction,
            quantity: t.quantity,
            entry_date: t.entry_date,
            entry_price: t.entry_price,
            exit_date: t.exit_date,
            exit_price: t.exit_price,
            stop: t.stop,
            target: t.target,
            realized_pnl: t.realized_pnl,
            realized_pnl_pct: t.realized_pnl_pct,
            commission: t.commission,
            net_pnl: t.net_pnl(),
            bars_held: t.bars_held,
            exit_reason: t.exit_reason,
            entry_notes: t
                .entry_metadata
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(";"),
        }
    }
}

#[derive(Serialize)]
struct EquityRow {
    date: NaiveDate,
    equity: f64,
    realized: f64,
    unrealized: f64,
    contributed: f64,
    /// Flow-adjusted index rebased to 100 at the window's baseline.
    index: f64,
}

#[derive(Serialize)]
struct SummaryRow<'a> {
    symbol: &'a str,
    status: &'a str,
    detail: &'a str,
}

fn report_err(path: &Path, e: impl std::fmt::Display) -> BackfolioError {
    BackfolioError::Report {
        reason: format!("{}: {}", path.display(), e),
    }
}

fn write_rows<I, R>(path: &Path, rows: I) -> Result<(), BackfolioError>
where
    I: IntoIterator<Item = R>,
    R: Serialize,
{
    let mut writer = csv::Writer::from_path(path).map_err(|e| report_err(path, e))?;
    for row in rows {
        writer.serialize(row).map_err(|e| report_err(path, e))?;
    }
    writer.flush().map_err(|e| report_err(path, e))?;
    Ok(())
}

fn trade_header(path: &Path) -> Result<(), BackfolioError> {
    // csv only writes a header with the first record
    let mut writer = csv::Writer::from_path(path).map_err(|e| report_err(path, e))?;
    writer
        .write_record([
            "symbol",
            "direction",
            "quantity",
            "entry_date",
            "entry_price",
            "exit_date",
            "exit_price",
            "stop",
            "target",
            "realized_pnl",
            "realized_pnl_pct",
            "commission",
            "net_pnl",
            "bars_held",
            "exit_reason",
            "entry_notes",
        ])
        .map_err(|e| report_err(path, e))?;
    writer.flush().map_err(|e| report_err(path, e))?;
    Ok(())
}

fn write_trades(path: &Path, trades: &[Trade]) -> Result<(), BackfolioError> {
    if trades.is_empty() {
        return trade_header(path);
    }
    write_rows(path, trades.iter().map(TradeRow::from))
}

fn equity_rows(points: &[EquityPoint], index: &[(NaiveDate, f64)]) -> Vec<EquityRow> {
    points
        .iter()
        .map(|p| {
            let idx = index
                .binary_search_by_key(&p.date, |(d, _)| *d)
                .map_or(f64::NAN, |i| index[i].1);
            EquityRow {
                date: p.date,
                equity: p.equity,
                realized: p.realized,
                unrealized: p.unrealized,
                contributed: p.contributed,
                index: idx,
            }
        })
        .collect()
}

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timestamp(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp: Some(timestamp),
        }
    }

    /// `<strategy>_<YYYYmmdd_HHMMSS>` under `output_dir`.
    pub fn run_dir(&self, output_dir: &Path, strategy: &str) -> PathBuf {
        let stamp = self.timestamp.unwrap_or_else(|| Local::now().naive_local());
        output_dir.join(format!("{}_{}", strategy, stamp.format("%Y%m%d_%H%M%S")))
    }

    fn write_window(&self, dir: &Path, window: &WindowReport) -> Result<(), BackfolioError> {
        let label = window.view.window.label();
        let view = &window.view;

        write_trades(&dir.join(format!("trades_{}.csv", label)), &view.trades)?;
        write_trades(
            &dir.join(format!("open_positions_{}.csv", label)),
            &view.open_positions,
        )?;
        write_rows(
            &dir.join(format!("key_metrics_{}.csv", label)),
            std::iter::once(&window.snapshot),
        )?;

        let index = view.rebased(100.0);
        write_rows(
            &dir.join(format!("equity_daily_{}.csv", label)),
            equity_rows(&view.equity, &index),
        )?;
        write_rows(
            &dir.join(format!("equity_monthly_{}.csv", label)),
            equity_rows(&view.monthly(), &index),
        )?;
        Ok(())
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, report: &BasketReport, output_dir: &Path) -> Result<PathBuf, BackfolioError> {
        let dir = self.run_dir(output_dir, &report.strategy);
        fs::create_dir_all(&dir).map_err(|e| report_err(&dir, e))?;

        for window in &report.windows {
            self.write_window(&dir, window)?;
        }

        let completed = report.summary.completed.iter().map(|s| SummaryRow {
            symbol: s,
            status: "completed",
            detail: "",
        });
        let failed = report.summary.failed.iter().map(|f| SummaryRow {
            symbol: &f.symbol,
            status: "failed",
            detail: &f.reason,
        });
        write_rows(&dir.join("summary.csv"), completed.chain(failed))?;

        info!(path = %dir.display(), windows = report.windows.len(), "report written");
        Ok(dir)
    }
}
