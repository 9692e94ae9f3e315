//! Performance metrics over one window of a portfolio.
//!
//! Ratios that cannot be computed (zero variance, no drawdown, no trades)
//! are `None` rather than zero or infinity. When capital is added inside the
//! window, return-based metrics run on a flow-adjusted growth index so that
//! deposits are not counted as gains.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::ohlcv::OhlcvBar;
use super::portfolio::EquityPoint;
use super::position::Trade;
use super::window::{Window, WindowView};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const DAYS_PER_YEAR: f64 = 365.25;

/// Profit factor reported when there are winning trades and no losers.
pub const PROFIT_FACTOR_CAP: f64 = 999.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSnapshot {
    pub window: Window,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub partial: bool,
    pub flow_adjusted: bool,
    pub starting_equity: f64,
    pub ending_equity: f64,
    pub contributed: f64,
    pub net_flows: f64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub total_return: Option<f64>,
    pub cagr: Option<f64>,
    pub irr: Option<f64>,
    pub volatility: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: Option<f64>,
    pub calmar_ratio: Option<f64>,
    pub max_drawdown: f64,
    pub max_drawdown_duration: usize,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub open_trade_count: usize,
    pub win_rate: Option<f64>,
    pub profit_factor: Option<f64>,
    pub avg_win: Option<f64>,
    pub avg_loss: Option<f64>,
    pub largest_win: Option<f64>,
    pub largest_loss: Option<f64>,
    pub avg_bars_held: Option<f64>,
    pub total_commission: f64,
}

impl PerformanceSnapshot {
    /// Metrics for one window. `None` when the window has no equity.
    pub fn compute(
        view: &WindowView,
        benchmark: Option<&[OhlcvBar]>,
        risk_free_rate: f64,
    ) -> Option<Self> {
        let first = view.equity.first()?;
        let last = view.equity.last()?;
        let flow_adjusted = view.has_flows();

        let index = if flow_adjusted {
            growth_index(&view.equity)
        } else {
            view.equity.iter().map(|p| p.equity).collect()
        };
        let returns = period_returns(&index);
        let growth = index
            .first()
            .zip(index.last())
            .filter(|(start, _)| **start > 0.0)
            .map(|(start, end)| end / start);

        let days = (last.date - first.date).num_days();
        let total_return = growth.map(|g| g - 1.0);
        let cagr = growth.and_then(|g| cagr(g, days));
        let (max_drawdown, max_drawdown_duration) = max_drawdown(&index);
        let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
        let calmar_ratio = cagr.and_then(|c| calmar(c, max_drawdown));

        let (alpha, beta) = match benchmark {
            Some(bars) => alpha_beta(&view.equity, &returns, bars),
            None => (None, None),
        };

        let stats = TradeStats::from_trades(&view.trades);
        let open_commission: f64 = view.open_positions.iter().map(|t| t.commission).sum();

        Some(PerformanceSnapshot {
            window: view.window,
            start_date: first.date,
            end_date: last.date,
            partial: view.partial,
            flow_adjusted,
            starting_equity: first.equity,
            ending_equity: last.equity,
            contributed: last.contributed,
            net_flows: last.contributed - first.contributed,
            realized_pnl: last.realized - first.realized,
            unrealized_pnl: last.unrealized,
            total_return,
            cagr,
            irr: xirr(&cash_flows(&view.equity)),
            volatility: volatility(&returns),
            sharpe_ratio: sharpe(&returns, daily_rf),
            sortino_ratio: sortino(&returns, daily_rf),
            calmar_ratio,
            max_drawdown,
            max_drawdown_duration,
            alpha,
            beta,
            total_trades: stats.total,
            trades_won: stats.won,
            trades_lost: stats.lost,
            trades_breakeven: stats.breakeven,
            open_trade_count: view.open_positions.len(),
            win_rate: stats.win_rate(),
            profit_factor: stats.profit_factor(),
            avg_win: stats.avg_win(),
            avg_loss: stats.avg_loss(),
            largest_win: stats.largest_win,
            largest_loss: stats.largest_loss,
            avg_bars_held: stats.avg_bars_held(),
            total_commission: stats.commission + open_commission,
        })
    }
}

/// Time-weighted growth index: 1.0 at the first point, each step the
/// return on the prior equity with that step's new capital removed.
pub fn growth_index(points: &[EquityPoint]) -> Vec<f64> {
    let mut index = Vec::with_capacity(points.len());
    let mut level = 1.0;
    for (i, point) in points.iter().enumerate() {
        if i > 0 {
            let prev = &points[i - 1];
            let flow = point.contributed - prev.contributed;
            if prev.equity > 0.0 {
                level *= (point.equity - flow) / prev.equity;
            }
        }
        index.push(level);
    }
    index
}

/// Simple returns between consecutive values. A non-positive prior value
/// yields a zero return.
pub fn period_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

/// `(growth)^(365.25 / days) - 1`.
pub fn cagr(growth: f64, days: i64) -> Option<f64> {
    if days <= 0 || growth <= 0.0 || !growth.is_finite() {
        return None;
    }
    Some(growth.powf(DAYS_PER_YEAR / days as f64) - 1.0)
}

/// Worst `value / running_max - 1` (never positive) and the longest run of
/// points spent below a prior peak.
pub fn max_drawdown(values: &[f64]) -> (f64, usize) {
    let Some(&first) = values.first() else {
        return (0.0, 0);
    };
    let mut peak = first;
    let mut worst = 0.0_f64;
    let mut run = 0usize;
    let mut longest = 0usize;

    for &value in values {
        if value >= peak {
            peak = value;
            run = 0;
        } else if peak > 0.0 {
            worst = worst.min(value / peak - 1.0);
            run += 1;
            longest = longest.max(run);
        }
    }
    (worst, longest)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_stddev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let var = values.iter().map(|r| (r - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

pub fn volatility(returns: &[f64]) -> Option<f64> {
    sample_stddev(returns).map(|sd| sd * TRADING_DAYS_PER_YEAR.sqrt())
}

pub fn sharpe(returns: &[f64], daily_rf: f64) -> Option<f64> {
    let sd = sample_stddev(returns)?;
    if sd <= 0.0 {
        return None;
    }
    Some((mean(returns) - daily_rf) / sd * TRADING_DAYS_PER_YEAR.sqrt())
}

pub fn sortino(returns: &[f64], daily_rf: f64) -> Option<f64> {
    if returns.is_empty() {
        return None;
    }
    let n = returns.len() as f64;
    let downside = returns
        .iter()
        .filter(|&&r| r < daily_rf)
        .map(|&r| (r - daily_rf).powi(2))
        .sum::<f64>()
        / n;
    let dd = downside.sqrt();
    if dd <= 0.0 {
        return None;
    }
    Some((mean(returns) - daily_rf) / dd * TRADING_DAYS_PER_YEAR.sqrt())
}

pub fn calmar(cagr: f64, max_drawdown: f64) -> Option<f64> {
    if max_drawdown >= 0.0 {
        return None;
    }
    Some(cagr / max_drawdown.abs())
}

/// Regression of portfolio returns on benchmark returns, using only steps
/// whose both endpoints exist in the benchmark. Alpha is annualised.
pub fn alpha_beta(
    equity: &[EquityPoint],
    returns: &[f64],
    benchmark: &[OhlcvBar],
) -> (Option<f64>, Option<f64>) {
    let closes: HashMap<NaiveDate, f64> = benchmark.iter().map(|b| (b.date, b.close)).collect();
    let pairs: Vec<(f64, f64)> = equity
        .windows(2)
        .zip(returns)
        .filter_map(|(w, &rp)| {
            let prev = closes.get(&w[0].date)?;
            let curr = closes.get(&w[1].date)?;
            (*prev > 0.0).then(|| (rp, curr / prev - 1.0))
        })
        .collect();
    if pairs.len() < 2 {
        return (None, None);
    }

    let n = pairs.len() as f64;
    let mean_p = pairs.iter().map(|(p, _)| p).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|(_, b)| b).sum::<f64>() / n;
    let cov = pairs
        .iter()
        .map(|(p, b)| (p - mean_p) * (b - mean_b))
        .sum::<f64>();
    let var_b = pairs.iter().map(|(_, b)| (b - mean_b).powi(2)).sum::<f64>();
    if var_b <= 0.0 {
        return (None, None);
    }
    let beta = cov / var_b;
    let alpha = (mean_p - beta * mean_b) * TRADING_DAYS_PER_YEAR;
    (Some(alpha), Some(beta))
}

/// Dated cash flows of a window from the investor's side: the baseline
/// equity and every later contribution go in, the final equity comes out.
pub fn cash_flows(points: &[EquityPoint]) -> Vec<(NaiveDate, f64)> {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Vec::new();
    };
    let mut flows = vec![(first.date, -first.equity)];
    for w in points.windows(2) {
        let added = w[1].contributed - w[0].contributed;
        if added.abs() > 1e-9 {
            flows.push((w[1].date, -added));
        }
    }
    flows.push((last.date, last.equity));
    flows
}

fn npv(flows: &[(NaiveDate, f64)], origin: NaiveDate, rate: f64) -> f64 {
    flows
        .iter()
        .map(|(date, amount)| {
            let t = (*date - origin).num_days() as f64 / DAYS_PER_YEAR;
            amount / (1.0 + rate).powf(t)
        })
        .sum()
}

fn npv_derivative(flows: &[(NaiveDate, f64)], origin: NaiveDate, rate: f64) -> f64 {
    flows
        .iter()
        .map(|(date, amount)| {
            let t = (*date - origin).num_days() as f64 / DAYS_PER_YEAR;
            -t * amount / (1.0 + rate).powf(t + 1.0)
        })
        .sum()
}

/// Annualised internal rate of return of dated flows (actual/365.25).
/// Newton's method first, bisection if it does not settle.
pub fn xirr(flows: &[(NaiveDate, f64)]) -> Option<f64> {
    let has_out = flows.iter().any(|(_, a)| *a < 0.0);
    let has_in = flows.iter().any(|(_, a)| *a > 0.0);
    if !has_out || !has_in {
        return None;
    }
    let origin = flows.iter().map(|(d, _)| *d).min()?;
    if flows.iter().all(|(d, _)| *d == origin) {
        return None;
    }

    let mut rate = 0.1;
    for _ in 0..100 {
        let value = npv(flows, origin, rate);
        let slope = npv_derivative(flows, origin, rate);
        if !value.is_finite() || !slope.is_finite() || slope == 0.0 {
            break;
        }
        let next = rate - value / slope;
        if !next.is_finite() || next <= -1.0 {
            break;
        }
        if (next - rate).abs() < 1e-10 {
            return Some(next);
        }
        rate = next;
    }

    let mut lo = -0.9999;
    let mut hi = 1.0;
    let f_lo = npv(flows, origin, lo);
    while npv(flows, origin, hi).signum() == f_lo.signum() {
        hi *= 2.0;
        if hi > 1e6 {
            return None;
        }
    }
    for _ in 0..200 {
        let mid = (lo + hi) / 2.0;
        let f_mid = npv(flows, origin, mid);
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1e-12 {
            break;
        }
    }
    Some((lo + hi) / 2.0)
}

#[derive(Debug, Default)]
struct TradeStats {
    total: usize,
    won: usize,
    lost: usize,
    breakeven: usize,
    gross_win: f64,
    gross_loss: f64,
    largest_win: Option<f64>,
    largest_loss: Option<f64>,
    bars_held: usize,
    commission: f64,
}

impl TradeStats {
    /// Statistics over clean trades, on P&L net of commission.
    fn from_trades(trades: &[Trade]) -> Self {
        let mut stats = TradeStats::default();
        for trade in trades.iter().filter(|t| t.is_clean()) {
            let pnl = trade.net_pnl();
            stats.total += 1;
            stats.bars_held += trade.bars_held;
            stats.commission += trade.commission;
            if pnl > 0.0 {
                stats.won += 1;
                stats.gross_win += pnl;
                stats.largest_win = Some(stats.largest_win.map_or(pnl, |w| w.max(pnl)));
            } else if pnl < 0.0 {
                stats.lost += 1;
                stats.gross_loss += pnl.abs();
                stats.largest_loss = Some(stats.largest_loss.map_or(pnl, |l| l.min(pnl)));
            } else {
                stats.breakeven += 1;
            }
        }
        stats
    }

    fn win_rate(&self) -> Option<f64> {
        (self.total > 0).then(|| self.won as f64 / self.total as f64)
    }

    fn profit_factor(&self) -> Option<f64> {
        match (self.won, self.lost) {
            (0, 0) => None,
            (_, 0) => Some(PROFIT_FACTOR_CAP),
            _ => Some((self.gross_win / self.gross_loss).min(PROFIT_FACTOR_CAP)),
        }
    }

    fn avg_win(&self) -> Option<f64> {
        (self.won > 0).then(|| self.gross_win / self.won as f64)
    }

    /// Negative: the mean losing P&L.
    fn avg_loss(&self) -> Option<f64> {
        (self.lost > 0).then(|| -self.gross_loss / self.lost as f64)
    }

    fn avg_bars_held(&self) -> Option<f64> {
        (self.total > 0).then(|| self.bars_held as f64 / self.total as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::{Direction, ExitReason};
    use crate::domain::window::slice;
    use approx::assert_relative_eq;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(offset)
    }

    fn curve(values: &[f64]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| EquityPoint {
                date: day(i as i64),
                equity: v,
                realized: v - values[0],
                unrealized: 0.0,
                contributed: values[0],
            })
            .collect()
    }

    fn trade_with_pnl(pnl: f64, reason: ExitReason) -> Trade {
        Trade {
            symbol: "BHP".to_string(),
            direction: Direction::Long,
            quantity: 1,
            entry_index: 0,
            entry_date: day(0),
            entry_price: 100.0,
            exit_index: 4,
            exit_date: day(4),
            exit_price: 100.0 + pnl,
            stop: None,
            target: None,
            realized_pnl: pnl,
            realized_pnl_pct: pnl,
            commission: 0.0,
            bars_held: 4,
            exit_reason: reason,
            entry_metadata: std::collections::BTreeMap::new(),
        }
    }

    fn snapshot(equity: Vec<EquityPoint>, trades: Vec<Trade>) -> PerformanceSnapshot {
        let view = slice(Window::Max, &trades, &equity).unwrap();
        PerformanceSnapshot::compute(&view, None, 0.0).unwrap()
    }

    #[test]
    fn cagr_one_year_doubling() {
        assert_relative_eq!(cagr(2.0, 365).unwrap(), 2.0_f64.powf(365.25 / 365.0) - 1.0);
        assert_eq!(cagr(1.5, 0), None);
        assert_eq!(cagr(0.0, 100), None);
    }

    #[test]
    fn drawdown_is_never_positive() {
        let (dd, duration) = max_drawdown(&[100.0, 120.0, 90.0, 95.0, 130.0, 117.0]);
        assert_relative_eq!(dd, 90.0 / 120.0 - 1.0);
        assert_eq!(duration, 2);
        assert_eq!(max_drawdown(&[1.0, 2.0, 3.0]), (0.0, 0));
        assert_eq!(max_drawdown(&[]), (0.0, 0));
    }

    #[test]
    fn sharpe_none_when_flat() {
        assert_eq!(sharpe(&[0.0, 0.0, 0.0], 0.0), None);
        assert_eq!(sharpe(&[0.01], 0.0), None);
    }

    #[test]
    fn sharpe_uses_sample_stddev() {
        let returns = [0.01, -0.01, 0.02, 0.0];
        let m = 0.005;
        let sd = ((0.005_f64.powi(2) + 0.015_f64.powi(2) + 0.015_f64.powi(2) + 0.005_f64.powi(2)) / 3.0).sqrt();
        assert_relative_eq!(sharpe(&returns, 0.0).unwrap(), m / sd * 252.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn sortino_none_without_downside() {
        assert_eq!(sortino(&[0.01, 0.02], 0.0), None);
        assert!(sortino(&[0.01, -0.02, 0.03], 0.0).is_some());
    }

    #[test]
    fn calmar_requires_drawdown() {
        assert_eq!(calmar(0.1, 0.0), None);
        assert_relative_eq!(calmar(0.1, -0.2).unwrap(), 0.5);
    }

    #[test]
    fn profit_factor_sentinel_without_losses() {
        let snap = snapshot(
            curve(&[100.0, 101.0, 102.0, 103.0, 104.0]),
            vec![trade_with_pnl(2.0, ExitReason::Target), trade_with_pnl(3.0, ExitReason::Signal)],
        );
        assert_eq!(snap.profit_factor, Some(PROFIT_FACTOR_CAP));
        assert_eq!(snap.win_rate, Some(1.0));
        assert_eq!(snap.avg_loss, None);
    }

    #[test]
    fn profit_factor_none_without_decisive_trades() {
        let snap = snapshot(curve(&[100.0, 100.0, 100.0, 100.0, 100.0]), vec![trade_with_pnl(0.0, ExitReason::Signal)]);
        assert_eq!(snap.profit_factor, None);
        assert_eq!(snap.trades_breakeven, 1);
        assert_eq!(snap.sharpe_ratio, None);
        assert_eq!(snap.calmar_ratio, None);
    }

    #[test]
    fn trade_statistics() {
        let trades = vec![
            trade_with_pnl(30.0, ExitReason::Target),
            trade_with_pnl(-10.0, ExitReason::Stop),
            trade_with_pnl(-20.0, ExitReason::Stop),
            trade_with_pnl(10.0, ExitReason::Signal),
        ];
        let snap = snapshot(curve(&[100.0, 110.0, 105.0, 108.0, 110.0]), trades);
        assert_eq!(snap.total_trades, 4);
        assert_eq!(snap.trades_won, 2);
        assert_eq!(snap.trades_lost, 2);
        assert_relative_eq!(snap.profit_factor.unwrap(), 40.0 / 30.0);
        assert_relative_eq!(snap.win_rate.unwrap(), 0.5);
        assert_eq!(snap.avg_win, Some(20.0));
        assert_eq!(snap.avg_loss, Some(-15.0));
        assert_eq!(snap.largest_win, Some(30.0));
        assert_eq!(snap.largest_loss, Some(-20.0));
        assert_eq!(snap.avg_bars_held, Some(4.0));
    }

    #[test]
    fn open_positions_excluded_from_trade_stats() {
        let trades = vec![
            trade_with_pnl(-5.0, ExitReason::Stop),
            trade_with_pnl(50.0, ExitReason::EndOfData),
        ];
        let snap = snapshot(curve(&[100.0, 99.0, 98.0, 120.0, 145.0]), trades);
        assert_eq!(snap.total_trades, 1);
        assert_eq!(snap.open_trade_count, 1);
        assert_eq!(snap.win_rate, Some(0.0));
    }

    #[test]
    fn snapshot_without_flows_uses_raw_equity() {
        let snap = snapshot(curve(&[100.0, 110.0, 99.0, 121.0]), Vec::new());
        assert!(!snap.flow_adjusted);
        assert_relative_eq!(snap.total_return.unwrap(), 0.21, epsilon = 1e-12);
        assert_relative_eq!(snap.max_drawdown, 99.0 / 110.0 - 1.0);
        assert_relative_eq!(snap.ending_equity, snap.contributed + snap.realized_pnl + snap.unrealized_pnl);
    }

    #[test]
    fn staggered_capital_flat_returns_zero() {
        // 1000 at the start, another 1000 halfway, no price movement
        let equity: Vec<EquityPoint> = (0..730)
            .map(|i| {
                let contributed = if i < 365 { 1_000.0 } else { 2_000.0 };
                EquityPoint {
                    date: day(i),
                    equity: contributed,
                    realized: 0.0,
                    unrealized: 0.0,
                    contributed,
                }
            })
            .collect();
        let snap = snapshot(equity, Vec::new());

        let naive = snap.ending_equity / snap.starting_equity - 1.0;
        assert_relative_eq!(naive, 1.0);
        assert!(snap.flow_adjusted);
        assert_relative_eq!(snap.total_return.unwrap(), 0.0, epsilon = 1e-12);
        assert!(snap.irr.unwrap().abs() < 1e-6);
        assert_eq!(snap.max_drawdown, 0.0);
        assert_relative_eq!(snap.net_flows, 1_000.0);
    }

    #[test]
    fn growth_index_removes_contributions() {
        let points = vec![
            EquityPoint { date: day(0), equity: 1_000.0, realized: 0.0, unrealized: 0.0, contributed: 1_000.0 },
            EquityPoint { date: day(1), equity: 1_100.0, realized: 0.0, unrealized: 100.0, contributed: 1_000.0 },
            EquityPoint { date: day(2), equity: 2_100.0, realized: 0.0, unrealized: 100.0, contributed: 2_000.0 },
            EquityPoint { date: day(3), equity: 2_310.0, realized: 0.0, unrealized: 310.0, contributed: 2_000.0 },
        ];
        let index = growth_index(&points);
        assert_relative_eq!(index[1], 1.1);
        assert_relative_eq!(index[2], 1.1);
        assert_relative_eq!(index[3], 1.21, epsilon = 1e-12);
    }

    #[test]
    fn xirr_simple_year() {
        let flows = vec![
            (NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(), -1_000.0),
            (NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 1_100.0),
        ];
        let expected = 1.1_f64.powf(365.25 / 365.0) - 1.0;
        assert_relative_eq!(xirr(&flows).unwrap(), expected, epsilon = 1e-8);
    }

    #[test]
    fn xirr_needs_both_signs() {
        assert_eq!(xirr(&[(day(0), -1.0), (day(10), -1.0)]), None);
        assert_eq!(xirr(&[]), None);
    }

    #[test]
    fn cash_flows_include_contributions() {
        let points = vec![
            EquityPoint { date: day(0), equity: 500.0, realized: 0.0, unrealized: 0.0, contributed: 500.0 },
            EquityPoint { date: day(5), equity: 1_000.0, realized: 0.0, unrealized: 0.0, contributed: 1_000.0 },
            EquityPoint { date: day(9), equity: 1_050.0, realized: 50.0, unrealized: 0.0, contributed: 1_000.0 },
        ];
        assert_eq!(
            cash_flows(&points),
            vec![(day(0), -500.0), (day(5), -500.0), (day(9), 1_050.0)]
        );
    }

    #[test]
    fn alpha_beta_perfect_tracking() {
        let closes = [100.0, 102.0, 99.0, 104.0, 103.0];
        let equity = curve(&closes.map(|c| c * 10.0));
        let bars: Vec<OhlcvBar> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| OhlcvBar {
                date: day(i as i64),
                open: c,
                high: c,
                low: c,
                close: c,
                volume: 0,
            })
            .collect();
        let values: Vec<f64> = equity.iter().map(|p| p.equity).collect();
        let returns = period_returns(&values);
        let (alpha, beta) = alpha_beta(&equity, &returns, &bars);
        assert_relative_eq!(beta.unwrap(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(alpha.unwrap(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn alpha_beta_needs_overlap() {
        let equity = curve(&[100.0, 101.0, 102.0]);
        let returns = period_returns(&[100.0, 101.0, 102.0]);
        let bars = vec![OhlcvBar {
            date: day(50),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 0,
        }];
        assert_eq!(alpha_beta(&equity, &returns, &bars), (None, None));
    }
}
