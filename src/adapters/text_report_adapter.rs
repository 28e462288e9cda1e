//! Plain-text report adapter implementing ReportPort.
//!
//! Each section is built as a `String` by its own formatter so it can be
//! tested without a writer.

use std::fmt::Display;
use std::io::Write;

use crate::domain::analytics::{PerformanceReport, PeriodAnalysis, PeriodPoint, Regression, SignalAccuracy};
use crate::domain::backtest::{BacktestResult, SymbolOutcome};
use crate::domain::error::{AnalyticsError, EwatraderError};
use crate::domain::position::Trade;
use crate::ports::report_port::ReportPort;
use rust_decimal::Decimal;

pub struct TextReportAdapter;

impl TextReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for TextReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        report: &PerformanceReport,
        out: &mut dyn Write,
    ) -> Result<(), EwatraderError> {
        let sections = [
            format_outcomes(&result.outcomes),
            format_trade_history(result.portfolio.trades()),
            format_performance(report),
            format_regression(&report.regression),
            format_accuracy(&report.signal_accuracy),
            format_periods(&report.periods),
        ];
        out.write_all(sections.join("\n").as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

fn undefined(err: &AnalyticsError) -> String {
    format!("undefined ({})", err)
}

fn or_undefined<T, F>(value: &Result<T, AnalyticsError>, render: F) -> String
where
    F: FnOnce(&T) -> String,
{
    match value {
        Ok(v) => render(v),
        Err(e) => undefined(e),
    }
}

fn pct(value: &Decimal) -> String {
    format!("{}%", (value * Decimal::ONE_HUNDRED).round_dp(4))
}

fn row(label: &str, value: impl Display) -> String {
    format!("{:<20}{}\n", format!("{}:", label), value)
}

pub fn format_outcomes<'a, I>(outcomes: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a SymbolOutcome)>,
{
    let mut output = String::from("Symbols:\n");
    let mut any = false;
    for (symbol, outcome) in outcomes {
        any = true;
        output.push_str(&format!("  {:<8} {}\n", symbol, outcome));
    }
    if !any {
        output.push_str("  none\n");
    }
    output
}

pub fn format_trade_history(trades: &[Trade]) -> String {
    let mut output = String::from("Trade History:\n");
    if trades.is_empty() {
        output.push_str("  No trades executed.\n");
        return output;
    }
    for trade in trades {
        output.push_str(&format!(
            "  Symbol: {}, Date: {}, PnL: {} ({})\n",
            trade.symbol,
            trade.date.format("%Y-%m-%d"),
            trade.pnl.round_dp(2),
            trade.reason
        ));
    }
    output
}

pub fn format_performance(report: &PerformanceReport) -> String {
    let mut output = String::from("Portfolio Performance:\n");
    output.push_str(&row("Starting Capital", report.starting_capital.round_dp(2)));
    output.push_str(&row("Final Capital", report.final_capital.round_dp(2)));
    output.push_str(&row("Total PnL", report.total_pnl.round_dp(2)));
    output.push_str(&row("Average Return", or_undefined(&report.average_return, pct)));
    output.push_str(&row("Adjusted Return", or_undefined(&report.adjusted_return, pct)));
    output.push_str(&row("Volatility", or_undefined(&report.volatility, pct)));
    output.push_str(&row(
        "Sharpe Ratio",
        or_undefined(&report.sharpe_ratio, |s| s.to_string()),
    ));
    output.push_str(&row("Maximum Drawdown", pct(&report.max_drawdown)));
    output
}

pub fn format_regression(regression: &Result<Regression, AnalyticsError>) -> String {
    let mut output = String::from("Regression Analysis:\n");
    match regression {
        Ok(reg) => {
            output.push_str(&row("Samples", reg.samples));
            output.push_str(&row("Alpha", format!("{:.6}", reg.alpha)));
            output.push_str(&row("Beta", format!("{:.6}", reg.beta)));
            let r2 = match reg.r_squared {
                Some(r2) => format!("{:.6}", r2),
                None => "undefined (portfolio returns have zero variance)".to_string(),
            };
            output.push_str(&row("R-Squared", r2));
        }
        Err(e) => output.push_str(&format!("  {}\n", undefined(e))),
    }
    output
}

pub fn format_accuracy(accuracy: &Result<SignalAccuracy, AnalyticsError>) -> String {
    let mut output = String::from("Trading Signal Accuracy:\n");
    match accuracy {
        Ok(acc) => {
            output.push_str(&row("Total Trades", acc.total));
            output.push_str(&row("Profitable Trades", acc.profitable));
            output.push_str(&row("Loss-Making Trades", acc.loss_making));
            output.push_str(&row("Signal Accuracy", format!("{}%", acc.accuracy)));
        }
        Err(e) => output.push_str(&format!("  {}\n", undefined(e))),
    }
    output
}

fn format_period_point(point: &PeriodPoint) -> String {
    match point.date {
        Some(date) => format!("{} (on {})", point.cumulative_return, date.format("%Y-%m-%d")),
        None => format!("{} (no matching trade)", point.cumulative_return),
    }
}

pub fn format_periods(periods: &Result<PeriodAnalysis, AnalyticsError>) -> String {
    let mut output = String::from("Period Analysis:\n");
    match periods {
        Ok(p) => {
            output.push_str(&row("Highest Cumulative", format_period_point(&p.peak)));
            output.push_str(&row("Lowest Cumulative", format_period_point(&p.trough)));
        }
        Err(e) => output.push_str(&format!("  {}\n", undefined(e))),
    }
    output
}
