//! Portfolio aggregate and the per-symbol execution state machine.
//!
//! One `Portfolio` lives for a whole run. Each symbol is replayed against a
//! scratch ledger seeded with the current capital; the ledger is merged back
//! only once the symbol finishes, so a bad series never leaves half its
//! trades behind.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::error::SimulationError;
use super::fixed_point::{div_ratio, round_currency};
use super::position::{ExitReason, Position, Trade};
use super::price_bar::PriceBar;
use super::signal::{Signal, SignalKind};

/// Sizing and stop-loss constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionParams {
    pub stop_loss: Decimal,
    pub max_position_fraction: Decimal,
    pub max_volatility: Decimal,
    pub volatility_estimate: Decimal,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        ExecutionParams {
            stop_loss: Decimal::new(2, 2),
            max_position_fraction: Decimal::new(10, 2),
            max_volatility: Decimal::new(5, 2),
            volatility_estimate: Decimal::new(1, 2),
        }
    }
}

/// Units to open at `price` given the running capital.
///
/// The volatility-scaled size is capped by `max_position_fraction` of capital.
/// `price` must be positive.
pub fn position_size(capital: Decimal, price: Decimal, params: &ExecutionParams) -> Decimal {
    let vol_eff = params.volatility_estimate.min(params.max_volatility);
    let scaled = vol_eff * Decimal::ONE_HUNDRED;
    let multiplier = if scaled.is_zero() {
        Decimal::ONE
    } else {
        Decimal::ONE.min(div_ratio(Decimal::ONE, scaled))
    };

    let raw = div_ratio(capital * multiplier, price);
    let cap = div_ratio(capital * params.max_position_fraction, price);
    raw.min(cap)
}

/// Result of replaying one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolSummary {
    pub trades: usize,
    pub pnl: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    starting_capital: Decimal,
    current_capital: Decimal,
    params: ExecutionParams,
    trades: Vec<Trade>,
    returns: BTreeMap<NaiveDate, Decimal>,
    market_returns: BTreeMap<NaiveDate, Decimal>,
}

impl Default for Portfolio {
    fn default() -> Self {
        Portfolio::new(Decimal::new(100_000_00, 2), ExecutionParams::default())
    }
}

impl Portfolio {
    pub fn new(starting_capital: Decimal, params: ExecutionParams) -> Self {
        Portfolio {
            starting_capital,
            current_capital: starting_capital,
            params,
            trades: Vec::new(),
            returns: BTreeMap::new(),
            market_returns: BTreeMap::new(),
        }
    }

    pub fn starting_capital(&self) -> Decimal {
        self.starting_capital
    }

    pub fn current_capital(&self) -> Decimal {
        self.current_capital
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Return contributions keyed by date, ascending.
    pub fn returns(&self) -> &BTreeMap<NaiveDate, Decimal> {
        &self.returns
    }

    /// Return contributions in date order.
    pub fn return_series(&self) -> Vec<Decimal> {
        self.returns.values().copied().collect()
    }

    pub fn market_returns(&self) -> &BTreeMap<NaiveDate, Decimal> {
        &self.market_returns
    }

    pub fn total_pnl(&self) -> Decimal {
        self.trades.iter().map(|t| t.pnl).sum()
    }

    /// Merge a contribution into the return mapping, adding to any existing
    /// value for the same date.
    pub fn record_return(&mut self, date: NaiveDate, value: Decimal) {
        *self.returns.entry(date).or_insert(Decimal::ZERO) += value;
    }

    /// Install benchmark returns; later values overwrite earlier ones per date.
    pub fn add_market_returns(&mut self, market_returns: &BTreeMap<NaiveDate, Decimal>) {
        self.market_returns
            .extend(market_returns.iter().map(|(d, r)| (*d, *r)));
    }

    /// Replay `bars` for `symbol`, acting on `signals`.
    ///
    /// Only the first signal per date is honoured. On a precondition
    /// violation the portfolio is left untouched.
    pub fn execute_signals<I>(
        &mut self,
        symbol: &str,
        signals: I,
        bars: &[PriceBar],
    ) -> Result<SymbolSummary, SimulationError>
    where
        I: IntoIterator<Item = Signal>,
    {
        let mut by_date: HashMap<NaiveDate, SignalKind> = HashMap::new();
        for signal in signals {
            by_date.entry(signal.date).or_insert(signal.kind);
        }

        let empty = SymbolSummary {
            trades: 0,
            pnl: Decimal::ZERO,
        };
        if by_date.is_empty() || bars.is_empty() {
            return Ok(empty);
        }

        let mut ledger = SymbolLedger::new(symbol, self.current_capital);
        let mut position = Position::Flat;
        let mut previous: Option<NaiveDate> = None;

        for bar in bars {
            validate_bar(symbol, bar, previous)?;
            previous = Some(bar.date);
            let price = bar.adjusted_close;

            if let Some(&kind) = by_date.get(&bar.date) {
                position = match (kind, position) {
                    (SignalKind::Buy, Position::Long { .. })
                    | (SignalKind::Sell, Position::Short { .. }) => position,
                    (SignalKind::Buy, current) => {
                        if let Some(pnl) = current.realized_pnl(price) {
                            ledger.close(bar.date, pnl, ExitReason::Signal, true);
                        }
                        Position::Long {
                            entry_price: price,
                            size: position_size(ledger.capital, price, &self.params),
                        }
                    }
                    (SignalKind::Sell, current) => {
                        if let Some(pnl) = current.realized_pnl(price) {
                            ledger.close(bar.date, pnl, ExitReason::Signal, true);
                        }
                        Position::Short {
                            entry_price: price,
                            size: position_size(ledger.capital, price, &self.params),
                        }
                    }
                };
            }

            if position.should_stop_loss(price, self.params.stop_loss) {
                if let Some(pnl) = position.realized_pnl(price) {
                    ledger.close(bar.date, pnl, ExitReason::StopLoss, true);
                }
                position = Position::Flat;
            }
        }

        // End-of-series close updates capital and the ledger but leaves the
        // return mapping alone.
        if let Some(last) = bars.last() {
            if let Some(pnl) = position.realized_pnl(last.adjusted_close) {
                ledger.close(last.date, pnl, ExitReason::EndOfSeries, false);
            }
        }

        Ok(self.commit(ledger))
    }

    fn commit(&mut self, ledger: SymbolLedger) -> SymbolSummary {
        let summary = SymbolSummary {
            trades: ledger.trades.len(),
            pnl: ledger.trades.iter().map(|t| t.pnl).sum(),
        };
        self.current_capital = ledger.capital;
        self.trades.extend(ledger.trades);
        for (date, value) in ledger.returns {
            self.record_return(date, value);
        }
        summary
    }
}

fn validate_bar(
    symbol: &str,
    bar: &PriceBar,
    previous: Option<NaiveDate>,
) -> Result<(), SimulationError> {
    if bar.adjusted_close <= Decimal::ZERO {
        return Err(SimulationError::NonPositivePrice {
            symbol: symbol.to_string(),
            date: bar.date,
            price: bar.adjusted_close,
        });
    }
    if let Some(previous) = previous {
        if bar.date <= previous {
            return Err(SimulationError::UnorderedDates {
                symbol: symbol.to_string(),
                previous,
                date: bar.date,
            });
        }
    }
    Ok(())
}

/// Scratch state for one symbol, merged into the portfolio on success.
struct SymbolLedger {
    symbol: String,
    capital: Decimal,
    trades: Vec<Trade>,
    returns: Vec<(NaiveDate, Decimal)>,
}

impl SymbolLedger {
    fn new(symbol: &str, capital: Decimal) -> Self {
        SymbolLedger {
            symbol: symbol.to_string(),
            capital,
            trades: Vec::new(),
            returns: Vec::new(),
        }
    }

    fn close(&mut self, date: NaiveDate, raw_pnl: Decimal, reason: ExitReason, record_return: bool) {
        let pnl = round_currency(raw_pnl);
        self.capital += pnl;
        debug!(
            "{} closed on {} ({}): pnl {}, capital {}",
            self.symbol, date, reason, pnl, self.capital
        );
        self.trades.push(Trade {
            symbol: self.symbol.clone(),
            date,
            pnl,
            reason,
        });

        if record_return {
            match pnl.checked_div(self.capital) {
                Some(_) => self.returns.push((date, div_ratio(pnl, self.capital))),
                None => debug!("{} capital exhausted on {}, return not recorded", self.symbol, date),
            }
        }
    }
}
