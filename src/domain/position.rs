//! Per-symbol position state and closed trades.

use crate::domain::fixed_point::div_ratio;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fmt;

/// Position held in one symbol while its bars are replayed.
///
/// Built fresh as `Flat` for every symbol and dropped when the symbol is done.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Position {
    #[default]
    Flat,
    Long { entry_price: Decimal, size: Decimal },
    Short { entry_price: Decimal, size: Decimal },
}

impl Position {
    /// Unrounded payoff of closing at `exit_price`, `None` when flat.
    ///
    /// Long: (exit - entry) * size. Short: (entry - exit) * size.
    pub fn realized_pnl(&self, exit_price: Decimal) -> Option<Decimal> {
        match *self {
            Position::Flat => None,
            Position::Long { entry_price, size } => Some((exit_price - entry_price) * size),
            Position::Short { entry_price, size } => Some((entry_price - exit_price) * size),
        }
    }

    /// Whether the adverse move from entry has reached `threshold`.
    pub fn should_stop_loss(&self, price: Decimal, threshold: Decimal) -> bool {
        match *self {
            Position::Flat => false,
            Position::Long { entry_price, .. } => {
                div_ratio(entry_price - price, entry_price) >= threshold
            }
            Position::Short { entry_price, .. } => {
                div_ratio(price - entry_price, entry_price) >= threshold
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitReason {
    Signal,
    StopLoss,
    EndOfSeries,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Signal => write!(f, "signal"),
            ExitReason::StopLoss => write!(f, "stop-loss"),
            ExitReason::EndOfSeries => write!(f, "end-of-series"),
        }
    }
}

/// A realised close. `pnl` is already rounded to currency precision.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub symbol: String,
    pub date: NaiveDate,
    pub pnl: Decimal,
    pub reason: ExitReason,
}

impl Trade {
    pub fn is_profitable(&self) -> bool {
        self.pnl > Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn sample_long() -> Position {
        Position::Long {
            entry_price: d("50"),
            size: d("100"),
        }
    }

    fn sample_short() -> Position {
        Position::Short {
            entry_price: d("100"),
            size: d("100"),
        }
    }

    #[test]
    fn default_is_flat() {
        assert_eq!(Position::default(), Position::Flat);
    }

    #[test]
    fn flat_has_no_pnl() {
        assert_eq!(Position::Flat.realized_pnl(d("10")), None);
        assert!(!Position::Flat.should_stop_loss(d("0.01"), d("0.02")));
    }

    #[test]
    fn realized_pnl_long() {
        let pos = sample_long();
        assert_eq!(pos.realized_pnl(d("55")), Some(d("500")));
        assert_eq!(pos.realized_pnl(d("45")), Some(d("-500")));
    }

    #[test]
    fn realized_pnl_short() {
        let pos = sample_short();
        assert_eq!(pos.realized_pnl(d("90")), Some(d("1000")));
        assert_eq!(pos.realized_pnl(d("110")), Some(d("-1000")));
    }

    #[test]
    fn stop_loss_long_triggered() {
        let pos = sample_long();
        assert!(pos.should_stop_loss(d("49"), d("0.02")));
        assert!(pos.should_stop_loss(d("48"), d("0.02")));
        assert!(!pos.should_stop_loss(d("49.5"), d("0.02")));
        assert!(!pos.should_stop_loss(d("60"), d("0.02")));
    }

    #[test]
    fn stop_loss_short_triggered() {
        let pos = sample_short();
        assert!(pos.should_stop_loss(d("102"), d("0.02")));
        assert!(pos.should_stop_loss(d("110"), d("0.02")));
        assert!(!pos.should_stop_loss(d("101"), d("0.02")));
        assert!(!pos.should_stop_loss(d("80"), d("0.02")));
    }

    #[test]
    fn stop_loss_uses_rounded_ratio() {
        // (100 - 98.005) / 100 = 0.01995 rounds up to 0.0200
        let pos = Position::Long {
            entry_price: d("100"),
            size: d("1"),
        };
        assert!(pos.should_stop_loss(d("98.005"), d("0.02")));
    }

    #[test]
    fn trade_profitability() {
        let trade = Trade {
            symbol: "AAPL".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            pnl: d("0.00"),
            reason: ExitReason::Signal,
        };
        assert!(!trade.is_profitable());
        assert!(Trade { pnl: d("0.01"), ..trade }.is_profitable());
    }

    #[test]
    fn exit_reason_display() {
        assert_eq!(ExitReason::StopLoss.to_string(), "stop-loss");
        assert_eq!(ExitReason::EndOfSeries.to_string(), "end-of-series");
    }
}
