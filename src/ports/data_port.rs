//! Data access port trait.

use crate::domain::error::EwatraderError;
use crate::domain::price_bar::PriceBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `symbol` within `[start_date, end_date]`, ascending by date.
    fn fetch_prices(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, EwatraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, EwatraderError>;

    /// First date, last date and bar count, or `None` when nothing is stored.
    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, EwatraderError>;
}
