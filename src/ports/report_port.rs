//! Report generation port trait.

use crate::domain::analytics::PerformanceReport;
use crate::domain::backtest::BacktestResult;
use crate::domain::error::EwatraderError;
use std::io::Write;

/// Port for rendering a finished backtest.
pub trait ReportPort {
    fn write(
        &self,
        result: &BacktestResult,
        report: &PerformanceReport,
        out: &mut dyn Write,
    ) -> Result<(), EwatraderError>;
}
