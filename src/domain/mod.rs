//! Core domain types and logic.

pub mod fixed_point;
pub mod price_bar;
pub mod indicator;
pub mod signal;
pub mod liquidity;
pub mod position;
pub mod portfolio;
pub mod analytics;
pub mod benchmark;
pub mod backtest;
pub mod universe;
pub mod config_validation;
pub mod error;
