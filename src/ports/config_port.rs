//! Configuration access port trait.

use rust_decimal::Decimal;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    /// Integer value, `default` when the key is absent.
    ///
    /// An unparseable value is returned as the error.
    fn get_int(&self, section: &str, key: &str, default: i64) -> Result<i64, String>;
    /// Exact decimal value, with the same absent/unparseable rules as `get_int`.
    fn get_decimal(&self, section: &str, key: &str, default: Decimal) -> Result<Decimal, String>;
}
