//! INI file configuration adapter.
//!
//! Section and key names are case-insensitive. Numeric values are read
//! straight from the text so decimals keep their exact scale.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    fn trimmed(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key).map(|v| v.trim().to_string())
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.trimmed(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> Result<i64, String> {
        match self.trimmed(section, key) {
            None => Ok(default),
            Some(v) => v.parse().map_err(|_| v),
        }
    }

    fn get_decimal(&self, section: &str, key: &str, default: Decimal) -> Result<Decimal, String> {
        match self.trimmed(section, key) {
            None => Ok(default),
            Some(v) => Decimal::from_str(&v).map_err(|_| v),
        }
    }
}
