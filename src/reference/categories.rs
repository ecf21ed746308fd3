use crate::error::Result;
use std::collections::HashMap;
use std::path::Path;

pub const UNKNOWN_CATEGORY: &str = "Other";

/// Symbol -> asset category used to group radar output
#[derive(Debug, Clone)]
pub struct CategoryMap {
    categories: HashMap<String, String>,
}

impl Default for CategoryMap {
    fn default() -> Self {
        let defaults = [
            ("SPY", "Index ETF"),
            ("QQQ", "Index ETF"),
            ("IWM", "Index ETF"),
            ("BTC-USD", "Crypto"),
            ("ETH-USD", "Crypto"),
            ("GGAL.BA", "Argentina"),
            ("YPF.BA", "Argentina"),
            ("AAPL", "US Stock"),
            ("NVDA", "US Stock"),
            ("GLD", "Commodity"),
            ("HYG", "Bond ETF"),
        ];

        Self {
            categories: defaults
                .iter()
                .map(|(s, c)| (s.to_string(), c.to_string()))
                .collect(),
        }
    }
}

impl CategoryMap {
    /// Built-in defaults overlaid with a `{ "SYMBOL": "Category" }` document
    pub fn with_overrides(bytes: &[u8]) -> Result<Self> {
        let overrides: HashMap<String, String> = serde_json::from_slice(bytes)?;
        let mut map = Self::default();
        map.categories.extend(overrides);
        Ok(map)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::with_overrides(&bytes)
    }

    pub fn category(&self, symbol: &str) -> &str {
        self.categories
            .get(symbol)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_CATEGORY)
    }
}
