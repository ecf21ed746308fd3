use crate::error::Result;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Audited historical performance for one symbol. Annotation only.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SymbolStats {
    #[serde(default)]
    pub win_rate: f64,
    #[serde(default)]
    pub edge: f64,
}

/// Shared symbol -> stats map, read concurrently by scans and queries
#[derive(Debug, Clone, Default)]
pub struct StatsBook {
    stats: Arc<DashMap<String, SymbolStats>>,
}

impl StatsBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `{ "SPY": { "win_rate": 61.0, "edge": 4.2 }, ... }`
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let parsed: HashMap<String, SymbolStats> = serde_json::from_slice(bytes)?;
        let book = Self::new();
        for (symbol, stats) in parsed {
            book.insert(&symbol, stats);
        }
        Ok(book)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_json(&bytes)
    }

    pub fn insert(&self, symbol: &str, stats: SymbolStats) {
        self.stats.insert(symbol.to_string(), stats);
    }

    /// Stats for `symbol`; zero stats when unaudited
    pub fn get(&self, symbol: &str) -> SymbolStats {
        self.stats.get(symbol).map(|s| *s.value()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}
