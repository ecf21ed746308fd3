use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named, versioned feature-set layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FeatureSetVersion {
    #[serde(rename = "light_v6")]
    LightV6,
    #[serde(rename = "smc_v10")]
    SmcV10,
    #[default]
    #[serde(rename = "smc_v12")]
    SmcV12,
    #[serde(rename = "smc_v15")]
    SmcV15,
    #[serde(rename = "smc_v17")]
    SmcV17,
}

impl FeatureSetVersion {
    pub const ALL: [FeatureSetVersion; 5] = [
        FeatureSetVersion::LightV6,
        FeatureSetVersion::SmcV10,
        FeatureSetVersion::SmcV12,
        FeatureSetVersion::SmcV15,
        FeatureSetVersion::SmcV17,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureSetVersion::LightV6 => "light_v6",
            FeatureSetVersion::SmcV10 => "smc_v10",
            FeatureSetVersion::SmcV12 => "smc_v12",
            FeatureSetVersion::SmcV15 => "smc_v15",
            FeatureSetVersion::SmcV17 => "smc_v17",
        }
    }

    pub fn width(&self) -> usize {
        match self {
            FeatureSetVersion::LightV6 => 6,
            FeatureSetVersion::SmcV10 => 10,
            FeatureSetVersion::SmcV12 => 12,
            FeatureSetVersion::SmcV15 => 15,
            FeatureSetVersion::SmcV17 => 17,
        }
    }
}

impl fmt::Display for FeatureSetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureSetVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light_v6" => Ok(FeatureSetVersion::LightV6),
            "smc_v10" => Ok(FeatureSetVersion::SmcV10),
            "smc_v12" => Ok(FeatureSetVersion::SmcV12),
            "smc_v15" => Ok(FeatureSetVersion::SmcV15),
            "smc_v17" => Ok(FeatureSetVersion::SmcV17),
            other => Err(format!("unknown feature set '{}'", other)),
        }
    }
}

/// How a column's latest value is turned into a vector entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Normalization {
    Raw,
    /// Divided by the latest ATR; 0 when ATR is 0
    AtrScaled,
    /// Position inside the min/max of the trailing `window` rows; 0 for a flat window
    MinMax { window: usize },
    /// (value - center) / scale
    Centered { center: f64, scale: f64 },
}

/// One column of a feature set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub column: String,
    pub normalization: Normalization,
}

impl FeatureSpec {
    pub fn new(column: &str, normalization: Normalization) -> Self {
        Self {
            column: column.to_string(),
            normalization,
        }
    }

    pub fn raw(column: &str) -> Self {
        Self::new(column, Normalization::Raw)
    }

    pub fn atr_scaled(column: &str) -> Self {
        Self::new(column, Normalization::AtrScaled)
    }
}

/// Which enrichment a feature set reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureFamily {
    /// Classic indicators plus order-flow and structure proxies
    Smc,
    /// Log return, volatility regime and moving-average distances
    Light,
}

/// Vector positions the policy layer reads back out of a vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Anchors {
    pub close: usize,
    pub atr: usize,
    pub fvg: Option<usize>,
    pub order_block: Option<usize>,
    pub market_structure: Option<usize>,
}

/// Ordered feature layout with a declared normalization per column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub name: String,
    pub family: FeatureFamily,
    pub features: Vec<FeatureSpec>,
}

impl FeatureSet {
    pub fn new(name: &str, family: FeatureFamily, features: Vec<FeatureSpec>) -> Self {
        Self {
            name: name.to_string(),
            family,
            features,
        }
    }

    /// Built-in layout for a version
    pub fn standard(version: FeatureSetVersion) -> Self {
        use FeatureSpec as F;

        let smc_head = || {
            vec![
                F::raw("close"),
                F::raw("rsi"),
                F::raw("ema_fast_dist"),
                F::raw("atr"),
                F::raw("fvg_active"),
                F::raw("order_block_active"),
                F::raw("market_structure"),
            ]
        };
        let order_flow = [
            F::raw("rvol"),
            F::raw("imbalance_proxy"),
            F::raw("liquidity_sweep"),
            F::raw("structure_score"),
        ];
        let profile_distances = [
            F::atr_scaled("dist_to_poc"),
            F::atr_scaled("dist_to_vah"),
            F::atr_scaled("dist_to_val"),
        ];

        let features = match version {
            FeatureSetVersion::LightV6 => [
                "log_ret",
                "vol_regime",
                "dist_sma50",
                "dist_sma200",
                "vol_rel",
                "rsi_norm",
            ]
            .iter()
            .map(|c| F::raw(c))
            .collect(),
            FeatureSetVersion::SmcV10 => {
                let mut f = smc_head();
                f.extend(profile_distances);
                f
            }
            FeatureSetVersion::SmcV12 => {
                let mut f = smc_head();
                f.push(F::raw("dist_to_vwap"));
                f.extend(profile_distances);
                f.push(F::new("volume", Normalization::MinMax { window: 100 }));
                f
            }
            FeatureSetVersion::SmcV15 => {
                let mut f = smc_head();
                f.push(F::raw("dist_to_vwap"));
                f.extend(profile_distances);
                f.extend(order_flow);
                f
            }
            FeatureSetVersion::SmcV17 => {
                let mut f = smc_head();
                f.push(F::raw("dist_to_vwap"));
                f.extend(profile_distances);
                f.extend(order_flow);
                f.extend([F::raw("ema_slow_dist"), F::raw("fvg_strength")]);
                f
            }
        };

        let family = match version {
            FeatureSetVersion::LightV6 => FeatureFamily::Light,
            _ => FeatureFamily::Smc,
        };

        Self::new(version.as_str(), family, features)
    }

    pub fn width(&self) -> usize {
        self.features.len()
    }

    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.features.iter().position(|f| f.column == column)
    }

    /// Close/ATR anchors, present only when both are carried unscaled.
    ///
    /// The FVG anchor prefers the continuous `fvg_strength` over the
    /// `fvg_active` flag when a set carries both.
    pub fn anchors(&self) -> Option<Anchors> {
        let raw_index = |column: &str| {
            self.features
                .iter()
                .position(|f| f.column == column && f.normalization == Normalization::Raw)
        };

        Some(Anchors {
            close: raw_index("close")?,
            atr: raw_index("atr")?,
            fvg: self
                .index_of("fvg_strength")
                .or_else(|| self.index_of("fvg_active")),
            order_block: self.index_of("order_block_active"),
            market_structure: self.index_of("market_structure"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_widths() {
        for version in FeatureSetVersion::ALL {
            assert_eq!(FeatureSet::standard(version).width(), version.width(), "{}", version);
        }
    }

    #[test]
    fn test_smc_anchors_fixed() {
        for version in [
            FeatureSetVersion::SmcV10,
            FeatureSetVersion::SmcV12,
            FeatureSetVersion::SmcV15,
        ] {
            let anchors = FeatureSet::standard(version).anchors().unwrap();
            assert_eq!(anchors.close, 0);
            assert_eq!(anchors.atr, 3);
            assert_eq!(anchors.fvg, Some(4));
            assert_eq!(anchors.order_block, Some(5));
            assert_eq!(anchors.market_structure, Some(6));
        }
    }

    #[test]
    fn test_v17_anchors_fvg_on_strength() {
        let set = FeatureSet::standard(FeatureSetVersion::SmcV17);
        let anchors = set.anchors().unwrap();

        assert_eq!((anchors.close, anchors.atr), (0, 3));
        assert_eq!(set.index_of("ema_slow_dist"), Some(15));
        assert_eq!(set.index_of("fvg_strength"), Some(16));
        assert_eq!(anchors.fvg, Some(16));
        assert_eq!(anchors.order_block, Some(5));
    }

    #[test]
    fn test_light_set_has_no_anchors() {
        let set = FeatureSet::standard(FeatureSetVersion::LightV6);
        assert_eq!(set.family, FeatureFamily::Light);
        assert!(set.anchors().is_none());
    }

    #[test]
    fn test_v15_drops_volume() {
        let set = FeatureSet::standard(FeatureSetVersion::SmcV15);
        assert!(set.index_of("volume").is_none());
        assert_eq!(set.index_of("structure_score"), Some(14));
    }

    #[test]
    fn test_version_parse() {
        assert_eq!("smc_v15".parse::<FeatureSetVersion>().unwrap(), FeatureSetVersion::SmcV15);
        assert_eq!("smc_v17".parse::<FeatureSetVersion>().unwrap(), FeatureSetVersion::SmcV17);
        assert!("smc_v11".parse::<FeatureSetVersion>().is_err());
    }
}
