use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub symbol: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Liquidity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usd: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Volume {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h24: Option<f64>,
}

/// A trading pair that passed structural validation at the upstream boundary:
/// dex id, pair address and both token symbols are present and non-empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pair {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    pub dex_id: String,
    pub pair_address: String,
    pub base_token: TokenRef,
    pub quote_token: TokenRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_usd: Option<String>,
    #[serde(default)]
    pub liquidity: Liquidity,
    #[serde(default)]
    pub volume: Volume,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Pair {
    /// Positive finite USD liquidity, if any.
    pub fn liquidity_usd(&self) -> Option<f64> {
        self.liquidity.usd.filter(|v| v.is_finite() && *v > 0.0)
    }

    /// Positive finite 24h volume, if any.
    pub fn volume_h24(&self) -> Option<f64> {
        self.volume.h24.filter(|v| v.is_finite() && *v > 0.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityResult {
    /// Descending by `liquidity.usd`, all strictly positive.
    pub pairs: Vec<Pair>,
    pub skipped: usize,
    pub scanned_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeShare {
    #[serde(flatten)]
    pub pair: Pair,
    /// Share of total 24h volume in percent, rounded to two decimals.
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeResult {
    /// Descending by 24h volume.
    pub pairs: Vec<VolumeShare>,
    pub total_volume: f64,
    pub dex_count: usize,
    pub skipped: usize,
    pub scanned_at: i64,
}
