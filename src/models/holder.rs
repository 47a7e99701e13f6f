use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Holder {
    pub address: String,
    /// Whole human-scale units (integer division by `10^decimals`).
    pub balance: String,
    /// Share of supply in percent, two-decimal precision, within [0, 100].
    pub percentage: f64,
    #[serde(skip)]
    pub raw_balance: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HolderResult {
    pub holders: Vec<Holder>,
    /// Number of holders actually fetched, never above the target.
    pub total_holders: usize,
    /// Whole human-scale supply.
    pub total_supply: String,
    /// Sum of the ten largest holders' percentages, within [0, 100].
    pub top10_percentage: f64,
    /// Malformed items dropped during pagination.
    pub skipped: usize,
    pub scanned_at: i64,
}

/// Emitted after each processed holder item.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct HolderProgress {
    pub processed: usize,
    pub target: usize,
}
