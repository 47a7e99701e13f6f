use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BurnRecord {
    /// Checksum-formatted burn address.
    pub address: String,
    /// Human-scale balance held at the address.
    pub amount: String,
    /// Set when the balance read failed and `amount` is the zero default.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unavailable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BurnResult {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Raw integer supply as a decimal string.
    pub total_supply: String,
    /// Human-scale sum of every burn balance.
    pub total_burned: String,
    /// Two-decimal percentage of supply; `"0.00"` when supply is unknown or zero.
    pub burn_percentage: String,
    pub burn_details: Vec<BurnRecord>,
    /// Identity fields that could not be read and were defaulted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unavailable_fields: Vec<String>,
    pub scanned_at: i64,
}
