//! Delimited exports and per-DEX breakdowns for scan results.

use serde::Serialize;
use std::collections::HashMap;

use crate::models::units::round2;
use crate::models::{BurnResult, HolderResult, LiquidityResult, VolumeResult};

pub const OTHERS: &str = "Others";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DexSlice {
    pub name: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
}

fn write_rows<I>(rows: I) -> Result<String, csv::Error>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.write_record(&row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_table<I>(header: &[&str], rows: I) -> Result<String, csv::Error>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let header = header.iter().map(|h| h.to_string()).collect();
    write_rows(std::iter::once(header).chain(rows))
}

/// Headerless `name,token,totalBurned` line, then the per-address table.
/// Without a contract `address` the token column holds the native symbol.
pub fn burn_csv(result: &BurnResult, address: Option<&str>) -> Result<String, csv::Error> {
    let token = address.unwrap_or(result.symbol.as_str());
    let summary = write_rows(std::iter::once(vec![
        result.name.to_lowercase(),
        token.to_string(),
        result.total_burned.clone(),
    ]))?;
    let details = write_table(
        &["Address", "Amount"],
        result
            .burn_details
            .iter()
            .map(|r| vec![r.address.clone(), r.amount.clone()]),
    )?;
    Ok(format!("{}\n{}", summary, details))
}

pub fn holders_csv(result: &HolderResult) -> Result<String, csv::Error> {
    write_table(
        &["Address", "Balance", "Percentage"],
        result.holders.iter().map(|h| {
            vec![h.address.clone(), h.balance.clone(), format!("{:.2}", h.percentage)]
        }),
    )
}

pub fn liquidity_csv(result: &LiquidityResult) -> Result<String, csv::Error> {
    write_table(
        &["DEX", "Pair Address", "Base Token", "Quote Token", "Liquidity (USD)"],
        result.pairs.iter().map(|p| {
            vec![
                p.dex_id.clone(),
                p.pair_address.clone(),
                p.base_token.symbol.clone(),
                p.quote_token.symbol.clone(),
                p.liquidity.usd.unwrap_or(0.0).to_string(),
            ]
        }),
    )
}

pub fn volume_csv(result: &VolumeResult) -> Result<String, csv::Error> {
    write_table(
        &["DEX", "Pair Address", "Base Token", "Quote Token", "24h Volume", "Percentage"],
        result.pairs.iter().map(|s| {
            vec![
                s.pair.dex_id.clone(),
                s.pair.pair_address.clone(),
                s.pair.base_token.symbol.clone(),
                s.pair.quote_token.symbol.clone(),
                s.pair.volume.h24.unwrap_or(0.0).to_string(),
                format!("{:.2}", s.percentage),
            ]
        }),
    )
}

/// Sum values per dex id, keeping first-seen order for ties.
fn sum_by_dex<'a, I>(entries: I) -> Vec<(String, f64)>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, f64> = HashMap::new();
    for (dex, value) in entries {
        let slot = totals.entry(dex.to_string()).or_insert_with(|| {
            order.push(dex.to_string());
            0.0
        });
        *slot += value;
    }
    let mut summed: Vec<(String, f64)> = order
        .into_iter()
        .map(|dex| {
            let value = totals.get(&dex).copied().unwrap_or(0.0);
            (dex, value)
        })
        .collect();
    summed.sort_by(|a, b| b.1.total_cmp(&a.1));
    summed
}

/// Total USD liquidity per DEX, deepest first, at most `limit` entries.
pub fn liquidity_by_dex(result: &LiquidityResult, limit: usize) -> Vec<DexSlice> {
    sum_by_dex(
        result
            .pairs
            .iter()
            .map(|p| (p.dex_id.as_str(), p.liquidity_usd().unwrap_or(0.0))),
    )
    .into_iter()
    .take(limit)
    .map(|(name, value)| DexSlice { name, value, percentage: None })
    .collect()
}

/// Volume share per DEX; DEXes under `min_share` percent fold into one `Others` slice.
pub fn volume_by_dex(result: &VolumeResult, min_share: f64) -> Vec<DexSlice> {
    if result.total_volume <= 0.0 {
        return Vec::new();
    }
    let mut slices = Vec::new();
    let mut others = 0.0;
    for (name, value) in sum_by_dex(
        result
            .pairs
            .iter()
            .map(|s| (s.pair.dex_id.as_str(), s.pair.volume_h24().unwrap_or(0.0))),
    ) {
        let share = value / result.total_volume * 100.0;
        if share < min_share {
            others += value;
        } else {
            slices.push(DexSlice { name, value, percentage: Some(round2(share)) });
        }
    }
    if others > 0.0 {
        slices.push(DexSlice {
            name: OTHERS.to_string(),
            value: others,
            percentage: Some(round2(others / result.total_volume * 100.0)),
        });
    }
    slices
}
