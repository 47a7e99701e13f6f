use alloy_primitives::Address;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::{PairListing, PairSource};
use crate::error::FetchError;
use crate::fetcher::RetryableFetcher;
use crate::models::{Liquidity, Pair, TokenRef, Volume};

/// DexScreener - pair listing by token address (`{api}/{address}`)
pub struct DexScreenerSource {
    api: String,
    fetcher: Arc<RetryableFetcher>,
}

#[derive(Debug, Deserialize)]
struct DexScreenerResponse {
    pairs: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct DexScreenerPair {
    #[serde(rename = "chainId")]
    chain_id: Option<String>,
    #[serde(rename = "dexId")]
    dex_id: Option<String>,
    #[serde(rename = "pairAddress")]
    pair_address: Option<String>,
    #[serde(rename = "baseToken")]
    base_token: Option<DexScreenerToken>,
    #[serde(rename = "quoteToken")]
    quote_token: Option<DexScreenerToken>,
    #[serde(rename = "priceUsd")]
    price_usd: Option<String>,
    liquidity: Option<DexScreenerLiquidity>,
    volume: Option<DexScreenerVolume>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DexScreenerToken {
    address: Option<String>,
    name: Option<String>,
    symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DexScreenerLiquidity {
    usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DexScreenerVolume {
    h24: Option<f64>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl DexScreenerToken {
    fn into_ref(self) -> Option<TokenRef> {
        Some(TokenRef {
            symbol: non_empty(self.symbol)?,
            address: non_empty(self.address),
            name: non_empty(self.name),
        })
    }
}

impl DexScreenerPair {
    fn into_pair(self) -> Result<Pair, &'static str> {
        let dex_id = non_empty(self.dex_id).ok_or("missing dexId")?;
        let pair_address = non_empty(self.pair_address).ok_or("missing pairAddress")?;
        let base_token = self
            .base_token
            .and_then(DexScreenerToken::into_ref)
            .ok_or("missing baseToken.symbol")?;
        let quote_token = self
            .quote_token
            .and_then(DexScreenerToken::into_ref)
            .ok_or("missing quoteToken.symbol")?;

        Ok(Pair {
            chain_id: non_empty(self.chain_id),
            dex_id,
            pair_address,
            base_token,
            quote_token,
            price_usd: self.price_usd,
            liquidity: Liquidity {
                usd: self.liquidity.and_then(|l| l.usd),
            },
            volume: Volume {
                h24: self.volume.and_then(|v| v.h24),
            },
            url: self.url,
        })
    }
}

/// Decode every pair independently, dropping the ones that fail structural checks.
pub fn decode_pairs(raw: Vec<Value>) -> PairListing {
    let mut listing = PairListing::default();
    for (index, value) in raw.into_iter().enumerate() {
        let decoded = serde_json::from_value::<DexScreenerPair>(value)
            .map_err(|e| e.to_string())
            .and_then(|p| p.into_pair().map_err(str::to_string));
        match decoded {
            Ok(pair) => listing.pairs.push(pair),
            Err(reason) => {
                tracing::warn!("Skipping malformed pair #{}: {}", index, reason);
                listing.skipped += 1;
            }
        }
    }
    listing
}

impl DexScreenerSource {
    pub fn new(api: impl Into<String>, fetcher: Arc<RetryableFetcher>) -> Self {
        Self {
            api: api.into(),
            fetcher,
        }
    }
}

#[async_trait]
impl PairSource for DexScreenerSource {
    fn name(&self) -> &'static str {
        "DexScreener"
    }

    async fn fetch_pairs(
        &self,
        token: Address,
        cancel: &CancellationToken,
    ) -> Result<PairListing, FetchError> {
        let url = format!("{}/{}", self.api.trim_end_matches('/'), token.to_checksum(None));
        let data: DexScreenerResponse = self.fetcher.get_json(&url, cancel).await?;
        Ok(decode_pairs(data.pairs.unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_pairs_keeps_well_formed() {
        let raw = vec![json!({
            "chainId": "pulsechain",
            "dexId": "pulsex",
            "pairAddress": "0xf1F4ee610b2bAbB05C635F726eF8B0C568c8dc65",
            "baseToken": { "address": "0x2b59", "name": "HEX", "symbol": "HEX" },
            "quoteToken": { "symbol": "WPLS" },
            "priceUsd": "0.0051",
            "liquidity": { "usd": 1250.5, "base": 10, "quote": 20 },
            "volume": { "h24": 300.0, "h6": 10 }
        })];
        let listing = decode_pairs(raw);
        assert_eq!(listing.skipped, 0);
        let pair = &listing.pairs[0];
        assert_eq!(pair.dex_id, "pulsex");
        assert_eq!(pair.quote_token.symbol, "WPLS");
        assert_eq!(pair.liquidity_usd(), Some(1250.5));
        assert_eq!(pair.volume_h24(), Some(300.0));
    }

    #[test]
    fn test_decode_pairs_skips_malformed() {
        let raw = vec![
            json!({ "dexId": "pulsex", "pairAddress": "0x1", "baseToken": { "symbol": "A" } }),
            json!({ "dexId": "", "pairAddress": "0x2",
                    "baseToken": { "symbol": "A" }, "quoteToken": { "symbol": "B" } }),
            json!({ "dexId": "pulsex", "pairAddress": "0x3",
                    "baseToken": { "symbol": "A" }, "quoteToken": { "symbol": "B" },
                    "liquidity": { "usd": "lots" } }),
            json!("not an object"),
            json!({ "dexId": "9mm", "pairAddress": "0x4",
                    "baseToken": { "symbol": "A" }, "quoteToken": { "symbol": "B" } }),
        ];
        let listing = decode_pairs(raw);
        assert_eq!(listing.skipped, 4);
        assert_eq!(listing.pairs.len(), 1);
        assert_eq!(listing.pairs[0].dex_id, "9mm");
        assert_eq!(listing.pairs[0].liquidity_usd(), None);
    }
}
