use alloy_primitives::Address;
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{ScanError, ScanResult};
use crate::models::LiquidityResult;
use crate::sources::PairSource;

pub struct LiquidityAggregator {
    source: Arc<dyn PairSource>,
}

impl LiquidityAggregator {
    pub fn new(source: Arc<dyn PairSource>) -> Self {
        Self { source }
    }

    /// Pairs with positive USD liquidity, deepest first.
    pub async fn scan(
        &self,
        address: &str,
        cancel: &CancellationToken,
    ) -> ScanResult<LiquidityResult> {
        let token = Address::from_str(address.trim()).map_err(|_| {
            ScanError::validation("address", format!("'{}' is not a valid address", address))
        })?;

        let listing = self.source.fetch_pairs(token, cancel).await?;
        let mut skipped = listing.skipped;

        let mut pairs = Vec::with_capacity(listing.pairs.len());
        for pair in listing.pairs {
            match pair.liquidity_usd() {
                Some(_) => pairs.push(pair),
                None => {
                    tracing::warn!(
                        "Skipping {} pair {}: no positive USD liquidity",
                        pair.dex_id,
                        pair.pair_address
                    );
                    skipped += 1;
                }
            }
        }

        if pairs.is_empty() {
            return Err(ScanError::Empty(format!(
                "no valid liquidity pairs on {} for {}",
                self.source.name(),
                token
            )));
        }

        pairs.sort_by(|a, b| {
            let a = a.liquidity_usd().unwrap_or(0.0);
            let b = b.liquidity_usd().unwrap_or(0.0);
            b.total_cmp(&a)
        });

        tracing::info!("✓ Liquidity scan {}: {} pairs ({} skipped)", token, pairs.len(), skipped);

        Ok(LiquidityResult {
            pairs,
            skipped,
            scanned_at: chrono::Utc::now().timestamp(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::models::{Liquidity, Pair, TokenRef, Volume};
    use crate::sources::PairListing;
    use async_trait::async_trait;

    pub const TOKEN: &str = "0x2b591e99afe9f32eaa6214f7b7629768c40eeb39";

    pub struct FakePairs(pub Result<Vec<Pair>, u16>);

    #[async_trait]
    impl PairSource for FakePairs {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn fetch_pairs(
            &self,
            _: Address,
            _: &CancellationToken,
        ) -> Result<PairListing, FetchError> {
            match &self.0 {
                Ok(pairs) => Ok(PairListing { pairs: pairs.clone(), skipped: 0 }),
                Err(status) => Err(FetchError::Status { status: *status }),
            }
        }
    }

    pub fn pair(dex: &str, address: &str, liquidity: Option<f64>, volume: Option<f64>) -> Pair {
        Pair {
            chain_id: Some("pulsechain".into()),
            dex_id: dex.into(),
            pair_address: address.into(),
            base_token: TokenRef { address: None, name: None, symbol: "HEX".into() },
            quote_token: TokenRef { address: None, name: None, symbol: "WPLS".into() },
            price_usd: None,
            liquidity: Liquidity { usd: liquidity },
            volume: Volume { h24: volume },
            url: None,
        }
    }

    async fn scan(pairs: Result<Vec<Pair>, u16>) -> ScanResult<LiquidityResult> {
        LiquidityAggregator::new(Arc::new(FakePairs(pairs)))
            .scan(TOKEN, &CancellationToken::new())
            .await
    }

    #[tokio::test]
    async fn test_sorted_descending_and_invalid_dropped() {
        let result = scan(Ok(vec![
            pair("pulsex", "0xa", Some(100.0), None),
            pair("pulsex", "0xb", Some(500.0), None),
            pair("9mm", "0xc", Some(-5.0), None),
        ]))
        .await
        .unwrap();

        let usd: Vec<f64> = result.pairs.iter().map(|p| p.liquidity.usd.unwrap()).collect();
        assert_eq!(usd, vec![500.0, 100.0]);
        assert_eq!(result.skipped, 1);
    }

    #[tokio::test]
    async fn test_drops_missing_and_non_finite_liquidity() {
        let result = scan(Ok(vec![
            pair("a", "0x1", None, Some(10.0)),
            pair("b", "0x2", Some(f64::NAN), None),
            pair("c", "0x3", Some(0.0), None),
            pair("d", "0x4", Some(1.0), None),
        ]))
        .await
        .unwrap();
        assert_eq!(result.pairs.len(), 1);
        assert!(result.pairs.iter().all(|p| p.liquidity_usd().unwrap() > 0.0));
    }

    #[tokio::test]
    async fn test_no_valid_pairs_fails() {
        let err = scan(Ok(vec![pair("a", "0x1", Some(0.0), None)])).await.unwrap_err();
        assert!(matches!(err, ScanError::Empty(_)));
        assert!(err.is_upstream());

        let err = scan(Ok(vec![])).await.unwrap_err();
        assert!(matches!(err, ScanError::Empty(_)));
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates() {
        let err = scan(Err(500)).await.unwrap_err();
        assert!(matches!(err, ScanError::Upstream(FetchError::Status { status: 500 })));
    }

    #[tokio::test]
    async fn test_idempotent_scans() {
        let liquidity = LiquidityAggregator::new(Arc::new(FakePairs(Ok(vec![
            pair("pulsex", "0xa", Some(100.0), Some(1.0)),
            pair("9mm", "0xb", Some(250.0), None),
            pair("pulsex", "0xc", None, Some(3.0)),
        ]))));
        let cancel = CancellationToken::new();

        let mut first = liquidity.scan(TOKEN, &cancel).await.unwrap();
        let mut second = liquidity.scan(TOKEN, &cancel).await.unwrap();
        first.scanned_at = 0;
        second.scanned_at = 0;
        assert_eq!(first, second);
    }
}
