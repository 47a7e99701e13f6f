use alloy_primitives::Address;
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{ScanError, ScanResult};
use crate::models::units::round2;
use crate::models::{VolumeResult, VolumeShare};
use crate::sources::PairSource;

pub struct VolumeAggregator {
    source: Arc<dyn PairSource>,
}

impl VolumeAggregator {
    pub fn new(source: Arc<dyn PairSource>) -> Self {
        Self { source }
    }

    /// Pairs with positive 24h volume and their share of the total, busiest first.
    pub async fn scan(
        &self,
        address: &str,
        cancel: &CancellationToken,
    ) -> ScanResult<VolumeResult> {
        let token = Address::from_str(address.trim()).map_err(|_| {
            ScanError::validation("address", format!("'{}' is not a valid address", address))
        })?;

        let listing = self.source.fetch_pairs(token, cancel).await?;
        let mut skipped = listing.skipped;

        let mut traded: Vec<(f64, _)> = Vec::with_capacity(listing.pairs.len());
        for pair in listing.pairs {
            match pair.volume_h24() {
                Some(volume) => traded.push((volume, pair)),
                None => skipped += 1,
            }
        }

        if traded.is_empty() {
            return Err(ScanError::Empty(format!(
                "no 24h volume on {} for {}",
                self.source.name(),
                token
            )));
        }

        traded.sort_by(|a, b| b.0.total_cmp(&a.0));
        let total_volume: f64 = traded.iter().map(|(volume, _)| volume).sum();

        let pairs: Vec<VolumeShare> = traded
            .into_iter()
            .map(|(volume, pair)| VolumeShare {
                pair,
                percentage: round2(volume / total_volume * 100.0),
            })
            .collect();

        tracing::info!(
            "✓ Volume scan {}: ${:.2} across {} pairs ({} skipped)",
            token,
            total_volume,
            pairs.len(),
            skipped
        );

        Ok(VolumeResult {
            dex_count: pairs.len(),
            pairs,
            total_volume,
            skipped,
            scanned_at: chrono::Utc::now().timestamp(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::models::Pair;
    use crate::services::liquidity::tests::{pair, FakePairs, TOKEN};

    async fn scan(pairs: Result<Vec<Pair>, u16>) -> ScanResult<VolumeResult> {
        VolumeAggregator::new(Arc::new(FakePairs(pairs)))
            .scan(TOKEN, &CancellationToken::new())
            .await
    }

    #[tokio::test]
    async fn test_shares_of_total_volume() {
        let result = scan(Ok(vec![
            pair("pulsex", "0xa", Some(10.0), Some(300.0)),
            pair("pulsex", "0xb", None, Some(100.0)),
            pair("9mm", "0xc", Some(10.0), Some(0.0)),
        ]))
        .await
        .unwrap();

        assert_eq!(result.pairs.len(), 2);
        assert_eq!(result.total_volume, 400.0);
        assert_eq!(result.dex_count, 2);
        let shares: Vec<f64> = result.pairs.iter().map(|p| p.percentage).collect();
        assert_eq!(shares, vec![75.0, 25.0]);
        assert_eq!(result.skipped, 1);
    }

    #[tokio::test]
    async fn test_shares_sum_to_hundred() {
        let result = scan(Ok(vec![
            pair("a", "0x1", None, Some(1.0)),
            pair("b", "0x2", None, Some(1.0)),
            pair("c", "0x3", None, Some(1.0)),
            pair("d", "0x4", None, Some(7.77)),
        ]))
        .await
        .unwrap();
        let sum: f64 = result.pairs.iter().map(|p| p.percentage).sum();
        assert!((sum - 100.0).abs() < 0.5);
        assert!(result.pairs.windows(2).all(|w| w[0].percentage >= w[1].percentage));
    }

    #[tokio::test]
    async fn test_no_volume_fails() {
        let err = scan(Ok(vec![pair("a", "0x1", Some(5.0), None)])).await.unwrap_err();
        assert!(matches!(err, ScanError::Empty(_)));

        let err = scan(Err(429)).await.unwrap_err();
        assert!(matches!(err, ScanError::Upstream(FetchError::Status { status: 429 })));
    }

    #[tokio::test]
    async fn test_serialized_shape() {
        let result = scan(Ok(vec![pair("pulsex", "0xa", Some(10.0), Some(50.0))]))
            .await
            .unwrap();
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["totalVolume"], 50.0);
        assert_eq!(value["dexCount"], 1);
        assert_eq!(value["pairs"][0]["dexId"], "pulsex");
        assert_eq!(value["pairs"][0]["volume"]["h24"], 50.0);
        assert_eq!(value["pairs"][0]["percentage"], 100.0);
    }

    #[tokio::test]
    async fn test_idempotent_scans() {
        let volume = VolumeAggregator::new(Arc::new(FakePairs(Ok(vec![
            pair("pulsex", "0xa", Some(10.0), Some(300.0)),
            pair("9mm", "0xb", None, Some(100.0)),
            pair("pulsex", "0xc", Some(10.0), None),
        ]))));
        let cancel = CancellationToken::new();

        let mut first = volume.scan(TOKEN, &cancel).await.unwrap();
        let mut second = volume.scan(TOKEN, &cancel).await.unwrap();
        first.scanned_at = 0;
        second.scanned_at = 0;
        assert_eq!(first, second);
    }
}
