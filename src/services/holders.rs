use alloy_primitives::{Address, U256};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::config::HoldersConfig;
use crate::error::{FetchError, ScanError, ScanResult};
use crate::models::units::{percentage, round2, to_f64, whole_units};
use crate::models::{Holder, HolderProgress, HolderResult};
use crate::sources::explorer::parse_holder_item;
use crate::sources::{ChainReader, HolderSource, PageCursor};

pub const DEFAULT_TARGET: usize = 200;
const TOP_N: usize = 10;

/// Pages through the explorer holder listing until the target count is reached,
/// converting balances against on-chain decimals and supply.
pub struct HolderAggregator {
    chain: Arc<dyn ChainReader>,
    source: Arc<dyn HolderSource>,
    target: usize,
    page_delay: Duration,
}

impl HolderAggregator {
    pub fn new(
        chain: Arc<dyn ChainReader>,
        source: Arc<dyn HolderSource>,
        config: &HoldersConfig,
    ) -> Self {
        Self {
            chain,
            source,
            target: config.target.max(1),
            page_delay: Duration::from_millis(config.page_delay_ms),
        }
    }

    pub fn target(&self) -> usize {
        self.target
    }

    /// Each processed holder item is reported on `progress` when given.
    pub async fn scan(
        &self,
        address: &str,
        progress: Option<&UnboundedSender<HolderProgress>>,
        cancel: &CancellationToken,
    ) -> ScanResult<HolderResult> {
        let token = Address::from_str(address.trim()).map_err(|_| {
            ScanError::validation("address", format!("'{}' is not a valid address", address))
        })?;

        let (decimals, supply_raw) = tokio::try_join!(
            self.chain.token_decimals(token, cancel),
            self.chain.token_total_supply(token, cancel),
        )?;
        let supply_whole = whole_units(supply_raw, decimals);
        let supply_f = to_f64(supply_whole);

        let mut holders: Vec<Holder> = Vec::new();
        let mut skipped = 0usize;
        let mut cursor: Option<PageCursor> = None;
        let mut page_no = 0usize;
        let mut last_error: Option<FetchError> = None;
        let mut known_total: Option<usize> = None;

        'pages: loop {
            page_no += 1;
            let page = match self.source.fetch_page(token, cursor.as_ref(), cancel).await {
                Ok(page) => page,
                Err(FetchError::Cancelled) => return Err(ScanError::Cancelled),
                Err(e) => {
                    // Retries are exhausted at this point; keep what we have.
                    tracing::warn!("Holder page {} failed for {}: {}", page_no, token, e);
                    last_error = Some(e);
                    break;
                }
            };

            // Later pages may omit the count; keep the last one reported.
            known_total = page.total_count.or(known_total);
            let progress_target = known_total
                .map(|total| total.min(self.target))
                .unwrap_or(self.target);

            tracing::debug!(
                "Holder page {}: {} items (have {}/{})",
                page_no,
                page.items.len(),
                holders.len(),
                self.target
            );

            for item in &page.items {
                let entry = match parse_holder_item(item) {
                    Ok(entry) => entry,
                    Err(reason) => {
                        tracing::warn!("Skipping holder item on page {}: {}", page_no, reason);
                        skipped += 1;
                        continue;
                    }
                };

                let balance = whole_units(entry.raw_balance, decimals);
                let pct = percentage(to_f64(balance), supply_f)
                    .map(|p| round2(p.clamp(0.0, 100.0)))
                    .unwrap_or(0.0);

                holders.push(Holder {
                    address: entry.address.to_checksum(None),
                    balance: balance.to_string(),
                    percentage: pct,
                    raw_balance: entry.raw_balance,
                });

                if let Some(tx) = progress {
                    let _ = tx.send(HolderProgress {
                        processed: holders.len(),
                        target: progress_target,
                    });
                }

                if holders.len() >= self.target {
                    break 'pages;
                }
            }

            if page.next_page_params.is_none() {
                break;
            }
            // An empty page or an unchanged cursor would repeat the same request forever.
            if page.items.is_empty() || page.next_page_params == cursor {
                tracing::warn!(
                    "Holder page {} made no progress; stopping at {} holders",
                    page_no,
                    holders.len()
                );
                break;
            }
            cursor = page.next_page_params;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ScanError::Cancelled),
                _ = tokio::time::sleep(self.page_delay) => {}
            }
        }

        if holders.is_empty() {
            return Err(match last_error {
                Some(e) => ScanError::Upstream(e),
                None => ScanError::Empty(format!("no holders returned for {}", token)),
            });
        }

        // Stable sort: upstream order is kept among equal balances.
        holders.sort_by(|a, b| b.raw_balance.cmp(&a.raw_balance));

        let top10: f64 = holders.iter().take(TOP_N).map(|h| h.percentage).sum();
        let result = HolderResult {
            total_holders: holders.len(),
            holders,
            total_supply: supply_whole.to_string(),
            top10_percentage: round2(top10.clamp(0.0, 100.0)),
            skipped,
            scanned_at: chrono::Utc::now().timestamp(),
        };

        tracing::info!(
            "✓ Holder scan {}: {} holders, top 10 hold {:.2}% ({} skipped)",
            token,
            result.total_holders,
            result.top10_percentage,
            result.skipped
        );
        Ok(result)
    }
}
