use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, HoldersConfig};
use crate::error::{ScanError, ScanResult};
use crate::fetcher::{RetryPolicy, RetryableFetcher};
use crate::services::{BurnAggregator, HolderAggregator, LiquidityAggregator, VolumeAggregator};
use crate::sources::{
    ChainReader, DexScreenerSource, ExplorerHolderSource, HolderSource, PairSource, RpcClient,
};

/// Explorer holder page size.
const HOLDER_PAGE_SIZE: usize = 50;

/// The four aggregators wired to one shared fetcher. Built once and passed to
/// whoever needs it; holds no per-scan state.
pub struct Scanner {
    pub burn: BurnAggregator,
    pub holders: HolderAggregator,
    pub liquidity: LiquidityAggregator,
    pub volume: VolumeAggregator,
    deadline: Duration,
    holder_deadline: Duration,
}

impl Scanner {
    pub fn from_config(config: &Config) -> ScanResult<Self> {
        let fetcher = Arc::new(
            RetryableFetcher::new(config.query.retry_policy()).map_err(ScanError::Upstream)?,
        );

        let chain: Arc<dyn ChainReader> =
            Arc::new(RpcClient::new(&config.rpc.endpoint, fetcher.clone()));
        let holders: Arc<dyn HolderSource> =
            Arc::new(ExplorerHolderSource::new(&config.explorer.api, fetcher.clone()));
        let pairs: Arc<dyn PairSource> = Arc::new(DexScreenerSource::new(&config.dex.api, fetcher));

        Self::with_sources(config, chain, holders, pairs)
    }

    /// Build from explicit upstreams, for tests and alternative backends.
    pub fn with_sources(
        config: &Config,
        chain: Arc<dyn ChainReader>,
        holder_source: Arc<dyn HolderSource>,
        pair_source: Arc<dyn PairSource>,
    ) -> ScanResult<Self> {
        let (deadline, holder_deadline) = deadlines(config.query.retry_policy(), &config.holders);

        Ok(Self {
            burn: BurnAggregator::from_config(chain.clone(), config)?,
            holders: HolderAggregator::new(chain, holder_source, &config.holders),
            liquidity: LiquidityAggregator::new(pair_source.clone()),
            volume: VolumeAggregator::new(pair_source),
            deadline,
            holder_deadline,
        })
    }

    /// Upper bound for a burn, liquidity or volume request.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Upper bound for a holder scan across every page.
    pub fn holder_deadline(&self) -> Duration {
        self.holder_deadline
    }
}

/// Request and holder-scan deadlines, saturating at `Duration::MAX`.
fn deadlines(policy: RetryPolicy, holders: &HoldersConfig) -> (Duration, Duration) {
    let per_call = policy
        .timeout
        .saturating_add(policy.delay)
        .saturating_mul(policy.attempts.max(1));
    let pages = u32::try_from(holders.target / HOLDER_PAGE_SIZE + 1).unwrap_or(u32::MAX);
    let per_page = per_call.saturating_add(Duration::from_millis(holders.page_delay_ms));

    // Identity reads and balance reads run as two concurrent rounds.
    let deadline = per_call.saturating_mul(2);
    let holder_deadline = per_call.saturating_add(per_page.saturating_mul(pages));
    (deadline, holder_deadline)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadlines_cover_retries_and_pages() {
        let policy = RetryPolicy {
            attempts: 3,
            delay: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
        };
        let holders = HoldersConfig { target: 200, page_delay_ms: 1_000 };

        let (deadline, holder_deadline) = deadlines(policy, &holders);
        assert_eq!(deadline, Duration::from_secs(186));
        // One supply round plus five pages.
        assert_eq!(holder_deadline, Duration::from_secs(93 + 94 * 5));
    }

    #[test]
    fn test_deadlines_saturate() {
        let policy = RetryPolicy {
            attempts: u32::MAX,
            delay: Duration::from_millis(u64::MAX),
            timeout: Duration::from_millis(u64::MAX),
        };
        let holders = HoldersConfig { target: usize::MAX, page_delay_ms: u64::MAX };

        assert_eq!(deadlines(policy, &holders), (Duration::MAX, Duration::MAX));
    }
}
