pub mod abi;
pub mod dexscreener;
pub mod explorer;
pub mod rpc;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;
use crate::models::Pair;

pub use dexscreener::DexScreenerSource;
pub use explorer::ExplorerHolderSource;
pub use rpc::RpcClient;

/// Read access to chain state. Implementations retry internally.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn native_balance(&self, holder: Address, cancel: &CancellationToken)
        -> Result<U256, FetchError>;

    async fn token_name(&self, token: Address, cancel: &CancellationToken)
        -> Result<String, FetchError>;

    async fn token_symbol(&self, token: Address, cancel: &CancellationToken)
        -> Result<String, FetchError>;

    async fn token_decimals(&self, token: Address, cancel: &CancellationToken)
        -> Result<u8, FetchError>;

    async fn token_total_supply(&self, token: Address, cancel: &CancellationToken)
        -> Result<U256, FetchError>;

    async fn token_balance_of(
        &self,
        token: Address,
        holder: Address,
        cancel: &CancellationToken,
    ) -> Result<U256, FetchError>;
}

/// Opaque pagination parameters echoed back to the holder listing.
pub type PageCursor = Map<String, Value>;

#[derive(Debug, Clone, Default)]
pub struct HolderPage {
    /// Items as received; validated one by one by the caller.
    pub items: Vec<Value>,
    pub next_page_params: Option<PageCursor>,
    pub total_count: Option<usize>,
}

#[async_trait]
pub trait HolderSource: Send + Sync {
    async fn fetch_page(
        &self,
        token: Address,
        cursor: Option<&PageCursor>,
        cancel: &CancellationToken,
    ) -> Result<HolderPage, FetchError>;
}

/// Pairs that passed structural validation, plus how many were dropped.
#[derive(Debug, Clone, Default)]
pub struct PairListing {
    pub pairs: Vec<Pair>,
    pub skipped: usize,
}

#[async_trait]
pub trait PairSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_pairs(
        &self,
        token: Address,
        cancel: &CancellationToken,
    ) -> Result<PairListing, FetchError>;
}
