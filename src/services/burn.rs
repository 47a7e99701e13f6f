use alloy_primitives::{Address, U256};
use futures::future::join_all;
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, NativeConfig};
use crate::error::{FetchError, ScanError, ScanResult};
use crate::models::units::{format_units, percentage, to_f64};
use crate::models::{BurnRecord, BurnResult, TokenIdentity};
use crate::sources::ChainReader;

/// Which balance a scan reads at each burn address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Asset {
    Native,
    Token(Address),
}

/// Sums balances held at the configured burn addresses for the native coin or an ERC20.
pub struct BurnAggregator {
    chain: Arc<dyn ChainReader>,
    native: NativeConfig,
    burn_addresses: Vec<Address>,
}

impl BurnAggregator {
    pub fn new(
        chain: Arc<dyn ChainReader>,
        native: NativeConfig,
        burn_addresses: Vec<Address>,
    ) -> Self {
        Self {
            chain,
            native,
            burn_addresses,
        }
    }

    pub fn from_config(chain: Arc<dyn ChainReader>, config: &Config) -> ScanResult<Self> {
        let burn_addresses = config
            .burn
            .parsed()
            .map_err(|e| ScanError::validation("burn.addresses", e.to_string()))?;
        Ok(Self::new(chain, config.native.clone(), burn_addresses))
    }

    pub fn is_native(&self, name: &str) -> bool {
        name.trim().eq_ignore_ascii_case(&self.native.symbol)
    }

    pub async fn scan(
        &self,
        name: &str,
        address: Option<&str>,
        cancel: &CancellationToken,
    ) -> ScanResult<BurnResult> {
        let (asset, identity) = if self.is_native(name) {
            (Asset::Native, self.native_identity(cancel).await?)
        } else {
            let raw = address
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .ok_or_else(|| ScanError::validation("address", "required for contract tokens"))?;
            let token = Address::from_str(raw).map_err(|_| {
                ScanError::validation("address", format!("'{}' is not a valid address", raw))
            })?;
            (Asset::Token(token), self.token_identity(token, cancel).await?)
        };

        let decimals = identity.decimals_or_default();
        let balances = self.burn_balances(asset, cancel).await?;

        let mut total_raw = U256::ZERO;
        let mut burn_details = Vec::with_capacity(balances.len());
        for (address, balance) in self.burn_addresses.iter().zip(balances) {
            let unavailable = balance.is_none();
            let raw = balance.unwrap_or(U256::ZERO);
            total_raw = total_raw.saturating_add(raw);
            burn_details.push(BurnRecord {
                address: address.to_checksum(None),
                amount: format_units(raw, decimals),
                unavailable,
            });
        }

        // Both sides share the same decimals, so the ratio is taken on raw integers.
        let burn_percentage = identity
            .total_supply
            .and_then(|supply| percentage(to_f64(total_raw), to_f64(supply)))
            .map(|pct| format!("{:.2}", pct))
            .unwrap_or_else(|| "0.00".to_string());

        let result = BurnResult {
            name: identity.name_or_default().to_string(),
            symbol: identity.symbol_or_default().to_string(),
            decimals,
            total_supply: identity.supply_or_zero().to_string(),
            total_burned: format_units(total_raw, decimals),
            burn_percentage,
            burn_details,
            unavailable_fields: identity
                .unavailable_fields()
                .into_iter()
                .map(str::to_string)
                .collect(),
            scanned_at: chrono::Utc::now().timestamp(),
        };

        tracing::info!(
            "✓ Burn scan {}: {} burned ({}%) across {} addresses",
            result.symbol,
            result.total_burned,
            result.burn_percentage,
            result.burn_details.len()
        );
        Ok(result)
    }

    /// Native "supply" is the balance held at the first burn address, the reference
    /// figure the dashboard has always reported for the chain coin.
    async fn native_identity(&self, cancel: &CancellationToken) -> ScanResult<TokenIdentity> {
        let reference = self
            .burn_addresses
            .first()
            .copied()
            .ok_or_else(|| {
                ScanError::validation("burn.addresses", "no burn addresses configured")
            })?;
        let supply = self.chain.native_balance(reference, cancel).await?;

        Ok(TokenIdentity {
            name: Some(self.native.name.clone()),
            symbol: Some(self.native.symbol.clone()),
            decimals: Some(self.native.decimals),
            total_supply: Some(supply),
        })
    }

    /// Each field is read on its own; a failed read leaves that field unset.
    async fn token_identity(
        &self,
        token: Address,
        cancel: &CancellationToken,
    ) -> ScanResult<TokenIdentity> {
        let (name, symbol, decimals, total_supply) = tokio::join!(
            self.chain.token_name(token, cancel),
            self.chain.token_symbol(token, cancel),
            self.chain.token_decimals(token, cancel),
            self.chain.token_total_supply(token, cancel),
        );

        let identity = TokenIdentity {
            name: absorb("name", name)?,
            symbol: absorb("symbol", symbol)?,
            decimals: absorb("decimals", decimals)?,
            total_supply: absorb("totalSupply", total_supply)?,
        };

        if identity.is_empty() {
            return Err(ScanError::Empty(format!("no token metadata readable for {}", token)));
        }
        Ok(identity)
    }

    /// Balances in configured address order; `None` marks a failed read.
    async fn burn_balances(
        &self,
        asset: Asset,
        cancel: &CancellationToken,
    ) -> ScanResult<Vec<Option<U256>>> {
        let reads = self.burn_addresses.iter().map(|holder| async move {
            let result = match asset {
                Asset::Native => self.chain.native_balance(*holder, cancel).await,
                Asset::Token(token) => self.chain.token_balance_of(token, *holder, cancel).await,
            };
            (holder, result)
        });

        let mut balances = Vec::with_capacity(self.burn_addresses.len());
        for (holder, result) in join_all(reads).await {
            match result {
                Ok(balance) => balances.push(Some(balance)),
                Err(FetchError::Cancelled) => return Err(ScanError::Cancelled),
                Err(e) => {
                    tracing::warn!("Burn balance unavailable for {}: {}", holder, e);
                    balances.push(None);
                }
            }
        }
        Ok(balances)
    }
}

/// Turn a field read into an optional value, propagating only cancellation.
fn absorb<T>(field: &str, result: Result<T, FetchError>) -> ScanResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(FetchError::Cancelled) => Err(ScanError::Cancelled),
        Err(e) => {
            tracing::warn!("Token {} unavailable, using default: {}", field, e);
            Ok(None)
        }
    }
}
