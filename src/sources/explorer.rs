use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::{HolderPage, HolderSource, PageCursor};
use crate::error::FetchError;
use crate::fetcher::RetryableFetcher;

/// Block-explorer token holder listing (`{api}/tokens/{address}/holders`).
pub struct ExplorerHolderSource {
    api: String,
    fetcher: Arc<RetryableFetcher>,
}

#[derive(Debug, Deserialize)]
struct HolderPageResponse {
    items: Vec<Value>,
    #[serde(default)]
    next_page_params: Option<PageCursor>,
    #[serde(default)]
    total_count: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct HolderItem {
    address: HolderAddress,
    value: String,
}

#[derive(Debug, Deserialize)]
struct HolderAddress {
    hash: String,
}

/// A holder entry that decoded cleanly.
#[derive(Debug, Clone, PartialEq)]
pub struct HolderEntry {
    pub address: Address,
    pub raw_balance: U256,
}

/// Decode one listing item; the error describes why it was rejected.
pub fn parse_holder_item(item: &Value) -> Result<HolderEntry, String> {
    let item: HolderItem =
        serde_json::from_value(item.clone()).map_err(|e| format!("bad shape: {}", e))?;
    let address = Address::from_str(item.address.hash.trim())
        .map_err(|_| format!("bad address '{}'", item.address.hash))?;
    let raw_balance = U256::from_str_radix(item.value.trim(), 10)
        .map_err(|_| format!("bad balance '{}'", item.value))?;
    Ok(HolderEntry { address, raw_balance })
}

fn count_from(value: Option<Value>) -> Option<usize> {
    match value? {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

impl ExplorerHolderSource {
    pub fn new(api: impl Into<String>, fetcher: Arc<RetryableFetcher>) -> Self {
        Self {
            api: api.into(),
            fetcher,
        }
    }

    fn page_url(&self, token: Address, cursor: Option<&PageCursor>) -> Result<Url, FetchError> {
        let base = format!(
            "{}/tokens/{}/holders",
            self.api.trim_end_matches('/'),
            token.to_checksum(None)
        );
        let mut url = Url::parse(&base)
            .map_err(|e| FetchError::InvalidResponse(format!("bad explorer url: {}", e)))?;

        if let Some(params) = cursor.filter(|p| !p.is_empty()) {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                match value {
                    Value::Null => {}
                    Value::String(s) => {
                        query.append_pair(key, s);
                    }
                    other => {
                        query.append_pair(key, &other.to_string());
                    }
                }
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl HolderSource for ExplorerHolderSource {
    async fn fetch_page(
        &self,
        token: Address,
        cursor: Option<&PageCursor>,
        cancel: &CancellationToken,
    ) -> Result<HolderPage, FetchError> {
        let url = self.page_url(token, cursor)?;
        tracing::debug!("Fetching holder page {}", url);

        let resp: HolderPageResponse = self.fetcher.get_json(url.as_str(), cancel).await?;

        Ok(HolderPage {
            items: resp.items,
            next_page_params: resp.next_page_params.filter(|p| !p.is_empty()),
            total_count: count_from(resp.total_count),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::RetryPolicy;
    use serde_json::json;

    fn source() -> ExplorerHolderSource {
        let fetcher = Arc::new(RetryableFetcher::with_client(
            reqwest::Client::new(),
            RetryPolicy::default(),
        ));
        ExplorerHolderSource::new("https://scan.example.org/api/v2/", fetcher)
    }

    #[test]
    fn test_parse_holder_item() {
        let item = json!({
            "address": { "hash": "0x000000000000000000000000000000000000dead" },
            "value": "1000000000000000000",
            "token_id": null
        });
        let entry = parse_holder_item(&item).unwrap();
        assert_eq!(entry.raw_balance, U256::from(10u64.pow(18)));
    }

    #[test]
    fn test_parse_holder_item_rejects_malformed() {
        assert!(parse_holder_item(&json!({ "value": "1" })).is_err());
        assert!(parse_holder_item(&json!({
            "address": { "hash": "0x000000000000000000000000000000000000dead" },
            "value": "12.5"
        }))
        .is_err());
        assert!(parse_holder_item(&json!({
            "address": { "hash": "not-an-address" },
            "value": "1"
        }))
        .is_err());
    }

    #[test]
    fn test_page_url_echoes_cursor() {
        let token = Address::from_str("0x2b591e99afe9f32eaa6214f7b7629768c40eeb39").unwrap();
        let cursor: PageCursor = serde_json::from_value(json!({
            "items_count": 50,
            "value": "4200",
            "address_hash": "0xabc",
            "skipped": null
        }))
        .unwrap();

        let first = source().page_url(token, None).unwrap();
        assert_eq!(
            first.as_str(),
            concat!(
                "https://scan.example.org/api/v2/tokens/",
                "0x2b591e99afE9f32eAA6214f7B7629768c40Eeb39/holders"
            )
        );

        let next = source().page_url(token, Some(&cursor)).unwrap();
        let pairs: Vec<(String, String)> = next.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("items_count".into(), "50".into())));
        assert!(pairs.contains(&("value".into(), "4200".into())));
        assert!(pairs.iter().all(|(k, _)| k != "skipped"));
    }

    #[test]
    fn test_count_from_accepts_strings() {
        assert_eq!(count_from(Some(json!(110))), Some(110));
        assert_eq!(count_from(Some(json!("42"))), Some(42));
        assert_eq!(count_from(None), None);
    }
}
