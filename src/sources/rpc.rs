use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::abi::{self, IERC20};
use super::ChainReader;
use crate::error::FetchError;
use crate::fetcher::RetryableFetcher;

/// JSON-RPC node client. Every call goes through the shared fetcher.
pub struct RpcClient {
    endpoint: String,
    fetcher: Arc<RetryableFetcher>,
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl RpcClient {
    pub fn new(endpoint: impl Into<String>, fetcher: Arc<RetryableFetcher>) -> Self {
        Self {
            endpoint: endpoint.into(),
            fetcher,
        }
    }

    async fn call(
        &self,
        method: &str,
        params: Value,
        cancel: &CancellationToken,
    ) -> Result<String, FetchError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };
        // A JSON-RPC error reply counts as a failed attempt.
        self.fetcher
            .retry(method, cancel, || async {
                let resp: RpcResponse =
                    self.fetcher.post_json_once(&self.endpoint, &request).await?;
                unwrap_response(resp)
            })
            .await
    }

    async fn eth_call(
        &self,
        to: Address,
        data: String,
        cancel: &CancellationToken,
    ) -> Result<String, FetchError> {
        let params = json!([{ "to": to.to_checksum(None), "data": data }, "latest"]);
        self.call("eth_call", params, cancel).await
    }
}

fn unwrap_response(resp: RpcResponse) -> Result<String, FetchError> {
    if let Some(err) = resp.error {
        return Err(FetchError::Rpc {
            code: err.code,
            message: err.message,
        });
    }
    resp.result
        .ok_or_else(|| FetchError::InvalidResponse("rpc reply without result".into()))
}

#[async_trait]
impl ChainReader for RpcClient {
    async fn native_balance(
        &self,
        holder: Address,
        cancel: &CancellationToken,
    ) -> Result<U256, FetchError> {
        let params = json!([holder.to_checksum(None), "latest"]);
        let raw = self.call("eth_getBalance", params, cancel).await?;
        abi::decode_quantity(&raw)
    }

    async fn token_name(
        &self,
        token: Address,
        cancel: &CancellationToken,
    ) -> Result<String, FetchError> {
        let data = abi::encode(&IERC20::nameCall {});
        let raw = self.eth_call(token, data, cancel).await?;
        abi::decode_string(&raw)
    }

    async fn token_symbol(
        &self,
        token: Address,
        cancel: &CancellationToken,
    ) -> Result<String, FetchError> {
        let data = abi::encode(&IERC20::symbolCall {});
        let raw = self.eth_call(token, data, cancel).await?;
        abi::decode_string(&raw)
    }

    async fn token_decimals(
        &self,
        token: Address,
        cancel: &CancellationToken,
    ) -> Result<u8, FetchError> {
        let data = abi::encode(&IERC20::decimalsCall {});
        let raw = self.eth_call(token, data, cancel).await?;
        abi::decode_u8(&raw)
    }

    async fn token_total_supply(
        &self,
        token: Address,
        cancel: &CancellationToken,
    ) -> Result<U256, FetchError> {
        let data = abi::encode(&IERC20::totalSupplyCall {});
        let raw = self.eth_call(token, data, cancel).await?;
        abi::decode_uint(&raw)
    }

    async fn token_balance_of(
        &self,
        token: Address,
        holder: Address,
        cancel: &CancellationToken,
    ) -> Result<U256, FetchError> {
        let raw = self.eth_call(token, abi::encode_balance_of(holder), cancel).await?;
        abi::decode_uint(&raw)
    }
}
