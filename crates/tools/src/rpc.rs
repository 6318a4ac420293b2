//! Ethereum JSON-RPC transport
//!
//! [`Transport`] is the seam between the deployer and the node; the HTTP
//! implementation speaks JSON-RPC 2.0 over `reqwest`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::DeployError;

/// Contract-creation transaction, signed by the node with `from`'s key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from: Address,
    pub data: Bytes,
    pub gas: U64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    #[serde(default)]
    pub contract_address: Option<Address>,
    /// `0x1` success, `0x0` reverted; absent on pre-Byzantium nodes
    #[serde(default)]
    pub status: Option<U64>,
    #[serde(default)]
    pub block_number: Option<U64>,
    #[serde(default)]
    pub gas_used: Option<U256>,
}

impl TransactionReceipt {
    pub fn reverted(&self) -> bool {
        self.status.is_some_and(|s| s.is_zero())
    }
}

/// Node operations the deployer relies on.
#[async_trait]
pub trait Transport: Send + Sync {
    /// `net_version`
    async fn net_version(&self) -> Result<String, DeployError>;

    /// `eth_accounts`
    async fn accounts(&self) -> Result<Vec<Address>, DeployError>;

    /// `eth_sendTransaction`, returning the transaction hash
    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<B256, DeployError>;

    /// `eth_getTransactionReceipt`; `None` while the transaction is pending
    async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, DeployError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn net_version(&self) -> Result<String, DeployError> {
        (**self).net_version().await
    }

    async fn accounts(&self) -> Result<Vec<Address>, DeployError> {
        (**self).accounts().await
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<B256, DeployError> {
        (**self).send_transaction(tx).await
    }

    async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, DeployError> {
        (**self).transaction_receipt(hash).await
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcRequest {
    jsonrpc: String,
    method: String,
    params: serde_json::Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

const SEND_TRANSACTION: &str = "eth_sendTransaction";

impl RpcResponse<serde_json::Value> {
    /// Split a raw response into its result. A node error object answering
    /// `eth_sendTransaction` is a rejected deployment; on any other method
    /// no transaction exists yet, so it is reported as `NodeError`.
    fn into_result<T: DeserializeOwned>(self, method: &str) -> Result<Option<T>, DeployError> {
        if let Some(error) = self.error {
            let mut message = format!("{} (code {})", error.message, error.code);
            if let Some(data) = error.data {
                message.push_str(&format!(": {}", data));
            }
            return Err(if method == SEND_TRANSACTION {
                DeployError::DeploymentRejected(message)
            } else {
                DeployError::NodeError {
                    method: method.to_string(),
                    message,
                }
            });
        }
        match self.result {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                DeployError::NodeUnreachable(format!("malformed {} result: {}", method, e))
            }),
        }
    }
}

/// JSON-RPC over HTTP
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(url: String, timeout: Duration) -> Result<Self, DeployError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeployError::NodeUnreachable(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call_optional<T>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Option<T>, DeployError>
    where
        T: DeserializeOwned,
    {
        let request = RpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };
        debug!(method, id = request.id, url = %self.url, "rpc call");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| DeployError::NodeUnreachable(format!("{}: {}", self.url, e)))?;

        let rpc_response: RpcResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| DeployError::NodeUnreachable(format!("malformed {} response: {}", method, e)))?;

        rpc_response.into_result(method)
    }

    async fn call<T>(&self, method: &str, params: serde_json::Value) -> Result<T, DeployError>
    where
        T: DeserializeOwned,
    {
        self.call_optional(method, params)
            .await?
            .ok_or_else(|| DeployError::NodeUnreachable(format!("empty {} response", method)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn net_version(&self) -> Result<String, DeployError> {
        self.call("net_version", json!([])).await
    }

    async fn accounts(&self) -> Result<Vec<Address>, DeployError> {
        self.call("eth_accounts", json!([])).await
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<B256, DeployError> {
        self.call(SEND_TRANSACTION, json!([tx])).await
    }

    async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, DeployError> {
        self.call_optional("eth_getTransactionReceipt", json!([hash]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(raw: &str) -> RpcResponse<serde_json::Value> {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_transaction_request_serialization() {
        let tx = TransactionRequest {
            from: "0xEDd693d95E33B65aE8914db2d6D88Fd7a2A5D9c2".parse().unwrap(),
            data: Bytes::from(vec![0x60, 0x80]),
            gas: U64::from(6_721_975u64),
            gas_price: Some(U256::from(20_000_000_000u64)),
        };
        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(
            value["from"].as_str().unwrap().to_lowercase(),
            "0xedd693d95e33b65ae8914db2d6d88fd7a2a5d9c2"
        );
        assert_eq!(value["data"], "0x6080");
        assert_eq!(value["gas"], "0x6691b7");
        assert_eq!(value["gasPrice"], "0x4a817c800");
    }

    #[test]
    fn test_gas_price_omitted_when_unset() {
        let tx = TransactionRequest {
            from: Address::repeat_byte(1),
            data: Bytes::new(),
            gas: U64::from(1u64),
            gas_price: None,
        };
        let value = serde_json::to_value(&tx).unwrap();
        assert!(value.get("gasPrice").is_none());
    }

    #[test]
    fn test_receipt_parsing() {
        let receipt: TransactionReceipt = serde_json::from_str(
            r#"{
                "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
                "contractAddress": "0x2222222222222222222222222222222222222222",
                "status": "0x1",
                "blockNumber": "0x10",
                "gasUsed": "0x5208",
                "logs": []
            }"#,
        )
        .unwrap();
        assert_eq!(receipt.contract_address, Some(Address::repeat_byte(0x22)));
        assert_eq!(receipt.block_number, Some(U64::from(16u64)));
        assert!(!receipt.reverted());
    }

    #[test]
    fn test_reverted_receipt() {
        let receipt: TransactionReceipt = serde_json::from_str(
            r#"{
                "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
                "contractAddress": null,
                "status": "0x0"
            }"#,
        )
        .unwrap();
        assert!(receipt.reverted());
        assert_eq!(receipt.contract_address, None);
    }

    #[test]
    fn test_error_response_is_rejection() {
        let result: Result<Option<B256>, _> = response(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"insufficient funds for gas * price + value"}}"#,
        )
        .into_result("eth_sendTransaction");
        match result {
            Err(DeployError::DeploymentRejected(msg)) => {
                assert!(msg.contains("insufficient funds"));
                assert!(msg.contains("-32000"));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_error_before_submission_is_node_error() {
        for method in ["net_version", "eth_accounts", "eth_getTransactionReceipt"] {
            let result: Result<Option<serde_json::Value>, _> = response(
                r#"{"jsonrpc":"2.0","id":3,"error":{"code":-32601,"message":"the method does not exist/is not available"}}"#,
            )
            .into_result(method);
            match result {
                Err(DeployError::NodeError { method: m, message }) => {
                    assert_eq!(m, method);
                    assert!(message.contains("-32601"));
                }
                other => panic!("{}: expected NodeError, got {:?}", method, other),
            }
        }
    }

    #[test]
    fn test_null_result_is_none() {
        let result: Option<TransactionReceipt> =
            response(r#"{"jsonrpc":"2.0","id":7,"result":null}"#)
                .into_result("eth_getTransactionReceipt")
                .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_malformed_result() {
        let result: Result<Option<Vec<Address>>, _> =
            response(r#"{"jsonrpc":"2.0","id":2,"result":"nope"}"#).into_result("eth_accounts");
        assert!(matches!(result, Err(DeployError::NodeUnreachable(_))));
    }

    #[tokio::test]
    async fn test_unreachable_node() {
        let transport =
            HttpTransport::new("http://127.0.0.1:1".to_string(), Duration::from_secs(2)).unwrap();
        assert!(matches!(
            transport.net_version().await,
            Err(DeployError::NodeUnreachable(_))
        ));
    }
}
