//! Synchronous JSON-RPC 2.0 client speaking the node's HTTP endpoint.
//!
//! One HTTP request per chain query. Transport failures, non-success
//! statuses and node-side error objects all surface as
//! [`Error::Chain`] naming the RPC method, nothing is retried here.

use kestrel_crypto::{hex_encode, AccountId32, Hash};
use kestrel_data_model::{BlockNumber, Weight};
use kestrel_logger::prelude::debug;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::{
    chain::{AccountInfo, ChainApi, RuntimeVersion},
    Error,
};

/// JSON-RPC client over HTTP.
#[derive(Debug, Clone)]
pub struct RpcClient {
    url: Url,
}

impl RpcClient {
    /// Client for a node RPC endpoint.
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: serde_json::Value,
    ) -> Result<T, Error> {
        debug!(url = %self.url, method, "chain query");
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        let response = attohttpc::post(self.url.as_str())
            .json(&request)
            .map_err(|err| Error::chain(method, err))?
            .send()
            .map_err(|err| Error::chain(method, err))?;
        if !response.is_success() {
            return Err(Error::chain(
                method,
                format!("HTTP status {}", response.status()),
            ));
        }

        let envelope: RpcResponse<T> = response.json().map_err(|err| Error::chain(method, err))?;
        match envelope {
            RpcResponse {
                error: Some(error), ..
            } => Err(Error::chain(
                method,
                format!("node error {}: {}", error.code, error.message),
            )),
            RpcResponse {
                result: Some(result),
                ..
            } => Ok(result),
            RpcResponse { .. } => Err(Error::chain(
                method,
                "node returned neither a result nor an error",
            )),
        }
    }
}

impl ChainApi for RpcClient {
    fn genesis_hash(&self) -> Result<Hash, Error> {
        self.call("chain_getBlockHash", json!([0]))
    }

    fn finalized_head(&self) -> Result<Hash, Error> {
        self.call("chain_getFinalizedHead", json!([]))
    }

    fn block_number(&self, hash: Hash) -> Result<BlockNumber, Error> {
        let header: Header =
            self.call("chain_getHeader", json!([hash.to_string()]))?;
        let digits = header.number.trim_start_matches("0x");
        BlockNumber::from_str_radix(digits, 16).map_err(|err| {
            Error::chain(
                "chain_getHeader",
                format!("bad block number `{}`: {err}", header.number),
            )
        })
    }

    fn metadata(&self, hash: Hash) -> Result<Vec<u8>, Error> {
        let metadata: String = self.call("state_getMetadata", json!([hash.to_string()]))?;
        kestrel_crypto::hex_decode(&metadata)
            .map_err(|err| Error::chain("state_getMetadata", err))
    }

    fn runtime_version(&self) -> Result<RuntimeVersion, Error> {
        self.call("state_getRuntimeVersion", json!([]))
    }

    fn account_info(&self, account: &AccountId32) -> Result<AccountInfo, Error> {
        self.call("system_account", json!([account.to_string()]))
    }

    fn estimate_weight(&self, call: &[u8]) -> Result<Weight, Error> {
        let info: PaymentInfo =
            self.call("payment_queryInfo", json!([hex_encode(call)]))?;
        Ok(info.weight)
    }

    fn submit_extrinsic(&self, extrinsic: &[u8]) -> Result<Hash, Error> {
        self.call("author_submitExtrinsic", json!([hex_encode(extrinsic)]))
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest {
    jsonrpc: &'static str,
    id: u32,
    method: &'static str,
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct Header {
    number: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentInfo {
    weight: Weight,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_to_jsonrpc_two() {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method: "chain_getBlockHash",
            params: json!([0]),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"jsonrpc": "2.0", "id": 1, "method": "chain_getBlockHash", "params": [0]})
        );
    }

    #[test]
    fn response_envelope_parses_result_or_error() {
        let ok: RpcResponse<u32> = serde_json::from_str(
            r#"{"jsonrpc": "2.0", "id": 1, "result": 7}"#,
        )
        .unwrap();
        assert_eq!(ok.result, Some(7));
        assert!(ok.error.is_none());

        let err: RpcResponse<u32> = serde_json::from_str(
            r#"{"jsonrpc": "2.0", "id": 1, "error": {"code": -32601, "message": "Method not found"}}"#,
        )
        .unwrap();
        assert!(err.result.is_none());
        let error = err.error.unwrap();
        assert_eq!(error.code, -32601);
        assert_eq!(error.message, "Method not found");

        // The payload type does not have to implement `Default` for a
        // missing `result` field to come out as `None`.
        let bare: RpcResponse<Header> = serde_json::from_str(
            r#"{"jsonrpc": "2.0", "id": 1, "error": {"code": -32000, "message": "busy"}}"#,
        )
        .unwrap();
        assert!(bare.result.is_none());
    }

    #[test]
    fn block_numbers_come_as_hex_strings() {
        let header: Header = serde_json::from_str(r#"{"number": "0x3e8", "extra": 1}"#).unwrap();
        assert_eq!(header.number, "0x3e8");
        assert_eq!(
            BlockNumber::from_str_radix(header.number.trim_start_matches("0x"), 16).unwrap(),
            1000
        );
    }

    #[test]
    fn payment_info_reads_the_weight_field() {
        let info: PaymentInfo = serde_json::from_str(
            r#"{"weight": 640000000, "class": "normal", "partialFee": "100"}"#,
        )
        .unwrap();
        assert_eq!(info.weight, 640_000_000);
    }
}
