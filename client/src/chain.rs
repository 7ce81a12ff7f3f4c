//! The chain-query collaborator the rest of the client is written
//! against.
//!
//! Production code talks to a node through [`crate::RpcClient`]; tests
//! substitute an in-memory double. The trait is object safe so command
//! handlers can hold a `&dyn ChainApi`.

use kestrel_crypto::{AccountId32, Hash};
use kestrel_data_model::{Balance, BlockNumber, Nonce, Weight};

use crate::Error;

/// Runtime version facts a signature commits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeVersion {
    /// Version of the runtime specification.
    pub spec_version: u32,
    /// Version of the transaction format.
    pub transaction_version: u32,
}

/// On-chain state of an account, as far as this client cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    /// Next free nonce of the account.
    pub nonce: Nonce,
    /// Spendable balance, in base units.
    #[serde(with = "free_balance")]
    pub free: Balance,
}

/// One chain query per method, no retry, no caching. A failure of any
/// of these is fatal for the invocation that issued it.
pub trait ChainApi {
    /// Hash of block zero.
    ///
    /// # Errors
    /// [`Error::Chain`] when the query fails.
    fn genesis_hash(&self) -> Result<Hash, Error>;

    /// Hash of the latest finalized block.
    ///
    /// # Errors
    /// [`Error::Chain`] when the query fails.
    fn finalized_head(&self) -> Result<Hash, Error>;

    /// Number of the block with the given hash.
    ///
    /// # Errors
    /// [`Error::Chain`] when the query fails or the block is unknown.
    fn block_number(&self, hash: Hash) -> Result<BlockNumber, Error>;

    /// Raw runtime metadata at the given block.
    ///
    /// # Errors
    /// [`Error::Chain`] when the query fails.
    fn metadata(&self, hash: Hash) -> Result<Vec<u8>, Error>;

    /// Current runtime version.
    ///
    /// # Errors
    /// [`Error::Chain`] when the query fails.
    fn runtime_version(&self) -> Result<RuntimeVersion, Error>;

    /// Nonce and free balance of an account.
    ///
    /// # Errors
    /// [`Error::Chain`] when the query fails.
    fn account_info(&self, account: &AccountId32) -> Result<AccountInfo, Error>;

    /// Estimated dispatch weight of an encoded call.
    ///
    /// # Errors
    /// [`Error::Chain`] when the query fails.
    fn estimate_weight(&self, call: &[u8]) -> Result<Weight, Error>;

    /// Submit a signed extrinsic, returning the hash the node reports.
    ///
    /// # Errors
    /// [`Error::Chain`] when the node rejects the extrinsic or the
    /// query fails.
    fn submit_extrinsic(&self, extrinsic: &[u8]) -> Result<Hash, Error>;
}

mod free_balance {
    //! Free balances arrive as JSON numbers or as decimal/hex strings
    //! depending on node version.

    use serde::{de, Deserializer};

    use super::Balance;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Balance, D::Error> {
        struct FreeVisitor;

        impl de::Visitor<'_> for FreeVisitor {
            type Value = Balance;

            fn expecting(&self, formatter: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                formatter.write_str("a balance as an integer or a decimal/hex string")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
                Ok(Balance::from(value))
            }

            fn visit_u128<E: de::Error>(self, value: u128) -> Result<Self::Value, E> {
                Ok(value)
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                if let Some(hex) = value.strip_prefix("0x") {
                    Balance::from_str_radix(hex, 16).map_err(de::Error::custom)
                } else {
                    value.parse().map_err(de::Error::custom)
                }
            }
        }

        deserializer.deserialize_any(FreeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_info_parses_number_and_string_balances() {
        let info: AccountInfo =
            serde_json::from_str(r#"{"nonce": 3, "free": 1500}"#).unwrap();
        assert_eq!(info.nonce, 3);
        assert_eq!(info.free, 1500);

        let info: AccountInfo =
            serde_json::from_str(r#"{"nonce": 0, "free": "340282366920938463463374607431768211455"}"#)
                .unwrap();
        assert_eq!(info.free, u128::MAX);

        let info: AccountInfo = serde_json::from_str(r#"{"nonce": 0, "free": "0x64"}"#).unwrap();
        assert_eq!(info.free, 100);
    }

    #[test]
    fn runtime_version_parses_camel_case() {
        let version: RuntimeVersion =
            serde_json::from_str(r#"{"specVersion": 268, "transactionVersion": 2, "specName": "kestrel"}"#)
                .unwrap();
        assert_eq!(version.spec_version, 268);
        assert_eq!(version.transaction_version, 2);
    }
}
