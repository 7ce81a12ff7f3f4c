//! Construction of [`RuntimeCall`] values from command line arguments.
//!
//! Arguments arrive as a JSON object so that the CLI surface stays
//! uniform across calls. Multisig calls are not built here, they have
//! dedicated wrappers in [`crate::multisig`].

use kestrel_crypto::AccountId32;
use serde::Deserialize;

use crate::{
    call::{BalancesCall, MultiAddress, RuntimeCall, SystemCall},
    Balance, Error,
};

/// `pallet.method` pairs [`build_call`] accepts.
pub const SUPPORTED_CALLS: &[&str] = &[
    "system.remark",
    "balances.transfer",
    "balances.transfer_keep_alive",
    "balances.transfer_all",
];

/// Builds a call from its pallet name, method name and JSON arguments.
///
/// # Errors
///
/// [`Error::Input`] when the call is not supported or the arguments do
/// not fit its signature.
pub fn build_call(
    pallet: &str,
    method: &str,
    args: &serde_json::Value,
) -> Result<RuntimeCall, Error> {
    match (pallet, method) {
        ("system", "remark") => {
            let args: RemarkArgs = decode_args(args)?;
            Ok(SystemCall::Remark {
                remark: args.remark_bytes()?,
            }
            .into())
        }
        ("balances", "transfer") => {
            let args: TransferArgs = decode_args(args)?;
            Ok(BalancesCall::Transfer {
                dest: parse_dest(&args.dest)?,
                value: args.value.into_balance()?,
            }
            .into())
        }
        ("balances", "transfer_keep_alive") => {
            let args: TransferArgs = decode_args(args)?;
            Ok(BalancesCall::TransferKeepAlive {
                dest: parse_dest(&args.dest)?,
                value: args.value.into_balance()?,
            }
            .into())
        }
        ("balances", "transfer_all") => {
            let args: TransferAllArgs = decode_args(args)?;
            Ok(BalancesCall::TransferAll {
                dest: parse_dest(&args.dest)?,
                keep_alive: args.keep_alive,
            }
            .into())
        }
        _ => Err(Error::Input(format!(
            "unknown call `{pallet}.{method}`, supported calls are: {}",
            SUPPORTED_CALLS.join(", ")
        ))),
    }
}

fn decode_args<'de, T: Deserialize<'de>>(args: &'de serde_json::Value) -> Result<T, Error> {
    T::deserialize(args).map_err(|error| Error::Input(format!("bad call arguments: {error}")))
}

fn parse_dest(address: &str) -> Result<MultiAddress, Error> {
    let (id, _format) = AccountId32::from_ss58(address)?;
    Ok(MultiAddress::Id(id))
}

/// Balance argument, accepted either as a JSON number or as a decimal
/// string. Strings cover amounts beyond what JSON numbers hold exactly.
#[derive(Deserialize)]
#[serde(untagged)]
enum BalanceArg {
    Number(u64),
    Text(String),
}

impl BalanceArg {
    fn into_balance(self) -> Result<Balance, Error> {
        match self {
            Self::Number(value) => Ok(Balance::from(value)),
            Self::Text(text) => text
                .parse()
                .map_err(|_| Error::Input(format!("bad balance value `{text}`"))),
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RemarkArgs {
    remark: String,
}

impl RemarkArgs {
    fn remark_bytes(self) -> Result<Vec<u8>, Error> {
        if self.remark.starts_with("0x") {
            Ok(kestrel_crypto::hex_decode(&self.remark)?)
        } else {
            Ok(self.remark.into_bytes())
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct TransferArgs {
    dest: String,
    value: BalanceArg,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct TransferAllArgs {
    dest: String,
    keep_alive: bool,
}
