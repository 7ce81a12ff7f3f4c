//! Record files that carry a transaction between machines.
//!
//! The construct step, which has chain access, writes a
//! [`TransactionRecord`]. The sign step, which has the private key,
//! reads it back, verifies it and writes a
//! [`SignedTransactionOutput`]. Both are plain JSON with strict
//! parsing, an unknown field is an error rather than silent data loss.

use std::{fs, path::Path};

use kestrel_crypto::Hash;
use parity_scale_codec::Encode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    call::OpaqueCall, extrinsic::UnsignedTransaction, signing::SigningIntent, Error, HexBytes,
};

/// The call an envelope dispatches, next to its hash.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct TxData {
    /// SCALE encoded call, identical to the envelope's method bytes.
    pub call: HexBytes,
    /// Hash of the call bytes. Tools that only approve by hash may
    /// omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_hash: Option<Hash>,
}

/// The inner call a multisig operation wraps, next to its hash.
///
/// This is what the signer cross-checks against the call-hash argument
/// decoded from the signing payload before a key touches anything.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct MultisigTxData {
    /// SCALE encoded inner call.
    pub call: HexBytes,
    /// Hash of the inner call bytes.
    pub call_hash: Hash,
}

impl MultisigTxData {
    /// Record a wrapped call together with its freshly computed hash.
    pub fn new(call: &OpaqueCall) -> Self {
        Self {
            call: HexBytes::from(call.as_bytes().to_vec()),
            call_hash: call.hash(),
        }
    }
}

/// Everything the offline signer needs, produced by the construct step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct TransactionRecord {
    /// The unsigned envelope with its chain snapshot.
    pub unsigned: UnsignedTransaction,
    /// SCALE encoding of the signing payload derived from `unsigned`.
    pub signing_payload: HexBytes,
    /// The envelope's call and its hash.
    pub tx_data: TxData,
    /// The wrapped inner call, present only for multisig envelopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multisig_tx_data: Option<MultisigTxData>,
}

impl TransactionRecord {
    /// Assemble a record for an envelope, deriving the signing payload
    /// and the call hash from the envelope itself.
    ///
    /// # Errors
    ///
    /// Whatever [`UnsignedTransaction::signing_payload`] reports about
    /// a malformed envelope.
    pub fn for_envelope(
        unsigned: UnsignedTransaction,
        multisig_tx_data: Option<MultisigTxData>,
    ) -> Result<Self, Error> {
        let signing_payload = HexBytes::from(unsigned.signing_payload()?.encode());
        let tx_data = TxData {
            call: unsigned.method.clone(),
            call_hash: Some(Hash::new(unsigned.method.as_slice())),
        };
        Ok(Self {
            unsigned,
            signing_payload,
            tx_data,
            multisig_tx_data,
        })
    }

    /// Read a record from a JSON file.
    ///
    /// # Errors
    ///
    /// [`Error::Fs`] when the file cannot be read, [`Error::Json`]
    /// when it does not parse as a record.
    pub fn load(path: &Path) -> Result<Self, Error> {
        read_json(path)
    }

    /// Write the record to a JSON file, pretty printed.
    ///
    /// # Errors
    ///
    /// [`Error::Fs`] when the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        write_json(path, self)
    }
}

/// Product of the sign step: the wire-ready extrinsic together with
/// everything the operator saw when approving it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SignedTransactionOutput {
    /// The full signed extrinsic, ready for submission.
    pub signed_tx: HexBytes,
    /// Raw signature bytes, without the scheme tag.
    pub signature: HexBytes,
    /// The envelope that was signed.
    pub unsigned_transaction: UnsignedTransaction,
    /// The payload the signature covers.
    pub signing_payload: HexBytes,
    /// Decoded summary shown to the operator before signing.
    pub tx_info: SigningIntent,
    /// Hash the chain will report for the extrinsic.
    pub tx_hash: Hash,
}

impl SignedTransactionOutput {
    /// Read a signed output from a JSON file.
    ///
    /// # Errors
    ///
    /// [`Error::Fs`] when the file cannot be read, [`Error::Json`]
    /// when it does not parse.
    pub fn load(path: &Path) -> Result<Self, Error> {
        read_json(path)
    }

    /// Write the signed output to a JSON file, pretty printed.
    ///
    /// # Errors
    ///
    /// [`Error::Fs`] when the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        write_json(path, self)
    }
}

/// Read any JSON value from a file, strict to the target type.
///
/// # Errors
///
/// [`Error::Fs`] on I/O failure, [`Error::Json`] on parse failure.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Error> {
    let content = fs::read_to_string(path).map_err(|source| Error::Fs {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Write any serializable value to a file as pretty JSON.
///
/// # Errors
///
/// [`Error::Fs`] on I/O failure.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Error> {
    let mut rendered = serde_json::to_string_pretty(value)?;
    rendered.push('\n');
    fs::write(path, rendered).map_err(|source| Error::Fs {
        path: path.display().to_string(),
        source,
    })
}
