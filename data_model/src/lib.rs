//! Data model of the Kestrel offline signing tools: runtime calls and
//! their SCALE encoding, extrinsic envelopes and signing payloads,
//! multisig lifecycle planning, the persisted transaction record files
//! and the offline verifier that consumes them.
//!
//! Everything here works without a chain connection. The one chain
//! snapshot a transaction needs is captured by `kestrel_client` and
//! carried inside the [`extrinsic::UnsignedTransaction`] envelope.

// The scale-codec derives cast enum discriminants in their expansion.
#![allow(trivial_numeric_casts)]

use core::{fmt, str::FromStr};

use serde_with::{DeserializeFromStr, SerializeDisplay};

pub mod call;
pub mod era;
mod error;
pub mod extrinsic;
pub mod multisig;
pub mod record;
pub mod registry;
pub mod signing;

pub use error::{Error, ErrorKind};

/// Balance in base token units, `u128` like the chain's.
pub type Balance = u128;
/// Account nonce. Travels compact-encoded in the signed extra.
pub type Nonce = u32;
/// Block number of the chain.
pub type BlockNumber = u32;
/// Transaction weight, a single dimension on this runtime.
pub type Weight = u64;

/// Byte string that renders as `0x`-prefixed lowercase hex in JSON
/// and accepts the same form back.
///
/// Call bytes, signing payloads and the captured runtime metadata all
/// travel through record files as values of this type.
#[derive(Clone, PartialEq, Eq, Default, DeserializeFromStr, SerializeDisplay)]
pub struct HexBytes(Vec<u8>);

impl HexBytes {
    /// View the raw bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Unwrap into the raw bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    /// Whether there are no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for HexBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<HexBytes> for Vec<u8> {
    fn from(HexBytes(bytes): HexBytes) -> Self {
        bytes
    }
}

impl AsRef<[u8]> for HexBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", kestrel_crypto::hex_encode(&self.0))
    }
}

impl fmt::Debug for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for HexBytes {
    type Err = kestrel_crypto::error::ParseError;

    fn from_str(payload: &str) -> Result<Self, Self::Err> {
        kestrel_crypto::hex_decode(payload).map(Self)
    }
}
