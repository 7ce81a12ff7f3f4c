//! Blake2b-256 hashing, the digest used for every hash on the Kestrel chain.

use core::{fmt, str::FromStr};

use blake2::{
    digest::{Update, VariableOutput},
    Blake2bVar,
};
use parity_scale_codec::{Decode, Encode};
use serde::Serialize;
use serde_with::DeserializeFromStr;

use crate::{error::ParseError, hex_decode};

/// A blake2b-256 digest. Block hashes, extrinsic hashes and multisig
/// call hashes are all values of this type.
///
/// Renders as `0x`-prefixed lowercase hex and parses the same form
/// back, with the prefix optional.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode, DeserializeFromStr)]
#[repr(transparent)]
pub struct Hash([u8; Self::LENGTH]);

impl Hash {
    /// Digest length in bytes.
    pub const LENGTH: usize = 32;

    /// Hash the given bytes.
    #[must_use]
    pub fn new(payload: impl AsRef<[u8]>) -> Self {
        let digest = Blake2bVar::new(Self::LENGTH)
            .expect("Failed to initialize variable size hash")
            .chain(payload.as_ref())
            .finalize_boxed();

        let mut bytes = [0; Self::LENGTH];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Adopt bytes that already are a blake2b-256 digest.
    #[must_use]
    pub const fn from_raw(bytes: [u8; Self::LENGTH]) -> Self {
        Self(bytes)
    }

    /// View the digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; Self::LENGTH] {
        &self.0
    }
}

impl From<Hash> for [u8; Hash::LENGTH] {
    #[inline]
    fn from(Hash(bytes): Hash) -> Self {
        bytes
    }
}

impl From<[u8; Hash::LENGTH]> for Hash {
    #[inline]
    fn from(bytes: [u8; Hash::LENGTH]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Hash {
    type Err = ParseError;

    fn from_str(hash: &str) -> Result<Self, Self::Err> {
        let bytes = hex_decode(hash)?;
        <[u8; Self::LENGTH]>::try_from(bytes.as_slice())
            .map(Self)
            .map_err(|_| {
                ParseError(format!(
                    "hash must be {} bytes of hex, got {}",
                    Self::LENGTH,
                    bytes.len()
                ))
            })
    }
}

impl Serialize for Hash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn blake2_32b() {
        let digest = Hash::new(hex!("6920616d2064617461"));
        assert_eq!(
            digest.as_bytes(),
            &hex!("ba67336efd6a3df3a70eeb757860763036785c182ff4cf587541a0068d09f5b2"),
        );
    }

    #[test]
    fn display_and_parse_round_trip() {
        let digest = Hash::new(b"kestrel");
        let text = digest.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text.len(), 2 + Hash::LENGTH * 2);
        assert_eq!(text.parse::<Hash>().unwrap(), digest);

        // The 0x prefix is optional on input.
        assert_eq!(
            text.trim_start_matches("0x").parse::<Hash>().unwrap(),
            digest
        );
    }

    #[test]
    fn rejects_wrong_length() {
        assert!("0xdead".parse::<Hash>().is_err());
        assert!("not hex at all".parse::<Hash>().is_err());
    }

    #[test]
    fn serde_is_hex_string() {
        let digest = Hash::new(b"serde");
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(json, format!("\"{digest}\""));
        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, digest);
    }
}
