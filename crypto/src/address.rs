//! Account identifiers and their SS58 text encoding.
//!
//! Kestrel registered SS58 network format `73`, which occupies the
//! two-byte prefix range, so both the one-byte and two-byte prefix
//! layouts are implemented here.

use core::{fmt, str::FromStr};

use blake2::{Blake2b512, Digest};
use parity_scale_codec::{Decode, Encode};
use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::error::ParseError;

/// Checksum preamble mandated by the SS58 registry.
const SS58_PREFIX: &[u8] = b"SS58PRE";
/// Bytes of the blake2b-512 digest appended as checksum.
const CHECKSUM_LENGTH: usize = 2;

/// A validated SS58 network format. The registry reserves 14 bits,
/// anything above [`Self::MAX`] is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Ss58Format(u16);

impl Ss58Format {
    /// Format registered for the Kestrel chain.
    pub const KESTREL: Self = Self(73);
    /// Format used by generic Substrate development chains.
    pub const SUBSTRATE: Self = Self(42);
    /// Highest format the SS58 prefix layout can carry.
    pub const MAX: u16 = 0x3FFF;

    /// Validate a raw registry number.
    ///
    /// # Errors
    /// Fails if `value` exceeds the 14-bit registry range.
    pub fn new(value: u16) -> Result<Self, ParseError> {
        if value > Self::MAX {
            return Err(ParseError(format!(
                "SS58 format must be at most {}, got {value}",
                Self::MAX
            )));
        }
        Ok(Self(value))
    }

    /// The raw registry number.
    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }
}

impl Default for Ss58Format {
    fn default() -> Self {
        Self::KESTREL
    }
}

impl TryFrom<u16> for Ss58Format {
    type Error = ParseError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Ss58Format> for u16 {
    fn from(format: Ss58Format) -> Self {
        format.0
    }
}

impl fmt::Display for Ss58Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Ss58Format {
    type Err = ParseError;

    fn from_str(format: &str) -> Result<Self, Self::Err> {
        let value: u16 = format
            .parse()
            .map_err(|_| ParseError(format!("`{format}` is not an SS58 format number")))?;
        Self::new(value)
    }
}

/// Raw 32-byte account identifier.
///
/// For ed25519 keys this is the public key itself, for ecdsa keys the
/// blake2b-256 digest of the compressed public key, and for multisig
/// accounts the digest derived in [`crate::multisig`]. Displays as the
/// SS58 address under the Kestrel format.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Encode,
    Decode,
    DeserializeFromStr,
    SerializeDisplay,
)]
pub struct AccountId32([u8; Self::LENGTH]);

impl AccountId32 {
    /// Length of the identifier in bytes.
    pub const LENGTH: usize = 32;

    /// Adopt raw identifier bytes.
    #[must_use]
    pub const fn new(bytes: [u8; Self::LENGTH]) -> Self {
        Self(bytes)
    }

    /// View the identifier bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; Self::LENGTH] {
        &self.0
    }

    /// Render the SS58 address of this account under `format`.
    // Truncating casts are masked by construction.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn to_ss58(&self, format: Ss58Format) -> String {
        let mut data = match format.value() {
            0..=63 => vec![format.value() as u8],
            value => {
                // Two-byte layout: six low bits of the format shifted
                // into the 0b01xx_xxxx marker byte, the rest following.
                let first = ((value & 0b0000_0000_1111_1100) >> 2) as u8 | 0b0100_0000;
                let second = (value >> 8) as u8 | ((value & 0b11) as u8) << 6;
                vec![first, second]
            }
        };
        data.extend_from_slice(&self.0);
        data.extend_from_slice(&ss58_checksum(&data));
        bs58::encode(data).into_string()
    }

    /// Parse an SS58 address, returning the account and the network
    /// format it was encoded under.
    ///
    /// # Errors
    /// Fails on invalid base58, an unknown prefix layout, a wrong
    /// payload length or a checksum mismatch.
    pub fn from_ss58(address: &str) -> Result<(Self, Ss58Format), ParseError> {
        let data = bs58::decode(address)
            .into_vec()
            .map_err(|err| ParseError(format!("invalid base58 in SS58 address: {err}")))?;
        if data.len() < 2 {
            return Err(ParseError("SS58 address is too short".to_owned()));
        }

        let (format, prefix_length) = match data[0] {
            0..=63 => (u16::from(data[0]), 1),
            64..=127 => {
                let lower = (data[0] << 2) | (data[1] >> 6);
                let upper = data[1] & 0b0011_1111;
                (u16::from(lower) | (u16::from(upper) << 8), 2)
            }
            prefix => {
                return Err(ParseError(format!(
                    "invalid SS58 prefix byte 0x{prefix:02x}"
                )))
            }
        };

        let expected_length = prefix_length + Self::LENGTH + CHECKSUM_LENGTH;
        if data.len() != expected_length {
            return Err(ParseError(format!(
                "SS58 address must decode to {expected_length} bytes, got {}",
                data.len()
            )));
        }

        let body_end = prefix_length + Self::LENGTH;
        let checksum = ss58_checksum(&data[..body_end]);
        if data[body_end..] != checksum {
            return Err(ParseError("SS58 checksum mismatch".to_owned()));
        }

        let mut bytes = [0; Self::LENGTH];
        bytes.copy_from_slice(&data[prefix_length..body_end]);
        Ok((Self(bytes), Ss58Format(format)))
    }
}

impl From<[u8; AccountId32::LENGTH]> for AccountId32 {
    fn from(bytes: [u8; AccountId32::LENGTH]) -> Self {
        Self(bytes)
    }
}

impl From<AccountId32> for [u8; AccountId32::LENGTH] {
    fn from(AccountId32(bytes): AccountId32) -> Self {
        bytes
    }
}

impl AsRef<[u8]> for AccountId32 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for AccountId32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_ss58(Ss58Format::KESTREL))
    }
}

impl fmt::Debug for AccountId32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for AccountId32 {
    type Err = ParseError;

    fn from_str(address: &str) -> Result<Self, Self::Err> {
        Self::from_ss58(address).map(|(account, _)| account)
    }
}

/// First [`CHECKSUM_LENGTH`] bytes of `blake2b-512(SS58PRE ++ data)`.
fn ss58_checksum(data: &[u8]) -> [u8; CHECKSUM_LENGTH] {
    let mut hasher = Blake2b512::new();
    hasher.update(SS58_PREFIX);
    hasher.update(data);
    let digest = hasher.finalize();

    let mut checksum = [0; CHECKSUM_LENGTH];
    checksum.copy_from_slice(&digest[..CHECKSUM_LENGTH]);
    checksum
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use proptest::prelude::*;

    use super::*;

    // Well-known Substrate development account under format 42.
    const ALICE: [u8; 32] = hex!("d43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d");

    #[test]
    fn encodes_single_byte_prefix() {
        let account = AccountId32::new(ALICE);
        assert_eq!(
            account.to_ss58(Ss58Format::SUBSTRATE),
            "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY"
        );
    }

    #[test]
    fn decodes_single_byte_prefix() {
        let (account, format) =
            AccountId32::from_ss58("5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY").unwrap();
        assert_eq!(account.as_bytes(), &ALICE);
        assert_eq!(format, Ss58Format::SUBSTRATE);
    }

    #[test]
    fn two_byte_prefix_round_trip() {
        let account = AccountId32::new(ALICE);
        let address = account.to_ss58(Ss58Format::KESTREL);
        let (decoded, format) = AccountId32::from_ss58(&address).unwrap();
        assert_eq!(decoded, account);
        assert_eq!(format, Ss58Format::KESTREL);
    }

    #[test]
    fn display_uses_kestrel_format() {
        let account = AccountId32::new(ALICE);
        assert_eq!(account.to_string(), account.to_ss58(Ss58Format::KESTREL));
        assert_eq!(account.to_string().parse::<AccountId32>().unwrap(), account);
    }

    #[test]
    fn rejects_corrupted_checksum() {
        let mut address = AccountId32::new(ALICE)
            .to_ss58(Ss58Format::KESTREL)
            .into_bytes();
        let last = address.last_mut().unwrap();
        *last = if *last == b'2' { b'3' } else { b'2' };
        let address = String::from_utf8(address).unwrap();
        assert!(AccountId32::from_ss58(&address).is_err());
    }

    #[test]
    fn rejects_format_above_registry_range() {
        assert!(Ss58Format::new(0x3FFF).is_ok());
        assert!(Ss58Format::new(0x4000).is_err());
    }

    #[test]
    fn format_parses_from_str() {
        assert_eq!("73".parse::<Ss58Format>().unwrap(), Ss58Format::KESTREL);
        assert!("alpha".parse::<Ss58Format>().is_err());
        assert!("70000".parse::<Ss58Format>().is_err());
    }

    proptest! {
        #[test]
        fn any_format_round_trips(
            bytes in prop::array::uniform32(any::<u8>()),
            raw in 0_u16..=Ss58Format::MAX,
        ) {
            let format = Ss58Format::new(raw).unwrap();
            let account = AccountId32::new(bytes);
            let (decoded, decoded_format) =
                AccountId32::from_ss58(&account.to_ss58(format)).unwrap();
            prop_assert_eq!(decoded, account);
            prop_assert_eq!(decoded_format, format);
        }
    }
}
