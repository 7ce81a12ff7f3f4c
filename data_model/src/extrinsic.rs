//! Version 4 extrinsics: the unsigned envelope, the signing payload
//! and the fully signed wire format.

use kestrel_crypto::{Algorithm, Hash};
use parity_scale_codec::{Compact, Decode, DecodeAll, Encode, Input};
use serde::{Deserialize, Serialize};

use crate::{
    call::{MultiAddress, RuntimeCall},
    era::Era,
    Balance, BlockNumber, Error, HexBytes, Nonce,
};

/// Extrinsic format version this client builds and accepts.
pub const EXTRINSIC_FORMAT_VERSION: u8 = 4;
/// Top bit of the leading version byte, set when the extrinsic carries
/// a signature.
pub const SIGNED_MASK: u8 = 0b1000_0000;
/// Longest signing payload that is signed as is. Anything longer is
/// blake2 hashed first and the 32-byte hash is signed instead.
pub const PAYLOAD_HASH_THRESHOLD: usize = 256;

/// Signed extensions of the runtime, in declaration order.
///
/// The envelope records this list so a verifier can refuse to sign
/// against a runtime whose extra data it would compute differently.
pub const SIGNED_EXTENSIONS: [&str; 8] = [
    "CheckNonZeroSender",
    "CheckSpecVersion",
    "CheckTxVersion",
    "CheckGenesis",
    "CheckEra",
    "CheckNonce",
    "CheckWeight",
    "ChargeTransactionPayment",
];

/// Signature in any scheme the chain accepts.
#[derive(Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum MultiSignature {
    /// 64-byte ed25519 signature.
    #[codec(index = 0)]
    Ed25519([u8; 64]),
    /// 65-byte recoverable ecdsa signature over the blake2 digest.
    #[codec(index = 2)]
    Ecdsa([u8; 65]),
}

impl MultiSignature {
    /// Wraps raw signature bytes produced under `algorithm`.
    ///
    /// # Errors
    ///
    /// [`Error::Input`] when the byte count does not fit the scheme.
    pub fn from_parts(algorithm: Algorithm, bytes: &[u8]) -> Result<Self, Error> {
        match algorithm {
            Algorithm::Ed25519 => bytes.try_into().map(Self::Ed25519).map_err(|_| {
                Error::Input(format!(
                    "an ed25519 signature is 64 bytes, got {}",
                    bytes.len()
                ))
            }),
            Algorithm::Ecdsa => bytes.try_into().map(Self::Ecdsa).map_err(|_| {
                Error::Input(format!(
                    "an ecdsa signature is 65 bytes, got {}",
                    bytes.len()
                ))
            }),
        }
    }

    /// Raw signature bytes, without the scheme tag.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Ed25519(bytes) => bytes,
            Self::Ecdsa(bytes) => bytes,
        }
    }

    /// Scheme this signature was produced under.
    pub const fn algorithm(self) -> Algorithm {
        match self {
            Self::Ed25519(_) => Algorithm::Ed25519,
            Self::Ecdsa(_) => Algorithm::Ecdsa,
        }
    }
}

impl core::fmt::Debug for MultiSignature {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}({})",
            self.algorithm(),
            kestrel_crypto::hex_encode(self.as_bytes())
        )
    }
}

/// Extra data signed along with the call and re-checked on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct SignedExtra {
    /// Mortality window.
    pub era: Era,
    /// Signer account nonce.
    #[codec(compact)]
    pub nonce: Nonce,
    /// Optional priority fee, in plancks.
    #[codec(compact)]
    pub tip: Balance,
}

/// Data the chain mixes into the signature without shipping it in the
/// extrinsic. Both sides derive it independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct AdditionalSigned {
    /// Runtime spec version at the checkpoint block.
    pub spec_version: u32,
    /// Transaction format version of the runtime.
    pub transaction_version: u32,
    /// Hash of block zero.
    pub genesis_hash: Hash,
    /// Hash of the mortality checkpoint block.
    pub checkpoint_hash: Hash,
}

/// Everything a signature commits to.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct SigningPayload {
    /// The dispatched call.
    pub call: RuntimeCall,
    /// Extra data shipped with the extrinsic.
    pub extra: SignedExtra,
    /// Derived data not shipped with the extrinsic.
    pub additional: AdditionalSigned,
}

impl SigningPayload {
    /// Bytes the signature is actually computed over.
    pub fn signable_bytes(&self) -> Vec<u8> {
        let encoded = self.encode();
        if encoded.len() > PAYLOAD_HASH_THRESHOLD {
            Hash::new(&encoded).as_bytes().to_vec()
        } else {
            encoded
        }
    }
}

/// Offline envelope with everything needed to sign on an air-gapped
/// machine, captured from the chain in one pass.
///
/// Serializes with camel case keys so envelopes travel between tools
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UnsignedTransaction {
    /// Signer address, SS58.
    pub address: String,
    /// Hash of the mortality checkpoint block.
    pub block_hash: Hash,
    /// Number of the mortality checkpoint block.
    pub block_number: BlockNumber,
    /// Mortality window, as SCALE hex.
    pub era: Era,
    /// Hash of block zero.
    pub genesis_hash: Hash,
    /// Runtime metadata captured alongside, for auditing tools.
    pub metadata_rpc: HexBytes,
    /// SCALE encoded call.
    pub method: HexBytes,
    /// Signer account nonce.
    pub nonce: Nonce,
    /// Runtime spec version at the checkpoint block.
    pub spec_version: u32,
    /// Optional priority fee, in plancks, as a decimal string.
    #[serde(with = "balance_string")]
    pub tip: Balance,
    /// Transaction format version of the runtime.
    pub transaction_version: u32,
    /// Signed extensions the runtime had at capture time.
    pub signed_extensions: Vec<String>,
    /// Extrinsic format version.
    pub version: u8,
}

impl UnsignedTransaction {
    /// Decodes the call bytes, consuming them exactly.
    ///
    /// # Errors
    ///
    /// [`Error::Codec`] when the bytes do not decode or leave a tail.
    pub fn decode_call(&self) -> Result<RuntimeCall, Error> {
        Ok(RuntimeCall::decode_all(&mut self.method.as_ref())?)
    }

    /// Checks that this envelope speaks the extrinsic format and the
    /// signed extension set this client knows how to sign.
    ///
    /// # Errors
    ///
    /// [`Error::Input`] naming the foreign version or extension set.
    pub fn validate_signed_extensions(&self) -> Result<(), Error> {
        if self.version != EXTRINSIC_FORMAT_VERSION {
            return Err(Error::Input(format!(
                "unsupported extrinsic format version {}, this client builds version {EXTRINSIC_FORMAT_VERSION}",
                self.version
            )));
        }
        if self.signed_extensions != SIGNED_EXTENSIONS {
            return Err(Error::Input(format!(
                "unexpected signed extension set {:?}, expected {SIGNED_EXTENSIONS:?}",
                self.signed_extensions
            )));
        }
        Ok(())
    }

    /// Assembles the payload a signature over this envelope commits to.
    ///
    /// # Errors
    ///
    /// [`Error::Input`] when the envelope fails
    /// [`Self::validate_signed_extensions`], [`Error::Codec`] when the
    /// call bytes do not decode.
    pub fn signing_payload(&self) -> Result<SigningPayload, Error> {
        self.validate_signed_extensions()?;
        let call = self.decode_call()?;
        Ok(SigningPayload {
            call,
            extra: SignedExtra {
                era: self.era,
                nonce: self.nonce,
                tip: self.tip,
            },
            additional: AdditionalSigned {
                spec_version: self.spec_version,
                transaction_version: self.transaction_version,
                genesis_hash: self.genesis_hash,
                checkpoint_hash: self.block_hash,
            },
        })
    }
}

/// A fully signed extrinsic, ready for `author_submitExtrinsic`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedExtrinsic {
    /// Signer address.
    pub address: MultiAddress,
    /// Signature over the signing payload.
    pub signature: MultiSignature,
    /// Extra data the signature commits to.
    pub extra: SignedExtra,
    /// SCALE encoded call, kept as bytes.
    pub call: Vec<u8>,
}

impl SignedExtrinsic {
    /// Wire encoding: compact length prefix, version byte with the
    /// signed bit, address, signature, extra, call.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut inner = Vec::with_capacity(self.call.len() + 128);
        inner.push(SIGNED_MASK | EXTRINSIC_FORMAT_VERSION);
        self.address.encode_to(&mut inner);
        self.signature.encode_to(&mut inner);
        self.extra.encode_to(&mut inner);
        inner.extend_from_slice(&self.call);
        inner.encode()
    }

    /// Parses the wire encoding produced by [`Self::to_bytes`].
    ///
    /// # Errors
    ///
    /// [`Error::Input`] when the length prefix or the version byte is
    /// wrong, [`Error::Codec`] when a field does not decode.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut input = bytes;
        let declared = Compact::<u32>::decode(&mut input)?.0;
        if u64::from(declared) != input.len() as u64 {
            return Err(Error::Input(format!(
                "length prefix declares {declared} bytes but {} follow",
                input.len()
            )));
        }
        let version = input.read_byte()?;
        if version != (SIGNED_MASK | EXTRINSIC_FORMAT_VERSION) {
            return Err(Error::Input(format!(
                "not a signed version {EXTRINSIC_FORMAT_VERSION} extrinsic, leading byte is {version:#04x}"
            )));
        }
        let address = MultiAddress::decode(&mut input)?;
        let signature = MultiSignature::decode(&mut input)?;
        let extra = SignedExtra::decode(&mut input)?;
        Ok(Self {
            address,
            signature,
            extra,
            call: input.to_vec(),
        })
    }

    /// Transaction hash the chain will report for this extrinsic.
    ///
    /// Computed over the entire wire encoding, length prefix included.
    pub fn hash(&self) -> Hash {
        Hash::new(self.to_bytes())
    }
}

pub(crate) mod balance_string {
    //! Balances as decimal strings, so they survive JSON tooling that
    //! rounds large numbers.

    use serde::{de, Deserializer, Serializer};

    use crate::Balance;

    pub fn serialize<S: Serializer>(value: &Balance, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Balance, D::Error> {
        struct BalanceVisitor;

        impl de::Visitor<'_> for BalanceVisitor {
            type Value = Balance;

            fn expecting(&self, formatter: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                formatter.write_str("a balance as a decimal string or an integer")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
                Ok(Balance::from(value))
            }

            fn visit_u128<E: de::Error>(self, value: u128) -> Result<Self::Value, E> {
                Ok(value)
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                value.parse().map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_any(BalanceVisitor)
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use kestrel_crypto::AccountId32;

    use super::*;
    use crate::call::SystemCall;

    fn account(byte: u8) -> AccountId32 {
        AccountId32::new([byte; 32])
    }

    fn remark_call(text: &[u8]) -> RuntimeCall {
        RuntimeCall::System(SystemCall::Remark {
            remark: text.to_vec(),
        })
    }

    fn unsigned_fixture() -> UnsignedTransaction {
        UnsignedTransaction {
            address: account(0xAA).to_string(),
            block_hash: Hash::new(b"checkpoint"),
            block_number: 1000,
            era: Era::mortal(64, 1000),
            genesis_hash: Hash::new(b"genesis"),
            metadata_rpc: HexBytes::from(b"meta".to_vec()),
            method: HexBytes::from(remark_call(b"hi").encode()),
            nonce: 7,
            spec_version: 268,
            tip: 0,
            transaction_version: 2,
            signed_extensions: SIGNED_EXTENSIONS.iter().map(ToString::to_string).collect(),
            version: 4,
        }
    }

    #[test]
    fn compact_length_prefix_reference_values() {
        assert_eq!(Compact(0_u32).encode(), vec![0x00]);
        assert_eq!(Compact(1_u32).encode(), vec![0x04]);
        assert_eq!(Compact(63_u32).encode(), vec![0xFC]);
        assert_eq!(Compact(64_u32).encode(), vec![0x01, 0x01]);
    }

    #[test]
    fn signature_from_parts_checks_length() {
        let signature = MultiSignature::from_parts(Algorithm::Ed25519, &[0xBB; 64]).unwrap();
        assert_eq!(signature, MultiSignature::Ed25519([0xBB; 64]));
        assert_eq!(signature.algorithm(), Algorithm::Ed25519);

        let signature = MultiSignature::from_parts(Algorithm::Ecdsa, &[0xCC; 65]).unwrap();
        assert_eq!(signature.as_bytes().len(), 65);

        assert!(matches!(
            MultiSignature::from_parts(Algorithm::Ed25519, &[0xBB; 65]),
            Err(Error::Input(_))
        ));
        assert!(matches!(
            MultiSignature::from_parts(Algorithm::Ecdsa, &[0xCC; 64]),
            Err(Error::Input(_))
        ));
    }

    #[test]
    fn signed_extrinsic_wire_format_reference_vector() {
        let call = remark_call(b"hi").encode();
        let tx = SignedExtrinsic {
            address: MultiAddress::Id(account(0xAA)),
            signature: MultiSignature::Ed25519([0xBB; 64]),
            extra: SignedExtra {
                era: Era::mortal(64, 42),
                nonce: 1,
                tip: 0,
            },
            call: call.clone(),
        };
        let bytes = tx.to_bytes();

        // Inner length 108, compact encoded as two bytes, then the
        // signed version byte and the address tag.
        assert_eq!(bytes.len(), 110);
        assert_eq!(&bytes[..4], &[0xB1, 0x01, 0x84, 0x00]);
        // Era a502, compact nonce 1, compact tip 0.
        assert_eq!(bytes[101..105], hex!("a5020400"));
        assert_eq!(&bytes[105..], call.as_slice());

        let decoded = SignedExtrinsic::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(tx.hash(), Hash::new(&bytes));
    }

    #[test]
    fn from_bytes_rejects_wrong_length_prefix() {
        let tx = SignedExtrinsic {
            address: MultiAddress::Id(account(1)),
            signature: MultiSignature::Ed25519([0; 64]),
            extra: SignedExtra {
                era: Era::Immortal,
                nonce: 0,
                tip: 0,
            },
            call: remark_call(b"x").encode(),
        };
        let mut bytes = tx.to_bytes();
        bytes.pop();
        assert!(matches!(
            SignedExtrinsic::from_bytes(&bytes),
            Err(Error::Input(_))
        ));
    }

    #[test]
    fn from_bytes_rejects_unsigned_version_byte() {
        let tx = SignedExtrinsic {
            address: MultiAddress::Id(account(1)),
            signature: MultiSignature::Ed25519([0; 64]),
            extra: SignedExtra {
                era: Era::Immortal,
                nonce: 0,
                tip: 0,
            },
            call: remark_call(b"x").encode(),
        };
        let mut bytes = tx.to_bytes();
        // The version byte follows the two-byte compact prefix. Clear
        // its signed bit.
        assert_eq!(bytes[2], SIGNED_MASK | EXTRINSIC_FORMAT_VERSION);
        bytes[2] = EXTRINSIC_FORMAT_VERSION;
        assert!(matches!(
            SignedExtrinsic::from_bytes(&bytes),
            Err(Error::Input(_))
        ));
    }

    fn payload_with_remark_len(len: usize) -> SigningPayload {
        SigningPayload {
            call: remark_call(&vec![0xCD; len]),
            extra: SignedExtra {
                era: Era::Immortal,
                nonce: 0,
                tip: 0,
            },
            additional: AdditionalSigned {
                spec_version: 1,
                transaction_version: 1,
                genesis_hash: Hash::new(b"g"),
                checkpoint_hash: Hash::new(b"c"),
            },
        }
    }

    #[test]
    fn oversized_payload_is_hashed_before_signing() {
        let at_limit = payload_with_remark_len(177);
        assert_eq!(at_limit.encode().len(), PAYLOAD_HASH_THRESHOLD);
        assert_eq!(at_limit.signable_bytes(), at_limit.encode());

        let over_limit = payload_with_remark_len(178);
        assert_eq!(over_limit.encode().len(), PAYLOAD_HASH_THRESHOLD + 1);
        let signable = over_limit.signable_bytes();
        assert_eq!(signable.len(), Hash::LENGTH);
        assert_eq!(signable, Hash::new(over_limit.encode()).as_bytes());
    }

    #[test]
    fn signing_payload_round_trips_through_scale() {
        let payload = unsigned_fixture().signing_payload().unwrap();
        let decoded = SigningPayload::decode_all(&mut payload.encode().as_slice()).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn unsigned_transaction_serde_round_trip() {
        let unsigned = unsigned_fixture();
        let json = serde_json::to_value(&unsigned).unwrap();
        assert_eq!(json["era"], "0x8502");
        assert_eq!(json["tip"], "0");
        assert_eq!(json["blockNumber"], 1000);
        let back: UnsignedTransaction = serde_json::from_value(json).unwrap();
        assert_eq!(back, unsigned);
    }

    #[test]
    fn tip_parses_from_number_or_string() {
        let mut json = serde_json::to_value(unsigned_fixture()).unwrap();
        json["tip"] = serde_json::json!(25);
        let back: UnsignedTransaction = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back.tip, 25);

        json["tip"] = serde_json::json!(u128::MAX.to_string());
        let back: UnsignedTransaction = serde_json::from_value(json).unwrap();
        assert_eq!(back.tip, u128::MAX);
    }

    #[test]
    fn missing_mortality_extension_is_rejected() {
        let mut unsigned = unsigned_fixture();
        unsigned.signed_extensions.retain(|name| name != "CheckEra");
        assert!(matches!(unsigned.signing_payload(), Err(Error::Input(_))));
    }

    #[test]
    fn foreign_format_version_is_rejected() {
        let mut unsigned = unsigned_fixture();
        unsigned.version = 3;
        assert!(matches!(unsigned.signing_payload(), Err(Error::Input(_))));
    }

    #[test]
    fn trailing_garbage_in_call_bytes_is_rejected() {
        let mut unsigned = unsigned_fixture();
        let mut bytes = unsigned.method.clone().into_vec();
        bytes.push(0xFF);
        unsigned.method = HexBytes::from(bytes);
        assert!(matches!(unsigned.decode_call(), Err(Error::Codec(_))));
    }
}
