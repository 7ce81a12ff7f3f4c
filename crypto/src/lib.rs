//! This module contains structures and implementations related to the
//! cryptographic parts of Kestrel: keys of the supported signature
//! schemes, blake2b hashing, SS58 addresses, secret URIs, multisig
//! account derivation and the keystore cipher.

mod address;
pub mod encryption;
mod hash;
pub mod multisig;
mod signature;
pub mod suri;

use core::{fmt, str::FromStr};

pub use address::{AccountId32, Ss58Format};
use derive_more::Display;
pub use error::Error;
use error::{NoSuchAlgorithm, ParseError};
use getset::Getters;
pub use hash::Hash;
use serde::{Serialize, Serializer};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use zeroize::ZeroizeOnDrop;

use self::signature::{ed25519, secp256k1};

/// String algorithm representation
pub const ED_25519: &str = "ed25519";
/// String algorithm representation
pub const ECDSA: &str = "ecdsa";

/// Signature scheme understood by the chain.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    DeserializeFromStr,
    SerializeDisplay,
)]
#[repr(u8)]
pub enum Algorithm {
    #[default]
    #[allow(missing_docs)]
    Ed25519,
    #[allow(missing_docs)]
    Ecdsa,
}

impl Algorithm {
    /// Maps the algorithm to its static string representation
    pub const fn as_static_str(self) -> &'static str {
        match self {
            Self::Ed25519 => ED_25519,
            Self::Ecdsa => ECDSA,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_static_str())
    }
}

impl FromStr for Algorithm {
    type Err = NoSuchAlgorithm;

    fn from_str(algorithm: &str) -> Result<Self, Self::Err> {
        match algorithm {
            ED_25519 => Ok(Algorithm::Ed25519),
            ECDSA => Ok(Algorithm::Ecdsa),
            _ => Err(NoSuchAlgorithm),
        }
    }
}

/// Key pair generation option. Passed to a specific algorithm.
#[derive(Debug)]
pub enum KeyGenOption<K> {
    /// Use random number generator
    Random,
    /// Use the given 32-byte secret seed
    UseSeed([u8; 32]),
    /// Derive from a private key
    FromPrivateKey(K),
}

/// Pair of Public and Private keys.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct KeyPair {
    /// Public key.
    public_key: PublicKey,
    /// Private key.
    private_key: PrivateKey,
}

impl KeyPair {
    /// Generate a random key pair using the default [`Algorithm`].
    pub fn random() -> Self {
        Self::random_with_algorithm(Algorithm::default())
    }

    /// Generate a random key pair
    pub fn random_with_algorithm(algorithm: Algorithm) -> Self {
        macro_rules! with_algorithm_variations {
            ($(($alg:ident, $alg_mod:path)),+) => {
                match algorithm {
                    $(Algorithm::$alg => <$alg_mod>::keypair(KeyGenOption::Random).map(Into::into)),*
                }
            }
        }

        with_algorithm_variations!(
            (Ed25519, ed25519::Ed25519Sha512),
            (Ecdsa, secp256k1::EcdsaSecp256k1)
        )
        .expect("`KeyGenOption::Random` cannot produce an invalid key")
    }

    /// Derive a key pair from a 32-byte secret seed.
    ///
    /// # Errors
    /// Fails if the seed is not a valid secret for `algorithm`, which
    /// can happen for ecdsa where the seed is the secret scalar.
    pub fn from_seed(seed: [u8; 32], algorithm: Algorithm) -> Result<Self, Error> {
        macro_rules! with_algorithm_variations {
            ($(($alg:ident, $alg_mod:path)),+) => {
                match algorithm {
                    $(Algorithm::$alg => <$alg_mod>::keypair(KeyGenOption::UseSeed(seed)).map(Into::into)),*
                }
            }
        }

        with_algorithm_variations!(
            (Ed25519, ed25519::Ed25519Sha512),
            (Ecdsa, secp256k1::EcdsaSecp256k1)
        )
        .map_err(Error::from)
    }

    /// Derive a key pair from a secret URI such as `//Alice` or
    /// `<mnemonic>//hard///password`.
    ///
    /// # Errors
    /// Fails if the URI does not parse or the derived seed is invalid
    /// for `algorithm`.
    pub fn from_suri(suri: &str, algorithm: Algorithm) -> Result<Self, Error> {
        let suri: suri::Suri = suri.parse()?;
        Self::from_seed(suri.seed(algorithm), algorithm)
    }

    /// Algorithm
    pub fn algorithm(&self) -> Algorithm {
        self.private_key.algorithm()
    }

    /// Construct a [`KeyPair`].
    ///
    /// See [`Self::into_parts`] for an opposite conversion.
    ///
    /// # Errors
    /// If public and private keys don't match, i.e. if they don't make a pair
    pub fn new(public_key: PublicKey, private_key: PrivateKey) -> Result<Self, Error> {
        let algorithm = private_key.algorithm();

        if algorithm != public_key.algorithm() {
            return Err(Error::KeyGen("Mismatch of key algorithms".to_owned()));
        }

        if PublicKey::from(private_key.clone()) != public_key {
            return Err(Error::KeyGen(String::from("Key pair mismatch")));
        }

        Ok(Self {
            public_key,
            private_key,
        })
    }

    /// Get [`PublicKey`] and [`PrivateKey`] contained in the [`KeyPair`].
    pub fn into_parts(self) -> (PublicKey, PrivateKey) {
        (self.public_key, self.private_key)
    }

    /// Sign `message` with the private key, producing the raw signature
    /// bytes of the pair's scheme (64 for ed25519, 65 for ecdsa).
    ///
    /// # Errors
    /// Fails if the underlying scheme rejects the signing operation.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, Error> {
        match self.private_key.0.as_ref() {
            PrivateKeyInner::Ed25519(sk) => Ok(ed25519::Ed25519Sha512::sign(message, sk)),
            PrivateKeyInner::Ecdsa(sk) => secp256k1::EcdsaSecp256k1::sign(message, sk),
        }
    }
}

/// Derives the full [`KeyPair`] from its [`PrivateKey`] only
impl From<PrivateKey> for KeyPair {
    fn from(private_key: PrivateKey) -> Self {
        Self {
            public_key: PublicKey::from(private_key.clone()),
            private_key,
        }
    }
}

impl From<(ed25519::PublicKey, ed25519::PrivateKey)> for KeyPair {
    fn from((public_key, private_key): (ed25519::PublicKey, ed25519::PrivateKey)) -> Self {
        Self {
            public_key: PublicKey(Box::new(PublicKeyInner::Ed25519(public_key))),
            private_key: PrivateKey(Box::new(PrivateKeyInner::Ed25519(private_key))),
        }
    }
}

impl From<(secp256k1::PublicKey, secp256k1::PrivateKey)> for KeyPair {
    fn from((public_key, private_key): (secp256k1::PublicKey, secp256k1::PrivateKey)) -> Self {
        Self {
            public_key: PublicKey(Box::new(PublicKeyInner::Ecdsa(public_key))),
            private_key: PrivateKey(Box::new(PrivateKeyInner::Ecdsa(private_key))),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
#[allow(missing_docs, variant_size_differences)]
enum PublicKeyInner {
    Ed25519(ed25519::PublicKey),
    Ecdsa(secp256k1::PublicKey),
}

impl PublicKeyInner {
    fn from_bytes(algorithm: Algorithm, payload: &[u8]) -> Result<Self, ParseError> {
        match algorithm {
            Algorithm::Ed25519 => {
                ed25519::Ed25519Sha512::parse_public_key(payload).map(PublicKeyInner::Ed25519)
            }
            Algorithm::Ecdsa => {
                secp256k1::EcdsaSecp256k1::parse_public_key(payload).map(PublicKeyInner::Ecdsa)
            }
        }
    }

    /// Key payload
    fn payload(&self) -> Vec<u8> {
        match self {
            Self::Ed25519(key) => key.as_bytes().to_vec(),
            Self::Ecdsa(key) => key.to_sec1_bytes().to_vec(),
        }
    }

    fn algorithm(&self) -> Algorithm {
        match self {
            Self::Ed25519(_) => Algorithm::Ed25519,
            Self::Ecdsa(_) => Algorithm::Ecdsa,
        }
    }
}

/// Public key used in signatures.
///
/// [`Display`](fmt::Display) renders the SS58 address of the account
/// the key controls, under the Kestrel network format.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(Box<PublicKeyInner>);

impl PublicKey {
    /// Creates a new public key from raw bytes received from elsewhere
    ///
    /// # Errors
    /// Fails if public key parsing fails
    pub fn from_bytes(algorithm: Algorithm, payload: &[u8]) -> Result<Self, ParseError> {
        PublicKeyInner::from_bytes(algorithm, payload)
            .map(Box::new)
            .map(Self)
    }

    /// Extracts raw bytes from the public key, copying the payload.
    pub fn to_bytes(&self) -> (Algorithm, Vec<u8>) {
        (self.0.algorithm(), self.0.payload())
    }

    /// Construct from hex encoded string. A shorthand over
    /// [`Self::from_bytes`] that tolerates a leading `0x`.
    ///
    /// # Errors
    /// - If the given payload is not hex encoded
    /// - If the given payload is not a valid public key
    pub fn from_hex(algorithm: Algorithm, payload: impl AsRef<str>) -> Result<Self, ParseError> {
        let payload = hex_decode(payload.as_ref())?;

        Self::from_bytes(algorithm, &payload)
    }

    /// Get the digital signature algorithm of the public key
    pub fn algorithm(&self) -> Algorithm {
        self.0.algorithm()
    }

    /// The chain account identifier this key controls. For ed25519 the
    /// key bytes are the identifier, for ecdsa it is the blake2b-256
    /// digest of the compressed SEC1 encoding.
    pub fn account_id(&self) -> AccountId32 {
        match self.0.as_ref() {
            PublicKeyInner::Ed25519(key) => AccountId32::new(key.to_bytes()),
            PublicKeyInner::Ecdsa(key) => {
                AccountId32::new(Hash::new(key.to_sec1_bytes()).into())
            }
        }
    }

    /// Verify `signature` over `message` under this key.
    ///
    /// # Errors
    /// Fails if the signature is malformed or does not verify.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), Error> {
        match self.0.as_ref() {
            PublicKeyInner::Ed25519(pk) => {
                ed25519::Ed25519Sha512::verify(message, signature, pk)
            }
            PublicKeyInner::Ecdsa(pk) => {
                secp256k1::EcdsaSecp256k1::verify(message, signature, pk)
            }
        }
    }
}

impl core::hash::Hash for PublicKey {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        (self.to_bytes()).hash(state);
    }
}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.to_bytes().cmp(&other.to_bytes())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (algorithm, payload) = self.to_bytes();
        f.debug_tuple("PublicKey")
            .field(&algorithm.as_static_str())
            .field(&hex_encode(payload))
            .finish()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.account_id(), f)
    }
}

impl From<PrivateKey> for PublicKey {
    fn from(private_key: PrivateKey) -> Self {
        let inner = match private_key.0.as_ref() {
            PrivateKeyInner::Ed25519(secret) => PublicKeyInner::Ed25519(secret.verifying_key()),
            PrivateKeyInner::Ecdsa(secret) => PublicKeyInner::Ecdsa(secret.public_key()),
        };

        Self(Box::new(inner))
    }
}

#[derive(Clone)]
#[allow(missing_docs, variant_size_differences)]
enum PrivateKeyInner {
    Ed25519(ed25519::PrivateKey),
    Ecdsa(secp256k1::PrivateKey),
}

/// Private Key used in signatures. Its payload is the 32-byte secret
/// seed of the scheme. Formats and serializes redacted.
#[derive(Clone)]
pub struct PrivateKey(Box<PrivateKeyInner>);

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        match (self.0.as_ref(), other.0.as_ref()) {
            (PrivateKeyInner::Ed25519(l), PrivateKeyInner::Ed25519(r)) => l == r,
            (PrivateKeyInner::Ecdsa(l), PrivateKeyInner::Ecdsa(r)) => l == r,
            _ => false,
        }
    }
}

impl Eq for PrivateKey {}

impl PrivateKey {
    /// Creates a new private key from raw bytes received from elsewhere
    ///
    /// # Errors
    /// If the given payload is not a valid 32-byte seed for `algorithm`
    pub fn from_bytes(algorithm: Algorithm, payload: &[u8]) -> Result<Self, ParseError> {
        match algorithm {
            Algorithm::Ed25519 => {
                ed25519::Ed25519Sha512::parse_private_key(payload).map(PrivateKeyInner::Ed25519)
            }
            Algorithm::Ecdsa => {
                secp256k1::EcdsaSecp256k1::parse_private_key(payload).map(PrivateKeyInner::Ecdsa)
            }
        }
        .map(Box::new)
        .map(PrivateKey)
    }

    /// Construct [`PrivateKey`] from a hex encoded seed.
    /// A shorthand over [`PrivateKey::from_bytes`]
    ///
    /// # Errors
    /// - If the given payload is not hex encoded
    /// - If the given payload is not a valid private key
    pub fn from_hex(algorithm: Algorithm, payload: impl AsRef<str>) -> Result<Self, ParseError> {
        let payload = hex_decode(payload.as_ref())?;

        Self::from_bytes(algorithm, &payload)
    }

    /// Get the digital signature algorithm of the private key
    pub fn algorithm(&self) -> Algorithm {
        match self.0.as_ref() {
            PrivateKeyInner::Ed25519(_) => Algorithm::Ed25519,
            PrivateKeyInner::Ecdsa(_) => Algorithm::Ecdsa,
        }
    }

    /// Key payload
    fn payload(&self) -> Vec<u8> {
        match self.0.as_ref() {
            PrivateKeyInner::Ed25519(key) => key.to_bytes().to_vec(),
            PrivateKeyInner::Ecdsa(key) => key.to_bytes().to_vec(),
        }
    }

    /// Extracts the raw bytes from the private key, copying the payload.
    pub fn to_bytes(&self) -> (Algorithm, Vec<u8>) {
        (self.algorithm(), self.payload())
    }
}

impl ZeroizeOnDrop for PrivateKeyInner {}

impl Drop for PrivateKeyInner {
    fn drop(&mut self) {
        fn assert_will_zeroize_on_drop(_value: &mut impl ZeroizeOnDrop) {
            // checks that the `zeroize` machinery of the underlying
            // crates is enabled, actual zeroing happens in their Drop
        }
        match self {
            PrivateKeyInner::Ed25519(key) => {
                assert_will_zeroize_on_drop(key);
            }
            PrivateKeyInner::Ecdsa(key) => {
                assert_will_zeroize_on_drop(key);
            }
        }
    }
}

const PRIVATE_KEY_REDACTED: &str = "[REDACTED PrivateKey]";

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(PRIVATE_KEY_REDACTED)
    }
}

impl fmt::Display for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(PRIVATE_KEY_REDACTED)
    }
}

impl Serialize for PrivateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        PRIVATE_KEY_REDACTED.serialize(serializer)
    }
}

/// Shim for decoding hexadecimal strings, tolerating a leading `0x`
pub fn hex_decode<T: AsRef<[u8]> + ?Sized>(payload: &T) -> Result<Vec<u8>, ParseError> {
    let payload = payload.as_ref();
    let payload = payload.strip_prefix(b"0x").unwrap_or(payload);
    hex::decode(payload).map_err(|err| ParseError(err.to_string()))
}

/// Render bytes as `0x`-prefixed lowercase hex, the form used across
/// records, logs and the wire
pub fn hex_encode(payload: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(payload))
}

pub mod error {
    //! Module containing errors
    use super::*;

    /// Error indicating algorithm could not be found
    #[derive(Debug, Display, Clone, Copy)]
    #[display(fmt = "Algorithm not supported")]
    pub struct NoSuchAlgorithm;

    impl std::error::Error for NoSuchAlgorithm {}

    /// Error parsing a key, an address or a secret URI
    #[derive(Debug, Display, Clone, PartialEq, Eq)]
    #[display(fmt = "{_0}")]
    pub struct ParseError(pub(crate) String);

    impl std::error::Error for ParseError {}

    /// Error when dealing with cryptographic functions
    #[derive(Debug, Display, PartialEq, Eq)]
    pub enum Error {
        /// Returned when trying to create an algorithm which does not exist
        #[display(fmt = "Algorithm doesn't exist")]
        NoSuchAlgorithm(String),
        /// Occurs during deserialization of a private or public key
        #[display(fmt = "Key could not be parsed. {_0}")]
        Parse(ParseError),
        /// Returned when an error occurs during the signing process
        #[display(fmt = "Signing failed. {_0}")]
        Signing(String),
        /// Returned when an error occurs during the signature verification process
        #[display(fmt = "Signature verification failed")]
        BadSignature,
        /// Returned when an error occurs during key generation
        #[display(fmt = "Key generation failed. {_0}")]
        KeyGen(String),
        /// Returned when sealing a seed for the keystore fails
        #[display(fmt = "Sealing the keystore seed failed. {_0}")]
        Encryption(String),
        /// Returned when a sealed seed cannot be opened, usually a wrong password
        #[display(fmt = "Could not decrypt the keystore seed (wrong password or corrupt file)")]
        Decryption,
    }

    impl From<NoSuchAlgorithm> for Error {
        fn from(source: NoSuchAlgorithm) -> Self {
            Self::NoSuchAlgorithm(source.to_string())
        }
    }

    impl From<ParseError> for Error {
        fn from(source: ParseError) -> Self {
            Self::Parse(source)
        }
    }

    impl std::error::Error for Error {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_parses_from_its_display_form() {
        for algorithm in [Algorithm::Ed25519, Algorithm::Ecdsa] {
            assert_eq!(
                algorithm.to_string().parse::<Algorithm>().unwrap(),
                algorithm
            );
        }
        assert!("sr25519".parse::<Algorithm>().is_err());
    }

    #[test]
    fn default_algorithm_is_ed25519() {
        assert_eq!(Algorithm::default(), Algorithm::Ed25519);
    }

    #[test]
    fn key_pair_new_rejects_mismatched_parts() {
        let (public_key, _) = KeyPair::random().into_parts();
        let (_, private_key) = KeyPair::random().into_parts();

        assert!(matches!(
            KeyPair::new(public_key, private_key),
            Err(Error::KeyGen(_))
        ));
    }

    #[test]
    fn key_pair_new_rejects_mismatched_algorithms() {
        let (public_key, _) = KeyPair::random_with_algorithm(Algorithm::Ed25519).into_parts();
        let (_, private_key) = KeyPair::random_with_algorithm(Algorithm::Ecdsa).into_parts();

        assert!(matches!(
            KeyPair::new(public_key, private_key),
            Err(Error::KeyGen(_))
        ));
    }

    #[test]
    fn key_pair_new_accepts_matching_parts() {
        let (public_key, private_key) = KeyPair::random().into_parts();
        let key_pair = KeyPair::new(public_key.clone(), private_key).unwrap();
        assert_eq!(key_pair.public_key(), &public_key);
    }

    #[test]
    fn seed_derivation_is_deterministic() {
        for algorithm in [Algorithm::Ed25519, Algorithm::Ecdsa] {
            let first = KeyPair::from_seed([5; 32], algorithm).unwrap();
            let second = KeyPair::from_seed([5; 32], algorithm).unwrap();
            assert_eq!(first.public_key(), second.public_key());
        }
    }

    #[test]
    fn ed25519_account_id_is_the_public_key() {
        let key_pair = KeyPair::from_seed([1; 32], Algorithm::Ed25519).unwrap();
        let (_, payload) = key_pair.public_key().to_bytes();
        assert_eq!(
            key_pair.public_key().account_id().as_bytes().as_slice(),
            payload.as_slice()
        );
    }

    #[test]
    fn ecdsa_account_id_hashes_the_compressed_key() {
        let key_pair = KeyPair::from_seed([1; 32], Algorithm::Ecdsa).unwrap();
        let (_, payload) = key_pair.public_key().to_bytes();
        assert_eq!(payload.len(), 33);
        assert_eq!(
            key_pair.public_key().account_id(),
            AccountId32::new(Hash::new(&payload).into()),
        );
    }

    #[test]
    fn public_key_displays_as_ss58_address() {
        let key_pair = KeyPair::from_seed([2; 32], Algorithm::Ed25519).unwrap();
        let shown = key_pair.public_key().to_string();
        assert_eq!(
            shown.parse::<AccountId32>().unwrap(),
            key_pair.public_key().account_id()
        );
    }

    #[test]
    fn sign_and_verify_round_trip() {
        for algorithm in [Algorithm::Ed25519, Algorithm::Ecdsa] {
            let key_pair = KeyPair::random_with_algorithm(algorithm);
            let signature = key_pair.sign(b"payload").unwrap();
            key_pair.public_key().verify(b"payload", &signature).unwrap();
            assert!(key_pair.public_key().verify(b"other", &signature).is_err());
        }
    }

    #[test]
    fn suri_derivation_depends_on_algorithm() {
        let ed = KeyPair::from_suri("//Alice", Algorithm::Ed25519).unwrap();
        let ecdsa = KeyPair::from_suri("//Alice", Algorithm::Ecdsa).unwrap();
        assert_ne!(
            ed.public_key().account_id(),
            ecdsa.public_key().account_id()
        );
    }

    #[test]
    fn hex_decode_tolerates_prefix() {
        assert_eq!(hex_decode("0xdead").unwrap(), vec![0xde, 0xad]);
        assert_eq!(hex_decode("dead").unwrap(), vec![0xde, 0xad]);
        assert!(hex_decode("0xzz").is_err());
        assert_eq!(hex_encode([0xde, 0xad]), "0xdead");
    }

    #[test]
    fn private_key_is_redacted_everywhere() {
        let (_, private_key) = KeyPair::from_seed([3; 32], Algorithm::Ed25519)
            .unwrap()
            .into_parts();

        assert_eq!(format!("{private_key}"), PRIVATE_KEY_REDACTED);
        assert_eq!(format!("{private_key:?}"), PRIVATE_KEY_REDACTED);
        assert_eq!(
            serde_json::to_string(&private_key).unwrap(),
            format!("\"{PRIVATE_KEY_REDACTED}\"")
        );
    }

    #[test]
    fn private_key_round_trips_through_hex() {
        let seed_hex = format!("0x{}", "07".repeat(32));
        let private_key = PrivateKey::from_hex(Algorithm::Ed25519, &seed_hex).unwrap();
        let (algorithm, payload) = private_key.to_bytes();
        assert_eq!(algorithm, Algorithm::Ed25519);
        assert_eq!(hex_encode(payload), seed_hex);
    }
}
