//! Secret URIs: the `phrase//hard-junction///password` syntax used to
//! describe keys on the command line.
//!
//! The phrase is either a BIP39 English mnemonic or a `0x`-prefixed
//! 32-byte seed. Only hard (`//`) junctions are supported because soft
//! derivation is scheme-specific and not meaningful for the signature
//! schemes the chain accepts.

use core::{fmt, str::FromStr};

use bip39::Mnemonic;
use parity_scale_codec::Encode;
use zeroize::Zeroize;

use crate::{
    error::{Error, ParseError},
    Algorithm, Hash,
};

/// Well-known development phrase substituted when a secret URI starts
/// with a junction, as in `//Alice`.
pub const DEV_PHRASE: &str =
    "bottom drive obey lake curtain smoke basket hold race lonely fit walk";

/// Separator introducing the optional password section.
const PASSWORD_SEPARATOR: &str = "///";

/// Length of a junction chain code in bytes.
const CHAIN_CODE_LENGTH: usize = 32;

/// A parsed secret URI. All syntax errors are caught at parse time, so
/// seed derivation itself cannot fail.
pub struct Suri {
    secret: Secret,
    junctions: Vec<[u8; CHAIN_CODE_LENGTH]>,
    password: Option<String>,
}

enum Secret {
    Seed([u8; 32]),
    Phrase(Mnemonic),
}

impl Suri {
    /// Derive the 32-byte secret seed this URI describes for the given
    /// signature scheme. Hard junctions mix a scheme tag into each
    /// derivation step, so the same URI yields unrelated keys under
    /// different schemes.
    #[must_use]
    pub fn seed(&self, algorithm: Algorithm) -> [u8; 32] {
        let mut seed = match &self.secret {
            Secret::Seed(seed) => *seed,
            Secret::Phrase(mnemonic) => {
                let mut full = mnemonic.to_seed(self.password.as_deref().unwrap_or(""));
                let mut seed = [0; 32];
                seed.copy_from_slice(&full[..32]);
                full.zeroize();
                seed
            }
        };
        for chain_code in &self.junctions {
            seed = derive_hard(algorithm, &seed, chain_code);
        }
        seed
    }
}

impl FromStr for Suri {
    type Err = ParseError;

    fn from_str(suri: &str) -> Result<Self, Self::Err> {
        let (body, password) = match suri.find(PASSWORD_SEPARATOR) {
            Some(at) => (
                &suri[..at],
                Some(suri[at + PASSWORD_SEPARATOR.len()..].to_owned()),
            ),
            None => (suri, None),
        };

        let (phrase, mut path) = match body.find('/') {
            Some(at) => (&body[..at], &body[at..]),
            None => (body, ""),
        };

        let mut junctions = Vec::new();
        while !path.is_empty() {
            let rest = path.strip_prefix("//").ok_or_else(|| {
                ParseError(
                    "soft junctions (single `/`) are not supported, use hard `//` junctions"
                        .to_owned(),
                )
            })?;
            let end = rest.find('/').unwrap_or(rest.len());
            junctions.push(junction_chain_code(&rest[..end]));
            path = &rest[end..];
        }

        let secret = if phrase.starts_with("0x") {
            if password.is_some() {
                return Err(ParseError(
                    "a password feeds the mnemonic derivation and cannot be combined \
                     with a raw seed"
                        .to_owned(),
                ));
            }
            let bytes = crate::hex_decode(phrase)?;
            let seed = <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| {
                ParseError(format!("raw seed must be 32 bytes of hex, got {}", bytes.len()))
            })?;
            Secret::Seed(seed)
        } else {
            let phrase = if phrase.is_empty() { DEV_PHRASE } else { phrase };
            let mnemonic = Mnemonic::parse(phrase)
                .map_err(|err| ParseError(format!("invalid mnemonic phrase: {err}")))?;
            Secret::Phrase(mnemonic)
        };

        Ok(Self {
            secret,
            junctions,
            password,
        })
    }
}

impl fmt::Debug for Suri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED Suri]")
    }
}

impl Drop for Suri {
    fn drop(&mut self) {
        if let Secret::Seed(seed) = &mut self.secret {
            seed.zeroize();
        }
        if let Some(password) = &mut self.password {
            password.zeroize();
        }
    }
}

/// Generate a fresh English mnemonic of `word_count` words.
///
/// # Errors
/// Fails if `word_count` is not one that BIP39 defines.
pub fn generate_mnemonic(word_count: usize) -> Result<String, Error> {
    Mnemonic::generate(word_count)
        .map(|mnemonic| mnemonic.to_string())
        .map_err(|err| Error::KeyGen(err.to_string()))
}

/// Chain code of a single junction: the SCALE encoding of the junction
/// index (`u64` if the text parses as one, the string otherwise),
/// zero-padded to 32 bytes or hashed down if longer.
fn junction_chain_code(junction: &str) -> [u8; CHAIN_CODE_LENGTH] {
    let encoded = junction
        .parse::<u64>()
        .map_or_else(|_| junction.encode(), |index| index.encode());

    let mut chain_code = [0; CHAIN_CODE_LENGTH];
    if encoded.len() > CHAIN_CODE_LENGTH {
        chain_code.copy_from_slice(Hash::new(&encoded).as_bytes());
    } else {
        chain_code[..encoded.len()].copy_from_slice(&encoded);
    }
    chain_code
}

/// One hard derivation step. The scheme tag keeps key trees of
/// different schemes unrelated even when seed and junction match.
fn derive_hard(
    algorithm: Algorithm,
    seed: &[u8; 32],
    chain_code: &[u8; CHAIN_CODE_LENGTH],
) -> [u8; 32] {
    let tag = match algorithm {
        Algorithm::Ed25519 => "Ed25519HDKD",
        Algorithm::Ecdsa => "Secp256k1HDKD",
    };
    (tag, seed, chain_code).using_encoded(|encoded| Hash::new(encoded).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_of(suri: &str, algorithm: Algorithm) -> [u8; 32] {
        suri.parse::<Suri>().unwrap().seed(algorithm)
    }

    #[test]
    fn empty_phrase_falls_back_to_dev_phrase() {
        assert_eq!(
            seed_of("//Alice", Algorithm::Ed25519),
            seed_of(&format!("{DEV_PHRASE}//Alice"), Algorithm::Ed25519),
        );
    }

    #[test]
    fn junctions_change_the_seed_and_chain() {
        let base = seed_of(DEV_PHRASE, Algorithm::Ed25519);
        let alice = seed_of("//Alice", Algorithm::Ed25519);
        let nested = seed_of("//Alice//stash", Algorithm::Ed25519);
        assert_ne!(base, alice);
        assert_ne!(alice, nested);

        // A nested junction is one hard step from its parent.
        assert_eq!(
            nested,
            derive_hard(Algorithm::Ed25519, &alice, &junction_chain_code("stash")),
        );
    }

    #[test]
    fn schemes_share_the_base_seed_but_not_derived_ones() {
        assert_eq!(
            seed_of(DEV_PHRASE, Algorithm::Ed25519),
            seed_of(DEV_PHRASE, Algorithm::Ecdsa),
        );
        assert_ne!(
            seed_of("//Alice", Algorithm::Ed25519),
            seed_of("//Alice", Algorithm::Ecdsa),
        );
    }

    #[test]
    fn password_feeds_the_mnemonic_derivation() {
        assert_ne!(
            seed_of("///secret", Algorithm::Ed25519),
            seed_of("", Algorithm::Ed25519),
        );
        assert_ne!(
            seed_of("///secret", Algorithm::Ed25519),
            seed_of("///other", Algorithm::Ed25519),
        );
    }

    #[test]
    fn raw_seed_is_used_verbatim() {
        let suri = format!("0x{}", "ab".repeat(32));
        assert_eq!(seed_of(&suri, Algorithm::Ed25519), [0xab; 32]);

        // Junctions still apply on top of a raw seed.
        assert_eq!(
            seed_of(&format!("{suri}//0"), Algorithm::Ed25519),
            derive_hard(Algorithm::Ed25519, &[0xab; 32], &junction_chain_code("0")),
        );
    }

    #[test]
    fn numeric_junctions_encode_as_u64_indices() {
        let mut expected = [0; CHAIN_CODE_LENGTH];
        expected[..8].copy_from_slice(&42_u64.to_le_bytes());
        assert_eq!(junction_chain_code("42"), expected);

        // Non-numeric junctions are SCALE strings, so `0` and `zero`
        // live in different subtrees.
        assert_ne!(junction_chain_code("0"), junction_chain_code("zero"));
    }

    #[test]
    fn oversized_junctions_are_hashed_down() {
        let long = "a".repeat(48);
        assert_eq!(
            junction_chain_code(&long),
            <[u8; 32]>::from(Hash::new(long.encode())),
        );
    }

    #[test]
    fn soft_junctions_are_rejected() {
        assert!("/soft".parse::<Suri>().is_err());
        assert!("//Alice/soft".parse::<Suri>().is_err());
    }

    #[test]
    fn password_with_raw_seed_is_rejected() {
        let suri = format!("0x{}///pw", "cd".repeat(32));
        assert!(suri.parse::<Suri>().is_err());
    }

    #[test]
    fn garbage_phrases_are_rejected() {
        assert!("definitely not a bip39 phrase".parse::<Suri>().is_err());
        assert!("0xnothex".parse::<Suri>().is_err());
        assert!(format!("0x{}", "ab".repeat(16)).parse::<Suri>().is_err());
    }

    #[test]
    fn generated_mnemonics_parse_back() {
        let phrase = generate_mnemonic(12).unwrap();
        assert_eq!(phrase.split_whitespace().count(), 12);
        assert!(phrase.parse::<Suri>().is_ok());

        assert!(generate_mnemonic(13).is_err());
    }

    #[test]
    fn debug_is_redacted() {
        let suri: Suri = "//Alice///hunter2".parse().unwrap();
        let rendered = format!("{suri:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("REDACTED"));
    }
}
