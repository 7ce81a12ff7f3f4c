use ed25519_dalek::Signature;
use rand::rngs::OsRng;
use signature::{Signer as _, Verifier as _};

use crate::{
    error::{Error, ParseError},
    KeyGenOption,
};

pub type PublicKey = ed25519_dalek::VerifyingKey;
pub type PrivateKey = ed25519_dalek::SigningKey;

#[derive(Debug, Clone, Copy)]
pub struct Ed25519Sha512;

impl Ed25519Sha512 {
    pub fn keypair(option: KeyGenOption<PrivateKey>) -> Result<(PublicKey, PrivateKey), ParseError> {
        let signing_key = match option {
            KeyGenOption::Random => PrivateKey::generate(&mut OsRng),
            KeyGenOption::UseSeed(seed) => PrivateKey::from_bytes(&seed),
            KeyGenOption::FromPrivateKey(key) => key,
        };
        Ok((signing_key.verifying_key(), signing_key))
    }

    pub fn parse_public_key(payload: &[u8]) -> Result<PublicKey, ParseError> {
        if payload.len() != ed25519_dalek::PUBLIC_KEY_LENGTH {
            return Err(ParseError(format!(
                "ed25519 public key must be {} bytes, got {}",
                ed25519_dalek::PUBLIC_KEY_LENGTH,
                payload.len()
            )));
        }
        PublicKey::from_bytes(arrayref::array_ref!(
            payload,
            0,
            ed25519_dalek::PUBLIC_KEY_LENGTH
        ))
        .map_err(|err| ParseError(err.to_string()))
    }

    pub fn parse_private_key(payload: &[u8]) -> Result<PrivateKey, ParseError> {
        <[u8; 32]>::try_from(payload)
            .map(|seed| PrivateKey::from_bytes(&seed))
            .map_err(|_| {
                ParseError(format!(
                    "ed25519 secret seed must be 32 bytes, got {}",
                    payload.len()
                ))
            })
    }

    pub fn sign(message: &[u8], sk: &PrivateKey) -> Vec<u8> {
        sk.sign(message).to_bytes().to_vec()
    }

    pub fn verify(message: &[u8], signature: &[u8], pk: &PublicKey) -> Result<(), Error> {
        let s = Signature::try_from(signature).map_err(|e| ParseError(e.to_string()))?;
        pk.verify(message, &s).map_err(|_| Error::BadSignature)
    }
}
