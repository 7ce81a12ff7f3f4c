use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use crate::{
    error::{Error, ParseError},
    Hash, KeyGenOption,
};

pub const SIGNATURE_LENGTH: usize = 65;

pub type PublicKey = k256::PublicKey;
pub type PrivateKey = k256::SecretKey;

#[derive(Debug, Clone, Copy)]
pub struct EcdsaSecp256k1;

impl EcdsaSecp256k1 {
    pub fn keypair(option: KeyGenOption<PrivateKey>) -> Result<(PublicKey, PrivateKey), ParseError> {
        let secret = match option {
            KeyGenOption::Random => PrivateKey::random(&mut OsRng),
            KeyGenOption::UseSeed(seed) => PrivateKey::from_slice(&seed).map_err(|err| {
                ParseError(format!("seed is not a valid secp256k1 scalar: {err}"))
            })?,
            KeyGenOption::FromPrivateKey(key) => key,
        };
        Ok((secret.public_key(), secret))
    }

    pub fn parse_public_key(payload: &[u8]) -> Result<PublicKey, ParseError> {
        PublicKey::from_sec1_bytes(payload).map_err(|err| ParseError(err.to_string()))
    }

    pub fn parse_private_key(payload: &[u8]) -> Result<PrivateKey, ParseError> {
        PrivateKey::from_slice(payload).map_err(|err| ParseError(err.to_string()))
    }

    /// Sign the blake2b-256 digest of `message`, producing the 65-byte
    /// `r || s || v` form the runtime expects.
    pub fn sign(message: &[u8], sk: &PrivateKey) -> Result<Vec<u8>, Error> {
        let digest: [u8; Hash::LENGTH] = Hash::new(message).into();
        let (signature, recovery_id) = SigningKey::from(sk)
            .sign_prehash_recoverable(&digest)
            .map_err(|err| Error::Signing(err.to_string()))?;

        let mut bytes = Vec::with_capacity(SIGNATURE_LENGTH);
        bytes.extend_from_slice(&signature.to_bytes());
        bytes.push(recovery_id.to_byte());
        Ok(bytes)
    }

    /// Recover the signer from the signature and compare it to `pk`,
    /// mirroring on-chain verification.
    pub fn verify(message: &[u8], signature: &[u8], pk: &PublicKey) -> Result<(), Error> {
        if signature.len() != SIGNATURE_LENGTH {
            return Err(Error::Signing(format!(
                "ecdsa signature must be {SIGNATURE_LENGTH} bytes, got {}",
                signature.len()
            )));
        }
        let recovery_id = RecoveryId::from_byte(signature[SIGNATURE_LENGTH - 1])
            .ok_or_else(|| Error::Signing("invalid ecdsa recovery byte".to_owned()))?;
        let signature = Signature::from_slice(&signature[..SIGNATURE_LENGTH - 1])
            .map_err(|err| Error::Signing(err.to_string()))?;

        let digest: [u8; Hash::LENGTH] = Hash::new(message).into();
        let recovered = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id)
            .map_err(|_| Error::BadSignature)?;

        if recovered == VerifyingKey::from(pk) {
            Ok(())
        } else {
            Err(Error::BadSignature)
        }
    }
}
