//! Password sealing of secret seeds for the on-disk keystore.
//!
//! A fresh random salt feeds HKDF-SHA256 together with the password to
//! produce a ChaCha20-Poly1305 key. The sealed blob is the random
//! nonce followed by the ciphertext, so a record is fully described by
//! its salt and that blob.

use aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use hkdf::Hkdf;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::Error;

/// Length of the random salt stored next to each sealed seed.
pub const SALT_LENGTH: usize = 32;
/// Length of the nonce prefixed to the ciphertext.
const NONCE_LENGTH: usize = 12;
/// Domain separation for the key derivation step.
const KEY_INFO: &[u8] = b"kestrel keystore seal v1";

/// Output of [`seal_seed`]: the salt that entered the key derivation
/// and the nonce-prefixed ciphertext.
#[derive(Debug, Clone)]
pub struct SealedSeed {
    /// Random salt fed to HKDF-SHA256.
    pub salt: [u8; SALT_LENGTH],
    /// Nonce followed by the ChaCha20-Poly1305 ciphertext.
    pub ciphertext: Vec<u8>,
}

/// Seal a 32-byte secret seed under `password`.
///
/// An empty password is a valid (if weak) password, the caller decides
/// whether to allow it.
///
/// # Errors
/// Fails if the underlying cipher rejects the operation.
pub fn seal_seed(seed: &[u8; 32], password: &str) -> Result<SealedSeed, Error> {
    let mut salt = [0; SALT_LENGTH];
    OsRng.fill_bytes(&mut salt);

    let mut nonce = [0; NONCE_LENGTH];
    OsRng.fill_bytes(&mut nonce);

    let mut key = derive_key(&salt, password);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), seed.as_slice())
        .map_err(|err| Error::Encryption(err.to_string()));
    key.zeroize();

    let mut ciphertext = nonce.to_vec();
    ciphertext.extend_from_slice(&sealed?);
    Ok(SealedSeed { salt, ciphertext })
}

/// Open a seed previously sealed with [`seal_seed`].
///
/// # Errors
/// Fails with [`Error::Decryption`] when the password is wrong or the
/// blob is corrupt.
pub fn open_seed(salt: &[u8], ciphertext: &[u8], password: &str) -> Result<[u8; 32], Error> {
    if ciphertext.len() <= NONCE_LENGTH {
        return Err(Error::Decryption);
    }
    let (nonce, sealed) = ciphertext.split_at(NONCE_LENGTH);

    let mut key = derive_key(salt, password);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
    let opened = cipher.decrypt(Nonce::from_slice(nonce), sealed);
    key.zeroize();

    let mut opened = opened.map_err(|_| Error::Decryption)?;
    let seed = <[u8; 32]>::try_from(opened.as_slice()).map_err(|_| Error::Decryption);
    opened.zeroize();
    seed
}

fn derive_key(salt: &[u8], password: &str) -> [u8; 32] {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), password.as_bytes());
    let mut key = [0; 32];
    hkdf.expand(KEY_INFO, &mut key)
        .expect("32 bytes is a valid HKDF-SHA256 output length");
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seals_and_opens_with_the_right_password() {
        let seed = [7; 32];
        let sealed = seal_seed(&seed, "hunter2").unwrap();
        assert_eq!(
            open_seed(&sealed.salt, &sealed.ciphertext, "hunter2").unwrap(),
            seed
        );
    }

    #[test]
    fn empty_password_is_a_valid_password() {
        let seed = [42; 32];
        let sealed = seal_seed(&seed, "").unwrap();
        assert_eq!(
            open_seed(&sealed.salt, &sealed.ciphertext, "").unwrap(),
            seed
        );
        assert!(matches!(
            open_seed(&sealed.salt, &sealed.ciphertext, "guess"),
            Err(Error::Decryption)
        ));
    }

    #[test]
    fn wrong_password_and_tampering_fail_closed() {
        let sealed = seal_seed(&[1; 32], "correct").unwrap();

        assert!(matches!(
            open_seed(&sealed.salt, &sealed.ciphertext, "wrong"),
            Err(Error::Decryption)
        ));

        let mut tampered = sealed.ciphertext.clone();
        let last = tampered.last_mut().unwrap();
        *last ^= 0x01;
        assert!(matches!(
            open_seed(&sealed.salt, &tampered, "correct"),
            Err(Error::Decryption)
        ));

        assert!(matches!(
            open_seed(&[0; SALT_LENGTH], &sealed.ciphertext, "correct"),
            Err(Error::Decryption)
        ));

        assert!(matches!(
            open_seed(&sealed.salt, &[0; 5], "correct"),
            Err(Error::Decryption)
        ));
    }

    #[test]
    fn sealing_twice_produces_distinct_blobs() {
        let seed = [9; 32];
        let first = seal_seed(&seed, "pw").unwrap();
        let second = seal_seed(&seed, "pw").unwrap();
        // Fresh salt and nonce every time.
        assert_ne!(first.salt, second.salt);
        assert_ne!(first.ciphertext, second.ciphertext);
    }
}
