//! Encrypted on-disk account store, one JSON file per account.
//!
//! The file layout keeps nothing secret except the seed: the name, the
//! scheme and the address are plain so `account list` works without a
//! password. The seed itself is sealed with the password-derived key
//! from `kestrel_crypto::encryption`.

use std::{
    fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use kestrel_crypto::{
    encryption::{open_seed, seal_seed},
    AccountId32, Algorithm, KeyPair, Ss58Format,
};
use kestrel_data_model::{ErrorKind, HexBytes};
use serde::{Deserialize, Serialize};

/// Failures of the account store.
#[derive(Debug, displaydoc::Display, thiserror::Error)]
pub enum StoreError {
    /// no stored account controls address `{0}`
    NoAccount(String),
    /// an account named `{0}` already exists in the store
    Duplicate(String),
    /// the password does not open the account `{0}`
    BadPassword(String),
    /// account file `{path}` is not readable or writable
    Io {
        /// Path of the offending file.
        path: String,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// account file does not parse: {0}
    Parse(#[from] serde_json::Error),
    /// key material problem: {0}
    Crypto(#[from] kestrel_crypto::Error),
}

impl StoreError {
    /// The taxonomy bucket this error belongs to.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NoAccount(_) | Self::BadPassword(_) => ErrorKind::NoAccountFound,
            Self::Duplicate(_) | Self::Parse(_) | Self::Crypto(_) => ErrorKind::InvalidInput,
            Self::Io { .. } => ErrorKind::FsOperationFailed,
        }
    }

    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// An account as persisted on disk. Doubles as the backup format for
/// `account export` and `--backup`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct StoredAccount {
    /// Operator-chosen label, also the file stem.
    pub name: String,
    /// Signature scheme of the sealed seed.
    pub algorithm: Algorithm,
    /// SS58 address the seed controls.
    pub address: String,
    /// Salt that entered the key derivation.
    pub salt: HexBytes,
    /// Nonce-prefixed ciphertext of the 32-byte seed.
    pub encrypted: HexBytes,
    /// Unix timestamp of creation, in seconds.
    pub created_at: u64,
}

impl StoredAccount {
    /// Seal `key_pair`'s seed under `password` into a storable record.
    ///
    /// # Errors
    ///
    /// [`StoreError::Crypto`] when sealing fails.
    pub fn seal(
        name: &str,
        key_pair: &KeyPair,
        seed: &[u8; 32],
        password: &str,
        format: Ss58Format,
    ) -> Result<Self, StoreError> {
        let sealed = seal_seed(seed, password)?;
        Ok(Self {
            name: name.to_owned(),
            algorithm: key_pair.public_key().algorithm(),
            address: key_pair.public_key().account_id().to_ss58(format),
            salt: HexBytes::from(sealed.salt.to_vec()),
            encrypted: HexBytes::from(sealed.ciphertext),
            created_at: unix_now(),
        })
    }

    /// Recover the key pair, trying the empty password before the
    /// given one. Accounts exported without a password stay usable
    /// without prompting games.
    ///
    /// # Errors
    ///
    /// [`StoreError::BadPassword`] when neither password opens the
    /// seed.
    pub fn unseal(&self, password: &str) -> Result<KeyPair, StoreError> {
        let seed = open_seed(self.salt.as_slice(), self.encrypted.as_slice(), "")
            .or_else(|_| open_seed(self.salt.as_slice(), self.encrypted.as_slice(), password))
            .map_err(|_| StoreError::BadPassword(self.name.clone()))?;
        Ok(KeyPair::from_seed(seed, self.algorithm)?)
    }

    /// Whether the empty password opens this account.
    pub fn opens_without_password(&self) -> bool {
        open_seed(self.salt.as_slice(), self.encrypted.as_slice(), "").is_ok()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

/// Directory-backed collection of [`StoredAccount`] files.
#[derive(Debug, Clone)]
pub struct AccountStore {
    dir: PathBuf,
}

impl AccountStore {
    /// Store rooted at `dir`. The directory is created lazily on the
    /// first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Persist a new account.
    ///
    /// # Errors
    ///
    /// [`StoreError::Duplicate`] when the name is taken,
    /// [`StoreError::Io`] on filesystem failure.
    pub fn save(&self, account: &StoredAccount) -> Result<PathBuf, StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::io(&self.dir, source))?;
        let path = self.path_for(&account.name);
        if path.exists() {
            return Err(StoreError::Duplicate(account.name.clone()));
        }
        let json = serde_json::to_string_pretty(account)?;
        fs::write(&path, json).map_err(|source| StoreError::io(&path, source))?;
        Ok(path)
    }

    /// All stored accounts, sorted by name.
    ///
    /// Non-account files in the directory are skipped silently, the
    /// keystore directory is not required to be exclusively ours.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] when the directory exists but cannot be read.
    pub fn list(&self) -> Result<Vec<StoredAccount>, StoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.dir).map_err(|source| StoreError::io(&self.dir, source))?;
        let mut accounts = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::io(&self.dir, source))?;
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            if let Ok(account) = serde_json::from_str::<StoredAccount>(&content) {
                accounts.push(account);
            }
        }
        accounts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(accounts)
    }

    /// Find the account controlling `address`, compared by account id
    /// so the SS58 format the address was rendered in does not matter.
    ///
    /// # Errors
    ///
    /// [`StoreError::NoAccount`] when nothing in the store matches.
    pub fn find_by_address(&self, account_id: AccountId32) -> Result<StoredAccount, StoreError> {
        self.list()?
            .into_iter()
            .find(|account| {
                AccountId32::from_ss58(&account.address)
                    .is_ok_and(|(stored, _)| stored == account_id)
            })
            .ok_or_else(|| StoreError::NoAccount(account_id.to_string()))
    }

    /// Copy the account file for `account_id` to `destination`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NoAccount`] when the account is not stored,
    /// [`StoreError::Io`] when the copy fails.
    pub fn export(&self, account_id: AccountId32, destination: &Path) -> Result<(), StoreError> {
        let account = self.find_by_address(account_id)?;
        let source = self.path_for(&account.name);
        fs::copy(&source, destination)
            .map(|_| ())
            .map_err(|source| StoreError::io(destination, source))
    }

    /// Delete the account file for `account_id`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NoAccount`] when the account is not stored,
    /// [`StoreError::Io`] when the deletion fails.
    pub fn forget(&self, account_id: AccountId32) -> Result<StoredAccount, StoreError> {
        let account = self.find_by_address(account_id)?;
        let path = self.path_for(&account.name);
        fs::remove_file(&path).map_err(|source| StoreError::io(&path, source))?;
        Ok(account)
    }

    /// Read a single backup file, the `--backup` signing source.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] when the file cannot be read,
    /// [`StoreError::Parse`] when it is not an account file.
    pub fn read_backup(path: &Path) -> Result<StoredAccount, StoreError> {
        let content = fs::read_to_string(path).map_err(|source| StoreError::io(path, source))?;
        Ok(serde_json::from_str(&content)?)
    }
}
