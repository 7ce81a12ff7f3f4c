//! Client configuration, loaded from a JSON5 file with environment
//! overrides.

use std::path::{Path, PathBuf};

use kestrel_crypto::Ss58Format;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// Environment variable naming the node endpoint.
pub const URL_ENV: &str = "KESTREL_RPC_URL";
/// Environment variable naming the keystore directory.
pub const KEYSTORE_ENV: &str = "KESTREL_KEYSTORE";
/// Endpoint used when neither the config file nor the environment
/// names one.
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9933";

/// Resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase", default)]
pub struct Config {
    /// HTTP JSON-RPC endpoint of the node.
    pub rpc_url: Url,
    /// SS58 format addresses are rendered in.
    pub ss58_format: Ss58Format,
    /// Directory holding the encrypted account files.
    pub keystore_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL
                .parse()
                .expect("default endpoint is a valid url"),
            ss58_format: Ss58Format::KESTREL,
            keystore_dir: default_keystore_dir(),
        }
    }
}

fn default_keystore_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map_or_else(|| PathBuf::from("."), PathBuf::from)
        .join(".kestrel")
        .join("accounts")
}

impl Config {
    /// Load the file at `path`, then apply environment overrides.
    ///
    /// A missing file is not an error, the defaults are used. JSON5 is
    /// accepted, so the file may carry comments and trailing commas.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when the file or an override does not parse.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|err| {
                Error::Config(format!("cannot read `{}`: {err}", path.display()))
            })?;
            json5::from_str(&raw).map_err(|err| {
                Error::Config(format!("`{}` does not parse: {err}", path.display()))
            })?
        } else {
            Self::default()
        };
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), Error> {
        if let Ok(raw) = std::env::var(URL_ENV) {
            self.rpc_url = raw
                .parse()
                .map_err(|err| Error::Config(format!("{URL_ENV}=`{raw}` is not a url: {err}")))?;
        }
        if let Ok(raw) = std::env::var(KEYSTORE_ENV) {
            self.keystore_dir = PathBuf::from(raw);
        }
        Ok(())
    }
}
