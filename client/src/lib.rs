//! Chain access for the Kestrel command line tools.
//!
//! Everything that needs a live node lives here: the [`ChainApi`]
//! collaborator trait, its JSON-RPC implementation, the point-in-time
//! [`snapshot::ChainSnapshot`] an offline transaction is built from,
//! and the client configuration.

pub mod chain;
pub mod config;
pub mod rpc;
pub mod snapshot;

pub use chain::{AccountInfo, ChainApi, RuntimeVersion};
pub use config::Config;
pub use rpc::RpcClient;
pub use snapshot::{ChainSnapshot, EnvelopeOptions};

use kestrel_data_model::ErrorKind;

/// Errors of the chain access layer.
///
/// Chain failures are fatal at this layer. Whether a retry makes sense
/// is for the caller to decide, one construct invocation is one
/// snapshot.
#[derive(Debug, displaydoc::Display, thiserror::Error)]
pub enum Error {
    /// chain query `{method}` failed: {reason}
    Chain {
        /// RPC method that failed.
        method: &'static str,
        /// Transport or node-side failure description.
        reason: String,
    },
    /// configuration problem: {0}
    Config(String),
    /// transaction construction failed
    Core(#[from] kestrel_data_model::Error),
}

impl Error {
    pub(crate) fn chain(method: &'static str, reason: impl ToString) -> Self {
        Self::Chain {
            method,
            reason: reason.to_string(),
        }
    }

    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Chain { .. } => ErrorKind::ChainUnavailable,
            Self::Config(_) => ErrorKind::InvalidInput,
            Self::Core(core) => core.kind(),
        }
    }
}
