//! Error taxonomy shared by every fatal path in the client crates.
//!
//! Library code returns typed errors; only the binary translates an
//! [`ErrorKind`] into a process exit code.

use kestrel_crypto::Hash;

/// Highest-level classification of a fatal failure, one per exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, displaydoc::Display)]
pub enum ErrorKind {
    /// malformed or inconsistent input
    InvalidInput,
    /// call bytes disagree with their declared hash
    CallHashMismatch,
    /// signing key does not match the envelope address
    SignerMismatch,
    /// chain query failed
    ChainUnavailable,
    /// filesystem operation failed
    FsOperationFailed,
    /// no usable signing key found
    NoAccountFound,
}

impl ErrorKind {
    /// Process exit code reserved for this kind of failure.
    ///
    /// `0` is success; everything else is one of these.
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InvalidInput => 1,
            Self::CallHashMismatch => 2,
            Self::SignerMismatch => 3,
            Self::ChainUnavailable => 4,
            Self::FsOperationFailed => 5,
            Self::NoAccountFound => 6,
        }
    }
}

/// Errors produced while planning, encoding, verifying or signing
/// transactions.
#[derive(Debug, displaydoc::Display, thiserror::Error)]
pub enum Error {
    /// malformed input: {0}
    Input(String),
    /// era period {0} is not a power of two between 4 and 65536
    EraPeriod(u64),
    /// SCALE decoding failed: {0}
    Codec(#[from] parity_scale_codec::Error),
    /// malformed hex or address: {0}
    Parse(#[from] kestrel_crypto::error::ParseError),
    /// cryptographic operation failed: {0}
    Crypto(#[from] kestrel_crypto::Error),
    /// declared call hash {declared} does not match the call bytes, which hash to {computed}
    CallHashMismatch {
        /// Hash the caller or record declared.
        declared: Hash,
        /// Hash recomputed from the call bytes.
        computed: Hash,
    },
    /// the resolved signing key {actual} does not match the envelope address {expected}
    SignerMismatch {
        /// Address the envelope names.
        expected: String,
        /// Address of the key that was about to sign.
        actual: String,
    },
    /// filesystem operation on `{path}` failed
    Fs {
        /// Path of the file that could not be read or written.
        path: String,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// record file does not parse: {0}
    Json(#[from] serde_json::Error),
}

impl Error {
    /// The taxonomy bucket this error belongs to.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Input(_)
            | Self::EraPeriod(_)
            | Self::Codec(_)
            | Self::Parse(_)
            | Self::Crypto(_)
            | Self::Json(_) => ErrorKind::InvalidInput,
            Self::CallHashMismatch { .. } => ErrorKind::CallHashMismatch,
            Self::SignerMismatch { .. } => ErrorKind::SignerMismatch,
            Self::Fs { .. } => ErrorKind::FsOperationFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_stable() {
        assert_eq!(ErrorKind::InvalidInput.exit_code(), 1);
        assert_eq!(ErrorKind::CallHashMismatch.exit_code(), 2);
        assert_eq!(ErrorKind::SignerMismatch.exit_code(), 3);
        assert_eq!(ErrorKind::ChainUnavailable.exit_code(), 4);
        assert_eq!(ErrorKind::FsOperationFailed.exit_code(), 5);
        assert_eq!(ErrorKind::NoAccountFound.exit_code(), 6);
    }

    #[test]
    fn kinds_follow_variants() {
        assert_eq!(
            Error::EraPeriod(100).kind(),
            ErrorKind::InvalidInput
        );
        let mismatch = Error::CallHashMismatch {
            declared: Hash::new(b"a"),
            computed: Hash::new(b"b"),
        };
        assert_eq!(mismatch.kind(), ErrorKind::CallHashMismatch);
        let fs = Error::Fs {
            path: "out.json".to_owned(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert_eq!(fs.kind(), ErrorKind::FsOperationFailed);
    }

    #[test]
    fn display_names_both_hashes() {
        let declared = Hash::new(b"declared");
        let computed = Hash::new(b"computed");
        let message = Error::CallHashMismatch { declared, computed }.to_string();
        assert!(message.contains(&declared.to_string()));
        assert!(message.contains(&computed.to_string()));
    }
}
