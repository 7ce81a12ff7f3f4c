//! Runtime calls the client can encode and decode offline.
//!
//! Pallet and call indices mirror the chain runtime and are fixed by
//! `#[codec(index = ..)]` attributes. A call that decodes here will
//! re-encode to the exact same bytes.

use kestrel_crypto::{AccountId32, Hash};
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::{Balance, Weight};

/// Address of a transaction signer or a transfer destination.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub enum MultiAddress {
    /// A plain 32-byte account id.
    #[codec(index = 0)]
    Id(AccountId32),
    /// An index previously registered on chain.
    #[codec(index = 1)]
    Index(#[codec(compact)] u32),
    /// Raw bytes, interpretation left to the runtime.
    #[codec(index = 2)]
    Raw(Vec<u8>),
    /// A 32-byte value that is not necessarily an account id.
    #[codec(index = 3)]
    Address32([u8; 32]),
    /// A 20-byte value, typically an Ethereum-style address.
    #[codec(index = 4)]
    Address20([u8; 20]),
}

impl From<AccountId32> for MultiAddress {
    fn from(id: AccountId32) -> Self {
        Self::Id(id)
    }
}

/// Position of an extrinsic in the chain, used to identify the
/// multisig operation it opened.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Encode, Decode, Deserialize, Serialize,
)]
#[serde(deny_unknown_fields)]
pub struct Timepoint {
    /// Block number the opening extrinsic was included at.
    pub height: u32,
    /// Index of that extrinsic within the block.
    pub index: u32,
}

impl Timepoint {
    /// Construct from a block number and an extrinsic index.
    pub const fn new(height: u32, index: u32) -> Self {
        Self { height, index }
    }
}

/// A call carried as raw SCALE bytes instead of a decoded value.
///
/// Multisig calls wrap the inner call this way so that a call for a
/// pallet this client does not know can still pass through untouched.
/// On the wire the bytes travel with a compact length prefix.
#[derive(Clone, PartialEq, Eq, Encode, Decode)]
pub struct OpaqueCall(Vec<u8>);

impl OpaqueCall {
    /// Wrap already encoded call bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The wrapped bytes, without the wire length prefix.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Hash identifying the wrapped call in multisig state.
    ///
    /// Computed over the raw call bytes only.
    pub fn hash(&self) -> Hash {
        Hash::new(&self.0)
    }

    /// Unwrap into the raw call bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for OpaqueCall {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl core::fmt::Debug for OpaqueCall {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "OpaqueCall({})", kestrel_crypto::hex_encode(&self.0))
    }
}

/// Calls of the `system` pallet.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub enum SystemCall {
    /// Leave a note on chain. No effect beyond the event.
    #[codec(index = 0)]
    Remark {
        /// Arbitrary bytes to record.
        remark: Vec<u8>,
    },
}

/// Calls of the `balances` pallet.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub enum BalancesCall {
    /// Move funds, allowing the sender to be reaped.
    #[codec(index = 0)]
    Transfer {
        /// Receiving account.
        dest: MultiAddress,
        /// Amount in plancks.
        #[codec(compact)]
        value: Balance,
    },
    /// Move funds but fail instead of reaping the sender.
    #[codec(index = 3)]
    TransferKeepAlive {
        /// Receiving account.
        dest: MultiAddress,
        /// Amount in plancks.
        #[codec(compact)]
        value: Balance,
    },
    /// Move the whole transferable balance.
    #[codec(index = 4)]
    TransferAll {
        /// Receiving account.
        dest: MultiAddress,
        /// Keep enough behind for the sender to stay alive.
        keep_alive: bool,
    },
}

/// Calls of the `multisig` pallet.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub enum MultisigCall {
    /// Immediate dispatch for a 1-of-n multisig. No on-chain state.
    #[codec(index = 0)]
    AsMultiThreshold1 {
        /// The other signatories, sorted.
        other_signatories: Vec<AccountId32>,
        /// The call to dispatch.
        call: OpaqueCall,
    },
    /// Final approval that carries the call and dispatches it.
    #[codec(index = 1)]
    AsMulti {
        /// Approvals required.
        threshold: u16,
        /// The other signatories, sorted.
        other_signatories: Vec<AccountId32>,
        /// Timepoint of the opening extrinsic, absent when opening.
        maybe_timepoint: Option<Timepoint>,
        /// The call to dispatch.
        call: OpaqueCall,
        /// Weight limit for the dispatched call.
        max_weight: Weight,
    },
    /// Approval by call hash, without carrying the call itself.
    #[codec(index = 2)]
    ApproveAsMulti {
        /// Approvals required.
        threshold: u16,
        /// The other signatories, sorted.
        other_signatories: Vec<AccountId32>,
        /// Timepoint of the opening extrinsic, absent when opening.
        maybe_timepoint: Option<Timepoint>,
        /// Hash of the call being approved.
        call_hash: Hash,
        /// Weight limit for the eventual dispatch.
        max_weight: Weight,
    },
    /// Abort an open multisig operation and release the deposit.
    #[codec(index = 3)]
    CancelAsMulti {
        /// Approvals required by the operation being cancelled.
        threshold: u16,
        /// The other signatories, sorted.
        other_signatories: Vec<AccountId32>,
        /// Timepoint of the opening extrinsic.
        timepoint: Timepoint,
        /// Hash of the call being cancelled.
        call_hash: Hash,
    },
}

/// Any call this client understands, tagged with its pallet index.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, derive_more::From)]
pub enum RuntimeCall {
    /// `system` pallet.
    #[codec(index = 0)]
    System(SystemCall),
    /// `balances` pallet.
    #[codec(index = 4)]
    Balances(BalancesCall),
    /// `multisig` pallet.
    #[codec(index = 7)]
    Multisig(MultisigCall),
}

impl RuntimeCall {
    /// Pallet name as spelled in command line arguments and summaries.
    pub const fn pallet_name(&self) -> &'static str {
        match self {
            Self::System(_) => "system",
            Self::Balances(_) => "balances",
            Self::Multisig(_) => "multisig",
        }
    }

    /// Call name as spelled in command line arguments and summaries.
    pub const fn method_name(&self) -> &'static str {
        match self {
            Self::System(SystemCall::Remark { .. }) => "remark",
            Self::Balances(BalancesCall::Transfer { .. }) => "transfer",
            Self::Balances(BalancesCall::TransferKeepAlive { .. }) => "transfer_keep_alive",
            Self::Balances(BalancesCall::TransferAll { .. }) => "transfer_all",
            Self::Multisig(MultisigCall::AsMultiThreshold1 { .. }) => "as_multi_threshold_1",
            Self::Multisig(MultisigCall::AsMulti { .. }) => "as_multi",
            Self::Multisig(MultisigCall::ApproveAsMulti { .. }) => "approve_as_multi",
            Self::Multisig(MultisigCall::CancelAsMulti { .. }) => "cancel_as_multi",
        }
    }
}
