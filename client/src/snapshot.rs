//! Point-in-time chain snapshot and the unsigned envelope built from
//! it.
//!
//! The snapshot is captured in a single pass over the chain collaborator
//! and is immutable afterwards. Building an envelope from it is pure,
//! so several envelopes for the same account can be produced from one
//! snapshot by varying the nonce increment.

use getset::{CopyGetters, Getters};
use kestrel_crypto::{AccountId32, Hash, Ss58Format};
use kestrel_data_model::{
    era::{Era, DEFAULT_ERA_PERIOD},
    extrinsic::{UnsignedTransaction, EXTRINSIC_FORMAT_VERSION, SIGNED_EXTENSIONS},
    Balance, BlockNumber, HexBytes, Nonce,
};

use crate::{chain::ChainApi, Error};

/// Everything an offline envelope needs from the chain, captured once.
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct ChainSnapshot {
    /// Account the snapshot was taken for.
    #[getset(get_copy = "pub")]
    signer: AccountId32,
    /// Hash of block zero.
    #[getset(get_copy = "pub")]
    genesis_hash: Hash,
    /// Finalized head at capture time, the mortality checkpoint.
    #[getset(get_copy = "pub")]
    block_hash: Hash,
    /// Number of the checkpoint block.
    #[getset(get_copy = "pub")]
    block_number: BlockNumber,
    /// Raw runtime metadata at the checkpoint block.
    #[getset(get = "pub")]
    metadata: Vec<u8>,
    /// Runtime spec version.
    #[getset(get_copy = "pub")]
    spec_version: u32,
    /// Transaction format version.
    #[getset(get_copy = "pub")]
    transaction_version: u32,
    /// On-chain nonce of the signer at capture time.
    #[getset(get_copy = "pub")]
    nonce: Nonce,
    /// Free balance of the signer, surfaced for operator sanity checks.
    #[getset(get_copy = "pub")]
    free_balance: Balance,
}

impl ChainSnapshot {
    /// Capture a snapshot for `signer` in one pass over the chain.
    ///
    /// Reads only, never mutates chain state.
    ///
    /// # Errors
    ///
    /// [`Error::Chain`] when any of the queries fails. Nothing is
    /// retried, a half-captured snapshot is never returned.
    pub fn capture(api: &dyn ChainApi, signer: AccountId32) -> Result<Self, Error> {
        let genesis_hash = api.genesis_hash()?;
        let block_hash = api.finalized_head()?;
        let block_number = api.block_number(block_hash)?;
        let metadata = api.metadata(block_hash)?;
        let version = api.runtime_version()?;
        let account = api.account_info(&signer)?;
        Ok(Self {
            signer,
            genesis_hash,
            block_hash,
            block_number,
            metadata,
            spec_version: version.spec_version,
            transaction_version: version.transaction_version,
            nonce: account.nonce,
            free_balance: account.free,
        })
    }

    /// Build the unsigned envelope for `method_bytes` from this
    /// snapshot.
    ///
    /// # Errors
    ///
    /// [`Error::Core`] wrapping an era period rejection when
    /// `options.era_period` is not a power of two in `[4, 65536]`.
    pub fn build_unsigned(
        &self,
        method_bytes: Vec<u8>,
        options: &EnvelopeOptions,
        ss58_format: Ss58Format,
    ) -> Result<UnsignedTransaction, Error> {
        let period = match options.era_period {
            Some(period) => Era::validate_period(period)?,
            None => DEFAULT_ERA_PERIOD,
        };
        let era = Era::mortal(period, u64::from(self.block_number));

        Ok(UnsignedTransaction {
            address: self.signer.to_ss58(ss58_format),
            block_hash: self.block_hash,
            block_number: self.block_number,
            era,
            genesis_hash: self.genesis_hash,
            metadata_rpc: HexBytes::from(self.metadata.clone()),
            method: HexBytes::from(method_bytes),
            nonce: self.nonce + options.nonce_increment,
            spec_version: self.spec_version,
            tip: options.tip,
            transaction_version: self.transaction_version,
            signed_extensions: SIGNED_EXTENSIONS.iter().map(ToString::to_string).collect(),
            version: EXTRINSIC_FORMAT_VERSION,
        })
    }
}

/// Caller-supplied knobs of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnvelopeOptions {
    /// Added to the on-chain nonce, so several envelopes can be
    /// constructed from one account before any of them is submitted.
    /// Sequencing the increments is the caller's responsibility.
    pub nonce_increment: Nonce,
    /// Mortality window in blocks. `None` applies the default of 64.
    pub era_period: Option<u64>,
    /// Priority fee, in base units.
    pub tip: Balance,
}
