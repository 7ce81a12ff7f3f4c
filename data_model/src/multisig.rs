//! Planning of multisig lifecycle steps.
//!
//! A step is planned offline from the signatory set and the wrapped
//! call or its hash. The derived multisig account only depends on the
//! membership and the threshold, never on who performs the step.

use getset::{CopyGetters, Getters};
use kestrel_crypto::{AccountId32, Hash};
use kestrel_logger::warn;
use serde::{Deserialize, Serialize};

use crate::{
    call::{MultisigCall, OpaqueCall, RuntimeCall, Timepoint},
    Error, Weight,
};

/// A signer together with the rest of the multisig membership.
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct SignatorySet {
    /// The account performing the current step.
    #[getset(get_copy = "pub")]
    signer: AccountId32,
    /// The remaining signatories, sorted.
    #[getset(get = "pub")]
    other_signatories: Vec<AccountId32>,
    /// Approvals required to dispatch.
    #[getset(get_copy = "pub")]
    threshold: u16,
}

impl SignatorySet {
    /// Validates and sorts a signatory set.
    ///
    /// # Errors
    ///
    /// [`Error::Input`] when the set is empty or contains duplicates,
    /// when the signer is listed twice, or when the threshold does not
    /// fit the membership.
    pub fn new(
        signer: AccountId32,
        other_signatories: impl IntoIterator<Item = AccountId32>,
        threshold: u16,
    ) -> Result<Self, Error> {
        let mut other_signatories: Vec<AccountId32> = other_signatories.into_iter().collect();
        other_signatories.sort_unstable();
        if other_signatories.is_empty() {
            return Err(Error::Input(
                "a multisig needs at least one other signatory".to_owned(),
            ));
        }
        if other_signatories.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(Error::Input(
                "the other signatories contain a duplicate".to_owned(),
            ));
        }
        if other_signatories.contains(&signer) {
            return Err(Error::Input(
                "the signer cannot appear among the other signatories".to_owned(),
            ));
        }
        if threshold == 0 {
            return Err(Error::Input(
                "a multisig threshold of zero is meaningless".to_owned(),
            ));
        }
        let total = other_signatories.len() + 1;
        if usize::from(threshold) > total {
            return Err(Error::Input(format!(
                "threshold {threshold} exceeds the {total} signatories"
            )));
        }
        Ok(Self {
            signer,
            other_signatories,
            threshold,
        })
    }

    /// The account the chain derives for this membership.
    pub fn multisig_account_id(&self) -> AccountId32 {
        let mut all = self.other_signatories.clone();
        all.push(self.signer);
        kestrel_crypto::multisig::multi_account_id(&all, self.threshold)
    }
}

/// Multisig parameters as they appear in a params file or on the
/// command line. Everything is optional, merging and validation happen
/// once both sources are in hand.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct MultisigParams {
    /// Approvals required to dispatch.
    pub threshold: Option<u16>,
    /// The other signatories, as SS58 addresses.
    pub other_signatories: Option<Vec<String>>,
    /// Hash of the wrapped call.
    pub call_hash: Option<Hash>,
    /// Weight limit for the dispatch.
    pub max_weight: Option<Weight>,
    /// Timepoint of the opening extrinsic.
    pub timepoint: Option<Timepoint>,
}

impl MultisigParams {
    /// Builds the signatory set for `signer` from these parameters.
    ///
    /// # Errors
    ///
    /// [`Error::Input`] when the threshold or the other signatories are
    /// missing or do not form a valid set.
    pub fn signatory_set(&self, signer: AccountId32) -> Result<SignatorySet, Error> {
        let threshold = self
            .threshold
            .ok_or_else(|| Error::Input("a multisig threshold is required".to_owned()))?;
        let other_signatories = self
            .other_signatories
            .as_ref()
            .ok_or_else(|| Error::Input("the other signatories are required".to_owned()))?
            .iter()
            .map(|address| Ok(AccountId32::from_ss58(address)?.0))
            .collect::<Result<Vec<_>, Error>>()?;
        SignatorySet::new(signer, other_signatories, threshold)
    }

    /// The timepoint, which steps against an open operation must have.
    ///
    /// # Errors
    ///
    /// [`Error::Input`] when no timepoint is known.
    pub fn required_timepoint(&self) -> Result<Timepoint, Error> {
        self.timepoint.ok_or_else(|| {
            Error::Input(
                "a timepoint is required to continue an open multisig operation".to_owned(),
            )
        })
    }
}

/// Merges parameters loaded from a file with freshly supplied ones.
///
/// Fresh values win. A disagreement on anything except the call hash
/// is logged and tolerated. Disagreeing call hashes are refused
/// outright, there is no safe way to pick one.
///
/// # Errors
///
/// [`Error::CallHashMismatch`] when both sources declare a call hash
/// and they differ.
pub fn merge_params(file: MultisigParams, fresh: MultisigParams) -> Result<MultisigParams, Error> {
    let call_hash = match (file.call_hash, fresh.call_hash) {
        (Some(stale), Some(new)) if stale != new => {
            return Err(Error::CallHashMismatch {
                declared: stale,
                computed: new,
            });
        }
        (stale, new) => new.or(stale),
    };
    Ok(MultisigParams {
        threshold: supersede("threshold", file.threshold, fresh.threshold),
        other_signatories: supersede(
            "otherSignatories",
            file.other_signatories,
            fresh.other_signatories,
        ),
        call_hash,
        max_weight: supersede("maxWeight", file.max_weight, fresh.max_weight),
        timepoint: fresh.timepoint.or(file.timepoint),
    })
}

fn supersede<T: PartialEq + core::fmt::Debug>(
    field: &str,
    stale: Option<T>,
    fresh: Option<T>,
) -> Option<T> {
    match (stale, fresh) {
        (Some(stale), Some(fresh)) => {
            if stale != fresh {
                warn!(%field, ?stale, ?fresh, "params file value superseded by a fresh one");
            }
            Some(fresh)
        }
        (stale, fresh) => fresh.or(stale),
    }
}

/// A planned multisig step: the call to put in an envelope plus the
/// derived facts worth persisting next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigPlan {
    /// The multisig pallet call to wrap in an envelope.
    pub call: RuntimeCall,
    /// The multisig account the operation belongs to.
    pub multisig_address: AccountId32,
    /// Hash identifying the wrapped call on chain.
    pub call_hash: Hash,
    /// The wrapped call bytes, when this step carries them.
    pub wrapped_call: Option<OpaqueCall>,
    /// Timepoint of the opening extrinsic, once one exists.
    pub timepoint: Option<Timepoint>,
}

impl MultisigPlan {
    /// Plans the opening step.
    ///
    /// With a threshold of one the call dispatches immediately through
    /// `as_multi_threshold_1`. Otherwise the opening step approves by
    /// hash and later steps carry the call.
    ///
    /// # Errors
    ///
    /// [`Error::Input`] when the call is empty,
    /// [`Error::CallHashMismatch`] when `declared_hash` disagrees with
    /// the call bytes.
    pub fn initiate(
        set: &SignatorySet,
        call: OpaqueCall,
        declared_hash: Option<Hash>,
        max_weight: Weight,
    ) -> Result<Self, Error> {
        if call.as_bytes().is_empty() {
            return Err(Error::Input(
                "refusing to open a multisig operation over an empty call".to_owned(),
            ));
        }
        let call_hash = call.hash();
        check_declared(declared_hash, call_hash)?;
        let planned = if set.threshold() == 1 {
            MultisigCall::AsMultiThreshold1 {
                other_signatories: set.other_signatories().clone(),
                call: call.clone(),
            }
        } else {
            MultisigCall::ApproveAsMulti {
                threshold: set.threshold(),
                other_signatories: set.other_signatories().clone(),
                maybe_timepoint: None,
                call_hash,
                max_weight,
            }
        };
        Ok(Self {
            call: planned.into(),
            multisig_address: set.multisig_account_id(),
            call_hash,
            wrapped_call: Some(call),
            timepoint: None,
        })
    }

    /// Plans an intermediate approval against an open operation.
    ///
    /// # Errors
    ///
    /// [`Error::Input`] when the threshold is one, such operations
    /// dispatch at the opening step and cannot be approved further.
    pub fn approve(
        set: &SignatorySet,
        call_hash: Hash,
        timepoint: Timepoint,
        max_weight: Weight,
    ) -> Result<Self, Error> {
        if set.threshold() == 1 {
            return Err(Error::Input(
                "a 1-of-n multisig needs no further approvals, the call dispatched when the operation was opened".to_owned(),
            ));
        }
        Ok(Self {
            call: MultisigCall::ApproveAsMulti {
                threshold: set.threshold(),
                other_signatories: set.other_signatories().clone(),
                maybe_timepoint: Some(timepoint),
                call_hash,
                max_weight,
            }
            .into(),
            multisig_address: set.multisig_account_id(),
            call_hash,
            wrapped_call: None,
            timepoint: Some(timepoint),
        })
    }

    /// Plans the final approval, which carries the call and dispatches
    /// it once the threshold is met.
    ///
    /// # Errors
    ///
    /// [`Error::Input`] when the threshold is one or the call is empty,
    /// [`Error::CallHashMismatch`] when `declared_hash` disagrees with
    /// the call bytes.
    pub fn final_approve(
        set: &SignatorySet,
        call: OpaqueCall,
        declared_hash: Option<Hash>,
        timepoint: Timepoint,
        max_weight: Weight,
    ) -> Result<Self, Error> {
        if set.threshold() == 1 {
            return Err(Error::Input(
                "a 1-of-n multisig dispatches at the opening step through as_multi_threshold_1, there is nothing to finalize".to_owned(),
            ));
        }
        if call.as_bytes().is_empty() {
            return Err(Error::Input(
                "the final approval must carry the call it dispatches".to_owned(),
            ));
        }
        let call_hash = call.hash();
        check_declared(declared_hash, call_hash)?;
        Ok(Self {
            call: MultisigCall::AsMulti {
                threshold: set.threshold(),
                other_signatories: set.other_signatories().clone(),
                maybe_timepoint: Some(timepoint),
                call: call.clone(),
                max_weight,
            }
            .into(),
            multisig_address: set.multisig_account_id(),
            call_hash,
            wrapped_call: Some(call),
            timepoint: Some(timepoint),
        })
    }
}

fn check_declared(declared: Option<Hash>, computed: Hash) -> Result<(), Error> {
    match declared {
        Some(declared) if declared != computed => {
            Err(Error::CallHashMismatch { declared, computed })
        }
        _ => Ok(()),
    }
}
