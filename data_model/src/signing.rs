//! Offline verification and signing of persisted transaction records.
//!
//! Runs on the machine that holds the key, with no chain access. A
//! record is never signed before [`verify`] has reproduced the signing
//! payload from the envelope, confirmed the signer, and cross-checked
//! any multisig call hash against the wrapped call bytes it claims to
//! approve. Every mismatch aborts before the key touches anything.

use kestrel_crypto::{AccountId32, Hash, KeyPair, PublicKey};
use parity_scale_codec::{DecodeAll, Encode};
use serde::{Deserialize, Serialize};

use crate::{
    call::{MultiAddress, MultisigCall, OpaqueCall, RuntimeCall, Timepoint},
    era::Era,
    extrinsic::{MultiSignature, SignedExtrinsic},
    multisig::SignatorySet,
    record::{MultisigTxData, SignedTransactionOutput, TransactionRecord},
    Balance, Error, HexBytes, Nonce,
};

/// What a signature over a record would actually approve, decoded
/// entirely from the record itself.
///
/// This is the summary shown to the operator for confirmation, and it
/// is persisted in the signed output as an audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SigningIntent {
    /// Signer address the envelope names.
    pub address: String,
    /// Pallet of the dispatched call.
    pub pallet: String,
    /// Method of the dispatched call.
    pub method: String,
    /// SCALE encoded call bytes.
    pub call: HexBytes,
    /// Mortality window of the transaction.
    pub era: Era,
    /// Signer nonce the transaction consumes.
    pub nonce: Nonce,
    /// Priority fee, in base units.
    #[serde(with = "crate::extrinsic::balance_string")]
    pub tip: Balance,
    /// Multisig facts, present when the call is a multisig operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multisig: Option<MultisigIntent>,
}

/// The multisig-specific half of a [`SigningIntent`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct MultisigIntent {
    /// Account the signatories jointly control, re-derived from the
    /// decoded membership rather than taken from the record.
    pub multisig_address: AccountId32,
    /// Approvals required to dispatch.
    pub threshold: u16,
    /// Timepoint of the opening extrinsic. Absent means this signature
    /// opens the operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timepoint: Option<Timepoint>,
    /// Hash of the call being approved.
    pub call_hash: Hash,
    /// The wrapped call bytes, when the record carries them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrapped_call: Option<HexBytes>,
    /// `pallet.method` of the wrapped call, when this client can
    /// decode it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrapped_method: Option<String>,
}

/// Check a record against the key that is about to sign it and decode
/// what the signature would approve.
///
/// # Errors
///
/// [`Error::SignerMismatch`] when `public_key` does not control the
/// envelope's address, [`Error::Input`] when the persisted payload
/// disagrees with the envelope or the record shape is inconsistent,
/// [`Error::CallHashMismatch`] when the wrapped call does not hash to
/// the call-hash argument decoded from the payload.
pub fn verify(record: &TransactionRecord, public_key: &PublicKey) -> Result<SigningIntent, Error> {
    let (expected, format) = AccountId32::from_ss58(&record.unsigned.address)?;
    let actual = public_key.account_id();
    if actual != expected {
        return Err(Error::SignerMismatch {
            expected: record.unsigned.address.clone(),
            actual: actual.to_ss58(format),
        });
    }

    let payload = record.unsigned.signing_payload()?;
    if record.signing_payload.as_slice() != payload.encode().as_slice() {
        return Err(Error::Input(
            "the persisted signing payload does not match the one derived from the envelope"
                .to_owned(),
        ));
    }

    let multisig = match &payload.call {
        RuntimeCall::Multisig(call) => Some(multisig_intent(
            call,
            actual,
            record.multisig_tx_data.as_ref(),
        )?),
        _ if record.multisig_tx_data.is_some() => {
            return Err(Error::Input(
                "the record carries multisig data but the call is not a multisig operation"
                    .to_owned(),
            ));
        }
        _ => None,
    };

    Ok(SigningIntent {
        address: record.unsigned.address.clone(),
        pallet: payload.call.pallet_name().to_owned(),
        method: payload.call.method_name().to_owned(),
        call: record.unsigned.method.clone(),
        era: payload.extra.era,
        nonce: payload.extra.nonce,
        tip: payload.extra.tip,
        multisig,
    })
}

/// Verify a record and sign it, producing the wire-ready extrinsic.
///
/// The signature is only produced after [`verify`] passed in full. The
/// signed extrinsic is re-decoded from its own wire bytes before the
/// hash is reported, so the output is known to parse.
///
/// # Errors
///
/// Everything [`verify`] reports, plus [`Error::Crypto`] when the
/// scheme rejects the signing operation.
pub fn sign(record: &TransactionRecord, key_pair: &KeyPair) -> Result<SignedTransactionOutput, Error> {
    let intent = verify(record, key_pair.public_key())?;
    let payload = record.unsigned.signing_payload()?;

    let raw = key_pair.sign(&payload.signable_bytes())?;
    let signature = MultiSignature::from_parts(key_pair.algorithm(), &raw)?;

    let extrinsic = SignedExtrinsic {
        address: MultiAddress::Id(key_pair.public_key().account_id()),
        signature,
        extra: payload.extra,
        call: record.unsigned.method.clone().into_vec(),
    };
    let bytes = extrinsic.to_bytes();
    let redecoded = SignedExtrinsic::from_bytes(&bytes)?;
    if redecoded != extrinsic {
        return Err(Error::Input(
            "the signed extrinsic did not survive a decode round trip".to_owned(),
        ));
    }

    Ok(SignedTransactionOutput {
        signed_tx: HexBytes::from(bytes),
        signature: HexBytes::from(raw),
        unsigned_transaction: record.unsigned.clone(),
        signing_payload: record.signing_payload.clone(),
        tx_info: intent,
        tx_hash: extrinsic.hash(),
    })
}

fn multisig_intent(
    call: &MultisigCall,
    signer: AccountId32,
    data: Option<&MultisigTxData>,
) -> Result<MultisigIntent, Error> {
    let (threshold, others, timepoint, call_hash, embedded) = match call {
        MultisigCall::AsMultiThreshold1 {
            other_signatories,
            call,
        } => (1, other_signatories, None, call.hash(), Some(call)),
        MultisigCall::AsMulti {
            threshold,
            other_signatories,
            maybe_timepoint,
            call,
            ..
        } => (
            *threshold,
            other_signatories,
            *maybe_timepoint,
            call.hash(),
            Some(call),
        ),
        MultisigCall::ApproveAsMulti {
            threshold,
            other_signatories,
            maybe_timepoint,
            call_hash,
            ..
        } => (
            *threshold,
            other_signatories,
            *maybe_timepoint,
            *call_hash,
            None,
        ),
        MultisigCall::CancelAsMulti {
            threshold,
            other_signatories,
            timepoint,
            call_hash,
        } => (
            *threshold,
            other_signatories,
            Some(*timepoint),
            *call_hash,
            None,
        ),
    };

    if let Some(data) = data {
        let computed = Hash::new(data.call.as_slice());
        if computed != call_hash {
            return Err(Error::CallHashMismatch {
                declared: call_hash,
                computed,
            });
        }
        if data.call_hash != computed {
            return Err(Error::CallHashMismatch {
                declared: data.call_hash,
                computed,
            });
        }
    }

    // The wrapped call is summarized from whichever source carries it.
    let wrapped: Option<OpaqueCall> = embedded.cloned().or_else(|| {
        data.map(|data| OpaqueCall::new(data.call.as_slice().to_vec()))
    });
    let wrapped_method = wrapped.as_ref().and_then(|call| {
        RuntimeCall::decode_all(&mut call.as_bytes())
            .ok()
            .map(|call| format!("{}.{}", call.pallet_name(), call.method_name()))
    });

    let set = SignatorySet::new(signer, others.iter().copied(), threshold)?;
    Ok(MultisigIntent {
        multisig_address: set.multisig_account_id(),
        threshold,
        timepoint,
        call_hash,
        wrapped_call: wrapped.map(|call| HexBytes::from(call.into_bytes())),
        wrapped_method,
    })
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use kestrel_crypto::Algorithm;

    use super::*;
    use crate::{
        call::{BalancesCall, SystemCall},
        extrinsic::{UnsignedTransaction, SIGNED_EXTENSIONS},
        multisig::MultisigPlan,
        ErrorKind, Weight,
    };

    const MAX_WEIGHT: Weight = 640_000_000;

    fn signer() -> KeyPair {
        KeyPair::from_seed([0x51; 32], Algorithm::Ed25519).unwrap()
    }

    fn unsigned_for(address: String, call: &RuntimeCall) -> UnsignedTransaction {
        UnsignedTransaction {
            address,
            block_hash: Hash::new(b"checkpoint"),
            block_number: 1000,
            era: Era::mortal(64, 1000),
            genesis_hash: Hash::new(b"genesis"),
            metadata_rpc: HexBytes::from(b"meta".to_vec()),
            method: HexBytes::from(call.encode()),
            nonce: 7,
            spec_version: 268,
            tip: 10,
            transaction_version: 2,
            signed_extensions: SIGNED_EXTENSIONS.iter().map(ToString::to_string).collect(),
            version: 4,
        }
    }

    fn plain_record() -> TransactionRecord {
        let call = RuntimeCall::System(SystemCall::Remark {
            remark: b"hi".to_vec(),
        });
        let unsigned = unsigned_for(signer().public_key().to_string(), &call);
        TransactionRecord::for_envelope(unsigned, None).unwrap()
    }

    fn multisig_record() -> TransactionRecord {
        let signer_id = signer().public_key().account_id();
        let set = SignatorySet::new(
            signer_id,
            [AccountId32::new([0xB2; 32]), AccountId32::new([0xC3; 32])],
            2,
        )
        .unwrap();
        let wrapped = OpaqueCall::new(
            RuntimeCall::Balances(BalancesCall::Transfer {
                dest: MultiAddress::Id(AccountId32::new([7; 32])),
                value: 1500,
            })
            .encode(),
        );
        let plan = MultisigPlan::initiate(&set, wrapped, None, MAX_WEIGHT).unwrap();
        let unsigned = unsigned_for(signer_id.to_string(), &plan.call);
        let data = MultisigTxData::new(plan.wrapped_call.as_ref().unwrap());
        TransactionRecord::for_envelope(unsigned, Some(data)).unwrap()
    }

    #[test]
    fn plain_record_verifies_without_multisig_section() {
        let intent = verify(&plain_record(), signer().public_key()).unwrap();
        assert_eq!(intent.pallet, "system");
        assert_eq!(intent.method, "remark");
        assert_eq!(intent.nonce, 7);
        assert_eq!(intent.tip, 10);
        assert_eq!(intent.multisig, None);
    }

    #[test]
    fn foreign_key_is_refused_before_anything_else() {
        let other = KeyPair::from_seed([0x99; 32], Algorithm::Ed25519).unwrap();
        let error = verify(&plain_record(), other.public_key()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::SignerMismatch);
        let Error::SignerMismatch { expected, actual } = error else {
            panic!("expected a signer mismatch");
        };
        assert_eq!(expected, signer().public_key().to_string());
        assert_eq!(actual, other.public_key().to_string());
    }

    #[test]
    fn tampered_signing_payload_is_refused() {
        let mut record = plain_record();
        let mut bytes = record.signing_payload.clone().into_vec();
        bytes[0] ^= 0x01;
        record.signing_payload = HexBytes::from(bytes);
        assert!(matches!(
            verify(&record, signer().public_key()),
            Err(Error::Input(_))
        ));
    }

    #[test]
    fn multisig_record_re_derives_the_joint_account() {
        let record = multisig_record();
        let intent = verify(&record, signer().public_key()).unwrap();
        assert_eq!(intent.pallet, "multisig");
        assert_eq!(intent.method, "approve_as_multi");

        let multisig = intent.multisig.unwrap();
        assert_eq!(multisig.threshold, 2);
        assert_eq!(multisig.timepoint, None);
        assert_eq!(
            multisig.call_hash,
            record.multisig_tx_data.as_ref().unwrap().call_hash
        );
        assert_eq!(
            multisig.multisig_address,
            kestrel_crypto::multisig::multi_account_id(
                &[
                    signer().public_key().account_id(),
                    AccountId32::new([0xB2; 32]),
                    AccountId32::new([0xC3; 32]),
                ],
                2,
            )
        );
        assert_eq!(
            multisig.wrapped_method.as_deref(),
            Some("balances.transfer")
        );
    }

    #[test]
    fn tampered_wrapped_call_aborts_before_signing() {
        let mut record = multisig_record();
        let data = record.multisig_tx_data.as_mut().unwrap();
        data.call = HexBytes::from(hex!("00000400").to_vec());

        let error = sign(&record, &signer()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::CallHashMismatch);
    }

    #[test]
    fn tampered_declared_hash_aborts_before_signing() {
        let mut record = multisig_record();
        // The call still matches the payload, only its declared hash
        // in the record lies.
        let data = record.multisig_tx_data.as_mut().unwrap();
        data.call_hash = Hash::new(b"lie");

        let error = verify(&record, signer().public_key()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::CallHashMismatch);
    }

    #[test]
    fn multisig_data_on_a_plain_call_is_refused() {
        let mut record = plain_record();
        record.multisig_tx_data = Some(MultisigTxData {
            call: HexBytes::from(hex!("deadbeef").to_vec()),
            call_hash: Hash::new(hex!("deadbeef")),
        });
        assert!(matches!(
            verify(&record, signer().public_key()),
            Err(Error::Input(_))
        ));
    }

    #[test]
    fn signing_produces_a_decodable_extrinsic() {
        let record = plain_record();
        let output = sign(&record, &signer()).unwrap();

        let extrinsic = SignedExtrinsic::from_bytes(output.signed_tx.as_slice()).unwrap();
        assert_eq!(
            extrinsic.address,
            MultiAddress::Id(signer().public_key().account_id())
        );
        assert_eq!(extrinsic.call, record.unsigned.method.as_slice());
        assert_eq!(output.tx_hash, Hash::new(output.signed_tx.as_slice()));
        assert_eq!(output.tx_info.method, "remark");

        // The signature covers the derived payload.
        let payload = record.unsigned.signing_payload().unwrap();
        signer()
            .public_key()
            .verify(&payload.signable_bytes(), output.signature.as_slice())
            .unwrap();
    }

    #[test]
    fn ecdsa_keys_sign_records_too() {
        let key_pair = KeyPair::from_seed([0x52; 32], Algorithm::Ecdsa).unwrap();
        let call = RuntimeCall::System(SystemCall::Remark {
            remark: b"ecdsa".to_vec(),
        });
        let unsigned = unsigned_for(key_pair.public_key().to_string(), &call);
        let record = TransactionRecord::for_envelope(unsigned, None).unwrap();

        let output = sign(&record, &key_pair).unwrap();
        assert_eq!(output.signature.as_slice().len(), 65);
        let extrinsic = SignedExtrinsic::from_bytes(output.signed_tx.as_slice()).unwrap();
        assert_eq!(extrinsic.signature.algorithm(), Algorithm::Ecdsa);
    }

    #[test]
    fn signed_output_serde_round_trip() {
        let output = sign(&multisig_record(), &signer()).unwrap();
        let json = serde_json::to_value(&output).unwrap();
        assert!(json["signedTx"].as_str().unwrap().starts_with("0x"));
        assert!(json["txInfo"]["multisig"].is_object());
        let back: SignedTransactionOutput = serde_json::from_value(json).unwrap();
        assert_eq!(back, output);
    }
}
