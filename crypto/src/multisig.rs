//! Deterministic derivation of multisig account identifiers.

use parity_scale_codec::Encode;

use crate::{AccountId32, Hash};

/// Entropy prefix shared by every chain running the standard multisig
/// pallet. The raw bytes enter the derivation without a length prefix.
const MODULE_ID: [u8; 16] = *b"modlpy/utilisuba";

/// Derive the account id of the multisig formed by `signatories` at the
/// given approval `threshold`.
///
/// The signatory set is unordered. The raw 32-byte ids are sorted
/// before they enter the derivation, so every permutation of the same
/// set maps to the same account.
#[must_use]
pub fn multi_account_id(signatories: &[AccountId32], threshold: u16) -> AccountId32 {
    let mut sorted = signatories.to_vec();
    sorted.sort_unstable();

    let digest = (MODULE_ID, sorted, threshold).using_encoded(|bytes| Hash::new(bytes));
    AccountId32::new(digest.into())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn account(fill: u8) -> AccountId32 {
        AccountId32::new([fill; 32])
    }

    #[test]
    fn derivation_is_structured_as_prefix_signatories_threshold() {
        let signatories = vec![account(3), account(1), account(2)];
        let threshold = 2_u16;

        let mut encoded = Vec::new();
        encoded.extend_from_slice(&MODULE_ID);
        // Compact length prefix for a three-element vector.
        encoded.extend_from_slice(&[3_u8 << 2]);
        for fill in 1..=3_u8 {
            encoded.extend_from_slice(&[fill; 32]);
        }
        encoded.extend_from_slice(&threshold.to_le_bytes());

        assert_eq!(
            multi_account_id(&signatories, threshold),
            AccountId32::new(Hash::new(&encoded).into()),
        );
    }

    #[test]
    fn threshold_changes_the_account() {
        let signatories = vec![account(1), account(2), account(3)];
        assert_ne!(
            multi_account_id(&signatories, 2),
            multi_account_id(&signatories, 3),
        );
    }

    proptest! {
        #[test]
        fn permutations_derive_the_same_account(
            seeds in prop::collection::hash_set(any::<[u8; 32]>(), 2..6),
            threshold in 1_u16..10,
        ) {
            let signatories: Vec<_> = seeds.into_iter().map(AccountId32::new).collect();
            let derived = multi_account_id(&signatories, threshold);

            let mut reversed = signatories.clone();
            reversed.reverse();
            prop_assert_eq!(multi_account_id(&reversed, threshold), derived);

            let mut rotated = signatories;
            rotated.rotate_left(1);
            prop_assert_eq!(multi_account_id(&rotated, threshold), derived);
        }
    }
}
