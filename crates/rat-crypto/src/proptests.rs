#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use crate::{chop, decrypt_chunk, encrypt_chunk, sign, stitch, testing, verify};

    proptest! {
        #[test]
        fn prop_stitch_inverts_chop(data in prop::collection::vec(any::<u8>(), 0..2048), n in 1usize..300) {
            let pieces = chop(&data, n);
            prop_assert!(pieces.iter().all(|p| !p.is_empty() && p.len() <= n));
            prop_assert_eq!(stitch(pieces), data);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_block_round_trip(data in prop::collection::vec(any::<u8>(), 0..=117)) {
            let bob = testing::bob();
            let chunk = encrypt_chunk(&data, bob.verifying()).unwrap();
            prop_assert_eq!(decrypt_chunk(&chunk, bob.signing()).unwrap(), data);
        }

        #[test]
        fn prop_signature_binds_key(data in prop::collection::vec(any::<u8>(), 0..512)) {
            let alice = testing::alice();
            let sig = sign(&data, alice.signing()).unwrap();
            prop_assert!(verify(&data, &sig, alice.verifying()).is_ok());
            prop_assert!(verify(&data, &sig, testing::carol().verifying()).is_err());
        }
    }
}
