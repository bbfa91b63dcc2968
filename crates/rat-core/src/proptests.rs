#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rat_crypto::testing;
    use rat_transport::testing::duplex_pair;
    use rat_transport::Liveness;

    use crate::identity::Identity;
    use crate::wire;

    prop_compose! {
        fn any_identity()(
            name in "\\PC{1,32}",
            group in "\\PC{0,16}",
            address in "[0-9a-f:.]{0,39}",
            status in "\\PC{0,48}",
        ) -> Identity {
            Identity::new(name, testing::carol().verifying().clone())
                .with_group(group)
                .with_address(address)
                .with_status(status)
        }
    }

    proptest! {
        #[test]
        fn prop_identity_survives_the_wire(identity in any_identity()) {
            let decoded = Identity::decode(&identity.encode()).unwrap();
            prop_assert_eq!(decoded, identity);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_message_of_any_length_arrives_intact(
            payload in prop::collection::vec(any::<u8>(), 0..1200),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let got = rt.block_on(async {
                let alice = testing::alice();
                let bob = testing::bob();
                let liveness = Liveness::new();
                let (a, b) = duplex_pair(&liveness);
                let (_ar, mut aw) = a.split(alice.chunk_bytes());
                let (mut br, _bw) = b.split(bob.chunk_bytes());

                wire::send(&mut aw, &payload, alice.signing(), bob.verifying())
                    .await
                    .unwrap();
                wire::receive(&mut br, bob.signing(), alice.verifying())
                    .await
                    .unwrap()
            });
            prop_assert_eq!(got, payload);
        }
    }
}
