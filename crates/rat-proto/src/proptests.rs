#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use prost::Message;
    use crate::v1::IdentityV1;

    prop_compose! {
        fn any_identity()(
            name in "[a-z]{1,32}",
            group in "[a-z]{0,16}",
            key in prop::collection::vec(any::<u8>(), 1..512),
            address in "[0-9.]{0,15}",
            status in ".{0,64}",
        ) -> IdentityV1 {
            IdentityV1 { name, group, verifying_key: key, address, status }
        }
    }

    proptest! {
        #[test]
        fn prop_identity_wire_stable(record in any_identity()) {
            let bytes = record.encode_to_vec();
            let decoded = IdentityV1::decode(bytes.as_slice()).unwrap();
            prop_assert!(decoded.validate().is_ok());
            prop_assert_eq!(decoded, record);
        }

        #[test]
        fn prop_decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..1024)) {
            if let Ok(record) = IdentityV1::decode(bytes.as_slice()) {
                let _ = record.validate();
            }
        }
    }
}
