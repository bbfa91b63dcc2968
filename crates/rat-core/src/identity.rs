//! The self-describing record a peer presents about itself.

use std::fmt;

use prost::Message;
use rat_crypto::VerifyingKey;
use rat_proto::v1::IdentityV1;

use crate::errors::ProtocolError;

/// Who a peer says they are. The verifying key is the only part that is
/// ever checked; the rest is self-reported.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Identity {
    pub name: String,
    pub group: String,
    pub verifying_key: VerifyingKey,
    pub address: String,
    pub status: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, verifying_key: VerifyingKey) -> Self {
        Self {
            name: name.into(),
            group: String::new(),
            verifying_key,
            address: String::new(),
            status: String::new(),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn fingerprint(&self) -> String {
        self.verifying_key.fingerprint()
    }

    pub fn to_wire(&self) -> IdentityV1 {
        IdentityV1 {
            name: self.name.clone(),
            group: self.group.clone(),
            verifying_key: self.verifying_key.as_der().to_vec(),
            address: self.address.clone(),
            status: self.status.clone(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        self.to_wire().encode_to_vec()
    }

    /// Decode and validate a received identity payload.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let wire = IdentityV1::decode(bytes)
            .map_err(|e| ProtocolError::violation(format_args!("not an identity record: {e}")))?;
        Self::try_from(wire)
    }
}

impl TryFrom<IdentityV1> for Identity {
    type Error = ProtocolError;

    fn try_from(wire: IdentityV1) -> Result<Self, Self::Error> {
        wire.validate().map_err(ProtocolError::violation)?;
        let verifying_key = VerifyingKey::from_der(&wire.verifying_key)
            .map_err(|e| ProtocolError::violation(format_args!("identity key: {e}")))?;
        Ok(Self {
            name: wire.name,
            group: wire.group,
            verifying_key,
            address: wire.address,
            status: wire.status,
        })
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "nickname: {}", self.name)?;
        writeln!(f, "group: {}", self.group)?;
        writeln!(f, "fingerprint: {}", self.fingerprint())?;
        writeln!(f, "address: {}", self.address)?;
        write!(f, "status: {}", self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rat_crypto::testing;

    fn alice() -> Identity {
        Identity::new("alice", testing::alice().verifying().clone())
            .with_group("rats")
            .with_address("10.0.0.1")
            .with_status("around")
    }

    #[test]
    fn test_encode_decode_is_structurally_equal() {
        let me = alice();
        assert_eq!(Identity::decode(&me.encode()).unwrap(), me);
    }

    #[test]
    fn test_any_field_change_breaks_equality() {
        let me = alice();
        assert_ne!(me.clone().with_status("away"), me);
    }

    #[test]
    fn test_plain_text_is_not_an_identity() {
        let err = Identity::decode(b"register").unwrap_err();
        assert!(matches!(err, ProtocolError::Violation(_)));
    }

    #[test]
    fn test_record_with_bad_key_rejected() {
        let mut wire = alice().to_wire();
        wire.verifying_key = vec![0x30, 0x00];
        assert!(matches!(
            Identity::try_from(wire),
            Err(ProtocolError::Violation(_))
        ));
    }

    #[test]
    fn test_display_lists_fields() {
        let shown = alice().to_string();
        assert!(shown.starts_with("nickname: alice\ngroup: rats\n"));
        assert!(shown.ends_with("status: around"));
    }
}
