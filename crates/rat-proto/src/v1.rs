//! Version 1 wire records.
//!
//! Messages are derived by hand with `prost` rather than generated from a
//! `.proto` file, so building the crate does not need `protoc`. Field tags
//! are part of the wire format and must never be renumbered.

/// Self-describing identity record a peer presents during the handshake and
/// on directory registration.
///
/// ```proto
/// message IdentityV1 {
///   string name = 1;
///   string group = 2;
///   bytes verifying_key = 3; // PKCS#1 DER RSA public key
///   string address = 4;
///   string status = 5;
/// }
/// ```
#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct IdentityV1 {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub group: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "3")]
    pub verifying_key: ::prost::alloc::vec::Vec<u8>,
    #[prost(string, tag = "4")]
    pub address: ::prost::alloc::string::String,
    #[prost(string, tag = "5")]
    pub status: ::prost::alloc::string::String,
}
