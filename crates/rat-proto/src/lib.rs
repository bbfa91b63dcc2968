//! Protocol Buffers wire records for rat.
//!
//! The only structured record that ever crosses the wire is the identity a
//! peer presents about itself. Everything else is opaque payload bytes.

#![forbid(unsafe_code)]

pub mod v1;
pub mod validation;

#[cfg(test)]
mod proptests;
