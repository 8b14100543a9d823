//! Cryptographic primitives used during attribute validation.
//!
//! Attribute validation never verifies signatures itself, so all that
//! lives here is digest creation for comparing stored certificate hashes
//! against the actual certificate data.

pub use self::digest::{Context, Digest, DigestAlgorithm};

pub mod digest;
