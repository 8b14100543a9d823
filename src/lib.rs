//! A library for validating CAdES signature attributes.
//!
//! CAdES, specified in RFC 5126, layers qualifying attributes over the
//! CMS signed-data structure of RFC 5652. This crate decodes a CMS
//! envelope and validates the attributes of every signer without
//! verifying any cryptographic signatures: the signing-certificate
//! binding, the complete certificate and revocation references used for
//! long-term validation, and embedded RFC 3161 timestamp tokens, which
//! are followed recursively up to a fixed depth.
//!
//! The entry point is [`report::validate`] which turns an encoded
//! envelope into one report per signer. The individual checks are also
//! available on their own through the [`ess`], [`ltv`], and [`tst`]
//! modules for callers that drive decoding themselves.
//!
//! # Features
//!
//! * `serde`: support for Serde serialization of the report types.

pub mod attrs;
pub mod cert;
pub mod cms;
pub mod crypto;
pub mod error;
pub mod ess;
pub mod ltv;
pub mod oid;
pub mod report;
pub mod tst;
pub mod x509;

#[cfg(test)]
pub(crate) mod testenv;

pub use self::error::ValidationError;
pub use self::ess::BindingPolicy;
pub use self::report::{validate, Profile, SignerReport};
