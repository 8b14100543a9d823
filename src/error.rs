//! Error handling for attribute validation.
//!
//! Decode-level failures inside one signer abort validation of that signer
//! only. Validation outcomes that a caller may want to tolerate, such as a
//! failed certificate binding or an absent attribute, are not errors but
//! reported as data by the respective module.

use std::{error, fmt};
use std::convert::Infallible;
use bcder::Oid;
use bcder::decode::{ContentError, DecodeError};
use bytes::Bytes;


//------------ ValidationError -----------------------------------------------

/// A failure while validating one signer’s attributes.
///
/// Each variant carries the offending attribute OID or a structural
/// description so a caller can pinpoint the malformed part of the input.
#[derive(Debug)]
pub enum ValidationError {
    /// The outer CMS structure could not be decoded.
    MalformedStructure(ContentError),

    /// The same attribute OID appeared twice within one attribute set.
    DuplicateAttribute(Oid<Bytes>),

    /// An attribute value did not parse into its expected shape, or an
    /// expected-non-empty sequence was empty.
    MalformedAttribute {
        oid: Oid<Bytes>,
        reason: ContentError,
    },

    /// The nested CMS decode of a timestamp attribute failed.
    MalformedTimestamp(ContentError),

    /// Adversarial input exceeded a size or nesting limit.
    ResourceLimitExceeded(&'static str),
}

impl ValidationError {
    /// Creates a malformed-attribute error for the given attribute.
    pub fn malformed_attr(
        oid: &Oid<Bytes>, reason: impl Into<ContentError>
    ) -> Self {
        ValidationError::MalformedAttribute {
            oid: oid.clone(),
            reason: reason.into(),
        }
    }

    /// Converts a decode error of an attribute value.
    pub fn attr_decode(
        oid: &Oid<Bytes>, err: DecodeError<Infallible>
    ) -> Self {
        Self::malformed_attr(oid, err.to_string())
    }

    /// Returns whether this is a resource-limit error.
    pub fn is_resource_limit(&self) -> bool {
        matches!(self, ValidationError::ResourceLimitExceeded(_))
    }
}


//--- From

impl From<DecodeError<Infallible>> for ValidationError {
    fn from(err: DecodeError<Infallible>) -> Self {
        ValidationError::MalformedStructure(err.to_string().into())
    }
}


//--- Serialize

#[cfg(feature = "serde")]
impl serde::Serialize for ValidationError {
    fn serialize<S: serde::Serializer>(
        &self, serializer: S
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}


//--- Display and Error

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValidationError::MalformedStructure(err) => {
                write!(f, "malformed CMS structure: {}", err)
            }
            ValidationError::DuplicateAttribute(oid) => {
                write!(f, "duplicate attribute {}", oid)
            }
            ValidationError::MalformedAttribute { oid, reason } => {
                write!(f, "malformed attribute {}: {}", oid, reason)
            }
            ValidationError::MalformedTimestamp(err) => {
                write!(f, "malformed timestamp token: {}", err)
            }
            ValidationError::ResourceLimitExceeded(what) => {
                write!(f, "resource limit exceeded: {}", what)
            }
        }
    }
}

impl error::Error for ValidationError { }
