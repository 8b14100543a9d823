//! Digest algorithms and operations.

use std::{fmt, io};
use ring::digest;
use bcder::{decode, encode};
use bcder::{ConstOid, Oid, Tag};
use bcder::decode::DecodeError;
use bcder::encode::PrimitiveContent;
use crate::oid;

// Re-export the things from ring for actual digest generation.
pub use ring::digest::Digest;


//------------ DigestAlgorithm -----------------------------------------------

/// The digest algorithms used by CAdES attributes.
///
/// These are the algorithms that can be named by an `ESSCertIDv2` entry,
/// a certificate or revocation reference, or a timestamp message imprint.
/// RFC 5035 makes SHA-256 the default where the identifier is omitted.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(
    feature = "serde", derive(serde::Serialize, serde::Deserialize)
)]
pub enum DigestAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl Default for DigestAlgorithm {
    fn default() -> Self {
        DigestAlgorithm::Sha256
    }
}


/// # Creating Digest Values
///
impl DigestAlgorithm {
    /// Returns the digest of `data` using this algorithm.
    pub fn digest(self, data: &[u8]) -> Digest {
        digest::digest(self.ring_digest(), data)
    }

    /// Returns a digest context for multi-step calculation of the digest.
    pub fn start(self) -> Context {
        Context(digest::Context::new(self.ring_digest()))
    }

    /// Returns the length of a digest value in octets.
    pub fn digest_len(self) -> usize {
        self.ring_digest().output_len
    }

    fn ring_digest(self) -> &'static digest::Algorithm {
        match self {
            DigestAlgorithm::Sha1 => &digest::SHA1_FOR_LEGACY_USE_ONLY,
            DigestAlgorithm::Sha256 => &digest::SHA256,
            DigestAlgorithm::Sha384 => &digest::SHA384,
            DigestAlgorithm::Sha512 => &digest::SHA512,
        }
    }
}


/// # ASN.1 Values
///
/// Digest algorithms appear in attribute values as algorithm identifiers
/// with the following syntax:
///
/// ```txt
/// AlgorithmIdentifier        ::= SEQUENCE {
///      algorithm                 OBJECT IDENTIFIER,
///      parameters                ANY DEFINED BY algorithm OPTIONAL }
/// ```
///
/// The _parameters_ field may either be absent or `NULL` for all the hash
/// functions supported here.
impl DigestAlgorithm {
    /// Takes and returns a single digest algorithm identifier.
    ///
    /// Returns a malformed error if the algorithm isn’t one of the
    /// supported algorithms or if the value isn’t correctly encoded.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(Self::from_constructed)
    }

    /// Takes and returns an optional digest algorithm identifier.
    ///
    /// Returns `Ok(None)` if the next value isn’t a sequence.
    pub fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(Self::from_constructed)
    }

    /// Parses the algorithm identifier from the contents of its sequence.
    fn from_constructed<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        let alg = Self::take_oid_from(cons)?;
        cons.take_opt_null()?;
        Ok(alg)
    }

    /// Takes a single algorithm object identifier from a constructed value.
    pub fn take_oid_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
    ) -> Result<Self, DecodeError<S::Error>> {
        let oid = Oid::take_from(cons)?;
        Self::from_oid(&oid).ok_or_else(|| {
            cons.content_err(UnsupportedDigestAlgorithm(oid))
        })
    }

    /// Returns the algorithm for the given object identifier.
    pub fn from_oid(oid: &Oid<impl AsRef<[u8]>>) -> Option<Self> {
        if *oid == oid::SHA256 {
            Some(DigestAlgorithm::Sha256)
        }
        else if *oid == oid::SHA1 {
            Some(DigestAlgorithm::Sha1)
        }
        else if *oid == oid::SHA384 {
            Some(DigestAlgorithm::Sha384)
        }
        else if *oid == oid::SHA512 {
            Some(DigestAlgorithm::Sha512)
        }
        else {
            None
        }
    }

    /// Returns the object identifier of the algorithm.
    pub fn to_oid(self) -> ConstOid {
        match self {
            DigestAlgorithm::Sha1 => oid::SHA1,
            DigestAlgorithm::Sha256 => oid::SHA256,
            DigestAlgorithm::Sha384 => oid::SHA384,
            DigestAlgorithm::Sha512 => oid::SHA512,
        }
    }

    /// Provides an encoder for a single algorithm identifier.
    pub fn encode(self) -> impl encode::Values {
        encode::sequence((
            self.to_oid().encode(),
            ().encode(),
        ))
    }
}


//--- Display

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            DigestAlgorithm::Sha1 => "sha-1",
            DigestAlgorithm::Sha256 => "sha-256",
            DigestAlgorithm::Sha384 => "sha-384",
            DigestAlgorithm::Sha512 => "sha-512",
        })
    }
}


//------------ Context -------------------------------------------------------

#[derive(Clone)]
pub struct Context(digest::Context);

impl Context {
    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data)
    }

    pub fn finish(self) -> Digest {
        self.0.finish()
    }
}

impl io::Write for Context {
    fn write(&mut self, buf: &[u8]) -> Result<usize, io::Error> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), io::Error> {
        Ok(())
    }
}


//============ Error Types ===================================================

//------------ UnsupportedDigestAlgorithm ------------------------------------

/// An algorithm identifier names a hash function we do not implement.
#[derive(Clone, Debug)]
pub struct UnsupportedDigestAlgorithm(Oid<bytes::Bytes>);

impl From<UnsupportedDigestAlgorithm> for bcder::decode::ContentError {
    fn from(err: UnsupportedDigestAlgorithm) -> Self {
        Self::from_boxed(Box::new(err))
    }
}

impl fmt::Display for UnsupportedDigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unsupported digest algorithm {}", self.0)
    }
}


//============ Tests =========================================================
