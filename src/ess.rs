//! The signing-certificate binding attribute.
//
// See RFC 5035 (ESS Update) and RFC 5126, section 5.7.3.

use std::fmt;
use bcder::{decode, Captured, Mode, OctetString, Oid};
use bcder::decode::{DecodeError, IntoSource};
use bytes::Bytes;
use crate::oid;
use crate::attrs::AttributeTable;
use crate::cert::Cert;
use crate::cms::MAX_SET_ENTRIES;
use crate::crypto::DigestAlgorithm;
use crate::error::ValidationError;
use crate::x509::Serial;


//------------ BindingPolicy -------------------------------------------------

/// How many certificate references a signing-certificate attribute may
/// carry.
///
/// RFC 5035 permits a chain of references where the first entry must
/// reference the signer’s certificate. Some deployments instead insist
/// the attribute references exactly the signer’s certificate and nothing
/// else.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(
    feature = "serde", derive(serde::Serialize, serde::Deserialize)
)]
pub enum BindingPolicy {
    /// Exactly one reference, the signer’s own certificate.
    SignerOnly,

    /// The first reference must be the signer’s certificate; further
    /// chain references are permitted.
    Chain,
}

impl Default for BindingPolicy {
    fn default() -> Self {
        BindingPolicy::SignerOnly
    }
}


//------------ CertificateBinding --------------------------------------------

/// The verdict of the signing-certificate binder.
///
/// `NotBound` is a reported outcome, not an error: the caller decides
/// whether it is fatal for the profile level it is checking.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CertificateBinding {
    /// The attribute references exactly the signer’s certificate.
    Bound,

    /// The attribute is present but does not bind the certificate.
    NotBound(NotBoundReason),

    /// The attribute is absent from the signed attributes.
    Absent,
}

impl CertificateBinding {
    /// Returns whether this verdict is `Bound`.
    pub fn is_bound(&self) -> bool {
        matches!(self, CertificateBinding::Bound)
    }
}

impl fmt::Display for CertificateBinding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CertificateBinding::Bound => f.write_str("bound"),
            CertificateBinding::NotBound(reason) => {
                write!(f, "not bound: {}", reason)
            }
            CertificateBinding::Absent => f.write_str("absent"),
        }
    }
}


//------------ NotBoundReason ------------------------------------------------

/// Why a present signing-certificate attribute failed to bind.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(
    feature = "serde", derive(serde::Serialize, serde::Deserialize)
)]
pub enum NotBoundReason {
    /// The attribute carries more references than the policy allows.
    AmbiguousReference,

    /// The stored hash does not match the signer’s certificate.
    HashMismatch,

    /// The signer’s certificate is not present in the envelope.
    MissingCertificate,
}

impl fmt::Display for NotBoundReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            NotBoundReason::AmbiguousReference => {
                "ambiguous certificate reference"
            }
            NotBoundReason::HashMismatch => {
                "certificate hash mismatch"
            }
            NotBoundReason::MissingCertificate => {
                "signer certificate not present"
            }
        })
    }
}


//------------ SigningCertificate --------------------------------------------

/// A decoded `SigningCertificateV2` attribute value.
///
/// ```txt
/// SigningCertificateV2 ::=  SEQUENCE {
///     certs        SEQUENCE OF ESSCertIDv2,
///     policies     SEQUENCE OF PolicyInformation OPTIONAL }
/// ```
///
/// The policies are read over; policy evaluation is not part of
/// attribute validation.
#[derive(Clone, Debug)]
pub struct SigningCertificate {
    certs: Vec<EssCertId>,
}

impl SigningCertificate {
    /// Returns the certificate references.
    pub fn certs(&self) -> &[EssCertId] {
        &self.certs
    }

    /// Decodes the attribute value.
    pub fn decode(value: &Captured) -> Result<Self, ValidationError> {
        let mut limit_hit = false;
        let res = Mode::Der.decode(
            value.as_slice().into_source(),
            |cons| Self::take_from(cons, &mut limit_hit)
        );
        if limit_hit {
            return Err(ValidationError::ResourceLimitExceeded(
                "certificate reference sequence too large"
            ))
        }
        res.map_err(|err| {
            ValidationError::attr_decode(
                &Oid(Bytes::from_static(oid::AA_SIGNING_CERTIFICATE_V2.0)),
                err
            )
        })
    }

    /// Takes a signing certificate from an encoded constructed value.
    fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
        limit_hit: &mut bool,
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let certs = cons.take_sequence(|cons| {
                let mut certs = Vec::new();
                while let Some(id) = EssCertId::take_opt_from(cons)? {
                    if certs.len() >= MAX_SET_ENTRIES {
                        *limit_hit = true;
                        return Err(cons.content_err(
                            "too many certificate references"
                        ))
                    }
                    certs.push(id);
                }
                Ok(certs)
            })?;
            if certs.is_empty() {
                return Err(cons.content_err(
                    "empty certificate reference sequence"
                ))
            }
            // policies -- irrelevant here.
            cons.skip_all()?;
            Ok(SigningCertificate { certs })
        })
    }
}


//------------ EssCertId -----------------------------------------------------

/// A single `ESSCertIDv2` entry.
///
/// ```txt
/// ESSCertIDv2 ::=  SEQUENCE {
///     hashAlgorithm    AlgorithmIdentifier DEFAULT {algorithm id-sha256},
///     certHash         OCTET STRING,
///     issuerSerial     IssuerSerial OPTIONAL }
/// ```
#[derive(Clone, Debug)]
pub struct EssCertId {
    /// The algorithm the certificate hash was created with.
    hash_algorithm: DigestAlgorithm,

    /// The hash over the certificate’s DER encoding.
    cert_hash: Bytes,

    /// The issuer and serial of the referenced certificate, if present.
    issuer_serial: Option<IssuerSerial>,
}

impl EssCertId {
    /// Returns the hash algorithm.
    pub fn hash_algorithm(&self) -> DigestAlgorithm {
        self.hash_algorithm
    }

    /// Returns the stored certificate hash.
    pub fn cert_hash(&self) -> &Bytes {
        &self.cert_hash
    }

    /// Returns the issuer and serial of the referenced certificate.
    pub fn issuer_serial(&self) -> Option<&IssuerSerial> {
        self.issuer_serial.as_ref()
    }

    /// Returns whether this entry’s hash matches the given certificate.
    pub fn matches_certificate(&self, cert: &Cert) -> bool {
        let digest = self.hash_algorithm.digest(cert.raw_bytes());
        digest.as_ref() == self.cert_hash.as_ref()
    }

    /// Takes an optional entry from an encoded constructed value.
    pub fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            let hash_algorithm = DigestAlgorithm::take_opt_from(
                cons
            )?.unwrap_or_default();
            let cert_hash = OctetString::take_from(cons)?.into_bytes();
            let issuer_serial = IssuerSerial::take_opt_from(cons)?;
            Ok(EssCertId { hash_algorithm, cert_hash, issuer_serial })
        })
    }
}


//------------ IssuerSerial --------------------------------------------------

/// The issuer and serial number of a referenced certificate.
///
/// The issuer is a `GeneralNames` value which is kept in its captured
/// encoding; only the serial number is decoded.
#[derive(Clone, Debug)]
pub struct IssuerSerial {
    issuer: Captured,
    serial: Serial,
}

impl IssuerSerial {
    /// Returns the captured issuer general names.
    pub fn issuer(&self) -> &Captured {
        &self.issuer
    }

    /// Returns the serial number.
    pub fn serial(&self) -> Serial {
        self.serial
    }

    /// Takes an optional issuer-serial from a constructed value.
    pub fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            Ok(IssuerSerial {
                issuer: cons.capture_one()?,
                serial: Serial::take_from(cons)?,
            })
        })
    }
}


//------------ validate_signing_certificate ----------------------------------

/// Validates the signing-certificate binding of one signer.
///
/// Looks up the `SigningCertificateV2` attribute in the signed
/// attributes; its presence in the unsigned attributes would be
/// meaningless since nothing protects it there. The verdict is returned
/// as data; only a malformed attribute is an error.
pub fn validate_signing_certificate(
    table: &AttributeTable,
    cert: Option<&Cert>,
    policy: BindingPolicy,
) -> Result<CertificateBinding, ValidationError> {
    let attr = match table.signed_attr(&oid::AA_SIGNING_CERTIFICATE_V2) {
        Some(attr) => attr,
        None => return Ok(CertificateBinding::Absent)
    };
    let signing_cert = SigningCertificate::decode(attr.single_value()?)?;
    if policy == BindingPolicy::SignerOnly
        && signing_cert.certs().len() != 1
    {
        return Ok(CertificateBinding::NotBound(
            NotBoundReason::AmbiguousReference
        ))
    }
    let cert = match cert {
        Some(cert) => cert,
        None => {
            return Ok(CertificateBinding::NotBound(
                NotBoundReason::MissingCertificate
            ))
        }
    };
    // Under either policy the first entry must reference the signer.
    if signing_cert.certs()[0].matches_certificate(cert) {
        Ok(CertificateBinding::Bound)
    }
    else {
        Ok(CertificateBinding::NotBound(NotBoundReason::HashMismatch))
    }
}


//============ Tests =========================================================
