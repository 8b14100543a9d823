//! Long-term validation references.
//!
//! The `complete-certificate-references` and
//! `complete-revocation-references` unsigned attributes of RFC 5126,
//! section 6.2, store hashes of the full certification path and of the
//! revocation data used at signing time. This module decodes both and
//! reports their presence and entry counts.

use std::fmt;
use bcder::{decode, Captured, Mode, OctetString, Oid, Tag};
use bcder::decode::{DecodeError, IntoSource};
use bytes::Bytes;
use crate::oid;
use crate::attrs::AttributeTable;
use crate::cms::MAX_SET_ENTRIES;
use crate::crypto::DigestAlgorithm;
use crate::error::ValidationError;
use crate::ess::IssuerSerial;
use crate::x509::{Name, Time};


//------------ Presence ------------------------------------------------------

/// Whether a reference attribute is present and how many entries it has.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(
    feature = "serde", derive(serde::Serialize, serde::Deserialize)
)]
pub enum Presence {
    /// The attribute is present with the given number of entries.
    Present(usize),

    /// The attribute is absent.
    Absent,
}

impl Presence {
    /// Returns whether the attribute is present.
    pub fn is_present(&self) -> bool {
        matches!(self, Presence::Present(_))
    }
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Presence::Present(count) => {
                write!(f, "present with {} entries", count)
            }
            Presence::Absent => f.write_str("absent"),
        }
    }
}


//------------ LtvReport -----------------------------------------------------

/// The outcome of checking one signer’s long-term references.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(
    feature = "serde", derive(serde::Serialize, serde::Deserialize)
)]
pub struct LtvReport {
    /// The complete-certificate-references attribute.
    pub certificate_refs: Presence,

    /// The complete-revocation-references attribute.
    pub revocation_refs: Presence,
}

impl LtvReport {
    /// Returns whether both reference attributes are present.
    ///
    /// This is what distinguishes the `C` level from the levels below it.
    pub fn is_complete(&self) -> bool {
        self.certificate_refs.is_present()
            && self.revocation_refs.is_present()
    }
}


//------------ OtherHash -----------------------------------------------------

/// A hash value with an optionally explicit algorithm.
///
/// ```txt
/// OtherHash ::= CHOICE {
///     sha1Hash   OCTET STRING,
///     otherHash  SEQUENCE { hashAlgorithm, hashValue OCTET STRING } }
/// ```
///
/// A bare octet string means SHA-1 for historical reasons.
#[derive(Clone, Debug)]
pub struct OtherHash {
    algorithm: DigestAlgorithm,
    value: Bytes,
}

impl OtherHash {
    /// Returns the hash algorithm.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Returns the hash value.
    pub fn value(&self) -> &Bytes {
        &self.value
    }

    /// Takes a hash value from an encoded constructed value.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        match Self::take_opt_from(cons)? {
            Some(res) => Ok(res),
            None => Err(cons.content_err("expected hash value"))
        }
    }

    /// Takes an optional hash value from an encoded constructed value.
    pub fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        if let Some(value) = cons.take_opt_primitive_if(
            Tag::OCTET_STRING,
            |prim| prim.take_all()
        )? {
            return Ok(Some(OtherHash {
                algorithm: DigestAlgorithm::Sha1,
                value,
            }))
        }
        cons.take_opt_sequence(|cons| {
            let algorithm = DigestAlgorithm::take_from(cons)?;
            let value = OctetString::take_from(cons)?.into_bytes();
            Ok(OtherHash { algorithm, value })
        })
    }
}


//------------ CertificateRefs -----------------------------------------------

/// A decoded `complete-certificate-references` attribute value.
///
/// ```txt
/// CompleteCertificateRefs ::= SEQUENCE OF OtherCertID
/// ```
#[derive(Clone, Debug)]
pub struct CertificateRefs {
    refs: Vec<OtherCertId>,
}

impl CertificateRefs {
    /// Returns the certificate references.
    pub fn refs(&self) -> &[OtherCertId] {
        &self.refs
    }

    /// Decodes the attribute value.
    pub fn decode(value: &Captured) -> Result<Self, ValidationError> {
        let oid = Oid(Bytes::from_static(oid::AA_ETS_CERTIFICATE_REFS.0));
        let mut limit_hit = false;
        let res = Mode::Der.decode(
            value.as_slice().into_source(),
            |cons| cons.take_sequence(|cons| {
                let mut refs = Vec::new();
                while let Some(item) = OtherCertId::take_opt_from(cons)? {
                    if refs.len() >= MAX_SET_ENTRIES {
                        limit_hit = true;
                        return Err(cons.content_err(
                            "too many certificate references"
                        ))
                    }
                    refs.push(item);
                }
                Ok(CertificateRefs { refs })
            })
        );
        if limit_hit {
            return Err(ValidationError::ResourceLimitExceeded(
                "certificate reference sequence too large"
            ))
        }
        let res = res.map_err(|err| {
            ValidationError::attr_decode(&oid, err)
        })?;
        if res.refs.is_empty() {
            return Err(ValidationError::malformed_attr(
                &oid, "empty certificate reference sequence"
            ))
        }
        Ok(res)
    }
}


//------------ OtherCertId ---------------------------------------------------

/// A reference to one certificate of the certification path.
#[derive(Clone, Debug)]
pub struct OtherCertId {
    /// The hash over the referenced certificate’s DER encoding.
    cert_hash: OtherHash,

    /// The issuer and serial of the referenced certificate, if present.
    issuer_serial: Option<IssuerSerial>,
}

impl OtherCertId {
    /// Returns the certificate hash.
    pub fn cert_hash(&self) -> &OtherHash {
        &self.cert_hash
    }

    /// Returns the issuer and serial of the referenced certificate.
    pub fn issuer_serial(&self) -> Option<&IssuerSerial> {
        self.issuer_serial.as_ref()
    }

    fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            Ok(OtherCertId {
                cert_hash: OtherHash::take_from(cons)?,
                issuer_serial: IssuerSerial::take_opt_from(cons)?,
            })
        })
    }
}


//------------ RevocationRefs ------------------------------------------------

/// A decoded `complete-revocation-references` attribute value.
///
/// ```txt
/// CompleteRevocationRefs ::= SEQUENCE OF CrlOcspRef
/// ```
#[derive(Clone, Debug)]
pub struct RevocationRefs {
    refs: Vec<CrlOcspRef>,
}

impl RevocationRefs {
    /// Returns the revocation references.
    pub fn refs(&self) -> &[CrlOcspRef] {
        &self.refs
    }

    /// Decodes the attribute value.
    pub fn decode(value: &Captured) -> Result<Self, ValidationError> {
        let oid = Oid(Bytes::from_static(oid::AA_ETS_REVOCATION_REFS.0));
        let mut limit_hit = false;
        let res = Mode::Der.decode(
            value.as_slice().into_source(),
            |cons| cons.take_sequence(|cons| {
                let mut refs = Vec::new();
                while let Some(item) = CrlOcspRef::take_opt_from(cons)? {
                    if refs.len() >= MAX_SET_ENTRIES {
                        limit_hit = true;
                        return Err(cons.content_err(
                            "too many revocation references"
                        ))
                    }
                    refs.push(item);
                }
                Ok(RevocationRefs { refs })
            })
        );
        if limit_hit {
            return Err(ValidationError::ResourceLimitExceeded(
                "revocation reference sequence too large"
            ))
        }
        let res = res.map_err(|err| {
            ValidationError::attr_decode(&oid, err)
        })?;
        if res.refs.is_empty() {
            return Err(ValidationError::malformed_attr(
                &oid, "empty revocation reference sequence"
            ))
        }
        Ok(res)
    }
}


//------------ CrlOcspRef ----------------------------------------------------

/// The revocation references for one certificate of the path.
///
/// ```txt
/// CrlOcspRef ::= SEQUENCE {
///     crlids    [0] CRLListID    OPTIONAL,
///     ocspids   [1] OcspListID   OPTIONAL,
///     otherRev  [2] OtherRevRefs OPTIONAL }
/// ```
///
/// Other revocation references are read over without interpretation.
#[derive(Clone, Debug)]
pub struct CrlOcspRef {
    /// The referenced CRLs.
    crl_ids: Vec<CrlValidatedId>,

    /// The referenced OCSP responses.
    ocsp_ids: Vec<OcspResponsesId>,
}

impl CrlOcspRef {
    /// Returns the referenced CRLs.
    pub fn crl_ids(&self) -> &[CrlValidatedId] {
        &self.crl_ids
    }

    /// Returns the referenced OCSP responses.
    pub fn ocsp_ids(&self) -> &[OcspResponsesId] {
        &self.ocsp_ids
    }

    fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            // crlids [0] CRLListID ::= SEQUENCE { crls SEQUENCE OF ... }
            let crl_ids = cons.take_opt_constructed_if(
                Tag::CTX_0,
                |cons| cons.take_sequence(|cons| {
                    cons.take_sequence(|cons| {
                        let mut ids = Vec::new();
                        while let Some(id) = CrlValidatedId::take_opt_from(
                            cons
                        )? {
                            ids.push(id);
                        }
                        Ok(ids)
                    })
                })
            )?.unwrap_or_default();
            // ocspids [1] OcspListID, nested the same way
            let ocsp_ids = cons.take_opt_constructed_if(
                Tag::CTX_1,
                |cons| cons.take_sequence(|cons| {
                    cons.take_sequence(|cons| {
                        let mut ids = Vec::new();
                        while let Some(id) = OcspResponsesId::take_opt_from(
                            cons
                        )? {
                            ids.push(id);
                        }
                        Ok(ids)
                    })
                })
            )?.unwrap_or_default();
            // otherRev
            cons.take_opt_constructed_if(
                Tag::CTX_2, |cons| cons.skip_all()
            )?;
            Ok(CrlOcspRef { crl_ids, ocsp_ids })
        })
    }
}


//------------ CrlValidatedId ------------------------------------------------

/// A reference to one CRL that was consulted at signing time.
///
/// The optional `crlIdentifier` is kept in its captured encoding.
#[derive(Clone, Debug)]
pub struct CrlValidatedId {
    crl_hash: OtherHash,
    crl_identifier: Option<Captured>,
}

impl CrlValidatedId {
    /// Returns the hash over the referenced CRL.
    pub fn crl_hash(&self) -> &OtherHash {
        &self.crl_hash
    }

    /// Returns the captured CRL identifier if present.
    pub fn crl_identifier(&self) -> Option<&Captured> {
        self.crl_identifier.as_ref()
    }

    fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            let crl_hash = OtherHash::take_from(cons)?;
            let crl_identifier = cons.capture_all()?;
            let crl_identifier = if crl_identifier.as_slice().is_empty() {
                None
            }
            else {
                Some(crl_identifier)
            };
            Ok(CrlValidatedId { crl_hash, crl_identifier })
        })
    }
}


//------------ OcspResponsesId -----------------------------------------------

/// A reference to one OCSP response that was consulted at signing time.
///
/// ```txt
/// OcspResponsesID ::= SEQUENCE {
///     ocspIdentifier  OcspIdentifier,
///     ocspRepHash     OtherHash OPTIONAL }
/// ```
#[derive(Clone, Debug)]
pub struct OcspResponsesId {
    responder: ResponderId,
    produced_at: Time,
    response_hash: Option<OtherHash>,
}

impl OcspResponsesId {
    /// Returns who produced the referenced response.
    pub fn responder(&self) -> &ResponderId {
        &self.responder
    }

    /// Returns when the referenced response was produced.
    pub fn produced_at(&self) -> Time {
        self.produced_at
    }

    /// Returns the hash over the referenced response if present.
    pub fn response_hash(&self) -> Option<&OtherHash> {
        self.response_hash.as_ref()
    }

    fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            let (responder, produced_at) = cons.take_sequence(|cons| {
                Ok((
                    ResponderId::take_from(cons)?,
                    Time::take_from(cons)?,
                ))
            })?;
            let response_hash = OtherHash::take_opt_from(cons)?;
            Ok(OcspResponsesId { responder, produced_at, response_hash })
        })
    }
}


//------------ ResponderId ---------------------------------------------------

/// The identity of an OCSP responder.
///
/// ```txt
/// ResponderID ::= CHOICE {
///     byName  [1] Name,
///     byKey   [2] KeyHash }
/// ```
#[derive(Clone, Debug)]
pub enum ResponderId {
    /// The responder’s subject name.
    ByName(Name),

    /// The SHA-1 hash over the responder’s public key.
    ByKey(Bytes),
}

impl ResponderId {
    /// Takes a responder identity from an encoded constructed value.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        if let Some(name) = cons.take_opt_constructed_if(
            Tag::CTX_1, Name::take_from
        )? {
            return Ok(ResponderId::ByName(name))
        }
        cons.take_constructed_if(Tag::CTX_2, |cons| {
            Ok(ResponderId::ByKey(
                OctetString::take_from(cons)?.into_bytes()
            ))
        })
    }
}


//------------ validate_long_term_refs ---------------------------------------

/// Validates the long-term references of one signer.
///
/// Both attributes live in the unsigned attributes since they are added
/// after signing. Absence of either is reported, not an error.
pub fn validate_long_term_refs(
    table: &AttributeTable
) -> Result<LtvReport, ValidationError> {
    let certificate_refs = match table.unsigned_attr(
        &oid::AA_ETS_CERTIFICATE_REFS
    ) {
        Some(attr) => {
            let refs = CertificateRefs::decode(attr.single_value()?)?;
            Presence::Present(refs.refs().len())
        }
        None => Presence::Absent
    };
    let revocation_refs = match table.unsigned_attr(
        &oid::AA_ETS_REVOCATION_REFS
    ) {
        Some(attr) => {
            let refs = RevocationRefs::decode(attr.single_value()?)?;
            Presence::Present(refs.refs().len())
        }
        None => Presence::Absent
    };
    Ok(LtvReport { certificate_refs, revocation_refs })
}


//============ Tests =========================================================
