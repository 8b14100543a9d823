//! The CMS signed-data envelope.
//
// See RFC 5652.

use std::fmt;
use bcder::{decode, Captured, Mode, OctetString, Oid, Tag};
use bcder::decode::{DecodeError, IntoSource, Source};
use bytes::Bytes;
use crate::oid;
use crate::cert::Cert;
use crate::x509::{Name, Serial};


//------------ Constants -----------------------------------------------------

/// The maximum number of entries accepted in any set or sequence.
///
/// Decoding fails rather than allocating unbounded memory once a
/// certificate set, signer-info set, attribute set or reference sequence
/// exceeds this count.
pub const MAX_SET_ENTRIES: usize = 10_000;


//------------ SignedData ----------------------------------------------------

/// A decoded CMS signed-data envelope.
///
/// This is a read-only view over the supplied bytes: the content-info
/// content type, the optional encapsulated content, the certificate set,
/// and the signer infos. Nothing is verified at this point; the envelope
/// only guarantees structural well-formedness and the presence of at
/// least one signer.
#[derive(Clone, Debug)]
pub struct SignedData {
    /// The content type of the encapsulated content.
    content_type: Oid<Bytes>,

    /// The encapsulated content if it is not detached.
    content: Option<OctetString>,

    /// The certificates travelling with the envelope.
    certificates: Vec<Cert>,

    /// The signer infos. Never empty.
    signer_infos: Vec<SignerInfo>,
}

/// # Data Access
///
impl SignedData {
    /// Returns a reference to the content type of the inner content.
    pub fn content_type(&self) -> &Oid<Bytes> {
        &self.content_type
    }

    /// Returns a reference to the encapsulated content.
    ///
    /// Returns `None` for a detached signature, which is fine for
    /// attribute validation since the content digest is not checked here.
    pub fn content(&self) -> Option<&OctetString> {
        self.content.as_ref()
    }

    /// Returns the certificates travelling with the envelope.
    pub fn certificates(&self) -> &[Cert] {
        &self.certificates
    }

    /// Returns the signer infos.
    pub fn signer_infos(&self) -> &[SignerInfo] {
        &self.signer_infos
    }

    /// Returns the certificate matching the given signer identifier.
    pub fn find_certificate(
        &self, sid: &SignerIdentifier
    ) -> Option<&Cert> {
        self.certificates.iter().find(|cert| sid.matches(cert))
    }
}

/// # Decoding
///
impl SignedData {
    /// Decodes a signed-data envelope from the given source.
    ///
    /// If `strict` is `true`, the source must be in DER encoding,
    /// otherwise BER is accepted as well.
    pub fn decode<S: IntoSource>(
        source: S,
        strict: bool,
    ) -> Result<Self, DecodeError<<S::Source as Source>::Error>> {
        if strict {
            Mode::Der
        }
        else {
            Mode::Ber
        }.decode(source.into_source(), Self::take_from)
    }

    /// Takes a signed-data envelope from an encoded constructed value.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| { // ContentInfo
            oid::SIGNED_DATA.skip_if(cons)?; // contentType
            cons.take_constructed_if(Tag::CTX_0, |cons| { // content
                cons.take_sequence(Self::from_signed_data)
            })
        })
    }

    fn from_signed_data<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        // version -- any CMS version, the attribute layer does not care.
        cons.take_primitive_if(Tag::INTEGER, |prim| prim.skip_all())?;

        // digestAlgorithms -- read over, unused algorithms are fine here.
        cons.take_constructed_if(Tag::SET, |cons| {
            while let Some(()) = cons.take_opt_sequence(
                |cons| cons.skip_all()
            )? { }
            Ok(())
        })?;

        // encapContentInfo -- eContent may be absent (detached).
        let (content_type, content) = cons.take_sequence(|cons| {
            Ok((
                Oid::take_from(cons)?,
                cons.take_opt_constructed_if(
                    Tag::CTX_0,
                    OctetString::take_from
                )?
            ))
        })?;

        let certificates = Self::take_certificates(cons)?;

        // crls -- present in some profiles, irrelevant here.
        cons.take_opt_constructed_if(Tag::CTX_1, |cons| cons.skip_all())?;

        let signer_infos = cons.take_set(|cons| {
            let mut infos = Vec::new();
            while let Some(info) = SignerInfo::take_opt_from(cons)? {
                if infos.len() >= MAX_SET_ENTRIES {
                    return Err(cons.content_err(
                        "too many signer infos"
                    ))
                }
                infos.push(info);
            }
            Ok(infos)
        })?;
        if signer_infos.is_empty() {
            return Err(cons.content_err(
                "signed-data without signer infos"
            ))
        }

        Ok(SignedData {
            content_type, content, certificates, signer_infos
        })
    }

    /// Parses the optional certificate set.
    ///
    /// Entries of the obsolete or extended `CertificateChoices` variants
    /// are skipped over.
    fn take_certificates<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Vec<Cert>, DecodeError<S::Error>> {
        let mut certs = Vec::new();
        cons.take_opt_constructed_if(Tag::CTX_0, |cons| {
            loop {
                if let Some(cert) = Cert::take_opt_from(cons)? {
                    if certs.len() >= MAX_SET_ENTRIES {
                        return Err(cons.content_err(
                            "too many certificates"
                        ))
                    }
                    certs.push(cert);
                }
                else if cons.skip_one()?.is_none() {
                    break
                }
            }
            Ok(())
        })?;
        Ok(certs)
    }
}


//------------ SignerInfo ----------------------------------------------------

/// A single signer of a signed-data envelope.
///
/// The signed and unsigned attribute sets are kept in their captured
/// encoding; [`AttributeTable::from_signer_info`] indexes them.
///
/// [`AttributeTable::from_signer_info`]: crate::attrs::AttributeTable::from_signer_info
#[derive(Clone, Debug)]
pub struct SignerInfo {
    /// The signer identifier.
    sid: SignerIdentifier,

    /// The object identifier of the signer’s digest algorithm.
    digest_algorithm: Oid<Bytes>,

    /// The object identifier of the signature algorithm.
    signature_algorithm: Oid<Bytes>,

    /// The signature value.
    signature: Bytes,

    /// The captured content of the signed attribute set, if present.
    signed_attrs: Option<Captured>,

    /// The captured content of the unsigned attribute set, if present.
    unsigned_attrs: Option<Captured>,
}

/// # Data Access
///
impl SignerInfo {
    /// Returns a reference to the signer identifier.
    pub fn sid(&self) -> &SignerIdentifier {
        &self.sid
    }

    /// Returns a reference to the digest algorithm identifier.
    pub fn digest_algorithm(&self) -> &Oid<Bytes> {
        &self.digest_algorithm
    }

    /// Returns a reference to the signature algorithm identifier.
    pub fn signature_algorithm(&self) -> &Oid<Bytes> {
        &self.signature_algorithm
    }

    /// Returns a reference to the signature value.
    pub fn signature(&self) -> &Bytes {
        &self.signature
    }

    /// Returns the captured signed attribute set if present.
    pub fn signed_attrs(&self) -> Option<&Captured> {
        self.signed_attrs.as_ref()
    }

    /// Returns the captured unsigned attribute set if present.
    pub fn unsigned_attrs(&self) -> Option<&Captured> {
        self.unsigned_attrs.as_ref()
    }
}

/// # Decoding
///
impl SignerInfo {
    /// Takes an optional signer info from an encoded constructed value.
    pub fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            // version -- 1 or 3 depending on the sid choice; either is
            // fine for attribute validation.
            cons.take_primitive_if(Tag::INTEGER, |prim| prim.skip_all())?;
            let sid = SignerIdentifier::take_from(cons)?;
            let digest_algorithm = take_algorithm_identifier(cons)?;
            let signed_attrs = cons.take_opt_constructed_if(
                Tag::CTX_0, |cons| cons.capture_all()
            )?;
            let signature_algorithm = take_algorithm_identifier(cons)?;
            let signature = OctetString::take_from(cons)?.into_bytes();
            let unsigned_attrs = cons.take_opt_constructed_if(
                Tag::CTX_1, |cons| cons.capture_all()
            )?;
            Ok(SignerInfo {
                sid, digest_algorithm, signature_algorithm, signature,
                signed_attrs, unsigned_attrs,
            })
        })
    }
}


//------------ SignerIdentifier ----------------------------------------------

/// The identifier of a signer, matching a certificate in the envelope.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SignerIdentifier {
    /// The signer is identified by issuer name and serial number.
    IssuerAndSerial {
        issuer: Name,
        serial: Serial,
    },

    /// The signer is identified by the subject key identifier extension
    /// of its certificate.
    SubjectKeyId(Bytes),
}

impl SignerIdentifier {
    /// Takes a signer identifier from an encoded constructed value.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        if let Some(res) = cons.take_opt_sequence(|cons| {
            Ok(SignerIdentifier::IssuerAndSerial {
                issuer: Name::take_from(cons)?,
                serial: Serial::take_from(cons)?,
            })
        })? {
            return Ok(res)
        }
        cons.take_value_if(Tag::CTX_0, |content| {
            OctetString::from_content(content)
        }).map(|id| SignerIdentifier::SubjectKeyId(id.into_bytes()))
    }

    /// Returns whether the given certificate is the one identified.
    pub fn matches(&self, cert: &Cert) -> bool {
        match self {
            SignerIdentifier::IssuerAndSerial { issuer, serial } => {
                cert.issuer() == issuer && cert.serial() == *serial
            }
            SignerIdentifier::SubjectKeyId(id) => {
                cert.subject_key_id() == Some(id)
            }
        }
    }
}

impl fmt::Display for SignerIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SignerIdentifier::IssuerAndSerial { serial, .. } => {
                write!(f, "issuer-and-serial {}", serial)
            }
            SignerIdentifier::SubjectKeyId(id) => {
                write!(f, "subject-key-id ")?;
                for octet in id.as_ref() {
                    write!(f, "{:02x}", octet)?;
                }
                Ok(())
            }
        }
    }
}


//------------ Helper Functions ----------------------------------------------

/// Takes an algorithm identifier, returning only its object identifier.
///
/// Any parameters are read over; the attribute layer never interprets
/// the envelope-level algorithms.
fn take_algorithm_identifier<S: decode::Source>(
    cons: &mut decode::Constructed<S>
) -> Result<Oid<Bytes>, DecodeError<S::Error>> {
    cons.take_sequence(|cons| {
        let oid = Oid::take_from(cons)?;
        cons.skip_all()?;
        Ok(oid)
    })
}


//============ Tests =========================================================
