//! Building blocks for test input.
//!
//! There are no fixture files; every test constructs its envelope with
//! the encoder combinators and decodes it right back. [`EnvelopeBuilder`]
//! produces a minimal signed-data envelope with one signer and one
//! certificate and grows attributes as the individual tests need them.

use bcder::{encode, Captured, ConstOid, Mode, OctetString, Oid, Tag};
use bcder::encode::PrimitiveContent;
use crate::oid;
use crate::crypto::DigestAlgorithm;
use crate::x509::{Serial, Time};

/// The eContentType of the built envelopes: id-data.
const DATA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 1]);

/// The TSA policy used in built timestamp tokens.
const TSA_POLICY: ConstOid = Oid(&[42, 3, 4, 1]);

/// The serial number of the builder’s signer certificate.
const CERT_SERIAL: u64 = 12;

/// The issuer name of the builder’s signer certificate.
const CERT_ISSUER: &[u8] = b"Test CA";

/// A fixed time for generated timestamp tokens.
fn gen_time() -> Time {
    Time::utc(2026, 1, 15, 12, 0, 0)
}

/// Returns the encoder for a single-CN name.
fn name(text: &[u8]) -> impl encode::Values + '_ {
    encode::sequence(encode::set(encode::sequence((
        oid::AT_COMMON_NAME.encode(),
        OctetString::encode_slice(text),
    ))))
}

/// Builds the DER encoding of a minimal certificate.
///
/// Only the fields the decoder looks at carry real data; the key and
/// signature fields are placeholders.
pub fn cert_der(
    serial: u64,
    issuer: &[u8],
    subject: &[u8],
    ski: Option<&[u8]>,
) -> Captured {
    let extensions = ski.map(|ski| {
        // extnValue is an OCTET STRING wrapping the DER of the value.
        let value = Captured::from_values(
            Mode::Der, OctetString::encode_slice(ski)
        );
        encode::sequence_as(Tag::CTX_3, encode::sequence(
            encode::sequence((
                oid::CE_SUBJECT_KEY_IDENTIFIER.encode(),
                OctetString::encode_slice(value.into_bytes()),
            ))
        ))
    });
    Captured::from_values(Mode::Der, encode::sequence((
        encode::sequence(( // tbsCertificate
            encode::sequence_as(Tag::CTX_0, 2u8.encode()), // version
            Serial::from(serial).encode(),
            encode::sequence(oid::SHA256.encode()), // signature
            name(issuer),
            encode::sequence(( // validity
                Time::utc(2024, 1, 1, 0, 0, 0).encode_utc_time(),
                Time::utc(2034, 1, 1, 0, 0, 0).encode_utc_time(),
            )),
            name(subject),
            encode::sequence(( // subjectPublicKeyInfo
                encode::sequence(oid::SHA256.encode()),
                OctetString::encode_slice(b"key".as_ref()),
            )),
            extensions,
        )),
        encode::sequence(oid::SHA256.encode()), // signatureAlgorithm
        OctetString::encode_slice(b"sig".as_ref()), // signatureValue
    )))
}

/// Returns a content info whose content type is not signed-data.
pub fn not_signed_data_der() -> Captured {
    Captured::from_values(Mode::Der, encode::sequence((
        DATA.encode(),
        encode::sequence_as(
            Tag::CTX_0,
            OctetString::encode_slice(b"content".as_ref())
        ),
    )))
}

/// Builds an envelope whose signer starts a chain of `levels` nested
/// timestamp tokens.
pub fn nested_timestamp_envelope(levels: usize) -> Captured {
    assert!(levels > 0);
    let mut inner = None;
    for _ in 1..levels {
        inner = Some(token(9, inner.as_ref(), false));
    }
    let outer = token(9, inner.as_ref(), false);
    EnvelopeBuilder::new()
        .unsigned_attr(oid::AA_SIGNATURE_TIME_STAMP_TOKEN, &outer)
        .build()
}

/// Builds a timestamp token around a fresh `TSTInfo`.
///
/// The token’s signer carries the `nested` token as its own timestamp
/// attribute if given. With `mislabeled`, the content type of the
/// encapsulated content is id-data instead of id-ct-TSTInfo.
fn token(
    serial: u64,
    nested: Option<&Captured>,
    mislabeled: bool,
) -> Captured {
    let imprint = DigestAlgorithm::Sha256.digest(b"content");
    let tst_info = Captured::from_values(Mode::Der, encode::sequence((
        1u8.encode(), // version
        TSA_POLICY.encode(),
        encode::sequence(( // messageImprint
            encode::sequence(oid::SHA256.encode()),
            OctetString::encode_slice(imprint),
        )),
        Serial::from(serial).encode(),
        gen_time().encode_generalized_time(),
    )));
    let unsigned_attrs = nested.map(|token| {
        encode::sequence_as(Tag::CTX_1, encode::sequence((
            oid::AA_SIGNATURE_TIME_STAMP_TOKEN.encode(),
            encode::set(token),
        )))
    });
    let signer = encode::sequence((
        1u8.encode(), // version
        encode::sequence(( // sid
            name(b"Test TSA"),
            Serial::from(17u64).encode(),
        )),
        encode::sequence(oid::SHA256.encode()), // digestAlgorithm
        encode::sequence(oid::SHA256.encode()), // signatureAlgorithm
        OctetString::encode_slice(b"sig".as_ref()),
        unsigned_attrs,
    ));
    let content_type = if mislabeled { DATA } else { oid::CT_TST_INFO };
    Captured::from_values(Mode::Der, encode::sequence((
        oid::SIGNED_DATA.encode(),
        encode::sequence_as(Tag::CTX_0, encode::sequence((
            3u8.encode(), // version
            encode::set(encode::sequence(oid::SHA256.encode())),
            encode::sequence(( // encapContentInfo
                content_type.encode(),
                encode::sequence_as(
                    Tag::CTX_0,
                    OctetString::encode_slice(tst_info.into_bytes())
                ),
            )),
            encode::set(signer),
        ))),
    )))
}


//------------ EnvelopeBuilder -----------------------------------------------

/// Builds a signed-data envelope with one signer.
pub struct EnvelopeBuilder {
    /// The signer certificate carried in the certificate set.
    cert: Captured,

    /// Leave out the encapsulated content.
    detached: bool,

    /// Leave out the certificate set.
    omit_certs: bool,

    /// Encode an empty signer-info set.
    no_signers: bool,

    /// The encoded signed attributes.
    signed_attrs: Vec<Captured>,

    /// The encoded unsigned attributes.
    unsigned_attrs: Vec<Captured>,
}

impl EnvelopeBuilder {
    pub fn new() -> Self {
        EnvelopeBuilder {
            cert: cert_der(CERT_SERIAL, CERT_ISSUER, b"Signer", None),
            detached: false,
            omit_certs: false,
            no_signers: false,
            signed_attrs: Vec::new(),
            unsigned_attrs: Vec::new(),
        }
    }

    pub fn detached(mut self) -> Self {
        self.detached = true;
        self
    }

    pub fn omit_certificates(mut self) -> Self {
        self.omit_certs = true;
        self
    }

    pub fn no_signers(mut self) -> Self {
        self.no_signers = true;
        self
    }

    /// Adds a signed attribute with the given values.
    pub fn signed_attr(
        mut self, oid: ConstOid, values: impl encode::Values
    ) -> Self {
        self.signed_attrs.push(Captured::from_values(
            Mode::Der,
            encode::sequence((oid.encode(), encode::set(values)))
        ));
        self
    }

    /// Adds an unsigned attribute with the given values.
    pub fn unsigned_attr(
        mut self, oid: ConstOid, values: impl encode::Values
    ) -> Self {
        self.unsigned_attrs.push(Captured::from_values(
            Mode::Der,
            encode::sequence((oid.encode(), encode::set(values)))
        ));
        self
    }

    /// Adds an arbitrary encoding as a whole signed attribute.
    pub fn raw_signed_attr(mut self, attr: impl encode::Values) -> Self {
        self.signed_attrs.push(Captured::from_values(Mode::Der, attr));
        self
    }

    /// Adds a signing-certificate attribute hashing the signer cert.
    pub fn bind_signer_certificate(self) -> Self {
        let hash = DigestAlgorithm::Sha256.digest(self.cert.as_slice());
        let hash = hash.as_ref().to_vec();
        self.signing_certificate_attr(vec![hash])
    }

    /// Like [`bind_signer_certificate`] but with a broken hash.
    ///
    /// [`bind_signer_certificate`]: Self::bind_signer_certificate
    pub fn bind_signer_certificate_tampered(self) -> Self {
        let hash = DigestAlgorithm::Sha256.digest(self.cert.as_slice());
        let mut hash = hash.as_ref().to_vec();
        hash[0] ^= 1;
        self.signing_certificate_attr(vec![hash])
    }

    /// Adds a signing-certificate attribute with a second reference.
    ///
    /// The first reference hashes the signer certificate, the second
    /// something else entirely.
    pub fn bind_signer_certificate_with_extra_ref(self) -> Self {
        let hash = DigestAlgorithm::Sha256.digest(self.cert.as_slice());
        let hash = hash.as_ref().to_vec();
        let other = DigestAlgorithm::Sha256.digest(b"issuing CA cert");
        let other = other.as_ref().to_vec();
        self.signing_certificate_attr(vec![hash, other])
    }

    /// Adds a signing-certificate attribute without any references.
    pub fn bind_signer_certificate_empty(self) -> Self {
        self.signing_certificate_attr(Vec::new())
    }

    fn signing_certificate_attr(self, hashes: Vec<Vec<u8>>) -> Self {
        let value = Captured::from_values(Mode::Der, encode::sequence(
            encode::sequence(encode::slice(&hashes, |hash| {
                // ESSCertIDv2 with the default hash algorithm.
                encode::sequence(
                    OctetString::encode_slice(hash.clone())
                )
            }))
        ));
        self.signed_attr(oid::AA_SIGNING_CERTIFICATE_V2, &value)
    }

    /// Adds both reference attributes of the `C` level.
    pub fn complete_references(self) -> Self {
        self.certificate_refs_only().revocation_refs()
    }

    /// Adds a certificate-references attribute with two entries.
    pub fn certificate_refs_only(self) -> Self {
        let signer = DigestAlgorithm::Sha1.digest(self.cert.as_slice());
        let signer = signer.as_ref().to_vec();
        let issuer = DigestAlgorithm::Sha1.digest(b"issuing CA cert");
        let issuer = issuer.as_ref().to_vec();
        let value = Captured::from_values(Mode::Der, encode::sequence((
            encode::sequence(
                OctetString::encode_slice(signer)
            ),
            encode::sequence(
                OctetString::encode_slice(issuer)
            ),
        )));
        self.unsigned_attr(oid::AA_ETS_CERTIFICATE_REFS, &value)
    }

    /// Adds an empty certificate-references attribute.
    pub fn empty_certificate_refs(self) -> Self {
        let empty = Captured::empty(Mode::Der);
        let value = Captured::from_values(
            Mode::Der, encode::sequence(&empty)
        );
        self.unsigned_attr(oid::AA_ETS_CERTIFICATE_REFS, &value)
    }

    /// Adds a revocation-references attribute with one CRL and one
    /// OCSP reference.
    fn revocation_refs(self) -> Self {
        let crl_hash = DigestAlgorithm::Sha1.digest(b"crl");
        let crl_hash = crl_hash.as_ref().to_vec();
        let key_hash = DigestAlgorithm::Sha1.digest(b"responder key");
        let key_hash = key_hash.as_ref().to_vec();
        let value = Captured::from_values(Mode::Der, encode::sequence(
            encode::sequence(( // CrlOcspRef
                encode::sequence_as(Tag::CTX_0, encode::sequence(
                    encode::sequence( // crls
                        encode::sequence( // CrlValidatedID
                            OctetString::encode_slice(crl_hash)
                        )
                    )
                )),
                encode::sequence_as(Tag::CTX_1, encode::sequence(
                    encode::sequence( // ocspResponses
                        encode::sequence( // OcspResponsesID
                            encode::sequence(( // OcspIdentifier
                                encode::sequence_as(
                                    Tag::CTX_2,
                                    OctetString::encode_slice(key_hash)
                                ),
                                gen_time().encode_generalized_time(),
                            ))
                        )
                    )
                )),
            ))
        ));
        self.unsigned_attr(oid::AA_ETS_REVOCATION_REFS, &value)
    }

    /// Adds a timestamp attribute with a token of the given serial.
    pub fn timestamped(self, serial: u64) -> Self {
        let token = token(serial, None, false);
        self.unsigned_attr(oid::AA_SIGNATURE_TIME_STAMP_TOKEN, &token)
    }

    /// Adds a timestamp attribute whose value is not a token at all.
    pub fn garbage_timestamp(self) -> Self {
        self.unsigned_attr(
            oid::AA_SIGNATURE_TIME_STAMP_TOKEN,
            OctetString::encode_slice(b"junk".as_ref()),
        )
    }

    /// Adds a timestamp token whose content is not a `TSTInfo`.
    pub fn mislabeled_timestamp(self) -> Self {
        let token = token(9, None, true);
        self.unsigned_attr(oid::AA_SIGNATURE_TIME_STAMP_TOKEN, &token)
    }

    /// Assembles the envelope.
    pub fn build(self) -> Captured {
        let content = if self.detached {
            None
        }
        else {
            Some(encode::sequence_as(
                Tag::CTX_0,
                OctetString::encode_slice(b"content".as_ref())
            ))
        };
        let certs = if self.omit_certs {
            None
        }
        else {
            Some(encode::sequence_as(Tag::CTX_0, &self.cert))
        };
        let signed_attrs = if self.signed_attrs.is_empty() {
            None
        }
        else {
            Some(encode::sequence_as(
                Tag::CTX_0,
                encode::slice(&self.signed_attrs, |attr| attr.clone())
            ))
        };
        let unsigned_attrs = if self.unsigned_attrs.is_empty() {
            None
        }
        else {
            Some(encode::sequence_as(
                Tag::CTX_1,
                encode::slice(&self.unsigned_attrs, |attr| attr.clone())
            ))
        };
        let signer_set = if self.no_signers {
            Captured::empty(Mode::Der)
        }
        else {
            Captured::from_values(Mode::Der, encode::sequence((
                1u8.encode(), // version
                encode::sequence(( // sid
                    name(CERT_ISSUER),
                    Serial::from(CERT_SERIAL).encode(),
                )),
                encode::sequence(oid::SHA256.encode()),
                signed_attrs,
                encode::sequence(oid::SHA256.encode()),
                OctetString::encode_slice(b"sig".as_ref()),
                unsigned_attrs,
            )))
        };
        Captured::from_values(Mode::Der, encode::sequence((
            oid::SIGNED_DATA.encode(),
            encode::sequence_as(Tag::CTX_0, encode::sequence((
                3u8.encode(), // version
                encode::set(
                    encode::sequence(oid::SHA256.encode())
                ),
                encode::sequence((DATA.encode(), content)),
                certs,
                encode::set(&signer_set),
            ))),
        )))
    }
}
