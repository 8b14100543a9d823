//! Certificates as they appear in a CMS certificate set.
//!
//! Attribute validation does not build or verify certificate chains, so
//! this module keeps only a minimal view of a certificate: the raw DER
//! encoding, which is what the `SigningCertificateV2` hash is computed
//! over, plus the fields needed to match a certificate against a signer
//! identifier.

use bcder::{decode, Captured, Mode, OctetString, Oid, Tag};
use bcder::decode::{DecodeError, IntoSource};
use bytes::Bytes;
use crate::oid;
use crate::x509::{Name, Serial};


//------------ Cert ----------------------------------------------------------

/// A certificate embedded in a CMS certificate set.
///
/// This is a read-only view over the certificate’s encoding. Everything
/// beyond the identification fields, including the public key and all
/// extensions other than the subject key identifier, is retained opaquely
/// in the raw encoding.
#[derive(Clone, Debug)]
pub struct Cert {
    /// The complete DER encoding of the certificate.
    raw: Captured,

    /// The serial number.
    serial: Serial,

    /// The issuer name.
    issuer: Name,

    /// The subject name.
    subject: Name,

    /// The subject key identifier extension, if present.
    subject_key_id: Option<Bytes>,
}

/// # Data Access
///
impl Cert {
    /// Returns the raw DER encoding of the certificate.
    ///
    /// This encoding is the input for the certificate hash stored in an
    /// `ESSCertIDv2` entry.
    pub fn raw_bytes(&self) -> &[u8] {
        self.raw.as_slice()
    }

    /// Returns the serial number.
    pub fn serial(&self) -> Serial {
        self.serial
    }

    /// Returns a reference to the issuer name.
    pub fn issuer(&self) -> &Name {
        &self.issuer
    }

    /// Returns a reference to the subject name.
    pub fn subject(&self) -> &Name {
        &self.subject
    }

    /// Returns the subject key identifier if the extension is present.
    pub fn subject_key_id(&self) -> Option<&Bytes> {
        self.subject_key_id.as_ref()
    }
}

/// # Decoding
///
impl Cert {
    /// Takes an optional certificate from a constructed value.
    ///
    /// Returns `Ok(None)` if the next value is not a plain certificate
    /// sequence. The obsolete and extended choices of the CMS
    /// `CertificateChoices` are left for the caller to skip.
    pub fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        let mut parsed = None;
        let raw = cons.capture(|cons| {
            match cons.take_opt_sequence(|cons| {
                parsed = Some(Self::from_sequence(cons)?);
                Ok(())
            })? {
                Some(()) => Ok(()),
                None => Ok(())
            }
        })?;
        match parsed {
            Some((serial, issuer, subject, subject_key_id)) => {
                Ok(Some(Cert {
                    raw, serial, issuer, subject, subject_key_id
                }))
            }
            None => Ok(None)
        }
    }

    /// Parses the interesting fields from the certificate sequence.
    #[allow(clippy::type_complexity)]
    fn from_sequence<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<
        (Serial, Name, Name, Option<Bytes>),
        DecodeError<S::Error>
    > {
        let res = cons.take_sequence(|cons| { // tbsCertificate
            cons.take_opt_constructed_if( // version
                Tag::CTX_0, |cons| cons.skip_all()
            )?;
            let serial = Serial::take_from(cons)?;
            cons.take_sequence(|cons| cons.skip_all())?; // signature
            let issuer = Name::take_from(cons)?;
            cons.take_sequence(|cons| cons.skip_all())?; // validity
            let subject = Name::take_from(cons)?;
            cons.skip_one()?; // subjectPublicKeyInfo
            cons.take_opt_primitive_if( // issuerUniqueID
                Tag::CTX_1, |prim| prim.skip_all()
            )?;
            cons.take_opt_primitive_if( // subjectUniqueID
                Tag::CTX_2, |prim| prim.skip_all()
            )?;
            let subject_key_id = Self::take_subject_key_id(cons)?;
            Ok((serial, issuer, subject, subject_key_id))
        })?;
        // signatureAlgorithm and signatureValue
        cons.skip_all()?;
        Ok(res)
    }

    /// Parses the extensions looking for the subject key identifier.
    fn take_subject_key_id<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Option<Bytes>, DecodeError<S::Error>> {
        let mut key_id = None;
        cons.take_opt_constructed_if(Tag::CTX_3, |cons| {
            cons.take_sequence(|cons| {
                while let Some(()) = cons.take_opt_sequence(|cons| {
                    let id = Oid::take_from(cons)?;
                    let _critical = cons.take_opt_bool()?.unwrap_or(false);
                    let value = OctetString::take_from(cons)?;
                    if id == oid::CE_SUBJECT_KEY_IDENTIFIER {
                        if key_id.is_some() {
                            return Err(cons.content_err(
                                "duplicate Subject Key Identifier extension"
                            ))
                        }
                        key_id = Some(
                            Mode::Der.decode(
                                value.into_source(),
                                OctetString::take_from
                            ).map_err(DecodeError::convert)?.into_bytes()
                        );
                    }
                    Ok(())
                })? { }
                Ok(())
            })
        })?;
        Ok(key_id)
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use bcder::Mode;
    use crate::testenv;
    use super::*;

    #[test]
    fn decode_certificate() {
        let der = testenv::cert_der(12, b"Test CA", b"Signer", Some(b"ski"));
        let cert = Mode::Der.decode(der.as_slice(), |cons| {
            Cert::take_opt_from(cons)
        }).unwrap().unwrap();
        assert_eq!(cert.serial(), Serial::from(12u64));
        assert_eq!(
            cert.subject_key_id().map(|b| b.as_ref()),
            Some(b"ski".as_ref())
        );
        assert_eq!(cert.raw_bytes(), der.as_slice());
    }

    #[test]
    fn decode_without_key_id() {
        let der = testenv::cert_der(7, b"Test CA", b"Signer", None);
        let cert = Mode::Der.decode(der.as_slice(), |cons| {
            Cert::take_opt_from(cons)
        }).unwrap().unwrap();
        assert_eq!(cert.serial(), Serial::from(7u64));
        assert!(cert.subject_key_id().is_none());
    }

    #[test]
    fn distinct_names_differ() {
        let der = testenv::cert_der(7, b"Test CA", b"Signer", None);
        let cert = Mode::Der.decode(der.as_slice(), |cons| {
            Cert::take_opt_from(cons)
        }).unwrap().unwrap();
        assert_ne!(cert.issuer(), cert.subject());
    }
}
