//! The validation driver and its report.
//!
//! [`validate`] decodes a CMS envelope and checks each signer’s
//! attributes: the signing-certificate binding, the long-term
//! references, and an embedded timestamp token whose own signers are
//! validated recursively. Each signer gets its own [`SignerReport`] or
//! [`ValidationError`]; one malformed signer never hides the others.

use std::fmt::Write as _;
use bytes::Bytes;
use crate::attrs::AttributeTable;
use crate::cms::{SignedData, SignerInfo};
use crate::crypto::DigestAlgorithm;
use crate::error::ValidationError;
use crate::ess::{self, BindingPolicy, CertificateBinding};
use crate::ltv::{self, LtvReport};
use crate::tst::{TimeStampToken, TstInfo};
use crate::x509::{Serial, Time};


//------------ validate ------------------------------------------------------

/// Validates the signature attributes of every signer in an envelope.
///
/// The input is a complete CMS `ContentInfo` in DER or BER. An envelope
/// that cannot be decoded at all is an error; everything below the
/// envelope is reported per signer. The reports appear in the order the
/// signers appear in the envelope, so output over the same input is
/// deterministic.
pub fn validate(
    data: &[u8],
    policy: BindingPolicy,
) -> Result<Vec<Result<SignerReport, ValidationError>>, ValidationError> {
    let signed_data = SignedData::decode(data, false)?;
    Ok(validate_signers(&signed_data, policy, 0))
}

/// Validates all signers of one envelope at the given token depth.
fn validate_signers(
    signed_data: &SignedData,
    policy: BindingPolicy,
    depth: usize,
) -> Vec<Result<SignerReport, ValidationError>> {
    signed_data.signer_infos().iter().map(|signer| {
        let res = SignerReport::from_signer(
            signed_data, signer, policy, depth
        );
        match res {
            Ok(_) => {
                log::debug!("validated signer {}", signer.sid());
            }
            Err(ref err) => {
                log::warn!("signer {}: {}", signer.sid(), err);
            }
        }
        res
    }).collect()
}


//------------ SignerReport --------------------------------------------------

/// The validation outcome for one signer.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SignerReport {
    /// The signer’s identifier in display form.
    pub signer: String,

    /// The signing-certificate binding verdict.
    pub binding: CertificateBinding,

    /// The presence of the long-term reference attributes.
    pub ltv: LtvReport,

    /// The embedded timestamp token, if any.
    pub timestamp: TimestampVerdict,
}

impl SignerReport {
    fn from_signer(
        signed_data: &SignedData,
        signer: &SignerInfo,
        policy: BindingPolicy,
        depth: usize,
    ) -> Result<Self, ValidationError> {
        let table = AttributeTable::from_signer_info(signer)?;
        let binding = ess::validate_signing_certificate(
            &table, signed_data.find_certificate(signer.sid()), policy
        )?;
        let ltv = ltv::validate_long_term_refs(&table)?;
        let timestamp = match TimeStampToken::from_table(&table, depth)? {
            Some(token) => TimestampVerdict::Present {
                info: TimestampInfo::from_tst_info(token.info()),
                signers: validate_signers(
                    token.signed_data(), policy, depth.saturating_add(1)
                ),
            },
            None => TimestampVerdict::Absent,
        };
        Ok(SignerReport {
            signer: signer.sid().to_string(),
            binding, ltv, timestamp,
        })
    }

    /// Returns whether this signer satisfies the given profile level.
    pub fn satisfies(&self, profile: Profile) -> bool {
        match profile {
            Profile::Bes | Profile::Epes => self.binding.is_bound(),
            Profile::T => {
                self.binding.is_bound() && self.timestamp.is_present()
            }
            Profile::C => {
                self.binding.is_bound()
                    && self.timestamp.is_present()
                    && self.ltv.is_complete()
            }
        }
    }
}


//------------ TimestampVerdict ----------------------------------------------

/// The outcome of inspecting a signer’s timestamp attribute.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TimestampVerdict {
    /// The signer carries no timestamp attribute.
    Absent,

    /// The signer carries a timestamp token.
    Present {
        /// The content of the token’s `TSTInfo`.
        info: TimestampInfo,

        /// The validation outcome for the token’s own signers.
        signers: Vec<Result<SignerReport, ValidationError>>,
    },
}

impl TimestampVerdict {
    /// Returns whether a timestamp token is present.
    pub fn is_present(&self) -> bool {
        matches!(self, TimestampVerdict::Present { .. })
    }
}


//------------ TimestampInfo -------------------------------------------------

/// The relevant content of a token’s `TSTInfo` for the report.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TimestampInfo {
    /// The TSA-assigned serial number of the token.
    pub serial_number: Serial,

    /// The algorithm of the message imprint.
    pub message_imprint_algorithm: DigestAlgorithm,

    /// The message imprint in hex.
    pub message_imprint: String,

    /// The time asserted by the TSA.
    pub gen_time: Time,
}

impl TimestampInfo {
    fn from_tst_info(info: &TstInfo) -> Self {
        TimestampInfo {
            serial_number: info.serial_number(),
            message_imprint_algorithm: info.message_imprint().algorithm(),
            message_imprint: hex(info.message_imprint().hashed_message()),
            gen_time: info.gen_time(),
        }
    }
}

fn hex(data: &Bytes) -> String {
    let mut res = String::with_capacity(data.len() * 2);
    for octet in data.iter() {
        // Writing into a String cannot fail.
        let _ = write!(&mut res, "{:02x}", octet);
    }
    res
}


//------------ Profile -------------------------------------------------------

/// The attribute profile levels a signer can be checked against.
///
/// Each level includes everything below it. `Epes` adds a signature
/// policy to `Bes`, which is outside attribute validation, so the two
/// check the same attributes here.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(
    feature = "serde", derive(serde::Serialize, serde::Deserialize)
)]
pub enum Profile {
    /// The basic electronic signature: a bound signing certificate.
    Bes,

    /// The explicit-policy signature. Checked like `Bes`.
    Epes,

    /// `Bes` plus an embedded timestamp token.
    T,

    /// `T` plus complete certificate and revocation references.
    C,
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use crate::ess::NotBoundReason;
    use crate::ltv::Presence;
    use crate::testenv;
    use super::*;

    #[test]
    fn full_cades_c_signer() {
        let env = testenv::EnvelopeBuilder::new()
            .bind_signer_certificate()
            .complete_references()
            .timestamped(42)
            .build();
        let reports = validate(
            env.as_slice(), BindingPolicy::SignerOnly
        ).unwrap();
        assert_eq!(reports.len(), 1);
        let report = reports[0].as_ref().unwrap();
        assert_eq!(report.binding, CertificateBinding::Bound);
        assert_eq!(report.ltv.certificate_refs, Presence::Present(2));
        assert_eq!(report.ltv.revocation_refs, Presence::Present(1));
        match report.timestamp {
            TimestampVerdict::Present { ref info, ref signers } => {
                assert_eq!(info.serial_number, Serial::from(42u64));
                assert_eq!(signers.len(), 1);
                assert!(signers[0].is_ok());
            }
            TimestampVerdict::Absent => panic!("expected timestamp"),
        }
        assert!(report.satisfies(Profile::Bes));
        assert!(report.satisfies(Profile::Epes));
        assert!(report.satisfies(Profile::T));
        assert!(report.satisfies(Profile::C));
    }

    #[test]
    fn bare_signer_satisfies_nothing() {
        let env = testenv::EnvelopeBuilder::new().build();
        let reports = validate(
            env.as_slice(), BindingPolicy::SignerOnly
        ).unwrap();
        let report = reports[0].as_ref().unwrap();
        assert_eq!(report.binding, CertificateBinding::Absent);
        assert!(!report.timestamp.is_present());
        assert!(!report.satisfies(Profile::Bes));
        assert!(!report.satisfies(Profile::T));
        assert!(!report.satisfies(Profile::C));
    }

    #[test]
    fn bound_without_refs_stops_at_t() {
        let env = testenv::EnvelopeBuilder::new()
            .bind_signer_certificate()
            .timestamped(7)
            .build();
        let reports = validate(
            env.as_slice(), BindingPolicy::SignerOnly
        ).unwrap();
        let report = reports[0].as_ref().unwrap();
        assert!(report.satisfies(Profile::T));
        assert!(!report.satisfies(Profile::C));
    }

    #[test]
    fn tampered_binding_is_reported_not_fatal() {
        let env = testenv::EnvelopeBuilder::new()
            .bind_signer_certificate_tampered()
            .build();
        let reports = validate(
            env.as_slice(), BindingPolicy::SignerOnly
        ).unwrap();
        let report = reports[0].as_ref().unwrap();
        assert_eq!(
            report.binding,
            CertificateBinding::NotBound(NotBoundReason::HashMismatch)
        );
        assert!(!report.satisfies(Profile::Bes));
    }

    #[test]
    fn garbage_envelope_is_an_error() {
        assert!(matches!(
            validate(b"not an envelope", BindingPolicy::SignerOnly),
            Err(ValidationError::MalformedStructure(_))
        ));
    }

    #[test]
    fn reports_are_deterministic() {
        let env = testenv::EnvelopeBuilder::new()
            .bind_signer_certificate()
            .complete_references()
            .timestamped(42)
            .build();
        let first = validate(
            env.as_slice(), BindingPolicy::SignerOnly
        ).unwrap();
        let second = validate(
            env.as_slice(), BindingPolicy::SignerOnly
        ).unwrap();
        let dump = |reports: &[Result<SignerReport, ValidationError>]| {
            reports.iter().map(|item| {
                format!("{:?}", item)
            }).collect::<Vec<_>>()
        };
        assert_eq!(dump(&first), dump(&second));
    }

    #[test]
    fn token_nesting_is_bounded() {
        // Five levels of tokens. The report follows four and refuses
        // the fifth.
        let env = testenv::nested_timestamp_envelope(5);
        let reports = validate(
            env.as_slice(), BindingPolicy::SignerOnly
        ).unwrap();
        let mut current = reports;
        for _ in 0..4 {
            let report = current.remove(0).unwrap();
            match report.timestamp {
                TimestampVerdict::Present { signers, .. } => {
                    current = signers;
                }
                TimestampVerdict::Absent => panic!("expected timestamp"),
            }
        }
        let err = current[0].as_ref().unwrap_err();
        assert!(err.is_resource_limit());
    }
}
