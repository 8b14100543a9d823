//! Embedded timestamp tokens.
//!
//! The `signature-time-stamp` unsigned attribute of RFC 5126, section
//! 6.1.1, carries a complete RFC 3161 timestamp token, which is itself a
//! CMS signed-data structure whose content is a `TSTInfo`. Since a
//! token’s own signers can in turn carry timestamp attributes, decoding
//! is bounded by [`MAX_TOKEN_DEPTH`].

use bcder::{decode, Mode, OctetString, Oid};
use bcder::decode::{DecodeError, IntoSource};
use bytes::Bytes;
use crate::oid;
use crate::attrs::AttributeTable;
use crate::cms::SignedData;
use crate::crypto::DigestAlgorithm;
use crate::error::ValidationError;
use crate::x509::{Serial, Time};


//------------ Constants -----------------------------------------------------

/// The maximum nesting depth for timestamp tokens.
///
/// A token at depth four may still carry the attribute but it is no
/// longer followed.
pub const MAX_TOKEN_DEPTH: usize = 4;


//------------ TimeStampToken ------------------------------------------------

/// A decoded timestamp token.
#[derive(Clone, Debug)]
pub struct TimeStampToken {
    /// The token’s CMS envelope.
    signed_data: SignedData,

    /// The timestamp information signed by the TSA.
    info: TstInfo,
}

impl TimeStampToken {
    /// Returns the token’s CMS envelope.
    pub fn signed_data(&self) -> &SignedData {
        &self.signed_data
    }

    /// Returns the signed timestamp information.
    pub fn info(&self) -> &TstInfo {
        &self.info
    }

    /// Takes the timestamp token from a signer’s attribute table.
    ///
    /// Returns `Ok(None)` if the attribute is absent. The `depth`
    /// argument counts how many tokens have already been entered on the
    /// way here; once it reaches [`MAX_TOKEN_DEPTH`], a present
    /// attribute is a resource-limit error rather than being decoded.
    pub fn from_table(
        table: &AttributeTable,
        depth: usize,
    ) -> Result<Option<Self>, ValidationError> {
        let attr = match table.unsigned_attr(
            &oid::AA_SIGNATURE_TIME_STAMP_TOKEN
        ) {
            Some(attr) => attr,
            None => return Ok(None)
        };
        if depth >= MAX_TOKEN_DEPTH {
            return Err(ValidationError::ResourceLimitExceeded(
                "timestamp token nesting too deep"
            ))
        }
        let value = attr.single_value()?;
        Self::decode(value.as_slice()).map(Some)
    }

    /// Decodes a timestamp token from its DER or BER encoding.
    ///
    /// Tokens in the wild are frequently BER, so decoding is lenient.
    pub fn decode(data: &[u8]) -> Result<Self, ValidationError> {
        let signed_data = SignedData::decode(data, false).map_err(|err| {
            ValidationError::MalformedTimestamp(err.to_string().into())
        })?;
        if signed_data.content_type() != &oid::CT_TST_INFO {
            return Err(ValidationError::MalformedTimestamp(
                "token content is not a TSTInfo".into()
            ))
        }
        let content = match signed_data.content() {
            Some(content) => content.to_bytes(),
            None => {
                return Err(ValidationError::MalformedTimestamp(
                    "token without embedded TSTInfo".into()
                ))
            }
        };
        let info = Mode::Ber.decode(
            content.into_source(), TstInfo::take_from
        ).map_err(|err| {
            ValidationError::MalformedTimestamp(err.to_string().into())
        })?;
        Ok(TimeStampToken { signed_data, info })
    }
}


//------------ TstInfo -------------------------------------------------------

/// The timestamp information of RFC 3161.
///
/// ```txt
/// TSTInfo ::= SEQUENCE {
///     version         INTEGER { v1(1) },
///     policy          TSAPolicyId,
///     messageImprint  MessageImprint,
///     serialNumber    INTEGER,
///     genTime         GeneralizedTime,
///     ... }
/// ```
///
/// Accuracy, ordering, nonce, the TSA name, and extensions are read
/// over without interpretation.
#[derive(Clone, Debug)]
pub struct TstInfo {
    /// The policy under which the TSA produced the token.
    policy: Oid<Bytes>,

    /// The TSA-assigned serial number of the token.
    serial_number: Serial,

    /// The imprint of the timestamped data.
    message_imprint: MessageImprint,

    /// The time asserted by the TSA.
    gen_time: Time,
}

impl TstInfo {
    /// Returns the TSA policy.
    pub fn policy(&self) -> &Oid<Bytes> {
        &self.policy
    }

    /// Returns the token’s serial number.
    pub fn serial_number(&self) -> Serial {
        self.serial_number
    }

    /// Returns the message imprint.
    pub fn message_imprint(&self) -> &MessageImprint {
        &self.message_imprint
    }

    /// Returns the asserted time.
    pub fn gen_time(&self) -> Time {
        self.gen_time
    }

    /// Takes the timestamp information from an encoded constructed value.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            cons.skip_u8_if(1)?; // version -- v1
            let policy = Oid::take_from(cons)?;
            let message_imprint = MessageImprint::take_from(cons)?;
            let serial_number = Serial::take_from(cons)?;
            let gen_time = Time::take_from(cons)?;
            // accuracy, ordering, nonce, tsa, extensions
            cons.skip_all()?;
            Ok(TstInfo {
                policy, serial_number, message_imprint, gen_time
            })
        })
    }
}


//------------ MessageImprint ------------------------------------------------

/// The hash over the data a timestamp token covers.
#[derive(Clone, Debug)]
pub struct MessageImprint {
    algorithm: DigestAlgorithm,
    hashed_message: Bytes,
}

impl MessageImprint {
    /// Returns the hash algorithm.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Returns the hash value.
    pub fn hashed_message(&self) -> &Bytes {
        &self.hashed_message
    }

    /// Takes a message imprint from an encoded constructed value.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            Ok(MessageImprint {
                algorithm: DigestAlgorithm::take_from(cons)?,
                hashed_message: OctetString::take_from(
                    cons
                )?.into_bytes(),
            })
        })
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use crate::attrs::AttributeTable;
    use crate::testenv;
    use super::*;

    fn table_of(env: bcder::Captured) -> AttributeTable {
        let data = SignedData::decode(env.as_slice(), true).unwrap();
        AttributeTable::from_signer_info(&data.signer_infos()[0]).unwrap()
    }

    #[test]
    fn absent_attribute_is_none() {
        let table = table_of(testenv::EnvelopeBuilder::new().build());
        assert!(TimeStampToken::from_table(&table, 0).unwrap().is_none());
    }

    #[test]
    fn decodes_embedded_token() {
        let table = table_of(
            testenv::EnvelopeBuilder::new().timestamped(42).build()
        );
        let token = TimeStampToken::from_table(
            &table, 0
        ).unwrap().unwrap();
        assert_eq!(token.info().serial_number(), Serial::from(42u64));
        assert_eq!(
            token.info().message_imprint().algorithm(),
            DigestAlgorithm::Sha256
        );
        assert_eq!(token.signed_data().signer_infos().len(), 1);
    }

    #[test]
    fn rejects_token_at_depth_limit() {
        let table = table_of(
            testenv::EnvelopeBuilder::new().timestamped(42).build()
        );
        let err = TimeStampToken::from_table(
            &table, MAX_TOKEN_DEPTH
        ).unwrap_err();
        assert!(err.is_resource_limit());
    }

    #[test]
    fn rejects_garbage_token() {
        let table = table_of(
            testenv::EnvelopeBuilder::new().garbage_timestamp().build()
        );
        let err = TimeStampToken::from_table(&table, 0).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedTimestamp(_)));
    }

    #[test]
    fn rejects_token_with_wrong_content_type() {
        let table = table_of(
            testenv::EnvelopeBuilder::new()
                .mislabeled_timestamp()
                .build()
        );
        let err = TimeStampToken::from_table(&table, 0).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedTimestamp(_)));
    }
}
