//! The object identifiers used in this crate.
//!
//! This module collects all the object identifiers used at various places
//! in this crate in one central place. They are public so you can refer to
//! them should that ever become necessary.

use bcder::{ConstOid, Oid};

/// [RFC 5652](https://tools.ietf.org/html/rfc5652) `id-signedData`
///
/// Identifies the signed-data content type of a CMS `ContentInfo`.
pub const SIGNED_DATA: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 2]);

/// [RFC 5652](https://tools.ietf.org/html/rfc5652) `id-contentType`
pub const CONTENT_TYPE: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 3]);

/// [RFC 5652](https://tools.ietf.org/html/rfc5652) `id-messageDigest`
pub const MESSAGE_DIGEST: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 4]);

/// [RFC 5652](https://tools.ietf.org/html/rfc5652) `id-signingTime`
pub const SIGNING_TIME: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 5]);

/// [RFC 5035](https://tools.ietf.org/html/rfc5035)
/// `id-aa-signingCertificateV2`
///
/// The signed attribute binding a signature to the hash of the signer’s
/// certificate. Mandatory at all CAdES levels.
pub const AA_SIGNING_CERTIFICATE_V2: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 47]);

/// [RFC 5126](https://tools.ietf.org/html/rfc5126)
/// `id-aa-ets-certificateRefs`
///
/// The unsigned attribute listing references to the certificates of the
/// validation chain. Mandatory at the CAdES-C level.
pub const AA_ETS_CERTIFICATE_REFS: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 21]);

/// [RFC 5126](https://tools.ietf.org/html/rfc5126)
/// `id-aa-ets-revocationRefs`
///
/// The unsigned attribute listing references to the revocation data used
/// for the validation chain. Mandatory at the CAdES-C level.
pub const AA_ETS_REVOCATION_REFS: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 22]);

/// [RFC 3161](https://tools.ietf.org/html/rfc3161)
/// `id-aa-signatureTimeStampToken`
///
/// The unsigned attribute carrying a timestamp token over the signature
/// value. Mandatory at the CAdES-T level and above.
pub const AA_SIGNATURE_TIME_STAMP_TOKEN: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 14]);

/// [RFC 3161](https://tools.ietf.org/html/rfc3161) `id-ct-TSTInfo`
///
/// The content type of the `SignedData` nested inside a timestamp token.
pub const CT_TST_INFO: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 1, 4]);

/// `id-sha1`, 1.3.14.3.2.26
pub const SHA1: ConstOid = Oid(&[43, 14, 3, 2, 26]);

/// [RFC 4055](https://tools.ietf.org/html/rfc4055) `id-sha256`
pub const SHA256: ConstOid
    = Oid(&[96, 134, 72, 1, 101, 3, 4, 2, 1]);

/// [RFC 4055](https://tools.ietf.org/html/rfc4055) `id-sha384`
pub const SHA384: ConstOid
    = Oid(&[96, 134, 72, 1, 101, 3, 4, 2, 2]);

/// [RFC 4055](https://tools.ietf.org/html/rfc4055) `id-sha512`
pub const SHA512: ConstOid
    = Oid(&[96, 134, 72, 1, 101, 3, 4, 2, 3]);

pub const AT_COMMON_NAME: ConstOid = Oid(&[85, 4, 3]); // 2 5 4 3

pub const CE_SUBJECT_KEY_IDENTIFIER: ConstOid = Oid(&[85, 29, 14]);
