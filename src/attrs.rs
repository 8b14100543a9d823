//! Signed and unsigned attribute tables.
//
// See RFC 5652, section 11, and RFC 5126, section 4.5.

use std::collections::HashMap;
use bcder::{decode, Captured, Mode, Oid};
use bcder::decode::IntoSource;
use bytes::Bytes;
use crate::cms::{SignerInfo, MAX_SET_ENTRIES};
use crate::error::ValidationError;


//------------ Attribute -----------------------------------------------------

/// A single CMS attribute.
///
/// An attribute pairs an object identifier with an ordered, non-empty
/// sequence of values. The values are kept in their captured encoding;
/// the validator for the respective attribute decodes them further.
#[derive(Clone, Debug)]
pub struct Attribute {
    /// The attribute type.
    oid: Oid<Bytes>,

    /// The attribute values. Never empty.
    values: Vec<Captured>,
}

impl Attribute {
    /// Returns a reference to the attribute type.
    pub fn oid(&self) -> &Oid<Bytes> {
        &self.oid
    }

    /// Returns the attribute values.
    pub fn values(&self) -> &[Captured] {
        &self.values
    }

    /// Returns the single value of the attribute.
    ///
    /// All CAdES attributes carry exactly one value; anything else is
    /// malformed.
    pub fn single_value(&self) -> Result<&Captured, ValidationError> {
        if self.values.len() == 1 {
            Ok(&self.values[0])
        }
        else {
            Err(ValidationError::malformed_attr(
                &self.oid, "attribute must have exactly one value"
            ))
        }
    }
}


//------------ AttributeTable ------------------------------------------------

/// The attributes of one signer, indexed by type.
///
/// The signed and unsigned attribute sets are independent namespaces: an
/// OID may legitimately appear once in each, but twice within the same
/// set is malformed. Unknown attributes are preserved opaquely and never
/// dispatched on.
#[derive(Clone, Debug, Default)]
pub struct AttributeTable {
    signed: HashMap<Bytes, Attribute>,
    unsigned: HashMap<Bytes, Attribute>,
}

impl AttributeTable {
    /// Builds the table from a signer info.
    ///
    /// An absent attribute set is represented as empty, not an error.
    pub fn from_signer_info(
        info: &SignerInfo
    ) -> Result<Self, ValidationError> {
        Ok(AttributeTable {
            signed: Self::index_set(info.signed_attrs())?,
            unsigned: Self::index_set(info.unsigned_attrs())?,
        })
    }

    /// Returns the signed attribute of the given type, if present.
    pub fn signed_attr(
        &self, oid: &Oid<impl AsRef<[u8]>>
    ) -> Option<&Attribute> {
        self.signed.get(oid.0.as_ref())
    }

    /// Returns the unsigned attribute of the given type, if present.
    pub fn unsigned_attr(
        &self, oid: &Oid<impl AsRef<[u8]>>
    ) -> Option<&Attribute> {
        self.unsigned.get(oid.0.as_ref())
    }

    /// Indexes the captured content of one attribute set.
    fn index_set(
        set: Option<&Captured>
    ) -> Result<HashMap<Bytes, Attribute>, ValidationError> {
        let set = match set {
            Some(set) => set,
            None => return Ok(HashMap::new())
        };
        let attrs = Self::parse_set(set)?;
        let mut res = HashMap::with_capacity(attrs.len());
        for attr in attrs {
            if attr.values.is_empty() {
                return Err(ValidationError::malformed_attr(
                    &attr.oid, "attribute without values"
                ))
            }
            let key = attr.oid.0.clone();
            let oid = attr.oid.clone();
            if res.insert(key, attr).is_some() {
                return Err(ValidationError::DuplicateAttribute(oid))
            }
        }
        Ok(res)
    }

    /// Parses the captured set content into raw attributes.
    fn parse_set(
        set: &Captured
    ) -> Result<Vec<Attribute>, ValidationError> {
        let mut limit_hit = false;
        let res = Mode::Der.decode(set.as_slice().into_source(), |cons| {
            let mut attrs = Vec::new();
            while let Some(attr) = Self::take_opt_attribute(
                cons, &mut limit_hit
            )? {
                if attrs.len() >= MAX_SET_ENTRIES {
                    limit_hit = true;
                    return Err(cons.content_err("too many attributes"))
                }
                attrs.push(attr);
            }
            Ok(attrs)
        });
        if limit_hit {
            return Err(ValidationError::ResourceLimitExceeded(
                "attribute set too large"
            ))
        }
        res.map_err(Into::into)
    }

    /// Takes a single attribute from an encoded constructed value.
    fn take_opt_attribute<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
        limit_hit: &mut bool,
    ) -> Result<Option<Attribute>, decode::DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            let oid = Oid::take_from(cons)?;
            let values = cons.take_set(|cons| {
                let mut values = Vec::new();
                loop {
                    let value = cons.capture(|cons| {
                        cons.skip_one().map(|_| ())
                    })?;
                    if value.as_slice().is_empty() {
                        break
                    }
                    if values.len() >= MAX_SET_ENTRIES {
                        *limit_hit = true;
                        return Err(cons.content_err(
                            "too many attribute values"
                        ))
                    }
                    values.push(value);
                }
                Ok(values)
            })?;
            Ok(Attribute { oid, values })
        })
    }
}


//============ Tests =========================================================
