//! Canonical CBOR encoding for digests and signatures.
//!
//! Follows RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats (timestamps are i64 milliseconds)
//!
//! Two structures are encoded canonically: producer profiles (whose Blake3
//! digest is kept in the directory) and disclosure capability bodies (which
//! are signed by the registry).

use ciborium::value::Value;

use crate::capability::CapabilityBody;
use crate::error::CoreError;
use crate::producer::ProducerProfile;

/// Profile field keys.
mod profile_keys {
    pub const DISPLAY_NAME: u64 = 0;
    pub const BIO: u64 = 1;
    pub const CONTACT: u64 = 2;
}

/// Capability body field keys.
mod capability_keys {
    pub const ITEM_ID: u64 = 0;
    pub const HOLDER: u64 = 1;
    pub const ISSUER: u64 = 2;
    pub const ISSUED_AT: u64 = 3;
    pub const EXPIRES_AT: u64 = 4;
}

/// Encode a producer profile to canonical CBOR bytes.
pub fn canonical_profile_bytes(profile: &ProducerProfile) -> Result<Vec<u8>, CoreError> {
    let contact = match &profile.contact {
        Some(c) => Value::Text(c.clone()),
        None => Value::Null,
    };

    let value = Value::Map(vec![
        (
            Value::Integer(profile_keys::DISPLAY_NAME.into()),
            Value::Text(profile.display_name.clone()),
        ),
        (
            Value::Integer(profile_keys::BIO.into()),
            Value::Text(profile.bio.clone()),
        ),
        (Value::Integer(profile_keys::CONTACT.into()), contact),
    ]);

    encode_canonical(&value)
}

/// Encode a capability body to canonical CBOR bytes.
pub fn canonical_capability_bytes(body: &CapabilityBody) -> Result<Vec<u8>, CoreError> {
    let value = Value::Map(vec![
        (
            Value::Integer(capability_keys::ITEM_ID.into()),
            Value::Integer(body.item_id.get().into()),
        ),
        (
            Value::Integer(capability_keys::HOLDER.into()),
            Value::Bytes(body.holder.0.to_vec()),
        ),
        (
            Value::Integer(capability_keys::ISSUER.into()),
            Value::Bytes(body.issuer.0.to_vec()),
        ),
        (
            Value::Integer(capability_keys::ISSUED_AT.into()),
            Value::Integer(body.issued_at.into()),
        ),
        (
            Value::Integer(capability_keys::EXPIRES_AT.into()),
            Value::Integer(body.expires_at.into()),
        ),
    ]);

    encode_canonical(&value)
}

/// Encode any supported CBOR value canonically.
pub fn encode_canonical(value: &Value) -> Result<Vec<u8>, CoreError> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value)?;
    Ok(buf)
}

fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<(), CoreError> {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::Text(s) => encode_text(buf, s),
        Value::Array(arr) => {
            encode_uint(buf, 4, arr.len() as u64);
            for item in arr {
                encode_value_to(buf, item)?;
            }
        }
        Value::Map(entries) => encode_map_canonical(buf, entries)?,
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        Value::Float(_) => {
            return Err(CoreError::EncodingError(
                "floats not supported in canonical encoding".into(),
            ))
        }
        _ => {
            return Err(CoreError::EncodingError(
                "unsupported CBOR value type".into(),
            ))
        }
    }
    Ok(())
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: ciborium::value::Integer) {
    let n: i128 = i.into();

    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        let abs = (-1 - n) as u64;
        encode_uint(buf, 1, abs);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<(), CoreError> {
    let mut pairs: Vec<(Vec<u8>, &Value)> = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_buf = Vec::new();
        encode_value_to(&mut key_buf, k)?;
        pairs.push((key_buf, v));
    }

    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_encoding() {
        let mut buf = Vec::new();

        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        buf.clear();
        encode_uint(&mut buf, 0, 65535);
        assert_eq!(buf, vec![0x19, 0xff, 0xff]);

        buf.clear();
        encode_integer(&mut buf, (-1i64).into());
        assert_eq!(buf, vec![0x20]);
    }

    #[test]
    fn test_map_key_ordering() {
        let entries = vec![
            (Value::Integer(2.into()), Value::Null),
            (Value::Integer(0.into()), Value::Bool(true)),
        ];
        let bytes = encode_canonical(&Value::Map(entries)).unwrap();

        assert_eq!(bytes, vec![0xa2, 0x00, 0xf5, 0x02, 0xf6]);
    }

    #[test]
    fn test_floats_rejected() {
        let result = encode_canonical(&Value::Float(1.5));
        assert!(matches!(result, Err(CoreError::EncodingError(_))));
    }

    #[test]
    fn test_profile_encoding_deterministic() {
        let profile = ProducerProfile::new("Chef Ada", "Sourdough and secrets");
        let b1 = canonical_profile_bytes(&profile).unwrap();
        let b2 = canonical_profile_bytes(&profile.clone()).unwrap();
        assert_eq!(b1, b2);

        let with_contact = profile.with_contact("ada@example.org");
        assert_ne!(b1, canonical_profile_bytes(&with_contact).unwrap());
    }
}
