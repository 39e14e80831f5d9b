//! Canonical dag-cbor encoding for deterministic serialization.
//!
//! This module implements the deterministic subset dag-cbor requires:
//! - Map keys sorted by encoded byte comparison (length first, then bytes)
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats
//! - The only tag is 42 (CID link)
//!
//! Canonical encoding is what makes a delegation's signature and block CID
//! reproducible: the signer and every verifier must produce identical bytes.

use ciborium::value::Value;

use crate::cid::Cid;
use crate::error::{CoreError, Result};

/// CBOR tag for a CID link.
pub const CID_LINK_TAG: u64 = 42;

/// Encode a CBOR value to canonical bytes.
pub fn encode_canonical(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value)?;
    Ok(buf)
}

/// Decode a single CBOR value.
pub fn decode(bytes: &[u8]) -> Result<Value> {
    ciborium::de::from_reader(bytes).map_err(|e| CoreError::EncodingError(e.to_string()))
}

/// Wrap a CID as a dag-cbor link: tag 42 over `0x00 || cid bytes`.
pub fn cid_link(cid: &Cid) -> Value {
    let mut bytes = Vec::with_capacity(37);
    bytes.push(0x00);
    bytes.extend_from_slice(&cid.to_bytes());
    Value::Tag(CID_LINK_TAG, Box::new(Value::Bytes(bytes)))
}

/// Read a dag-cbor link back into a CID.
pub fn parse_link(value: &Value) -> Result<Cid> {
    match value {
        Value::Tag(CID_LINK_TAG, inner) => match inner.as_ref() {
            Value::Bytes(b) if b.first() == Some(&0x00) => Cid::from_bytes(&b[1..]),
            _ => Err(CoreError::EncodingError("malformed CID link".into())),
        },
        _ => Err(CoreError::EncodingError("expected CID link".into())),
    }
}

/// Look up a text key in a decoded map.
pub fn map_get<'a>(entries: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    entries
        .iter()
        .find(|(k, _)| matches!(k, Value::Text(t) if t == key))
        .map(|(_, v)| v)
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::Text(s) => encode_text(buf, s),
        Value::Array(arr) => encode_array(buf, arr)?,
        Value::Map(entries) => encode_map_canonical(buf, entries)?,
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        Value::Tag(CID_LINK_TAG, inner) => {
            encode_uint(buf, 6, CID_LINK_TAG);
            encode_value_to(buf, inner)?;
        }
        Value::Tag(tag, _) => {
            return Err(CoreError::EncodingError(format!("unsupported tag {}", tag)));
        }
        Value::Float(_) => {
            return Err(CoreError::EncodingError(
                "floats not supported in canonical encoding".into(),
            ));
        }
        _ => return Err(CoreError::EncodingError("unsupported CBOR value type".into())),
    }
    Ok(())
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: ciborium::value::Integer) {
    let n: i128 = i.into();

    if n >= 0 {
        // Major type 0: unsigned integer
        encode_uint(buf, 0, n as u64);
    } else {
        // Major type 1: CBOR encodes -1 as 0, -2 as 1, etc.
        let abs = (-1 - n) as u64;
        encode_uint(buf, 1, abs);
    }
}

/// Encode an unsigned integer with the given major type.
pub(crate) fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffffffff {
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

fn encode_array(buf: &mut Vec<u8>, arr: &[Value]) -> Result<()> {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value_to(buf, item)?;
    }
    Ok(())
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison; duplicates are rejected.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<()> {
    let mut key_value_pairs: Vec<(Vec<u8>, &Value)> = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_buf = Vec::new();
        encode_value_to(&mut key_buf, k)?;
        key_value_pairs.push((key_buf, v));
    }

    key_value_pairs.sort_by(|a, b| a.0.cmp(&b.0));
    if key_value_pairs.windows(2).any(|w| w[0].0 == w[1].0) {
        return Err(CoreError::EncodingError("duplicate map key".into()));
    }

    encode_uint(buf, 5, key_value_pairs.len() as u64);
    for (key_bytes, value) in key_value_pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value)?;
    }
    Ok(())
}
