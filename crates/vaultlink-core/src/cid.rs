//! Content identifiers.
//!
//! A [`Cid`] is a CIDv1 over a SHA-256 multihash. Stored objects use the
//! `raw` codec; delegation blocks inside a CAR archive use `dag-cbor`.
//!
//! String form is multibase base32-lower with a `b` prefix, which is what
//! gateways and the storage service expect to see.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// CID version emitted and accepted.
pub const CID_VERSION: u64 = 1;

/// Multicodec for opaque bytes.
pub const RAW_CODEC: u64 = 0x55;

/// Multicodec for dag-cbor blocks.
pub const DAG_CBOR_CODEC: u64 = 0x71;

/// Multihash code for sha2-256.
pub const SHA2_256: u64 = 0x12;

const DIGEST_LEN: usize = 32;

/// A CIDv1 with a sha2-256 multihash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cid {
    codec: u64,
    digest: [u8; DIGEST_LEN],
}

impl Cid {
    /// Hash `data` and wrap it with the given codec.
    pub fn new(codec: u64, data: &[u8]) -> Self {
        let digest: [u8; DIGEST_LEN] = Sha256::digest(data).into();
        Self { codec, digest }
    }

    /// CID of opaque bytes (codec `raw`).
    pub fn raw(data: &[u8]) -> Self {
        Self::new(RAW_CODEC, data)
    }

    /// CID of an encoded dag-cbor block.
    pub fn dag_cbor(data: &[u8]) -> Self {
        Self::new(DAG_CBOR_CODEC, data)
    }

    /// Build from a codec and an existing digest.
    pub const fn from_digest(codec: u64, digest: [u8; DIGEST_LEN]) -> Self {
        Self { codec, digest }
    }

    pub const fn codec(&self) -> u64 {
        self.codec
    }

    pub const fn digest(&self) -> &[u8; DIGEST_LEN] {
        &self.digest
    }

    /// Check that `data` hashes to this CID.
    pub fn verifies(&self, data: &[u8]) -> bool {
        let digest: [u8; DIGEST_LEN] = Sha256::digest(data).into();
        digest == self.digest
    }

    /// Binary form: `varint(version) || varint(codec) || varint(0x12) || varint(32) || digest`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + DIGEST_LEN);
        write_varint(&mut buf, CID_VERSION);
        write_varint(&mut buf, self.codec);
        write_varint(&mut buf, SHA2_256);
        write_varint(&mut buf, DIGEST_LEN as u64);
        buf.extend_from_slice(&self.digest);
        buf
    }

    /// Parse a binary CID from the front of `bytes`.
    ///
    /// Returns the CID and the number of bytes consumed.
    pub fn read_bytes(bytes: &[u8]) -> Result<(Self, usize)> {
        let mut offset = 0;

        let (version, n) = read_varint(&bytes[offset..])?;
        offset += n;
        if version != CID_VERSION {
            return Err(CoreError::InvalidCid(format!("unsupported version {}", version)));
        }

        let (codec, n) = read_varint(&bytes[offset..])?;
        offset += n;

        let (hash_code, n) = read_varint(&bytes[offset..])?;
        offset += n;
        if hash_code != SHA2_256 {
            return Err(CoreError::InvalidCid(format!(
                "unsupported multihash 0x{:x}",
                hash_code
            )));
        }

        let (len, n) = read_varint(&bytes[offset..])?;
        offset += n;
        if len as usize != DIGEST_LEN {
            return Err(CoreError::InvalidCid(format!("digest length {}", len)));
        }

        let end = offset + DIGEST_LEN;
        if bytes.len() < end {
            return Err(CoreError::InvalidCid("truncated digest".into()));
        }
        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(&bytes[offset..end]);

        Ok((Self { codec, digest }, end))
    }

    /// Parse a binary CID that spans exactly `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (cid, used) = Self::read_bytes(bytes)?;
        if used != bytes.len() {
            return Err(CoreError::InvalidCid("trailing bytes".into()));
        }
        Ok(cid)
    }

    /// Hex of the digest, handy for logs.
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", base32_encode(&self.to_bytes()))
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({})", self)
    }
}

impl FromStr for Cid {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CoreError::InvalidCid("empty".into()));
        }
        let body = s
            .strip_prefix('b')
            .ok_or_else(|| CoreError::InvalidCid("expected base32 multibase prefix 'b'".into()))?;
        let bytes = base32_decode(body)
            .ok_or_else(|| CoreError::InvalidCid("invalid base32".into()))?;
        Self::from_bytes(&bytes)
    }
}

impl Serialize for Cid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Cid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Append an unsigned LEB128 varint.
pub(crate) fn write_varint(buf: &mut Vec<u8>, mut n: u64) {
    while n >= 0x80 {
        buf.push((n as u8 & 0x7f) | 0x80);
        n >>= 7;
    }
    buf.push(n as u8);
}

/// Read an unsigned LEB128 varint, returning the value and bytes consumed.
pub(crate) fn read_varint(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    for (i, &byte) in bytes.iter().enumerate().take(10) {
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(CoreError::InvalidCid("truncated or oversized varint".into()))
}

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz234567";

// RFC 4648 Base32 encoding (lowercase, no padding)
pub(crate) fn base32_encode(data: &[u8]) -> String {
    let mut result = String::with_capacity((data.len() * 8 + 4) / 5);
    let mut buffer: u64 = 0;
    let mut bits_in_buffer = 0;

    for &byte in data {
        buffer = (buffer << 8) | (byte as u64);
        bits_in_buffer += 8;

        while bits_in_buffer >= 5 {
            bits_in_buffer -= 5;
            let index = ((buffer >> bits_in_buffer) & 0x1f) as usize;
            result.push(ALPHABET[index] as char);
        }
    }

    if bits_in_buffer > 0 {
        let index = ((buffer << (5 - bits_in_buffer)) & 0x1f) as usize;
        result.push(ALPHABET[index] as char);
    }

    result
}

pub(crate) fn base32_decode(s: &str) -> Option<Vec<u8>> {
    let mut result = Vec::with_capacity(s.len() * 5 / 8);
    let mut buffer: u64 = 0;
    let mut bits_in_buffer = 0;

    for c in s.bytes() {
        let value = ALPHABET.iter().position(|&a| a == c)? as u64;
        buffer = (buffer << 5) | value;
        bits_in_buffer += 5;

        if bits_in_buffer >= 8 {
            bits_in_buffer -= 8;
            result.push((buffer >> bits_in_buffer) as u8);
        }
    }

    // Leftover bits are padding and must be zero.
    if bits_in_buffer >= 5 || buffer & ((1 << bits_in_buffer) - 1) != 0 {
        return None;
    }

    Some(result)
}
