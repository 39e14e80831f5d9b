//! CAR v1 archives.
//!
//! Layout: `varint(len) || header` then, per block, `varint(len) || cid || data`.
//! The header is dag-cbor `{ "roots": [link], "version": 1 }`.

use ciborium::value::Value;
use std::collections::BTreeMap;

use crate::canonical::{cid_link, decode, encode_canonical, map_get, parse_link};
use crate::cid::{read_varint, write_varint, Cid};
use crate::error::{CoreError, Result};

/// One content-addressed block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub cid: Cid,
    pub data: Vec<u8>,
}

impl Block {
    /// Wrap dag-cbor bytes, computing their CID.
    pub fn dag_cbor(data: Vec<u8>) -> Self {
        Self {
            cid: Cid::dag_cbor(&data),
            data,
        }
    }
}

/// A parsed archive with a single root.
#[derive(Clone, Debug, Default)]
pub struct CarArchive {
    roots: Vec<Cid>,
    blocks: BTreeMap<Cid, Vec<u8>>,
}

impl CarArchive {
    pub fn new(root: Cid) -> Self {
        Self {
            roots: vec![root],
            blocks: BTreeMap::new(),
        }
    }

    /// Insert a block; duplicates are collapsed.
    pub fn insert(&mut self, block: Block) {
        self.blocks.entry(block.cid).or_insert(block.data);
    }

    pub fn roots(&self) -> &[Cid] {
        &self.roots
    }

    /// The single root, if the archive has exactly one.
    pub fn root(&self) -> Option<&Cid> {
        match self.roots.as_slice() {
            [root] => Some(root),
            _ => None,
        }
    }

    pub fn get(&self, cid: &Cid) -> Option<&[u8]> {
        self.blocks.get(cid).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Serialize. Blocks are written root first, then in CID order.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let header = Value::Map(vec![
            (
                Value::Text("roots".into()),
                Value::Array(self.roots.iter().map(cid_link).collect()),
            ),
            (Value::Text("version".into()), Value::Integer(1.into())),
        ]);
        let header_bytes = encode_canonical(&header)?;

        let mut out = Vec::new();
        write_varint(&mut out, header_bytes.len() as u64);
        out.extend_from_slice(&header_bytes);

        let root_first = self
            .roots
            .iter()
            .filter_map(|r| self.blocks.get_key_value(r))
            .chain(self.blocks.iter().filter(|(cid, _)| !self.roots.contains(cid)));

        for (cid, data) in root_first {
            let cid_bytes = cid.to_bytes();
            write_varint(&mut out, (cid_bytes.len() + data.len()) as u64);
            out.extend_from_slice(&cid_bytes);
            out.extend_from_slice(data);
        }

        Ok(out)
    }

    /// Parse and verify an archive.
    ///
    /// Every block's digest must match its data, and there must be exactly
    /// one root.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut offset = 0;

        let header_bytes = read_section(bytes, &mut offset)?;
        let header = decode(header_bytes)?;
        let entries = match &header {
            Value::Map(m) => m,
            _ => return Err(malformed("header is not a map")),
        };

        match map_get(entries, "version") {
            Some(Value::Integer(v)) if i128::from(*v) == 1 => {}
            _ => return Err(malformed("unsupported CAR version")),
        }

        let roots = match map_get(entries, "roots") {
            Some(Value::Array(items)) => items
                .iter()
                .map(parse_link)
                .collect::<Result<Vec<_>>>()
                .map_err(|e| malformed(&e.to_string()))?,
            _ => return Err(malformed("missing roots")),
        };
        if roots.len() != 1 {
            return Err(malformed(&format!("expected one root, found {}", roots.len())));
        }

        let mut archive = Self {
            roots,
            blocks: BTreeMap::new(),
        };

        while offset < bytes.len() {
            let section = read_section(bytes, &mut offset)?;
            let (cid, used) = Cid::read_bytes(section).map_err(|e| malformed(&e.to_string()))?;
            let data = &section[used..];
            if !cid.verifies(data) {
                return Err(malformed(&format!("block {} does not match its digest", cid)));
            }
            archive.blocks.insert(cid, data.to_vec());
        }

        Ok(archive)
    }
}

fn read_section<'a>(bytes: &'a [u8], offset: &mut usize) -> Result<&'a [u8]> {
    let (len, n) = read_varint(&bytes[*offset..]).map_err(|_| malformed("bad section length"))?;
    let start = *offset + n;
    let end = start
        .checked_add(len as usize)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| malformed("truncated section"))?;
    *offset = end;
    Ok(&bytes[start..end])
}

fn malformed(detail: &str) -> CoreError {
    CoreError::EncodingError(format!("CAR: {}", detail))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CarArchive {
        let root = Block::dag_cbor(vec![0xa0]);
        let child = Block::dag_cbor(vec![0x80]);
        let mut car = CarArchive::new(root.cid);
        car.insert(child);
        car.insert(root);
        car
    }

    #[test]
    fn test_roundtrip() {
        let car = sample();
        let bytes = car.to_bytes().unwrap();
        let parsed = CarArchive::from_bytes(&bytes).unwrap();

        assert_eq!(parsed.roots(), car.roots());
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.get(&Cid::dag_cbor(&[0x80])), Some(&[0x80][..]));
    }

    #[test]
    fn test_root_block_written_first() {
        let car = sample();
        let bytes = car.to_bytes().unwrap();
        let mut offset = 0;
        read_section(&bytes, &mut offset).unwrap();
        let first = read_section(&bytes, &mut offset).unwrap();
        let (cid, _) = Cid::read_bytes(first).unwrap();
        assert_eq!(Some(&cid), car.root());
    }

    #[test]
    fn test_rejects_tampered_block() {
        let mut bytes = sample().to_bytes().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert!(CarArchive::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_rejects_truncated() {
        let bytes = sample().to_bytes().unwrap();
        assert!(CarArchive::from_bytes(&bytes[..bytes.len() - 3]).is_err());
        assert!(CarArchive::from_bytes(&[]).is_err());
        assert!(CarArchive::from_bytes(b"not a car").is_err());
    }

    #[test]
    fn test_rejects_multiple_roots() {
        let mut car = sample();
        car.roots.push(Cid::dag_cbor(&[0x80]));
        let bytes = car.to_bytes().unwrap();
        assert!(CarArchive::from_bytes(&bytes).is_err());
    }
}
