//! Delegations: signed capability grants, chained through proofs.
//!
//! A delegation is a dag-cbor block signed by its issuer, granting the
//! audience a list of `{with, can}` capabilities. Nested proofs are linked by
//! CID and shipped alongside in the same CAR archive.
//!
//! Parsing ([`DelegationProof::from_archive`]) is structural only. Signature,
//! time window and chain checks happen in [`DelegationProof::verify`], which is
//! what the storage side runs before accepting a proof.

use ciborium::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::canonical::{cid_link, decode, encode_canonical, map_get, parse_link};
use crate::car::{Block, CarArchive};
use crate::cid::{Cid, DAG_CBOR_CODEC};
use crate::crypto::{Did, Ed25519Signature, Keypair};
use crate::error::{CoreError, Result};

/// Format version written into every delegation block.
pub const DELEGATION_VERSION: &str = "0.9.1";

/// Maximum proof chain depth accepted when parsing.
pub const MAX_CHAIN_DEPTH: usize = 16;

/// Maximum number of delegations in the expanded proof tree, counting a
/// block once per link that reaches it.
pub const MAX_PROOF_NODES: usize = 256;

/// Current Unix time in seconds.
pub fn now_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// A single `{with, can}` grant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capability {
    /// Resource URI, usually a space DID.
    pub with: String,
    /// Ability, e.g. `space/blob/add`. `*` and `ns/*` are wildcards.
    pub can: String,
}

impl Capability {
    pub fn new(with: impl Into<String>, can: impl Into<String>) -> Self {
        Self {
            with: with.into(),
            can: can.into(),
        }
    }

    /// Does this grant cover `ability` on `resource`?
    pub fn allows(&self, resource: &str, ability: &str) -> bool {
        if self.with != resource {
            return false;
        }
        if self.can == "*" || self.can == ability {
            return true;
        }
        match self.can.strip_suffix("/*") {
            Some(ns) => ability
                .strip_prefix(ns)
                .map_or(false, |rest| rest.starts_with('/')),
            None => false,
        }
    }

    /// Does this grant cover everything `other` grants?
    pub fn covers(&self, other: &Capability) -> bool {
        if other.can == "*" {
            return self.with == other.with && self.can == "*";
        }
        if let Some(ns) = other.can.strip_suffix("/*") {
            return self.with == other.with
                && (self.can == "*" || self.can == other.can || self.allows(&other.with, ns));
        }
        self.allows(&other.with, &other.can)
    }

    fn to_value(&self) -> Value {
        Value::Map(vec![
            (Value::Text("can".into()), Value::Text(self.can.clone())),
            (Value::Text("with".into()), Value::Text(self.with.clone())),
        ])
    }

    fn from_value(value: &Value) -> Result<Self> {
        let entries = match value {
            Value::Map(m) => m,
            _ => return Err(malformed("capability is not a map")),
        };
        let text = |key: &str| match map_get(entries, key) {
            Some(Value::Text(t)) => Ok(t.clone()),
            _ => Err(malformed(&format!("capability missing '{}'", key))),
        };
        Ok(Self {
            with: text("with")?,
            can: text("can")?,
        })
    }
}

/// A parsed capability delegation together with its proof chain.
///
/// Immutable once parsed. The encoded root block is kept so the proof can be
/// re-archived byte-for-byte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelegationProof {
    issuer: Did,
    audience: Did,
    capabilities: Vec<Capability>,
    expiration: Option<u64>,
    not_before: Option<u64>,
    proofs: Vec<Arc<DelegationProof>>,
    signature: Ed25519Signature,
    cid: Cid,
    block: Vec<u8>,
}

impl DelegationProof {
    pub fn issuer(&self) -> &Did {
        &self.issuer
    }

    pub fn audience(&self) -> &Did {
        &self.audience
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Expiry in Unix seconds; `None` never expires.
    pub fn expiration(&self) -> Option<u64> {
        self.expiration
    }

    pub fn not_before(&self) -> Option<u64> {
        self.not_before
    }

    /// Nested proofs, in the order they are linked.
    pub fn proofs(&self) -> &[Arc<DelegationProof>] {
        &self.proofs
    }

    pub fn signature(&self) -> &Ed25519Signature {
        &self.signature
    }

    /// CID of the root block.
    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    /// Does any top-level capability cover `ability` on `resource`?
    pub fn allows(&self, resource: &str, ability: &str) -> bool {
        self.capabilities.iter().any(|c| c.allows(resource, ability))
    }

    /// Resources this delegation grants anything on.
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.capabilities.iter().map(|c| c.with.as_str())
    }

    /// Check the whole chain at time `now` (Unix seconds).
    ///
    /// Every signature must verify, every link must be inside its time
    /// window, each nested proof must be addressed to its parent's issuer, and
    /// every capability must be either owned by the issuer (resource is the
    /// issuer's DID) or covered by one of its proofs.
    pub fn verify(&self, now: u64) -> Result<()> {
        let payload = signing_payload(
            &self.issuer,
            &self.audience,
            &self.capabilities,
            self.expiration,
            self.not_before,
            &self.proof_cids(),
        )?;
        self.issuer
            .verify(&payload, &self.signature)
            .map_err(|_| invalid(&format!("bad signature on {}", self.cid)))?;

        if let Some(exp) = self.expiration {
            if now >= exp {
                return Err(invalid(&format!("{} expired at {}", self.cid, exp)));
            }
        }
        if let Some(nbf) = self.not_before {
            if now < nbf {
                return Err(invalid(&format!("{} not valid before {}", self.cid, nbf)));
            }
        }

        for proof in &self.proofs {
            if proof.audience != self.issuer {
                return Err(invalid(&format!(
                    "proof {} is addressed to {}, not {}",
                    proof.cid, proof.audience, self.issuer
                )));
            }
            proof.verify(now)?;
        }

        let issuer = self.issuer.to_string();
        for cap in &self.capabilities {
            let owned = cap.with == issuer;
            let delegated = self
                .proofs
                .iter()
                .any(|p| p.capabilities.iter().any(|pc| pc.covers(cap)));
            if !owned && !delegated {
                return Err(invalid(&format!(
                    "{} on {} was never delegated to {}",
                    cap.can, cap.with, issuer
                )));
            }
        }

        Ok(())
    }

    /// Serialize the delegation and its whole chain to CAR bytes.
    pub fn archive(&self) -> Result<Vec<u8>> {
        let mut car = CarArchive::new(self.cid);
        self.collect_blocks(&mut car);
        car.to_bytes()
    }

    /// Parse a CAR archive whose root is a delegation block.
    pub fn from_archive(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(CoreError::EmptyInput);
        }
        let car = CarArchive::from_bytes(bytes).map_err(|e| malformed(&e.to_string()))?;
        let root = *car.root().ok_or_else(|| malformed("archive has no single root"))?;
        let mut loader = ChainLoader {
            car: &car,
            path: HashSet::new(),
            loaded: HashMap::new(),
        };
        let (root, _) = loader.load(&root)?;
        drop(loader);
        Ok(Arc::try_unwrap(root).unwrap_or_else(|shared| (*shared).clone()))
    }

    fn proof_cids(&self) -> Vec<Cid> {
        self.proofs.iter().map(|p| p.cid).collect()
    }

    fn collect_blocks(&self, car: &mut CarArchive) {
        car.insert(Block {
            cid: self.cid,
            data: self.block.clone(),
        });
        for proof in &self.proofs {
            proof.collect_blocks(car);
        }
    }
}

/// Resolves `prf` links inside one archive.
///
/// Each block is decoded once; a block linked from several places is shared.
/// `path` holds the blocks on the current branch for cycle detection.
struct ChainLoader<'a> {
    car: &'a CarArchive,
    path: HashSet<Cid>,
    loaded: HashMap<Cid, (Arc<DelegationProof>, usize)>,
}

impl ChainLoader<'_> {
    /// The delegation at `cid` and the size of its expanded tree.
    fn load(&mut self, cid: &Cid) -> Result<(Arc<DelegationProof>, usize)> {
        if let Some((proof, nodes)) = self.loaded.get(cid) {
            return Ok((proof.clone(), *nodes));
        }
        if cid.codec() != DAG_CBOR_CODEC {
            return Err(malformed(&format!("{} is not a dag-cbor block", cid)));
        }
        if self.path.len() >= MAX_CHAIN_DEPTH {
            return Err(malformed("proof chain too deep"));
        }
        if !self.path.insert(*cid) {
            return Err(malformed(&format!("proof chain cycles through {}", cid)));
        }

        let car = self.car;
        let data = car
            .get(cid)
            .ok_or_else(|| malformed(&format!("block {} missing from archive", cid)))?;
        let fields = BlockFields::decode(data)?;

        let mut nodes = 1usize;
        let mut proofs = Vec::with_capacity(fields.proofs.len());
        for link in &fields.proofs {
            let (proof, size) = self.load(link)?;
            nodes = nodes.saturating_add(size);
            if nodes > MAX_PROOF_NODES {
                return Err(malformed(&format!(
                    "proof tree under {} exceeds {} delegations",
                    cid, MAX_PROOF_NODES
                )));
            }
            proofs.push(proof);
        }
        self.path.remove(cid);

        let proof = Arc::new(DelegationProof {
            issuer: fields.issuer,
            audience: fields.audience,
            capabilities: fields.capabilities,
            expiration: fields.expiration,
            not_before: fields.not_before,
            proofs,
            signature: fields.signature,
            cid: *cid,
            block: data.to_vec(),
        });
        self.loaded.insert(*cid, (proof.clone(), nodes));
        Ok((proof, nodes))
    }
}

/// Decoded fields of one delegation block, before chain resolution.
struct BlockFields {
    issuer: Did,
    audience: Did,
    capabilities: Vec<Capability>,
    expiration: Option<u64>,
    not_before: Option<u64>,
    proofs: Vec<Cid>,
    signature: Ed25519Signature,
}

impl BlockFields {
    fn decode(data: &[u8]) -> Result<Self> {
        let value = decode(data).map_err(|e| malformed(&e.to_string()))?;
        let entries = match &value {
            Value::Map(m) => m,
            _ => return Err(malformed("block is not a map")),
        };

        match map_get(entries, "v") {
            Some(Value::Text(v)) if v == DELEGATION_VERSION => {}
            Some(Value::Text(v)) => return Err(malformed(&format!("unsupported version {}", v))),
            _ => return Err(malformed("missing version")),
        }

        let did = |key: &str| -> Result<Did> {
            match map_get(entries, key) {
                Some(Value::Text(t)) => t.parse().map_err(|e: CoreError| malformed(&e.to_string())),
                _ => Err(malformed(&format!("missing '{}'", key))),
            }
        };
        let issuer = did("iss")?;
        let audience = did("aud")?;

        let capabilities = match map_get(entries, "att") {
            Some(Value::Array(items)) => items
                .iter()
                .map(Capability::from_value)
                .collect::<Result<Vec<_>>>()?,
            _ => return Err(malformed("missing 'att'")),
        };

        let expiration = match map_get(entries, "exp") {
            Some(Value::Null) => None,
            Some(v) => Some(as_seconds(v, "exp")?),
            None => return Err(malformed("missing 'exp'")),
        };
        let not_before = match map_get(entries, "nbf") {
            None | Some(Value::Null) => None,
            Some(v) => Some(as_seconds(v, "nbf")?),
        };

        let proofs = match map_get(entries, "prf") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| parse_link(v).map_err(|e| malformed(&e.to_string())))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
            _ => return Err(malformed("'prf' is not an array")),
        };
        let mut seen = HashSet::with_capacity(proofs.len());
        if let Some(dup) = proofs.iter().find(|cid| !seen.insert(**cid)) {
            return Err(malformed(&format!("'prf' links {} twice", dup)));
        }

        let signature = match map_get(entries, "s") {
            Some(Value::Bytes(b)) => {
                Ed25519Signature::from_slice(b).map_err(|_| malformed("signature must be 64 bytes"))?
            }
            _ => return Err(malformed("missing signature")),
        };

        Ok(Self {
            issuer,
            audience,
            capabilities,
            expiration,
            not_before,
            proofs,
            signature,
        })
    }
}

fn as_seconds(value: &Value, key: &str) -> Result<u64> {
    match value {
        Value::Integer(i) => u64::try_from(i128::from(*i))
            .map_err(|_| malformed(&format!("'{}' out of range", key))),
        _ => Err(malformed(&format!("'{}' is not an integer", key))),
    }
}

/// Map entries shared by the signing payload and the full block.
fn unsigned_entries(
    issuer: &Did,
    audience: &Did,
    capabilities: &[Capability],
    expiration: Option<u64>,
    not_before: Option<u64>,
    proofs: &[Cid],
) -> Vec<(Value, Value)> {
    let mut entries = vec![
        (Value::Text("v".into()), Value::Text(DELEGATION_VERSION.into())),
        (Value::Text("iss".into()), Value::Text(issuer.to_string())),
        (Value::Text("aud".into()), Value::Text(audience.to_string())),
        (
            Value::Text("att".into()),
            Value::Array(capabilities.iter().map(Capability::to_value).collect()),
        ),
        (
            Value::Text("exp".into()),
            expiration.map_or(Value::Null, |e| Value::Integer(e.into())),
        ),
        (
            Value::Text("prf".into()),
            Value::Array(proofs.iter().map(cid_link).collect()),
        ),
    ];
    if let Some(nbf) = not_before {
        entries.push((Value::Text("nbf".into()), Value::Integer(nbf.into())));
    }
    entries
}

/// The bytes the issuer signs: canonical CBOR of the block without `s`.
fn signing_payload(
    issuer: &Did,
    audience: &Did,
    capabilities: &[Capability],
    expiration: Option<u64>,
    not_before: Option<u64>,
    proofs: &[Cid],
) -> Result<Vec<u8>> {
    let entries = unsigned_entries(issuer, audience, capabilities, expiration, not_before, proofs);
    encode_canonical(&Value::Map(entries))
}

fn malformed(detail: &str) -> CoreError {
    CoreError::MalformedDelegation(detail.to_string())
}

fn invalid(detail: &str) -> CoreError {
    CoreError::InvalidDelegation(detail.to_string())
}

/// Builder for issuing delegations.
pub struct DelegationBuilder {
    audience: Did,
    capabilities: Vec<Capability>,
    expiration: Option<u64>,
    not_before: Option<u64>,
    proofs: Vec<Arc<DelegationProof>>,
}

impl DelegationBuilder {
    /// Start a delegation addressed to `audience`.
    pub fn new(audience: Did) -> Self {
        Self {
            audience,
            capabilities: Vec::new(),
            expiration: None,
            not_before: None,
            proofs: Vec::new(),
        }
    }

    /// Grant `can` on `with`.
    pub fn capability(mut self, with: impl Into<String>, can: impl Into<String>) -> Self {
        self.capabilities.push(Capability::new(with, can));
        self
    }

    /// Set the expiry (Unix seconds).
    pub fn expiration(mut self, exp: u64) -> Self {
        self.expiration = Some(exp);
        self
    }

    /// Set the not-before time (Unix seconds).
    pub fn not_before(mut self, nbf: u64) -> Self {
        self.not_before = Some(nbf);
        self
    }

    /// Attach a proof the issuer received.
    pub fn proof(mut self, proof: DelegationProof) -> Self {
        self.proofs.push(Arc::new(proof));
        self
    }

    /// Sign and encode the root block.
    pub fn sign(self, issuer: &Keypair) -> Result<DelegationProof> {
        let issuer_did = issuer.did();
        let proof_cids: Vec<Cid> = self.proofs.iter().map(|p| p.cid).collect();

        let mut entries = unsigned_entries(
            &issuer_did,
            &self.audience,
            &self.capabilities,
            self.expiration,
            self.not_before,
            &proof_cids,
        );
        let payload = encode_canonical(&Value::Map(entries.clone()))?;
        let signature = issuer.sign(&payload);

        entries.push((Value::Text("s".into()), Value::Bytes(signature.0.to_vec())));
        let block = encode_canonical(&Value::Map(entries))?;
        let cid = Cid::dag_cbor(&block);

        Ok(DelegationProof {
            issuer: issuer_did,
            audience: self.audience,
            capabilities: self.capabilities,
            expiration: self.expiration,
            not_before: self.not_before,
            proofs: self.proofs,
            signature,
            cid,
            block,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_736_870_400;

    fn space_to_agent(space: &Keypair, agent: &Keypair) -> DelegationProof {
        DelegationBuilder::new(agent.did())
            .capability(space.did().to_string(), "space/*")
            .expiration(NOW + 3600)
            .sign(space)
            .unwrap()
    }

    #[test]
    fn test_capability_matching() {
        let cap = Capability::new("did:key:bspace", "space/*");
        assert!(cap.allows("did:key:bspace", "space/blob/add"));
        assert!(!cap.allows("did:key:bspace", "spacex/blob"));
        assert!(!cap.allows("did:key:bother", "space/blob/add"));

        let any = Capability::new("did:key:bspace", "*");
        assert!(any.allows("did:key:bspace", "upload/add"));
        assert!(any.covers(&cap));
        assert!(!cap.covers(&any));
        assert!(cap.covers(&Capability::new("did:key:bspace", "space/blob/add")));
    }

    #[test]
    fn test_sign_and_verify() {
        let space = Keypair::from_seed(&[1; 32]);
        let agent = Keypair::from_seed(&[2; 32]);
        let proof = space_to_agent(&space, &agent);

        assert_eq!(proof.issuer(), &space.did());
        assert_eq!(proof.audience(), &agent.did());
        assert!(proof.verify(NOW).is_ok());
        assert!(proof.allows(&space.did().to_string(), "space/blob/add"));
    }

    #[test]
    fn test_archive_roundtrip_preserves_cid() {
        let space = Keypair::from_seed(&[1; 32]);
        let agent = Keypair::from_seed(&[2; 32]);
        let proof = space_to_agent(&space, &agent);

        let bytes = proof.archive().unwrap();
        let parsed = DelegationProof::from_archive(&bytes).unwrap();

        assert_eq!(parsed, proof);
        assert_eq!(parsed.archive().unwrap(), bytes);
    }

    #[test]
    fn test_time_window() {
        let space = Keypair::from_seed(&[1; 32]);
        let agent = Keypair::from_seed(&[2; 32]);
        let proof = DelegationBuilder::new(agent.did())
            .capability(space.did().to_string(), "space/*")
            .not_before(NOW)
            .expiration(NOW + 10)
            .sign(&space)
            .unwrap();

        assert!(proof.verify(NOW).is_ok());
        assert!(matches!(proof.verify(NOW - 1), Err(CoreError::InvalidDelegation(_))));
        assert!(matches!(proof.verify(NOW + 10), Err(CoreError::InvalidDelegation(_))));
    }

    #[test]
    fn test_chain_verification() {
        let space = Keypair::from_seed(&[1; 32]);
        let alice = Keypair::from_seed(&[2; 32]);
        let agent = Keypair::from_seed(&[3; 32]);

        let root = space_to_agent(&space, &alice);
        let leaf = DelegationBuilder::new(agent.did())
            .capability(space.did().to_string(), "space/blob/add")
            .proof(root.clone())
            .sign(&alice)
            .unwrap();
        assert!(leaf.verify(NOW).is_ok());

        let parsed = DelegationProof::from_archive(&leaf.archive().unwrap()).unwrap();
        assert_eq!(parsed.proofs().len(), 1);
        assert!(parsed.verify(NOW).is_ok());

        // Mallory was never delegated anything on the space.
        let mallory = Keypair::from_seed(&[4; 32]);
        let forged = DelegationBuilder::new(agent.did())
            .capability(space.did().to_string(), "space/blob/add")
            .proof(root)
            .sign(&mallory)
            .unwrap();
        assert!(matches!(forged.verify(NOW), Err(CoreError::InvalidDelegation(_))));
    }

    #[test]
    fn test_unproven_capability_rejected() {
        let space = Keypair::from_seed(&[1; 32]);
        let alice = Keypair::from_seed(&[2; 32]);
        let proof = DelegationBuilder::new(alice.did())
            .capability(space.did().to_string(), "space/*")
            .sign(&Keypair::from_seed(&[9; 32]))
            .unwrap();
        assert!(proof.verify(NOW).is_err());
    }

    #[test]
    fn test_tampered_signature_detected_by_verify_not_parse() {
        let space = Keypair::from_seed(&[1; 32]);
        let agent = Keypair::from_seed(&[2; 32]);
        let mut proof = space_to_agent(&space, &agent);
        proof.signature = Ed25519Signature([0u8; 64]);

        assert_eq!(
            proof.verify(NOW).unwrap_err(),
            CoreError::InvalidDelegation(format!("bad signature on {}", proof.cid()))
        );
    }

    #[test]
    fn test_missing_proof_block_is_malformed() {
        let space = Keypair::from_seed(&[1; 32]);
        let alice = Keypair::from_seed(&[2; 32]);
        let agent = Keypair::from_seed(&[3; 32]);
        let root = space_to_agent(&space, &alice);
        let leaf = DelegationBuilder::new(agent.did())
            .capability(space.did().to_string(), "space/blob/add")
            .proof(root)
            .sign(&alice)
            .unwrap();

        let mut car = CarArchive::new(*leaf.cid());
        car.insert(Block {
            cid: *leaf.cid(),
            data: leaf.block.clone(),
        });
        let bytes = car.to_bytes().unwrap();

        assert!(matches!(
            DelegationProof::from_archive(&bytes),
            Err(CoreError::MalformedDelegation(_))
        ));
    }

    /// `width` distinct delegations per level, each linking every
    /// delegation of the level below.
    fn lattice(width: usize, depth: usize) -> DelegationProof {
        let space = Keypair::from_seed(&[1; 32]);
        let agent = Keypair::from_seed(&[2; 32]);
        let mut level: Vec<DelegationProof> = Vec::new();
        for d in 0..depth {
            level = (0..width)
                .map(|i| {
                    let mut builder = DelegationBuilder::new(agent.did())
                        .capability(space.did().to_string(), "space/*")
                        .expiration(NOW + (d * width + i) as u64);
                    for proof in &level {
                        builder = builder.proof(proof.clone());
                    }
                    builder.sign(&space).unwrap()
                })
                .collect();
        }
        let mut root = DelegationBuilder::new(agent.did())
            .capability(space.did().to_string(), "space/blob/add");
        for proof in level {
            root = root.proof(proof);
        }
        root.sign(&space).unwrap()
    }

    #[test]
    fn test_duplicate_proof_link_is_malformed() {
        let space = Keypair::from_seed(&[1; 32]);
        let agent = Keypair::from_seed(&[2; 32]);
        let inner = space_to_agent(&space, &agent);
        let outer = DelegationBuilder::new(agent.did())
            .capability(space.did().to_string(), "space/blob/add")
            .proof(inner.clone())
            .proof(inner)
            .sign(&space)
            .unwrap();

        let err = DelegationProof::from_archive(&outer.archive().unwrap()).unwrap_err();
        assert!(matches!(err, CoreError::MalformedDelegation(ref d) if d.contains("twice")));
    }

    #[test]
    fn test_shared_proof_blocks_decoded_once() {
        // 1 + 3 + 9 delegations once expanded, but only 7 blocks.
        let proof = lattice(3, 2);
        let parsed = DelegationProof::from_archive(&proof.archive().unwrap()).unwrap();

        assert_eq!(parsed, proof);
        let first = &parsed.proofs()[0].proofs()[0];
        let second = &parsed.proofs()[1].proofs()[0];
        assert!(Arc::ptr_eq(first, second));
    }

    #[test]
    fn test_exploding_proof_tree_is_malformed() {
        // 4^5 leaves reachable through a few dozen blocks.
        let proof = lattice(4, 5);
        let bytes = proof.archive().unwrap();

        let err = DelegationProof::from_archive(&bytes).unwrap_err();
        assert!(matches!(err, CoreError::MalformedDelegation(ref d) if d.contains("exceeds")));
    }

    #[test]
    fn test_non_delegation_root_is_malformed() {
        let block = Block::dag_cbor(encode_canonical(&Value::Map(vec![])).unwrap());
        let mut car = CarArchive::new(block.cid);
        car.insert(block);
        let bytes = car.to_bytes().unwrap();

        assert!(matches!(
            DelegationProof::from_archive(&bytes),
            Err(CoreError::MalformedDelegation(_))
        ));
        assert_eq!(DelegationProof::from_archive(&[]), Err(CoreError::EmptyInput));
        assert!(matches!(
            DelegationProof::from_archive(b"garbage"),
            Err(CoreError::MalformedDelegation(_))
        ));
    }
}
