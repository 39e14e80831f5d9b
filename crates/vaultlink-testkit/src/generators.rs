//! Proptest generators for property-based testing.

use proptest::prelude::*;

use vaultlink_core::{Capability, Cid, IdentityRole, Keypair};
use vaultlink_store::BLOB_ADD;

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate arbitrary plaintext of at most `max_len` bytes.
pub fn plaintext(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Non-empty text the sniffer shows inline.
pub fn printable_text(max_len: usize) -> impl Strategy<Value = String> {
    let max_len = max_len.max(1);
    prop::collection::vec(
        prop_oneof![
            8 => (0x20u8..=0x7e).prop_map(char::from),
            1 => Just('\n'),
            1 => Just('\t'),
        ],
        1..=max_len,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

/// Bytes containing at least one control character below 0x09.
pub fn control_bytes(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    (
        prop::collection::vec(0x20u8..=0x7e, 0..=max_len),
        0x00u8..=0x08,
        any::<prop::sample::Index>(),
    )
        .prop_map(|(mut bytes, control, at)| {
            let at = at.index(bytes.len() + 1);
            bytes.insert(at, control);
            bytes
        })
}

/// Generate a raw CID over random content.
pub fn cid() -> impl Strategy<Value = Cid> {
    any::<[u8; 16]>().prop_map(|content| Cid::raw(&content))
}

pub fn identity_role() -> impl Strategy<Value = IdentityRole> {
    prop_oneof![Just(IdentityRole::Primary), Just(IdentityRole::Recovery)]
}

/// A capability over the space owned by `space`.
pub fn space_capability(space: Keypair) -> impl Strategy<Value = Capability> {
    let with = space.did().to_string();
    prop_oneof![
        Just(BLOB_ADD.to_string()),
        Just("space/*".to_string()),
        Just("*".to_string()),
    ]
    .prop_map(move |can| Capability::new(with.clone(), can))
}
