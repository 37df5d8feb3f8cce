//! Content-addressed deduplication of snapshot bodies.

use std::{
    collections::{btree_map, BTreeMap},
    fmt,
};

use sha1::{Digest, Sha1};

/// SHA-1 of a response body, computed locally.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; 20]);

impl ContentHash {
    pub fn of(body: &[u8]) -> Self {
        let mut hash = [0; 20];
        hash.copy_from_slice(&Sha1::digest(body));
        Self(hash)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.as_bytes()))
    }
}

/// One body per distinct content hash. The first body seen for a hash is
/// kept; iteration is in ascending hash order.
#[derive(Debug, Default)]
pub struct UniqueResponses {
    responses: BTreeMap<ContentHash, Vec<u8>>,
}

impl UniqueResponses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if an identical body was already stored.
    pub fn insert(&mut self, body: Vec<u8>) -> bool {
        match self.responses.entry(ContentHash::of(&body)) {
            btree_map::Entry::Occupied(entry) => {
                log::debug!("discarding duplicate response {}", entry.key());
                false
            }
            btree_map::Entry::Vacant(entry) => {
                entry.insert(body);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ContentHash, &[u8])> {
        self.responses.iter().map(|(hash, body)| (hash, body.as_slice()))
    }

    pub fn bodies(&self) -> impl Iterator<Item = &[u8]> {
        self.responses.values().map(Vec::as_slice)
    }
}
