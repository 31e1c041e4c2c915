//! Binary Merkle tree over chunk hashes.
//!
//! A transaction commits to its data through `data_root`, the root of a tree
//! whose leaves are the SHA-256 hashes of each fixed-size chunk. Each uploaded
//! chunk carries an inclusion proof so the gateway can place it.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::digest::sha256;

/// Side of a sibling in a Merkle proof path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// Hash of one chunk of blob data (a Merkle leaf).
pub fn chunk_hash(data: &[u8]) -> [u8; 32] {
    sha256(data)
}

/// Binary Merkle tree built from chunk hashes.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    root: [u8; 32],
    /// Level 0 = leaves, last element = root.
    levels: Vec<Vec<[u8; 32]>>,
}

impl MerkleTree {
    /// Build a tree from leaf hashes.
    ///
    /// An empty list produces an all-zero root. A single leaf is its own root.
    pub fn from_leaves(leaves: Vec<[u8; 32]>) -> Self {
        if leaves.is_empty() {
            return Self {
                root: [0u8; 32],
                levels: vec![],
            };
        }

        let mut levels: Vec<Vec<[u8; 32]>> = vec![leaves];
        while levels[levels.len() - 1].len() > 1 {
            let current = &levels[levels.len() - 1];
            let next: Vec<[u8; 32]> = current
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_pair(left, right),
                    // Odd node: hash with itself
                    [only] => hash_pair(only, only),
                    _ => unreachable!("chunks(2) yields one or two elements"),
                })
                .collect();
            levels.push(next);
        }

        let root = levels[levels.len() - 1][0];
        Self { root, levels }
    }

    pub fn root(&self) -> [u8; 32] {
        self.root
    }

    pub fn leaf_count(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    pub fn leaf(&self, index: usize) -> Option<[u8; 32]> {
        self.levels.first()?.get(index).copied()
    }

    /// Inclusion proof for the leaf at `index`.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        if index >= self.leaf_count() {
            return None;
        }

        let mut path = Vec::new();
        let mut idx = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_idx = if idx % 2 == 0 { idx + 1 } else { idx - 1 };
            let sibling = level.get(sibling_idx).copied().unwrap_or(level[idx]);
            let side = if idx % 2 == 0 { Side::Right } else { Side::Left };
            path.push((sibling, side));
            idx /= 2;
        }

        Some(MerkleProof {
            leaf: self.levels[0][index],
            path,
            root: self.root,
        })
    }
}

/// Merkle inclusion proof for one chunk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf: [u8; 32],
    /// (sibling_hash, sibling_side) pairs from leaf to root.
    pub path: Vec<([u8; 32], Side)>,
    pub root: [u8; 32],
}

impl MerkleProof {
    /// Recompute the root from the leaf and path.
    pub fn verify(&self) -> bool {
        let mut current = self.leaf;
        for (sibling, side) in &self.path {
            current = match side {
                Side::Left => hash_pair(sibling, &current),
                Side::Right => hash_pair(&current, sibling),
            };
        }
        current == self.root
    }

    /// Compact path encoding for the chunk endpoint: 33 bytes per step
    /// (sibling hash, then `0` for left / `1` for right).
    pub fn path_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.path.len() * 33);
        for (sibling, side) in &self.path {
            out.extend_from_slice(sibling);
            out.push(match side {
                Side::Left => 0,
                Side::Right => 1,
            });
        }
        out
    }
}

fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}
