use std::collections::HashSet;
use std::io::{Read, Seek, Write};

use crate::btree::{BTree, MAX_HEIGHT};
use crate::error::{Error, Result};
use crate::node::Node;
use crate::ROOT_OFFSET;

/// Shape of a tree that passed [`BTree::check`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats
{
    pub nodes: u64,
    pub keys: u64,
    /// Levels, a lone root leaf is height 1
    pub height: u32,
    pub total_frequency: u64,
    /// Records in the file, including reserved ones no node points at
    pub records: u64,
}

struct Pending
{
    node: Node,
    depth: u32,
    lower: Option<i64>,
    upper: Option<i64>,
}

impl<F: Read + Write + Seek> BTree<F>
{
    /// Walks every node and verifies the B-tree invariants. Reads go through
    /// the cache, so unflushed changes are what gets checked.
    pub fn check(&mut self) -> Result<TreeStats>
    {
        let stored = self.stored_root()?;
        if &stored != self.root() {
            return Err(Error::corruption(
                "record at offset 0 differs from the in-memory root",
            ));
        }

        let t = self.degree() as usize;
        let mut stats = TreeStats {
            records: self.record_count()?,
            ..TreeStats::default()
        };
        let mut leaf_depth: Option<u32> = None;
        let mut seen = HashSet::new();
        let mut pending = vec![Pending {
            node: stored,
            depth: 1,
            lower: None,
            upper: None,
        }];

        while let Some(Pending {
            node,
            depth,
            lower,
            upper,
        }) = pending.pop()
        {
            if !seen.insert(node.offset) {
                return Err(Error::corruption(format!(
                    "node at offset {} is reachable twice",
                    node.offset
                )));
            }
            if depth > MAX_HEIGHT {
                return Err(Error::corruption(format!(
                    "tree deeper than {MAX_HEIGHT} levels"
                )));
            }

            let n = node.n();
            if n > 2 * t - 1 || (node.offset != ROOT_OFFSET && n < t - 1) {
                return Err(Error::corruption(format!(
                    "node at offset {} holds {n} keys, degree {t} allows {}..={}",
                    node.offset,
                    t - 1,
                    2 * t - 1
                )));
            }

            if !node.keys.windows(2).all(|w| w[0].key < w[1].key) {
                return Err(Error::corruption(format!(
                    "keys out of order in node at offset {}",
                    node.offset
                )));
            }

            for occurrence in &node.keys {
                let above = lower.map_or(true, |l| occurrence.key > l);
                let below = upper.map_or(true, |u| occurrence.key < u);
                if !above || !below || occurrence.frequency == 0 {
                    return Err(Error::corruption(format!(
                        "key {} (frequency {}) misplaced in node at offset {}",
                        occurrence.key, occurrence.frequency, node.offset
                    )));
                }
                stats.total_frequency += occurrence.frequency as u64;
            }

            stats.nodes += 1;
            stats.keys += n as u64;

            if node.is_leaf {
                if !node.children.is_empty() {
                    return Err(Error::corruption(format!(
                        "leaf at offset {} has children",
                        node.offset
                    )));
                }
                let expected = *leaf_depth.get_or_insert(depth);
                if expected != depth {
                    return Err(Error::corruption(format!(
                        "leaves at depth {expected} and {depth}"
                    )));
                }
                continue;
            }

            if node.children.len() != n + 1 {
                return Err(Error::corruption(format!(
                    "internal node at offset {} has {n} keys and {} children",
                    node.offset,
                    node.children.len()
                )));
            }

            for i in 0..=n {
                let offset = node.child(i)?;
                let child = self.read_node(offset)?;
                if child.offset != offset {
                    return Err(Error::corruption(format!(
                        "node reached at offset {offset} says it lives at {}",
                        child.offset
                    )));
                }
                pending.push(Pending {
                    node: child,
                    depth: depth + 1,
                    lower: if i == 0 { lower } else { Some(node.keys[i - 1].key) },
                    upper: if i == n { upper } else { Some(node.keys[i].key) },
                });
            }
        }

        stats.height = leaf_depth.unwrap_or(1);
        log::debug!("Tree check passed: {stats:?}");
        Ok(stats)
    }
}

#[cfg(test)]
mod tests
{
    use std::io::Cursor;

    use super::*;
    use crate::config::TreeConfig;
    use crate::metadata::TreeMetadata;
    use crate::node::{Occurrence, BINCODE_CONFIG};
    use crate::Access;

    fn built(degree: u32, keys: impl IntoIterator<Item = i64>) -> (TreeMetadata, Vec<u8>)
    {
        let mut tree =
            BTree::create_in(Cursor::new(Vec::new()), &TreeConfig::new(degree, 8)).unwrap();
        for key in keys {
            tree.insert(key).unwrap();
        }
        (tree.metadata(), tree.into_inner().unwrap().into_inner())
    }

    fn reload(metadata: TreeMetadata, bytes: Vec<u8>) -> BTree<Cursor<Vec<u8>>>
    {
        BTree::load(Cursor::new(bytes), metadata, None, Access::ReadOnly).unwrap()
    }

    #[test]
    fn empty_tree()
    {
        let (metadata, bytes) = built(2, Vec::new());
        let stats = reload(metadata, bytes).check().unwrap();
        assert_eq!(
            stats,
            TreeStats {
                nodes: 1,
                keys: 0,
                height: 1,
                total_frequency: 0,
                records: 1,
            }
        );
    }

    #[test]
    fn counts_nodes_and_reserved_records()
    {
        let (metadata, bytes) = built(2, [1, 2, 3, 4, 4]);
        let stats = reload(metadata, bytes).check().unwrap();
        assert_eq!(stats.nodes, 3);
        assert_eq!(stats.keys, 4);
        assert_eq!(stats.height, 2);
        assert_eq!(stats.total_frequency, 5);
        assert_eq!(stats.records, 4);
    }

    #[test]
    fn unflushed_root_is_checked_through_cache()
    {
        let mut tree = BTree::create_in(
            Cursor::new(Vec::new()),
            &TreeConfig::new(2, 8).with_cache(2),
        )
        .unwrap();
        for key in 0..50 {
            tree.insert(key).unwrap();
        }
        assert_eq!(tree.check().unwrap().keys, 50);
    }

    #[test]
    fn detects_misplaced_key()
    {
        let (metadata, mut bytes) = built(2, [1, 2, 3, 4]);

        // the left leaf at 162 gets a key larger than the root's separator
        let record = &mut bytes[162..243];
        let mut slot = Vec::new();
        bincode::encode_into_std_write(Occurrence::new(9), &mut slot, BINCODE_CONFIG).unwrap();
        record[0..12].copy_from_slice(&slot);

        let err = reload(metadata, bytes).check().unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn detects_shared_child()
    {
        let (metadata, mut bytes) = built(2, [1, 2, 3, 4]);

        // both root children point at 162
        bytes[44..52].copy_from_slice(&162_i64.to_be_bytes());

        let err = reload(metadata, bytes).check().unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn detects_underfull_node()
    {
        let (metadata, mut bytes) = built(3, 0..6);

        // right leaf at 363 holds 3 keys, make it claim 1
        let count = 363 + 5 * 12 + 6 * 8;
        bytes[count..count + 4].copy_from_slice(&1_u32.to_be_bytes());

        let err = reload(metadata, bytes).check().unwrap_err();
        assert!(err.is_corruption());
    }
}
