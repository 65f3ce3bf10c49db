use std::io::Write;

use bincode::config::{BigEndian, Configuration, Fixint, NoLimit};

use crate::error::{Error, Result};
use crate::{Offset, ROOT_OFFSET};

/// Fixed-width, big-endian. Every field of a record always takes the same
/// number of bytes, which is what keeps node offsets stable.
pub const BINCODE_CONFIG: Configuration<BigEndian, Fixint, NoLimit> =
    bincode::config::standard()
        .with_big_endian()
        .with_fixed_int_encoding();

/// On-disk marker for "no child" / "no node"
pub const NO_NODE: i64 = -1;

/// On-disk key of an unused occurrence slot
pub const EMPTY_KEY: i64 = -1;

const KEY_BYTES: u64 = 8;
const FREQUENCY_BYTES: u64 = 4;
const CHILD_BYTES: u64 = 8;
const COUNT_BYTES: u64 = 4;
const LEAF_BYTES: u64 = 1;
const OFFSET_BYTES: u64 = 8;

/// Size in bytes of one node record for a tree of minimum degree `degree`
pub const fn record_size(degree: u32) -> u64
{
    let t = degree as u64;
    (2 * t).saturating_sub(1) * (KEY_BYTES + FREQUENCY_BYTES)
        + 2 * t * CHILD_BYTES
        + COUNT_BYTES
        + LEAF_BYTES
        + OFFSET_BYTES
}

/// A key and the number of times it has been inserted
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, bincode::Encode, bincode::Decode,
)]
pub struct Occurrence
{
    pub key: i64,
    pub frequency: u32,
}

impl Occurrence
{
    pub const EMPTY: Occurrence = Occurrence {
        key: EMPTY_KEY,
        frequency: 0,
    };

    /// First sighting of a key
    pub fn new(key: i64) -> Self
    {
        Occurrence { key, frequency: 1 }
    }

    /// Counts one more sighting. Saturates at `u32::MAX`.
    pub fn bump(&mut self)
    {
        self.frequency = self.frequency.saturating_add(1);
    }
}

/// In-memory form of one node record.
///
/// Only populated slots are kept: `keys.len()` is the record's `n`, and an
/// internal node has exactly `n + 1` children while a leaf has none. The
/// sentinel-padded layout only exists on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node
{
    pub offset: Offset,
    pub is_leaf: bool,
    pub keys: Vec<Occurrence>,
    pub children: Vec<Offset>,
}

impl Node
{
    pub fn leaf(offset: Offset) -> Self
    {
        Node {
            offset,
            is_leaf: true,
            keys: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn internal(offset: Offset) -> Self
    {
        Node {
            offset,
            is_leaf: false,
            keys: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Number of populated key slots
    pub fn n(&self) -> usize
    {
        self.keys.len()
    }

    pub fn is_full(&self, degree: u32) -> bool
    {
        self.keys.len() >= 2 * degree as usize - 1
    }

    /// `Ok(i)` when `keys[i]` holds `key`, otherwise `Err(i)` with `i` the
    /// first slot whose key is greater (the child to descend into)
    pub fn find(&self, key: i64) -> std::result::Result<usize, usize>
    {
        self.keys.binary_search_by_key(&key, |o| o.key)
    }

    pub fn occurrence(&self, key: i64) -> Option<&Occurrence>
    {
        self.find(key).ok().map(|i| &self.keys[i])
    }

    pub fn occurrence_mut(&mut self, key: i64) -> Option<&mut Occurrence>
    {
        match self.find(key) {
            Ok(i) => Some(&mut self.keys[i]),
            Err(_) => None,
        }
    }

    /// Offset of child `i`. An internal node missing a child is corrupt,
    /// and so is one pointing at the root's slot.
    pub fn child(&self, i: usize) -> Result<Offset>
    {
        match self.children.get(i) {
            Some(&offset) if offset != ROOT_OFFSET => Ok(offset),
            _ => Err(Error::missing_child(self.offset, i)),
        }
    }

    /// Serialize as a full fixed-size record
    pub fn encode_record<W: Write>(&self, degree: u32, out: &mut W) -> Result<()>
    {
        let max_keys = 2 * degree as usize - 1;
        let max_children = 2 * degree as usize;

        if self.keys.len() > max_keys {
            return Err(Error::corruption(format!(
                "node at offset {} holds {} keys, degree {degree} allows {max_keys}",
                self.offset,
                self.keys.len()
            )));
        }

        if self.children.len() > max_children {
            return Err(Error::corruption(format!(
                "node at offset {} holds {} children, degree {degree} allows {max_children}",
                self.offset,
                self.children.len()
            )));
        }

        for i in 0..max_keys {
            let occurrence = self.keys.get(i).unwrap_or(&Occurrence::EMPTY);
            bincode::encode_into_std_write(occurrence, out, BINCODE_CONFIG)?;
        }

        for i in 0..max_children {
            let child = match self.children.get(i) {
                Some(offset) => offset_to_disk(*offset)?,
                None => NO_NODE,
            };
            bincode::encode_into_std_write(child, out, BINCODE_CONFIG)?;
        }

        bincode::encode_into_std_write(self.keys.len() as u32, out, BINCODE_CONFIG)?;
        bincode::encode_into_std_write(self.is_leaf, out, BINCODE_CONFIG)?;
        bincode::encode_into_std_write(offset_to_disk(self.offset)?, out, BINCODE_CONFIG)?;

        Ok(())
    }

    /// Decode one record previously read from `offset`
    pub fn decode_record(mut record: &[u8], degree: u32, offset: Offset) -> Result<Node>
    {
        let max_keys = 2 * degree as usize - 1;
        let max_children = 2 * degree as usize;

        let mut slots: Vec<Occurrence> = Vec::with_capacity(max_keys);
        for _ in 0..max_keys {
            slots.push(bincode::decode_from_std_read(&mut record, BINCODE_CONFIG)?);
        }

        let mut child_slots: Vec<i64> = Vec::with_capacity(max_children);
        for _ in 0..max_children {
            child_slots.push(bincode::decode_from_std_read(&mut record, BINCODE_CONFIG)?);
        }

        let n: u32 = bincode::decode_from_std_read(&mut record, BINCODE_CONFIG)?;
        let is_leaf: bool = bincode::decode_from_std_read(&mut record, BINCODE_CONFIG)?;
        let stored_offset: i64 = bincode::decode_from_std_read(&mut record, BINCODE_CONFIG)?;

        let n = n as usize;
        if n > max_keys {
            return Err(Error::corruption(format!(
                "record at offset {offset} claims {n} keys, degree {degree} allows {max_keys}"
            )));
        }

        if stored_offset != offset as i64 {
            return Err(Error::corruption(format!(
                "record at offset {offset} says it lives at {stored_offset}"
            )));
        }

        slots.truncate(n);

        let children = if is_leaf {
            Vec::new()
        } else {
            child_slots
                .iter()
                .take(n + 1)
                .enumerate()
                .map(|(i, &child)| {
                    if child <= ROOT_OFFSET as i64 {
                        Err(Error::missing_child(offset, i))
                    } else {
                        Ok(child as Offset)
                    }
                })
                .collect::<Result<Vec<Offset>>>()?
        };

        Ok(Node {
            offset,
            is_leaf,
            keys: slots,
            children,
        })
    }
}

fn offset_to_disk(offset: Offset) -> Result<i64>
{
    i64::try_from(offset).map_err(|_| {
        Error::corruption(format!("offset {offset} does not fit a record field"))
    })
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn encoded(node: &Node, degree: u32) -> Vec<u8>
    {
        let mut buf = Vec::new();
        node.encode_record(degree, &mut buf).unwrap();
        buf
    }

    #[test]
    fn record_size_matches_layout()
    {
        assert_eq!(record_size(2), 81);
        assert_eq!(record_size(3), 121);

        let node = Node::leaf(0);
        assert_eq!(encoded(&node, 2).len() as u64, record_size(2));

        let mut node = Node::internal(81);
        node.keys.push(Occurrence::new(7));
        node.children = vec![162, 243];
        assert_eq!(encoded(&node, 4).len() as u64, record_size(4));
    }

    #[test]
    fn field_order_and_padding()
    {
        let mut node = Node::internal(162);
        node.keys.push(Occurrence {
            key: 5,
            frequency: 3,
        });
        node.children = vec![81, 243];

        let buf = encoded(&node, 2);

        // slot 0
        assert_eq!(&buf[0..8], &5_i64.to_be_bytes());
        assert_eq!(&buf[8..12], &3_u32.to_be_bytes());
        // slots 1 and 2 are empty
        assert_eq!(&buf[12..20], &(-1_i64).to_be_bytes());
        assert_eq!(&buf[20..24], &0_u32.to_be_bytes());
        assert_eq!(&buf[24..32], &(-1_i64).to_be_bytes());

        // children
        assert_eq!(&buf[36..44], &81_i64.to_be_bytes());
        assert_eq!(&buf[44..52], &243_i64.to_be_bytes());
        assert_eq!(&buf[52..60], &(-1_i64).to_be_bytes());
        assert_eq!(&buf[60..68], &(-1_i64).to_be_bytes());

        assert_eq!(&buf[68..72], &1_u32.to_be_bytes());
        assert_eq!(buf[72], 0);
        assert_eq!(&buf[73..81], &162_i64.to_be_bytes());
    }

    #[test]
    fn decode_restores_populated_slots()
    {
        let mut node = Node::internal(243);
        node.keys = vec![Occurrence::new(1), Occurrence { key: 9, frequency: 4 }];
        node.children = vec![81, 162, 324];

        let decoded = Node::decode_record(&encoded(&node, 3), 3, 243).unwrap();
        assert_eq!(decoded, node);

        let leaf = Node {
            offset: 81,
            is_leaf: true,
            keys: vec![Occurrence::new(2)],
            children: Vec::new(),
        };
        let decoded = Node::decode_record(&encoded(&leaf, 2), 2, 81).unwrap();
        assert_eq!(decoded, leaf);
    }

    #[test]
    fn decode_rejects_missing_child()
    {
        let mut node = Node::internal(0);
        node.keys.push(Occurrence::new(1));
        node.children = vec![81];

        let err = Node::decode_record(&encoded(&node, 2), 2, 0).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn decode_rejects_wrong_offset()
    {
        let node = Node::leaf(81);
        let err = Node::decode_record(&encoded(&node, 2), 2, 162).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn bump_saturates()
    {
        let mut occurrence = Occurrence {
            key: 1,
            frequency: u32::MAX - 1,
        };
        occurrence.bump();
        occurrence.bump();
        assert_eq!(occurrence.frequency, u32::MAX);
    }

    #[test]
    fn find_reports_descent_slot()
    {
        let mut node = Node::leaf(0);
        node.keys = vec![Occurrence::new(10), Occurrence::new(20)];
        assert_eq!(node.find(10), Ok(0));
        assert_eq!(node.find(5), Err(0));
        assert_eq!(node.find(15), Err(1));
        assert_eq!(node.find(25), Err(2));
        assert!(node.child(0).is_err());
    }
}
