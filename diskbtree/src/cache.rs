//! Write-back LRU cache of nodes, keyed by file offset.
//!
//! Entries live in an arena (`slots`) and are threaded into a doubly linked
//! recency list through slot indices, head is most recently used. `index`
//! maps an offset to its slot and owns nothing.
//!
//! Nodes handed to [`NodeCache::put`] are dirty: the cache holds the only
//! up-to-date copy. Nodes handed to [`NodeCache::admit`] were just read from
//! disk and are clean. The cache never touches the record store itself;
//! whatever dirty node it evicts, or [`NodeCache::pop_lru`] drains, must be
//! written by the caller.

use std::collections::HashMap;

use crate::node::Node;
use crate::Offset;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats
{
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Debug)]
struct Entry
{
    node: Node,
    dirty: bool,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
pub struct NodeCache
{
    slots: Vec<Option<Entry>>,
    free: Vec<usize>,
    index: HashMap<Offset, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    capacity: usize,
    stats: CacheStats,
}

impl NodeCache
{
    /// # Panics
    /// If `capacity` is 0. [`crate::TreeConfig::validate`] rejects that
    /// before a cache is ever built.
    pub fn new(capacity: usize) -> Self
    {
        assert!(capacity > 0, "NodeCache capacity must be at least 1");
        NodeCache {
            slots: Vec::with_capacity(capacity + 1),
            free: Vec::new(),
            index: HashMap::with_capacity(capacity + 1),
            head: None,
            tail: None,
            capacity,
            stats: CacheStats::default(),
        }
    }

    pub fn capacity(&self) -> usize
    {
        self.capacity
    }

    pub fn len(&self) -> usize
    {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.index.is_empty()
    }

    pub fn contains(&self, offset: Offset) -> bool
    {
        self.index.contains_key(&offset)
    }

    pub fn is_dirty(&self, offset: Offset) -> bool
    {
        self.index
            .get(&offset)
            .and_then(|&slot| self.slots[slot].as_ref())
            .map_or(false, |entry| entry.dirty)
    }

    /// Number of entries not yet written back
    pub fn dirty_len(&self) -> usize
    {
        self.slots
            .iter()
            .flatten()
            .filter(|entry| entry.dirty)
            .count()
    }

    pub fn stats(&self) -> CacheStats
    {
        self.stats
    }

    /// Cached node at `offset`, promoted to most recently used
    pub fn get(&mut self, offset: Offset) -> Option<&Node>
    {
        match self.index.get(&offset).copied() {
            Some(slot) => {
                self.stats.hits += 1;
                self.move_to_front(slot);
                self.slots[slot].as_ref().map(|entry| &entry.node)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Cached node at `offset`, recency and counters untouched
    pub fn peek(&self, offset: Offset) -> Option<&Node>
    {
        self.index
            .get(&offset)
            .and_then(|&slot| self.slots[slot].as_ref())
            .map(|entry| &entry.node)
    }

    /// Inserts or replaces the entry for `node.offset`, marks it dirty and
    /// makes it the most recently used. Replacing never evicts. Adding a new
    /// offset to a full cache evicts the least recently used entry; if that
    /// entry is dirty it is returned and the caller must persist it.
    pub fn put(&mut self, node: Node) -> Option<Node>
    {
        if let Some(&slot) = self.index.get(&node.offset) {
            if let Some(entry) = self.slots[slot].as_mut() {
                entry.node = node;
                entry.dirty = true;
            }
            self.move_to_front(slot);
            return None;
        }

        self.insert(node, true)
    }

    /// Caches a node just read from disk. A cached copy of the same offset
    /// always wins over the disk copy, so this only promotes an existing
    /// entry. Returns a dirty evictee exactly like [`NodeCache::put`].
    pub fn admit(&mut self, node: Node) -> Option<Node>
    {
        if let Some(&slot) = self.index.get(&node.offset) {
            self.move_to_front(slot);
            return None;
        }

        self.insert(node, false)
    }

    fn insert(&mut self, node: Node, dirty: bool) -> Option<Node>
    {
        let offset = node.offset;
        let entry = Entry {
            node,
            dirty,
            prev: None,
            next: None,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(entry);
                slot
            }
            None => {
                self.slots.push(Some(entry));
                self.slots.len() - 1
            }
        };
        self.index.insert(offset, slot);
        self.push_front(slot);

        if self.index.len() <= self.capacity {
            return None;
        }

        let slot = self.tail?;
        let entry = self.take(slot)?;
        self.stats.evictions += 1;
        log::trace!(
            "Evicting {} node at offset {}",
            if entry.dirty { "dirty" } else { "clean" },
            entry.node.offset
        );
        if entry.dirty {
            Some(entry.node)
        } else {
            None
        }
    }

    /// Least recently used node and whether it is dirty, left in place
    pub fn peek_lru(&self) -> Option<(&Node, bool)>
    {
        self.tail
            .and_then(|slot| self.slots[slot].as_ref())
            .map(|entry| (&entry.node, entry.dirty))
    }

    /// Removes and returns the least recently used node. Calling this until
    /// it returns `None` drains the cache oldest first.
    pub fn pop_lru(&mut self) -> Option<Node>
    {
        let slot = self.tail?;
        self.take(slot).map(|entry| entry.node)
    }

    /// Drops the least recently used node as an eviction. Whoever calls this
    /// has already written it back if [`NodeCache::peek_lru`] reported it
    /// dirty.
    pub fn evict_lru(&mut self) -> Option<Node>
    {
        let node = self.pop_lru()?;
        self.stats.evictions += 1;
        log::trace!("Evicting node at offset {}", node.offset);
        Some(node)
    }

    /// Offsets from most to least recently used
    pub fn offsets(&self) -> Vec<Offset>
    {
        let mut offsets = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            let entry = match self.slots[slot].as_ref() {
                Some(entry) => entry,
                None => break,
            };
            offsets.push(entry.node.offset);
            cursor = entry.next;
        }
        offsets
    }

    fn take(&mut self, slot: usize) -> Option<Entry>
    {
        self.unlink(slot);
        let entry = self.slots[slot].take()?;
        self.index.remove(&entry.node.offset);
        self.free.push(slot);
        Some(entry)
    }

    fn move_to_front(&mut self, slot: usize)
    {
        if self.head == Some(slot) {
            return;
        }
        self.unlink(slot);
        self.push_front(slot);
    }

    fn push_front(&mut self, slot: usize)
    {
        let old_head = self.head;
        if let Some(entry) = self.slots[slot].as_mut() {
            entry.prev = None;
            entry.next = old_head;
        }
        if let Some(head) = old_head {
            if let Some(entry) = self.slots[head].as_mut() {
                entry.prev = Some(slot);
            }
        }
        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }
    }

    fn unlink(&mut self, slot: usize)
    {
        let (prev, next) = match self.slots[slot].as_mut() {
            Some(entry) => {
                let links = (entry.prev, entry.next);
                entry.prev = None;
                entry.next = None;
                links
            }
            None => return,
        };

        match prev {
            Some(prev) => {
                if let Some(entry) = self.slots[prev].as_mut() {
                    entry.next = next;
                }
            }
            None => {
                if self.head == Some(slot) {
                    self.head = next;
                }
            }
        }

        match next {
            Some(next) => {
                if let Some(entry) = self.slots[next].as_mut() {
                    entry.prev = prev;
                }
            }
            None => {
                if self.tail == Some(slot) {
                    self.tail = prev;
                }
            }
        }
    }
}

impl Drop for NodeCache
{
    fn drop(&mut self)
    {
        let dirty = self.dirty_len();
        if dirty > 0 {
            log::warn!("Node cache dropped with {dirty} unflushed nodes, they are lost");
        }
    }
}
