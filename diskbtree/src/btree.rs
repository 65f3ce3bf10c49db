use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;

use crate::cache::{CacheStats, NodeCache};
use crate::config::TreeConfig;
use crate::error::{Error, Result};
use crate::metadata::TreeMetadata;
use crate::node::{Node, Occurrence};
use crate::store::{RecordStore, StoreStats};
use crate::{Offset, ROOT_OFFSET};

/// Deepest descent tolerated before the tree is declared corrupt. A valid
/// tree of degree 2 this tall would need more than 2^63 keys.
pub const MAX_HEIGHT: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access
{
    ReadOnly,
    ReadWrite,
}

/// B-tree of [`Occurrence`]s stored in a [`RecordStore`].
///
/// `root` is the in-memory copy of the record at offset 0 and is kept in
/// step with every root write. All other nodes are fetched on demand,
/// through the cache when one is configured.
#[derive(Debug)]
pub struct BTree<F>
{
    root: Node,
    metadata: TreeMetadata,
    store: RecordStore<F>,
    cache: Option<NodeCache>,
    access: Access,
}

impl BTree<File>
{
    /// Creates a fresh tree, truncating both files if they exist
    pub fn create<P, Q>(data_path: P, metadata_path: Q, config: &TreeConfig) -> Result<Self>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        config.validate()?;
        let metadata = TreeMetadata::new(config.effective_degree(), config.sequence_length)?;
        metadata.write_file(&metadata_path)?;
        let store = RecordStore::create_file(&data_path, metadata.degree())?;

        log::info!(
            "Creating tree {} (degree {}, sequence length {}, {} byte records)",
            data_path.as_ref().display(),
            metadata.degree(),
            metadata.sequence_length(),
            store.record_size()
        );

        BTree::init(store, metadata, config.cache_capacity)
    }

    pub fn open<P, Q>(
        data_path: P,
        metadata_path: Q,
        cache_capacity: Option<usize>,
        access: Access,
    ) -> Result<Self>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let metadata = TreeMetadata::read_file(&metadata_path)?;
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(access == Access::ReadWrite)
            .open(&data_path)?;

        log::info!(
            "Opening tree {} (degree {}, sequence length {})",
            data_path.as_ref().display(),
            metadata.degree(),
            metadata.sequence_length()
        );

        BTree::load(file, metadata, cache_capacity, access)
    }
}

impl<F: Read + Write + Seek> BTree<F>
{
    /// Starts a tree in `storage`, which must be empty. Metadata is not
    /// written anywhere; see [`BTree::metadata`].
    pub fn create_in(storage: F, config: &TreeConfig) -> Result<Self>
    {
        config.validate()?;
        let metadata = TreeMetadata::new(config.effective_degree(), config.sequence_length)?;
        let store = RecordStore::new(storage, metadata.degree());
        BTree::init(store, metadata, config.cache_capacity)
    }

    /// Loads an existing tree, reading the root from offset 0
    pub fn load(
        storage: F,
        metadata: TreeMetadata,
        cache_capacity: Option<usize>,
        access: Access,
    ) -> Result<Self>
    {
        metadata.validate()?;
        if cache_capacity == Some(0) {
            return Err(Error::invalid_input(
                "cache capacity must be at least 1 when the cache is enabled",
            ));
        }

        let mut store = RecordStore::new(storage, metadata.degree());
        if store.end_offset()? == 0 {
            return Err(Error::corruption("tree file holds no root record"));
        }
        let root = store.read(ROOT_OFFSET)?;

        Ok(BTree {
            root,
            metadata,
            store,
            cache: cache_capacity.map(NodeCache::new),
            access,
        })
    }

    fn init(
        mut store: RecordStore<F>,
        metadata: TreeMetadata,
        cache_capacity: Option<usize>,
    ) -> Result<Self>
    {
        if store.end_offset()? != 0 {
            return Err(Error::invalid_input("storage for a new tree must be empty"));
        }

        let mut root = Node::leaf(ROOT_OFFSET);
        store.append(&mut root)?;

        Ok(BTree {
            root,
            metadata,
            store,
            cache: cache_capacity.map(NodeCache::new),
            access: Access::ReadWrite,
        })
    }

    pub fn root(&self) -> &Node
    {
        &self.root
    }

    pub fn metadata(&self) -> TreeMetadata
    {
        self.metadata
    }

    pub fn degree(&self) -> u32
    {
        self.metadata.degree()
    }

    pub fn sequence_length(&self) -> u32
    {
        self.metadata.sequence_length()
    }

    pub fn cache_stats(&self) -> Option<CacheStats>
    {
        self.cache.as_ref().map(NodeCache::stats)
    }

    pub fn store_stats(&self) -> StoreStats
    {
        self.store.stats()
    }

    /// Node holding `key`, if any
    pub fn search(&mut self, key: i64) -> Result<Option<Node>>
    {
        let root = self.root.clone();
        self.search_from(root, key)
    }

    /// Descends from `node` looking for `key`
    pub fn search_from(&mut self, mut node: Node, key: i64) -> Result<Option<Node>>
    {
        for _ in 0..MAX_HEIGHT {
            let i = match node.find(key) {
                Ok(_) => return Ok(Some(node)),
                Err(i) => i,
            };
            if node.is_leaf {
                return Ok(None);
            }
            node = self.read_node(node.child(i)?)?;
        }
        Err(too_deep(key))
    }

    /// Frequency of `key`, `None` when it was never inserted
    pub fn frequency(&mut self, key: i64) -> Result<Option<u32>>
    {
        Ok(self
            .search(key)?
            .and_then(|node| node.occurrence(key).map(|o| o.frequency)))
    }

    /// Adds one sighting of `key` and returns its frequency afterwards
    pub fn insert(&mut self, key: i64) -> Result<u32>
    {
        if self.access == Access::ReadOnly {
            return Err(Error::invalid_input("tree was opened read-only"));
        }
        if key < 0 {
            return Err(Error::invalid_input(format!("keys are never negative, got {key}")));
        }

        if let Some(mut node) = self.search(key)? {
            let frequency = match node.occurrence_mut(key) {
                Some(occurrence) => {
                    occurrence.bump();
                    occurrence.frequency
                }
                None => {
                    return Err(Error::corruption(format!(
                        "search for {key} returned node at offset {} without it",
                        node.offset
                    )))
                }
            };
            self.write_node(node)?;
            return Ok(frequency);
        }

        if self.root.is_full(self.degree()) {
            self.split_root()?;
        }
        self.insert_non_full(self.root.clone(), key)?;
        Ok(1)
    }

    /// Writes every cached node back, least recently used first, and
    /// empties the cache. Must be called before the tree is dropped or
    /// cached changes are lost.
    pub fn flush_cache(&mut self) -> Result<()>
    {
        if let Some(cache) = self.cache.as_mut() {
            let mut written = 0_u64;
            // peek first so a failed write leaves the node cached
            while let Some((node, dirty)) = cache.peek_lru() {
                if dirty {
                    self.store.write(node)?;
                    written += 1;
                }
                cache.pop_lru();
            }
            log::info!("Flushed {written} cached nodes");
            log::debug!("Cache stats: {:?}", cache.stats());
        }
        log::debug!("Record store stats: {:?}", self.store.stats());
        self.store.flush()
    }

    /// Flushes and hands back the underlying storage
    pub fn into_inner(mut self) -> Result<F>
    {
        self.flush_cache()?;
        let BTree { store, .. } = self;
        Ok(store.into_inner())
    }

    /// Calls `visit` on every occurrence in ascending key order
    pub fn for_each_in_order<C>(&mut self, mut visit: C) -> Result<()>
    where
        C: FnMut(&Occurrence) -> Result<()>,
    {
        let root = self.root.clone();
        self.walk_in_order(root, 1, &mut visit)
    }

    /// All occurrences in ascending key order
    pub fn occurrences(&mut self) -> Result<Vec<Occurrence>>
    {
        let mut out = Vec::new();
        self.for_each_in_order(|o| {
            out.push(*o);
            Ok(())
        })?;
        Ok(out)
    }

    fn walk_in_order<C>(&mut self, node: Node, depth: u32, visit: &mut C) -> Result<()>
    where
        C: FnMut(&Occurrence) -> Result<()>,
    {
        if depth > MAX_HEIGHT {
            return Err(Error::corruption(format!(
                "tree deeper than {MAX_HEIGHT} levels below offset {}",
                node.offset
            )));
        }

        for (i, occurrence) in node.keys.iter().enumerate() {
            if !node.is_leaf {
                let child = self.read_node(node.child(i)?)?;
                self.walk_in_order(child, depth + 1, visit)?;
            }
            visit(occurrence)?;
        }

        if !node.is_leaf {
            let child = self.read_node(node.child(node.n())?)?;
            self.walk_in_order(child, depth + 1, visit)?;
        }
        Ok(())
    }

    /// Moves the full root out of offset 0 and puts a fresh internal root
    /// above it.
    fn split_root(&mut self) -> Result<()>
    {
        // the record reserved here is never referenced again, the new root
        // takes offset 0 instead
        let mut placeholder = Node::leaf(ROOT_OFFSET);
        self.store.append(&mut placeholder)?;

        let mut old_root = self.root.clone();
        let relocated = self.store.append(&mut old_root)?;
        log::debug!("Root split, old root relocated to offset {relocated}");

        let mut new_root = Node::internal(ROOT_OFFSET);
        new_root.children.push(relocated);
        self.split_child(&mut new_root, 0, old_root)
    }

    /// Splits the full `child`, which sits at `parent.children[i]`
    fn split_child(&mut self, parent: &mut Node, i: usize, mut child: Node) -> Result<()>
    {
        let t = self.degree() as usize;
        if child.n() != 2 * t - 1 {
            return Err(Error::corruption(format!(
                "splitting node at offset {} with {} keys, expected {}",
                child.offset,
                child.n(),
                2 * t - 1
            )));
        }

        let mut sibling = if child.is_leaf {
            Node::leaf(ROOT_OFFSET)
        } else {
            Node::internal(ROOT_OFFSET)
        };
        self.store.append(&mut sibling)?;

        sibling.keys = child.keys.split_off(t);
        let median = child
            .keys
            .pop()
            .ok_or_else(|| Error::corruption("split of a node with no median"))?;
        if !child.is_leaf {
            sibling.children = child.children.split_off(t);
        }

        parent.keys.insert(i, median);
        parent.children.insert(i + 1, sibling.offset);

        self.write_node(sibling)?;
        self.write_node(child)?;
        self.write_node(parent.clone())
    }

    fn insert_non_full(&mut self, mut node: Node, key: i64) -> Result<()>
    {
        let degree = self.degree();
        for _ in 0..MAX_HEIGHT {
            let mut i = match node.find(key) {
                Ok(_) => {
                    return Err(Error::corruption(format!(
                        "key {key} reappeared in node at offset {} during insert",
                        node.offset
                    )))
                }
                Err(i) => i,
            };

            if node.is_leaf {
                node.keys.insert(i, Occurrence::new(key));
                return self.write_node(node);
            }

            let child = self.read_node(node.child(i)?)?;
            if child.is_full(degree) {
                self.split_child(&mut node, i, child)?;
                if key > node.keys[i].key {
                    i += 1;
                }
            }
            node = self.read_node(node.child(i)?)?;
        }
        Err(too_deep(key))
    }

    /// Fetches a node, from the cache when it holds one
    pub(crate) fn read_node(&mut self, offset: Offset) -> Result<Node>
    {
        if offset == ROOT_OFFSET {
            return Ok(self.root.clone());
        }

        if let Some(cache) = self.cache.as_mut() {
            if let Some(node) = cache.get(offset) {
                return Ok(node.clone());
            }
        }

        let node = self.store.read(offset)?;
        self.make_room(offset)?;
        if let Some(cache) = self.cache.as_mut() {
            if let Some(evicted) = cache.admit(node.clone()) {
                self.store.write(&evicted)?;
            }
        }
        Ok(node)
    }

    /// Persists a node, through the cache when there is one
    fn write_node(&mut self, node: Node) -> Result<()>
    {
        if node.offset == ROOT_OFFSET {
            self.root = node.clone();
        }

        self.make_room(node.offset)?;
        match self.cache.as_mut() {
            Some(cache) => {
                if let Some(evicted) = cache.put(node) {
                    self.store.write(&evicted)?;
                }
                Ok(())
            }
            None => self.store.write(&node),
        }
    }

    /// Evicts the least recently used node if caching `offset` would need
    /// its slot. A dirty evictee is written before it leaves the cache, so a
    /// failed write keeps it cached.
    fn make_room(&mut self, offset: Offset) -> Result<()>
    {
        let cache = match self.cache.as_mut() {
            Some(cache) if cache.len() >= cache.capacity() && !cache.contains(offset) => cache,
            _ => return Ok(()),
        };
        if let Some((node, true)) = cache.peek_lru() {
            self.store.write(node)?;
        }
        cache.evict_lru();
        Ok(())
    }

    /// The root as it would be after a flush: the cached copy if there is
    /// one, otherwise the record on disk
    pub(crate) fn stored_root(&mut self) -> Result<Node>
    {
        if let Some(node) = self.cache.as_ref().and_then(|c| c.peek(ROOT_OFFSET)) {
            return Ok(node.clone());
        }
        self.store.read(ROOT_OFFSET)
    }

    pub(crate) fn record_count(&mut self) -> Result<u64>
    {
        Ok(self.store.end_offset()? / self.store.record_size())
    }
}

fn too_deep(key: i64) -> Error
{
    Error::corruption(format!(
        "descent for key {key} went deeper than {MAX_HEIGHT} levels"
    ))
}
