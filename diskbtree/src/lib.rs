//! Disk-resident B-tree of occurrence counters
//!
//! Nodes live as fixed-size records in a single random-access file, the
//! root always at offset 0. Keys are `i64` and every key carries a `u32`
//! occurrence count: inserting a key that is already present bumps its
//! count instead of adding a second entry. There is no deletion.
//!
//! An optional [`NodeCache`] sits in front of the record store as a
//! write-back LRU. Nodes touched while it is enabled are only guaranteed to
//! be on disk after [`BTree::flush_cache`].

pub mod btree;
pub mod cache;
pub mod check;
pub mod config;
pub mod error;
pub mod metadata;
pub mod node;
pub mod store;

pub use btree::*;
pub use cache::*;
pub use check::*;
pub use config::*;
pub use error::{Error, Result};
pub use metadata::*;
pub use node::*;
pub use store::*;

/// Byte offset of a node record in the tree file
pub type Offset = u64;

/// The root record never moves
pub const ROOT_OFFSET: Offset = 0;
