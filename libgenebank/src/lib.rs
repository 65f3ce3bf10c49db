//! GenBank subsequence counting on top of [`libdiskbtree`].
//!
//! A GenBank file is scanned for its `ORIGIN` sections, every window of
//! `k` bases is packed into an integer key with [`codec::encode`] and
//! inserted into a disk B-tree, which counts repeats. Query files are then
//! answered against the same tree.

pub mod build;
pub mod codec;
pub mod dump;
pub mod error;
pub mod genbank;
pub mod io;
pub mod options;
pub mod paths;
pub mod query;

pub use build::*;
pub use dump::*;
pub use error::{Error, Result};
pub use genbank::*;
pub use io::*;
pub use options::*;
pub use paths::*;
pub use query::*;
