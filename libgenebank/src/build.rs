use std::fs::File;
use std::io::{BufRead, Read, Seek, Write};

use libdiskbtree::BTree;

use crate::codec;
use crate::error::{Error, Result};
use crate::genbank::{window_count, windows, GenBank};
use crate::options::BuildOptions;
use crate::paths::TreePaths;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary
{
    /// GenBank records (ORIGIN sections) read
    pub records: u64,
    pub bases: u64,
    /// Windows inserted, repeats included
    pub inserted: u64,
    /// Windows dropped for holding an N
    pub skipped: u64,
    /// Windows that were a key's first sighting
    pub distinct: u64,
}

/// Inserts every `k`-window of every record in `source` into `tree`
pub fn insert_records<F, R>(tree: &mut BTree<F>, source: R) -> Result<BuildSummary>
where
    F: Read + Write + Seek,
    R: BufRead,
{
    let k = tree.sequence_length() as usize;
    let mut summary = BuildSummary::default();

    for sequence in GenBank::from_buffer(source) {
        let sequence = sequence?;
        summary.records += 1;
        summary.bases += sequence.len() as u64;

        let mut inserted = 0_u64;
        for window in windows(&sequence, k) {
            if tree.insert(codec::encode(window)?)? == 1 {
                summary.distinct += 1;
            }
            inserted += 1;
        }

        log::debug!(
            "Record {}: {} bases, {inserted} windows",
            summary.records,
            sequence.len()
        );
        summary.inserted += inserted;
        summary.skipped += window_count(sequence.len(), k) as u64 - inserted;
    }

    Ok(summary)
}

/// Creates the tree at `paths`, fills it from `source` and flushes it. The
/// tree is handed back, flushed, for any follow-up such as a dump.
pub fn build_tree<R: BufRead>(
    source: R,
    paths: &TreePaths,
    options: &BuildOptions,
) -> Result<(BTree<File>, BuildSummary)>
{
    let config = options.tree_config();
    config.validate()?;
    if options.debug_level > 1 {
        return Err(Error::invalid_input(format!(
            "debug level must be 0 or 1, got {}",
            options.debug_level
        )));
    }

    let mut tree = BTree::create(&paths.data, &paths.metadata, &config)?;
    let summary = insert_records(&mut tree, source)?;
    tree.flush_cache()?;

    log::info!(
        "Built {} from {} records: {} windows inserted, {} distinct, {} skipped",
        paths.data.display(),
        summary.records,
        summary.inserted,
        summary.distinct,
        summary.skipped
    );
    if let Some(stats) = tree.cache_stats() {
        log::debug!("Cache stats: {stats:?}");
    }

    Ok((tree, summary))
}
