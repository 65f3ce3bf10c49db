use std::fs::File;
use std::io::{BufRead, Read, Seek, Write};
use std::path::Path;

use libdiskbtree::{Access, BTree};

use crate::codec;
use crate::error::{Error, Result};
use crate::options::{MissPolicy, QueryOptions};
use crate::paths::TreePaths;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats
{
    pub queries: u64,
    pub found: u64,
    pub missing: u64,
    /// The run ended early under [`MissPolicy::Stop`]
    pub stopped: bool,
}

/// Opens the tree behind `data` read-only, locating its metadata by name
pub fn open_tree<P: AsRef<Path>>(data: P, options: &QueryOptions) -> Result<BTree<File>>
{
    if options.cache && options.cache_size == 0 {
        return Err(Error::invalid_input("cache size must be at least 1"));
    }
    let paths = TreePaths::from_data_path(data)?;
    Ok(BTree::open(
        &paths.data,
        &paths.metadata,
        options.cache_capacity(),
        Access::ReadOnly,
    )?)
}

/// Looks up one subsequence per line of `queries`, writing
/// `<SEQUENCE> <frequency>` to `out` for each one found. Blank lines are
/// ignored.
pub fn run_queries<F, R, W>(
    tree: &mut BTree<F>,
    queries: R,
    out: &mut W,
    on_miss: MissPolicy,
) -> Result<QueryStats>
where
    F: Read + Write + Seek,
    R: BufRead,
    W: Write,
{
    let k = tree.sequence_length() as usize;
    let mut stats = QueryStats::default();

    for (line_number, line) in queries.lines().enumerate() {
        let line = line?;
        let query = line.trim();
        if query.is_empty() {
            continue;
        }

        if query.len() != k {
            return Err(Error::invalid_input(format!(
                "query on line {} is {} bases long, the tree holds {k}-mers",
                line_number + 1,
                query.len()
            )));
        }

        let key = codec::encode(query)?;
        stats.queries += 1;
        match tree.frequency(key)? {
            Some(frequency) => {
                stats.found += 1;
                writeln!(out, "{} {frequency}", codec::decode(key, k))?;
            }
            None => {
                stats.missing += 1;
                log::debug!("{query} not found");
                if on_miss == MissPolicy::Stop {
                    stats.stopped = true;
                    break;
                }
            }
        }
    }

    log::info!(
        "{} queries: {} found, {} missing",
        stats.queries,
        stats.found,
        stats.missing
    );
    if let Some(cache) = tree.cache_stats() {
        log::debug!("Cache stats: {cache:?}");
    }
    Ok(stats)
}

#[cfg(test)]
mod tests
{
    use std::io::Cursor;

    use libdiskbtree::TreeConfig;

    use super::*;

    fn tree_of(sequences: &[&str]) -> BTree<Cursor<Vec<u8>>>
    {
        let config = TreeConfig::new(2, 3).with_cache(2);
        let mut tree = BTree::create_in(Cursor::new(Vec::new()), &config).unwrap();
        for sequence in sequences {
            tree.insert(codec::encode(sequence).unwrap()).unwrap();
        }
        tree
    }

    fn run(
        tree: &mut BTree<Cursor<Vec<u8>>>,
        queries: &str,
        on_miss: MissPolicy,
    ) -> (QueryStats, String)
    {
        let mut out = Vec::new();
        let stats = run_queries(tree, Cursor::new(queries), &mut out, on_miss).unwrap();
        (stats, String::from_utf8(out).unwrap())
    }

    #[test]
    fn reports_found_and_skips_missing()
    {
        let mut tree = tree_of(&["ACG", "ACG", "TTT", "GAT"]);
        let (stats, out) = run(&mut tree, "acg\n\nCCC\n  TTT  \ngat\n", MissPolicy::Skip);
        assert_eq!(out, "ACG 2\nTTT 1\nGAT 1\n");
        assert_eq!(
            stats,
            QueryStats {
                queries: 4,
                found: 3,
                missing: 1,
                stopped: false,
            }
        );
    }

    #[test]
    fn stop_ends_at_first_miss()
    {
        let mut tree = tree_of(&["ACG", "TTT"]);
        let (stats, out) = run(&mut tree, "ACG\nCCC\nTTT\n", MissPolicy::Stop);
        assert_eq!(out, "ACG 1\n");
        assert!(stats.stopped);
        assert_eq!(stats.queries, 2);
    }

    #[test]
    fn wrong_length_or_symbols_are_invalid()
    {
        let mut tree = tree_of(&["ACG"]);
        let mut out = Vec::new();
        let err = run_queries(&mut tree, Cursor::new("ACGT\n"), &mut out, MissPolicy::Skip)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = run_queries(&mut tree, Cursor::new("ANG\n"), &mut out, MissPolicy::Skip)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn opens_built_tree_by_data_path()
    {
        let dir = tempfile::tempdir().unwrap();
        let paths = TreePaths::for_source(dir.path().join("q.gbk"), 3, 2);
        let config = TreeConfig::new(2, 3);
        let mut tree = BTree::create(&paths.data, &paths.metadata, &config).unwrap();
        for sequence in ["AAA", "CCC", "AAA"] {
            tree.insert(codec::encode(sequence).unwrap()).unwrap();
        }
        tree.flush_cache().unwrap();
        drop(tree);

        let options = QueryOptions {
            cache: true,
            cache_size: 4,
            ..QueryOptions::default()
        };
        let mut tree = open_tree(&paths.data, &options).unwrap();
        assert_eq!(tree.sequence_length(), 3);

        let mut out = Vec::new();
        run_queries(&mut tree, Cursor::new("AAA\nCCC\n"), &mut out, MissPolicy::Skip).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "AAA 2\nCCC 1\n");

        let err = open_tree(dir.path().join("q.gbk"), &options).err().unwrap();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
