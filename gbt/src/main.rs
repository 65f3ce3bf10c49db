extern crate clap;
extern crate indicatif;

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use libgenebank::*;

fn style_pb(pb: ProgressBar) -> ProgressBar
{
    let style = ProgressStyle::default_bar()
        .template(
            "[{spinner:.green}] {bar:30.green/yellow} {bytes:.cyan}/{total_bytes:.blue} ({eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▇▆▅▄▃▂▁  ")
        .tick_chars("ACTGN🧬");
    pb.set_style(style);
    pb
}

#[derive(Parser)]
#[clap(arg_required_else_help = true)]
#[clap(name = "gbt")]
#[clap(author = "Joseph Guhlin <joseph.guhlin@gmail.com>")]
#[clap(about = "Count and look up DNA subsequences of GenBank files with an on-disk B-tree", long_about = None)]
#[clap(version)]
struct Cli
{
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OnMiss
{
    /// Print nothing for the query and keep going
    Skip,
    /// Stop at the first query that is not in the tree
    Stop,
}

impl From<OnMiss> for MissPolicy
{
    fn from(on_miss: OnMiss) -> Self
    {
        match on_miss {
            OnMiss::Skip => MissPolicy::Skip,
            OnMiss::Stop => MissPolicy::Stop,
        }
    }
}

#[derive(Subcommand)]
enum Commands
{
    /// Build a B-tree of every subsequence in a GenBank file
    Create
    {
        /// GenBank file (.gbk), optionally .gz or .sz compressed
        gbk: PathBuf,
        /// Subsequence length, 1 to 31
        sequence_length: u32,
        /// Minimum degree, 0 fits each node in a 4096 byte block
        #[clap(short, long)]
        degree: Option<u32>,
        /// Keep recently used nodes in memory
        #[clap(short, long)]
        cache: bool,
        #[clap(long)]
        cache_size: Option<usize>,
        /// 1 also writes an in-order dump of the tree to ./dump
        #[clap(long)]
        debug_level: Option<u8>,
        /// YAML profile with defaults for the options above
        #[clap(long)]
        config: Option<PathBuf>,
    },
    /// Look up every subsequence of a query file in a B-tree
    Search
    {
        /// Tree data file, <gbk>.btree.data.<k>.<t>
        btree_file: PathBuf,
        /// One subsequence per line
        query_file: PathBuf,
        #[clap(short, long)]
        cache: bool,
        #[clap(long)]
        cache_size: Option<usize>,
        #[clap(long, value_enum)]
        on_miss: Option<OnMiss>,
        /// 1 also prints query totals to stderr
        #[clap(long)]
        debug_level: Option<u8>,
        #[clap(long)]
        config: Option<PathBuf>,
    },
    /// Print every subsequence and its count in order
    Dump
    {
        btree_file: PathBuf,
        /// Write here instead of stdout
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
    /// Verify the B-tree invariants of a tree file
    Check
    {
        btree_file: PathBuf,
    },
}

fn main()
{
    env_logger::init();
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Create {
            gbk,
            sequence_length,
            degree,
            cache,
            cache_size,
            debug_level,
            config,
        } => create(
            gbk,
            *sequence_length,
            *degree,
            *cache,
            *cache_size,
            *debug_level,
            config.as_deref(),
        ),
        Commands::Search {
            btree_file,
            query_file,
            cache,
            cache_size,
            on_miss,
            debug_level,
            config,
        } => search(
            btree_file,
            query_file,
            *cache,
            *cache_size,
            *on_miss,
            *debug_level,
            config.as_deref(),
        ),
        Commands::Dump { btree_file, output } => dump(btree_file, output.as_deref()),
        Commands::Check { btree_file } => check(btree_file),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = std::error::Error::source(cause);
        }
        std::process::exit(1);
    }
}

#[allow(clippy::too_many_arguments)]
fn create(
    gbk: &Path,
    sequence_length: u32,
    degree: Option<u32>,
    cache: bool,
    cache_size: Option<usize>,
    debug_level: Option<u8>,
    config: Option<&Path>,
) -> Result<()>
{
    let mut options = match config {
        Some(path) => BuildOptions::from_yaml_file(path)?,
        None => BuildOptions::default(),
    };
    options.sequence_length = sequence_length;
    if let Some(degree) = degree {
        options.degree = degree;
    }
    options.cache |= cache;
    if let Some(cache_size) = cache_size {
        options.cache_size = cache_size;
    }
    if let Some(debug_level) = debug_level {
        options.debug_level = debug_level;
    }

    let tree_config = options.tree_config();
    tree_config.validate()?;
    let paths = TreePaths::for_source(gbk, sequence_length, tree_config.effective_degree());

    let pb = style_pb(ProgressBar::new(0));
    let (filesize, compressed, reader) = generic_open_file_with(gbk, |file| pb.wrap_read(file))?;
    pb.set_length(filesize);
    log::info!(
        "Reading {} ({filesize} bytes{})",
        gbk.display(),
        if compressed { ", compressed" } else { "" }
    );

    let (mut tree, summary) = build_tree(BufReader::new(reader), &paths, &options)?;
    pb.finish_and_clear();

    println!("The B-Tree was created successfully!");
    match options.cache_capacity() {
        Some(size) => println!("Cache enabled: yes, {size} nodes"),
        None => println!("Cache enabled: no"),
    }
    println!("Sequence length: {}", tree.sequence_length());
    println!("Degree: {}", tree.degree());
    println!("Debug level: {}", options.debug_level);
    println!("Metadata file: {}", paths.metadata.display());
    println!("B-Tree file: {}", paths.data.display());
    println!(
        "Records: {}, subsequences: {} ({} distinct), skipped: {}",
        summary.records, summary.inserted, summary.distinct, summary.skipped
    );

    if options.debug_level == 1 {
        let mut out = BufWriter::new(File::create("dump")?);
        let lines = write_dump(&mut tree, &mut out)?;
        println!("Dump file: dump, {lines} subsequences");
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn search(
    btree_file: &Path,
    query_file: &Path,
    cache: bool,
    cache_size: Option<usize>,
    on_miss: Option<OnMiss>,
    debug_level: Option<u8>,
    config: Option<&Path>,
) -> Result<()>
{
    let mut options = match config {
        Some(path) => QueryOptions::from_yaml_file(path)?,
        None => QueryOptions::default(),
    };
    options.cache |= cache;
    if let Some(cache_size) = cache_size {
        options.cache_size = cache_size;
    }
    if let Some(on_miss) = on_miss {
        options.on_miss = on_miss.into();
    }
    if let Some(debug_level) = debug_level {
        options.debug_level = debug_level;
    }
    if options.debug_level > 1 {
        return Err(Error::invalid_input(format!(
            "debug level must be 0 or 1, got {}",
            options.debug_level
        )));
    }

    let mut tree = open_tree(btree_file, &options)?;
    let (_, _, queries) = generic_open_file(query_file)?;

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let stats = run_queries(&mut tree, BufReader::new(queries), &mut out, options.on_miss)?;
    out.flush()?;
    tree.flush_cache()?;

    if options.debug_level == 1 {
        eprintln!(
            "{} queries, {} found, {} missing{}",
            stats.queries,
            stats.found,
            stats.missing,
            if stats.stopped { ", stopped at first miss" } else { "" }
        );
    }
    Ok(())
}

fn dump(btree_file: &Path, output: Option<&Path>) -> Result<()>
{
    let mut tree = open_tree(btree_file, &QueryOptions::default())?;
    let lines = match output {
        Some(path) => write_dump(&mut tree, &mut BufWriter::new(File::create(path)?))?,
        None => write_dump(&mut tree, &mut BufWriter::new(std::io::stdout().lock()))?,
    };
    log::info!("Dumped {lines} subsequences");
    Ok(())
}

fn check(btree_file: &Path) -> Result<()>
{
    let mut tree = open_tree(btree_file, &QueryOptions::default())?;
    let stats = tree.check()?;
    println!("{}: ok", btree_file.display());
    println!("Degree: {}", tree.degree());
    println!("Sequence length: {}", tree.sequence_length());
    println!("Height: {}", stats.height);
    println!("Nodes: {} of {} records", stats.nodes, stats.records);
    println!("Distinct subsequences: {}", stats.keys);
    println!("Total subsequences: {}", stats.total_frequency);
    Ok(())
}
