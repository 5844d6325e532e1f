//! rangeidx Tool
//!
//! Offline inspection of one index directory.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use rangeidx::key;
use rangeidx::store::{Direction, Store, StoreOptions, WAL_FILE};
use rangeidx::value::display_tuple;
use rangeidx::wal::WalRecovery;
use rangeidx::{Config, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// rangeidx index tool
#[derive(Parser, Debug)]
#[command(name = "rangeidx-tool")]
#[command(about = "Inspect, verify and dump rangeidx index directories")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the store header and WAL status without modifying anything
    Inspect {
        /// Index directory holding index.db
        dir: PathBuf,
    },

    /// Open the index, recover its WAL and check tree structure and pages
    Verify {
        /// Index directory holding index.db
        dir: PathBuf,
    },

    /// Print entries in key order
    Dump {
        /// Index directory holding index.db
        dir: PathBuf,

        /// Stop after this many entries
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print in descending key order
        #[arg(short, long)]
        descending: bool,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();
    let outcome = match args.command {
        Commands::Inspect { dir } => inspect(&dir),
        Commands::Verify { dir } => verify(&dir),
        Commands::Dump {
            dir,
            limit,
            descending,
        } => dump(&dir, limit, descending),
    };

    if let Err(e) = outcome {
        tracing::error!("{}", e);
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn inspect(dir: &Path) -> Result<()> {
    let header = Store::read_header(dir)?;
    println!("layout version : {}", header.layout_version);
    println!("slots          : {}", header.slot_count);
    println!("page size      : {}", header.page_size);
    println!("generation     : {}", header.generation);
    println!("root page      : {}", header.root);
    println!("pages          : {}", header.page_count);
    println!("entries        : {}", header.entry_count);
    println!("state          : {:?}", header.state);
    if let Some(failure) = &header.failure {
        println!("failure        : {}", failure);
    }

    let wal = dir.join(WAL_FILE);
    if wal.exists() {
        let result = WalRecovery::verify(&wal)?;
        println!(
            "wal            : {} entries, last LSN {}, {} corrupted",
            result.entries_recovered, result.last_lsn, result.entries_corrupted
        );
    } else {
        println!("wal            : missing");
    }
    Ok(())
}

fn open(dir: &Path) -> Result<Store> {
    let header = Store::read_header(dir)?;
    let options = StoreOptions::from_config(&Config::default(), header.slot_count as usize);
    Store::open(dir, &options)
}

fn verify(dir: &Path) -> Result<()> {
    let store = open(dir)?;
    let report = store.consistency_check()?;
    let sample = store.sample();
    println!(
        "ok: {} entries ({} distinct value tuples), {} leaves, {} internal nodes, depth {}",
        report.entries, sample.unique_values, report.leaves, report.internal_nodes, report.depth
    );
    Ok(())
}

fn dump(dir: &Path, limit: Option<usize>, descending: bool) -> Result<()> {
    let store = open(dir)?;
    let snapshot = store.snapshot();
    let direction = if descending {
        Direction::Descending
    } else {
        Direction::Ascending
    };
    let keys = snapshot.seek(
        std::ops::Bound::Unbounded,
        std::ops::Bound::Unbounded,
        direction,
    );
    for k in keys.take(limit.unwrap_or(usize::MAX)) {
        let (values, entity_id) = key::decode_key(&k, store.slot_count())?;
        println!("{}\t{}", entity_id, display_tuple(&values));
    }
    Ok(())
}
