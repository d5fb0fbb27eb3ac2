use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};

use memscrimper::{CompressOptions, InnerCodec, LoggingStatsSink, PAGESIZE_DEFAULT};

/// Compress and decompress virtual-machine memory snapshots against a
/// reference dump.
#[derive(Clone, Debug, Parser)]
#[command(name = "mscr", version)]
struct Args {
    #[command(subcommand)]
    operation: Operation,
}

#[derive(Clone, Debug, Subcommand)]
enum Operation {
    /// Compress a dump against a reference dump
    C(CompressArgs),
    /// Decompress a dump produced by `c`
    D(DecompressArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum InnerArg {
    None,
    Gzip,
    Bzip2,
    #[value(name = "7zip")]
    SevenZip,
}

impl From<InnerArg> for InnerCodec {
    fn from(value: InnerArg) -> Self {
        match value {
            InnerArg::None => InnerCodec::None,
            InnerArg::Gzip => InnerCodec::Gzip,
            InnerArg::Bzip2 => InnerCodec::Bzip2,
            InnerArg::SevenZip => InnerCodec::Xz,
        }
    }
}

#[derive(Clone, Debug, Parser)]
struct CompressArgs {
    /// dump to compress
    source: PathBuf,
    /// compressed output file
    target: PathBuf,
    /// reference dump to compress against
    #[arg(short, long)]
    reference: PathBuf,
    /// page size in bytes
    #[arg(long, default_value_t = PAGESIZE_DEFAULT)]
    pagesize: u32,
    /// outer general-purpose compressor to apply to the encoded payload
    #[arg(long, value_enum, default_value = "none")]
    inner: InnerArg,
    /// enable byte-level delta encoding, tagged with this variant name
    #[arg(long)]
    delta: Option<String>,
    /// disable intra-dump deduplication of new pages
    #[arg(long)]
    nointra: bool,
}

#[derive(Clone, Debug, Parser)]
struct DecompressArgs {
    /// compressed file to decompress
    source: PathBuf,
    /// output dump file
    target: PathBuf,
    /// directory to resolve the stored reference path's file name against,
    /// instead of using the stored path verbatim
    #[arg(short, long)]
    reference_dir: Option<PathBuf>,
}

/// Rejects a target path that already exists and is non-empty, matching the
/// original CLI's `os.path.isfile(target) and os.path.getsize(target) > 0`
/// guard against clobbering existing output.
fn ensure_target_is_free(target: &std::path::Path) -> Result<()> {
    if target.is_file() {
        let size = target.metadata().map(|m| m.len()).unwrap_or(0);
        anyhow::ensure!(size == 0, "target {} already exists and is not empty", target.display());
    }
    Ok(())
}

fn compress(args: &CompressArgs) -> Result<()> {
    anyhow::ensure!(args.source.exists(), "source dump {} does not exist", args.source.display());
    anyhow::ensure!(args.reference.exists(), "reference dump {} does not exist", args.reference.display());
    ensure_target_is_free(&args.target)?;

    if let Some(tag) = &args.delta {
        anyhow::ensure!(
            !tag.contains(char::is_whitespace),
            "delta tag {tag:?} must not contain whitespace"
        );
    }

    let opts = CompressOptions {
        pagesize: args.pagesize,
        nointra: args.nointra,
        delta_tag: args.delta.clone(),
        inner: args.inner.into(),
    };
    memscrimper::compress(&args.reference, &args.source, &args.target, &opts, &LoggingStatsSink)
        .map_err(|e| anyhow!("compressing {}: {e}", args.source.display()))
}

fn decompress(args: &DecompressArgs) -> Result<()> {
    anyhow::ensure!(args.source.exists(), "compressed file {} does not exist", args.source.display());
    ensure_target_is_free(&args.target)?;
    memscrimper::decompress(&args.source, &args.target, args.reference_dir.as_deref(), &LoggingStatsSink)
        .map(|_| ())
        .map_err(|e| anyhow!("decompressing {}: {e}", args.source.display()))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    match &args.operation {
        Operation::C(compress_args) => compress(compress_args),
        Operation::D(decompress_args) => decompress(decompress_args),
    }
}
