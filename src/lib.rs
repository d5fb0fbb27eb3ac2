//! Inter-dump deduplication and byte-level delta compression for
//! fixed-page virtual-machine memory snapshots.
//!
//! A dump is split into `pagesize`-byte pages and compressed against a
//! reference dump of the same page count: pages identical to the reference
//! at the same offset cost nothing, pages found anywhere else in the
//! reference are recorded as a fill, pages close enough to a reference page
//! get a byte-level delta, and everything left over is stored new (itself
//! deduplicated against other new pages unless `nointra` is set). See
//! [`compress`] and [`decompress`] for the two directions.

pub mod classifier;
pub mod codec;
pub mod decoder;
pub mod delta;
pub mod encoder;
pub mod header;
pub mod interval;
pub(crate) mod io_ext;
pub mod method;
pub mod newpages;
pub mod page;
pub mod pagenr;
pub mod pagenr_list;
pub mod stats;

pub use classifier::CompressionStats;
pub use codec::InnerCodec;
pub use encoder::CompressOptions;
pub use header::Header;
pub use method::MethodName;
pub use page::{Page, PAGESIZE_DEFAULT};
pub use pagenr::PageNr;
pub use stats::{DecompressionStats, LoggingStatsSink, NullStatsSink, StatsSink};

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Result};
use tempfile::NamedTempFile;

use page::read_all_pages;

fn staging_dir(output_path: &Path) -> &Path {
    output_path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."))
}

/// Compresses `target_path` against `reference_path`, writing the result to
/// `output_path`. The container stores `reference_path` so [`decompress`]
/// knows which dump to reapply it against. `output_path` is staged as a
/// temp file in the same directory and renamed into place only once the
/// whole container has been written successfully.
pub fn compress(
    reference_path: &Path,
    target_path: &Path,
    output_path: &Path,
    opts: &CompressOptions,
    sink: &dyn StatsSink,
) -> Result<()> {
    let reference = read_all_pages(reference_path, opts.pagesize)?;
    let target = read_all_pages(target_path, opts.pagesize)?;
    ensure!(
        reference.len() == target.len(),
        "{} has {} pages but {} has {}; MemScrimper requires equal page counts",
        reference_path.display(),
        reference.len(),
        target_path.display(),
        target.len()
    );

    let mut tmp = NamedTempFile::new_in(staging_dir(output_path))?;
    encoder::compress(&mut tmp, reference_path, &reference, &target, opts, sink)?;
    tmp.persist(output_path)?;
    Ok(())
}

/// Decompresses `source_path` into `output_path`. The reference dump it
/// names is resolved relative to `reference_dir` when given (matching just
/// the file name), or read as stored otherwise. Returns the reference path
/// actually used. `output_path` is staged the same way [`compress`] stages
/// its output.
pub fn decompress(
    source_path: &Path,
    output_path: &Path,
    reference_dir: Option<&Path>,
    sink: &dyn StatsSink,
) -> Result<PathBuf> {
    let (header, stored_reference_path) = {
        let mut reader = BufReader::new(File::open(source_path)?);
        decoder::peek_reference_path(&mut reader)?
    };
    let reference_path = match reference_dir {
        Some(dir) => dir.join(stored_reference_path.file_name().unwrap_or(stored_reference_path.as_os_str())),
        None => stored_reference_path,
    };
    let reference = read_all_pages(&reference_path, header.pagesize)?;

    let mut tmp = NamedTempFile::new_in(staging_dir(output_path))?;
    let mut reader = BufReader::new(File::open(source_path)?);
    let used_reference_path = decoder::decompress(&mut reader, &mut tmp, &reference, sink)?;
    tmp.persist(output_path)?;
    Ok(used_reference_path)
}
