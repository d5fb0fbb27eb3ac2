//! Reconstructs a target dump from a container and its reference (spec
//! §4.7).
//!
//! Reads the three section kinds into disjoint per-pagenr tables, checks
//! for overlaps, then walks every page number of the target writing: a
//! dedup fill, else a delta, else a stored new page, else the reference
//! page verbatim at the same offset.

use std::collections::HashMap;
use std::io::{BufRead, Read, Write};
use std::path::PathBuf;

use anyhow::{ensure, Result};

use crate::delta::{apply_delta, decode_delta, Delta};
use crate::header::Header;
use crate::interval::decode_interval_list;
use crate::io_ext::{BufReadExt, ReadExt};
use crate::page::Page;
use crate::pagenr::PageNr;
use crate::pagenr_list::decode_pagenr_list;
use crate::stats::{DecompressionStats, StatsSink};

struct Sections {
    reference_path: PathBuf,
    fills: HashMap<PageNr, PageNr>,
    diffs: HashMap<PageNr, Delta>,
    new_pages: HashMap<PageNr, Page>,
}

fn read_dedup_section<R: Read>(r: &mut R) -> Result<HashMap<PageNr, PageNr>> {
    let ref_pagenrs = decode_pagenr_list(r)?;
    let mut fills = HashMap::new();
    for ref_pagenr in ref_pagenrs {
        let intervals = decode_interval_list(r)?;
        for interval in intervals {
            for target_pagenr in interval.iter() {
                fills.insert(target_pagenr, ref_pagenr);
            }
        }
    }
    Ok(fills)
}

fn read_delta_section<R: Read>(r: &mut R) -> Result<HashMap<PageNr, Delta>> {
    let pagenrs = decode_pagenr_list(r)?;
    let mut diffs = HashMap::with_capacity(pagenrs.len());
    for pagenr in pagenrs {
        let delta = decode_delta(r)?;
        diffs.insert(pagenr, delta);
    }
    Ok(diffs)
}

fn read_new_pages_section<R: Read>(r: &mut R, pagesize: u32, nointra: bool) -> Result<HashMap<PageNr, Page>> {
    let mut new_pages = HashMap::new();
    if nointra {
        let count = r.read_u32le()? as usize;
        if count == 0 {
            return Ok(new_pages);
        }
        let intervals = decode_interval_list(r)?;
        let mut pagenrs = Vec::with_capacity(count);
        for interval in intervals {
            pagenrs.extend(interval.iter());
        }
        ensure!(pagenrs.len() == count, "new-pages section pagenr count does not match its interval list");
        for pagenr in pagenrs {
            let mut bytes = vec![0u8; pagesize as usize];
            r.read_exact(&mut bytes)?;
            new_pages.insert(pagenr, Page::from(bytes));
        }
    } else {
        let distinct_count = r.read_u32le()? as usize;
        let mut pagenr_groups = Vec::with_capacity(distinct_count);
        for _ in 0..distinct_count {
            let intervals = decode_interval_list(r)?;
            let mut pagenrs = Vec::new();
            for interval in intervals {
                pagenrs.extend(interval.iter());
            }
            pagenr_groups.push(pagenrs);
        }
        for pagenrs in pagenr_groups {
            let mut bytes = vec![0u8; pagesize as usize];
            r.read_exact(&mut bytes)?;
            let page = Page::from(bytes);
            for pagenr in pagenrs {
                new_pages.insert(pagenr, page.clone());
            }
        }
    }
    Ok(new_pages)
}

fn read_sections<R: BufRead>(r: &mut R, header: &Header) -> Result<Sections> {
    let reference_path_bytes = r.read_cstring()?;
    let reference_path = PathBuf::from(
        String::from_utf8(reference_path_bytes)
            .map_err(|e| anyhow::anyhow!("reference path is not valid UTF-8: {e}"))?,
    );

    let fills = read_dedup_section(r)?;
    let diffs = if header.method.delta_enabled() { read_delta_section(r)? } else { HashMap::new() };
    let new_pages = read_new_pages_section(r, header.pagesize, header.method.nointra)?;

    Ok(Sections { reference_path, fills, diffs, new_pages })
}

/// Confirms the three tables assign at most one origin per target pagenr,
/// per spec §4.7's disjointness requirement.
fn check_disjoint(sections: &Sections) -> Result<()> {
    for pagenr in sections.fills.keys() {
        ensure!(!sections.diffs.contains_key(pagenr), "pagenr {pagenr} is both a dedup fill and a delta target");
        ensure!(!sections.new_pages.contains_key(pagenr), "pagenr {pagenr} is both a dedup fill and a new page");
    }
    for pagenr in sections.diffs.keys() {
        ensure!(!sections.new_pages.contains_key(pagenr), "pagenr {pagenr} is both a delta target and a new page");
    }
    Ok(())
}

/// Reads just the header and the stored reference path, for callers that
/// need to resolve and load the reference dump before running the full
/// [`decompress`] pass.
pub fn peek_reference_path<R: BufRead>(input: &mut R) -> Result<(Header, PathBuf)> {
    let header = Header::read(input)?;
    let mut inner_reader = header.method.inner.wrap_reader(Box::new(&mut *input) as Box<dyn Read>);
    let mut inner = std::io::BufReader::new(&mut *inner_reader);
    let reference_path_bytes = inner.read_cstring()?;
    let reference_path = PathBuf::from(
        String::from_utf8(reference_path_bytes)
            .map_err(|e| anyhow::anyhow!("reference path is not valid UTF-8: {e}"))?,
    );
    Ok((header, reference_path))
}

/// Reads a container from `input` and reconstructs the target dump into
/// `out`, using `load_reference` to fetch the reference page at a given
/// index (so callers can supply the reference path resolved however they
/// like relative to the container's stored path).
pub fn decompress<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    reference: &[Page],
    sink: &dyn StatsSink,
) -> Result<PathBuf> {
    let header = Header::read(input)?;
    ensure!(
        header.uncompressed_size % header.pagesize as u64 == 0,
        "uncompressed_size is not a multiple of pagesize"
    );
    let total_pages = (header.uncompressed_size / header.pagesize as u64) as usize;

    let mut inner_reader = header.method.inner.wrap_reader(Box::new(&mut *input) as Box<dyn Read>);
    let mut inner = std::io::BufReader::new(&mut *inner_reader);
    let sections = read_sections(&mut inner, &header)?;
    check_disjoint(&sections)?;

    ensure!(
        reference.len() == total_pages,
        "reference has {} pages but the container expects {total_pages}",
        reference.len()
    );

    let mut stats = DecompressionStats { total_pages: total_pages as u64, ..Default::default() };

    for i in 0..total_pages {
        let pagenr = PageNr::new(i as u64)?;
        if let Some(page) = sections.new_pages.get(&pagenr) {
            out.write_all(page)?;
            stats.new_pages += 1;
        } else if let Some(delta) = sections.diffs.get(&pagenr) {
            let reconstructed = apply_delta(&reference[i], delta)?;
            out.write_all(&reconstructed)?;
            stats.diffs += 1;
        } else if let Some(ref_pagenr) = sections.fills.get(&pagenr) {
            out.write_all(&reference[ref_pagenr.as_usize()])?;
            stats.fills += 1;
        } else {
            out.write_all(&reference[i])?;
            stats.same_offset += 1;
        }
    }

    sink.decompression(&stats);
    Ok(sections.reference_path)
}
