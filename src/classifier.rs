//! Partitions target pages into same-offset / duplicate-elsewhere / delta /
//! new, against a reference dump (spec §4.5).
//!
//! Tie-breaking is strict and in this order: a page already at the matching
//! offset is always same-offset; failing that, a page present anywhere in
//! the reference is always duplicate-elsewhere (never delta or new, even if
//! a smaller delta encoding would exist); failing that, a delta is tried (if
//! enabled) before falling back to new.

use std::collections::HashMap;

use anyhow::{ensure, Result};

use crate::delta::{create_diff, Delta};
use crate::newpages::{IntraStore, NewPageStore, NoIntraStore};
use crate::page::Page;
use crate::pagenr::PageNr;

#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifyOptions {
    pub nointra: bool,
    pub delta_enabled: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CompressionStats {
    pub same_total: u64,
    pub same_distinct: u64,
    pub dedup_total: u64,
    pub dedup_distinct: u64,
    pub delta_count: Option<u64>,
    pub delta_distinct: Option<u64>,
    pub new_total: u64,
    pub new_distinct: u64,
    pub total_pages: u64,
}

pub struct ClassifyResult {
    /// Reference pagenr -> target pagenrs it fills, in ascending target
    /// order. Not yet ordered by first-appearance-in-reference; the
    /// encoder imposes that order when it walks the reference sequence.
    pub dedup: HashMap<PageNr, Vec<PageNr>>,
    /// Target pagenr -> delta, in ascending target-pagenr order.
    pub delta: Option<Vec<(PageNr, Delta)>>,
    pub new_pages: Box<dyn NewPageStore>,
    pub stats: CompressionStats,
}

/// Builds a lookup from reference page content to its first occurrence
/// index (spec §4.5 "Precompute").
fn first_occurrences(reference: &[Page]) -> HashMap<Page, PageNr> {
    let mut map = HashMap::with_capacity(reference.len());
    for (i, page) in reference.iter().enumerate() {
        map.entry(page.clone())
            .or_insert_with(|| PageNr::new(i as u64).expect("bounded by read_all_pages"));
    }
    map
}

pub fn classify(reference: &[Page], target: &[Page], opts: ClassifyOptions) -> Result<ClassifyResult> {
    ensure!(
        reference.len() == target.len(),
        "reference has {} pages but target has {}; MemScrimper requires equal page counts",
        reference.len(),
        target.len()
    );

    let ref_first = first_occurrences(reference);

    let mut dedup: HashMap<PageNr, Vec<PageNr>> = HashMap::new();
    let mut delta: Option<Vec<(PageNr, Delta)>> = opts.delta_enabled.then(Vec::new);
    let mut new_pages: Box<dyn NewPageStore> =
        if opts.nointra { Box::new(NoIntraStore::new()) } else { Box::new(IntraStore::new()) };

    let mut same_total = 0u64;
    let mut same_distinct = std::collections::HashSet::new();
    let mut dedup_distinct = std::collections::HashSet::new();
    let mut diff_distinct = std::collections::HashSet::new();

    for (i, (ref_page, tgt_page)) in reference.iter().zip(target.iter()).enumerate() {
        let pagenr = PageNr::new(i as u64)?;

        if ref_page == tgt_page {
            same_total += 1;
            same_distinct.insert(tgt_page.clone());
            continue;
        }

        if let Some(&ref_pagenr) = ref_first.get(tgt_page) {
            dedup.entry(ref_pagenr).or_default().push(pagenr);
            dedup_distinct.insert(tgt_page.clone());
            continue;
        }

        if opts.delta_enabled {
            if let Some(d) = create_diff(ref_page, tgt_page) {
                diff_distinct.insert(tgt_page.clone());
                delta.as_mut().unwrap().push((pagenr, d));
                continue;
            }
        }

        new_pages.classify(pagenr, tgt_page.clone());
    }

    let stats = CompressionStats {
        same_total,
        same_distinct: same_distinct.len() as u64,
        dedup_total: dedup.values().map(|v| v.len() as u64).sum(),
        dedup_distinct: dedup_distinct.len() as u64,
        delta_count: delta.as_ref().map(|d| d.len() as u64),
        delta_distinct: delta.as_ref().map(|_| diff_distinct.len() as u64),
        new_total: new_pages.total_count() as u64,
        new_distinct: new_pages.distinct_count() as u64,
        total_pages: target.len() as u64,
    };

    Ok(ClassifyResult { dedup, delta, new_pages, stats })
}
