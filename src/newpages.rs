//! New-page table storage (spec §3 "New-page table", §4.6 new-pages
//! section, Design Notes "Dynamic field selection").
//!
//! The original keeps a runtime-typed container here (sometimes a list,
//! sometimes a dict keyed by page content) depending on the `nointra` flag.
//! This is re-architected as two statically-typed representations chosen
//! once at encode start, sharing one trait so the encoder doesn't need to
//! know which variant it holds.

use std::collections::HashMap;
use std::io::Write;

use anyhow::Result;

use crate::interval::{encode_interval_list, intervalize};
use crate::io_ext::WriteExt;
use crate::page::Page;
use crate::pagenr::PageNr;

pub trait NewPageStore {
    /// Records that `pagenr` in the target is new content `page`.
    fn classify(&mut self, pagenr: PageNr, page: Page);

    /// Emits this store's new-pages section, per spec §4.6.
    fn emit(&self, w: &mut dyn Write) -> Result<()>;

    /// Total count of new pagenrs recorded, for diagnostics.
    fn total_count(&self) -> usize;

    /// Count of distinct new page contents, for diagnostics.
    fn distinct_count(&self) -> usize;
}

/// Deduplicates new pages by content within the target (exploits duplicates
/// that are *not* present in the reference).
#[derive(Default)]
pub struct IntraStore {
    order: Vec<Page>,
    by_content: HashMap<Page, Vec<PageNr>>,
}

impl IntraStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NewPageStore for IntraStore {
    fn classify(&mut self, pagenr: PageNr, page: Page) {
        let entry = self.by_content.entry(page.clone());
        use std::collections::hash_map::Entry;
        match entry {
            Entry::Vacant(v) => {
                self.order.push(page);
                v.insert(vec![pagenr]);
            }
            Entry::Occupied(mut o) => {
                o.get_mut().push(pagenr);
            }
        }
    }

    fn emit(&self, w: &mut dyn Write) -> Result<()> {
        w.write_u32le(self.order.len() as u32)?;
        for content in &self.order {
            let pagenrs = &self.by_content[content];
            let intervals = intervalize(pagenrs);
            encode_interval_list(w, &intervals)?;
        }
        for content in &self.order {
            w.write_all(content)?;
        }
        Ok(())
    }

    fn total_count(&self) -> usize {
        self.by_content.values().map(Vec::len).sum()
    }

    fn distinct_count(&self) -> usize {
        self.order.len()
    }
}

/// Stores every new page verbatim, in target pagenr order, without
/// deduplicating duplicates found only within the target.
#[derive(Default)]
pub struct NoIntraStore {
    pagenrs: Vec<PageNr>,
    pages: Vec<Page>,
    distinct: std::collections::HashSet<Page>,
}

impl NoIntraStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NewPageStore for NoIntraStore {
    fn classify(&mut self, pagenr: PageNr, page: Page) {
        self.distinct.insert(page.clone());
        self.pagenrs.push(pagenr);
        self.pages.push(page);
    }

    fn emit(&self, w: &mut dyn Write) -> Result<()> {
        // Resolves the "empty interval lists" open question: the interval
        // codec cannot represent zero intervals, so an explicit count
        // guards the case of no new pages at all.
        w.write_u32le(self.pagenrs.len() as u32)?;
        if !self.pagenrs.is_empty() {
            let intervals = intervalize(&self.pagenrs);
            encode_interval_list(w, &intervals)?;
        }
        for page in &self.pages {
            w.write_all(page)?;
        }
        Ok(())
    }

    fn total_count(&self) -> usize {
        self.pagenrs.len()
    }

    fn distinct_count(&self) -> usize {
        self.distinct.len()
    }
}
