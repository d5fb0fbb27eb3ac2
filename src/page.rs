//! Fixed-length pages and the lazy page reader (spec §3, "Page reader" in
//! §2's component table).

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use anyhow::{ensure, Result};

pub const PAGESIZE_DEFAULT: u32 = 4096;

/// A fixed-length, reference-counted page. Cheap to clone and to use as a
/// hash map key, since the classifier and new-page tables both need to
/// index pages by content without holding two copies of the bytes.
pub type Page = Arc<[u8]>;

/// Splits a file into `pagesize`-byte pages, yielding them lazily. The file
/// length must be an exact multiple of `pagesize`.
pub struct PageReader<R> {
    inner: R,
    pagesize: usize,
}

impl<R: Read> PageReader<R> {
    pub fn new(inner: R, pagesize: u32) -> Self {
        Self { inner, pagesize: pagesize as usize }
    }
}

impl<R: Read> Iterator for PageReader<R> {
    type Item = Result<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buf = vec![0u8; self.pagesize];
        match self.inner.read(&mut buf) {
            Ok(0) => None,
            Ok(n) if n == self.pagesize => Some(Ok(Page::from(buf))),
            Ok(n) => {
                // A short, non-empty read means the file length was not a
                // multiple of pagesize.
                let _ = n;
                Some(Err(anyhow::anyhow!(
                    "dump length is not a multiple of the page size ({})",
                    self.pagesize
                )))
            }
            Err(e) => Some(Err(e.into())),
        }
    }
}

/// Reads every page of `path` into memory, validating the file length and
/// the page-number bound (spec §3's `2^29-1` limit).
pub fn read_all_pages(path: &Path, pagesize: u32) -> Result<Vec<Page>> {
    let file = File::open(path)?;
    let len = file.metadata()?.len();
    ensure!(
        len % pagesize as u64 == 0,
        "{} is {len} bytes, not a multiple of the page size ({pagesize})",
        path.display()
    );
    let pages: Vec<Page> = PageReader::new(BufReader::new(file), pagesize).collect::<Result<_>>()?;
    ensure!(
        pages.len() as u64 <= crate::pagenr::PAGENR_MAX + 1,
        "dump has more pages than the {} page-number limit allows",
        crate::pagenr::PAGENR_MAX
    );
    Ok(pages)
}
