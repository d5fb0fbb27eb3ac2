//! Page numbers: zero-based offsets of a page within its dump.

use std::fmt;

use anyhow::{ensure, Result};

/// Pages are bounded so an [`Interval`](crate::interval::Interval) can pack a
/// `left` value into 29 bits alongside a 3-bit tag.
pub const PAGENR_MAX: u64 = (1 << 29) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageNr(u32);

impl PageNr {
    pub fn new(value: u64) -> Result<Self> {
        ensure!(
            value <= PAGENR_MAX,
            "page number {value} exceeds the maximum of {PAGENR_MAX}"
        );
        Ok(Self(value as u32))
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn as_u64(self) -> u64 {
        self.0 as u64
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PageNr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<usize> for PageNr {
    type Error = anyhow::Error;

    fn try_from(value: usize) -> Result<Self> {
        Self::new(value as u64)
    }
}
