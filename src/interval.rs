//! Variable-length encoding of monotone page-number sets as run intervals
//! (spec §4.1).
//!
//! Each interval is packed into a 4-byte little-endian word holding `left` in
//! the low 29 bits and a 3-bit tag in the high bits: bits `[0:2]` select the
//! width of the trailing `delta = right - left` (0/1/2/4 bytes), bit `[2]` is
//! the `last` flag. The last interval of a list must set it; no earlier one
//! may.

use std::io::{Read, Write};

use anyhow::{bail, ensure, Result};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::io_ext::{ReadExt, WriteExt};
use crate::pagenr::{PageNr, PAGENR_MAX};

const LAST_FLAG: u32 = 1 << 2;
const LEFT_MASK: u32 = (1 << 29) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
enum DeltaWidth {
    Zero = 0,
    U8 = 1,
    U16 = 2,
    U32 = 3,
}

impl DeltaWidth {
    fn smallest_fitting(delta: u64) -> Self {
        if delta == 0 {
            DeltaWidth::Zero
        } else if delta < 1 << 8 {
            DeltaWidth::U8
        } else if delta < 1 << 16 {
            DeltaWidth::U16
        } else {
            DeltaWidth::U32
        }
    }

    /// `sz == 3` decodes as width 4, per spec.
    fn byte_len(self) -> usize {
        match self {
            DeltaWidth::Zero => 0,
            DeltaWidth::U8 => 1,
            DeltaWidth::U16 => 2,
            DeltaWidth::U32 => 4,
        }
    }
}

/// An inclusive `[left, right]` range of page numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub left: PageNr,
    pub right: PageNr,
}

impl Interval {
    pub fn new(left: PageNr, right: PageNr) -> Result<Self> {
        ensure!(left.as_u64() <= right.as_u64(), "interval left must be <= right");
        Ok(Self { left, right })
    }

    pub fn singleton(pagenr: PageNr) -> Self {
        Self { left: pagenr, right: pagenr }
    }

    pub fn contains(self, pagenr: PageNr) -> bool {
        self.left.as_u64() <= pagenr.as_u64() && pagenr.as_u64() <= self.right.as_u64()
    }

    pub fn iter(self) -> impl Iterator<Item = PageNr> {
        (self.left.as_u64()..=self.right.as_u64()).map(|v| PageNr::new(v).expect("bounded by construction"))
    }
}

/// Groups a strictly-increasing sequence of page numbers into maximal runs:
/// `[1, 2, 3, 5, 6, 7, 8, 9, 13] -> [[1,3], [5,9], [13,13]]`.
pub fn intervalize(pagenrs: &[PageNr]) -> Vec<Interval> {
    let mut out = Vec::new();
    let mut iter = pagenrs.iter().copied();
    let Some(first) = iter.next() else {
        return out;
    };
    let mut left = first;
    let mut right = first;
    for pagenr in iter {
        if right.as_u64() + 1 == pagenr.as_u64() {
            right = pagenr;
        } else {
            out.push(Interval { left, right });
            left = pagenr;
            right = pagenr;
        }
    }
    out.push(Interval { left, right });
    out
}

/// Encodes a *non-empty* list of disjoint, ascending intervals. The interval
/// codec has no representation for an empty list (the `last` flag lives on
/// an interval); callers that may have zero intervals must guard that case
/// themselves (see `newpages.rs`'s explicit count prefix).
pub fn encode_interval_list<W: Write>(w: &mut W, intervals: &[Interval]) -> Result<()> {
    ensure!(!intervals.is_empty(), "interval list must not be empty");
    let last_index = intervals.len() - 1;
    for (i, interval) in intervals.iter().enumerate() {
        encode_interval(w, *interval, i == last_index)?;
    }
    Ok(())
}

fn encode_interval<W: Write>(w: &mut W, interval: Interval, last: bool) -> Result<()> {
    ensure!(interval.left.as_u64() <= PAGENR_MAX, "interval left out of range");
    let delta = interval.right.as_u64() - interval.left.as_u64();
    let width = DeltaWidth::smallest_fitting(delta);
    let tag: u32 = u8::from(width) as u32 | if last { LAST_FLAG } else { 0 };
    let word = interval.left.as_u32() as u32 | (tag << 29);
    w.write_u32le(word)?;
    match width {
        DeltaWidth::Zero => {}
        DeltaWidth::U8 => w.write_u8(delta as u8)?,
        DeltaWidth::U16 => w.write_u16le(delta as u16)?,
        DeltaWidth::U32 => w.write_u32le(delta as u32)?,
    }
    Ok(())
}

/// Decodes a single interval, returning `(interval, last)`.
fn decode_interval<R: Read>(r: &mut R) -> Result<(Interval, bool)> {
    let word = r.read_u32le()?;
    let left = word & LEFT_MASK;
    let tag = word >> 29;
    let last = tag & 0b100 != 0;
    let width_raw = (tag & 0b011) as u8;
    let width = DeltaWidth::try_from_primitive(width_raw).unwrap_or(DeltaWidth::U32);
    let delta = match width.byte_len() {
        0 => 0u64,
        1 => r.read_u8()? as u64,
        2 => r.read_u16le()? as u64,
        4 => r.read_u32le()? as u64,
        n => bail!("unreachable interval delta width {n}"),
    };
    let left = PageNr::new(left as u64)?;
    let right = PageNr::new(left.as_u64() + delta)?;
    Ok((Interval { left, right }, last))
}

/// Decodes intervals until the `last` flag is seen.
pub fn decode_interval_list<R: Read>(r: &mut R) -> Result<Vec<Interval>> {
    let mut out = Vec::new();
    loop {
        let (interval, last) = decode_interval(r)?;
        out.push(interval);
        if last {
            return Ok(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    #[test]
    fn intervalize_groups_runs() {
        let pagenrs: Vec<PageNr> = [1u64, 2, 3, 5, 6, 7, 8, 9, 13]
            .into_iter()
            .map(|v| PageNr::new(v).unwrap())
            .collect();
        let intervals = intervalize(&pagenrs);
        let ranges: Vec<(u64, u64)> = intervals.iter().map(|i| (i.left.as_u64(), i.right.as_u64())).collect();
        assert_eq!(ranges, vec![(1, 3), (5, 9), (13, 13)]);
    }

    fn strictly_increasing_pagenrs() -> impl Strategy<Value = Vec<PageNr>> {
        proptest::collection::vec(0u64..(1 << 20), 0..64).prop_map(|mut values| {
            values.sort_unstable();
            values.dedup();
            values.into_iter().map(|v| PageNr::new(v).unwrap()).collect()
        })
    }

    proptest! {
        #[test]
        fn interval_list_roundtrips(pagenrs in strictly_increasing_pagenrs()) {
            prop_assume!(!pagenrs.is_empty());
            let intervals = intervalize(&pagenrs);
            let mut buf = Vec::new();
            encode_interval_list(&mut buf, &intervals).unwrap();
            let decoded = decode_interval_list(&mut Cursor::new(buf)).unwrap();
            let roundtripped: Vec<PageNr> = decoded.into_iter().flat_map(|i| i.iter()).collect();
            prop_assert_eq!(roundtripped, pagenrs);
        }
    }
}
