//! Delta-encoded list of page numbers (spec §4.2).
//!
//! A `u32` count is followed by one entry per page number: the first entry
//! is its absolute value, later entries are the gap since the previous entry
//! minus one (so adjacent page numbers cost a single byte). Values under
//! 128 are packed into one byte with the high bit set as a marker; larger
//! values spill into four big-endian bytes (whose high bit is guaranteed
//! clear since such a value is always >= 128).

use std::io::{Read, Write};

use anyhow::Result;

use crate::io_ext::{ReadExt, WriteExt};
use crate::pagenr::PageNr;

const SHORT_MARKER: u8 = 0x80;
const SHORT_MAX: u32 = 0x80; // values < 128 use the short form

pub fn encode_pagenr_list<W: Write>(w: &mut W, pagenrs: &[PageNr]) -> Result<()> {
    w.write_u32le(pagenrs.len() as u32)?;
    let mut prev: Option<u64> = None;
    for &pagenr in pagenrs {
        let value = match prev {
            None => pagenr.as_u64(),
            Some(p) => pagenr.as_u64() - p - 1,
        };
        encode_entry(w, value as u32)?;
        prev = Some(pagenr.as_u64());
    }
    Ok(())
}

fn encode_entry<W: Write>(w: &mut W, value: u32) -> Result<()> {
    if value < SHORT_MAX {
        w.write_u8(value as u8 | SHORT_MARKER)
    } else {
        w.write_u32be(value)
    }
}

fn decode_entry<R: Read>(r: &mut R) -> Result<u32> {
    let first = r.read_u8()?;
    if first & SHORT_MARKER != 0 {
        Ok((first & !SHORT_MARKER) as u32)
    } else {
        let b = r.read_u8()? as u32;
        let c = r.read_u8()? as u32;
        let d = r.read_u8()? as u32;
        Ok(((first as u32) << 24) | (b << 16) | (c << 8) | d)
    }
}

pub fn decode_pagenr_list<R: Read>(r: &mut R) -> Result<Vec<PageNr>> {
    let count = r.read_u32le()?;
    let mut out = Vec::with_capacity(count as usize);
    let mut prev: Option<u64> = None;
    for _ in 0..count {
        let raw = decode_entry(r)? as u64;
        let value = match prev {
            None => raw,
            Some(p) => p + raw + 1,
        };
        out.push(PageNr::new(value)?);
        prev = Some(value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    #[test]
    fn empty_list_roundtrips() {
        let mut buf = Vec::new();
        encode_pagenr_list(&mut buf, &[]).unwrap();
        let decoded = decode_pagenr_list(&mut Cursor::new(buf)).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn short_and_long_forms_roundtrip() {
        let pagenrs = vec![PageNr::new(0).unwrap(), PageNr::new(1).unwrap(), PageNr::new(500).unwrap()];
        let mut buf = Vec::new();
        encode_pagenr_list(&mut buf, &pagenrs).unwrap();
        let decoded = decode_pagenr_list(&mut Cursor::new(buf)).unwrap();
        assert_eq!(decoded, pagenrs);
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
        fn pagenr_list_roundtrips(pagenrs in strictly_increasing_pagenrs()) {
            let mut buf = Vec::new();
            encode_pagenr_list(&mut buf, &pagenrs).unwrap();
            let decoded = decode_pagenr_list(&mut Cursor::new(buf)).unwrap();
            prop_assert_eq!(decoded, pagenrs);
        }
    }
}
