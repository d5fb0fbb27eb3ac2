//! Byte-level intra-page delta encoding with a bounded output size (spec
//! §4.3).
//!
//! A delta is a list of `(relative_offset, patch_bytes)` records; copying
//! each `patch_bytes` at the running absolute offset turns the reference
//! page into the target page. Adjacent patches separated by a run of at
//! most [`MERGE_GAP_MAX`] equal bytes are merged into one record, and any
//! record longer than [`SPLIT_LEN`] bytes is split into a head and a tail
//! record so that `size - 1` always fits the record's width budget.

use std::io::{Read, Write};

use anyhow::{ensure, Result};

use crate::io_ext::{ReadExt, WriteExt};

/// Gaps of at most this many equal bytes between two differing runs are
/// absorbed into the earlier patch rather than starting a new record.
const MERGE_GAP_MAX: usize = 2;

/// Patches longer than this are split into a head and a `SPLIT_LEN`-byte
/// tail so each record's length still fits the encoding.
const SPLIT_LEN: usize = 2048;

/// Short-form records are selected when `rel <= 127` and `size <= 128`: the
/// first emitted byte holds `size - 1` and its top bit must stay clear for
/// the decoder to recognize the short form, which bounds `size - 1 < 128`.
pub const DELTA_SHORT_SIZE_MAX: usize = 128;
pub const DELTA_SHORT_REL_MAX: u32 = 127;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaRecord {
    /// Offset of this record's first byte, relative to the end of the
    /// previous record (or to page start, for the first record).
    pub rel: u32,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Delta {
    pub records: Vec<DeltaRecord>,
}

/// Finds the `(rel, bytes)` runs that turn `page_ref` into `page_new`,
/// merging small gaps and splitting oversized runs. Does not check the
/// encoded-size budget; that is `create_diff`'s job.
fn diff(page_ref: &[u8], page_new: &[u8]) -> Vec<(u32, Vec<u8>)> {
    let mut raw: Vec<(usize, Vec<u8>)> = Vec::new();
    let mut gap_len = 0usize;
    let mut prev_end: Option<usize> = None;

    for i in 0..page_ref.len() {
        if page_ref[i] == page_new[i] {
            if !raw.is_empty() {
                gap_len += 1;
            }
            continue;
        }
        if !raw.is_empty() && gap_len <= MERGE_GAP_MAX {
            let (_, bytes) = raw.last_mut().unwrap();
            for j in (i - gap_len)..i {
                bytes.push(page_new[j]);
            }
            bytes.push(page_new[i]);
        } else {
            let start = i;
            let rel = match prev_end {
                None => start,
                Some(end) => start - end,
            };
            raw.push((rel, vec![page_new[i]]));
        }
        gap_len = 0;
        prev_end = Some(i + 1);
    }

    let mut fixed = Vec::with_capacity(raw.len());
    for (rel, bytes) in raw {
        if bytes.len() > SPLIT_LEN {
            let overhead = bytes.len() - SPLIT_LEN;
            let (head, tail) = bytes.split_at(overhead);
            fixed.push((rel as u32, head.to_vec()));
            fixed.push((0u32, tail.to_vec()));
        } else {
            fixed.push((rel as u32, bytes));
        }
    }
    fixed
}

fn encode_record<W: Write>(w: &mut W, rel: u32, size: usize) -> Result<()> {
    let sz = (size - 1) as u32;
    if rel < DELTA_SHORT_REL_MAX + 1 && sz < 128 {
        w.write_u8(sz as u8)?;
        w.write_u8(rel as u8)?;
    } else {
        let value = (sz << 12) | rel;
        let a = ((value >> 16) & 0xFF) as u8 | 0x80;
        let b = ((value >> 8) & 0xFF) as u8;
        let c = (value & 0xFF) as u8;
        w.write_u8(a)?;
        w.write_u8(b)?;
        w.write_u8(c)?;
    }
    Ok(())
}

fn decode_record<R: Read>(r: &mut R) -> Result<(u32, usize)> {
    let a = r.read_u8()?;
    let b = r.read_u8()?;
    if a & 0x80 != 0 {
        let c = r.read_u8()?;
        let value = (((a & 0x7F) as u32) << 16) | ((b as u32) << 8) | (c as u32);
        let rel = value & 0xFFF;
        let sz = (value >> 12) & 0xFFF;
        Ok((rel, sz as usize + 1))
    } else {
        Ok((b as u32, a as usize + 1))
    }
}

/// Builds a delta from `page_ref` to `page_new` and encodes it, returning
/// `None` if the encoded length would reach `pagesize - 2` bytes or more
/// (the budget that guarantees a delta is never larger than the page it
/// replaces). Equal pages encode to an empty record list.
pub fn create_diff(page_ref: &[u8], page_new: &[u8]) -> Option<Delta> {
    assert_eq!(page_ref.len(), page_new.len());
    let records = diff(page_ref, page_new)
        .into_iter()
        .map(|(rel, bytes)| DeltaRecord { rel, bytes })
        .collect::<Vec<_>>();
    let delta = Delta { records };
    let encoded_len = encoded_len(&delta);
    if encoded_len + 2 >= page_ref.len() {
        None
    } else {
        Some(delta)
    }
}

fn encoded_len(delta: &Delta) -> usize {
    let mut len = 2; // u16 count
    for record in &delta.records {
        len += if record.rel <= DELTA_SHORT_REL_MAX && record.bytes.len() <= 128 { 2 } else { 3 };
        len += record.bytes.len();
    }
    len
}

/// Writes a delta block: `u16` record count, then each record back-to-back.
pub fn encode_delta<W: Write>(w: &mut W, delta: &Delta) -> Result<()> {
    w.write_u16le(delta.records.len() as u16)?;
    for record in &delta.records {
        encode_record(w, record.rel, record.bytes.len())?;
        w.write_all(&record.bytes)?;
    }
    Ok(())
}

/// Reads a delta block.
pub fn decode_delta<R: Read>(r: &mut R) -> Result<Delta> {
    let count = r.read_u16le()?;
    let mut records = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (rel, size) = decode_record(r)?;
        let mut bytes = vec![0u8; size];
        r.read_exact(&mut bytes)?;
        records.push(DeltaRecord { rel, bytes });
    }
    Ok(Delta { records })
}

/// Applies `delta` to `page_ref`, producing a page of the same length.
pub fn apply_delta(page_ref: &[u8], delta: &Delta) -> Result<Vec<u8>> {
    let mut out = page_ref.to_vec();
    let mut offset = 0usize;
    for record in &delta.records {
        offset += record.rel as usize;
        let end = offset + record.bytes.len();
        ensure!(end <= out.len(), "delta record overruns page bounds");
        out[offset..end].copy_from_slice(&record.bytes);
        offset = end;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    #[test]
    fn single_byte_change_encodes_short_form() {
        // R="AAAA", T="AAAB": one record, rel=3 (offset of the 'B'), one
        // byte of patch data. Encoded as u16 count=1, short-form header
        // (size-1=0x00, rel=0x03), then the patch byte 0x42.
        let delta = Delta { records: vec![DeltaRecord { rel: 3, bytes: vec![0x42] }] };
        let mut buf = Vec::new();
        encode_delta(&mut buf, &delta).unwrap();
        assert_eq!(buf, vec![0x01, 0x00, 0x00, 0x03, 0x42]);
        let decoded = decode_delta(&mut Cursor::new(buf)).unwrap();
        assert_eq!(decoded, delta);
    }

    #[test]
    fn adjacent_differences_merge_across_small_gaps() {
        let reference = b"AAAAAAAAAA";
        let mut target = reference.to_vec();
        target[2] = b'X';
        target[4] = b'Y'; // gap of one equal byte at index 3, within MERGE_GAP_MAX
        let delta = create_diff(reference, &target).unwrap();
        assert_eq!(delta.records.len(), 1);
        assert_eq!(delta.records[0].bytes, b"XAY");
    }

    #[test]
    fn oversize_patch_is_split() {
        // A single run longer than SPLIT_LEN bytes at the start of an
        // otherwise-unchanged page, large enough to need splitting but
        // still small enough to fit the delta's size budget.
        let changed_run = SPLIT_LEN + 52;
        let reference = vec![0u8; changed_run + 900];
        let mut target = reference.clone();
        target[..changed_run].fill(1);
        let delta = create_diff(&reference, &target).unwrap();
        assert_eq!(delta.records.len(), 2);
        assert_eq!(delta.records[0].bytes.len() + delta.records[1].bytes.len(), changed_run);
        let reconstructed = apply_delta(&reference, &delta).unwrap();
        assert_eq!(reconstructed, target);
    }

    #[test]
    fn oversize_delta_falls_back_to_none() {
        let reference = vec![0u8; 8];
        let target = vec![1u8; 8]; // every byte differs on an 8-byte page
        assert!(create_diff(&reference, &target).is_none());
    }

    #[test]
    fn apply_delta_reconstructs_target() {
        let reference = b"AAAAAAAA".to_vec();
        let mut target = reference.clone();
        target[5] = b'Z';
        let delta = create_diff(&reference, &target).unwrap();
        let reconstructed = apply_delta(&reference, &delta).unwrap();
        assert_eq!(reconstructed, target);
    }

    proptest! {
        #[test]
        fn diff_and_apply_roundtrip(
            reference in proptest::collection::vec(any::<u8>(), 64),
            edits in proptest::collection::vec((0usize..64, any::<u8>()), 0..10),
        ) {
            let mut target = reference.clone();
            for (i, b) in edits {
                target[i] = b;
            }
            if let Some(delta) = create_diff(&reference, &target) {
                let reconstructed = apply_delta(&reference, &delta).unwrap();
                prop_assert_eq!(reconstructed, target);
            }
        }
    }
}
