//! End-to-end scenarios exercising the full classify -> encode -> decode
//! pipeline against concrete reference/target pairs.

use std::path::PathBuf;

use memscrimper::classifier::{classify, ClassifyOptions};
use memscrimper::decoder::decompress;
use memscrimper::encoder::{compress, CompressOptions};
use memscrimper::stats::NullStatsSink;
use memscrimper::{InnerCodec, Page};

fn page(s: &str) -> Page {
    Page::from(s.as_bytes().to_vec())
}

fn roundtrip(reference: &[Page], target: &[Page], opts: CompressOptions) -> Vec<Page> {
    let mut buf = Vec::new();
    compress(&mut buf, &PathBuf::from("ref.dump"), reference, target, &opts, &NullStatsSink).unwrap();
    let mut reader = std::io::BufReader::new(std::io::Cursor::new(buf));
    let mut out = Vec::new();
    decompress(&mut reader, &mut out, reference, &NullStatsSink).unwrap();
    out.chunks(opts.pagesize as usize).map(Page::from).collect()
}

#[test]
fn scenario_1_identical_dumps_produce_no_dedup_delta_or_new_pages() {
    let reference = vec![page("AAAAAAAA"), page("BBBBBBBB")];
    let target = reference.clone();
    let result = classify(&reference, &target, ClassifyOptions::default()).unwrap();
    assert_eq!(result.stats.same_total, 2);
    assert_eq!(result.stats.dedup_total, 0);
    assert_eq!(result.stats.new_total, 0);
    assert!(result.dedup.is_empty());

    let opts = CompressOptions { pagesize: 8, nointra: false, delta_tag: None, inner: InnerCodec::None };
    assert_eq!(roundtrip(&reference, &target, opts), target);
}

#[test]
fn scenario_1_nointra_with_zero_new_pages_still_roundtrips() {
    let reference = vec![page("AAAAAAAA"), page("BBBBBBBB")];
    let target = reference.clone();
    let opts = CompressOptions { pagesize: 8, nointra: true, delta_tag: None, inner: InnerCodec::None };
    assert_eq!(roundtrip(&reference, &target, opts), target);
}

#[test]
fn scenario_2_dedup_fills_from_two_different_reference_pages() {
    let reference = vec![page("0000"), page("1111"), page("2222")];
    let target = vec![page("0000"), page("2222"), page("1111")];
    let result = classify(&reference, &target, ClassifyOptions::default()).unwrap();

    assert_eq!(result.stats.same_total, 1); // pagenr 0
    assert_eq!(result.dedup.len(), 2); // reference pagenrs 1 and 2 each fill one target
    assert_eq!(result.dedup[&memscrimper::PageNr::new(2).unwrap()], vec![memscrimper::PageNr::new(1).unwrap()]);
    assert_eq!(result.dedup[&memscrimper::PageNr::new(1).unwrap()], vec![memscrimper::PageNr::new(2).unwrap()]);

    let opts = CompressOptions { pagesize: 4, nointra: false, delta_tag: None, inner: InnerCodec::None };
    assert_eq!(roundtrip(&reference, &target, opts), target);
}

#[test]
fn scenario_4_unrecoverable_pages_all_become_new() {
    let pagesize = 4096usize;
    let mut reference_bytes = vec![0u8; pagesize];
    for (i, b) in reference_bytes.iter_mut().enumerate() {
        *b = (i % 256) as u8;
    }
    let mut target_bytes = reference_bytes.clone();
    // Every byte differs, so even after merging into the fewest possible
    // records and splitting at SPLIT_LEN, the encoded delta is larger than
    // the page itself and the budget check rejects it.
    for b in target_bytes.iter_mut() {
        *b ^= 0xFF;
    }
    let reference = vec![Page::from(reference_bytes)];
    let target = vec![Page::from(target_bytes)];

    let opts = ClassifyOptions { nointra: false, delta_enabled: true };
    let result = classify(&reference, &target, opts).unwrap();
    assert_eq!(result.stats.new_total, 1);
    assert_eq!(result.stats.dedup_total, 0);
    assert_eq!(result.stats.delta_count, Some(0));

    let compress_opts =
        CompressOptions { pagesize: pagesize as u32, nointra: false, delta_tag: Some(String::new()), inner: InnerCodec::None };
    assert_eq!(roundtrip(&reference, &target, compress_opts), target);
}

#[test]
fn scenario_5_duplicate_elsewhere_beats_same_offset_tie_break() {
    let reference = vec![page("XXXX"), page("YYYY")];
    let target = vec![page("YYYY"), page("YYYY")];
    let result = classify(&reference, &target, ClassifyOptions::default()).unwrap();

    assert_eq!(result.stats.same_total, 1); // pagenr 1 matches reference at the same offset
    assert_eq!(result.dedup.len(), 1);
    assert_eq!(result.dedup[&memscrimper::PageNr::new(1).unwrap()], vec![memscrimper::PageNr::new(0).unwrap()]);
    assert_eq!(result.stats.new_total, 0);
    assert_eq!(result.stats.delta_count, None);

    let opts = CompressOptions { pagesize: 4, nointra: false, delta_tag: None, inner: InnerCodec::None };
    assert_eq!(roundtrip(&reference, &target, opts), target);
}

#[test]
fn full_matrix_roundtrips_across_all_flag_combinations() {
    let reference = vec![page("AAAA"), page("BBBB"), page("CCCC"), page("DDDD")];
    let mut changed = b"DDDD".to_vec();
    changed[1] = b'X';
    let target = vec![page("AAAA"), page("CCCC"), Page::from(changed), page("EEEE")];

    for nointra in [false, true] {
        for delta_tag in [None, Some(String::new())] {
            for inner in [InnerCodec::None, InnerCodec::Gzip, InnerCodec::Bzip2, InnerCodec::Xz] {
                let opts = CompressOptions { pagesize: 4, nointra, delta_tag: delta_tag.clone(), inner };
                let result = roundtrip(&reference, &target, opts);
                assert_eq!(result, target, "roundtrip failed for nointra={nointra} delta={delta_tag:?} inner={inner:?}");
            }
        }
    }
}
