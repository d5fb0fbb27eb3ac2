//! Assembles a container from a classified reference/target pair (spec
//! §4.6).
//!
//! Section order: reference path, dedup section, delta section (if
//! enabled), new-pages section. Everything is written straight through the
//! outer codec writer; there is no intermediate inner-payload buffer (spec
//! §5's Design Notes "Temporary staging" resolution).

use std::io::Write;
use std::path::Path;

use anyhow::Result;

use crate::classifier::{classify, ClassifyOptions, ClassifyResult};
use crate::codec::InnerCodec;
use crate::delta::encode_delta;
use crate::header::Header;
use crate::interval::{encode_interval_list, intervalize};
use crate::io_ext::WriteExt;
use crate::method::MethodName;
use crate::page::Page;
use crate::pagenr_list::encode_pagenr_list;
use crate::stats::StatsSink;

/// Orders the dedup table's reference pagenrs by their first appearance in
/// `reference`, per spec §4.6's dedup-section ordering rule.
fn dedup_emission_order(
    reference: &[Page],
    dedup: &std::collections::HashMap<crate::pagenr::PageNr, Vec<crate::pagenr::PageNr>>,
) -> Vec<crate::pagenr::PageNr> {
    let mut seen = std::collections::HashSet::new();
    let mut order = Vec::with_capacity(dedup.len());
    for (i, _) in reference.iter().enumerate() {
        let pagenr = crate::pagenr::PageNr::new(i as u64).expect("bounded by read_all_pages");
        if dedup.contains_key(&pagenr) && seen.insert(pagenr) {
            order.push(pagenr);
        }
    }
    order
}

fn write_dedup_section<W: Write>(w: &mut W, reference: &[Page], result: &ClassifyResult) -> Result<()> {
    let order = dedup_emission_order(reference, &result.dedup);
    encode_pagenr_list(w, &order)?;
    for ref_pagenr in &order {
        let targets = &result.dedup[ref_pagenr];
        let intervals = intervalize(targets);
        encode_interval_list(w, &intervals)?;
    }
    Ok(())
}

fn write_delta_section<W: Write>(w: &mut W, deltas: &[(crate::pagenr::PageNr, crate::delta::Delta)]) -> Result<()> {
    let pagenrs: Vec<_> = deltas.iter().map(|(p, _)| *p).collect();
    encode_pagenr_list(w, &pagenrs)?;
    for (_, delta) in deltas {
        encode_delta(w, delta)?;
    }
    Ok(())
}

pub struct CompressOptions {
    pub pagesize: u32,
    pub nointra: bool,
    pub delta_tag: Option<String>,
    pub inner: InnerCodec,
}

/// Compresses `target` against `reference`, writing a complete container to
/// `out`. `reference_path` is stored verbatim in the container so a decoder
/// knows which dump to apply it against.
pub fn compress<W: Write>(
    out: &mut W,
    reference_path: &Path,
    reference: &[Page],
    target: &[Page],
    opts: &CompressOptions,
    sink: &dyn StatsSink,
) -> Result<()> {
    let method = MethodName::new(opts.nointra, opts.delta_tag.clone(), opts.inner);
    let uncompressed_size = target.len() as u64 * opts.pagesize as u64;
    let header = Header::new(method, opts.pagesize, uncompressed_size);
    header.write(out)?;

    let classify_opts = ClassifyOptions { nointra: opts.nointra, delta_enabled: opts.delta_tag.is_some() };
    let result = classify(reference, target, classify_opts)?;
    sink.compression(&result.stats);

    let mut inner = opts.inner.wrap_writer(&mut *out);

    let reference_path_str = reference_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("reference path is not valid UTF-8"))?;
    inner.write_cstring(reference_path_str.as_bytes())?;

    write_dedup_section(&mut inner, reference, &result)?;
    if let Some(deltas) = &result.delta {
        write_delta_section(&mut inner, deltas)?;
    }
    result.new_pages.emit(&mut inner)?;

    inner.finish()?;
    Ok(())
}
