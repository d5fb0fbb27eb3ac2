//! Compression/decompression summaries and where they go (spec §7's
//! Design Notes "Global state").
//!
//! The original logs straight into the root logger as it walks the tables.
//! Here the counts are collected into plain structs first and handed to a
//! `StatsSink`, so a caller embedding this crate can capture them instead of
//! only ever getting log lines.

use crate::classifier::CompressionStats;

#[derive(Debug, Clone, Default)]
pub struct DecompressionStats {
    pub fills: u64,
    pub diffs: u64,
    pub new_pages: u64,
    pub same_offset: u64,
    pub total_pages: u64,
}

/// Receives a summary once an operation completes. Replaces the original's
/// direct calls into the process-wide logger with an injected sink, so
/// embedding callers aren't forced through the `log` facade.
pub trait StatsSink {
    fn compression(&self, stats: &CompressionStats);
    fn decompression(&self, stats: &DecompressionStats);
}

/// Default sink: emits the same counts the original logs at `DEBUG`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingStatsSink;

impl StatsSink for LoggingStatsSink {
    fn compression(&self, stats: &CompressionStats) {
        log::debug!(
            "pages: same_offset={} ({} distinct), dedup={} ({} distinct), new={} ({} distinct)",
            stats.same_total,
            stats.same_distinct,
            stats.dedup_total,
            stats.dedup_distinct,
            stats.new_total,
            stats.new_distinct,
        );
        if let (Some(count), Some(distinct)) = (stats.delta_count, stats.delta_distinct) {
            log::debug!("pages: delta={count} ({distinct} distinct)");
        }
        log::debug!("pages: total={}", stats.total_pages);
    }

    fn decompression(&self, stats: &DecompressionStats) {
        log::debug!(
            "pages: fills={}, diffs={}, new={}, same_offset={}, total={}",
            stats.fills,
            stats.diffs,
            stats.new_pages,
            stats.same_offset,
            stats.total_pages,
        );
    }
}

/// Sink that drops every summary, for callers that don't want logging.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStatsSink;

impl StatsSink for NullStatsSink {
    fn compression(&self, _stats: &CompressionStats) {}
    fn decompression(&self, _stats: &DecompressionStats) {}
}
