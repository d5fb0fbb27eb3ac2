//! The outer, general-purpose compressor wrapping the inner payload (spec
//! §4.6/§4.7, §6 method grammar `(gzip|bzip2|7zip)?`).
//!
//! The reader side is a type-erased `Box<dyn Read>`, since decoding runs
//! every wrapped reader to EOF and any I/O error already surfaces through
//! the ordinary `Read` calls. The writer side cannot use the same
//! type-erased shortcut: each encoder only writes its trailer (gzip CRC,
//! bzip2/xz footer) from a consuming `finish()`, not from `flush()`, and
//! that method isn't reachable through `Box<dyn Write>`. `OuterWriter` is
//! an enum over the concrete writer types instead, so `finish()` can be
//! called directly and its `Result` returned rather than swallowed by each
//! encoder's `Drop` impl. Gzip reuses `flate2` the way section buckets do;
//! `bzip2` and `xz2` are the standard crates for the other two formats (the
//! teacher's stack has no bzip2/lzma support to reuse).

use std::io::{Read, Write};

use anyhow::{anyhow, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InnerCodec {
    #[default]
    None,
    Gzip,
    Bzip2,
    /// Method-name suffix is `"7zip"`, matching the original CLI's naming
    /// (it shells out to `7za -txz`); the wire format is plain xz.
    Xz,
}

impl InnerCodec {
    pub fn method_suffix(self) -> &'static str {
        match self {
            InnerCodec::None => "",
            InnerCodec::Gzip => "gzip",
            InnerCodec::Bzip2 => "bzip2",
            InnerCodec::Xz => "7zip",
        }
    }

    /// Strips a known inner-codec suffix off `s`, returning the remainder
    /// and which codec (if any) matched. Restricting this to the closed set
    /// of known names is what keeps the method-name grammar unambiguous.
    pub(crate) fn strip_known_suffix(s: &str) -> Result<(&str, InnerCodec)> {
        for (suffix, codec) in [
            ("bzip2", InnerCodec::Bzip2),
            ("7zip", InnerCodec::Xz),
            ("gzip", InnerCodec::Gzip),
        ] {
            if let Some(rest) = s.strip_suffix(suffix) {
                return Ok((rest, codec));
            }
        }
        Ok((s, InnerCodec::None))
    }

    pub fn wrap_writer<W: Write>(self, w: W) -> OuterWriter<W> {
        match self {
            InnerCodec::None => OuterWriter::None(w),
            InnerCodec::Gzip => OuterWriter::Gzip(flate2::write::GzEncoder::new(w, flate2::Compression::best())),
            InnerCodec::Bzip2 => OuterWriter::Bzip2(bzip2::write::BzEncoder::new(w, bzip2::Compression::best())),
            InnerCodec::Xz => OuterWriter::Xz(xz2::write::XzEncoder::new(w, 9)),
        }
    }

    pub fn wrap_reader<'a>(self, r: Box<dyn Read + 'a>) -> Box<dyn Read + 'a> {
        match self {
            InnerCodec::None => r,
            InnerCodec::Gzip => Box::new(flate2::read::GzDecoder::new(r)),
            InnerCodec::Bzip2 => Box::new(bzip2::read::BzDecoder::new(r)),
            InnerCodec::Xz => Box::new(xz2::read::XzDecoder::new(r)),
        }
    }
}

/// A concrete outer-codec writer. Enumerated over the four wrapper types
/// (rather than boxed as `dyn Write`) so [`OuterWriter::finish`] can consume
/// it and call each encoder's own `finish()`, surfacing a finalization
/// failure instead of letting `Drop` discard it.
pub enum OuterWriter<W: Write> {
    None(W),
    Gzip(flate2::write::GzEncoder<W>),
    Bzip2(bzip2::write::BzEncoder<W>),
    Xz(xz2::write::XzEncoder<W>),
}

impl<W: Write> Write for OuterWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            OuterWriter::None(w) => w.write(buf),
            OuterWriter::Gzip(w) => w.write(buf),
            OuterWriter::Bzip2(w) => w.write(buf),
            OuterWriter::Xz(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            OuterWriter::None(w) => w.flush(),
            OuterWriter::Gzip(w) => w.flush(),
            OuterWriter::Bzip2(w) => w.flush(),
            OuterWriter::Xz(w) => w.flush(),
        }
    }
}

impl<W: Write> OuterWriter<W> {
    /// Writes the trailer (if any) and returns the inner writer. This is
    /// the only path that finalizes a wrapped writer; dropping it without
    /// calling `finish` discards any trailer-write failure, which is the
    /// behavior this type exists to avoid.
    pub fn finish(self) -> Result<W> {
        match self {
            OuterWriter::None(w) => Ok(w),
            OuterWriter::Gzip(w) => w.finish().map_err(|e| anyhow!("gzip outer codec finalize failed: {e}")),
            OuterWriter::Bzip2(w) => w.finish().map_err(|e| anyhow!("bzip2 outer codec finalize failed: {e}")),
            OuterWriter::Xz(w) => w.finish().map_err(|e| anyhow!("xz outer codec finalize failed: {e}")),
        }
    }
}
