//! Fixed magic/method/version/page-size/uncompressed-size container header
//! (spec §4.4, §6). Laid out as `"MBCR\0"`, method string + `\0`, then a
//! fixed-width tail (`u16` major, `u16` minor, `u32` pagesize, `u64`
//! uncompressed size), all little-endian. The header is never wrapped by
//! the outer codec.

use std::io::{Read, Write};

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::io_ext::{BufReadExt, WriteExt};
use crate::method::MethodName;

pub const MAGIC: &[u8] = b"MBCR";
pub const DEFAULT_MAJOR: u16 = 1;
pub const DEFAULT_MINOR: u16 = 1;
pub const DEFAULT_PAGESIZE: u32 = 4096;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct HeaderTail {
    major: u16,
    minor: u16,
    pagesize: u32,
    uncompressed_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub method: MethodName,
    pub major: u16,
    pub minor: u16,
    pub pagesize: u32,
    pub uncompressed_size: u64,
}

impl Header {
    pub fn new(method: MethodName, pagesize: u32, uncompressed_size: u64) -> Self {
        Self {
            method,
            major: DEFAULT_MAJOR,
            minor: DEFAULT_MINOR,
            pagesize,
            uncompressed_size,
        }
    }

    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_cstring(MAGIC)?;
        w.write_cstring(self.method.to_string().as_bytes())?;
        let tail = HeaderTail {
            major: self.major,
            minor: self.minor,
            pagesize: self.pagesize,
            uncompressed_size: self.uncompressed_size,
        };
        let bytes = bincode::serialize(&tail)?;
        w.write_all(&bytes)?;
        Ok(())
    }

    pub fn read<R: Read + std::io::BufRead>(r: &mut R) -> Result<Self> {
        let magic = r.read_cstring()?;
        ensure!(magic == MAGIC, "bad magic: expected {MAGIC:?}, got {magic:?}");
        let method_bytes = r.read_cstring()?;
        let method_str = String::from_utf8(method_bytes)
            .map_err(|e| anyhow::anyhow!("method name is not valid UTF-8: {e}"))?;
        let method: MethodName = method_str.parse()?;
        let tail: HeaderTail = bincode::deserialize_from(&mut *r)?;

        if tail.major != DEFAULT_MAJOR || tail.minor != DEFAULT_MINOR {
            log::warn!(
                "container version {}.{} differs from this implementation's {}.{}; the wire format is unchanged so decoding proceeds",
                tail.major,
                tail.minor,
                DEFAULT_MAJOR,
                DEFAULT_MINOR
            );
        }

        Ok(Self {
            method,
            major: tail.major,
            minor: tail.minor,
            pagesize: tail.pagesize,
            uncompressed_size: tail.uncompressed_size,
        })
    }
}
