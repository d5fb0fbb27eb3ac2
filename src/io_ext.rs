//! Little-endian primitive and NUL-terminated string helpers layered on
//! [`Read`]/[`Write`], the way the rest of this family of binary-format
//! crates extends `Read` with fixed-width readers instead of hand-rolling
//! `from_le_bytes` at every call site.

use std::io::{BufRead, Read, Write};

use anyhow::{ensure, Result};

pub trait ReadExt: Read {
    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn read_u16le(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32le(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64le(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    fn read_u16be(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    fn read_u32be(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }
}

impl<R: Read + ?Sized> ReadExt for R {}

pub trait BufReadExt: BufRead {
    /// Reads bytes up to and including a NUL terminator, returning the bytes
    /// without the terminator. Fails on EOF before a NUL is seen.
    fn read_cstring(&mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.read_until(0, &mut buf)?;
        ensure!(buf.pop() == Some(0), "unexpected EOF reading NUL-terminated string");
        Ok(buf)
    }
}

impl<R: BufRead + ?Sized> BufReadExt for R {}

pub trait WriteExt: Write {
    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_all(&[value])?;
        Ok(())
    }

    fn write_u16le(&mut self, value: u16) -> Result<()> {
        self.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    fn write_u32le(&mut self, value: u32) -> Result<()> {
        self.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    fn write_u64le(&mut self, value: u64) -> Result<()> {
        self.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    fn write_u16be(&mut self, value: u16) -> Result<()> {
        self.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    fn write_u32be(&mut self, value: u32) -> Result<()> {
        self.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    /// Writes `bytes` followed by a NUL terminator.
    fn write_cstring(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_all(bytes)?;
        self.write_all(&[0])?;
        Ok(())
    }
}

impl<W: Write + ?Sized> WriteExt for W {}
