//! PNG chunk framing: length, type, payload, CRC.

use std::io::Write;

use flate2::Crc;

use crate::cursor::Cursor;
use crate::error::TexError;

pub(crate) const IHDR: [u8; 4] = *b"IHDR";
pub(crate) const PLTE: [u8; 4] = *b"PLTE";
pub(crate) const TRNS: [u8; 4] = *b"tRNS";
pub(crate) const IDAT: [u8; 4] = *b"IDAT";
pub(crate) const IEND: [u8; 4] = *b"IEND";

/// Largest chunk payload PNG allows (2^31 - 1).
const MAX_CHUNK_LEN: u32 = 0x7FFF_FFFF;

pub(crate) struct Chunk<'a> {
    pub kind: [u8; 4],
    pub data: &'a [u8],
}

impl Chunk<'_> {
    /// Critical chunks have an uppercase first letter.
    pub(crate) fn is_critical(&self) -> bool {
        self.kind[0].is_ascii_uppercase()
    }

    pub(crate) fn name(&self) -> &str {
        core::str::from_utf8(&self.kind).unwrap_or("????")
    }
}

/// Read the next chunk. The CRC is consumed but not checked.
pub(crate) fn read_chunk<'a>(cursor: &mut Cursor<'a>) -> Result<Chunk<'a>, TexError> {
    let len = cursor.read_u32_be()?;
    if len > MAX_CHUNK_LEN {
        return Err(TexError::InvalidData(alloc::format!(
            "chunk length {len} exceeds 2^31-1"
        )));
    }
    let kind = cursor.read_fixed::<4>()?;
    let data = cursor.take(len as usize)?;
    let _crc = cursor.read_u32_be()?;
    Ok(Chunk { kind, data })
}

/// Write one complete chunk with its CRC.
pub(crate) fn write_chunk<W: Write>(out: &mut W, kind: &[u8; 4], data: &[u8]) -> Result<(), TexError> {
    let mut crc = Crc::new();
    crc.update(kind);
    crc.update(data);
    out.write_all(&(data.len() as u32).to_be_bytes())?;
    out.write_all(kind)?;
    out.write_all(data)?;
    out.write_all(&crc.sum().to_be_bytes())?;
    Ok(())
}

/// `Write` adapter that cuts compressed image data into `IDAT` chunks as
/// it arrives, holding at most one chunk's worth in memory.
pub(crate) struct IdatWriter<W: Write> {
    inner: W,
    pending: alloc::vec::Vec<u8>,
    chunk_size: usize,
}

impl<W: Write> IdatWriter<W> {
    pub(crate) fn new(inner: W, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.clamp(1, MAX_CHUNK_LEN as usize);
        Self {
            inner,
            pending: alloc::vec::Vec::with_capacity(chunk_size.min(1 << 20)),
            chunk_size,
        }
    }

    fn emit(&mut self, len: usize) -> std::io::Result<()> {
        write_chunk(&mut self.inner, &IDAT, &self.pending[..len]).map_err(|e| match e {
            TexError::Io(io) => io,
            other => std::io::Error::other(other.to_string()),
        })?;
        self.pending.drain(..len);
        Ok(())
    }

    /// Emit whatever is still pending and return the inner writer.
    pub(crate) fn finish(mut self) -> Result<W, TexError> {
        if !self.pending.is_empty() {
            let len = self.pending.len();
            self.emit(len)?;
        }
        Ok(self.inner)
    }
}

impl<W: Write> Write for IdatWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let room = self.chunk_size - self.pending.len();
        let n = buf.len().min(room);
        self.pending.extend_from_slice(&buf[..n]);
        if self.pending.len() == self.chunk_size {
            self.emit(self.chunk_size)?;
        }
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
