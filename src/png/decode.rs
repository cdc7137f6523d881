//! PNG decoder: non-interlaced, 8/16-bit gray, RGB, RGBA and 8-bit palette.

use alloc::vec::Vec;
use std::io::Read;

use enough::Stop;
use flate2::read::ZlibDecoder;

use super::SIGNATURE;
use super::chunk::{self, Chunk, read_chunk};
use super::filter::{FilterType, unfilter, zero_row};
use crate::buffer::ImageBuffer;
use crate::cursor::Cursor;
use crate::error::TexError;
use crate::limits::{Limits, check_output};
use crate::palette::{HashLookup, PaletteBuilder};
use crate::pixel::{PixelFormat, size_in_bytes};

/// Fields of `IHDR` that matter to the decoder.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PngHeader {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: u8,
    pub format: PixelFormat,
}

impl PngHeader {
    fn parse(chunk: &Chunk<'_>) -> Result<Self, TexError> {
        if chunk.data.len() != 13 {
            return Err(TexError::InvalidHeader(alloc::format!(
                "IHDR length {} (expected 13)",
                chunk.data.len()
            )));
        }
        let mut c = Cursor::new(chunk.data);
        let width = c.read_u32_be()?;
        let height = c.read_u32_be()?;
        let bit_depth = c.read_u8()?;
        let color_type = c.read_u8()?;
        let compression = c.read_u8()?;
        let filter_method = c.read_u8()?;
        let interlace = c.read_u8()?;

        if width == 0 || height == 0 {
            return Err(TexError::InvalidHeader(alloc::format!(
                "PNG dimensions {width}x{height}"
            )));
        }
        if compression != 0 || filter_method != 0 {
            return Err(TexError::InvalidHeader(alloc::format!(
                "PNG compression method {compression}, filter method {filter_method}"
            )));
        }
        if interlace != 0 {
            return Err(TexError::UnsupportedVariant("interlaced PNG".into()));
        }
        if bit_depth != 8 && bit_depth != 16 {
            return Err(TexError::UnsupportedVariant(alloc::format!(
                "PNG bit depth {bit_depth}"
            )));
        }
        let format = match (color_type, bit_depth) {
            (0, 8) => PixelFormat::R8,
            (2, 8) => PixelFormat::Rgb24,
            (2, 16) => PixelFormat::Rgb48,
            (6, 8) => PixelFormat::Rgba32,
            (6, 16) => PixelFormat::Rgba64,
            (3, 8) => PixelFormat::Indexed8,
            (ct, depth) => {
                return Err(TexError::UnsupportedVariant(alloc::format!(
                    "PNG color type {ct} at bit depth {depth}"
                )));
            }
        };
        Ok(Self {
            width,
            height,
            bit_depth,
            color_type,
            format,
        })
    }

    /// Bytes per pixel in a scanline (and the filter stride).
    fn bpp(&self) -> usize {
        self.format.bytes_per_pixel().max(1)
    }
}

/// Check the signature and parse `IHDR`, which must come first.
pub(crate) fn parse_header(data: &[u8]) -> Result<PngHeader, TexError> {
    let mut cursor = Cursor::new(data);
    read_signature(&mut cursor)?;
    let first = read_chunk(&mut cursor)?;
    if first.kind != chunk::IHDR {
        return Err(TexError::InvalidHeader(alloc::format!(
            "first chunk is {}, expected IHDR",
            first.name()
        )));
    }
    PngHeader::parse(&first)
}

fn read_signature(cursor: &mut Cursor<'_>) -> Result<(), TexError> {
    let sig = cursor.read_fixed::<8>().map_err(|_| TexError::UnrecognizedFormat)?;
    if sig != SIGNATURE {
        return Err(TexError::UnrecognizedFormat);
    }
    Ok(())
}

/// Decode a PNG.
///
/// With `palette_clip` set, an 8-bit gray or truecolor image is also fed to a
/// [`PaletteBuilder`] row by row; if it fits in 65536 colors the indexed
/// image is returned instead of the truecolor one.
pub(crate) fn decode_png(
    data: &[u8],
    limits: Option<&Limits>,
    palette_clip: Option<u8>,
    stop: &dyn Stop,
) -> Result<ImageBuffer, TexError> {
    let mut cursor = Cursor::new(data);
    read_signature(&mut cursor)?;

    let mut header: Option<PngHeader> = None;
    let mut out = ImageBuffer::default();
    let mut idat: Vec<u8> = Vec::new();
    let mut seen_end = false;

    while cursor.remaining() > 0 {
        let chunk = read_chunk(&mut cursor)?;
        match chunk.kind {
            chunk::IHDR => {
                if header.is_some() {
                    return Err(TexError::InvalidData("duplicate IHDR".into()));
                }
                let h = PngHeader::parse(&chunk)?;
                let out_bytes = size_in_bytes(h.format, h.width, h.height, 0)?;
                check_output(limits, h.width, h.height, out_bytes)?;
                out.configure(h.width, h.height, h.format, 0, true)?;
                tracing::trace!(
                    width = h.width,
                    height = h.height,
                    depth = h.bit_depth,
                    color_type = h.color_type,
                    "PNG header"
                );
                header = Some(h);
            }
            _ if header.is_none() => {
                return Err(TexError::InvalidHeader(alloc::format!(
                    "{} chunk before IHDR",
                    chunk.name()
                )));
            }
            chunk::PLTE => read_palette(&mut out, chunk.data)?,
            chunk::TRNS => {
                if out.format() == PixelFormat::Indexed8 {
                    for (entry, &alpha) in out.palette_mut().chunks_exact_mut(4).zip(chunk.data) {
                        entry[3] = alpha;
                    }
                } else {
                    tracing::trace!(format = ?out.format(), "ignoring tRNS on non-palette image");
                }
            }
            chunk::IDAT => {
                if let Some(limits) = limits {
                    limits.check_memory(idat.len() + chunk.data.len())?;
                }
                idat.try_reserve(chunk.data.len())
                    .map_err(|_| TexError::AllocationFailed(idat.len() + chunk.data.len()))?;
                idat.extend_from_slice(chunk.data);
            }
            chunk::IEND => {
                seen_end = true;
                break;
            }
            _ if chunk.is_critical() => {
                return Err(TexError::UnsupportedVariant(alloc::format!(
                    "unknown critical chunk {}",
                    chunk.name()
                )));
            }
            _ => tracing::trace!(chunk = chunk.name(), "skipping ancillary chunk"),
        }
    }

    let header = header.ok_or(TexError::UnexpectedEof)?;
    if !seen_end {
        tracing::debug!("PNG ended without IEND");
    }
    if idat.is_empty() {
        return Err(TexError::InvalidData("PNG has no IDAT data".into()));
    }
    stop.check()?;

    let row_bytes = header.width as usize * header.bpp();
    let raw_len = (row_bytes + 1)
        .checked_mul(header.height as usize)
        .ok_or(TexError::DimensionsTooLarge {
            width: header.width,
            height: header.height,
        })?;
    if let Some(limits) = limits {
        limits.check_memory(raw_len)?;
    }
    let raw = inflate(&idat, raw_len)?;
    drop(idat);

    let quantize = match palette_clip {
        Some(clip) if matches!(header.format, PixelFormat::R8 | PixelFormat::Rgb24 | PixelFormat::Rgba32) => Some(clip),
        Some(_) => {
            tracing::debug!(format = ?header.format, "palette building not available for this format");
            None
        }
        None => None,
    };
    let mut builder = quantize.map(|_| PaletteBuilder::<HashLookup>::with_lookup());
    let mut indices: Vec<u16> = Vec::new();

    let zero = zero_row(row_bytes);
    let bpp = header.bpp();
    let wide = header.format.bytes_per_channel() == 2;
    let pixels = out.pixels_mut();

    for (y, src) in raw.chunks_exact(row_bytes + 1).enumerate() {
        if y % 16 == 0 {
            stop.check()?;
        }
        let filter = FilterType::from_u8(src[0])
            .ok_or_else(|| TexError::InvalidData(alloc::format!("row {y}: filter type {}", src[0])))?;

        let (done, rest) = pixels.split_at_mut(y * row_bytes);
        let cur = &mut rest[..row_bytes];
        let prior = if y == 0 { &zero[..] } else { &done[(y - 1) * row_bytes..] };

        cur.copy_from_slice(&src[1..]);
        if wide {
            // Byte-pair permutation commutes with the byte-wise filters
            // because bpp is even, so host order can be fixed up first.
            for pair in cur.chunks_exact_mut(2) {
                let v = u16::from_be_bytes([pair[0], pair[1]]);
                pair.copy_from_slice(&v.to_ne_bytes());
            }
        }
        unfilter(filter, bpp, prior, cur);

        let failed = match (builder.as_mut(), quantize) {
            (Some(b), Some(clip)) => b.offer_row(cur, header.format, clip, &mut indices).err(),
            _ => None,
        };
        if let Some(e) = failed {
            tracing::debug!(row = y, error = %e, "keeping truecolor output");
            builder = None;
            indices = Vec::new();
        }
    }

    if let Some(b) = builder {
        let indexed = b.finish(header.width, header.height, &indices)?;
        tracing::debug!(colors = b.len(), format = ?indexed.format(), "PNG quantized on decode");
        return Ok(indexed);
    }
    Ok(out)
}

fn read_palette(out: &mut ImageBuffer, data: &[u8]) -> Result<(), TexError> {
    if data.len() % 3 != 0 || data.len() > 256 * 3 {
        return Err(TexError::InvalidData(alloc::format!(
            "PLTE length {}",
            data.len()
        )));
    }
    if out.format() != PixelFormat::Indexed8 {
        tracing::trace!("ignoring suggested palette on truecolor image");
        return Ok(());
    }
    for (entry, rgb) in out.palette_mut().chunks_exact_mut(4).zip(data.chunks_exact(3)) {
        entry.copy_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
    }
    Ok(())
}

/// Inflate the concatenated `IDAT` stream, expecting exactly `expected`
/// bytes of scanline data.
fn inflate(idat: &[u8], expected: usize) -> Result<Vec<u8>, TexError> {
    let mut raw = Vec::new();
    raw.try_reserve_exact(expected)
        .map_err(|_| TexError::AllocationFailed(expected))?;
    ZlibDecoder::new(idat)
        .take(expected as u64)
        .read_to_end(&mut raw)
        .map_err(|e| TexError::InvalidData(alloc::format!("zlib stream: {e}")))?;
    if raw.len() < expected {
        return Err(TexError::InvalidData(alloc::format!(
            "image data inflated to {} bytes, expected {expected}",
            raw.len()
        )));
    }
    Ok(raw)
}
