//! PNG encoder: gray, RGB, RGBA and 8-bit palette, 8 bits per channel.

use alloc::vec::Vec;
use std::io::Write;

use enough::Stop;
use flate2::Compression;
use flate2::write::ZlibEncoder;

use super::PngConfig;
use super::SIGNATURE;
use super::chunk::{self, IdatWriter, write_chunk};
use super::filter::{FilterSelector, zero_row};
use crate::buffer::ImageBuffer;
use crate::error::TexError;
use crate::pixel::PixelFormat;

/// How rows of the source image become PNG scanlines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RowSource {
    /// Bytes are already in PNG order.
    Direct,
    /// `Indexed16` looked up through the palette into RGB or RGBA.
    Expand { channels: usize },
}

pub(crate) fn encode_png<W: Write>(
    image: &ImageBuffer,
    config: &PngConfig,
    out: &mut W,
    stop: &dyn Stop,
) -> Result<(), TexError> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(TexError::InvalidData(alloc::format!(
            "cannot encode {width}x{height} image"
        )));
    }

    let (color_type, source, out_format) = match image.format() {
        PixelFormat::R8 => (0u8, RowSource::Direct, PixelFormat::R8),
        PixelFormat::Rgb24 => (2, RowSource::Direct, PixelFormat::Rgb24),
        PixelFormat::Rgba32 => (6, RowSource::Direct, PixelFormat::Rgba32),
        PixelFormat::Indexed8 => (3, RowSource::Direct, PixelFormat::Indexed8),
        PixelFormat::Indexed16 if image.palette_has_alpha() => {
            (6, RowSource::Expand { channels: 4 }, PixelFormat::Rgba32)
        }
        PixelFormat::Indexed16 => (2, RowSource::Expand { channels: 3 }, PixelFormat::Rgb24),
        other => {
            return Err(TexError::UnsupportedVariant(alloc::format!(
                "PNG encode of {other:?}"
            )));
        }
    };

    out.write_all(&SIGNATURE)?;

    let mut ihdr = [0u8; 13];
    ihdr[0..4].copy_from_slice(&width.to_be_bytes());
    ihdr[4..8].copy_from_slice(&height.to_be_bytes());
    ihdr[8] = 8; // bit depth
    ihdr[9] = color_type;
    // compression, filter method, interlace all 0
    write_chunk(out, &chunk::IHDR, &ihdr)?;

    if out_format == PixelFormat::Indexed8 {
        let mut plte = Vec::with_capacity(256 * 3);
        let mut trns = Vec::with_capacity(256);
        for entry in image.palette().chunks_exact(4).take(256) {
            plte.extend_from_slice(&entry[..3]);
            trns.push(entry[3]);
        }
        write_chunk(out, &chunk::PLTE, &plte)?;
        write_chunk(out, &chunk::TRNS, &trns)?;
    }

    let bpp = out_format.bytes_per_pixel();
    let row_bytes = width as usize * bpp;
    let src_row_bytes = width as usize * image.format().bytes_per_pixel();

    let idat = IdatWriter::new(&mut *out, config.idat_chunk_size);
    let mut encoder = ZlibEncoder::new(idat, Compression::new(config.compression_level.min(9)));
    let mut selector = FilterSelector::new(row_bytes)?;
    let mut prior = zero_row(row_bytes);
    let mut cur = zero_row(row_bytes);

    for (y, src) in image.pixels().chunks_exact(src_row_bytes).enumerate() {
        if y % 16 == 0 {
            stop.check()?;
        }
        match source {
            RowSource::Direct => cur.copy_from_slice(src),
            RowSource::Expand { channels } => {
                for (dst, index) in cur.chunks_exact_mut(channels).zip(src.chunks_exact(2)) {
                    let rgba = image.palette_entry(usize::from(u16::from_le_bytes([index[0], index[1]])));
                    dst.copy_from_slice(&rgba[..channels]);
                }
            }
        }
        let (filter, filtered) = selector.select(bpp, &prior, &cur);
        encoder.write_all(&[filter as u8])?;
        encoder.write_all(filtered)?;
        core::mem::swap(&mut prior, &mut cur);
    }

    let idat = encoder.finish()?;
    idat.finish()?;
    write_chunk(out, &chunk::IEND, &[])?;
    Ok(())
}
