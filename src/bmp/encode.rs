//! BMP encoder: 8-bit palette, 24-bit and 32-bit, always bottom-up BI_RGB.

use alloc::borrow::Cow;
use std::io::Write;

use enough::Stop;

use super::decode::{FILE_HEADER_LEN, INFO_HEADER_LEN};
use crate::buffer::ImageBuffer;
use crate::error::TexError;
use crate::pixel::PixelFormat;

const PALETTE_LEN: u32 = 256 * 4;

/// Encode `image` as BMP into `out`.
///
/// `R8` is written as an 8-bit image with a grayscale palette and
/// `Indexed16` is expanded to truecolor first.
pub(crate) fn encode_bmp<W: Write>(image: &ImageBuffer, out: &mut W, stop: &dyn Stop) -> Result<(), TexError> {
    let image = match image.format() {
        PixelFormat::Indexed16 => Cow::Owned(image.to_truecolor()?),
        _ => Cow::Borrowed(image),
    };
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(TexError::InvalidData(alloc::format!(
            "cannot encode {width}x{height} image"
        )));
    }
    let depth: u16 = match image.format() {
        PixelFormat::R8 | PixelFormat::Indexed8 => 8,
        PixelFormat::Rgb24 => 24,
        PixelFormat::Rgba32 => 32,
        other => {
            return Err(TexError::UnsupportedVariant(alloc::format!(
                "BMP encode of {other:?}"
            )));
        }
    };

    let too_large = || TexError::DimensionsTooLarge { width, height };
    let w = width as usize;
    let row_bytes = w.checked_mul(usize::from(depth / 8)).ok_or_else(too_large)?;
    let stride = row_bytes.checked_add(3).ok_or_else(too_large)? & !3;
    let pixel_data_size = stride.checked_mul(height as usize).ok_or_else(too_large)?;
    let palette_len = if depth == 8 { PALETTE_LEN } else { 0 };
    let data_offset = FILE_HEADER_LEN + INFO_HEADER_LEN + palette_len;
    let file_size = u32::try_from(pixel_data_size)
        .ok()
        .and_then(|n| n.checked_add(data_offset))
        .ok_or_else(too_large)?;

    stop.check()?;

    // File header
    out.write_all(b"BM")?;
    out.write_all(&file_size.to_le_bytes())?;
    out.write_all(&[0u8; 4])?; // reserved
    out.write_all(&data_offset.to_le_bytes())?;

    // BITMAPINFOHEADER
    out.write_all(&INFO_HEADER_LEN.to_le_bytes())?;
    out.write_all(&(width as i32).to_le_bytes())?;
    out.write_all(&(height as i32).to_le_bytes())?;
    out.write_all(&1u16.to_le_bytes())?; // planes
    out.write_all(&depth.to_le_bytes())?;
    out.write_all(&0u32.to_le_bytes())?; // BI_RGB
    out.write_all(&(pixel_data_size as u32).to_le_bytes())?;
    out.write_all(&2835i32.to_le_bytes())?; // 72 DPI
    out.write_all(&2835i32.to_le_bytes())?;
    let colors = if depth == 8 { 256u32 } else { 0 };
    out.write_all(&colors.to_le_bytes())?;
    out.write_all(&0u32.to_le_bytes())?; // important colors

    if depth == 8 {
        let mut palette = [0u8; PALETTE_LEN as usize];
        for (i, dst) in palette.chunks_exact_mut(4).enumerate() {
            let [r, g, b, _] = match image.format() {
                PixelFormat::R8 => [i as u8; 4],
                _ => image.palette_entry(i),
            };
            // BGRX; the reserved byte is written as zero.
            dst.copy_from_slice(&[b, g, r, 0]);
        }
        out.write_all(&palette)?;
    }

    let mut row = alloc::vec![0u8; stride];
    let src = image.pixels();
    for (i, y) in (0..height as usize).rev().enumerate() {
        if i % 16 == 0 {
            stop.check()?;
        }
        let line = &src[y * row_bytes..(y + 1) * row_bytes];
        match depth {
            8 => row[..row_bytes].copy_from_slice(line),
            24 => {
                for (d, s) in row.chunks_exact_mut(3).zip(line.chunks_exact(3)) {
                    d.copy_from_slice(&[s[2], s[1], s[0]]);
                }
            }
            _ => {
                for (d, s) in row.chunks_exact_mut(4).zip(line.chunks_exact(4)) {
                    d.copy_from_slice(&[s[2], s[1], s[0], s[3]]);
                }
            }
        }
        out.write_all(&row)?;
    }
    Ok(())
}
