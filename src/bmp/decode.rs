//! BMP decoder: 8-bit palette, 24-bit and 32-bit, uncompressed or bit-field.

use enough::Stop;

use crate::bitmask::ChannelMasks;
use crate::buffer::ImageBuffer;
use crate::cursor::Cursor;
use crate::error::TexError;
use crate::limits::{Limits, check_output};
use crate::pixel::{PixelFormat, size_in_bytes};

pub(crate) const FILE_HEADER_LEN: u32 = 14;
pub(crate) const INFO_HEADER_LEN: u32 = 40;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub(crate) enum BmpCompression {
    Rgb,
    Bitfields,
    AlphaBitfields,
}

impl BmpCompression {
    fn from_u32(num: u32) -> Option<Self> {
        match num {
            0 => Some(Self::Rgb),
            3 => Some(Self::Bitfields),
            6 => Some(Self::AlphaBitfields),
            _ => None,
        }
    }
}

/// Parsed BMP headers.
#[derive(Clone, Debug)]
pub(crate) struct BmpHeader {
    pub width: u32,
    pub height: u32,
    /// Rows stored first-to-last (negative height in the file).
    pub top_down: bool,
    pub depth: u16,
    pub compression: BmpCompression,
    pub data_offset: u32,
    pub info_len: u32,
    pub colors_used: u32,
    pub masks: ChannelMasks,
    pub format: PixelFormat,
}

impl BmpHeader {
    /// Bytes per stored row, padded to a 4-byte boundary.
    pub(crate) fn stride(&self) -> Result<usize, TexError> {
        (self.width as usize)
            .checked_mul(usize::from(self.depth))
            .map(|bits| bits.div_ceil(32) * 4)
            .ok_or(TexError::DimensionsTooLarge {
                width: self.width,
                height: self.height,
            })
    }
}

pub(crate) fn parse_header(data: &[u8]) -> Result<BmpHeader, TexError> {
    let mut c = Cursor::new(data);
    if c.read_fixed::<2>().map_err(|_| TexError::UnrecognizedFormat)? != *b"BM" {
        return Err(TexError::UnrecognizedFormat);
    }
    let _file_size = c.read_u32_le()?;
    c.skip(4)?; // reserved
    let data_offset = c.read_u32_le()?;

    let info_len = c.read_u32_le()?;
    if info_len < INFO_HEADER_LEN {
        return Err(TexError::UnsupportedVariant(alloc::format!(
            "BMP info header of {info_len} bytes"
        )));
    }
    let width = c.read_i32_le()?;
    let raw_height = c.read_i32_le()?;
    let planes = c.read_u16_le()?;
    let depth = c.read_u16_le()?;
    let compression_raw = c.read_u32_le()?;
    let _image_size = c.read_u32_le()?;
    let _x_ppm = c.read_i32_le()?;
    let _y_ppm = c.read_i32_le()?;
    let colors_used = c.read_u32_le()?;
    let _important = c.read_u32_le()?;

    if planes != 1 {
        return Err(TexError::InvalidHeader(alloc::format!(
            "BMP planes field is {planes}, expected 1"
        )));
    }
    if width <= 0 || raw_height == 0 || raw_height == i32::MIN {
        return Err(TexError::InvalidHeader(alloc::format!(
            "BMP dimensions {width}x{raw_height}"
        )));
    }
    let compression = BmpCompression::from_u32(compression_raw).ok_or_else(|| {
        TexError::UnsupportedVariant(alloc::format!("BMP compression {compression_raw}"))
    })?;
    let format = match depth {
        8 => PixelFormat::Indexed8,
        24 => PixelFormat::Rgb24,
        32 => PixelFormat::Rgba32,
        other => {
            return Err(TexError::UnsupportedVariant(alloc::format!(
                "BMP bit depth {other}"
            )));
        }
    };
    if depth == 8 && compression != BmpCompression::Rgb {
        return Err(TexError::InvalidHeader(
            "bit-field compression on an 8-bit BMP".into(),
        ));
    }

    // Masks live right after the 40-byte header: inside it for V2+ headers,
    // or as a separate block for BITMAPINFOHEADER with bit-field compression.
    let mut masks = [0u32; 4];
    let mask_count = match (compression, info_len) {
        (BmpCompression::Rgb, _) => 0,
        (_, len) if len >= 56 => 4,
        (_, len) if len >= 52 => 3,
        (BmpCompression::Bitfields, _) => 3,
        (BmpCompression::AlphaBitfields, _) => 4,
    };
    for m in masks.iter_mut().take(mask_count) {
        *m = c.read_u32_le()?;
    }
    let masks = ChannelMasks::new(masks);
    let masks = if masks.has_color() {
        masks
    } else {
        ChannelMasks::ARGB32
    };

    Ok(BmpHeader {
        width: width as u32,
        height: raw_height.unsigned_abs(),
        top_down: raw_height < 0,
        depth,
        compression,
        data_offset,
        info_len,
        colors_used,
        masks,
        format,
    })
}

/// Read the BGRX palette of an 8-bit image into `out`. Alpha is forced
/// opaque; unused entries stay opaque black.
fn read_palette(data: &[u8], header: &BmpHeader, out: &mut ImageBuffer) -> Result<(), TexError> {
    let count = match header.colors_used {
        0 => 256,
        n if n > 256 => {
            return Err(TexError::InvalidHeader(alloc::format!(
                "BMP palette of {n} colors"
            )));
        }
        n => n as usize,
    };
    let start = FILE_HEADER_LEN.checked_add(header.info_len).ok_or_else(|| {
        TexError::InvalidHeader(alloc::format!("BMP info header of {} bytes", header.info_len))
    })?;
    let mut c = Cursor::new(data);
    c.set_position(start as usize)?;
    for entry in out.palette_mut().chunks_exact_mut(4).take(count) {
        let [b, g, r, _] = c.read_fixed::<4>()?;
        entry.copy_from_slice(&[r, g, b, 255]);
    }
    Ok(())
}

pub(crate) fn decode_bmp(
    data: &[u8],
    limits: Option<&Limits>,
    stop: &dyn Stop,
) -> Result<ImageBuffer, TexError> {
    let header = parse_header(data)?;
    let out_bytes = size_in_bytes(header.format, header.width, header.height, 0)?;
    check_output(limits, header.width, header.height, out_bytes)?;
    tracing::trace!(
        width = header.width,
        height = header.height,
        depth = header.depth,
        top_down = header.top_down,
        compression = ?header.compression,
        "BMP header"
    );

    let stride = header.stride()?;
    let rows_len = stride
        .checked_mul(header.height as usize)
        .ok_or(TexError::DimensionsTooLarge {
            width: header.width,
            height: header.height,
        })?;
    let mut c = Cursor::new(data);
    c.set_position(header.data_offset as usize)?;
    let rows = c.take(rows_len)?;

    let mut out = ImageBuffer::new(header.width, header.height, header.format)?;
    if header.format == PixelFormat::Indexed8 {
        read_palette(data, &header, &mut out)?;
    }

    let (w, h) = (header.width as usize, header.height as usize);
    let bpp = header.format.bytes_per_pixel();
    let out_stride = w * bpp;
    let pixels = out.pixels_mut();

    for (i, src) in rows.chunks_exact(stride).enumerate() {
        if i % 16 == 0 {
            stop.check()?;
        }
        let y = if header.top_down { i } else { h - 1 - i };
        let dst = &mut pixels[y * out_stride..(y + 1) * out_stride];
        match header.depth {
            8 => dst.copy_from_slice(&src[..w]),
            24 => {
                for (d, s) in dst.chunks_exact_mut(3).zip(src.chunks_exact(3)) {
                    d.copy_from_slice(&[s[2], s[1], s[0]]);
                }
            }
            _ => {
                for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
                    let px = u32::from_le_bytes([s[0], s[1], s[2], s[3]]);
                    d.copy_from_slice(&header.masks.unpack(px));
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use enough::Unstoppable;

    /// 1x1 32-bit BITMAPINFOHEADER file with explicit bit-field masks.
    fn bitfields_bmp(masks: [u32; 3], pixel: u32) -> Vec<u8> {
        let offset = 14 + 40 + 12;
        let mut v = Vec::new();
        v.extend_from_slice(b"BM");
        v.extend_from_slice(&(offset + 4u32).to_le_bytes());
        v.extend_from_slice(&[0; 4]);
        v.extend_from_slice(&offset.to_le_bytes());
        v.extend_from_slice(&40u32.to_le_bytes());
        v.extend_from_slice(&1i32.to_le_bytes());
        v.extend_from_slice(&1i32.to_le_bytes());
        v.extend_from_slice(&1u16.to_le_bytes());
        v.extend_from_slice(&32u16.to_le_bytes());
        v.extend_from_slice(&3u32.to_le_bytes());
        v.extend_from_slice(&[0; 20]);
        for m in masks {
            v.extend_from_slice(&m.to_le_bytes());
        }
        v.extend_from_slice(&pixel.to_le_bytes());
        v
    }

    #[test]
    fn bitfields_remap_channels() {
        // R in the low byte, B in the third: an RGBX layout.
        let data = bitfields_bmp([0x0000_00FF, 0x0000_FF00, 0x00FF_0000], 0x0030_2010);
        let img = decode_bmp(&data, None, &Unstoppable).unwrap();
        assert_eq!(img.format(), PixelFormat::Rgba32);
        // No alpha mask in a 3-mask block: opaque.
        assert_eq!(img.pixels(), &[0x10, 0x20, 0x30, 255]);
    }

    #[test]
    fn empty_masks_fall_back_to_default() {
        let data = bitfields_bmp([0, 0, 0], 0x8010_2030);
        let img = decode_bmp(&data, None, &Unstoppable).unwrap();
        assert_eq!(img.pixels(), &[0x10, 0x20, 0x30, 0x80]);
    }

    #[test]
    fn rejects_rle() {
        let mut data = bitfields_bmp([0, 0, 0], 0);
        data[30] = 1; // BI_RLE8
        let err = parse_header(&data).unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn truncated_pixel_data_is_eof() {
        let mut data = bitfields_bmp([0, 0, 0], 0);
        data.truncate(data.len() - 2);
        assert!(matches!(
            decode_bmp(&data, None, &Unstoppable),
            Err(TexError::UnexpectedEof)
        ));
    }

    #[test]
    fn huge_info_header_is_an_error() {
        let mut v = Vec::new();
        v.extend_from_slice(b"BM");
        v.extend_from_slice(&[0; 8]);
        v.extend_from_slice(&58u32.to_le_bytes());
        v.extend_from_slice(&0xFFFF_FFF8u32.to_le_bytes());
        v.extend_from_slice(&1i32.to_le_bytes());
        v.extend_from_slice(&1i32.to_le_bytes());
        v.extend_from_slice(&1u16.to_le_bytes());
        v.extend_from_slice(&8u16.to_le_bytes());
        v.extend_from_slice(&[0; 24]);
        v.extend_from_slice(&[0; 8]);
        assert!(matches!(
            decode_bmp(&v, None, &Unstoppable),
            Err(TexError::InvalidHeader(_))
        ));
    }

    #[test]
    fn not_bmp() {
        assert!(matches!(parse_header(b"PK\x03\x04"), Err(TexError::UnrecognizedFormat)));
    }
}
