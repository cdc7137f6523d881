use enough::Stop;

use super::{DDPF_ALPHAPIXELS, DDPF_FOURCC, HEADER_LEN, MAGIC, PIXEL_FORMAT_LEN};
use crate::bitmask::ChannelMasks;
use crate::buffer::ImageBuffer;
use crate::cursor::Cursor;
use crate::error::TexError;
use crate::limits::{Limits, check_output};
use crate::pixel::{PixelFormat, size_in_bytes};

#[derive(Clone, Debug)]
pub(crate) struct DdsHeader {
    pub width: u32,
    pub height: u32,
    pub bit_count: u32,
    pub mip_count: u32,
    pub masks: ChannelMasks,
    pub format: PixelFormat,
}

pub(crate) fn parse_header(data: &[u8]) -> Result<DdsHeader, TexError> {
    let mut c = Cursor::new(data);
    if c.read_fixed::<4>().map_err(|_| TexError::UnrecognizedFormat)? != MAGIC {
        return Err(TexError::UnrecognizedFormat);
    }
    let size = c.read_u32_le()?;
    if size != HEADER_LEN {
        return Err(TexError::InvalidHeader(alloc::format!(
            "DDS header size {size} (expected {HEADER_LEN})"
        )));
    }
    let _flags = c.read_u32_le()?;
    let height = c.read_u32_le()?;
    let width = c.read_u32_le()?;
    let _pitch = c.read_u32_le()?;
    let _depth = c.read_u32_le()?;
    let mip_count = c.read_u32_le()?;
    c.skip(11 * 4)?; // reserved

    let pf_size = c.read_u32_le()?;
    if pf_size != PIXEL_FORMAT_LEN {
        return Err(TexError::InvalidHeader(alloc::format!(
            "DDS pixel format size {pf_size}"
        )));
    }
    let pf_flags = c.read_u32_le()?;
    let four_cc = c.read_fixed::<4>()?;
    let bit_count = c.read_u32_le()?;
    let mut masks = [0u32; 4];
    for m in &mut masks {
        *m = c.read_u32_le()?;
    }
    // caps, caps2, caps3, caps4, reserved
    c.skip(5 * 4)?;

    if pf_flags & DDPF_FOURCC != 0 {
        return Err(TexError::UnsupportedVariant(alloc::format!(
            "compressed DDS ({})",
            core::str::from_utf8(&four_cc).unwrap_or("????")
        )));
    }
    if width == 0 || height == 0 {
        return Err(TexError::InvalidHeader(alloc::format!(
            "DDS dimensions {width}x{height}"
        )));
    }
    if pf_flags & DDPF_ALPHAPIXELS == 0 {
        masks[3] = 0;
    }
    let supplied = ChannelMasks::new(masks);
    let (format, default_masks) = match bit_count {
        16 => (PixelFormat::Rgba32, ChannelMasks::ARGB16),
        24 => (PixelFormat::Rgb24, ChannelMasks::RGB24),
        32 => (PixelFormat::Rgba32, ChannelMasks::ARGB32),
        other => {
            return Err(TexError::UnsupportedVariant(alloc::format!(
                "DDS bit count {other}"
            )));
        }
    };
    // 16-bit surfaces are always read as 4-4-4-4.
    let masks = if bit_count != 16 && supplied.has_color() {
        supplied
    } else {
        default_masks
    };

    Ok(DdsHeader {
        width,
        height,
        bit_count,
        mip_count,
        masks,
        format,
    })
}

pub(crate) fn decode_dds(
    data: &[u8],
    limits: Option<&Limits>,
    stop: &dyn Stop,
) -> Result<ImageBuffer, TexError> {
    let header = parse_header(data)?;
    let out_bytes = size_in_bytes(header.format, header.width, header.height, 0)?;
    check_output(limits, header.width, header.height, out_bytes)?;
    if header.mip_count > 1 {
        tracing::trace!(mips = header.mip_count, "reading top-level DDS surface only");
    }

    let src_bpp = (header.bit_count / 8) as usize;
    let (w, h) = (header.width as usize, header.height as usize);
    let pitch = w * src_bpp;
    let surface_len = pitch.checked_mul(h).ok_or(TexError::DimensionsTooLarge {
        width: header.width,
        height: header.height,
    })?;
    let mut c = Cursor::new(data);
    c.set_position(4 + HEADER_LEN as usize)?;
    let surface = c.take(surface_len)?;

    let mut out = ImageBuffer::new(header.width, header.height, header.format)?;
    let channels = header.format.channels();
    let out_pitch = w * channels;
    let pixels = out.pixels_mut();

    for (y, src) in surface.chunks_exact(pitch).enumerate() {
        if y % 16 == 0 {
            stop.check()?;
        }
        let dst = &mut pixels[y * out_pitch..(y + 1) * out_pitch];
        for (d, s) in dst.chunks_exact_mut(channels).zip(src.chunks_exact(src_bpp)) {
            let mut raw = [0u8; 4];
            raw[..src_bpp].copy_from_slice(s);
            let rgba = header.masks.unpack(u32::from_le_bytes(raw));
            d.copy_from_slice(&rgba[..channels]);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use enough::Unstoppable;

    fn header(pf_flags: u32, four_cc: &[u8; 4], bits: u32, masks: [u32; 4], w: u32, h: u32) -> Vec<u8> {
        let mut v = Vec::new();
        v.extend_from_slice(&MAGIC);
        for field in [HEADER_LEN, 0x100F, h, w, 0, 0, 1] {
            v.extend_from_slice(&field.to_le_bytes());
        }
        v.extend_from_slice(&[0; 44]);
        v.extend_from_slice(&PIXEL_FORMAT_LEN.to_le_bytes());
        v.extend_from_slice(&pf_flags.to_le_bytes());
        v.extend_from_slice(four_cc);
        v.extend_from_slice(&bits.to_le_bytes());
        for m in masks {
            v.extend_from_slice(&m.to_le_bytes());
        }
        v.extend_from_slice(&[0; 20]);
        v
    }

    #[test]
    fn fourcc_is_unsupported() {
        let data = header(DDPF_FOURCC, b"DXT5", 0, [0; 4], 4, 4);
        let err = parse_header(&data).unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn sixteen_bit_reads_as_argb4444() {
        let mut data = header(0x41, &[0; 4], 16, [0xF800, 0x07E0, 0x001F, 0], 2, 1);
        data.extend_from_slice(&0xF0F0u16.to_le_bytes());
        data.extend_from_slice(&0x1234u16.to_le_bytes());
        let img = decode_dds(&data, None, &Unstoppable).unwrap();
        assert_eq!(img.format(), PixelFormat::Rgba32);
        assert_eq!(img.pixels(), &[0x00, 0xFF, 0x00, 0xFF, 0x22, 0x33, 0x44, 0x11]);
    }

    #[test]
    fn missing_alpha_flag_is_opaque() {
        let mut data = header(0x40, &[0; 4], 32, [0xFF0000, 0xFF00, 0xFF, 0xFF00_0000], 1, 1);
        data.extend_from_slice(&[3, 2, 1, 0]);
        let img = decode_dds(&data, None, &Unstoppable).unwrap();
        assert_eq!(img.pixels(), &[1, 2, 3, 255]);
    }

    #[test]
    fn short_surface_is_eof() {
        let mut data = header(0x40, &[0; 4], 24, [0; 4], 2, 2);
        data.extend_from_slice(&[0; 11]);
        assert!(matches!(
            decode_dds(&data, None, &Unstoppable),
            Err(TexError::UnexpectedEof)
        ));
    }
}
