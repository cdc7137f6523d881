use alloc::borrow::Cow;
use std::io::Write;

use enough::Stop;

use super::{
    DDPF_ALPHAPIXELS, DDPF_RGB, DDSCAPS_TEXTURE, DDSD_CAPS, DDSD_HEIGHT, DDSD_PITCH, DDSD_PIXELFORMAT,
    DDSD_WIDTH, HEADER_LEN, MAGIC, PIXEL_FORMAT_LEN,
};
use crate::bitmask::ChannelMasks;
use crate::buffer::ImageBuffer;
use crate::error::TexError;
use crate::pixel::PixelFormat;

/// Write an uncompressed 24-bit (B, G, R) or 32-bit (B, G, R, A) DDS.
/// Indexed images are expanded to truecolor first.
pub(crate) fn encode_dds<W: Write>(image: &ImageBuffer, out: &mut W, stop: &dyn Stop) -> Result<(), TexError> {
    let image = if image.format().is_indexed() {
        Cow::Owned(image.to_truecolor()?)
    } else {
        Cow::Borrowed(image)
    };
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(TexError::InvalidData(alloc::format!(
            "cannot encode {width}x{height} image"
        )));
    }
    let (masks, pf_flags) = match image.format() {
        PixelFormat::Rgb24 => (ChannelMasks::RGB24, DDPF_RGB),
        PixelFormat::Rgba32 => (ChannelMasks::ARGB32, DDPF_RGB | DDPF_ALPHAPIXELS),
        other => {
            return Err(TexError::UnsupportedVariant(alloc::format!(
                "DDS encode of {other:?}"
            )));
        }
    };
    let bpp = image.format().bytes_per_pixel();
    let pitch = u32::try_from(width as usize * bpp)
        .map_err(|_| TexError::DimensionsTooLarge { width, height })?;

    stop.check()?;
    out.write_all(&MAGIC)?;
    let flags = DDSD_CAPS | DDSD_HEIGHT | DDSD_WIDTH | DDSD_PITCH | DDSD_PIXELFORMAT;
    // size, flags, height, width, pitch, depth, mip count
    for field in [HEADER_LEN, flags, height, width, pitch, 0, 0] {
        out.write_all(&field.to_le_bytes())?;
    }
    out.write_all(&[0u8; 11 * 4])?;

    let bit_count = (bpp * 8) as u32;
    let mask_values = [
        masks.r.mask(),
        masks.g.mask(),
        masks.b.mask(),
        masks.a.mask(),
    ];
    for field in [PIXEL_FORMAT_LEN, pf_flags, 0, bit_count] {
        out.write_all(&field.to_le_bytes())?;
    }
    for m in mask_values {
        out.write_all(&m.to_le_bytes())?;
    }
    // caps, caps2, caps3, caps4, reserved
    for field in [DDSCAPS_TEXTURE, 0, 0, 0, 0] {
        out.write_all(&field.to_le_bytes())?;
    }

    let mut row = alloc::vec![0u8; pitch as usize];
    for (y, src) in image.pixels().chunks_exact(pitch as usize).enumerate() {
        if y % 16 == 0 {
            stop.check()?;
        }
        for (d, s) in row.chunks_exact_mut(bpp).zip(src.chunks_exact(bpp)) {
            let a = if bpp == 4 { s[3] } else { 255 };
            let packed = masks.pack([s[0], s[1], s[2], a]).to_le_bytes();
            d.copy_from_slice(&packed[..bpp]);
        }
        out.write_all(&row)?;
    }
    Ok(())
}
