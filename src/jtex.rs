//! `JTEX`: an uncompressed dump of an [`ImageBuffer`].
//!
//! Layout: the 4-byte signature `JTEX`, six little-endian `u32` fields
//! (container flags, width, height, format tag, palette size, image flags),
//! then the buffer's bytes exactly as held in memory (palette head first for
//! indexed formats). 16-bit samples are written in host order.

use std::io::Write;

use enough::Stop;

use crate::buffer::ImageBuffer;
use crate::cursor::Cursor;
use crate::error::TexError;
use crate::limits::{Limits, check_output};
use crate::pixel::{PixelFormat, size_in_bytes};

pub(crate) const MAGIC: [u8; 4] = *b"JTEX";
pub(crate) const HEADER_LEN: usize = 4 + 6 * 4;

/// Container flags written by this version.
const CONTAINER_FLAGS: u32 = 0;

#[derive(Clone, Copy, Debug)]
pub(crate) struct JtexHeader {
    pub container_flags: u32,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub palette_size: u32,
    pub image_flags: u32,
}

pub(crate) fn parse_header(data: &[u8]) -> Result<JtexHeader, TexError> {
    let mut c = Cursor::new(data);
    if c.read_fixed::<4>().map_err(|_| TexError::UnrecognizedFormat)? != MAGIC {
        return Err(TexError::UnrecognizedFormat);
    }
    let container_flags = c.read_u32_le()?;
    let width = c.read_u32_le()?;
    let height = c.read_u32_le()?;
    let tag = c.read_u32_le()?;
    let palette_size = c.read_u32_le()?;
    let image_flags = c.read_u32_le()?;

    let format = match PixelFormat::from_tag(tag) {
        Some(PixelFormat::Unknown) | None => {
            return Err(TexError::InvalidHeader(alloc::format!(
                "JTEX format tag {tag}"
            )));
        }
        Some(f) => f,
    };
    if format.stored_palette_size(palette_size) != palette_size {
        return Err(TexError::InvalidHeader(alloc::format!(
            "JTEX palette size {palette_size} invalid for {format:?}"
        )));
    }
    Ok(JtexHeader {
        container_flags,
        width,
        height,
        format,
        palette_size,
        image_flags,
    })
}

pub(crate) fn probe(data: &[u8]) -> Result<(u32, u32, PixelFormat), TexError> {
    let h = parse_header(data)?;
    Ok((h.width, h.height, h.format))
}

pub(crate) fn decode(data: &[u8], limits: Option<&Limits>, stop: &dyn Stop) -> Result<ImageBuffer, TexError> {
    let header = parse_header(data)?;
    if header.container_flags != CONTAINER_FLAGS {
        tracing::debug!(flags = header.container_flags, "unknown JTEX container flags");
    }
    let len = size_in_bytes(header.format, header.width, header.height, header.palette_size)?;
    check_output(limits, header.width, header.height, len)?;
    stop.check()?;

    let mut c = Cursor::new(data);
    c.set_position(HEADER_LEN)?;
    let body = c.take(len)?;
    let mut out = ImageBuffer::default();
    out.configure(header.width, header.height, header.format, header.palette_size, false)?;
    out.data_mut().copy_from_slice(body);
    out.flags = header.image_flags;
    Ok(out)
}

pub(crate) fn encode_to<W: Write>(image: &ImageBuffer, out: &mut W, stop: &dyn Stop) -> Result<(), TexError> {
    if image.format() == PixelFormat::Unknown {
        return Err(TexError::UnsupportedVariant(
            "JTEX encode of an Unknown buffer".into(),
        ));
    }
    stop.check()?;
    out.write_all(&MAGIC)?;
    for field in [
        CONTAINER_FLAGS,
        image.width(),
        image.height(),
        image.format().tag(),
        image.palette_size(),
        image.flags,
    ] {
        out.write_all(&field.to_le_bytes())?;
    }
    out.write_all(image.data())?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn encode(image: &ImageBuffer, stop: &dyn Stop) -> Result<alloc::vec::Vec<u8>, TexError> {
    let mut out = alloc::vec::Vec::with_capacity(HEADER_LEN + image.data().len());
    encode_to(image, &mut out, stop)?;
    Ok(out)
}
