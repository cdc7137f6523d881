//! BMP decoder and encoder (internal).
//!
//! Use [`crate::DecodeRequest`] and [`crate::EncodeRequest`].

mod decode;
mod encode;

use crate::buffer::ImageBuffer;
use crate::error::TexError;
use crate::limits::Limits;
use crate::pixel::PixelFormat;
use enough::Stop;
use std::io::Write;

/// Width, height and decoded pixel format from the headers.
pub(crate) fn probe(data: &[u8]) -> Result<(u32, u32, PixelFormat), TexError> {
    let header = decode::parse_header(data)?;
    Ok((header.width, header.height, header.format))
}

pub(crate) fn decode(data: &[u8], limits: Option<&Limits>, stop: &dyn Stop) -> Result<ImageBuffer, TexError> {
    decode::decode_bmp(data, limits, stop)
}

pub(crate) fn encode_to<W: Write>(image: &ImageBuffer, out: &mut W, stop: &dyn Stop) -> Result<(), TexError> {
    encode::encode_bmp(image, out, stop)
}

#[cfg(test)]
pub(crate) fn encode(image: &ImageBuffer, stop: &dyn Stop) -> Result<alloc::vec::Vec<u8>, TexError> {
    let mut out = alloc::vec::Vec::new();
    encode::encode_bmp(image, &mut out, stop)?;
    Ok(out)
}
