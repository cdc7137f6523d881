//! PNG decoder and encoder (internal).
//!
//! Decode covers non-interlaced 8/16-bit grayscale, RGB, RGBA and 8-bit
//! palette images. Encode writes 8-bit grayscale, RGB, RGBA or palette,
//! choosing a filter per row and splitting the zlib stream into `IDAT`
//! chunks as it is produced.
//!
//! Use [`crate::DecodeRequest`] and [`crate::EncodeRequest`].

mod chunk;
mod decode;
mod encode;
pub mod filter;

pub use filter::paeth;

use crate::buffer::ImageBuffer;
use crate::error::TexError;
use crate::limits::Limits;
use crate::pixel::PixelFormat;
use enough::Stop;
use std::io::Write;

pub(crate) const SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Default zlib level for `IDAT` data.
pub const DEFAULT_COMPRESSION: u32 = 6;
/// Default payload size of each `IDAT` chunk.
pub const DEFAULT_IDAT_CHUNK: usize = 32 * 1024;

/// Encoder settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PngConfig {
    /// zlib level, 0 (store) to 9 (best). Larger values are clamped.
    pub compression_level: u32,
    /// Maximum payload bytes per `IDAT` chunk.
    pub idat_chunk_size: usize,
}

impl Default for PngConfig {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION,
            idat_chunk_size: DEFAULT_IDAT_CHUNK,
        }
    }
}

/// Width, height and decoded pixel format from `IHDR`.
pub(crate) fn probe(data: &[u8]) -> Result<(u32, u32, PixelFormat), TexError> {
    let header = decode::parse_header(data)?;
    Ok((header.width, header.height, header.format))
}

pub(crate) fn decode(
    data: &[u8],
    limits: Option<&Limits>,
    palette_clip: Option<u8>,
    stop: &dyn Stop,
) -> Result<ImageBuffer, TexError> {
    decode::decode_png(data, limits, palette_clip, stop)
}

pub(crate) fn encode_to<W: Write>(
    image: &ImageBuffer,
    config: &PngConfig,
    out: &mut W,
    stop: &dyn Stop,
) -> Result<(), TexError> {
    encode::encode_png(image, config, out, stop)
}

#[cfg(test)]
pub(crate) fn encode(image: &ImageBuffer, config: &PngConfig, stop: &dyn Stop) -> Result<alloc::vec::Vec<u8>, TexError> {
    let mut out = alloc::vec::Vec::new();
    encode::encode_png(image, config, &mut out, stop)?;
    Ok(out)
}
