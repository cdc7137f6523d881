//! Uncompressed DDS decoder and encoder (internal).
//!
//! Only the top-level surface of RGB(A) textures is read; mipmaps and cube
//! faces after it are ignored. Block-compressed (FourCC) payloads are
//! recognized and reported as unsupported.
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

pub(crate) const MAGIC: [u8; 4] = *b"DDS ";
pub(crate) const HEADER_LEN: u32 = 124;
pub(crate) const PIXEL_FORMAT_LEN: u32 = 32;

// DDS_HEADER.dwFlags
pub(crate) const DDSD_CAPS: u32 = 0x1;
pub(crate) const DDSD_HEIGHT: u32 = 0x2;
pub(crate) const DDSD_WIDTH: u32 = 0x4;
pub(crate) const DDSD_PITCH: u32 = 0x8;
pub(crate) const DDSD_PIXELFORMAT: u32 = 0x1000;

// DDS_PIXELFORMAT.dwFlags
pub(crate) const DDPF_ALPHAPIXELS: u32 = 0x1;
pub(crate) const DDPF_FOURCC: u32 = 0x4;
pub(crate) const DDPF_RGB: u32 = 0x40;

pub(crate) const DDSCAPS_TEXTURE: u32 = 0x1000;

pub(crate) fn probe(data: &[u8]) -> Result<(u32, u32, PixelFormat), TexError> {
    let header = decode::parse_header(data)?;
    Ok((header.width, header.height, header.format))
}

pub(crate) fn decode(data: &[u8], limits: Option<&Limits>, stop: &dyn Stop) -> Result<ImageBuffer, TexError> {
    decode::decode_dds(data, limits, stop)
}

pub(crate) fn encode_to<W: Write>(image: &ImageBuffer, out: &mut W, stop: &dyn Stop) -> Result<(), TexError> {
    encode::encode_dds(image, out, stop)
}

#[cfg(test)]
pub(crate) fn encode(image: &ImageBuffer, stop: &dyn Stop) -> Result<alloc::vec::Vec<u8>, TexError> {
    let mut out = alloc::vec::Vec::new();
    encode::encode_dds(image, &mut out, stop)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use enough::Unstoppable;

    #[test]
    fn rgba_roundtrip() {
        let pixels = alloc::vec![1, 2, 3, 4, 250, 251, 252, 253];
        let image = ImageBuffer::from_pixels(1, 2, PixelFormat::Rgba32, pixels).unwrap();
        let bytes = encode(&image, &Unstoppable).unwrap();
        assert_eq!(bytes.len(), 4 + 124 + 8);
        assert_eq!(probe(&bytes).unwrap(), (1, 2, PixelFormat::Rgba32));
        assert_eq!(decode(&bytes, None, &Unstoppable).unwrap(), image);
    }

    #[test]
    fn rgb_roundtrip() {
        let pixels = alloc::vec![10, 20, 30, 40, 50, 60, 70, 80, 90];
        let image = ImageBuffer::from_pixels(3, 1, PixelFormat::Rgb24, pixels).unwrap();
        let bytes = encode(&image, &Unstoppable).unwrap();
        assert_eq!(decode(&bytes, None, &Unstoppable).unwrap(), image);
    }

    #[test]
    fn gray_is_unsupported() {
        let image = ImageBuffer::new(1, 1, PixelFormat::R8).unwrap();
        assert!(encode(&image, &Unstoppable).unwrap_err().is_unsupported());
    }
}
