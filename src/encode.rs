use alloc::vec::Vec;
use std::io::Write;

use enough::Stop;

use crate::buffer::ImageBuffer;
use crate::error::TexError;
use crate::info::ImageFormat;
use crate::png::PngConfig;

/// Builder for a single encode.
#[derive(Clone, Debug)]
pub struct EncodeRequest {
    format: ImageFormat,
    png: PngConfig,
}

impl EncodeRequest {
    pub fn new(format: ImageFormat) -> Self {
        Self {
            format,
            png: PngConfig::default(),
        }
    }

    pub fn png() -> Self {
        Self::new(ImageFormat::Png)
    }

    pub fn bmp() -> Self {
        Self::new(ImageFormat::Bmp)
    }

    pub fn dds() -> Self {
        Self::new(ImageFormat::Dds)
    }

    pub fn jtex() -> Self {
        Self::new(ImageFormat::Jtex)
    }

    /// PNG zlib level, 0-9. Ignored by other formats.
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.png.compression_level = level;
        self
    }

    /// Maximum payload of each PNG `IDAT` chunk. Ignored by other formats.
    pub fn with_idat_chunk_size(mut self, bytes: usize) -> Self {
        self.png.idat_chunk_size = bytes;
        self
    }

    /// Encode into a new byte vector.
    pub fn encode(&self, image: &ImageBuffer, stop: impl Stop) -> Result<Vec<u8>, TexError> {
        let mut out = Vec::new();
        self.encode_dyn(image, &mut out, &stop)?;
        Ok(out)
    }

    /// Encode into `writer`. On failure the writer may hold a partial file.
    pub fn encode_to<W: Write>(&self, image: &ImageBuffer, writer: &mut W, stop: impl Stop) -> Result<(), TexError> {
        self.encode_dyn(image, writer, &stop)
    }

    fn encode_dyn<W: Write>(&self, image: &ImageBuffer, out: &mut W, stop: &dyn Stop) -> Result<(), TexError> {
        tracing::debug!(
            format = ?self.format,
            width = image.width(),
            height = image.height(),
            pixel_format = ?image.format(),
            "encoding"
        );
        match self.format {
            ImageFormat::Png => crate::png::encode_to(image, &self.png, out, stop),
            ImageFormat::Bmp => crate::bmp::encode_to(image, out, stop),
            ImageFormat::Dds => crate::dds::encode_to(image, out, stop),
            ImageFormat::Jtex => crate::jtex::encode_to(image, out, stop),
            ImageFormat::Dxt1 | ImageFormat::Dxt5 => Err(TexError::UnsupportedVariant(
                alloc::format!("{:?} encode", self.format),
            )),
        }
    }
}

/// Encode `image` as `format` with default options.
pub fn encode(image: &ImageBuffer, format: ImageFormat, stop: impl Stop) -> Result<Vec<u8>, TexError> {
    EncodeRequest::new(format).encode(image, stop)
}
