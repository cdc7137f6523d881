use alloc::vec::Vec;
use std::io::{Read, Seek};

use enough::Stop;

use crate::buffer::ImageBuffer;
use crate::dxt::BlockFormat;
use crate::error::TexError;
use crate::info::ImageFormat;
use crate::limits::Limits;
use crate::palette::quantize_auto;
use crate::pixel::PixelFormat;

/// Builder for a single decode.
///
/// ```no_run
/// use zentex::{DecodeRequest, ImageFormat, Limits, Unstoppable};
///
/// let data: &[u8] = &[]; // DXT5 blocks
/// let image = DecodeRequest::new(data)
///     .with_format(ImageFormat::Dxt5)
///     .with_dimensions(256, 256)
///     .with_limits(Limits { max_pixels: Some(1 << 20), ..Limits::default() })
///     .decode(Unstoppable)?;
/// # Ok::<(), zentex::TexError>(())
/// ```
#[derive(Clone, Debug)]
pub struct DecodeRequest<'a> {
    data: &'a [u8],
    format: Option<ImageFormat>,
    limits: Option<Limits>,
    dimensions: Option<(u32, u32)>,
    palette_clip: Option<u8>,
}

impl<'a> DecodeRequest<'a> {
    /// Decode `data`, sniffing its format unless [`with_format`] is used.
    ///
    /// [`with_format`]: DecodeRequest::with_format
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            format: None,
            limits: None,
            dimensions: None,
            palette_clip: None,
        }
    }

    /// Skip sniffing and decode as `format`.
    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Image size for raw DXT streams, which carry no header.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Some((width, height));
        self
    }

    /// Convert 8-bit gray, RGB and RGBA results to an indexed image when
    /// they have at most 65536 colors. 16-bit and already indexed results
    /// are returned as decoded. Pixels with `alpha <= alpha_clip` become
    /// transparent black. Images with more colors stay truecolor.
    pub fn with_palette(mut self, alpha_clip: u8) -> Self {
        self.palette_clip = Some(alpha_clip);
        self
    }

    /// Decode into a new buffer.
    pub fn decode(self, stop: impl Stop) -> Result<ImageBuffer, TexError> {
        self.decode_dyn(&stop)
    }

    /// Decode and replace `target`. On failure `target` is left exactly as
    /// it was.
    pub fn decode_into(self, target: &mut ImageBuffer, stop: impl Stop) -> Result<(), TexError> {
        let decoded = self.decode_dyn(&stop)?;
        *target = decoded;
        Ok(())
    }

    fn decode_dyn(self, stop: &dyn Stop) -> Result<ImageBuffer, TexError> {
        let format = match self.format {
            Some(f) => f,
            None => ImageFormat::detect(self.data)?,
        };
        let limits = self.limits.as_ref();
        let image = match format {
            ImageFormat::Png => crate::png::decode(self.data, limits, self.palette_clip, stop)?,
            ImageFormat::Bmp => crate::bmp::decode(self.data, limits, stop)?,
            ImageFormat::Dds => crate::dds::decode(self.data, limits, stop)?,
            ImageFormat::Jtex => crate::jtex::decode(self.data, limits, stop)?,
            ImageFormat::Dxt1 | ImageFormat::Dxt5 => {
                let (width, height) = self.dimensions.ok_or_else(|| {
                    TexError::InvalidHeader("raw DXT data needs with_dimensions".into())
                })?;
                let block = if format == ImageFormat::Dxt1 {
                    BlockFormat::Dxt1
                } else {
                    BlockFormat::Dxt5
                };
                crate::dxt::decode(block, self.data, width, height, limits, stop)?
            }
        };
        tracing::debug!(
            ?format,
            width = image.width(),
            height = image.height(),
            pixel_format = ?image.format(),
            "decoded"
        );

        // PNG builds its palette while decoding.
        match self.palette_clip {
            Some(clip) if format != ImageFormat::Png => palettize(image, clip, stop),
            _ => Ok(image),
        }
    }
}

/// Quantize `image` if it is 8-bit gray or RGB(A) and fits a palette; otherwise
/// return it unchanged. Only cancellation is an error.
fn palettize(image: ImageBuffer, alpha_clip: u8, stop: &dyn Stop) -> Result<ImageBuffer, TexError> {
    if !matches!(image.format(), PixelFormat::R8 | PixelFormat::Rgb24 | PixelFormat::Rgba32) {
        return Ok(image);
    }
    match quantize_auto(&image, alpha_clip, stop) {
        Ok(indexed) => Ok(indexed),
        Err(e @ TexError::Cancelled(_)) => Err(e),
        Err(e) => {
            tracing::debug!(error = %e, "keeping truecolor output");
            Ok(image)
        }
    }
}

/// Sniff and decode `data` with default options.
pub fn decode(data: &[u8], stop: impl Stop) -> Result<ImageBuffer, TexError> {
    DecodeRequest::new(data).decode(stop)
}

/// Read `reader` from its current position to the end, then decode what
/// was read. With `limits.max_memory_bytes` set, reading stops one byte
/// past the limit and fails with [`TexError::LimitExceeded`].
pub fn decode_reader<R: Read + Seek>(
    reader: &mut R,
    limits: Option<Limits>,
    stop: impl Stop,
) -> Result<ImageBuffer, TexError> {
    let mut data = Vec::new();
    match limits.as_ref().and_then(|l| l.max_memory_bytes) {
        Some(max) => {
            reader.by_ref().take(max.saturating_add(1)).read_to_end(&mut data)?;
            if data.len() as u64 > max {
                return Err(TexError::LimitExceeded(alloc::format!(
                    "stream is larger than the {max} byte memory limit"
                )));
            }
        }
        None => {
            reader.read_to_end(&mut data)?;
        }
    }
    let mut request = DecodeRequest::new(&data);
    if let Some(limits) = limits {
        request = request.with_limits(limits);
    }
    request.decode(stop)
}
