use std::io::{Read, Seek, SeekFrom};

use crate::error::TexError;
use crate::pixel::PixelFormat;
use crate::sniff::{FileKind, sniff};

/// Container or raw stream format handled by this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Png,
    Bmp,
    Dds,
    Jtex,
    /// Raw DXT1 blocks. Decode only; dimensions must be supplied.
    Dxt1,
    /// Raw DXT5 blocks. Decode only; dimensions must be supplied.
    Dxt5,
}

impl ImageFormat {
    /// Map a sniffed file kind to a decodable format.
    ///
    /// Kinds that are recognized but not decoded here (JPEG, GIF, WebP,
    /// WAV, ICO) are [`TexError::UnsupportedVariant`]; anything else is
    /// [`TexError::UnrecognizedFormat`].
    pub fn from_kind(kind: FileKind) -> Result<Self, TexError> {
        match kind {
            FileKind::Png => Ok(Self::Png),
            FileKind::Bmp => Ok(Self::Bmp),
            FileKind::Dds => Ok(Self::Dds),
            FileKind::Jtex => Ok(Self::Jtex),
            FileKind::Jpeg | FileKind::Gif | FileKind::Webp | FileKind::Wav | FileKind::Ico => Err(
                TexError::UnsupportedVariant(alloc::format!("{kind:?} is detected but not decoded")),
            ),
            FileKind::Binary | FileKind::Text | FileKind::Json => Err(TexError::UnrecognizedFormat),
        }
    }

    /// Sniff `data` and map the result with [`ImageFormat::from_kind`].
    pub fn detect(data: &[u8]) -> Result<Self, TexError> {
        let kind = sniff(data);
        tracing::trace!(?kind, "sniffed input");
        Self::from_kind(kind)
    }

    /// Whether this crate can write the format.
    pub fn can_encode(self) -> bool {
        !matches!(self, Self::Dxt1 | Self::Dxt5)
    }
}

/// Image metadata obtained from the header alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    /// Pixel format a plain decode produces.
    pub pixel_format: PixelFormat,
}

/// Bytes read from a stream for header probing. Enough for every header
/// this crate parses, including a BMP V5 info header with its masks.
const PROBE_LEN: u64 = 256;

impl ImageInfo {
    /// Probe the header, sniffing the format.
    pub fn from_bytes(data: &[u8]) -> Result<Self, TexError> {
        Self::from_bytes_as(data, ImageFormat::detect(data)?)
    }

    /// Probe the header of a known format. Raw DXT streams have no header
    /// and always fail with [`TexError::InvalidHeader`].
    pub fn from_bytes_as(data: &[u8], format: ImageFormat) -> Result<Self, TexError> {
        let (width, height, pixel_format) = match format {
            ImageFormat::Png => crate::png::probe(data)?,
            ImageFormat::Bmp => crate::bmp::probe(data)?,
            ImageFormat::Dds => crate::dds::probe(data)?,
            ImageFormat::Jtex => crate::jtex::probe(data)?,
            ImageFormat::Dxt1 | ImageFormat::Dxt5 => {
                return Err(TexError::InvalidHeader(
                    "raw DXT data has no header to probe".into(),
                ));
            }
        };
        Ok(Self {
            width,
            height,
            format,
            pixel_format,
        })
    }

    /// Probe a stream. Its position is restored afterwards.
    pub fn from_reader<R: Read + Seek>(reader: &mut R) -> Result<Self, TexError> {
        let start = reader.stream_position()?;
        let mut head = alloc::vec::Vec::new();
        let read = reader.by_ref().take(PROBE_LEN).read_to_end(&mut head);
        reader.seek(SeekFrom::Start(start))?;
        read?;
        Self::from_bytes(&head)
    }
}

/// Sniff and probe `data`.
pub fn probe(data: &[u8]) -> Result<ImageInfo, TexError> {
    ImageInfo::from_bytes(data)
}
