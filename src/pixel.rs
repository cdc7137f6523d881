use crate::error::TexError;

/// Entries in one Indexed16 palette page.
pub const PALETTE_PAGE: u32 = 256;

/// Largest palette an indexed buffer can carry.
pub const MAX_PALETTE: u32 = 65536;

/// Pixel storage format of an [`ImageBuffer`](crate::ImageBuffer).
///
/// 16-bit channel samples (`Rgb48`, `Rgba64`) are stored in native byte
/// order. Only the indexed formats carry a palette.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Single 8-bit channel.
    R8,
    /// 3 channels, 8-bit RGB.
    Rgb24,
    /// 3 channels, 16-bit RGB (native endian).
    Rgb48,
    /// 4 channels, 8-bit RGBA.
    Rgba32,
    /// 4 channels, 16-bit RGBA (native endian).
    Rgba64,
    /// 256-entry RGBA palette followed by one `u8` index per pixel.
    Indexed8,
    /// Paged RGBA palette followed by one little-endian `u16` index per pixel.
    Indexed16,
    #[default]
    Unknown,
}

impl PixelFormat {
    /// Bits per pixel (for indexed formats, bits per index).
    pub const fn bits_per_pixel(self) -> u32 {
        match self {
            Self::R8 | Self::Indexed8 => 8,
            Self::Indexed16 => 16,
            Self::Rgb24 => 24,
            Self::Rgba32 => 32,
            Self::Rgb48 => 48,
            Self::Rgba64 => 64,
            Self::Unknown => 0,
        }
    }

    /// Bytes per pixel (for indexed formats, bytes per index).
    pub const fn bytes_per_pixel(self) -> usize {
        self.bits_per_pixel() as usize / 8
    }

    /// Bytes per channel sample.
    pub const fn bytes_per_channel(self) -> usize {
        match self {
            Self::R8 | Self::Rgb24 | Self::Rgba32 | Self::Indexed8 => 1,
            Self::Rgb48 | Self::Rgba64 | Self::Indexed16 => 2,
            Self::Unknown => 0,
        }
    }

    /// Number of channels stored per pixel.
    pub const fn channels(self) -> usize {
        match self {
            Self::R8 | Self::Indexed8 | Self::Indexed16 => 1,
            Self::Rgb24 | Self::Rgb48 => 3,
            Self::Rgba32 | Self::Rgba64 => 4,
            Self::Unknown => 0,
        }
    }

    pub const fn is_indexed(self) -> bool {
        matches!(self, Self::Indexed8 | Self::Indexed16)
    }

    pub const fn has_alpha(self) -> bool {
        matches!(self, Self::Rgba32 | Self::Rgba64)
    }

    /// Numeric tag used by the JTEX container.
    pub const fn tag(self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::R8 => 1,
            Self::Rgb24 => 2,
            Self::Rgb48 => 3,
            Self::Rgba32 => 4,
            Self::Rgba64 => 5,
            Self::Indexed8 => 6,
            Self::Indexed16 => 7,
        }
    }

    pub const fn from_tag(tag: u32) -> Option<Self> {
        Some(match tag {
            0 => Self::Unknown,
            1 => Self::R8,
            2 => Self::Rgb24,
            3 => Self::Rgb48,
            4 => Self::Rgba32,
            5 => Self::Rgba64,
            6 => Self::Indexed8,
            7 => Self::Indexed16,
            _ => return None,
        })
    }

    /// Palette entry count actually stored for this format given a
    /// requested size: 256 for `Indexed8`, the next page multiple (capped at
    /// 65536) for `Indexed16`, 0 otherwise.
    pub const fn stored_palette_size(self, requested: u32) -> u32 {
        match self {
            Self::Indexed8 => PALETTE_PAGE,
            Self::Indexed16 => {
                let pages = requested.div_ceil(PALETTE_PAGE);
                let size = if pages == 0 { PALETTE_PAGE } else { pages * PALETTE_PAGE };
                if size > MAX_PALETTE { MAX_PALETTE } else { size }
            }
            _ => 0,
        }
    }
}

/// Number of bytes an image of this format and size occupies, including
/// the palette head for indexed formats.
pub fn size_in_bytes(
    format: PixelFormat,
    width: u32,
    height: u32,
    palette_size: u32,
) -> Result<usize, TexError> {
    let too_large = TexError::DimensionsTooLarge { width, height };
    if format == PixelFormat::Unknown {
        return Err(TexError::UnsupportedVariant(
            "cannot size a buffer of unknown pixel format".into(),
        ));
    }
    let pixels = (width as usize)
        .checked_mul(height as usize)
        .and_then(|px| px.checked_mul(format.bytes_per_pixel()))
        .ok_or(too_large)?;
    let palette = format.stored_palette_size(palette_size) as usize * 4;
    pixels
        .checked_add(palette)
        .ok_or(TexError::DimensionsTooLarge { width, height })
}

/// Pixel types that can view an `ImageBuffer`'s truecolor data.
#[cfg(feature = "rgb")]
pub trait DecodePixel: Copy + 'static {
    fn pixel_format() -> PixelFormat;
}

#[cfg(feature = "rgb")]
impl DecodePixel for rgb::RGB8 {
    fn pixel_format() -> PixelFormat {
        PixelFormat::Rgb24
    }
}

#[cfg(feature = "rgb")]
impl DecodePixel for rgb::RGBA8 {
    fn pixel_format() -> PixelFormat {
        PixelFormat::Rgba32
    }
}

#[cfg(feature = "rgb")]
impl DecodePixel for rgb::RGB16 {
    fn pixel_format() -> PixelFormat {
        PixelFormat::Rgb48
    }
}

#[cfg(feature = "rgb")]
impl DecodePixel for rgb::RGBA16 {
    fn pixel_format() -> PixelFormat {
        PixelFormat::Rgba64
    }
}
