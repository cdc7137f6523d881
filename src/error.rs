use alloc::string::String;
use enough::StopReason;

use crate::pixel::PixelFormat;

/// Errors from decoding, encoding, sniffing and quantization.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TexError {
    #[error("unrecognized format magic bytes")]
    UnrecognizedFormat,

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The format was recognized but this variant of it is not handled
    /// (compressed DDS, interlaced PNG, DXT encode, JPEG decode, ...).
    #[error("unsupported format variant: {0}")]
    UnsupportedVariant(String),

    #[error("invalid pixel data: {0}")]
    InvalidData(String),

    #[error("dimensions too large: {width}x{height}")]
    DimensionsTooLarge { width: u32, height: u32 },

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("allocation of {0} bytes failed")]
    AllocationFailed(usize),

    /// The palette would need more than 65536 colors.
    #[error("palette overflow: more than {limit} distinct colors")]
    PaletteOverflow { limit: usize },

    #[error("pixel format mismatch: expected {expected:?}, got {actual:?}")]
    FormatMismatch {
        expected: PixelFormat,
        actual: PixelFormat,
    },

    #[error("buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation cancelled")]
    Cancelled(StopReason),
}

impl From<StopReason> for TexError {
    fn from(r: StopReason) -> Self {
        TexError::Cancelled(r)
    }
}

impl TexError {
    /// Whether this error means "right format, unhandled variant" rather
    /// than "not this format" or "broken file".
    pub fn is_unsupported(&self) -> bool {
        matches!(self, TexError::UnsupportedVariant(_))
    }
}
