//! # zentex
//!
//! Texture and bitmap codecs plus a lossless palette builder.
//!
//! ## Supported Formats
//!
//! - **PNG**: decode of non-interlaced 8/16-bit grayscale, RGB, RGBA and
//!   8-bit palette images; encode of 8-bit grayscale, RGB, RGBA and palette
//!   with per-row adaptive filtering
//! - **BMP**: 8-bit palette, 24-bit and 32-bit, uncompressed or bit-field
//! - **DDS**: uncompressed 16/24/32-bit surfaces (block-compressed DDS is
//!   detected and reported as unsupported)
//! - **DXT1 / DXT5**: decode of raw block streams
//! - **JTEX**: a raw dump of an [`ImageBuffer`]
//!
//! JPEG, GIF, WebP, WAV and ICO are recognized by [`sniff()`] but not decoded.
//!
//! ## Palettes
//!
//! [`palette::PaletteBuilder`] turns truecolor pixels into an indexed
//! image without losing colors: up to 256 distinct colors produce
//! [`PixelFormat::Indexed8`], up to 65536 produce
//! [`PixelFormat::Indexed16`]. PNG decode can build the palette while rows
//! are reconstructed (see [`DecodeRequest::with_palette`]).
//!
//! ## Non-Goals
//!
//! - PNG interlacing and 16-bit PNG encode
//! - DXT encode
//! - Color management
//!
//! ## Usage
//!
//! ```no_run
//! use zentex::{DecodeRequest, EncodeRequest, ImageInfo, Unstoppable};
//!
//! let data: &[u8] = &[]; // PNG/BMP/DDS/JTEX bytes
//!
//! // Probe without decoding
//! let info = ImageInfo::from_bytes(data)?;
//! println!("{}x{} {:?} -> {:?}", info.width, info.height, info.format, info.pixel_format);
//!
//! // Decode, converting to an indexed image when the colors fit
//! let image = DecodeRequest::new(data)
//!     .with_palette(0)
//!     .decode(Unstoppable)?;
//!
//! // Encode to PNG
//! let png = EncodeRequest::png()
//!     .with_compression_level(9)
//!     .encode(&image, Unstoppable)?;
//! # Ok::<(), zentex::TexError>(())
//! ```

#![forbid(unsafe_code)]

extern crate alloc;

mod bitmask;
mod buffer;
mod cursor;
mod error;
mod info;
mod limits;
mod pixel;

mod bmp;
mod dds;
pub mod dxt;
mod jtex;
pub mod palette;
pub mod png;
pub mod sniff;

mod decode;
mod encode;

// Re-exports
pub use buffer::ImageBuffer;
pub use decode::{DecodeRequest, decode, decode_reader};
pub use encode::{EncodeRequest, encode};
pub use enough::{Stop, Unstoppable};
pub use error::TexError;
pub use info::{ImageFormat, ImageInfo, probe};
pub use limits::Limits;
#[cfg(feature = "rgb")]
pub use pixel::DecodePixel;
pub use pixel::{MAX_PALETTE, PALETTE_PAGE, PixelFormat, size_in_bytes};
pub use sniff::{FileKind, sniff};
