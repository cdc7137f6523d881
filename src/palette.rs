//! Incremental palette construction for truecolor → indexed conversion.
//!
//! [`PaletteBuilder`] is fed one pixel at a time (e.g. while a PNG decodes
//! row by row) and hands back each pixel's palette index. It keeps every
//! distinct color exactly once, in first-seen order; this is lossless except
//! that pixels with `alpha <= alpha_clip` all collapse to transparent black.
//! Up to 256 colors target [`PixelFormat::Indexed8`], up to 65536 target
//! [`PixelFormat::Indexed16`]; beyond that the builder fails and the caller
//! keeps its truecolor image.

use alloc::vec::Vec;
use std::collections::{HashMap, HashSet};

use enough::Stop;

use crate::buffer::ImageBuffer;
use crate::error::TexError;
use crate::pixel::PixelFormat;

/// Size of the recently-used color ring.
pub const RECENT_COLORS: usize = 8;

/// Most colors a palette can hold.
pub const MAX_COLORS: usize = 65536;

/// Above this pixel count [`quantize`] switches to [`HashLookup`].
const HASH_THRESHOLD: usize = 1 << 16;

const TRANSPARENT: u32 = 0;

/// Color → index lookup used behind the recent-color ring.
pub trait ColorLookup: Default {
    fn find(&self, colors: &[u32], color: u32) -> Option<u16>;
    fn insert(&mut self, color: u32, index: u16);
}

/// Linear scan of the palette. No extra memory, O(colors) per miss.
#[derive(Clone, Copy, Debug, Default)]
pub struct LinearScan;

impl ColorLookup for LinearScan {
    fn find(&self, colors: &[u32], color: u32) -> Option<u16> {
        colors.iter().position(|&c| c == color).map(|i| i as u16)
    }

    fn insert(&mut self, _color: u32, _index: u16) {}
}

/// Hash-map lookup. Same results as [`LinearScan`], O(1) per miss.
#[derive(Clone, Debug, Default)]
pub struct HashLookup {
    map: HashMap<u32, u16>,
}

impl ColorLookup for HashLookup {
    fn find(&self, _colors: &[u32], color: u32) -> Option<u16> {
        self.map.get(&color).copied()
    }

    fn insert(&mut self, color: u32, index: u16) {
        self.map.insert(color, index);
    }
}

/// Streaming palette builder.
#[derive(Clone, Debug)]
pub struct PaletteBuilder<L: ColorLookup = LinearScan> {
    colors: Vec<u32>,
    lookup: L,
    recent: [(u32, u16); RECENT_COLORS],
    recent_len: usize,
    recent_next: usize,
    offered: u64,
    format: PixelFormat,
    overflowed: bool,
}

impl Default for PaletteBuilder<LinearScan> {
    fn default() -> Self {
        Self::new()
    }
}

impl PaletteBuilder<LinearScan> {
    pub fn new() -> Self {
        Self::with_lookup()
    }
}

impl<L: ColorLookup> PaletteBuilder<L> {
    /// Builder using lookup strategy `L`.
    pub fn with_lookup() -> Self {
        Self {
            colors: Vec::new(),
            lookup: L::default(),
            recent: [(0, 0); RECENT_COLORS],
            recent_len: 0,
            recent_next: 0,
            offered: 0,
            format: PixelFormat::Indexed8,
            overflowed: false,
        }
    }

    /// Distinct colors collected so far.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Pixels offered so far, including ones that hit existing entries.
    pub fn offered(&self) -> u64 {
        self.offered
    }

    /// Indexed format the current palette fits in.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Whether an earlier `offer` overflowed the palette.
    pub fn has_overflowed(&self) -> bool {
        self.overflowed
    }

    /// Palette entries as RGBA, in index order.
    pub fn colors(&self) -> impl Iterator<Item = [u8; 4]> + '_ {
        self.colors.iter().map(|c| c.to_le_bytes())
    }

    /// Add one pixel and return its palette index.
    ///
    /// Pixels with `alpha <= alpha_clip` are stored as `(0, 0, 0, 0)`.
    /// Fails with [`TexError::PaletteOverflow`] when a 65537th color shows
    /// up; the builder then stays failed and its format is left at
    /// `Indexed16`.
    pub fn offer(&mut self, pixel: [u8; 4], alpha_clip: u8) -> Result<u16, TexError> {
        if self.overflowed {
            return Err(TexError::PaletteOverflow { limit: MAX_COLORS });
        }
        self.offered += 1;
        let color = if pixel[3] <= alpha_clip {
            TRANSPARENT
        } else {
            u32::from_le_bytes(pixel)
        };

        if let Some(&(_, index)) = self.recent[..self.recent_len]
            .iter()
            .find(|(c, _)| *c == color)
        {
            return Ok(index);
        }

        let index = match self.lookup.find(&self.colors, color) {
            Some(index) => index,
            None => self.append(color)?,
        };
        self.remember(color, index);
        Ok(index)
    }

    fn append(&mut self, color: u32) -> Result<u16, TexError> {
        if self.colors.len() >= MAX_COLORS {
            self.overflowed = true;
            tracing::debug!(
                offered = self.offered,
                "palette overflow, abandoning quantization"
            );
            return Err(TexError::PaletteOverflow { limit: MAX_COLORS });
        }
        let index = self.colors.len() as u16;
        self.colors.push(color);
        self.lookup.insert(color, index);
        if self.colors.len() == 257 {
            tracing::debug!("palette exceeds 256 colors, promoting to Indexed16");
            self.format = PixelFormat::Indexed16;
        }
        Ok(index)
    }

    fn remember(&mut self, color: u32, index: u16) {
        self.recent[self.recent_next] = (color, index);
        self.recent_next = (self.recent_next + 1) % RECENT_COLORS;
        self.recent_len = (self.recent_len + 1).min(RECENT_COLORS);
    }

    /// Offer every pixel of one row, appending indices to `indices`.
    pub fn offer_row(
        &mut self,
        row: &[u8],
        format: PixelFormat,
        alpha_clip: u8,
        indices: &mut Vec<u16>,
    ) -> Result<(), TexError> {
        match format {
            PixelFormat::R8 => {
                for &v in row {
                    indices.push(self.offer([v, v, v, 255], alpha_clip)?);
                }
            }
            PixelFormat::Rgb24 => {
                for px in row.chunks_exact(3) {
                    indices.push(self.offer([px[0], px[1], px[2], 255], alpha_clip)?);
                }
            }
            PixelFormat::Rgba32 => {
                for px in row.chunks_exact(4) {
                    indices.push(self.offer([px[0], px[1], px[2], px[3]], alpha_clip)?);
                }
            }
            other => {
                return Err(TexError::UnsupportedVariant(alloc::format!(
                    "cannot build a palette from {other:?}"
                )));
            }
        }
        Ok(())
    }

    /// Assemble an indexed image from the collected palette and per-pixel
    /// indices (row-major, one per pixel).
    pub fn finish(&self, width: u32, height: u32, indices: &[u16]) -> Result<ImageBuffer, TexError> {
        let count = width as usize * height as usize;
        if indices.len() != count {
            return Err(TexError::BufferTooSmall {
                needed: count,
                actual: indices.len(),
            });
        }
        let mut out = ImageBuffer::with_palette_size(width, height, self.format, self.len() as u32)?;
        for (entry, color) in out.palette_mut().chunks_exact_mut(4).zip(self.colors()) {
            entry.copy_from_slice(&color);
        }
        match self.format {
            PixelFormat::Indexed8 => {
                for (dst, &index) in out.pixels_mut().iter_mut().zip(indices) {
                    *dst = index as u8;
                }
            }
            _ => {
                for (dst, &index) in out.pixels_mut().chunks_exact_mut(2).zip(indices) {
                    dst.copy_from_slice(&index.to_le_bytes());
                }
            }
        }
        Ok(out)
    }
}

/// Convert a truecolor image (`R8`, `Rgb24`, `Rgba32`) to an indexed one.
///
/// `image` is never modified. Fails with [`TexError::PaletteOverflow`]
/// when the image has more than 65536 distinct colors.
pub fn quantize(image: &ImageBuffer, alpha_clip: u8, stop: impl Stop) -> Result<ImageBuffer, TexError> {
    quantize_auto(image, alpha_clip, &stop)
}

pub(crate) fn quantize_auto(image: &ImageBuffer, alpha_clip: u8, stop: &dyn Stop) -> Result<ImageBuffer, TexError> {
    let pixels = image.width() as usize * image.height() as usize;
    if pixels > HASH_THRESHOLD {
        quantize_with::<HashLookup>(image, alpha_clip, stop)
    } else {
        quantize_with::<LinearScan>(image, alpha_clip, stop)
    }
}

/// [`quantize`] with an explicit lookup strategy.
pub fn quantize_with<L: ColorLookup>(
    image: &ImageBuffer,
    alpha_clip: u8,
    stop: &dyn Stop,
) -> Result<ImageBuffer, TexError> {
    let format = image.format();
    if !matches!(format, PixelFormat::R8 | PixelFormat::Rgb24 | PixelFormat::Rgba32) {
        return Err(TexError::UnsupportedVariant(alloc::format!(
            "cannot quantize {format:?}"
        )));
    }
    let row_bytes = image.width() as usize * format.bytes_per_pixel();
    let mut builder = PaletteBuilder::<L>::with_lookup();
    let mut indices = Vec::new();
    indices
        .try_reserve_exact(image.width() as usize * image.height() as usize)
        .map_err(|_| TexError::AllocationFailed(image.pixels().len() * 2))?;
    if row_bytes > 0 {
        for (y, row) in image.pixels().chunks_exact(row_bytes).enumerate() {
            if y % 16 == 0 {
                stop.check()?;
            }
            builder.offer_row(row, format, alpha_clip, &mut indices)?;
        }
    }
    let mut out = builder.finish(image.width(), image.height(), &indices)?;
    out.flags = image.flags;
    Ok(out)
}

/// Replace `image` with its indexed form; on failure `image` is untouched.
pub fn quantize_in_place(image: &mut ImageBuffer, alpha_clip: u8, stop: impl Stop) -> Result<(), TexError> {
    let indexed = quantize(image, alpha_clip, stop)?;
    *image = indexed;
    Ok(())
}

/// Ratio of distinct colors to sampled pixels, scaled to 0..=255.
///
/// 0 means every sampled pixel has the same color, 255 that every one is
/// unique. With `ignore_transparent` fully transparent pixels are skipped.
pub fn color_variance(image: &ImageBuffer, ignore_transparent: bool) -> u8 {
    let count = image.width() as usize * image.height() as usize;
    let mut seen = HashSet::new();
    let mut sampled = 0usize;
    for i in 0..count {
        let rgba = image.rgba_at(i);
        if ignore_transparent && rgba[3] == 0 {
            continue;
        }
        sampled += 1;
        seen.insert(u32::from_le_bytes(rgba));
    }
    if sampled <= 1 {
        return 0;
    }
    ((seen.len() - 1) * 255 / (sampled - 1)) as u8
}
