use alloc::vec::Vec;

#[cfg(feature = "rgb")]
use rgb::AsPixels as _;

use crate::error::TexError;
use crate::pixel::{PixelFormat, size_in_bytes};

/// Palette entry written into fresh or padded palette slots.
pub(crate) const OPAQUE_BLACK: [u8; 4] = [0, 0, 0, 255];

/// An owned image: header fields plus one contiguous byte buffer.
///
/// For indexed formats `data` starts with `palette_size` RGBA entries
/// followed by one index per pixel (`u8` for [`PixelFormat::Indexed8`],
/// little-endian `u16` for [`PixelFormat::Indexed16`]). Other formats store
/// `width * height` pixels row-major with no padding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImageBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    palette_size: u32,
    /// Free-form image flags carried through the JTEX container.
    pub flags: u32,
    data: Vec<u8>,
}

impl ImageBuffer {
    /// Allocate a zeroed image. Indexed palettes start as opaque black.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Result<Self, TexError> {
        Self::with_palette_size(width, height, format, 0)
    }

    /// Like [`ImageBuffer::new`] with an explicit palette size for
    /// `Indexed16` (rounded up to a whole palette page).
    pub fn with_palette_size(
        width: u32,
        height: u32,
        format: PixelFormat,
        palette_size: u32,
    ) -> Result<Self, TexError> {
        let mut buf = Self::default();
        buf.configure(width, height, format, palette_size, true)?;
        Ok(buf)
    }

    /// Wrap existing bytes. `data.len()` must equal the size the header
    /// implies.
    pub fn from_raw(
        width: u32,
        height: u32,
        format: PixelFormat,
        palette_size: u32,
        data: Vec<u8>,
    ) -> Result<Self, TexError> {
        let palette_size = format.stored_palette_size(palette_size);
        let needed = size_in_bytes(format, width, height, palette_size)?;
        if data.len() != needed {
            return Err(TexError::BufferTooSmall {
                needed,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            palette_size,
            flags: 0,
            data,
        })
    }

    /// Wrap truecolor pixel bytes.
    pub fn from_pixels(
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: Vec<u8>,
    ) -> Result<Self, TexError> {
        if format.is_indexed() {
            return Err(TexError::UnsupportedVariant(
                "indexed buffers need a palette; use from_raw".into(),
            ));
        }
        Self::from_raw(width, height, format, 0, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Palette entries stored at the head of `data` (0 for truecolor).
    pub fn palette_size(&self) -> u32 {
        self.palette_size
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The whole buffer, palette head included.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Allocated capacity of the backing buffer.
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    fn palette_bytes(&self) -> usize {
        self.palette_size as usize * 4
    }

    /// RGBA palette bytes (empty for truecolor formats).
    pub fn palette(&self) -> &[u8] {
        &self.data[..self.palette_bytes()]
    }

    pub fn palette_mut(&mut self) -> &mut [u8] {
        let n = self.palette_bytes();
        &mut self.data[..n]
    }

    /// Palette entry `index` as RGBA.
    pub fn palette_entry(&self, index: usize) -> [u8; 4] {
        let off = index * 4;
        match self.palette().get(off..off + 4) {
            Some(e) => [e[0], e[1], e[2], e[3]],
            None => OPAQUE_BLACK,
        }
    }

    /// Pixel bytes, or index bytes for indexed formats.
    pub fn pixels(&self) -> &[u8] {
        &self.data[self.palette_bytes()..]
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        let n = self.palette_bytes();
        &mut self.data[n..]
    }

    /// Index bytes of an indexed image; empty for truecolor formats.
    pub fn indices(&self) -> &[u8] {
        if self.format.is_indexed() { self.pixels() } else { &[] }
    }

    /// Palette index of pixel `i` (row-major). Only meaningful for indexed
    /// formats.
    pub fn index_at(&self, i: usize) -> usize {
        let px = self.pixels();
        match self.format {
            PixelFormat::Indexed8 => usize::from(px[i]),
            PixelFormat::Indexed16 => usize::from(u16::from_le_bytes([px[i * 2], px[i * 2 + 1]])),
            _ => 0,
        }
    }

    /// Pixel `i` as RGBA8. 16-bit formats keep the high byte of each sample.
    pub fn rgba_at(&self, i: usize) -> [u8; 4] {
        let px = self.pixels();
        match self.format {
            PixelFormat::R8 => [px[i], px[i], px[i], 255],
            PixelFormat::Rgb24 => {
                let o = i * 3;
                [px[o], px[o + 1], px[o + 2], 255]
            }
            PixelFormat::Rgba32 => {
                let o = i * 4;
                [px[o], px[o + 1], px[o + 2], px[o + 3]]
            }
            PixelFormat::Rgb48 | PixelFormat::Rgba64 => {
                let ch = self.format.channels();
                let o = i * ch * 2;
                let s = |c: usize| (u16::from_ne_bytes([px[o + c * 2], px[o + c * 2 + 1]]) >> 8) as u8;
                let a = if ch == 4 { s(3) } else { 255 };
                [s(0), s(1), s(2), a]
            }
            PixelFormat::Indexed8 | PixelFormat::Indexed16 => {
                self.palette_entry(self.index_at(i))
            }
            PixelFormat::Unknown => [0, 0, 0, 0],
        }
    }

    /// Grow-or-reuse the backing allocation to exactly `required` bytes.
    ///
    /// Reuses the current allocation when it is large enough. With `clear`
    /// the whole buffer is zeroed; otherwise the existing prefix is kept and
    /// any new tail is zeroed. On failure the buffer is left unchanged.
    ///
    /// When `required` is not the size the current header describes, the
    /// header is reset to a 0x0 [`PixelFormat::Unknown`] image so the
    /// bytes are never read with the old layout.
    pub fn allocate(&mut self, required: usize, clear: bool) -> Result<(), TexError> {
        if required > self.data.capacity() {
            self.data
                .try_reserve_exact(required - self.data.len())
                .map_err(|_| TexError::AllocationFailed(required))?;
        }
        if clear {
            self.data.clear();
        }
        self.data.resize(required, 0);
        let described = size_in_bytes(self.format, self.width, self.height, self.palette_size);
        if described.ok() != Some(required) {
            self.width = 0;
            self.height = 0;
            self.format = PixelFormat::Unknown;
            self.palette_size = 0;
        }
        Ok(())
    }

    /// Set the header and size the buffer for it. Indexed palettes are
    /// initialized to opaque black when `clear` is set.
    pub(crate) fn configure(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
        palette_size: u32,
        clear: bool,
    ) -> Result<(), TexError> {
        let palette_size = format.stored_palette_size(palette_size);
        let needed = size_in_bytes(format, width, height, palette_size)?;
        self.allocate(needed, clear)?;
        self.width = width;
        self.height = height;
        self.format = format;
        self.palette_size = palette_size;
        if clear {
            for entry in self.palette_mut().chunks_exact_mut(4) {
                entry.copy_from_slice(&OPAQUE_BLACK);
            }
        }
        Ok(())
    }

    /// Change the palette size, keeping existing entries and indices.
    ///
    /// `Indexed16` rounds up to whole pages and caps at 65536 entries;
    /// `Indexed8` stays at 256. New entries are opaque black.
    pub fn set_palette_size(&mut self, requested: u32) -> Result<(), TexError> {
        if !self.format.is_indexed() {
            return Err(TexError::UnsupportedVariant(alloc::format!(
                "{:?} has no palette",
                self.format
            )));
        }
        let new_size = self.format.stored_palette_size(requested);
        if new_size == self.palette_size {
            return Ok(());
        }
        let old_bytes = self.palette_bytes();
        let new_bytes = new_size as usize * 4;
        if new_bytes > old_bytes {
            let extra = new_bytes - old_bytes;
            self.data
                .try_reserve(extra)
                .map_err(|_| TexError::AllocationFailed(self.data.len() + extra))?;
            let fill = OPAQUE_BLACK.iter().copied().cycle().take(extra);
            self.data.splice(old_bytes..old_bytes, fill);
        } else {
            self.data.drain(new_bytes..old_bytes);
        }
        self.palette_size = new_size;
        Ok(())
    }

    /// Nearest-sample resize. Source coordinates are `dst * old / new` on
    /// each axis; indexed buffers keep their palette.
    pub fn resize(&mut self, new_width: u32, new_height: u32) -> Result<(), TexError> {
        if new_width == 0 || new_height == 0 {
            return Err(TexError::InvalidData(alloc::format!(
                "cannot resize to {new_width}x{new_height}"
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(TexError::InvalidData("cannot resize an empty image".into()));
        }
        if new_width == self.width && new_height == self.height {
            return Ok(());
        }
        let bpp = self.format.bytes_per_pixel();
        let needed = size_in_bytes(self.format, new_width, new_height, self.palette_size)?;
        let mut out = Vec::new();
        out.try_reserve_exact(needed)
            .map_err(|_| TexError::AllocationFailed(needed))?;
        out.extend_from_slice(self.palette());

        let (old_w, old_h) = (u64::from(self.width), u64::from(self.height));
        let src = self.pixels();
        for y in 0..u64::from(new_height) {
            let sy = (y * old_h / u64::from(new_height)) as usize;
            let row = &src[sy * old_w as usize * bpp..(sy + 1) * old_w as usize * bpp];
            for x in 0..u64::from(new_width) {
                let sx = (x * old_w / u64::from(new_width)) as usize;
                out.extend_from_slice(&row[sx * bpp..(sx + 1) * bpp]);
            }
        }
        self.data = out;
        self.width = new_width;
        self.height = new_height;
        Ok(())
    }

    /// Reset to an empty `Unknown` image. `destroy` releases the allocation;
    /// otherwise its capacity is kept for reuse.
    pub fn clear(&mut self, destroy: bool) {
        if destroy {
            self.data = Vec::new();
        } else {
            self.data.clear();
        }
        self.width = 0;
        self.height = 0;
        self.format = PixelFormat::Unknown;
        self.palette_size = 0;
        self.flags = 0;
    }

    /// See [`crate::palette::color_variance`].
    pub fn color_variance(&self, ignore_transparent: bool) -> u8 {
        crate::palette::color_variance(self, ignore_transparent)
    }

    /// Whether any palette entry is not fully opaque.
    pub fn palette_has_alpha(&self) -> bool {
        self.palette().chunks_exact(4).any(|e| e[3] < 255)
    }

    /// Expand an indexed image to `Rgba32` when any palette entry is
    /// translucent, `Rgb24` otherwise. Truecolor images are cloned.
    pub fn to_truecolor(&self) -> Result<ImageBuffer, TexError> {
        if !self.format.is_indexed() {
            return Ok(self.clone());
        }
        let format = if self.palette_has_alpha() {
            PixelFormat::Rgba32
        } else {
            PixelFormat::Rgb24
        };
        let channels = format.channels();
        let count = self.width as usize * self.height as usize;
        let mut out = Self::default();
        out.configure(self.width, self.height, format, 0, false)?;
        out.flags = self.flags;
        for (i, px) in out.pixels_mut().chunks_exact_mut(channels).enumerate().take(count) {
            let rgba = self.palette_entry(self.index_at(i));
            px.copy_from_slice(&rgba[..channels]);
        }
        Ok(out)
    }

    /// Reinterpret truecolor pixel data as a typed pixel slice.
    ///
    /// Returns [`TexError::FormatMismatch`] if the format doesn't match `P`.
    #[cfg(feature = "rgb")]
    pub fn as_pixels<P: crate::DecodePixel>(&self) -> Result<&[P], TexError>
    where
        [u8]: rgb::AsPixels<P>,
    {
        if self.format != P::pixel_format() {
            return Err(TexError::FormatMismatch {
                expected: P::pixel_format(),
                actual: self.format,
            });
        }
        Ok(self.pixels().as_pixels())
    }

    /// Zero-copy view as an [`imgref::ImgRef`] of typed pixels.
    #[cfg(feature = "imgref")]
    pub fn as_imgref<P: crate::DecodePixel>(&self) -> Result<imgref::ImgRef<'_, P>, TexError>
    where
        [u8]: rgb::AsPixels<P>,
    {
        let pixels: &[P] = self.as_pixels()?;
        Ok(imgref::ImgRef::new(
            pixels,
            self.width as usize,
            self.height as usize,
        ))
    }

    /// Copy into an [`imgref::ImgVec`] of typed pixels.
    #[cfg(feature = "imgref")]
    pub fn to_imgvec<P: crate::DecodePixel>(&self) -> Result<imgref::ImgVec<P>, TexError>
    where
        [u8]: rgb::AsPixels<P>,
    {
        let pixels: &[P] = self.as_pixels()?;
        Ok(imgref::ImgVec::new(
            pixels.to_vec(),
            self.width as usize,
            self.height as usize,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_reuses_capacity() {
        let mut buf = ImageBuffer::new(16, 16, PixelFormat::Rgba32).unwrap();
        let cap = buf.capacity();
        buf.allocate(100, true).unwrap();
        assert_eq!(buf.data().len(), 100);
        assert_eq!(buf.capacity(), cap);
        assert!(buf.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn allocate_keeps_prefix_without_clear() {
        let mut buf = ImageBuffer::from_pixels(1, 1, PixelFormat::Rgb24, vec![1, 2, 3]).unwrap();
        buf.allocate(6, false).unwrap();
        assert_eq!(buf.data(), &[1, 2, 3, 0, 0, 0]);
    }

    #[test]
    fn allocate_other_size_drops_header() {
        let mut buf = ImageBuffer::new(4, 4, PixelFormat::Indexed8).unwrap();
        buf.allocate(16, true).unwrap();
        assert_eq!(buf.format(), PixelFormat::Unknown);
        assert_eq!((buf.width(), buf.height(), buf.palette_size()), (0, 0, 0));
        assert!(buf.palette().is_empty());
        assert_eq!(buf.pixels().len(), 16);

        let mut same = ImageBuffer::new(2, 2, PixelFormat::Rgb24).unwrap();
        same.allocate(12, false).unwrap();
        assert_eq!(same.format(), PixelFormat::Rgb24);
    }

    #[test]
    fn resize_nearest_doubles_pixels() {
        let mut buf = ImageBuffer::from_pixels(2, 1, PixelFormat::R8, vec![10, 20]).unwrap();
        buf.resize(4, 2).unwrap();
        assert_eq!(buf.pixels(), &[10, 10, 20, 20, 10, 10, 20, 20]);
        buf.resize(2, 1).unwrap();
        assert_eq!(buf.pixels(), &[10, 20]);
    }

    #[test]
    fn resize_indexed_keeps_palette() {
        let mut buf = ImageBuffer::new(2, 2, PixelFormat::Indexed8).unwrap();
        buf.palette_mut()[4..8].copy_from_slice(&[1, 2, 3, 255]);
        buf.pixels_mut().copy_from_slice(&[0, 1, 1, 0]);
        buf.resize(1, 1).unwrap();
        assert_eq!(buf.palette_size(), 256);
        assert_eq!(buf.palette_entry(1), [1, 2, 3, 255]);
        assert_eq!(buf.pixels(), &[0]);
    }

    #[test]
    fn clear_destroy_releases() {
        let mut buf = ImageBuffer::new(8, 8, PixelFormat::Rgb24).unwrap();
        buf.clear(false);
        assert!(buf.capacity() >= 192);
        assert_eq!(buf.format(), PixelFormat::Unknown);
        buf.clear(true);
        assert_eq!(buf.capacity(), 0);
    }

    #[test]
    fn palette_growth_preserves_indices() {
        let mut buf = ImageBuffer::new(2, 1, PixelFormat::Indexed16).unwrap();
        buf.pixels_mut().copy_from_slice(&[5, 0, 7, 1]);
        buf.set_palette_size(300).unwrap();
        assert_eq!(buf.palette_size(), 512);
        assert_eq!(buf.index_at(0), 5);
        assert_eq!(buf.index_at(1), 0x107);
        assert_eq!(buf.palette_entry(400), OPAQUE_BLACK);
    }

    #[test]
    fn truecolor_expansion_picks_alpha_format() {
        let mut buf = ImageBuffer::new(1, 1, PixelFormat::Indexed8).unwrap();
        buf.palette_mut()[..4].copy_from_slice(&[9, 8, 7, 255]);
        let rgb = buf.to_truecolor().unwrap();
        assert_eq!(rgb.format(), PixelFormat::Rgb24);
        assert_eq!(rgb.pixels(), &[9, 8, 7]);

        buf.palette_mut()[3] = 128;
        let rgba = buf.to_truecolor().unwrap();
        assert_eq!(rgba.format(), PixelFormat::Rgba32);
        assert_eq!(rgba.pixels(), &[9, 8, 7, 128]);
    }
}
