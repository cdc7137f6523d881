//! DXT1 / DXT5 (BC1 / BC3) block decompression.
//!
//! Raw block streams only, no container. Every 4x4 tile is stored as two
//! RGB565 endpoints plus sixteen 2-bit codes; DXT5 prepends an 8-byte alpha
//! block. Output is always [`PixelFormat::Rgba32`].

use enough::Stop;

use crate::buffer::ImageBuffer;
use crate::error::TexError;
use crate::limits::{Limits, check_output};
use crate::pixel::{PixelFormat, size_in_bytes};

const BLOCK_WIDTH: usize = 4;
const BLOCK_HEIGHT: usize = 4;

/// 5-bit channel value widened to 8 bits.
const EXPAND5: [u8; 32] = {
    let mut t = [0u8; 32];
    let mut i = 0;
    while i < 32 {
        t[i] = ((i * 255 + 15) / 31) as u8;
        i += 1;
    }
    t
};

/// 6-bit channel value widened to 8 bits.
const EXPAND6: [u8; 64] = {
    let mut t = [0u8; 64];
    let mut i = 0;
    while i < 64 {
        t[i] = ((i * 255 + 31) / 63) as u8;
        i += 1;
    }
    t
};

/// Which block encoding a raw stream uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockFormat {
    /// 8 bytes per block, optional 1-bit punch-through alpha.
    Dxt1,
    /// 16 bytes per block: interpolated alpha, then a DXT1 color block.
    Dxt5,
}

impl BlockFormat {
    pub const fn block_bytes(self) -> usize {
        match self {
            Self::Dxt1 => 8,
            Self::Dxt5 => 16,
        }
    }
}

/// Bytes of block data a `width` x `height` image needs. Partial blocks on
/// the right and bottom edges count as whole blocks.
pub fn compressed_size(format: BlockFormat, width: u32, height: u32) -> Result<usize, TexError> {
    let too_large = TexError::DimensionsTooLarge { width, height };
    let blocks_x = (width as usize).div_ceil(BLOCK_WIDTH);
    let blocks_y = (height as usize).div_ceil(BLOCK_HEIGHT);
    blocks_x
        .checked_mul(blocks_y)
        .and_then(|n| n.checked_mul(format.block_bytes()))
        .ok_or(too_large)
}

fn rgb565(c: u16) -> [u8; 3] {
    [
        EXPAND5[usize::from(c >> 11)],
        EXPAND6[usize::from((c >> 5) & 0x3F)],
        EXPAND5[usize::from(c & 0x1F)],
    ]
}

fn mix(a: [u8; 3], b: [u8; 3], wa: u16, wb: u16) -> [u8; 4] {
    let d = wa + wb;
    let ch = |i: usize| ((u16::from(a[i]) * wa + u16::from(b[i]) * wb) / d) as u8;
    [ch(0), ch(1), ch(2), 255]
}

/// The four colors a color block can select. Three-color mode (only when
/// `allow_punch_through` and `c0 <= c1`) makes code 3 transparent black.
fn color_table(block: &[u8], allow_punch_through: bool) -> [[u8; 4]; 4] {
    let c0 = u16::from_le_bytes([block[0], block[1]]);
    let c1 = u16::from_le_bytes([block[2], block[3]]);
    let (e0, e1) = (rgb565(c0), rgb565(c1));
    let first = [e0[0], e0[1], e0[2], 255];
    let second = [e1[0], e1[1], e1[2], 255];
    if c0 > c1 || !allow_punch_through {
        [first, second, mix(e0, e1, 2, 1), mix(e0, e1, 1, 2)]
    } else {
        [first, second, mix(e0, e1, 1, 1), [0, 0, 0, 0]]
    }
}

/// The eight alpha values a DXT5 alpha block can select.
fn alpha_table(a0: u8, a1: u8) -> [u8; 8] {
    let (a, b) = (u16::from(a0), u16::from(a1));
    let mut t = [a0, a1, 0, 0, 0, 0, 0, 0];
    if a0 > a1 {
        for (i, v) in t.iter_mut().enumerate().skip(2) {
            let i = i as u16;
            *v = (((8 - i) * a + (i - 1) * b) / 7) as u8;
        }
    } else {
        for (i, v) in t.iter_mut().enumerate().take(6).skip(2) {
            let i = i as u16;
            *v = (((6 - i) * a + (i - 1) * b) / 5) as u8;
        }
        t[6] = 0;
        t[7] = 255;
    }
    t
}

/// Decode one block into 16 RGBA pixels, row-major within the tile.
fn decode_block(format: BlockFormat, block: &[u8], out: &mut [[u8; 4]; 16]) {
    let color = match format {
        BlockFormat::Dxt1 => block,
        BlockFormat::Dxt5 => &block[8..],
    };
    let table = color_table(color, format == BlockFormat::Dxt1);
    let codes = u32::from_le_bytes([color[4], color[5], color[6], color[7]]);
    for (i, px) in out.iter_mut().enumerate() {
        *px = table[((codes >> (i * 2)) & 3) as usize];
    }

    if format == BlockFormat::Dxt5 {
        let alphas = alpha_table(block[0], block[1]);
        let mut bits = [0u8; 8];
        bits[..6].copy_from_slice(&block[2..8]);
        let codes = u64::from_le_bytes(bits);
        for (i, px) in out.iter_mut().enumerate() {
            px[3] = alphas[((codes >> (i * 3)) & 7) as usize];
        }
    }
}

/// Decode a raw DXT1/DXT5 block stream. `width` and `height` come from the
/// caller since the stream carries no header.
pub(crate) fn decode(
    format: BlockFormat,
    data: &[u8],
    width: u32,
    height: u32,
    limits: Option<&Limits>,
    stop: &dyn Stop,
) -> Result<ImageBuffer, TexError> {
    if width == 0 || height == 0 {
        return Err(TexError::InvalidHeader(alloc::format!(
            "DXT dimensions {width}x{height}"
        )));
    }
    let needed = compressed_size(format, width, height)?;
    if data.len() < needed {
        return Err(TexError::UnexpectedEof);
    }
    let out_bytes = size_in_bytes(PixelFormat::Rgba32, width, height, 0)?;
    check_output(limits, width, height, out_bytes)?;

    let mut out = ImageBuffer::new(width, height, PixelFormat::Rgba32)?;
    let (w, h) = (width as usize, height as usize);
    let blocks_x = w.div_ceil(BLOCK_WIDTH);
    let row_stride = w * 4;
    let pixels = out.pixels_mut();
    let mut tile = [[0u8; 4]; 16];

    for (i, block) in data[..needed].chunks_exact(format.block_bytes()).enumerate() {
        let (bx, by) = (i % blocks_x, i / blocks_x);
        if bx == 0 && by % 4 == 0 {
            stop.check()?;
        }
        decode_block(format, block, &mut tile);
        let (x0, y0) = (bx * BLOCK_WIDTH, by * BLOCK_HEIGHT);
        for ty in 0..BLOCK_HEIGHT.min(h - y0) {
            for tx in 0..BLOCK_WIDTH.min(w - x0) {
                let off = (y0 + ty) * row_stride + (x0 + tx) * 4;
                pixels[off..off + 4].copy_from_slice(&tile[ty * BLOCK_WIDTH + tx]);
            }
        }
    }
    tracing::trace!(?format, width, height, "decoded block stream");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use enough::Unstoppable;

    #[test]
    fn expansion_matches_bit_replication() {
        for (i, &v) in EXPAND5.iter().enumerate() {
            assert_eq!(v, ((i << 3) | (i >> 2)) as u8, "5-bit {i}");
        }
        for (i, &v) in EXPAND6.iter().enumerate() {
            assert_eq!(v, ((i << 2) | (i >> 4)) as u8, "6-bit {i}");
        }
    }

    #[test]
    fn four_color_block_code_zero() {
        // e0 = pure red (0xF800) > e1 = pure blue (0x001F), every code 0.
        let block = [0x00, 0xF8, 0x1F, 0x00, 0, 0, 0, 0];
        let img = decode(BlockFormat::Dxt1, &block, 4, 4, None, &Unstoppable).unwrap();
        for px in img.pixels().chunks_exact(4) {
            assert_eq!(px, &[255, 0, 0, 255]);
        }
    }

    #[test]
    fn four_color_interpolation() {
        // white (0xFFFF) and black, codes 0,1,2,3 across the first row.
        let codes = 0b11_10_01_00u8;
        let block = [0xFF, 0xFF, 0x00, 0x00, codes, 0, 0, 0];
        let img = decode(BlockFormat::Dxt1, &block, 4, 1, None, &Unstoppable).unwrap();
        assert_eq!(
            img.pixels(),
            &[255, 255, 255, 255, 0, 0, 0, 255, 170, 170, 170, 255, 85, 85, 85, 255]
        );
    }

    #[test]
    fn three_color_mode_has_transparent_black() {
        // e0 == e1 selects three-color mode.
        let block = [0x00, 0xF8, 0x00, 0xF8, 0b11_10, 0, 0, 0];
        let img = decode(BlockFormat::Dxt1, &block, 2, 1, None, &Unstoppable).unwrap();
        assert_eq!(img.pixels(), &[255, 0, 0, 255, 0, 0, 0, 0]);
    }

    #[test]
    fn dxt5_never_uses_three_color_mode() {
        let mut block = [0u8; 16];
        block[0] = 255;
        block[1] = 255;
        block[8..12].copy_from_slice(&[0x00, 0xF8, 0x00, 0xF8]);
        block[12] = 0b11;
        let img = decode(BlockFormat::Dxt5, &block, 1, 1, None, &Unstoppable).unwrap();
        assert_eq!(img.pixels(), &[255, 0, 0, 255]);
    }

    #[test]
    fn alpha_ramps() {
        assert_eq!(alpha_table(255, 0), [255, 0, 218, 182, 145, 109, 72, 36]);
        assert_eq!(alpha_table(0, 255), [0, 255, 51, 102, 153, 204, 0, 255]);
    }

    #[test]
    fn partial_edge_blocks() {
        // 5x5 needs 2x2 blocks; only in-bounds pixels are written.
        let mut data = [0u8; 32];
        for block in data.chunks_exact_mut(8) {
            block[..4].copy_from_slice(&[0xE0, 0x07, 0x00, 0x00]); // green, black
        }
        let img = decode(BlockFormat::Dxt1, &data, 5, 5, None, &Unstoppable).unwrap();
        assert_eq!(img.pixels().len(), 5 * 5 * 4);
        assert!(img.pixels().chunks_exact(4).all(|px| px == [0, 255, 0, 255]));
    }

    #[test]
    fn short_input_is_eof() {
        let err = decode(BlockFormat::Dxt5, &[0u8; 15], 4, 4, None, &Unstoppable).unwrap_err();
        assert!(matches!(err, TexError::UnexpectedEof));
    }
}
