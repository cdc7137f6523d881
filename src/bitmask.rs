//! Channel bit-mask remapping shared by the BMP and DDS readers.

/// Multipliers widening an N-bit value to 8 bits by bit replication.
const MUL_TABLE: [u32; 9] = [
    0,    // 0 bits
    0xff, // 1 bit:  0b11111111
    0x55, // 2 bits: 0b01010101
    0x49, // 3 bits: 0b01001001
    0x11, // 4 bits: 0b00010001
    0x21, // 5 bits: 0b00100001
    0x41, // 6 bits: 0b01000001
    0x81, // 7 bits: 0b10000001
    0x01, // 8 bits: 0b00000001
];

const SHIFT_TABLE: [u32; 9] = [0, 0, 0, 1, 0, 2, 4, 6, 0];

/// One channel's mask, pre-split into shift and width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ChannelMask {
    mask: u32,
    shift: u32,
    bits: u32,
}

impl ChannelMask {
    pub(crate) const fn new(mask: u32) -> Self {
        if mask == 0 {
            return Self {
                mask,
                shift: 0,
                bits: 0,
            };
        }
        let shift = mask.trailing_zeros();
        Self {
            mask,
            shift,
            bits: 32 - mask.leading_zeros() - shift,
        }
    }

    pub(crate) fn mask(&self) -> u32 {
        self.mask
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.mask == 0
    }

    /// `(pixel & mask) >> first_set_bit(mask)`, rescaled to 8 bits when the
    /// field is narrower or wider than a byte. An empty mask yields `absent`.
    pub(crate) fn extract(&self, pixel: u32, absent: u8) -> u8 {
        if self.mask == 0 {
            return absent;
        }
        let v = (pixel & self.mask) >> self.shift;
        match self.bits {
            8 => v as u8,
            b if b > 8 => (v >> (b - 8)) as u8,
            b => ((v * MUL_TABLE[b as usize]) >> SHIFT_TABLE[b as usize]) as u8,
        }
    }

    /// Place an 8-bit value into this field (narrowing if needed).
    pub(crate) fn insert(&self, value: u8) -> u32 {
        if self.mask == 0 {
            return 0;
        }
        let v = u32::from(value);
        let field = if self.bits >= 8 {
            v << (self.bits - 8)
        } else {
            v >> (8 - self.bits)
        };
        (field << self.shift) & self.mask
    }
}

/// Red, green, blue and alpha masks of a packed pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ChannelMasks {
    pub r: ChannelMask,
    pub g: ChannelMask,
    pub b: ChannelMask,
    pub a: ChannelMask,
}

impl ChannelMasks {
    /// Standard A8R8G8B8 little-endian layout (bytes B, G, R, A).
    pub(crate) const ARGB32: ChannelMasks =
        ChannelMasks::new([0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0xFF00_0000]);

    /// R8G8B8 packed into the low 24 bits (bytes B, G, R).
    pub(crate) const RGB24: ChannelMasks = ChannelMasks::new([0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0]);

    /// A4R4G4B4.
    pub(crate) const ARGB16: ChannelMasks = ChannelMasks::new([0x0F00, 0x00F0, 0x000F, 0xF000]);

    pub(crate) const fn new(masks: [u32; 4]) -> Self {
        Self {
            r: ChannelMask::new(masks[0]),
            g: ChannelMask::new(masks[1]),
            b: ChannelMask::new(masks[2]),
            a: ChannelMask::new(masks[3]),
        }
    }

    pub(crate) fn has_color(&self) -> bool {
        !(self.r.is_empty() && self.g.is_empty() && self.b.is_empty())
    }

    /// Unpack to RGBA. A missing alpha mask reads as opaque.
    pub(crate) fn unpack(&self, pixel: u32) -> [u8; 4] {
        [
            self.r.extract(pixel, 0),
            self.g.extract(pixel, 0),
            self.b.extract(pixel, 0),
            self.a.extract(pixel, 255),
        ]
    }

    pub(crate) fn pack(&self, rgba: [u8; 4]) -> u32 {
        self.r.insert(rgba[0]) | self.g.insert(rgba[1]) | self.b.insert(rgba[2]) | self.a.insert(rgba[3])
    }
}
