//! PNG scanline filters.
//!
//! All filters work byte-wise with a left-neighbor stride of `bpp` (bytes
//! per complete pixel, at least 1). Neighbors outside the image read as 0.

use alloc::vec;
use alloc::vec::Vec;

use crate::error::TexError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FilterType {
    None = 0,
    Sub = 1,
    Up = 2,
    Average = 3,
    Paeth = 4,
}

impl FilterType {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::None,
            1 => Self::Sub,
            2 => Self::Up,
            3 => Self::Average,
            4 => Self::Paeth,
            _ => return None,
        })
    }
}

/// Filters the encoder chooses between. `None` is never emitted.
const CANDIDATES: [FilterType; 4] = [
    FilterType::Sub,
    FilterType::Up,
    FilterType::Average,
    FilterType::Paeth,
];

/// Paeth predictor: whichever of `a` (left), `b` (above), `c` (upper left)
/// is closest to `a + b - c`. Ties prefer `a`, then `b`.
pub fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = i16::from(a) + i16::from(b) - i16::from(c);
    let pa = (p - i16::from(a)).unsigned_abs();
    let pb = (p - i16::from(b)).unsigned_abs();
    let pc = (p - i16::from(c)).unsigned_abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Reverse `filter` in place. `prior` is the reconstructed row above (all
/// zeros for the first row) and must be as long as `cur`.
pub(crate) fn unfilter(filter: FilterType, bpp: usize, prior: &[u8], cur: &mut [u8]) {
    debug_assert_eq!(prior.len(), cur.len());
    let len = cur.len();
    match filter {
        FilterType::None => {}
        FilterType::Sub => {
            for x in bpp..len {
                cur[x] = cur[x].wrapping_add(cur[x - bpp]);
            }
        }
        FilterType::Up => {
            for (c, &p) in cur.iter_mut().zip(prior) {
                *c = c.wrapping_add(p);
            }
        }
        FilterType::Average => {
            for x in 0..len {
                let left = if x >= bpp { u16::from(cur[x - bpp]) } else { 0 };
                let avg = (left + u16::from(prior[x])) / 2;
                cur[x] = cur[x].wrapping_add(avg as u8);
            }
        }
        FilterType::Paeth => {
            for x in 0..len {
                let (a, c) = if x >= bpp {
                    (cur[x - bpp], prior[x - bpp])
                } else {
                    (0, 0)
                };
                cur[x] = cur[x].wrapping_add(paeth(a, prior[x], c));
            }
        }
    }
}

/// Apply `filter` to `cur` (with `prior` above it), writing into `out`.
pub(crate) fn filter_row(filter: FilterType, bpp: usize, prior: &[u8], cur: &[u8], out: &mut [u8]) {
    let len = cur.len();
    let left = |x: usize| if x >= bpp { cur[x - bpp] } else { 0 };
    match filter {
        FilterType::None => out.copy_from_slice(cur),
        FilterType::Sub => {
            for x in 0..len {
                out[x] = cur[x].wrapping_sub(left(x));
            }
        }
        FilterType::Up => {
            for x in 0..len {
                out[x] = cur[x].wrapping_sub(prior[x]);
            }
        }
        FilterType::Average => {
            for x in 0..len {
                let avg = (u16::from(left(x)) + u16::from(prior[x])) / 2;
                out[x] = cur[x].wrapping_sub(avg as u8);
            }
        }
        FilterType::Paeth => {
            for x in 0..len {
                let c = if x >= bpp { prior[x - bpp] } else { 0 };
                out[x] = cur[x].wrapping_sub(paeth(left(x), prior[x], c));
            }
        }
    }
}

/// Sum of the filtered bytes taken as unsigned values. Lower compresses
/// better, roughly.
fn badness(row: &[u8]) -> u64 {
    row.iter().map(|&b| u64::from(b)).sum()
}

/// Per-row filter chooser holding scratch space for the four candidates.
pub(crate) struct FilterSelector {
    candidates: [Vec<u8>; 4],
}

impl FilterSelector {
    pub(crate) fn new(row_bytes: usize) -> Result<Self, TexError> {
        let alloc = || -> Result<Vec<u8>, TexError> {
            let mut v = Vec::new();
            v.try_reserve_exact(row_bytes)
                .map_err(|_| TexError::AllocationFailed(row_bytes))?;
            v.resize(row_bytes, 0);
            Ok(v)
        };
        Ok(Self {
            candidates: [alloc()?, alloc()?, alloc()?, alloc()?],
        })
    }

    /// Filter `cur` every candidate way and return the lowest-badness
    /// result. Ties go to the earlier candidate.
    pub(crate) fn select(&mut self, bpp: usize, prior: &[u8], cur: &[u8]) -> (FilterType, &[u8]) {
        let mut best = 0;
        let mut best_score = u64::MAX;
        for (i, (&filter, out)) in CANDIDATES.iter().zip(self.candidates.iter_mut()).enumerate() {
            filter_row(filter, bpp, prior, cur, out);
            let score = badness(out);
            if score < best_score {
                best = i;
                best_score = score;
            }
        }
        (CANDIDATES[best], &self.candidates[best])
    }
}

/// Zero row used as the "prior" of the first scanline.
pub(crate) fn zero_row(row_bytes: usize) -> Vec<u8> {
    vec![0u8; row_bytes]
}
