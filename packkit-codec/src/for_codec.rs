//! Frame-of-reference: every element is stored as a small offset from the
//! array's minimum, packed at a fixed byte width chosen from the array's
//! range. Generalized from the minimum/width selection this crate's teacher
//! used when choosing a dictionary code's storage width, into a standalone
//! array codec with random access.

use packkit_base::{fixed, varint, width::WidthTag};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Analysis {
    pub min: u64,
    pub max: u64,
    pub range: u64,
    pub offset_width: WidthTag,
}

/// Single pass over `values` picking the minimum, maximum, and the smallest
/// power-of-two byte width that holds `max - min`.
pub fn analyse(values: &[u64]) -> Analysis {
    if values.is_empty() {
        return Analysis { min: 0, max: 0, range: 0, offset_width: WidthTag::W1 };
    }
    let mut min = u64::MAX;
    let mut max = 0u64;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
    }
    let range = max - min;
    Analysis { min, max, range, offset_width: WidthTag::smallest_pow2_holding(range) }
}

/// Header layout: `[min: tagged][offset_width: 1 byte][count: tagged]`,
/// followed by `count` offsets at `offset_width` bytes each.
pub fn encode(dst: &mut Vec<u8>, values: &[u64]) -> usize {
    let start = dst.len();
    let a = analyse(values);
    varint::put(dst, a.min);
    dst.push(a.offset_width.as_usize() as u8);
    varint::put(dst, values.len() as u64);
    let w = a.offset_width.as_usize();
    for &v in values {
        fixed::write_le(dst, v - a.min, w);
    }
    dst.len() - start
}

struct Header {
    min: u64,
    offset_width: usize,
    count: usize,
    data_offset: usize,
}

fn read_header(src: &[u8]) -> Header {
    let mut min = 0u64;
    let w1 = varint::get(src, &mut min);
    assert!(w1 != 0, "short buffer reading frame-of-reference minimum");
    let offset_width = src[w1] as usize;
    let mut count = 0u64;
    let w2 = varint::get(&src[w1 + 1..], &mut count);
    assert!(w2 != 0, "short buffer reading frame-of-reference count");
    Header { min, offset_width, count: count as usize, data_offset: w1 + 1 + w2 }
}

/// Decodes every element, returning the values and the number of bytes consumed.
pub fn decode(src: &[u8]) -> (Vec<u64>, usize) {
    let h = read_header(src);
    let mut out = Vec::with_capacity(h.count);
    for i in 0..h.count {
        let off = h.data_offset + i * h.offset_width;
        out.push(h.min + fixed::read_le(&src[off..], h.offset_width));
    }
    (out, h.data_offset + h.count * h.offset_width)
}

/// Random-access read of a single element without decoding the rest.
pub fn get_at(src: &[u8], i: usize) -> u64 {
    let h = read_header(src);
    assert!(i < h.count, "index {i} out of range for {} elements", h.count);
    let off = h.data_offset + i * h.offset_width;
    h.min + fixed::read_le(&src[off..], h.offset_width)
}

/// Decodes the half-open element range `[start, end)` into `out`, for callers
/// that want one block of a larger column without materializing all of it.
pub fn decode_block(src: &[u8], start: usize, end: usize, out: &mut Vec<u64>) {
    let h = read_header(src);
    let end = end.min(h.count);
    for i in start..end {
        let off = h.data_offset + i * h.offset_width;
        out.push(h.min + fixed::read_le(&src[off..], h.offset_width));
    }
}
