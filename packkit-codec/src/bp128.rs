//! Fixed-size 128-element bit-packed blocks, plus the delta variant used for
//! sorted sequences. Blocks pack LSB-first within each byte (the layout a
//! SIMD decoder widens into lanes), which is a different convention from
//! the bitstream's MSB-first slots used elsewhere in this crate — BP128's
//! wire format is defined independently of the generic bitstream.
//!
//! Every operation here is parameterized by `bit_cap` (32 or 64) so the same
//! code serves both the uint32 and uint64 variants; thin `_u32` wrappers
//! below pin that parameter for callers working with `u32` arrays.

use packkit_base::varint;

pub const BLOCK_LEN: usize = 128;

fn bits_needed(max_value: u64, bit_cap: u32) -> u32 {
    if max_value == 0 {
        0
    } else {
        let w = 64 - max_value.leading_zeros();
        debug_assert!(w <= bit_cap, "value exceeds {bit_cap}-bit domain");
        w
    }
}

fn pack_lsb(dst: &mut Vec<u8>, values: &[u64], width: u32) {
    if width == 0 {
        return;
    }
    let width = width as usize;
    let total_bits = values.len() * width;
    let total_bytes = (total_bits + 7) / 8;
    let base = dst.len();
    dst.resize(base + total_bytes, 0);
    let mut bit_pos = 0usize;
    for &v in values {
        let mut remaining = width;
        let mut val = v;
        while remaining > 0 {
            let byte_idx = base + bit_pos / 8;
            let bit_in_byte = bit_pos % 8;
            let take = remaining.min(8 - bit_in_byte);
            let mask: u32 = (1u32 << take) - 1;
            let chunk = (val & mask as u64) as u8;
            dst[byte_idx] |= chunk << bit_in_byte;
            val >>= take;
            remaining -= take;
            bit_pos += take;
        }
    }
}

fn unpack_lsb(src: &[u8], count: usize, width: u32) -> Vec<u64> {
    if width == 0 {
        return vec![0u64; count];
    }
    let width = width as usize;
    let mut out = Vec::with_capacity(count);
    let mut bit_pos = 0usize;
    for _ in 0..count {
        let mut remaining = width;
        let mut val: u64 = 0;
        let mut shift = 0u32;
        while remaining > 0 {
            let byte_idx = bit_pos / 8;
            let bit_in_byte = bit_pos % 8;
            let take = remaining.min(8 - bit_in_byte);
            let mask: u32 = (1u32 << take) - 1;
            let chunk = ((src[byte_idx] >> bit_in_byte) as u32) & mask;
            val |= (chunk as u64) << shift;
            shift += take as u32;
            remaining -= take;
            bit_pos += take;
        }
        out.push(val);
    }
    out
}

/// Encodes up to [`BLOCK_LEN`] values as one block: a header byte (bit 7 set
/// iff this is a partial tail block, low 7 bits the bit-width), an optional
/// count byte for partial blocks, then the packed body.
pub fn encode_block(dst: &mut Vec<u8>, values: &[u64], bit_cap: u32) -> usize {
    assert!(!values.is_empty() && values.len() <= BLOCK_LEN);
    let start = dst.len();
    let max = values.iter().copied().max().unwrap_or(0);
    let width = bits_needed(max, bit_cap);
    let partial = values.len() < BLOCK_LEN;
    dst.push((width as u8) | if partial { 0x80 } else { 0 });
    if partial {
        dst.push(values.len() as u8);
    }
    pack_lsb(dst, values, width);
    dst.len() - start
}

/// Decodes one block from the front of `src`, returning the values and the
/// number of bytes consumed.
pub fn decode_block(src: &[u8]) -> (Vec<u64>, usize) {
    let header = src[0];
    let partial = header & 0x80 != 0;
    let width = (header & 0x7f) as u32;
    let mut pos = 1;
    let count = if partial {
        let c = src[1] as usize;
        pos += 1;
        c
    } else {
        BLOCK_LEN
    };
    let total_bytes = (count * width as usize + 7) / 8;
    let values = unpack_lsb(&src[pos..pos + total_bytes], count, width);
    (values, pos + total_bytes)
}

/// Encodes `values` as a sequence of full blocks followed by at most one
/// partial tail block; the tail, if any, is always last.
pub fn encode_array(dst: &mut Vec<u8>, values: &[u64], bit_cap: u32) -> usize {
    let start = dst.len();
    for chunk in values.chunks(BLOCK_LEN) {
        encode_block(dst, chunk, bit_cap);
    }
    dst.len() - start
}

/// Decodes `n_values` values from a concatenation of blocks, returning the
/// values and the number of bytes consumed.
pub fn decode_array(src: &[u8], n_values: usize) -> (Vec<u64>, usize) {
    let mut out = Vec::with_capacity(n_values);
    let mut pos = 0;
    while out.len() < n_values {
        let (block_vals, consumed) = decode_block(&src[pos..]);
        out.extend(block_vals);
        pos += consumed;
    }
    out.truncate(n_values);
    (out, pos)
}

/// Encodes first-differences of `values` against a caller-threaded `prev`,
/// returning the bytes written and the new `prev` to feed the next block.
/// The contract requires `values` to be non-decreasing relative to `prev`.
pub fn delta_encode_block(dst: &mut Vec<u8>, values: &[u64], prev: u64, bit_cap: u32) -> (usize, u64) {
    let mut deltas = Vec::with_capacity(values.len());
    let mut p = prev;
    for &v in values {
        deltas.push(v - p);
        p = v;
    }
    let consumed = encode_block(dst, &deltas, bit_cap);
    (consumed, p)
}

/// Inclusive prefix-sum reconstruction of a delta block.
pub fn delta_decode_block(src: &[u8], prev: u64) -> (Vec<u64>, usize, u64) {
    let (deltas, consumed) = decode_block(src);
    let mut out = Vec::with_capacity(deltas.len());
    let mut p = prev;
    for d in deltas {
        p += d;
        out.push(p);
    }
    (out, consumed, p)
}

/// Emits the first absolute value via a tagged varint, then delta-blocks for
/// the remainder.
pub fn delta_encode_array(dst: &mut Vec<u8>, values: &[u64], bit_cap: u32) -> usize {
    let start = dst.len();
    if values.is_empty() {
        varint::put(dst, 0);
        return dst.len() - start;
    }
    varint::put(dst, values[0]);
    let mut prev = values[0];
    for chunk in values[1..].chunks(BLOCK_LEN) {
        let (_, new_prev) = delta_encode_block(dst, chunk, prev, bit_cap);
        prev = new_prev;
    }
    dst.len() - start
}

pub fn delta_decode_array(src: &[u8], n_values: usize) -> (Vec<u64>, usize) {
    let mut first = 0u64;
    let w = varint::get(src, &mut first);
    assert!(w != 0, "short buffer reading delta array's leading value");
    let mut pos = w;
    let mut out = Vec::with_capacity(n_values);
    if n_values == 0 {
        return (out, pos);
    }
    out.push(first);
    let mut prev = first;
    while out.len() < n_values {
        let (vals, consumed, new_prev) = delta_decode_block(&src[pos..], prev);
        out.extend(vals);
        pos += consumed;
        prev = new_prev;
    }
    out.truncate(n_values);
    (out, pos)
}

pub fn is_sorted(values: &[u64]) -> bool {
    values.windows(2).all(|w| w[0] <= w[1])
}

/// Whether plain (non-delta) BP128 packing would beat a naive fixed-width
/// `bit_cap`-bit-per-value baseline for this array.
pub fn is_beneficial(values: &[u64], bit_cap: u32) -> bool {
    if values.is_empty() {
        return false;
    }
    let max = values.iter().copied().max().unwrap_or(0);
    let width = bits_needed(max, bit_cap);
    values.len() * width as usize < values.len() * bit_cap as usize
}

pub fn encode_block_u32(dst: &mut Vec<u8>, values: &[u32]) -> usize {
    let widened: Vec<u64> = values.iter().map(|&v| v as u64).collect();
    encode_block(dst, &widened, 32)
}

pub fn decode_block_u32(src: &[u8]) -> (Vec<u32>, usize) {
    let (vals, consumed) = decode_block(src);
    (vals.into_iter().map(|v| v as u32).collect(), consumed)
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn full_block_round_trips() {
        let values: Vec<u64> = (0..128).map(|i| (i * 37) % 1000).collect();
        let mut dst = Vec::new();
        let written = encode_block(&mut dst, &values, 32);
        assert_eq!(written, dst.len());
        let (decoded, consumed) = decode_block(&dst);
        assert_eq!(consumed, dst.len());
        assert_eq!(decoded, values);
    }

    #[test]
    fn zero_width_block_has_no_body() {
        let values = vec![7u64; 128];
        let mut dst = Vec::new();
        encode_block(&mut dst, &values, 32);
        assert_eq!(dst.len(), 1);
        let (decoded, consumed) = decode_block(&dst);
        assert_eq!(consumed, 1);
        assert_eq!(decoded, values);
    }

    #[test]
    fn partial_tail_block_round_trips() {
        let values: Vec<u64> = (0..50).collect();
        let mut dst = Vec::new();
        encode_block(&mut dst, &values, 32);
        assert_eq!(dst[0] & 0x80, 0x80);
        assert_eq!(dst[1], 50);
        let (decoded, consumed) = decode_block(&dst);
        assert_eq!(consumed, dst.len());
        assert_eq!(decoded, values);
    }

    #[test]
    fn array_round_trips_across_block_boundary() {
        let values: Vec<u64> = (0..300).map(|i| i * 3).collect();
        let mut dst = Vec::new();
        encode_array(&mut dst, &values, 32);
        let (decoded, consumed) = decode_array(&dst, values.len());
        assert_eq!(consumed, dst.len());
        assert_eq!(decoded, values);
    }

    // S4: 200 values with a constant gap of 10.
    #[test]
    fn scenario_s4_constant_gap_delta_array() {
        let values: Vec<u64> = (0..200).map(|i| 100 + 10 * i).collect();
        assert!(is_sorted(&values));
        let mut dst = Vec::new();
        delta_encode_array(&mut dst, &values, 32);
        // first block's max delta is 10, needing ceil(log2(11)) = 4 bits.
        let header = dst[varint::len(values[0])];
        assert!(header & 0x7f <= 4);
        let (decoded, consumed) = delta_decode_array(&dst, values.len());
        assert_eq!(consumed, dst.len());
        assert_eq!(decoded, values);
    }

    #[test]
    fn delta_bound_holds_for_any_gap() {
        for gap in [1u64, 3, 10, 100] {
            let n = 256;
            let values: Vec<u64> = (0..n).map(|i| 1 + gap * i).collect();
            let mut dst = Vec::new();
            delta_encode_array(&mut dst, &values, 32);
            let bits_per_value = (64 - (gap + 1).leading_zeros()) as usize;
            let bound = n as usize * bits_per_value / 8 + 64; // + O(1) framing slop
            assert!(dst.len() <= bound, "{} > {}", dst.len(), bound);
        }
    }
}
