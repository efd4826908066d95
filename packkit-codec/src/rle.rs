//! Run-length encoding over `(run_length, value)` pairs, each written as a
//! tagged varint. Adapted from this crate's teacher's dictionary-code run
//! collapsing into a standalone array codec with two framings: a
//! self-terminating one (a zero-length run marks the end) and a
//! length-prefixed one for callers that already know the element count.

use packkit_base::varint;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunsAnalysis {
    pub runs: usize,
    /// Bytes the bare run pairs would take, excluding any framing.
    pub encoded_len: usize,
    /// Bytes storing every value individually as a tagged varint would take.
    pub raw_len: usize,
    pub beneficial: bool,
}

/// Single pass computing the run structure and whether collapsing into runs
/// is smaller than storing every value individually.
pub fn analyse(values: &[u64]) -> RunsAnalysis {
    let mut runs = 0usize;
    let mut encoded_len = 0usize;
    let mut i = 0;
    while i < values.len() {
        let v = values[i];
        let mut j = i + 1;
        while j < values.len() && values[j] == v {
            j += 1;
        }
        runs += 1;
        encoded_len += varint::len((j - i) as u64) + varint::len(v);
        i = j;
    }
    let raw_len: usize = values.iter().map(|&v| varint::len(v)).sum();
    RunsAnalysis { runs, encoded_len, raw_len, beneficial: encoded_len < raw_len }
}

fn write_runs(dst: &mut Vec<u8>, values: &[u64]) {
    let mut i = 0;
    while i < values.len() {
        let v = values[i];
        let mut j = i + 1;
        while j < values.len() && values[j] == v {
            j += 1;
        }
        varint::put(dst, (j - i) as u64);
        varint::put(dst, v);
        i = j;
    }
}

/// Self-terminating framing: run pairs followed by a zero-length marker.
pub fn encode_no_header(dst: &mut Vec<u8>, values: &[u64]) -> usize {
    let start = dst.len();
    write_runs(dst, values);
    varint::put(dst, 0);
    dst.len() - start
}

pub fn decode_no_header(src: &[u8]) -> (Vec<u64>, usize) {
    let mut out = Vec::new();
    let mut pos = 0;
    loop {
        let mut run_length = 0u64;
        let w = varint::get(&src[pos..], &mut run_length);
        assert!(w != 0, "short buffer reading run-length-encoded run length");
        pos += w;
        if run_length == 0 {
            break;
        }
        let mut value = 0u64;
        let wv = varint::get(&src[pos..], &mut value);
        assert!(wv != 0, "short buffer reading run-length-encoded run value");
        pos += wv;
        out.extend(std::iter::repeat(value).take(run_length as usize));
    }
    (out, pos)
}

/// Length-prefixed framing: `[total_count: tagged]` then run pairs with no terminator.
pub fn encode_with_header(dst: &mut Vec<u8>, values: &[u64]) -> usize {
    let start = dst.len();
    varint::put(dst, values.len() as u64);
    write_runs(dst, values);
    dst.len() - start
}

pub fn decode_with_header(src: &[u8]) -> (Vec<u64>, usize) {
    let mut total = 0u64;
    let w = varint::get(src, &mut total);
    assert!(w != 0, "short buffer reading run-length-encoded total count");
    let mut pos = w;
    let mut out = Vec::with_capacity(total as usize);
    while (out.len() as u64) < total {
        let mut run_length = 0u64;
        let wl = varint::get(&src[pos..], &mut run_length);
        assert!(wl != 0, "short buffer reading run-length-encoded run length");
        pos += wl;
        let mut value = 0u64;
        let wv = varint::get(&src[pos..], &mut value);
        assert!(wv != 0, "short buffer reading run-length-encoded run value");
        pos += wv;
        out.extend(std::iter::repeat(value).take(run_length as usize));
    }
    (out, pos)
}

/// Random-access read over the self-terminating framing. Out-of-range (or
/// malformed) reads return 0 rather than erroring, matching this codec's
/// historically forgiving lookup behavior.
pub fn get_at(src: &[u8], index: usize) -> u64 {
    let mut pos = 0usize;
    let mut consumed = 0usize;
    loop {
        let mut run_length = 0u64;
        let w = varint::get(&src[pos..], &mut run_length);
        if w == 0 || run_length == 0 {
            return 0;
        }
        pos += w;
        let mut value = 0u64;
        let wv = varint::get(&src[pos..], &mut value);
        if wv == 0 {
            return 0;
        }
        pos += wv;
        let run_length = run_length as usize;
        if index < consumed + run_length {
            return value;
        }
        consumed += run_length;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    // S2: [1,1,1,2,2,3,3,3,3,3] -> 3 runs, get_at(3) == 2.
    #[test]
    fn scenario_s2_run_collapsing_and_random_access() {
        let values = vec![1u64, 1, 1, 2, 2, 3, 3, 3, 3, 3];
        let a = analyse(&values);
        assert_eq!(a.runs, 3);
        let mut dst = Vec::new();
        encode_no_header(&mut dst, &values);
        assert_eq!(get_at(&dst, 3), 2);
        let (decoded, consumed) = decode_no_header(&dst);
        assert_eq!(consumed, dst.len());
        assert_eq!(decoded, values);
    }

    #[test]
    fn with_header_framing_round_trips() {
        let values = vec![9u64, 9, 9, 9, 1, 1];
        let mut dst = Vec::new();
        encode_with_header(&mut dst, &values);
        let (decoded, consumed) = decode_with_header(&dst);
        assert_eq!(consumed, dst.len());
        assert_eq!(decoded, values);
    }

    #[test]
    fn get_at_out_of_range_returns_zero() {
        let values = vec![4u64, 4, 4];
        let mut dst = Vec::new();
        encode_no_header(&mut dst, &values);
        assert_eq!(get_at(&dst, 10), 0);
    }

    #[test]
    fn empty_array_round_trips() {
        let values: Vec<u64> = vec![];
        let mut dst = Vec::new();
        encode_no_header(&mut dst, &values);
        let (decoded, _) = decode_no_header(&dst);
        assert!(decoded.is_empty());
    }

    // Worst case: a strictly alternating pattern of 100 small values costs at
    // most 2 bytes per run (1 for the run length, 1 for the value).
    #[test]
    fn alternating_worst_case_bounded_at_two_bytes_per_run() {
        let values: Vec<u64> = (0..100).map(|i| (i % 2) as u64).collect();
        let a = analyse(&values);
        assert_eq!(a.runs, 100);
        assert!(a.encoded_len <= 200);
    }
}
