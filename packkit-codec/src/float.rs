//! Lossy/lossless compression for `f64` arrays. Every element is IEEE-754
//! decomposed into (sign, biased exponent, mantissa); special values (NaN,
//! infinities, zero, subnormals) are flagged in a bitmap and stored verbatim
//! rather than decomposed. Normal values have their mantissa truncated to a
//! chosen width and their exponents correlated across the array according to
//! the selected [`Mode`].
//!
//! This module is new relative to anything in this workspace's teacher: none
//! of its source dealt with floating-point columns. Its layout leans on the
//! same leaf primitives (bitstream, tagged varint, fixed-width storage) the
//! other peer codecs in this crate use, kept consistent in style with them.

use packkit_base::{bitstream, fixed, varint, width::WidthTag};

const F64_MANT_BITS: u32 = 52;
const F64_MANT_MASK: u64 = (1u64 << F64_MANT_BITS) - 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Precision {
    Full = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Precision {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Precision::Full,
            1 => Precision::High,
            2 => Precision::Medium,
            3 => Precision::Low,
            _ => return None,
        })
    }

    pub fn exp_bits(self) -> u8 {
        match self {
            Precision::Full => 11,
            Precision::High => 8,
            Precision::Medium => 8,
            Precision::Low => 5,
        }
    }

    pub fn mant_bits(self) -> u8 {
        match self {
            Precision::Full => 52,
            Precision::High => 23,
            Precision::Medium => 10,
            Precision::Low => 4,
        }
    }

    /// The coarsest precision whose bound `2^-mant_bits <= max_relative_error`.
    /// Falls back to `Full` (lossless) rather than failing if no precision meets it.
    pub fn auto_select(max_relative_error: f64) -> Precision {
        for p in [Precision::Low, Precision::Medium, Precision::High] {
            if 2f64.powi(-(p.mant_bits() as i32)) <= max_relative_error {
                return p;
            }
        }
        Precision::Full
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    Independent = 0,
    CommonExponent = 1,
    DeltaExponent = 2,
}

impl Mode {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Mode::Independent,
            1 => Mode::CommonExponent,
            2 => Mode::DeltaExponent,
            _ => return None,
        })
    }
}

fn is_special(v: f64) -> bool {
    v.is_nan() || v.is_infinite() || v == 0.0 || v.is_subnormal()
}

fn write_words(dst: &mut Vec<u8>, words: &[u64]) {
    for w in words {
        dst.extend_from_slice(&w.to_le_bytes());
    }
}

fn read_words(src: &[u8], n_words: usize) -> Vec<u64> {
    let mut words = Vec::with_capacity(n_words);
    for i in 0..n_words {
        let mut b = [0u8; 8];
        b.copy_from_slice(&src[i * 8..i * 8 + 8]);
        words.push(u64::from_le_bytes(b));
    }
    words
}

fn signed_width_for(max_abs: u64) -> usize {
    for w in 1..=8usize {
        if w == 8 || max_abs < (1u64 << (8 * w - 1)) {
            return w;
        }
    }
    unreachable!()
}

fn encode_exponents(dst: &mut Vec<u8>, exponents: &[u64], mode: Mode) {
    match mode {
        Mode::Independent => {
            for &e in exponents {
                varint::put(dst, e);
            }
        }
        Mode::CommonExponent => {
            let base = exponents.iter().copied().min().unwrap();
            varint::put(dst, base);
            let max_abs = exponents.iter().map(|&e| e as i64 - base as i64).map(i64::unsigned_abs).max().unwrap();
            let delta_width = signed_width_for(max_abs);
            dst.push(delta_width as u8);
            for &e in exponents {
                fixed::write_le_signed(dst, e as i64 - base as i64, delta_width);
            }
        }
        Mode::DeltaExponent => {
            varint::put(dst, exponents[0]);
            let mut max_abs = 0u64;
            let mut prev = exponents[0];
            for &e in &exponents[1..] {
                max_abs = max_abs.max((e as i64 - prev as i64).unsigned_abs());
                prev = e;
            }
            let delta_width = signed_width_for(max_abs);
            dst.push(delta_width as u8);
            let mut prev = exponents[0];
            for &e in &exponents[1..] {
                fixed::write_le_signed(dst, e as i64 - prev as i64, delta_width);
                prev = e;
            }
        }
    }
}

fn decode_exponents(src: &[u8], n: usize, mode: Mode) -> (Vec<u64>, usize) {
    let mut pos = 0;
    let mut out = Vec::with_capacity(n);
    match mode {
        Mode::Independent => {
            for _ in 0..n {
                let mut e = 0u64;
                let w = varint::get(&src[pos..], &mut e);
                assert!(w != 0, "short buffer reading float exponent");
                pos += w;
                out.push(e);
            }
        }
        Mode::CommonExponent => {
            let mut base = 0u64;
            let w = varint::get(src, &mut base);
            assert!(w != 0, "short buffer reading float common-exponent base");
            pos += w;
            let delta_width = src[pos] as usize;
            pos += 1;
            for _ in 0..n {
                let delta = fixed::read_le_signed(&src[pos..], delta_width);
                pos += delta_width;
                out.push((base as i64 + delta) as u64);
            }
        }
        Mode::DeltaExponent => {
            let mut first = 0u64;
            let w = varint::get(src, &mut first);
            assert!(w != 0, "short buffer reading float's first exponent");
            pos += w;
            let delta_width = src[pos] as usize;
            pos += 1;
            out.push(first);
            let mut prev = first;
            for _ in 1..n {
                let delta = fixed::read_le_signed(&src[pos..], delta_width);
                pos += delta_width;
                let e = (prev as i64 + delta) as u64;
                out.push(e);
                prev = e;
            }
        }
    }
    (out, pos)
}

/// Header: `[precision][exp_bits][mant_bits][mode]` then `count:tagged`,
/// special-value bitmap, special values verbatim, signs bitmap, exponents
/// (mode-dependent), then mantissas packed at `mant_bits` each.
pub fn encode(dst: &mut Vec<u8>, values: &[f64], precision: Precision, mode: Mode) -> usize {
    let start = dst.len();
    let mant_bits = precision.mant_bits() as u32;
    dst.push(precision as u8);
    dst.push(precision.exp_bits());
    dst.push(precision.mant_bits());
    dst.push(mode as u8);
    varint::put(dst, values.len() as u64);

    let specials: Vec<bool> = values.iter().map(|&v| is_special(v)).collect();
    let n = values.len();
    let special_slots = bitstream::slots_needed(n as u64, 1).max(1);
    let mut special_words = vec![0u64; special_slots];
    for (i, &s) in specials.iter().enumerate() {
        bitstream::set(&mut special_words, i as u64, 1, s as u64);
    }
    write_words(dst, &special_words);

    for (&v, &s) in values.iter().zip(&specials) {
        if s {
            fixed::write_le(dst, v.to_bits(), 8);
        }
    }

    let normals: Vec<f64> = values.iter().zip(&specials).filter(|(_, &s)| !s).map(|(&v, _)| v).collect();
    let normal_count = normals.len();

    let sign_slots = bitstream::slots_needed(normal_count as u64, 1).max(1);
    let mut sign_words = vec![0u64; sign_slots];
    for (i, &v) in normals.iter().enumerate() {
        bitstream::set(&mut sign_words, i as u64, 1, v.to_bits() >> 63);
    }
    write_words(dst, &sign_words);

    if normal_count > 0 {
        let exponents: Vec<u64> = normals.iter().map(|v| (v.to_bits() >> F64_MANT_BITS) & 0x7ff).collect();
        encode_exponents(dst, &exponents, mode);
    }

    let mant_slots = bitstream::slots_needed(normal_count as u64, mant_bits).max(1);
    let mut mant_words = vec![0u64; mant_slots];
    for (i, &v) in normals.iter().enumerate() {
        let truncated = (v.to_bits() & F64_MANT_MASK) >> (F64_MANT_BITS - mant_bits);
        bitstream::set(&mut mant_words, i as u64 * mant_bits as u64, mant_bits, truncated);
    }
    write_words(dst, &mant_words);

    dst.len() - start
}

pub fn decode(src: &[u8]) -> (Vec<f64>, usize) {
    let precision = Precision::from_u8(src[0]).expect("invalid float precision byte");
    let mode = Mode::from_u8(src[3]).expect("invalid float mode byte");
    let mant_bits = precision.mant_bits() as u32;
    let mut pos = 4;

    let mut count = 0u64;
    let w = varint::get(&src[pos..], &mut count);
    assert!(w != 0, "short buffer reading float array count");
    pos += w;
    let n = count as usize;

    let special_slots = bitstream::slots_needed(n as u64, 1).max(1);
    let special_words = read_words(&src[pos..], special_slots);
    pos += special_slots * 8;
    let specials: Vec<bool> = (0..n).map(|i| bitstream::get(&special_words, i as u64, 1) != 0).collect();

    let num_specials = specials.iter().filter(|&&s| s).count();
    let mut special_values = Vec::with_capacity(num_specials);
    for _ in 0..num_specials {
        special_values.push(f64::from_bits(fixed::read_le(&src[pos..], 8)));
        pos += 8;
    }

    let normal_count = n - num_specials;
    let sign_slots = bitstream::slots_needed(normal_count as u64, 1).max(1);
    let sign_words = read_words(&src[pos..], sign_slots);
    pos += sign_slots * 8;

    let exponents = if normal_count > 0 {
        let (e, consumed) = decode_exponents(&src[pos..], normal_count, mode);
        pos += consumed;
        e
    } else {
        Vec::new()
    };

    let mant_slots = bitstream::slots_needed(normal_count as u64, mant_bits).max(1);
    let mant_words = read_words(&src[pos..], mant_slots);
    pos += mant_slots * 8;

    let mut normals = Vec::with_capacity(normal_count);
    for i in 0..normal_count {
        let sign = bitstream::get(&sign_words, i as u64, 1);
        let exponent = exponents[i];
        let truncated = bitstream::get(&mant_words, i as u64 * mant_bits as u64, mant_bits);
        let mantissa = truncated << (F64_MANT_BITS - mant_bits);
        let bits = (sign << 63) | (exponent << F64_MANT_BITS) | mantissa;
        normals.push(f64::from_bits(bits));
    }

    let mut out = Vec::with_capacity(n);
    let mut special_iter = special_values.into_iter();
    let mut normal_iter = normals.into_iter();
    for &s in &specials {
        if s {
            out.push(special_iter.next().unwrap());
        } else {
            out.push(normal_iter.next().unwrap());
        }
    }

    (out, pos)
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    fn round_trip(values: &[f64], precision: Precision, mode: Mode) -> Vec<f64> {
        let mut dst = Vec::new();
        let written = encode(&mut dst, values, precision, mode);
        assert_eq!(written, dst.len());
        let (decoded, consumed) = decode(&dst);
        assert_eq!(consumed, dst.len());
        decoded
    }

    #[test]
    fn full_precision_is_bit_exact() {
        let values = [1.5, -2.25, 0.1, 12345.6789, 1e300, -1e-300];
        for mode in [Mode::Independent, Mode::CommonExponent, Mode::DeltaExponent] {
            let decoded = round_trip(&values, Precision::Full, mode);
            assert_eq!(decoded, values, "mode {mode:?} should be lossless at Full precision");
        }
    }

    #[test]
    fn lower_precisions_bound_relative_error() {
        let values = [1.0, 3.5, 100.25, -77.125, 0.03125];
        for precision in [Precision::High, Precision::Medium, Precision::Low] {
            let decoded = round_trip(&values, precision, Mode::Independent);
            let bound = 2f64.powi(-(precision.mant_bits() as i32));
            for (&orig, &got) in values.iter().zip(&decoded) {
                let rel_err = (got - orig).abs() / orig.abs();
                assert!(rel_err <= bound, "{rel_err} > {bound} at {precision:?}");
            }
        }
    }

    #[test]
    fn special_values_round_trip_verbatim() {
        let values = [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 0.0, -0.0, f64::MIN_POSITIVE / 2.0, 4.0];
        let decoded = round_trip(&values, Precision::High, Mode::Independent);
        assert!(decoded[0].is_nan());
        assert_eq!(decoded[1], f64::INFINITY);
        assert_eq!(decoded[2], f64::NEG_INFINITY);
        assert_eq!(decoded[3], 0.0);
        assert_eq!(decoded[5], f64::MIN_POSITIVE / 2.0);
        assert_eq!(decoded[6], 4.0);
    }

    #[test]
    fn common_and_delta_exponent_modes_round_trip() {
        let values: Vec<f64> = (1..=20).map(|i| 2f64.powi(i) * 1.25).collect();
        for mode in [Mode::CommonExponent, Mode::DeltaExponent] {
            let decoded = round_trip(&values, Precision::Full, mode);
            assert_eq!(decoded, values);
        }
    }

    #[test]
    fn auto_select_picks_coarsest_precision_meeting_the_bound() {
        assert_eq!(Precision::auto_select(1e-9), Precision::Full);
        assert_eq!(Precision::auto_select(2f64.powi(-23)), Precision::High);
        assert_eq!(Precision::auto_select(2f64.powi(-10)), Precision::Medium);
        assert_eq!(Precision::auto_select(0.1), Precision::Low);
    }

    #[test]
    fn empty_array_round_trips() {
        let values: [f64; 0] = [];
        let decoded = round_trip(&values, Precision::Full, Mode::Independent);
        assert!(decoded.is_empty());
    }
}
