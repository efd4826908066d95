/// A byte-width, used both as a first-byte discriminator in tagged encoding
/// and as a caller-supplied parameter for fixed-width reads.
///
/// `Absent` stands for "no value stored" (width zero); the remaining
/// variants cover every width the tagged varint codec can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum WidthTag {
    Absent = 0,
    W1 = 1,
    W2 = 2,
    W3 = 3,
    W4 = 4,
    W5 = 5,
    W6 = 6,
    W7 = 7,
    W8 = 8,
    W9 = 9,
}

impl WidthTag {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => WidthTag::Absent,
            1 => WidthTag::W1,
            2 => WidthTag::W2,
            3 => WidthTag::W3,
            4 => WidthTag::W4,
            5 => WidthTag::W5,
            6 => WidthTag::W6,
            7 => WidthTag::W7,
            8 => WidthTag::W8,
            9 => WidthTag::W9,
            _ => return None,
        })
    }

    pub fn as_usize(self) -> usize {
        self as u8 as usize
    }

    /// Smallest byte width (1..=8) whose unsigned range covers `max_value`.
    pub fn smallest_holding(max_value: u64) -> WidthTag {
        for w in 1..=8u8 {
            if w == 8 || max_value < (1u64 << (8 * w)) {
                return WidthTag::from_u8(w).expect("w in 1..=8");
            }
        }
        unreachable!()
    }

    /// Smallest power-of-two byte width (1, 2, 4, or 8) whose unsigned range
    /// covers `max_value`. Used by the frame-of-reference codec, which packs
    /// offsets at widths chosen for SIMD-friendly lane sizes.
    pub fn smallest_pow2_holding(max_value: u64) -> WidthTag {
        if max_value <= 0xff {
            WidthTag::W1
        } else if max_value <= 0xffff {
            WidthTag::W2
        } else if max_value <= 0xffff_ffff {
            WidthTag::W4
        } else {
            WidthTag::W8
        }
    }
}
