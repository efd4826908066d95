//! Peer-level array codecs built on the leaf primitives in `packkit-base`:
//! BP128 bit-packed blocks, frame-of-reference offset coding, run-length
//! encoding, a float array codec, a 16-bit-keyed roaring-style bitmap, and
//! two-dimensional dimension matrix addressing. Every peer here consumes
//! only the leaves; none of them depend on one another.

pub mod bitmap;
pub mod bp128;
pub mod dimension;
pub mod float;
pub mod for_codec;
pub mod rle;

pub use bitmap::RoaringBitmap;
pub use float::{Mode as FloatMode, Precision as FloatPrecision};
