//! Leaf-level primitives shared by every codec in this workspace: bit-level
//! and byte-level fixed-width storage, the self-describing tagged varint,
//! width discriminators, a small 256-bit flag set, and the crate-wide error
//! type. Nothing in this crate depends on anything above it.

mod bitmap256;
mod error;

pub mod bitstream;
pub mod fixed;
pub mod varint;
pub mod width;

pub use bitmap256::{Bitmap256, DoubleBitmap256};
pub use error::{err, Error, Result};
pub use width::WidthTag;
