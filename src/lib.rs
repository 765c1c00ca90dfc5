//! CHIP-8 interpreter core.
//!
//! The [`emu::Chip8`] type owns the whole machine and exposes a narrow API to a
//! driver loop: initialize, load a program, step one cycle at a time, read the
//! framebuffer and write key state between steps. [`emu::Chip8Runner`] is the
//! optional driver-side helper that paces steps against elapsed time.

pub mod emu;
mod nibble;

pub use emu::*;
pub use nibble::{NibbleOutOfRange, u4};
