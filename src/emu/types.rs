use crate::u4;

pub const DISPLAY_X: usize = 64;
pub const DISPLAY_Y: usize = 32;
pub const DISPLAY_SIZE: usize = DISPLAY_X * DISPLAY_Y;

/// Flat, row-major 64x32 monochrome framebuffer (index = y * 64 + x).
pub type Framebuffer = [bool; DISPLAY_SIZE];

/// Result type for CHIP-8 CPU cycle execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chip8Result {
    /// Continue executing instructions in the current frame.
    Continue,
    /// Wait for the next frame before continuing
    /// (the framebuffer changed, or the machine is waiting for a key press).
    WaitForNextFrame,
}

/// Execution mode of the machine, queried by the driver between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Running,
    /// Fx0A is suspended until one of the 16 keys is pressed.
    /// The result will be stored in `Vx`.
    AwaitingKey { x: u4 },
    /// A fatal error stopped the machine. Only `initialize` leaves this mode.
    Halted,
}

/// Error types that can occur during CHIP-8 emulation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Chip8Error {
    #[error("program is too large ({size} bytes), max size is {max_size} bytes")]
    ProgramTooLarge { size: usize, max_size: usize },

    #[error("unknown opcode {opcode:#06X} at {address:#05X}")]
    UnknownOpcode { opcode: u16, address: u16 },

    #[error("stack overflow: call at {address:#05X} with a full call stack")]
    StackOverflow { address: u16 },

    #[error("stack underflow: return at {address:#05X} with an empty call stack")]
    StackUnderflow { address: u16 },

    #[error("memory access out of bounds at address {address:#06X}")]
    MemoryOutOfBounds { address: u16 },

    #[error("machine is halted")]
    Halted,
}

impl Chip8Error {
    /// Whether the driver has to stop running the machine after this error.
    ///
    /// Unknown opcodes are skipped and execution may continue.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Chip8Error::UnknownOpcode { .. })
    }
}
