//! error.rs — simulator error types
//!
//! A parser rejecting a block is not an error; it is a FAIL step. These
//! types cover caller mistakes and layouts that would read outside the block.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    #[error("invalid padding type 0x{0:02X} (expected 0x01 or 0x02)")]
    InvalidPaddingType(u8),

    #[error("offset {offset} out of bounds for {len}-byte block")]
    OutOfBounds { offset: usize, len: usize },

    #[error("skip length {0} does not fit in the skip-length byte")]
    SkipOverflow(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error(transparent)]
    Block(#[from] BlockError),

    #[error("skip-length byte is 0x{found:02X}, forge info expects 0x{expected:02X}")]
    SkipMismatch { expected: u8, found: u8 },

    #[error("cursor after hash read sits at {outside}, inside the populated extent ({extent})")]
    CursorInsideBlock { outside: usize, extent: usize },

    #[error("exploit trace halted on a fatal step at {sequence}")]
    TraceHalted { sequence: usize },
}
