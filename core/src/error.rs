use std::io;

use thiserror::Error;

/// Everything that can go wrong while loading or running a program.
///
/// `MalformedOpcode` is recoverable: the program counter has already moved past the
/// offending word and the machine can keep stepping. The stack errors leave the state
/// untouched and mean the program can't meaningfully continue.
#[derive(Debug, Error)]
pub enum Chip8Error {
    #[error("Malformed opcode {opcode:#06X} at {pc:#05X}")]
    MalformedOpcode { opcode: u16, pc: u16 },

    #[error("ROM is too large ({size} bytes), max size is {max_size} bytes")]
    RomTooLarge { size: usize, max_size: usize },

    #[error("Stack overflow: call at {pc:#05X} with a full call stack")]
    StackOverflow { pc: u16 },

    #[error("Stack underflow: return at {pc:#05X} with an empty call stack")]
    StackUnderflow { pc: u16 },

    #[error("Unable to read ROM ({0})")]
    Io(#[from] io::Error),
}

impl Chip8Error {
    /// Whether a driver should stop stepping after seeing this error
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Chip8Error::StackOverflow { .. } | Chip8Error::StackUnderflow { .. }
        )
    }
}
