pub use chip8::{Chip8, Progress};
pub use constants::{CLOCK_SPEED, TIMER_HZ};
pub use error::Chip8Error;
pub use instruction::Instruction;
pub use state::{FrameBuffer, State};

mod chip8;
pub mod constants;
mod error;
mod instruction;
pub mod opcode;
mod operations;
pub mod sprites;
pub mod state;
