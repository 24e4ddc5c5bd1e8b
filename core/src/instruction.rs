use std::fmt;

use rand::{Rng, RngCore};

use crate::error::Chip8Error;
use crate::opcode::Opcode;
use crate::operations::*;
use crate::state::State;

/// A decoded Chip-8 instruction.
///
/// `x` and `y` are register indices, `nn` an immediate byte, `nnn` a 12-bit address
/// and `n` a sprite height.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Instruction {
    ClearDisplay,
    Return,
    Jump { nnn: u16 },
    Call { nnn: u16 },
    SkipEqImmediate { x: usize, nn: u8 },
    SkipNeImmediate { x: usize, nn: u8 },
    SkipEqRegister { x: usize, y: usize },
    LoadImmediate { x: usize, nn: u8 },
    AddImmediate { x: usize, nn: u8 },
    Move { x: usize, y: usize },
    Or { x: usize, y: usize },
    And { x: usize, y: usize },
    Xor { x: usize, y: usize },
    AddRegister { x: usize, y: usize },
    SubRegister { x: usize, y: usize },
    ShiftRight { x: usize },
    SubReversed { x: usize, y: usize },
    ShiftLeft { x: usize },
    SkipNeRegister { x: usize, y: usize },
    LoadIndex { nnn: u16 },
    JumpIndexed { nnn: u16 },
    Random { x: usize, nn: u8 },
    Draw { x: usize, y: usize, n: u8 },
    SkipKeyPressed { x: usize },
    SkipKeyNotPressed { x: usize },
    LoadDelay { x: usize },
    WaitKey { x: usize },
    SetDelay { x: usize },
    SetSound { x: usize },
    AddIndex { x: usize },
    LoadGlyph { x: usize },
    StoreBcd { x: usize },
    StoreRegisters { x: usize },
    LoadRegisters { x: usize },
}

impl Instruction {
    /// Selects the correct Instruction for a given Opcode
    ///
    /// `pc` is only used to describe where a malformed opcode was found.
    pub fn from_op(op: u16, pc: u16) -> Result<Instruction, Chip8Error> {
        let x = op.x() as usize;
        let y = op.y() as usize;
        let instruction = match op.nibbles() {
            (0x0, 0x0, 0xE, 0x0) => Instruction::ClearDisplay,
            (0x0, 0x0, 0xE, 0xE) => Instruction::Return,
            (0x1, ..) => Instruction::Jump { nnn: op.nnn() },
            (0x2, ..) => Instruction::Call { nnn: op.nnn() },
            (0x3, ..) => Instruction::SkipEqImmediate { x, nn: op.nn() },
            (0x4, ..) => Instruction::SkipNeImmediate { x, nn: op.nn() },
            (0x5, .., 0x0) => Instruction::SkipEqRegister { x, y },
            (0x6, ..) => Instruction::LoadImmediate { x, nn: op.nn() },
            (0x7, ..) => Instruction::AddImmediate { x, nn: op.nn() },
            (0x8, .., 0x0) => Instruction::Move { x, y },
            (0x8, .., 0x1) => Instruction::Or { x, y },
            (0x8, .., 0x2) => Instruction::And { x, y },
            (0x8, .., 0x3) => Instruction::Xor { x, y },
            (0x8, .., 0x4) => Instruction::AddRegister { x, y },
            (0x8, .., 0x5) => Instruction::SubRegister { x, y },
            (0x8, .., 0x6) => Instruction::ShiftRight { x },
            (0x8, .., 0x7) => Instruction::SubReversed { x, y },
            (0x8, .., 0xE) => Instruction::ShiftLeft { x },
            (0x9, .., 0x0) => Instruction::SkipNeRegister { x, y },
            (0xA, ..) => Instruction::LoadIndex { nnn: op.nnn() },
            (0xB, ..) => Instruction::JumpIndexed { nnn: op.nnn() },
            (0xC, ..) => Instruction::Random { x, nn: op.nn() },
            (0xD, ..) => Instruction::Draw { x, y, n: op.n() },
            (0xE, _, 0x9, 0xE) => Instruction::SkipKeyPressed { x },
            (0xE, _, 0xA, 0x1) => Instruction::SkipKeyNotPressed { x },
            (0xF, _, 0x0, 0x7) => Instruction::LoadDelay { x },
            (0xF, _, 0x0, 0xA) => Instruction::WaitKey { x },
            (0xF, _, 0x1, 0x5) => Instruction::SetDelay { x },
            (0xF, _, 0x1, 0x8) => Instruction::SetSound { x },
            (0xF, _, 0x1, 0xE) => Instruction::AddIndex { x },
            (0xF, _, 0x2, 0x9) => Instruction::LoadGlyph { x },
            (0xF, _, 0x3, 0x3) => Instruction::StoreBcd { x },
            (0xF, _, 0x5, 0x5) => Instruction::StoreRegisters { x },
            (0xF, _, 0x6, 0x5) => Instruction::LoadRegisters { x },
            _ => return Err(Chip8Error::MalformedOpcode { opcode: op, pc }),
        };
        Ok(instruction)
    }

    /// Applies the instruction to `state`, returning the state that follows it.
    ///
    /// `Ok(None)` means the instruction couldn't make progress yet (waiting on a key)
    /// and `state` should be kept as is. `rng` is only drawn from by `Random`.
    pub fn execute(
        &self,
        state: &State,
        rng: &mut dyn RngCore,
    ) -> Result<Option<State>, Chip8Error> {
        let next = match *self {
            Instruction::ClearDisplay => clr(state),
            Instruction::Return => rts(state)?,
            Instruction::Jump { nnn } => jump(state, nnn),
            Instruction::Call { nnn } => call(state, nnn)?,
            Instruction::SkipEqImmediate { x, nn } => ske(state, x, nn),
            Instruction::SkipNeImmediate { x, nn } => skne(state, x, nn),
            Instruction::SkipEqRegister { x, y } => skre(state, x, y),
            Instruction::LoadImmediate { x, nn } => load(state, x, nn),
            Instruction::AddImmediate { x, nn } => add(state, x, nn),
            Instruction::Move { x, y } => mv(state, x, y),
            Instruction::Or { x, y } => or(state, x, y),
            Instruction::And { x, y } => and(state, x, y),
            Instruction::Xor { x, y } => xor(state, x, y),
            Instruction::AddRegister { x, y } => addr(state, x, y),
            Instruction::SubRegister { x, y } => sub(state, x, y),
            Instruction::ShiftRight { x } => shr(state, x),
            Instruction::SubReversed { x, y } => subn(state, x, y),
            Instruction::ShiftLeft { x } => shl(state, x),
            Instruction::SkipNeRegister { x, y } => skrne(state, x, y),
            Instruction::LoadIndex { nnn } => loadi(state, nnn),
            Instruction::JumpIndexed { nnn } => jumpi(state, nnn),
            Instruction::Random { x, nn } => rand(state, x, nn, rng.gen()),
            Instruction::Draw { x, y, n } => draw(state, x, y, n),
            Instruction::SkipKeyPressed { x } => skpr(state, x),
            Instruction::SkipKeyNotPressed { x } => skup(state, x),
            Instruction::LoadDelay { x } => moved(state, x),
            Instruction::WaitKey { x } => return Ok(keyd(state, x)),
            Instruction::SetDelay { x } => loads(state, x),
            Instruction::SetSound { x } => ld(state, x),
            Instruction::AddIndex { x } => addi(state, x),
            Instruction::LoadGlyph { x } => ldspr(state, x),
            Instruction::StoreBcd { x } => bcd(state, x),
            Instruction::StoreRegisters { x } => stor(state, x),
            Instruction::LoadRegisters { x } => read(state, x),
        };
        Ok(Some(next))
    }
}

/// Conventional assembler mnemonics, used for trace logging
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Instruction::ClearDisplay => write!(f, "CLS"),
            Instruction::Return => write!(f, "RET"),
            Instruction::Jump { nnn } => write!(f, "JP {:#05X}", nnn),
            Instruction::Call { nnn } => write!(f, "CALL {:#05X}", nnn),
            Instruction::SkipEqImmediate { x, nn } => write!(f, "SE V{:X}, {:#04X}", x, nn),
            Instruction::SkipNeImmediate { x, nn } => write!(f, "SNE V{:X}, {:#04X}", x, nn),
            Instruction::SkipEqRegister { x, y } => write!(f, "SE V{:X}, V{:X}", x, y),
            Instruction::LoadImmediate { x, nn } => write!(f, "LD V{:X}, {:#04X}", x, nn),
            Instruction::AddImmediate { x, nn } => write!(f, "ADD V{:X}, {:#04X}", x, nn),
            Instruction::Move { x, y } => write!(f, "LD V{:X}, V{:X}", x, y),
            Instruction::Or { x, y } => write!(f, "OR V{:X}, V{:X}", x, y),
            Instruction::And { x, y } => write!(f, "AND V{:X}, V{:X}", x, y),
            Instruction::Xor { x, y } => write!(f, "XOR V{:X}, V{:X}", x, y),
            Instruction::AddRegister { x, y } => write!(f, "ADD V{:X}, V{:X}", x, y),
            Instruction::SubRegister { x, y } => write!(f, "SUB V{:X}, V{:X}", x, y),
            Instruction::ShiftRight { x } => write!(f, "SHR V{:X}", x),
            Instruction::SubReversed { x, y } => write!(f, "SUBN V{:X}, V{:X}", x, y),
            Instruction::ShiftLeft { x } => write!(f, "SHL V{:X}", x),
            Instruction::SkipNeRegister { x, y } => write!(f, "SNE V{:X}, V{:X}", x, y),
            Instruction::LoadIndex { nnn } => write!(f, "LD I, {:#05X}", nnn),
            Instruction::JumpIndexed { nnn } => write!(f, "JP V0, {:#05X}", nnn),
            Instruction::Random { x, nn } => write!(f, "RND V{:X}, {:#04X}", x, nn),
            Instruction::Draw { x, y, n } => write!(f, "DRW V{:X}, V{:X}, {}", x, y, n),
            Instruction::SkipKeyPressed { x } => write!(f, "SKP V{:X}", x),
            Instruction::SkipKeyNotPressed { x } => write!(f, "SKNP V{:X}", x),
            Instruction::LoadDelay { x } => write!(f, "LD V{:X}, DT", x),
            Instruction::WaitKey { x } => write!(f, "LD V{:X}, K", x),
            Instruction::SetDelay { x } => write!(f, "LD DT, V{:X}", x),
            Instruction::SetSound { x } => write!(f, "LD ST, V{:X}", x),
            Instruction::AddIndex { x } => write!(f, "ADD I, V{:X}", x),
            Instruction::LoadGlyph { x } => write!(f, "LD F, V{:X}", x),
            Instruction::StoreBcd { x } => write!(f, "LD B, V{:X}", x),
            Instruction::StoreRegisters { x } => write!(f, "LD [I], V{:X}", x),
            Instruction::LoadRegisters { x } => write!(f, "LD V{:X}, [I]", x),
        }
    }
}
