use std::io::Read;

use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::constants::{ADDRESS_MASK, KEY_COUNT, MAX_PROGRAM_SIZE, PROGRAM_START};
use crate::error::Chip8Error;
use crate::instruction::Instruction;
use crate::state::{FrameBuffer, State};

/// What a single CPU cycle accomplished
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Progress {
    /// The instruction ran and the program counter moved on
    Executed(Instruction),
    /// A wait-for-key instruction found no key pressed; the program counter is unchanged
    AwaitingKey,
}

/// # Chip-8
/// Chip-8 is a virtual machine and corresponding interpreted language.
///
/// Tracks:
///  - current `state`, including the pressed status of every key
///  - `rng`, the source of bytes for the random instruction
///
/// Supplies interfaces for:
/// - loading roms
/// - pressing and releasing keys
/// - advancing the CPU
/// - advancing its timers
/// - inspecting its frame buffer for rendering by some display
pub struct Chip8<R: RngCore = StdRng> {
    state: State,
    rng: R,
}

impl Chip8 {
    pub fn new() -> Self {
        Chip8::with_rng(StdRng::from_entropy())
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore> Chip8<R> {
    /// Creates a Chip-8 that draws random bytes from `rng`
    pub fn with_rng(rng: R) -> Self {
        Chip8 {
            state: State::new(),
            rng,
        }
    }

    /// Puts every register, timer, key and byte of memory back to its power-on value.
    /// Any loaded rom is gone afterwards.
    pub fn reset(&mut self) {
        debug!("resetting machine state");
        self.state = State::new();
    }

    /// Copies `program` into memory starting at 0x200
    ///
    /// # Arguments
    /// * `program` raw rom bytes; no header, loaded verbatim
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), Chip8Error> {
        if program.len() > MAX_PROGRAM_SIZE {
            return Err(Chip8Error::RomTooLarge {
                size: program.len(),
                max_size: MAX_PROGRAM_SIZE,
            });
        }
        let start = PROGRAM_START as usize;
        self.state.memory[start..start + program.len()].copy_from_slice(program);
        debug!("loaded {} byte program", program.len());
        Ok(())
    }

    /// Load a rom from a source file
    ///
    /// # Arguments
    /// * `reader` a file reader that contains a ROM
    pub fn load_rom(&mut self, reader: &mut dyn Read) -> Result<(), Chip8Error> {
        // Read one byte past the limit so an oversized rom is reported rather than truncated
        let mut program = Vec::with_capacity(MAX_PROGRAM_SIZE + 1);
        reader
            .take(MAX_PROGRAM_SIZE as u64 + 1)
            .read_to_end(&mut program)?;
        self.load_program(&program)
    }

    /// Overwrites the pressed status of every key
    ///
    /// # Arguments
    /// * `keys` pressed status indexed by key 0x0..=0xF
    pub fn set_input(&mut self, keys: [bool; KEY_COUNT]) {
        self.state.pressed_keys = keys;
    }

    /// Set the pressed status of key
    ///
    /// # Arguments
    /// * `key` the 4-bit representation of the key that was pressed
    pub fn key_press(&mut self, key: u8) {
        self.state.pressed_keys[key as usize % KEY_COUNT] = true;
    }

    /// Unset the pressed status of key
    ///
    /// # Arguments
    /// * `key` the 4-bit representation of the key that was released
    pub fn key_release(&mut self, key: u8) {
        self.state.pressed_keys[key as usize % KEY_COUNT] = false;
    }

    pub fn frame_buffer(&self) -> &FrameBuffer {
        &self.state.frame_buffer
    }

    /// Whether the frame buffer changed since the flag was last cleared
    pub fn needs_redraw(&self) -> bool {
        self.state.draw_flag
    }

    /// Call after rendering the frame buffer
    pub fn clear_redraw_flag(&mut self) {
        self.state.draw_flag = false;
    }

    /// Whether a beep should currently be playing
    pub fn sound_active(&self) -> bool {
        self.state.sound_timer > 0
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Advances the CPU by a single cycle
    /// - gets, decodes and executes the next opcode
    /// - leaves the pc alone while a wait-for-key instruction has no key to take
    ///
    /// A malformed opcode is skipped over and reported; stack errors leave the state untouched.
    pub fn advance_cpu(&mut self) -> Result<Progress, Chip8Error> {
        let pc = self.state.pc;
        let op = self.state.op();
        let instruction = match Instruction::from_op(op, pc) {
            Ok(instruction) => instruction,
            Err(e) => {
                warn!("{}, skipping", e);
                self.state.pc = (pc + 0x2) & ADDRESS_MASK;
                return Err(e);
            }
        };

        trace!(
            "{:03X}: {:04X} {:<16} v{:02X?} i{:03X} sp{}",
            pc,
            op,
            instruction.to_string(),
            self.state.v,
            self.state.i,
            self.state.sp
        );

        match instruction.execute(&self.state, &mut self.rng)? {
            Some(state) => {
                self.state = state;
                Ok(Progress::Executed(instruction))
            }
            None => Ok(Progress::AwaitingKey),
        }
    }

    /// Handles the delay and sound timers
    /// - decrements each one that hasn't already reached 0
    ///
    /// Drivers pacing timers at their own rate (conventionally 60Hz) call this directly.
    pub fn advance_timers(&mut self) {
        self.state.delay_timer = self.state.delay_timer.saturating_sub(1);
        self.state.sound_timer = self.state.sound_timer.saturating_sub(1);
    }

    /// Runs one CPU cycle followed by one timer tick.
    ///
    /// Timers still tick after a malformed opcode but not after a fatal error.
    pub fn step(&mut self) -> Result<Progress, Chip8Error> {
        let progress = self.advance_cpu();
        match &progress {
            Err(e) if e.is_fatal() => {}
            _ => self.advance_timers(),
        }
        progress
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::mock::StepRng;

    use super::*;
    use crate::constants::{MEMORY_SIZE, STACK_SIZE};

    fn chip8_with(program: &[u8]) -> Chip8<StepRng> {
        let mut chip8 = Chip8::with_rng(StepRng::new(0, 1));
        chip8.load_program(program).unwrap();
        chip8
    }

    #[test]
    fn test_runs_small_program() {
        // V0 = 5; V1 = 3; V0 += V1
        let mut chip8 = chip8_with(&[0x60, 0x05, 0x61, 0x03, 0x80, 0x14, 0x00, 0x00]);
        for _ in 0..3 {
            chip8.step().unwrap();
        }
        assert_eq!(chip8.state.v[0x0], 8);
        assert_eq!(chip8.state.v[0xF], 0);
        assert_eq!(chip8.state.pc, 0x206);
    }

    #[test]
    fn test_step_reports_instruction() {
        let mut chip8 = chip8_with(&[0x00, 0xE0]);
        assert_eq!(
            chip8.step().unwrap(),
            Progress::Executed(Instruction::ClearDisplay)
        );
    }

    #[test]
    fn test_timers_count_down_to_zero() {
        // Enough harmless loads to step over
        let mut chip8 = chip8_with(&[0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00]);
        chip8.state.delay_timer = 2;
        chip8.state.sound_timer = 1;

        chip8.step().unwrap();
        assert_eq!(chip8.state.delay_timer, 1);
        assert!(!chip8.sound_active());
        chip8.step().unwrap();
        assert_eq!(chip8.state.delay_timer, 0);
        chip8.step().unwrap();
        assert_eq!(chip8.state.delay_timer, 0);
        assert_eq!(chip8.state.sound_timer, 0);
    }

    #[test]
    fn test_advance_cpu_leaves_timers() {
        let mut chip8 = chip8_with(&[0x60, 0x00]);
        chip8.state.delay_timer = 5;
        chip8.advance_cpu().unwrap();
        assert_eq!(chip8.state.delay_timer, 5);
        chip8.advance_timers();
        assert_eq!(chip8.state.delay_timer, 4);
    }

    #[test]
    fn test_set_delay_timer_then_read_it() {
        // V0 = 3; DT = V0; V1 = DT
        let mut chip8 = chip8_with(&[0x60, 0x03, 0xF0, 0x15, 0xF1, 0x07]);
        for _ in 0..3 {
            chip8.step().unwrap();
        }
        // Set to 3, ticked once after being set, then read before the next tick
        assert_eq!(chip8.state.v[0x1], 2);
        assert_eq!(chip8.state.delay_timer, 1);
    }

    #[test]
    fn test_malformed_opcode_is_skipped() {
        // Malformed 0x5121 followed by V0 = 7
        let mut chip8 = chip8_with(&[0x51, 0x21, 0x60, 0x07]);
        chip8.state.delay_timer = 1;

        let err = chip8.step().unwrap_err();
        assert!(matches!(
            err,
            Chip8Error::MalformedOpcode {
                opcode: 0x5121,
                pc: 0x200
            }
        ));
        assert!(!err.is_fatal());
        assert_eq!(chip8.state.pc, 0x202);
        assert_eq!(chip8.state.delay_timer, 0);

        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0x0], 7);
    }

    #[test]
    fn test_waits_for_key() {
        // Vx = K; then V1 = 1
        let mut chip8 = chip8_with(&[0xF0, 0x0A, 0x61, 0x01]);

        for _ in 0..3 {
            assert_eq!(chip8.step().unwrap(), Progress::AwaitingKey);
            assert_eq!(chip8.state.pc, 0x200);
        }

        chip8.key_press(0x7);
        assert_eq!(
            chip8.step().unwrap(),
            Progress::Executed(Instruction::WaitKey { x: 0 })
        );
        assert_eq!(chip8.state.v[0x0], 0x7);
        assert_eq!(chip8.state.pc, 0x202);
    }

    #[test]
    fn test_key_press_and_release() {
        let mut chip8 = chip8_with(&[]);
        chip8.key_press(0xA);
        assert!(chip8.state.pressed_keys[0xA]);
        chip8.key_release(0xA);
        assert!(!chip8.state.pressed_keys[0xA]);

        let mut keys = [false; KEY_COUNT];
        keys[0x3] = true;
        chip8.set_input(keys);
        assert_eq!(chip8.state.pressed_keys, keys);
    }

    #[test]
    fn test_skip_if_key_reads_latch() {
        // V0 = 0xE; skip if key V0 pressed
        let mut chip8 = chip8_with(&[0x60, 0x0E, 0xE0, 0x9E]);
        let mut keys = [false; KEY_COUNT];
        keys[0xE] = true;
        chip8.set_input(keys);
        chip8.step().unwrap();
        chip8.step().unwrap();
        assert_eq!(chip8.state.pc, 0x206);
    }

    #[test]
    fn test_stack_overflow_is_fatal_and_leaves_state() {
        // Calls itself forever
        let mut chip8 = chip8_with(&[0x22, 0x00]);
        chip8.state.delay_timer = 0xFF;
        for _ in 0..STACK_SIZE {
            chip8.step().unwrap();
        }
        let before = chip8.state;

        let err = chip8.step().unwrap_err();
        assert!(matches!(err, Chip8Error::StackOverflow { pc: 0x200 }));
        assert!(err.is_fatal());
        assert_eq!(chip8.state.sp, before.sp);
        assert_eq!(chip8.state.pc, before.pc);
        assert_eq!(chip8.state.stack, before.stack);
        assert_eq!(chip8.state.delay_timer, before.delay_timer);
    }

    #[test]
    fn test_stack_underflow_is_fatal() {
        let mut chip8 = chip8_with(&[0x00, 0xEE]);
        let err = chip8.step().unwrap_err();
        assert!(matches!(err, Chip8Error::StackUnderflow { pc: 0x200 }));
        assert_eq!(chip8.state.pc, 0x200);
        assert_eq!(chip8.state.sp, 0);
    }

    #[test]
    fn test_subroutine_round_trip() {
        // 0x200: call 0x206; 0x202: V1 = 2; 0x204: jump 0x204; 0x206: V0 = 1; ret
        let mut chip8 = chip8_with(&[
            0x22, 0x06, 0x61, 0x02, 0x12, 0x04, 0x60, 0x01, 0x00, 0xEE,
        ]);
        for _ in 0..5 {
            chip8.step().unwrap();
        }
        assert_eq!(chip8.state.v[0x0], 1);
        assert_eq!(chip8.state.v[0x1], 2);
        assert_eq!(chip8.state.pc, 0x204);
        assert_eq!(chip8.state.sp, 0);
    }

    #[test]
    fn test_pc_and_sp_stay_in_bounds() {
        let mut chip8 = Chip8::with_rng(StepRng::new(7, 13));
        // A mix of jumps, calls and garbage across all of memory
        let program: Vec<u8> = (0..MAX_PROGRAM_SIZE).map(|b| (b * 37 % 251) as u8).collect();
        chip8.load_program(&program).unwrap();
        for _ in 0..5000 {
            match chip8.step() {
                Err(e) if e.is_fatal() => break,
                _ => {}
            }
            assert!(chip8.state.pc <= 0xFFF);
            assert!(chip8.state.sp <= STACK_SIZE as u8);
        }
    }

    #[test]
    fn test_redraw_flag_contract() {
        let mut chip8 = chip8_with(&[0x00, 0xE0, 0x60, 0x00]);
        assert!(!chip8.needs_redraw());
        chip8.step().unwrap();
        assert!(chip8.needs_redraw());
        chip8.step().unwrap();
        // Only the consumer clears it
        assert!(chip8.needs_redraw());
        chip8.clear_redraw_flag();
        assert!(!chip8.needs_redraw());
    }

    #[test]
    fn test_draw_is_visible_through_frame_buffer() {
        // I = glyph for V0 (0); draw it at 0,0
        let mut chip8 = chip8_with(&[0xF0, 0x29, 0xD0, 0x05]);
        chip8.step().unwrap();
        chip8.step().unwrap();
        assert_eq!(chip8.frame_buffer()[0][0..4], [true, true, true, true]);
        assert!(chip8.needs_redraw());
    }

    #[test]
    fn test_random_uses_injected_source() {
        let mut chip8 = Chip8::with_rng(StepRng::new(0x5A, 0));
        chip8.load_program(&[0xC3, 0xFF]).unwrap();
        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0x3], 0x5A);
    }

    #[test]
    fn test_rom_too_large_leaves_memory() {
        let mut chip8 = chip8_with(&[0x12, 0x34]);
        let program = vec![0xAAu8; MAX_PROGRAM_SIZE + 1];
        assert!(matches!(
            chip8.load_program(&program),
            Err(Chip8Error::RomTooLarge {
                size: 0xE01,
                max_size: 0xE00
            })
        ));
        assert_eq!(chip8.state.memory[0x200..0x203], [0x12, 0x34, 0x00]);
    }

    #[test]
    fn test_largest_rom_fills_memory() {
        let mut chip8 = chip8_with(&[]);
        let program = vec![0xAAu8; MAX_PROGRAM_SIZE];
        chip8.load_program(&program).unwrap();
        assert_eq!(chip8.state.memory[MEMORY_SIZE - 1], 0xAA);
    }

    #[test]
    fn test_load_rom_from_reader() {
        let mut chip8 = chip8_with(&[]);
        let mut rom: &[u8] = &[0x00, 0xE0];
        chip8.load_rom(&mut rom).unwrap();
        assert_eq!(chip8.state.memory[0x200..0x202], [0x00, 0xE0]);
    }

    #[test]
    fn test_load_rom_rejects_oversized_reader() {
        let mut chip8 = chip8_with(&[]);
        let program = vec![0x00u8; MAX_PROGRAM_SIZE + 10];
        let mut rom: &[u8] = &program;
        assert!(matches!(
            chip8.load_rom(&mut rom),
            Err(Chip8Error::RomTooLarge { .. })
        ));
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut chip8 = chip8_with(&[0x60, 0x05, 0x00, 0xE0]);
        chip8.step().unwrap();
        chip8.step().unwrap();
        chip8.key_press(0x1);
        chip8.reset();

        assert_eq!(chip8.state.pc, 0x200);
        assert_eq!(chip8.state.v, [0; 16]);
        assert!(!chip8.needs_redraw());
        assert!(!chip8.state.pressed_keys[0x1]);
        assert_eq!(chip8.state.memory[0x200..0x204], [0; 4]);
        assert_eq!(chip8.state.memory[0x050], 0xF0);
    }
}
