/// Total addressable memory in bytes (0x000..=0xFFF)
pub const MEMORY_SIZE: usize = 0x1000;

/// Mask applied to every address the CPU produces
pub const ADDRESS_MASK: u16 = 0x0FFF;

/// Where ROMs are loaded and where the program counter starts
pub const PROGRAM_START: u16 = 0x200;

/// The largest ROM that fits between `PROGRAM_START` and the end of memory
pub const MAX_PROGRAM_SIZE: usize = MEMORY_SIZE - PROGRAM_START as usize;

/// Number of return addresses the call stack can hold
pub const STACK_SIZE: usize = 16;

/// Number of keys on the hexadecimal keypad
pub const KEY_COUNT: usize = 16;

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

/// Nanoseconds per CPU cycle for drivers that want the conventional ~500Hz
pub const CLOCK_SPEED: u64 = 2_000_000;

/// Rate at which drivers should call `advance_timers`
pub const TIMER_HZ: u64 = 60;
