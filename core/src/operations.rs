use crate::constants::{ADDRESS_MASK, DISPLAY_HEIGHT, DISPLAY_WIDTH, KEY_COUNT, STACK_SIZE};
use crate::error::Chip8Error;
use crate::sprites::glyph_address;
use crate::state::State;

/// VF; the flag register
const FLAG: usize = 0xF;

/// pc + by, kept inside addressable memory
fn advance(pc: u16, by: u16) -> u16 {
    pc.wrapping_add(by) & ADDRESS_MASK
}

/// pc += 4 when `condition` holds, otherwise pc += 2
fn skip_if(condition: bool, state: &State) -> State {
    let pc = if condition {
        advance(state.pc, 0x4)
    } else {
        advance(state.pc, 0x2)
    };
    State { pc, ..*state }
}

fn with_v(v: [u8; 16], state: &State) -> State {
    State {
        pc: advance(state.pc, 0x2),
        v,
        ..*state
    }
}

/// clear
pub fn clr(state: &State) -> State {
    State {
        pc: advance(state.pc, 0x2),
        frame_buffer: [[false; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
        draw_flag: true,
        ..*state
    }
}

/// PC = STACK.pop()
pub fn rts(state: &State) -> Result<State, Chip8Error> {
    if state.sp == 0 {
        return Err(Chip8Error::StackUnderflow { pc: state.pc });
    }
    let sp = state.sp - 0x1;
    Ok(State {
        pc: advance(state.stack[sp as usize], 0x2),
        sp,
        ..*state
    })
}

/// PC = addr
pub fn jump(state: &State, nnn: u16) -> State {
    State {
        pc: nnn & ADDRESS_MASK,
        ..*state
    }
}

/// STACK.push(PC); PC = addr
pub fn call(state: &State, nnn: u16) -> Result<State, Chip8Error> {
    if state.sp as usize >= STACK_SIZE {
        return Err(Chip8Error::StackOverflow { pc: state.pc });
    }
    let mut stack = state.stack;
    stack[state.sp as usize] = state.pc;
    Ok(State {
        pc: nnn & ADDRESS_MASK,
        sp: state.sp + 0x1,
        stack,
        ..*state
    })
}

/// if Vx == nn then pc += 2
pub fn ske(state: &State, x: usize, nn: u8) -> State {
    skip_if(state.v[x] == nn, state)
}

/// if Vx != nn then pc += 2
pub fn skne(state: &State, x: usize, nn: u8) -> State {
    skip_if(state.v[x] != nn, state)
}

/// if Vx == Vy then pc += 2
pub fn skre(state: &State, x: usize, y: usize) -> State {
    skip_if(state.v[x] == state.v[y], state)
}

/// Vx = nn
pub fn load(state: &State, x: usize, nn: u8) -> State {
    let mut v = state.v;
    v[x] = nn;
    with_v(v, state)
}

/// Vx += nn
/// Overflow wraps and VF is left alone
pub fn add(state: &State, x: usize, nn: u8) -> State {
    let mut v = state.v;
    v[x] = v[x].wrapping_add(nn);
    with_v(v, state)
}

/// Vx = Vy
pub fn mv(state: &State, x: usize, y: usize) -> State {
    let mut v = state.v;
    v[x] = v[y];
    with_v(v, state)
}

/// Vx |= Vy
pub fn or(state: &State, x: usize, y: usize) -> State {
    let mut v = state.v;
    v[x] |= v[y];
    with_v(v, state)
}

/// Vx &= Vy
pub fn and(state: &State, x: usize, y: usize) -> State {
    let mut v = state.v;
    v[x] &= v[y];
    with_v(v, state)
}

/// Vx ^= Vy
pub fn xor(state: &State, x: usize, y: usize) -> State {
    let mut v = state.v;
    v[x] ^= v[y];
    with_v(v, state)
}

/// Vx += Vy; VF = overflow
pub fn addr(state: &State, x: usize, y: usize) -> State {
    let (res, over) = state.v[x].overflowing_add(state.v[y]);
    let mut v = state.v;
    v[FLAG] = u8::from(over);
    v[x] = res;
    with_v(v, state)
}

/// Vx -= Vy; VF = !underflow
pub fn sub(state: &State, x: usize, y: usize) -> State {
    let (res, under) = state.v[x].overflowing_sub(state.v[y]);
    let mut v = state.v;
    v[FLAG] = u8::from(!under);
    v[x] = res;
    with_v(v, state)
}

/// Vx >>= 1; VF = shifted out bit
pub fn shr(state: &State, x: usize) -> State {
    let before = state.v[x];
    let mut v = state.v;
    v[FLAG] = before & 0x1;
    v[x] = before >> 1;
    with_v(v, state)
}

/// Vx = Vy - Vx; VF = !underflow
pub fn subn(state: &State, x: usize, y: usize) -> State {
    let (res, under) = state.v[y].overflowing_sub(state.v[x]);
    let mut v = state.v;
    v[FLAG] = u8::from(!under);
    v[x] = res;
    with_v(v, state)
}

/// Vx <<= 1; VF = shifted out bit
pub fn shl(state: &State, x: usize) -> State {
    let before = state.v[x];
    let mut v = state.v;
    v[FLAG] = before >> 7;
    v[x] = before << 1;
    with_v(v, state)
}

/// if Vx != Vy then pc +=2
pub fn skrne(state: &State, x: usize, y: usize) -> State {
    skip_if(state.v[x] != state.v[y], state)
}

/// I = addr
pub fn loadi(state: &State, nnn: u16) -> State {
    State {
        pc: advance(state.pc, 0x2),
        i: nnn & ADDRESS_MASK,
        ..*state
    }
}

/// PC = V0 + addr
pub fn jumpi(state: &State, nnn: u16) -> State {
    State {
        pc: (u16::from(state.v[0x0]) + nnn) & ADDRESS_MASK,
        ..*state
    }
}

/// Vx = random_byte & nn
pub fn rand(state: &State, x: usize, nn: u8, random_byte: u8) -> State {
    let mut v = state.v;
    v[x] = random_byte & nn;
    with_v(v, state)
}

/// draw_sprite(x=Vx y=Vy size=n)
/// XORs a sprite from memory i..i+n at position Vx, Vy on the FrameBuffer.
/// Every cell wraps around the edges independently.
/// Sets VF if any pixel is erased.
pub fn draw(state: &State, x: usize, y: usize, n: u8) -> State {
    // Read the origin before VF is reset in case either register is VF
    let origin_x = state.v[x] as usize;
    let origin_y = state.v[y] as usize;

    let mut v = state.v;
    let mut frame_buffer = state.frame_buffer;
    v[FLAG] = 0x0;

    for row in 0..n {
        let sprite = state.byte(state.i.wrapping_add(u16::from(row)));
        let py = (origin_y + row as usize) % DISPLAY_HEIGHT;
        for bit in 0..8 {
            if (sprite >> (7 - bit)) & 0x1 == 0 {
                continue;
            }
            let px = (origin_x + bit) % DISPLAY_WIDTH;
            if frame_buffer[py][px] {
                v[FLAG] = 0x1;
            }
            frame_buffer[py][px] ^= true;
        }
    }

    State {
        pc: advance(state.pc, 0x2),
        draw_flag: true,
        v,
        frame_buffer,
        ..*state
    }
}

/// Only the low nibble of Vx names a key
fn key_pressed(state: &State, x: usize) -> bool {
    state.pressed_keys[state.v[x] as usize % KEY_COUNT]
}

/// if Vx.pressed then pc += 2
pub fn skpr(state: &State, x: usize) -> State {
    skip_if(key_pressed(state, x), state)
}

/// if !Vx.pressed then pc += 2
pub fn skup(state: &State, x: usize) -> State {
    skip_if(!key_pressed(state, x), state)
}

/// Vx = DT
pub fn moved(state: &State, x: usize) -> State {
    let mut v = state.v;
    v[x] = state.delay_timer;
    with_v(v, state)
}

/// Vx = first pressed key
/// Returns `None` while nothing is pressed so the caller can retry without moving the pc
pub fn keyd(state: &State, x: usize) -> Option<State> {
    let key = state.pressed_keys.iter().position(|&pressed| pressed)?;
    let mut v = state.v;
    v[x] = key as u8;
    Some(with_v(v, state))
}

/// DT = Vx
pub fn loads(state: &State, x: usize) -> State {
    State {
        pc: advance(state.pc, 0x2),
        delay_timer: state.v[x],
        ..*state
    }
}

/// ST = Vx
pub fn ld(state: &State, x: usize) -> State {
    State {
        pc: advance(state.pc, 0x2),
        sound_timer: state.v[x],
        ..*state
    }
}

/// I += Vx; VF = I leaves addressable memory
pub fn addi(state: &State, x: usize) -> State {
    let sum = state.i + u16::from(state.v[x]);
    let mut v = state.v;
    v[FLAG] = u8::from(sum > ADDRESS_MASK);
    State {
        pc: advance(state.pc, 0x2),
        i: sum & ADDRESS_MASK,
        v,
        ..*state
    }
}

/// I = address of the glyph for Vx
/// See sprites::SPRITE_SHEET for more details
pub fn ldspr(state: &State, x: usize) -> State {
    State {
        pc: advance(state.pc, 0x2),
        i: glyph_address(state.v[x]),
        ..*state
    }
}

/// mem[I..I+3] = bcd(Vx)
pub fn bcd(state: &State, x: usize) -> State {
    let value = state.v[x];
    let mut next = *state;
    next.set_byte(state.i, value / 100);
    next.set_byte(state.i.wrapping_add(1), value / 10 % 10);
    next.set_byte(state.i.wrapping_add(2), value % 10);
    next.pc = advance(state.pc, 0x2);
    next
}

/// mem[I..=I+x] = V0..=Vx
/// I is left unchanged
pub fn stor(state: &State, x: usize) -> State {
    let mut next = *state;
    for (offset, &value) in state.v[..=x].iter().enumerate() {
        next.set_byte(state.i.wrapping_add(offset as u16), value);
    }
    next.pc = advance(state.pc, 0x2);
    next
}

/// V0..=Vx = mem[I..=I+x]
/// I is left unchanged
pub fn read(state: &State, x: usize) -> State {
    let mut v = state.v;
    for (offset, register) in v[..=x].iter_mut().enumerate() {
        *register = state.byte(state.i.wrapping_add(offset as u16));
    }
    with_v(v, state)
}
