use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use sdl2::event::Event;
use sdl2::keyboard::Keycode;

use chip8_core::{Chip8, CLOCK_SPEED, TIMER_HZ};
use chip8_display::Display;

use crate::keymap::keymap;

pub fn run(rom: PathBuf, scale: u32) -> Result<()> {
    let mut chip8: Chip8 = Chip8::new();

    // Load ROM
    let file = File::open(&rom).with_context(|| format!("unable to open {}", rom.display()))?;
    let mut reader = BufReader::new(file);
    chip8
        .load_rom(&mut reader)
        .with_context(|| format!("unable to load {}", rom.display()))?;
    info!("loaded ROM {}", rom.display());

    // Get SDL2 context
    let sdl: sdl2::Sdl = sdl2::init().map_err(|e| anyhow!(e))?;
    let mut display: Display = Display::new(&sdl, scale)?;
    let mut events = sdl.event_pump().map_err(|e| anyhow!(e))?;
    display.render(chip8.frame_buffer())?;

    // Set initial timing
    let cycle_time = Duration::from_nanos(CLOCK_SPEED);
    let timer_time = Duration::from_nanos(1_000_000_000 / TIMER_HZ);
    let mut last_cycle = Instant::now();
    let mut last_timer = last_cycle;

    'event: loop {
        // If the draw flag is set, render the current frame and unset it
        if chip8.needs_redraw() {
            display.render(chip8.frame_buffer())?;
            chip8.clear_redraw_flag();
        }

        // Handle input
        for event in events.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => break 'event,
                Event::KeyDown {
                    keycode: Some(key), ..
                } => {
                    if let Some(kc) = keymap(key) {
                        chip8.key_press(kc)
                    }
                }
                Event::KeyUp {
                    keycode: Some(key), ..
                } => {
                    if let Some(kc) = keymap(key) {
                        chip8.key_release(kc)
                    }
                }
                _ => continue,
            };
        }

        // Update state
        if let Err(e) = chip8.advance_cpu() {
            if e.is_fatal() {
                error!("halting: {}", e);
                return Err(e.into());
            }
        }

        // Handle timing
        let current_time = Instant::now();
        while current_time - last_timer >= timer_time {
            chip8.advance_timers();
            last_timer += timer_time;
        }
        let elapsed_cycle_time = current_time - last_cycle;
        if cycle_time > elapsed_cycle_time {
            std::thread::sleep(cycle_time - elapsed_cycle_time);
        }
        last_cycle = Instant::now();
    }

    info!("window closed, exiting");
    Ok(())
}
