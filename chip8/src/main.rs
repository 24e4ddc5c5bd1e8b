use std::path::PathBuf;

use clap::Parser;

mod keymap;
mod run;

#[derive(Parser, Debug)]
#[command(version, about = "Runs a Chip-8 rom in an SDL2 window")]
pub struct Args {
    /// Path of the rom to load at 0x200
    rom: PathBuf,

    /// Size of each Chip-8 pixel on screen
    #[arg(short, long, default_value_t = 10)]
    scale: u32,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    run::run(args.rom, args.scale)
}
