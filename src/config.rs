use crate::input::Keymap;
use clap::Parser;
use std::path::PathBuf;

/// CHIP-8 virtual machine in a terminal
#[derive(Parser, Debug, Clone)]
#[command(name = "chip8vm", version, about)]
pub struct Config {
    /// program image to load at 0x200
    pub rom: PathBuf,

    /// instructions per second
    #[arg(long, default_value_t = 500, value_parser = clap::value_parser!(u32).range(1..))]
    pub clock_hz: u32,

    /// delay/sound timer ticks per second
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..))]
    pub timer_hz: u32,

    /// stop after this many instructions
    #[arg(long)]
    pub max_cycles: Option<u64>,

    /// keyboard layout for the hex keypad
    #[arg(long, value_enum, default_value_t = Keymap::Conventional)]
    pub keymap: Keymap,

    /// don't beep
    #[arg(long)]
    pub mute: bool,

    /// seed for the random number instruction
    #[arg(long)]
    pub seed: Option<u64>,
}
