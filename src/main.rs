use clap::Parser;
use env_logger::Env;
use log::info;
use std::error::Error;

use chip8vm::config::Config;
use chip8vm::display::MonoTermDisplay;
use chip8vm::emulator::Chip8Emulator;
use chip8vm::input::StdinInput;
use chip8vm::interpreter::Chip8Interpreter;
use chip8vm::sound::{Mute, SimpleBeep, Sound};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    let config = Config::parse();

    // load the program before touching the terminal, so a bad path is
    // reported on a sane screen
    let mut interpreter = match config.seed {
        Some(seed) => Chip8Interpreter::with_seed(seed),
        None => Chip8Interpreter::new(),
    };
    let len = interpreter.load_program_file(&config.rom)?;
    info!("loaded {} ({} bytes)", config.rom.display(), len);

    // initialise
    let mut display = MonoTermDisplay::new()?;
    let mut input = StdinInput::new(config.keymap)?;
    let mut beeper = SimpleBeep::new();
    let mut mute = Mute::new();
    let sound: &mut dyn Sound = if config.mute { &mut mute } else { &mut beeper };

    let mut emulator = Chip8Emulator::new(
        interpreter,
        &mut display,
        &mut input,
        sound,
        config.clock_hz,
        config.timer_hz,
    )
    .with_max_cycles(config.max_cycles);
    let halt = emulator.main_loop()?;
    info!("{:?} after {} cycles", halt, emulator.cycles());
    Ok(())
}
