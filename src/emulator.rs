use crate::display::Display;
use crate::input::Input;
use crate::interpreter::{Chip8Interpreter, StepOutcome};
use crate::sound::Sound;
use crate::timer::Cadence;
use log::{error, info};
use rand::rngs::StdRng;
use rand::RngCore;
use std::error::Error;
use std::time::{Duration, Instant};

/// why the main loop stopped, if it stopped cleanly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// the user asked to quit
    Quit,
    /// the configured number of instructions ran
    CycleLimit,
}

/// Wires the interpreter to a display, a keypad and a tone generator, and
/// paces it against the wall clock: instructions at `clock_hz`, timer
/// ticks at `timer_hz`, redraws only when the framebuffer changed.
pub struct Chip8Emulator<'a, R: RngCore = StdRng> {
    interpreter: Chip8Interpreter<R>,
    display: &'a mut dyn Display,
    input: &'a mut dyn Input,
    sound: &'a mut dyn Sound,
    cpu: Cadence,
    timers: Cadence,
    max_cycles: Option<u64>,
    cycles: u64,
    unknown_opcodes: u64,
}

impl<'a, R: RngCore> Chip8Emulator<'a, R> {
    pub fn new(
        interpreter: Chip8Interpreter<R>,
        display: &'a mut dyn Display,
        input: &'a mut dyn Input,
        sound: &'a mut dyn Sound,
        clock_hz: u32,
        timer_hz: u32,
    ) -> Self {
        Chip8Emulator {
            interpreter,
            display,
            input,
            sound,
            cpu: Cadence::from_hz(clock_hz),
            timers: Cadence::from_hz(timer_hz),
            max_cycles: None,
            cycles: 0,
            unknown_opcodes: 0,
        }
    }

    pub fn with_max_cycles(mut self, max_cycles: Option<u64>) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    pub fn interpreter(&self) -> &Chip8Interpreter<R> {
        &self.interpreter
    }

    /// instructions stepped so far, including skipped unknown ones
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn unknown_opcodes(&self) -> u64 {
        self.unknown_opcodes
    }

    /// run until the user quits, the cycle limit is hit, or the VM faults
    pub fn main_loop(&mut self) -> Result<Halt, Box<dyn Error>> {
        let mut last = Instant::now();
        loop {
            let now = Instant::now();
            if let Some(halt) = self.run_for(now - last)? {
                info!(
                    "stopped after {} cycles ({} unknown opcodes): {:?}",
                    self.cycles, self.unknown_opcodes, halt
                );
                return Ok(halt);
            }
            last = now;
            spin_sleep::sleep(self.cpu.until_next().min(self.timers.until_next()));
        }
    }

    /// one pass of the host loop covering `elapsed` wall-clock time: read
    /// the keypad, tick the timers, step the due instructions, then redraw
    pub fn run_for(&mut self, elapsed: Duration) -> Result<Option<Halt>, Box<dyn Error>> {
        let keys = self.input.poll_keys()?;
        if self.input.quit_requested() {
            return Ok(Some(Halt::Quit));
        }

        for _ in 0..self.timers.advance(elapsed) {
            self.interpreter.tick_timers();
        }
        self.sound.signal(self.interpreter.sound_timer())?;

        let mut halt = None;
        for _ in 0..self.cpu.advance(elapsed) {
            if self.max_cycles.map_or(false, |max| self.cycles >= max) {
                halt = Some(Halt::CycleLimit);
                break;
            }
            match self.interpreter.step(&keys) {
                Ok(StepOutcome::UnknownOpcode(_)) => self.unknown_opcodes += 1,
                Ok(_) => {}
                Err(e) => {
                    error!(
                        "VM fault at {:03x} after {} cycles: {}",
                        self.interpreter.registers().pc(),
                        self.cycles,
                        e
                    );
                    return Err(e.into());
                }
            }
            self.cycles += 1;
        }

        if self.interpreter.take_display_changed() {
            self.display.draw(self.interpreter.framebuffer())?;
        }
        Ok(halt)
    }
}
