//! # chip8vm
//!
//! ## Design
//!
//! * the VM core is pure state: memory, registers, framebuffer; no I/O
//! * one owned [`interpreter::Chip8Interpreter`] per VM, stepped through
//!   `&mut`; no globals
//! * instruction decode produces a tagged [`instruction::Instruction`] so
//!   every instruction can be executed and tested on its own
//! * the random source is a type parameter, so tests can make `Cxkk`
//!   deterministic
//! * abstract display, input and sound so alternatives can be plugged in;
//!   starting with TUI in-console
//! * instructions and the 60Hz timers run off separate wall-clock
//!   cadences; running faster or slower never changes how long a timer
//!   takes to run down
//!
//! Faults (bad addresses, stack over/underflow) stop the VM. Unknown
//! opcodes don't: they are logged, skipped, and counted.
//!
//! Model
//!
//! Environment
//!  |-- config (clap), logging (env_logger)
//!  |-- display, input, sound
//!  |-- interpreter(memory, registers, framebuffer, rng)
//!  |    `-- instruction decode
//!  `-- emulator main loop
//!       |-- keys = input.poll_keys()
//!       |-- for each due timer tick: interpreter.tick_timers()
//!       |-- sound.signal(interpreter.sound_timer())
//!       |-- for each due cycle: interpreter.step(&keys)
//!       |-- redraw if the framebuffer changed
//!       `-- sleep until the next cycle or tick is due
pub mod config;
pub mod display;
pub mod emulator;
pub mod error;
pub mod framebuffer;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod memory;
pub mod registers;
pub mod sound;
pub mod timer;

pub use error::Chip8Error;
pub use interpreter::{Chip8Interpreter, StepOutcome};

/// up/down state of the sixteen hex keys, indexed by key value
pub type Keypad = [bool; 16];
