use std::io;
use thiserror::Error;

/// Faults the VM can raise. All of these are terminal: once one is
/// returned the interpreter must not be stepped again.
///
/// Unknown opcodes are deliberately absent; they are reported through
/// [`crate::interpreter::StepOutcome::UnknownOpcode`] and execution carries
/// on.
#[derive(Debug, Error)]
pub enum Chip8Error {
    #[error("memory access out of range at address {addr:#06x}")]
    OutOfRange { addr: usize },

    #[error("stack overflow: call nested deeper than {depth} levels")]
    StackOverflow { depth: usize },

    #[error("stack underflow: return with an empty call stack")]
    StackUnderflow,

    #[error("program is too large ({size} bytes), at most {max} bytes fit")]
    ProgramTooLarge { size: usize, max: usize },

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}
