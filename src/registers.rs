use crate::error::Chip8Error;
use crate::memory::CHIP8_PROGRAM_ADDR;

/// number of return addresses the call stack can hold
pub const CHIP8_STACK_DEPTH: usize = 16;

/// VF doubles as the carry/borrow/collision flag
pub const FLAG_REGISTER: usize = 0xf;

/// I only ever points into the 4K address space
const ADDRESS_MASK: u16 = 0x0fff;

/// Register file: V0..VF, the address register I, the program counter,
/// the call stack and both timers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    v: [u8; 16],
    i: u16,
    pc: u16,
    stack: [u16; CHIP8_STACK_DEPTH],
    sp: usize,
    delay_timer: u8,
    sound_timer: u8,
}

impl RegisterFile {
    pub fn new() -> Self {
        RegisterFile {
            v: [0; 16],
            i: 0,
            pc: CHIP8_PROGRAM_ADDR,
            stack: [0; CHIP8_STACK_DEPTH],
            sp: 0,
            delay_timer: 0,
            sound_timer: 0,
        }
    }

    pub fn get(&self, x: usize) -> u8 {
        self.v[x & 0xf]
    }

    pub fn set(&mut self, x: usize, value: u8) {
        self.v[x & 0xf] = value;
    }

    /// all sixteen general registers
    pub fn all(&self) -> &[u8; 16] {
        &self.v
    }

    /// V0..=Vx
    pub fn range_to(&self, x: usize) -> &[u8] {
        &self.v[..=(x & 0xf)]
    }

    /// V0..=Vx, writable
    pub fn range_to_mut(&mut self, x: usize) -> &mut [u8] {
        &mut self.v[..=(x & 0xf)]
    }

    /// Vx := Vx + value mod 256; true if the sum overflowed
    pub fn wrapping_add(&mut self, x: usize, value: u8) -> bool {
        let (sum, carry) = self.get(x).overflowing_add(value);
        self.set(x, sum);
        carry
    }

    /// Vx := Vx - value mod 256; true if no borrow occurred
    pub fn wrapping_sub(&mut self, x: usize, value: u8) -> bool {
        let (diff, borrow) = self.get(x).overflowing_sub(value);
        self.set(x, diff);
        !borrow
    }

    pub fn set_flag(&mut self, raised: bool) {
        self.v[FLAG_REGISTER] = raised as u8;
    }

    pub fn flag(&self) -> u8 {
        self.v[FLAG_REGISTER]
    }

    pub fn i(&self) -> u16 {
        self.i
    }

    pub fn set_i(&mut self, addr: u16) {
        self.i = addr & ADDRESS_MASK;
    }

    /// I := I + value mod 4096; true if the sum went past 0xfff
    pub fn add_i(&mut self, value: u8) -> bool {
        let sum = self.i + value as u16;
        self.i = sum & ADDRESS_MASK;
        sum > ADDRESS_MASK
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn jump(&mut self, addr: u16) {
        self.pc = addr;
    }

    /// move past the current instruction
    pub fn advance(&mut self) {
        self.pc = self.pc.wrapping_add(2);
    }

    /// move past the current instruction and the one after it
    pub fn skip(&mut self) {
        self.pc = self.pc.wrapping_add(4);
    }

    /// skip the next instruction if `condition` holds, otherwise just
    /// advance
    pub fn skip_if(&mut self, condition: bool) {
        if condition {
            self.skip();
        } else {
            self.advance();
        }
    }

    pub fn push(&mut self, addr: u16) -> Result<(), Chip8Error> {
        if self.sp == CHIP8_STACK_DEPTH {
            return Err(Chip8Error::StackOverflow {
                depth: CHIP8_STACK_DEPTH,
            });
        }
        self.stack[self.sp] = addr;
        self.sp += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u16, Chip8Error> {
        if self.sp == 0 {
            return Err(Chip8Error::StackUnderflow);
        }
        self.sp -= 1;
        Ok(self.stack[self.sp])
    }

    /// how many return addresses are on the stack
    pub fn stack_depth(&self) -> usize {
        self.sp
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn set_delay_timer(&mut self, value: u8) {
        self.delay_timer = value;
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn set_sound_timer(&mut self, value: u8) {
        self.sound_timer = value;
    }

    /// one 60Hz tick: both timers count down towards zero and stop there
    pub fn decrement_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}
