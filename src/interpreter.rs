//! # interpreter
//!
//! The fetch/decode/execute core. One call to [`Chip8Interpreter::step`]
//! runs exactly one instruction to completion, or does nothing at all if
//! the instruction faults: every range and stack check happens before
//! any state is touched.
//!
//! Program counter policy: every instruction moves the PC on by 2, except
//!  * jumps and calls, which set it outright
//!  * return, which sets it to the popped call site + 2
//!  * skips whose condition holds, which move it on by 4
//!  * `Fx0A`, which leaves it alone until a key goes down
//!
//! The timers are not touched by `step`; the host drives them through
//! [`Chip8Interpreter::tick_timers`] at 60Hz however fast it steps.

use crate::error::Chip8Error;
use crate::framebuffer::Framebuffer;
use crate::instruction::Instruction;
use crate::memory::{Chip8MemoryMap, MemoryMap};
use crate::registers::RegisterFile;
use crate::Keypad;
use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::fs::File;
use std::io;
use std::path::Path;

/// what happened during a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// an instruction ran to completion
    Executed(Instruction),
    /// parked on `Fx0A`; the PC has not moved
    WaitingForKey,
    /// the word at the PC doesn't decode; it was skipped over
    UnknownOpcode(u16),
}

pub struct Chip8Interpreter<R: RngCore = StdRng> {
    memory: Chip8MemoryMap,
    registers: RegisterFile,
    framebuffer: Framebuffer,
    rng: R,
    /// target register of a pending `Fx0A`
    key_wait: Option<usize>,
    previous_keys: Keypad,
    display_changed: bool,
}

impl Chip8Interpreter<StdRng> {
    /// interpreter with an entropy-seeded random source
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// interpreter whose `Cxkk` sequence is reproducible
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for Chip8Interpreter<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore> Chip8Interpreter<R> {
    pub fn with_rng(rng: R) -> Self {
        Chip8Interpreter {
            memory: Chip8MemoryMap::new(),
            registers: RegisterFile::new(),
            framebuffer: Framebuffer::new(),
            rng,
            key_wait: None,
            previous_keys: [false; 16],
            display_changed: true,
        }
    }

    /// load a chip8 program at 0x200, returning its size in bytes
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize, Chip8Error> {
        let len = self.memory.load_program(reader)?;
        debug!("loaded {} byte program", len);
        Ok(len)
    }

    /// load a program straight from a file
    pub fn load_program_file(&mut self, path: &Path) -> Result<usize, Chip8Error> {
        let mut f = File::open(path)?;
        self.load_program(&mut f)
    }

    pub fn memory(&self) -> &Chip8MemoryMap {
        &self.memory
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// nonzero means a tone should be playing
    pub fn sound_timer(&self) -> u8 {
        self.registers.sound_timer()
    }

    pub fn is_waiting_for_key(&self) -> bool {
        self.key_wait.is_some()
    }

    /// true if the framebuffer changed since the last call
    pub fn take_display_changed(&mut self) -> bool {
        std::mem::replace(&mut self.display_changed, false)
    }

    /// the 60Hz timer driver
    pub fn tick_timers(&mut self) {
        self.registers.decrement_timers();
    }

    /// run one instruction against the given key state
    pub fn step(&mut self, keys: &Keypad) -> Result<StepOutcome, Chip8Error> {
        let previous = std::mem::replace(&mut self.previous_keys, *keys);

        if let Some(x) = self.key_wait {
            let pressed = (0..keys.len()).find(|&k| keys[k] && !previous[k]);
            return Ok(match pressed {
                Some(key) => {
                    debug!("key {:X} pressed, loaded into V{:X}", key, x);
                    self.registers.set(x, key as u8);
                    self.registers.advance();
                    self.key_wait = None;
                    StepOutcome::Executed(Instruction::WaitKey { x })
                }
                None => StepOutcome::WaitingForKey,
            });
        }

        let pc = self.registers.pc();
        let word = self.memory.read_instruction(pc)?;
        let instruction = Instruction::decode(word);
        trace!("{:03x}: {:04x}  {}", pc, word, instruction);
        self.execute(instruction, keys)
    }

    /// apply a decoded instruction; public so single instructions can be
    /// exercised without assembling a program
    pub fn execute(&mut self, instruction: Instruction, keys: &Keypad) -> Result<StepOutcome, Chip8Error> {
        use Instruction::*;

        let regs = &mut self.registers;
        match instruction {
            ClearScreen => {
                self.framebuffer.clear();
                self.display_changed = true;
                regs.advance();
            }
            Return => {
                let call_site = regs.pop()?;
                debug!("return to {:03x}", call_site);
                regs.jump(call_site);
                regs.advance();
            }
            Jump { nnn } => regs.jump(nnn),
            Call { nnn } => {
                regs.push(regs.pc())?;
                debug!("call {:03x} from {:03x}", nnn, regs.pc());
                regs.jump(nnn);
            }
            SkipEqImm { x, kk } => regs.skip_if(regs.get(x) == kk),
            SkipNeImm { x, kk } => regs.skip_if(regs.get(x) != kk),
            SkipEqReg { x, y } => regs.skip_if(regs.get(x) == regs.get(y)),
            SkipNeReg { x, y } => regs.skip_if(regs.get(x) != regs.get(y)),
            SkipKeyPressed { x } => regs.skip_if(is_pressed(keys, regs.get(x))),
            SkipKeyNotPressed { x } => regs.skip_if(!is_pressed(keys, regs.get(x))),
            LoadImm { x, kk } => {
                regs.set(x, kk);
                regs.advance();
            }
            AddImm { x, kk } => {
                // carry is dropped; VF is left alone
                regs.wrapping_add(x, kk);
                regs.advance();
            }
            Move { x, y } => {
                regs.set(x, regs.get(y));
                regs.advance();
            }
            Or { x, y } => {
                regs.set(x, regs.get(x) | regs.get(y));
                regs.advance();
            }
            And { x, y } => {
                regs.set(x, regs.get(x) & regs.get(y));
                regs.advance();
            }
            Xor { x, y } => {
                regs.set(x, regs.get(x) ^ regs.get(y));
                regs.advance();
            }
            AddReg { x, y } => {
                let carry = regs.wrapping_add(x, regs.get(y));
                regs.set_flag(carry);
                regs.advance();
            }
            SubReg { x, y } => {
                let no_borrow = regs.wrapping_sub(x, regs.get(y));
                regs.set_flag(no_borrow);
                regs.advance();
            }
            SubReverse { x, y } => {
                let (vx, vy) = (regs.get(x), regs.get(y));
                regs.set(x, vy.wrapping_sub(vx));
                regs.set_flag(vy >= vx);
                regs.advance();
            }
            ShiftRight { x, .. } => {
                let vx = regs.get(x);
                regs.set(x, vx >> 1);
                regs.set_flag(vx & 0x01 == 1);
                regs.advance();
            }
            ShiftLeft { x, .. } => {
                let vx = regs.get(x);
                regs.set(x, vx << 1);
                regs.set_flag(vx >> 7 == 1);
                regs.advance();
            }
            LoadI { nnn } => {
                regs.set_i(nnn);
                regs.advance();
            }
            JumpOffset { nnn } => regs.jump(nnn + regs.get(0) as u16),
            Random { x, kk } => {
                regs.set(x, self.rng.gen::<u8>() & kk);
                regs.advance();
            }
            Draw { x, y, n } => {
                let sprite = self.memory.get_ro_slice(regs.i(), n as usize)?;
                let collision = self.framebuffer.draw(
                    regs.get(y) as usize,
                    regs.get(x) as usize,
                    sprite,
                );
                regs.set_flag(collision);
                self.display_changed = true;
                regs.advance();
            }
            LoadDelay { x } => {
                regs.set(x, regs.delay_timer());
                regs.advance();
            }
            WaitKey { x } => {
                debug!("waiting for a key into V{:X}", x);
                self.key_wait = Some(x);
                return Ok(StepOutcome::WaitingForKey);
            }
            SetDelay { x } => {
                regs.set_delay_timer(regs.get(x));
                regs.advance();
            }
            SetSound { x } => {
                regs.set_sound_timer(regs.get(x));
                regs.advance();
            }
            AddI { x } => {
                let overflow = regs.add_i(regs.get(x));
                regs.set_flag(overflow);
                regs.advance();
            }
            LoadGlyph { x } => {
                regs.set_i(Chip8MemoryMap::glyph_addr(regs.get(x)));
                regs.advance();
            }
            StoreBcd { x } => {
                let vx = regs.get(x);
                self.memory.load(regs.i(), &[vx / 100, (vx / 10) % 10, vx % 10])?;
                regs.advance();
            }
            StoreRegisters { x } => {
                self.memory.load(regs.i(), regs.range_to(x))?;
                regs.advance();
            }
            LoadRegisters { x } => {
                let src = self.memory.get_ro_slice(regs.i(), x + 1)?;
                regs.range_to_mut(x).copy_from_slice(src);
                regs.advance();
            }
            Unknown(word) => {
                warn!("unknown opcode {:04x} at {:03x}, skipping", word, regs.pc());
                regs.advance();
                return Ok(StepOutcome::UnknownOpcode(word));
            }
        }
        Ok(StepOutcome::Executed(instruction))
    }
}

fn is_pressed(keys: &Keypad, key: u8) -> bool {
    keys[(key & 0x0f) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::FLAG_REGISTER;
    use rand::rngs::mock::StepRng;

    const NO_KEYS: Keypad = [false; 16];

    fn vm(program: &[u8]) -> Chip8Interpreter<StepRng> {
        let mut i = Chip8Interpreter::with_rng(StepRng::new(0xab, 1));
        let mut prog = program;
        i.load_program(&mut prog).unwrap();
        i
    }

    fn run(i: &mut Chip8Interpreter<StepRng>, steps: usize) -> Result<(), Chip8Error> {
        for _ in 0..steps {
            i.step(&NO_KEYS)?;
        }
        Ok(())
    }

    fn key(k: usize) -> Keypad {
        let mut keys = NO_KEYS;
        keys[k] = true;
        keys
    }

    #[test]
    fn test_program_load_ok() -> Result<(), Chip8Error> {
        let mut i = Chip8Interpreter::new();
        let mut prog: &[u8] = &[0x00, 0xe0]; // clear screen
        assert_eq!(i.load_program(&mut prog)?, 2);
        assert_eq!(i.memory().read_instruction(0x200)?, 0x00e0);
        Ok(())
    }

    #[test]
    fn test_missing_program_file() {
        let mut i = Chip8Interpreter::new();
        let result = i.load_program_file(Path::new("/nonexistent/rom.ch8"));
        assert!(matches!(result, Err(Chip8Error::Io(_))));
    }

    #[test]
    fn test_clear_screen() -> Result<(), Chip8Error> {
        // LD I, 0x50; DRW V0, V0, 5; CLS
        let mut i = vm(&[0xa0, 0x50, 0xd0, 0x05, 0x00, 0xe0]);
        run(&mut i, 2)?;
        assert!(i.framebuffer().lit_count() > 0);
        run(&mut i, 1)?;
        assert_eq!(i.framebuffer().lit_count(), 0);
        assert_eq!(i.registers().pc(), 0x206);
        Ok(())
    }

    #[test]
    fn test_call_then_return() -> Result<(), Chip8Error> {
        // 0x200: CALL 0x300 ... 0x300: RET
        let mut i = vm(&[0x23, 0x00]);
        i.memory.load(0x300, &[0x00, 0xee])?;
        i.step(&NO_KEYS)?;
        assert_eq!(i.registers().pc(), 0x300);
        assert_eq!(i.registers().stack_depth(), 1);
        i.step(&NO_KEYS)?;
        assert_eq!(i.registers().pc(), 0x202);
        assert_eq!(i.registers().stack_depth(), 0);
        Ok(())
    }

    #[test]
    fn test_return_with_empty_stack_is_fatal() {
        let mut i = vm(&[0x00, 0xee]);
        assert!(matches!(i.step(&NO_KEYS), Err(Chip8Error::StackUnderflow)));
        assert_eq!(i.registers().pc(), 0x200);
    }

    #[test]
    fn test_call_recursion_overflows() {
        // CALL 0x200 forever
        let mut i = vm(&[0x22, 0x00]);
        for _ in 0..16 {
            i.step(&NO_KEYS).unwrap();
        }
        assert!(matches!(
            i.step(&NO_KEYS),
            Err(Chip8Error::StackOverflow { .. })
        ));
    }

    #[test]
    fn test_jump() -> Result<(), Chip8Error> {
        let mut i = vm(&[0x1a, 0xbc]);
        i.step(&NO_KEYS)?;
        assert_eq!(i.registers().pc(), 0xabc);
        Ok(())
    }

    #[test]
    fn test_jump_with_offset() -> Result<(), Chip8Error> {
        // LD V0, 0x10; JP V0, 0x300
        let mut i = vm(&[0x60, 0x10, 0xb3, 0x00]);
        run(&mut i, 2)?;
        assert_eq!(i.registers().pc(), 0x310);
        Ok(())
    }

    #[test]
    fn test_jump_with_offset_past_top_faults_on_fetch() -> Result<(), Chip8Error> {
        // LD V0, 0xff; JP V0, 0xfff
        let mut i = vm(&[0x60, 0xff, 0xbf, 0xff]);
        run(&mut i, 2)?;
        assert!(matches!(
            i.step(&NO_KEYS),
            Err(Chip8Error::OutOfRange { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_skips_advance_by_four_or_two() -> Result<(), Chip8Error> {
        let mut keys = NO_KEYS;
        keys[7] = true;
        let cases: [(Instruction, bool); 12] = [
            (Instruction::SkipEqImm { x: 1, kk: 7 }, true),
            (Instruction::SkipEqImm { x: 1, kk: 8 }, false),
            (Instruction::SkipNeImm { x: 1, kk: 8 }, true),
            (Instruction::SkipNeImm { x: 1, kk: 7 }, false),
            (Instruction::SkipEqReg { x: 1, y: 2 }, true),
            (Instruction::SkipEqReg { x: 1, y: 3 }, false),
            (Instruction::SkipNeReg { x: 1, y: 3 }, true),
            (Instruction::SkipNeReg { x: 1, y: 2 }, false),
            (Instruction::SkipKeyPressed { x: 1 }, true),
            (Instruction::SkipKeyPressed { x: 3 }, false),
            (Instruction::SkipKeyNotPressed { x: 3 }, true),
            (Instruction::SkipKeyNotPressed { x: 1 }, false),
        ];
        for (instruction, taken) in cases {
            let mut i = vm(&[]);
            i.registers.set(1, 7);
            i.registers.set(2, 7);
            i.registers.set(3, 9);
            i.execute(instruction, &keys)?;
            let expected = if taken { 0x204 } else { 0x202 };
            assert_eq!(i.registers().pc(), expected, "{}", instruction);
        }
        Ok(())
    }

    #[test]
    fn test_key_skip_uses_low_nibble() -> Result<(), Chip8Error> {
        let mut i = vm(&[]);
        i.registers.set(0, 0x1a);
        i.execute(Instruction::SkipKeyPressed { x: 0 }, &key(0xa))?;
        assert_eq!(i.registers().pc(), 0x204);
        Ok(())
    }

    #[test]
    fn test_load_then_add() -> Result<(), Chip8Error> {
        // LD V3, 10; ADD V3, 5
        let mut i = vm(&[0x63, 0x0a, 0x73, 0x05]);
        run(&mut i, 2)?;
        assert_eq!(i.registers().get(3), 15);
        assert_eq!(i.registers().pc(), 0x204);
        Ok(())
    }

    #[test]
    fn test_add_immediate_wraps_without_flag() -> Result<(), Chip8Error> {
        // LD VF, 0x42; LD V1, 0xff; ADD V1, 2
        let mut i = vm(&[0x6f, 0x42, 0x61, 0xff, 0x71, 0x02]);
        run(&mut i, 3)?;
        assert_eq!(i.registers().get(1), 1);
        assert_eq!(i.registers().flag(), 0x42);
        Ok(())
    }

    #[test]
    fn test_logic_ops() -> Result<(), Chip8Error> {
        let mut i = vm(&[]);
        i.registers.set(1, 0b1100);
        i.registers.set(2, 0b1010);
        i.execute(Instruction::Or { x: 1, y: 2 }, &NO_KEYS)?;
        assert_eq!(i.registers().get(1), 0b1110);
        i.execute(Instruction::And { x: 1, y: 2 }, &NO_KEYS)?;
        assert_eq!(i.registers().get(1), 0b1010);
        i.execute(Instruction::Xor { x: 1, y: 2 }, &NO_KEYS)?;
        assert_eq!(i.registers().get(1), 0);
        i.execute(Instruction::Move { x: 3, y: 2 }, &NO_KEYS)?;
        assert_eq!(i.registers().get(3), 0b1010);
        assert_eq!(i.registers().pc(), 0x208);
        Ok(())
    }

    #[test]
    fn test_add_with_carry() -> Result<(), Chip8Error> {
        let mut i = vm(&[]);
        i.registers.set(1, 250);
        i.registers.set(2, 10);
        i.execute(Instruction::AddReg { x: 1, y: 2 }, &NO_KEYS)?;
        assert_eq!((i.registers().get(1), i.registers().flag()), (4, 1));

        i.registers.set(1, 1);
        i.registers.set(2, 1);
        i.execute(Instruction::AddReg { x: 1, y: 2 }, &NO_KEYS)?;
        assert_eq!((i.registers().get(1), i.registers().flag()), (2, 0));
        Ok(())
    }

    #[test]
    fn test_subtract_with_borrow_flag() -> Result<(), Chip8Error> {
        let mut i = vm(&[]);
        i.registers.set(1, 10);
        i.registers.set(2, 3);
        i.execute(Instruction::SubReg { x: 1, y: 2 }, &NO_KEYS)?;
        assert_eq!((i.registers().get(1), i.registers().flag()), (7, 1));

        i.registers.set(1, 3);
        i.registers.set(2, 10);
        i.execute(Instruction::SubReg { x: 1, y: 2 }, &NO_KEYS)?;
        assert_eq!((i.registers().get(1), i.registers().flag()), (249, 0));
        Ok(())
    }

    #[test]
    fn test_subtract_reverse() -> Result<(), Chip8Error> {
        let mut i = vm(&[]);
        i.registers.set(1, 3);
        i.registers.set(2, 10);
        i.execute(Instruction::SubReverse { x: 1, y: 2 }, &NO_KEYS)?;
        assert_eq!((i.registers().get(1), i.registers().flag()), (7, 1));

        i.registers.set(1, 10);
        i.registers.set(2, 3);
        i.execute(Instruction::SubReverse { x: 1, y: 2 }, &NO_KEYS)?;
        assert_eq!((i.registers().get(1), i.registers().flag()), (249, 0));
        Ok(())
    }

    #[test]
    fn test_shift_right() -> Result<(), Chip8Error> {
        let mut i = vm(&[]);
        i.registers.set(4, 0b0000_0011);
        i.execute(Instruction::ShiftRight { x: 4, y: 0 }, &NO_KEYS)?;
        assert_eq!((i.registers().get(4), i.registers().flag()), (0b0000_0001, 1));
        i.registers.set(4, 0b0000_0010);
        i.execute(Instruction::ShiftRight { x: 4, y: 0 }, &NO_KEYS)?;
        assert_eq!((i.registers().get(4), i.registers().flag()), (0b0000_0001, 0));
        Ok(())
    }

    #[test]
    fn test_shift_left() -> Result<(), Chip8Error> {
        let mut i = vm(&[]);
        i.registers.set(4, 0b1000_0001);
        i.execute(Instruction::ShiftLeft { x: 4, y: 0 }, &NO_KEYS)?;
        assert_eq!((i.registers().get(4), i.registers().flag()), (0b0000_0010, 1));
        i.execute(Instruction::ShiftLeft { x: 4, y: 0 }, &NO_KEYS)?;
        assert_eq!((i.registers().get(4), i.registers().flag()), (0b0000_0100, 0));
        Ok(())
    }

    #[test]
    fn test_flag_wins_when_vf_is_the_target() -> Result<(), Chip8Error> {
        let mut i = vm(&[]);
        i.registers.set(FLAG_REGISTER, 200);
        i.registers.set(1, 100);
        i.execute(Instruction::AddReg { x: FLAG_REGISTER, y: 1 }, &NO_KEYS)?;
        assert_eq!(i.registers().flag(), 1);
        Ok(())
    }

    #[test]
    fn test_load_address_register() -> Result<(), Chip8Error> {
        let mut i = vm(&[0xa3, 0x00]);
        i.step(&NO_KEYS)?;
        assert_eq!(i.registers().i(), 0x300);
        Ok(())
    }

    #[test]
    fn test_random_is_masked() -> Result<(), Chip8Error> {
        // RND V1, 0x0f; RND V2, 0xff
        let mut i = vm(&[0xc1, 0x0f, 0xc2, 0xff]);
        run(&mut i, 2)?;
        assert_eq!(i.registers().get(1), 0xab & 0x0f);
        assert_eq!(i.registers().get(2), 0xac);
        Ok(())
    }

    #[test]
    fn test_seeded_random_is_reproducible() -> Result<(), Chip8Error> {
        let program: &[u8] = &[0xc1, 0xff, 0xc2, 0xff, 0xc3, 0xff];
        let mut a = Chip8Interpreter::with_seed(8);
        let mut b = Chip8Interpreter::with_seed(8);
        a.load_program(&mut { program })?;
        b.load_program(&mut { program })?;
        for _ in 0..3 {
            a.step(&NO_KEYS)?;
            b.step(&NO_KEYS)?;
        }
        assert_eq!(a.registers().all(), b.registers().all());
        Ok(())
    }

    #[test]
    fn test_draw_twice_sets_collision() -> Result<(), Chip8Error> {
        // LD I, 0x50 (glyph 0); DRW V0, V1, 5; DRW V0, V1, 5
        let mut i = vm(&[0xa0, 0x50, 0xd0, 0x15, 0xd0, 0x15]);
        run(&mut i, 2)?;
        assert_eq!(i.registers().flag(), 0);
        assert_eq!(i.framebuffer().lit_count(), 14);
        run(&mut i, 1)?;
        assert_eq!(i.registers().flag(), 1);
        assert_eq!(i.framebuffer().lit_count(), 0);
        Ok(())
    }

    #[test]
    fn test_draw_resets_flag() -> Result<(), Chip8Error> {
        // LD VF, 1; LD I, 0x50; DRW V0, V0, 1
        let mut i = vm(&[0x6f, 0x01, 0xa0, 0x50, 0xd0, 0x01]);
        run(&mut i, 3)?;
        assert_eq!(i.registers().flag(), 0);
        Ok(())
    }

    #[test]
    fn test_draw_wraps_columns() -> Result<(), Chip8Error> {
        // LD V0, 60; LD V1, 0; LD I, 0x300; DRW V0, V1, 1
        let mut i = vm(&[0x60, 0x3c, 0x61, 0x00, 0xa3, 0x00, 0xd0, 0x11]);
        i.memory.write_byte(0x300, 0xff)?;
        run(&mut i, 4)?;
        for col in [60, 61, 62, 63, 0, 1, 2, 3] {
            assert!(i.framebuffer().get(0, col));
        }
        assert_eq!(i.framebuffer().lit_count(), 8);
        Ok(())
    }

    #[test]
    fn test_draw_out_of_range_sprite_is_fatal_and_atomic() -> Result<(), Chip8Error> {
        // LD I, 0xffe; DRW V0, V0, 5
        let mut i = vm(&[0xaf, 0xfe, 0xd0, 0x05]);
        run(&mut i, 1)?;
        assert!(matches!(
            i.step(&NO_KEYS),
            Err(Chip8Error::OutOfRange { addr: 0x1000 })
        ));
        assert_eq!(i.framebuffer().lit_count(), 0);
        assert_eq!(i.registers().pc(), 0x202);
        Ok(())
    }

    #[test]
    fn test_display_changed_tracking() -> Result<(), Chip8Error> {
        let mut i = vm(&[0x60, 0x01, 0x00, 0xe0]);
        assert!(i.take_display_changed());
        run(&mut i, 1)?;
        assert!(!i.take_display_changed());
        run(&mut i, 1)?;
        assert!(i.take_display_changed());
        Ok(())
    }

    #[test]
    fn test_wait_for_key() -> Result<(), Chip8Error> {
        // LD V5, K
        let mut i = vm(&[0xf5, 0x0a]);
        assert_eq!(i.step(&NO_KEYS)?, StepOutcome::WaitingForKey);
        assert_eq!(i.step(&NO_KEYS)?, StepOutcome::WaitingForKey);
        assert!(i.is_waiting_for_key());
        assert_eq!(i.registers().pc(), 0x200);

        assert_eq!(
            i.step(&key(0xc))?,
            StepOutcome::Executed(Instruction::WaitKey { x: 5 })
        );
        assert_eq!(i.registers().get(5), 0xc);
        assert_eq!(i.registers().pc(), 0x202);
        assert!(!i.is_waiting_for_key());
        Ok(())
    }

    #[test]
    fn test_wait_for_key_ignores_held_key() -> Result<(), Chip8Error> {
        let mut i = vm(&[0xf5, 0x0a]);
        // key 3 is already down when the wait starts
        i.step(&key(3))?;
        assert_eq!(i.step(&key(3))?, StepOutcome::WaitingForKey);
        i.step(&NO_KEYS)?;
        i.step(&key(3))?;
        assert_eq!(i.registers().get(5), 3);
        Ok(())
    }

    #[test]
    fn test_timers() -> Result<(), Chip8Error> {
        // LD V1, 3; LD DT, V1; LD ST, V1; LD V2, DT
        let mut i = vm(&[0x61, 0x03, 0xf1, 0x15, 0xf1, 0x18, 0xf2, 0x07]);
        run(&mut i, 3)?;
        assert_eq!(i.sound_timer(), 3);
        i.tick_timers();
        run(&mut i, 1)?;
        assert_eq!(i.registers().get(2), 2);
        assert_eq!(i.sound_timer(), 2);
        Ok(())
    }

    #[test]
    fn test_stepping_does_not_touch_timers() -> Result<(), Chip8Error> {
        // LD V1, 10; LD DT, V1; JP 0x204
        let mut i = vm(&[0x61, 0x0a, 0xf1, 0x15, 0x12, 0x04]);
        run(&mut i, 100)?;
        assert_eq!(i.registers().delay_timer(), 10);
        Ok(())
    }

    #[test]
    fn test_add_i_with_overflow_flag() -> Result<(), Chip8Error> {
        let mut i = vm(&[]);
        i.registers.set_i(0xffe);
        i.registers.set(1, 4);
        i.execute(Instruction::AddI { x: 1 }, &NO_KEYS)?;
        assert_eq!((i.registers().i(), i.registers().flag()), (0x002, 1));
        i.execute(Instruction::AddI { x: 1 }, &NO_KEYS)?;
        assert_eq!((i.registers().i(), i.registers().flag()), (0x006, 0));
        Ok(())
    }

    #[test]
    fn test_load_glyph() -> Result<(), Chip8Error> {
        let mut i = vm(&[]);
        i.registers.set(1, 0x2b);
        i.execute(Instruction::LoadGlyph { x: 1 }, &NO_KEYS)?;
        assert_eq!(i.registers().i(), 0x050 + 0xb * 5);
        Ok(())
    }

    #[test]
    fn test_bcd() -> Result<(), Chip8Error> {
        // LD V1, 234; LD I, 0x300; LD B, V1
        let mut i = vm(&[0x61, 0xea, 0xa3, 0x00, 0xf1, 0x33]);
        run(&mut i, 3)?;
        assert_eq!(i.memory().get_ro_slice(0x300, 3)?, &[2, 3, 4]);
        Ok(())
    }

    #[test]
    fn test_bcd_near_top_is_atomic() -> Result<(), Chip8Error> {
        let mut i = vm(&[]);
        i.registers.set(1, 234);
        i.registers.set_i(0xffe);
        assert!(matches!(
            i.execute(Instruction::StoreBcd { x: 1 }, &NO_KEYS),
            Err(Chip8Error::OutOfRange { addr: 0x1000 })
        ));
        assert_eq!(i.memory().get_ro_slice(0xffe, 2)?, &[0, 0]);
        assert_eq!(i.registers().pc(), 0x200);
        Ok(())
    }

    #[test]
    fn test_store_and_load_registers() -> Result<(), Chip8Error> {
        let mut i = vm(&[]);
        for x in 0..4 {
            i.registers.set(x, 0x10 + x as u8);
        }
        i.registers.set_i(0x400);
        i.execute(Instruction::StoreRegisters { x: 2 }, &NO_KEYS)?;
        assert_eq!(i.memory().get_ro_slice(0x400, 4)?, &[0x10, 0x11, 0x12, 0x00]);
        assert_eq!(i.registers().i(), 0x400);

        i.memory.load(0x400, &[0xa0, 0xa1, 0xa2, 0xa3])?;
        i.execute(Instruction::LoadRegisters { x: 1 }, &NO_KEYS)?;
        assert_eq!(&i.registers().all()[..4], &[0xa0, 0xa1, 0x12, 0x13]);
        Ok(())
    }

    #[test]
    fn test_unknown_opcode_is_skipped() -> Result<(), Chip8Error> {
        let mut i = vm(&[0x50, 0x01, 0x61, 0x07]);
        assert_eq!(i.step(&NO_KEYS)?, StepOutcome::UnknownOpcode(0x5001));
        assert_eq!(i.registers().pc(), 0x202);
        i.step(&NO_KEYS)?;
        assert_eq!(i.registers().get(1), 7);
        Ok(())
    }

    #[test]
    fn test_fetch_past_top_is_fatal() {
        // JP 0xfff
        let mut i = vm(&[0x1f, 0xff]);
        i.step(&NO_KEYS).unwrap();
        assert!(matches!(
            i.step(&NO_KEYS),
            Err(Chip8Error::OutOfRange { addr: 0x1000 })
        ));
    }
}
