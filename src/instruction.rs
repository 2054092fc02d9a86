use std::fmt;

/// A decoded CHIP-8 instruction. `x` and `y` are general register indices,
/// `kk` an 8-bit immediate, `nnn` a 12-bit address and `n` a 4-bit sprite
/// height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0
    ClearScreen,
    /// 00EE
    Return,
    /// 1nnn
    Jump { nnn: u16 },
    /// 2nnn
    Call { nnn: u16 },
    /// 3xkk
    SkipEqImm { x: usize, kk: u8 },
    /// 4xkk
    SkipNeImm { x: usize, kk: u8 },
    /// 5xy0
    SkipEqReg { x: usize, y: usize },
    /// 6xkk
    LoadImm { x: usize, kk: u8 },
    /// 7xkk
    AddImm { x: usize, kk: u8 },
    /// 8xy0
    Move { x: usize, y: usize },
    /// 8xy1
    Or { x: usize, y: usize },
    /// 8xy2
    And { x: usize, y: usize },
    /// 8xy3
    Xor { x: usize, y: usize },
    /// 8xy4
    AddReg { x: usize, y: usize },
    /// 8xy5
    SubReg { x: usize, y: usize },
    /// 8xy6
    ShiftRight { x: usize, y: usize },
    /// 8xy7
    SubReverse { x: usize, y: usize },
    /// 8xyE
    ShiftLeft { x: usize, y: usize },
    /// 9xy0
    SkipNeReg { x: usize, y: usize },
    /// Annn
    LoadI { nnn: u16 },
    /// Bnnn
    JumpOffset { nnn: u16 },
    /// Cxkk
    Random { x: usize, kk: u8 },
    /// Dxyn
    Draw { x: usize, y: usize, n: u8 },
    /// Ex9E
    SkipKeyPressed { x: usize },
    /// ExA1
    SkipKeyNotPressed { x: usize },
    /// Fx07
    LoadDelay { x: usize },
    /// Fx0A
    WaitKey { x: usize },
    /// Fx15
    SetDelay { x: usize },
    /// Fx18
    SetSound { x: usize },
    /// Fx1E
    AddI { x: usize },
    /// Fx29
    LoadGlyph { x: usize },
    /// Fx33
    StoreBcd { x: usize },
    /// Fx55
    StoreRegisters { x: usize },
    /// Fx65
    LoadRegisters { x: usize },
    /// anything else, including 0nnn machine-code calls
    Unknown(u16),
}

impl Instruction {
    /// split a 16-bit word into its nibble fields and pick the variant
    pub fn decode(word: u16) -> Instruction {
        use Instruction::*;

        let op = (word >> 12) as u8;
        let x = ((word >> 8) & 0xf) as usize;
        let y = ((word >> 4) & 0xf) as usize;
        let n = (word & 0xf) as u8;
        let kk = (word & 0xff) as u8;
        let nnn = word & 0x0fff;

        match (op, n) {
            (0x0, _) => match word {
                0x00e0 => ClearScreen,
                0x00ee => Return,
                _ => Unknown(word),
            },
            (0x1, _) => Jump { nnn },
            (0x2, _) => Call { nnn },
            (0x3, _) => SkipEqImm { x, kk },
            (0x4, _) => SkipNeImm { x, kk },
            (0x5, 0x0) => SkipEqReg { x, y },
            (0x6, _) => LoadImm { x, kk },
            (0x7, _) => AddImm { x, kk },
            (0x8, 0x0) => Move { x, y },
            (0x8, 0x1) => Or { x, y },
            (0x8, 0x2) => And { x, y },
            (0x8, 0x3) => Xor { x, y },
            (0x8, 0x4) => AddReg { x, y },
            (0x8, 0x5) => SubReg { x, y },
            (0x8, 0x6) => ShiftRight { x, y },
            (0x8, 0x7) => SubReverse { x, y },
            (0x8, 0xe) => ShiftLeft { x, y },
            (0x9, 0x0) => SkipNeReg { x, y },
            (0xa, _) => LoadI { nnn },
            (0xb, _) => JumpOffset { nnn },
            (0xc, _) => Random { x, kk },
            (0xd, _) => Draw { x, y, n },
            (0xe, _) => match kk {
                0x9e => SkipKeyPressed { x },
                0xa1 => SkipKeyNotPressed { x },
                _ => Unknown(word),
            },
            (0xf, _) => match kk {
                0x07 => LoadDelay { x },
                0x0a => WaitKey { x },
                0x15 => SetDelay { x },
                0x18 => SetSound { x },
                0x1e => AddI { x },
                0x29 => LoadGlyph { x },
                0x33 => StoreBcd { x },
                0x55 => StoreRegisters { x },
                0x65 => LoadRegisters { x },
                _ => Unknown(word),
            },
            _ => Unknown(word),
        }
    }

    /// true for the skip-class instructions, which advance the PC by 4
    /// when their condition holds
    pub fn is_skip(&self) -> bool {
        use Instruction::*;
        matches!(
            self,
            SkipEqImm { .. }
                | SkipNeImm { .. }
                | SkipEqReg { .. }
                | SkipNeReg { .. }
                | SkipKeyPressed { .. }
                | SkipKeyNotPressed { .. }
        )
    }
}

/// disassembly, in the usual Cowgod mnemonics
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;
        match *self {
            ClearScreen => write!(f, "CLS"),
            Return => write!(f, "RET"),
            Jump { nnn } => write!(f, "JP {:#05x}", nnn),
            Call { nnn } => write!(f, "CALL {:#05x}", nnn),
            SkipEqImm { x, kk } => write!(f, "SE V{:X}, {:#04x}", x, kk),
            SkipNeImm { x, kk } => write!(f, "SNE V{:X}, {:#04x}", x, kk),
            SkipEqReg { x, y } => write!(f, "SE V{:X}, V{:X}", x, y),
            LoadImm { x, kk } => write!(f, "LD V{:X}, {:#04x}", x, kk),
            AddImm { x, kk } => write!(f, "ADD V{:X}, {:#04x}", x, kk),
            Move { x, y } => write!(f, "LD V{:X}, V{:X}", x, y),
            Or { x, y } => write!(f, "OR V{:X}, V{:X}", x, y),
            And { x, y } => write!(f, "AND V{:X}, V{:X}", x, y),
            Xor { x, y } => write!(f, "XOR V{:X}, V{:X}", x, y),
            AddReg { x, y } => write!(f, "ADD V{:X}, V{:X}", x, y),
            SubReg { x, y } => write!(f, "SUB V{:X}, V{:X}", x, y),
            ShiftRight { x, y } => write!(f, "SHR V{:X}, V{:X}", x, y),
            SubReverse { x, y } => write!(f, "SUBN V{:X}, V{:X}", x, y),
            ShiftLeft { x, y } => write!(f, "SHL V{:X}, V{:X}", x, y),
            SkipNeReg { x, y } => write!(f, "SNE V{:X}, V{:X}", x, y),
            LoadI { nnn } => write!(f, "LD I, {:#05x}", nnn),
            JumpOffset { nnn } => write!(f, "JP V0, {:#05x}", nnn),
            Random { x, kk } => write!(f, "RND V{:X}, {:#04x}", x, kk),
            Draw { x, y, n } => write!(f, "DRW V{:X}, V{:X}, {}", x, y, n),
            SkipKeyPressed { x } => write!(f, "SKP V{:X}", x),
            SkipKeyNotPressed { x } => write!(f, "SKNP V{:X}", x),
            LoadDelay { x } => write!(f, "LD V{:X}, DT", x),
            WaitKey { x } => write!(f, "LD V{:X}, K", x),
            SetDelay { x } => write!(f, "LD DT, V{:X}", x),
            SetSound { x } => write!(f, "LD ST, V{:X}", x),
            AddI { x } => write!(f, "ADD I, V{:X}", x),
            LoadGlyph { x } => write!(f, "LD F, V{:X}", x),
            StoreBcd { x } => write!(f, "LD B, V{:X}", x),
            StoreRegisters { x } => write!(f, "LD [I], V{:X}", x),
            LoadRegisters { x } => write!(f, "LD V{:X}, [I]", x),
            Unknown(word) => write!(f, "DW {:#06x}", word),
        }
    }
}
