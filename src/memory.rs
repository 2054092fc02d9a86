use crate::error::Chip8Error;
use std::io;

// NB. addresses are u16 as per the chip-8; lengths are usize to stop endless casting

/// Represents the byte-addressable memory map. Every access is bounds
/// checked as a whole before anything is read or written, so a failed
/// access never leaves memory half-updated.
pub trait MemoryMap {
    /// read one byte
    fn read_byte(&self, addr: u16) -> Result<u8, Chip8Error> {
        Ok(self.get_ro_slice(addr, 1)?[0])
    }

    /// get a two-byte instruction, most-significant byte first
    fn read_instruction(&self, addr: u16) -> Result<u16, Chip8Error> {
        let word = self.get_ro_slice(addr, 2)?;
        Ok(((word[0] as u16) << 8) | (word[1] as u16))
    }

    /// write one byte
    fn write_byte(&mut self, addr: u16, value: u8) -> Result<(), Chip8Error> {
        self.get_rw_slice(addr, 1)?[0] = value;
        Ok(())
    }

    /// copy a chunk of bytes into "RAM" starting at `addr`
    fn load(&mut self, addr: u16, data: &[u8]) -> Result<(), Chip8Error> {
        self.get_rw_slice(addr, data.len())?.copy_from_slice(data);
        Ok(())
    }

    /// get a r/w slice of the underlying memory
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> Result<&mut [u8], Chip8Error>;

    /// get a r/o slice of the underlying memory
    fn get_ro_slice(&self, addr: u16, len: usize) -> Result<&[u8], Chip8Error>;
}

/// how much RAM we have
pub const CHIP8_RAM_SIZE_BYTES: usize = 4096;

/// where the program is loaded
pub const CHIP8_PROGRAM_ADDR: u16 = 0x0200;

/// largest program image that fits between the program address and the
/// top of RAM
pub const CHIP8_MAX_PROGRAM_BYTES: usize = CHIP8_RAM_SIZE_BYTES - CHIP8_PROGRAM_ADDR as usize;

/// where the hex digit glyphs live, inside the interpreter area
pub const CHIP8_FONT_ADDR: u16 = 0x050;

/// bytes per font glyph
pub const CHIP8_FONT_GLYPH_BYTES: u16 = 5;

/// Defines the CHIP-8 standard 4K memory map:
///   0x0000-0x01ff  interpreter (font glyphs at 0x050-0x09f)
///   0x0200-0x0fff  program
///
/// unlike the COSMAC VIP, the stack, timers and display live outside of
/// addressable memory, so a program can use the whole program area
pub struct Chip8MemoryMap {
    bytes: Box<[u8]>,
}

impl MemoryMap for Chip8MemoryMap {
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> Result<&mut [u8], Chip8Error> {
        let a = check_range(addr, len)?;
        Ok(&mut self.bytes[a..(a + len)])
    }

    fn get_ro_slice(&self, addr: u16, len: usize) -> Result<&[u8], Chip8Error> {
        let a = check_range(addr, len)?;
        Ok(&self.bytes[a..(a + len)])
    }
}

/// returns the start of the range as an index, or the first address that
/// falls outside of RAM
fn check_range(addr: u16, len: usize) -> Result<usize, Chip8Error> {
    let a = addr as usize;
    if a + len > CHIP8_RAM_SIZE_BYTES {
        return Err(Chip8Error::OutOfRange {
            addr: a.max(CHIP8_RAM_SIZE_BYTES),
        });
    }
    Ok(a)
}

impl Chip8MemoryMap {
    /// initialises zeroed RAM with the font baked in
    pub fn new() -> Self {
        let mut bytes = vec![0u8; CHIP8_RAM_SIZE_BYTES].into_boxed_slice();
        let font = CHIP8_FONT_ADDR as usize;
        bytes[font..font + CHIP8_CONTEMPORARY_FONT.len()].copy_from_slice(&CHIP8_CONTEMPORARY_FONT);
        Chip8MemoryMap { bytes }
    }

    /// load a CHIP-8 program at 0x200; the image is rejected whole if it
    /// doesn't fit
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize, Chip8Error> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        if buf.len() > CHIP8_MAX_PROGRAM_BYTES {
            return Err(Chip8Error::ProgramTooLarge {
                size: buf.len(),
                max: CHIP8_MAX_PROGRAM_BYTES,
            });
        }
        self.load(CHIP8_PROGRAM_ADDR, &buf)?;
        Ok(buf.len())
    }

    /// address of the glyph for the low nibble of `digit`
    pub fn glyph_addr(digit: u8) -> u16 {
        CHIP8_FONT_ADDR + (digit & 0x0f) as u16 * CHIP8_FONT_GLYPH_BYTES
    }
}

impl Default for Chip8MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

const CHIP8_CONTEMPORARY_FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];
