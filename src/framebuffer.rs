/// screen width in pixels
pub const CHIP8_SCREEN_WIDTH: usize = 64;

/// screen height in pixels
pub const CHIP8_SCREEN_HEIGHT: usize = 32;

/// sprites are always one byte wide
const SPRITE_WIDTH: usize = 8;

/// Monochrome 64x32 pixel grid, indexed (row, column). `true` is a lit
/// pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    pixels: [[bool; CHIP8_SCREEN_WIDTH]; CHIP8_SCREEN_HEIGHT],
}

impl Framebuffer {
    pub fn new() -> Self {
        Framebuffer {
            pixels: [[false; CHIP8_SCREEN_WIDTH]; CHIP8_SCREEN_HEIGHT],
        }
    }

    pub fn clear(&mut self) {
        self.pixels = [[false; CHIP8_SCREEN_WIDTH]; CHIP8_SCREEN_HEIGHT];
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        self.pixels[row % CHIP8_SCREEN_HEIGHT][col % CHIP8_SCREEN_WIDTH]
    }

    pub fn rows(&self) -> &[[bool; CHIP8_SCREEN_WIDTH]; CHIP8_SCREEN_HEIGHT] {
        &self.pixels
    }

    /// number of lit pixels
    pub fn lit_count(&self) -> usize {
        self.pixels.iter().flatten().filter(|&&px| px).count()
    }

    /// XOR a sprite onto the grid, one byte per row, most-significant bit
    /// leftmost. Both axes wrap around the edges. Returns true if any lit
    /// pixel was switched off.
    pub fn draw(&mut self, origin_row: usize, origin_col: usize, sprite: &[u8]) -> bool {
        let mut collision = false;
        for (dy, byte) in sprite.iter().enumerate() {
            let row = (origin_row + dy) % CHIP8_SCREEN_HEIGHT;
            for dx in 0..SPRITE_WIDTH {
                if byte & (0x80 >> dx) == 0 {
                    continue;
                }
                let col = (origin_col + dx) % CHIP8_SCREEN_WIDTH;
                let px = &mut self.pixels[row][col];
                collision |= *px;
                *px = !*px;
            }
        }
        collision
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}
