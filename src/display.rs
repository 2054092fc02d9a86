use crate::framebuffer::{Framebuffer, CHIP8_SCREEN_HEIGHT, CHIP8_SCREEN_WIDTH};
use crossterm::{cursor, execute};
use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

/// Display is used by the emulator to put the framebuffer on a screen. It
/// should abstract the implementation details, so a variety of kinds of
/// screen would work.
pub trait Display {
    /// draw the whole framebuffer
    fn draw(&mut self, framebuffer: &Framebuffer) -> Result<(), io::Error>;
}

// store useful metadata about the terminal
struct Resolution(usize, usize);

impl Resolution {
    fn pixel_count(&self) -> usize {
        self.0 * self.1
    }

    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    /// canvas coordinates of every pixel whose state matches `lit`
    fn bitplane_from_framebuffer<'a>(
        &self,
        framebuffer: &'a Framebuffer,
        lit: bool,
    ) -> impl std::iter::Iterator<Item = (f64, f64)> + 'a {
        framebuffer
            .rows()
            .iter()
            .enumerate()
            .flat_map(move |(y, row)| {
                row.iter()
                    .enumerate()
                    .filter(move |&(_, &px)| px == lit)
                    .map(move |(x, _)| (x as f64, -1.0 * y as f64))
            })
    }
}

/// monochrome display in a terminal, rendered using TUI and Crossterm
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    resolution: Resolution,
}

impl MonoTermDisplay {
    pub fn new() -> Result<MonoTermDisplay, io::Error> {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        terminal.hide_cursor()?;
        Ok(MonoTermDisplay {
            terminal,
            resolution: Resolution(CHIP8_SCREEN_WIDTH, CHIP8_SCREEN_HEIGHT),
        })
    }
}

impl Drop for MonoTermDisplay {
    fn drop(&mut self) {
        // leave the cursor below the last frame
        let _ = execute!(
            io::stdout(),
            cursor::Show,
            cursor::MoveTo(0, 2 + self.resolution.1 as u16)
        );
    }
}

impl Display for MonoTermDisplay {
    fn draw(&mut self, framebuffer: &Framebuffer) -> Result<(), io::Error> {
        let resolution = &self.resolution;
        // for now this assumes a 1:1 ratio between terminal, chip8 and the
        // internal TUI canvas
        self.terminal.draw(|f| {
            let size = Rect::new(0, 0, 2 + resolution.0 as u16, 2 + resolution.1 as u16);

            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("CHIP-8")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds(resolution.x_bounds())
                .y_bounds(resolution.y_bounds())
                .marker(Marker::Block)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &resolution
                            .bitplane_from_framebuffer(framebuffer, false)
                            .collect::<Vec<_>>(),
                        color: Color::Black,
                    });
                    ctx.draw(&Points {
                        coords: &resolution
                            .bitplane_from_framebuffer(framebuffer, true)
                            .collect::<Vec<_>>(),
                        color: Color::White,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }
}

/// useful for testing non-display routines; remembers how many frames
/// it was asked to draw and how many pixels were lit in the last one
#[derive(Default)]
pub struct DummyDisplay {
    pub frames: usize,
    pub last_lit: usize,
}

impl DummyDisplay {
    pub fn new() -> Self {
        DummyDisplay::default()
    }
}

impl Display for DummyDisplay {
    fn draw(&mut self, framebuffer: &Framebuffer) -> Result<(), io::Error> {
        self.frames += 1;
        self.last_lit = framebuffer.lit_count();
        Ok(())
    }
}
