use crate::Keypad;
use crossterm::event::{poll, read, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal;
use log::warn;
use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};

/// map of keys on the keyboard to what the chip8 might expect
/// where '1' => 0x01 and 'a' => 0x0a
const CHIP8_LITERAL_KEYMAP: [(char, u8); 16] = [
    ('0', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('4', 0x04),
    ('5', 0x05),
    ('6', 0x06),
    ('7', 0x07),
    ('8', 0x08),
    ('9', 0x09),
    ('a', 0x0a),
    ('b', 0x0b),
    ('c', 0x0c),
    ('d', 0x0d),
    ('e', 0x0e),
    ('f', 0x0f),
];

/// ditto using left-hand side of qwerty keyboard, laid out like the
/// COSMAC hex keypad
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('q', 0x04),
    ('w', 0x05),
    ('e', 0x06),
    ('a', 0x07),
    ('s', 0x08),
    ('d', 0x09),
    ('z', 0x0a),
    ('c', 0x0b),
    ('4', 0x0c),
    ('r', 0x0d),
    ('f', 0x0e),
    ('v', 0x0f),
];

/// terminals only report presses, so a key reads as down for this long
/// after each press (autorepeat keeps it down while held)
const KEY_HOLD: Duration = Duration::from_millis(100);

/// which keyboard layout to map onto the hex keypad
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Keymap {
    /// 1234 / qwer / asdf / zxcv
    Conventional,
    /// 0-9 and a-f
    Literal,
}

impl Keymap {
    fn table(self) -> HashMap<char, u8> {
        match self {
            Keymap::Conventional => HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
            Keymap::Literal => HashMap::from(CHIP8_LITERAL_KEYMAP),
        }
    }
}

/// reads the keypad
pub trait Input {
    /// current up/down state of all sixteen keys
    fn poll_keys(&mut self) -> Result<Keypad, io::Error>;

    /// true once the user has asked to stop
    fn quit_requested(&self) -> bool;
}

/// turns a stream of key presses into up/down state
struct KeyLatch {
    keymap: HashMap<char, u8>,
    held_until: [Option<Instant>; 16],
}

impl KeyLatch {
    fn new(keymap: Keymap) -> Self {
        KeyLatch {
            keymap: keymap.table(),
            held_until: [None; 16],
        }
    }

    /// returns false if the character isn't on the keypad
    fn press(&mut self, key: char, now: Instant) -> bool {
        match self.keymap.get(&key.to_ascii_lowercase()) {
            Some(&mapped_key) => {
                self.held_until[mapped_key as usize] = Some(now + KEY_HOLD);
                true
            }
            None => false,
        }
    }

    fn keypad_at(&self, now: Instant) -> Keypad {
        let mut keys = [false; 16];
        for (down, until) in keys.iter_mut().zip(self.held_until.iter()) {
            *down = until.map_or(false, |t| now < t);
        }
        keys
    }
}

/// simple implementation of Input, using crossterm events on STDIN
pub struct StdinInput {
    latch: KeyLatch,
    quit: bool,
}

impl StdinInput {
    pub fn new(keymap: Keymap) -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(StdinInput {
            latch: KeyLatch::new(keymap),
            quit: false,
        })
    }

    fn read_stdin(&mut self) -> Result<(), io::Error> {
        while poll(Duration::from_millis(0))? {
            match read()? {
                Event::Key(KeyEvent {
                    code: KeyCode::Char('c'),
                    modifiers,
                    ..
                }) if modifiers.contains(KeyModifiers::CONTROL) => self.quit = true,
                Event::Key(KeyEvent {
                    code: KeyCode::Esc, ..
                }) => self.quit = true,
                Event::Key(KeyEvent {
                    code: KeyCode::Char(key),
                    ..
                }) => {
                    if !self.latch.press(key, Instant::now()) {
                        warn!("can't map {:?} to a COSMAC key", key);
                    }
                }
                // resizes, mouse events and non-character keys
                _ => {}
            }
        }
        Ok(())
    }
}

impl Drop for StdinInput {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

impl Input for StdinInput {
    fn poll_keys(&mut self) -> Result<Keypad, io::Error> {
        self.read_stdin()?;
        Ok(self.latch.keypad_at(Instant::now()))
    }

    fn quit_requested(&self) -> bool {
        self.quit
    }
}

/// dummy Input implementation for testing: the given keys are held down
/// forever, and it can be told to ask for a quit after a number of polls
pub struct DummyInput {
    keys: Keypad,
    polls: usize,
    quit_after: Option<usize>,
}

impl DummyInput {
    pub fn new(keys: &[u8]) -> Self {
        let mut keypad = [false; 16];
        for &k in keys {
            keypad[(k & 0x0f) as usize] = true;
        }
        DummyInput {
            keys: keypad,
            polls: 0,
            quit_after: None,
        }
    }

    pub fn quit_after(mut self, polls: usize) -> Self {
        self.quit_after = Some(polls);
        self
    }
}

impl Input for DummyInput {
    fn poll_keys(&mut self) -> Result<Keypad, io::Error> {
        self.polls += 1;
        Ok(self.keys)
    }

    fn quit_requested(&self) -> bool {
        self.quit_after.map_or(false, |n| self.polls >= n)
    }
}
