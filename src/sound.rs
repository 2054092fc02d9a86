use beep::beep;
use log::debug;
use std::error::Error;

/// Tone generator driven by the sound timer. The VM only produces the
/// timer value; turning it into noise is up to the implementation.
pub trait Sound {
    fn beep(&mut self) -> Result<(), Box<dyn Error>>;
    fn stop(&mut self) -> Result<(), Box<dyn Error>>;
    fn is_beeping(&self) -> bool;

    /// feed the current sound timer; starts the tone when it goes nonzero
    /// and stops it when it runs out
    fn signal(&mut self, sound_timer: u8) -> Result<(), Box<dyn Error>> {
        match (sound_timer > 0, self.is_beeping()) {
            (true, false) => {
                debug!("tone on for {} ticks", sound_timer);
                self.beep()
            }
            (false, true) => {
                debug!("tone off");
                self.stop()
            }
            _ => Ok(()),
        }
    }
}

const SIMPLEBEEP_PITCH: u16 = 2093; // C

/// beeps through the PC speaker
pub struct SimpleBeep {
    is_beeping: bool,
}

impl SimpleBeep {
    pub fn new() -> Self {
        SimpleBeep { is_beeping: false }
    }
}

impl Sound for SimpleBeep {
    fn beep(&mut self) -> Result<(), Box<dyn Error>> {
        beep(SIMPLEBEEP_PITCH)?;
        self.is_beeping = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        beep(0)?;
        self.is_beeping = false;
        Ok(())
    }

    fn is_beeping(&self) -> bool {
        self.is_beeping
    }
}

impl Drop for SimpleBeep {
    fn drop(&mut self) {
        if self.is_beeping {
            let _ = beep(0);
        }
    }
}

/// silent; remembers what it would have done, for testing
#[derive(Default)]
pub struct Mute {
    is_beeping: bool,
    pub beeps: usize,
}

impl Mute {
    pub fn new() -> Self {
        Mute::default()
    }
}

impl Sound for Mute {
    fn beep(&mut self) -> Result<(), Box<dyn Error>> {
        self.is_beeping = true;
        self.beeps += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        self.is_beeping = false;
        Ok(())
    }

    fn is_beeping(&self) -> bool {
        self.is_beeping
    }
}
