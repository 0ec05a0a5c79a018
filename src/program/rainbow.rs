//! Rainbow cycle
//!
//! Spreads the whole color wheel over the strip and rotates it by one hue
//! step per frame.

use super::Animation;
use crate::color::{Rgb, wheel};

#[derive(Debug, Clone, Default)]
pub struct RainbowProgram {
    /// Hue offset of the first LED, wraps at the wheel period (256)
    phase: u8,
}

impl RainbowProgram {
    pub const fn new() -> Self {
        Self { phase: 0 }
    }

    pub const fn phase(&self) -> u8 {
        self.phase
    }
}

impl Animation for RainbowProgram {
    #[allow(clippy::cast_possible_truncation)]
    fn render(&mut self, leds: &mut [Rgb]) {
        let count = leds.len();
        for (index, led) in leds.iter_mut().enumerate() {
            let spread = (index * 256 / count) as u8;
            *led = wheel(spread.wrapping_add(self.phase));
        }
        self.phase = self.phase.wrapping_add(1);
    }

    fn reset(&mut self) {
        self.phase = 0;
    }
}
