//! Solid color fill

use super::Animation;
use crate::color::{Rgb, rgb_from_spec};
use crate::config::ColorSpec;

/// Fills every LED with the configured color on every frame
#[derive(Debug, Clone)]
pub struct FixedColorProgram {
    color: Rgb,
}

impl FixedColorProgram {
    pub fn new(spec: ColorSpec) -> Self {
        Self {
            color: rgb_from_spec(spec),
        }
    }

    pub fn color(&self) -> Rgb {
        self.color
    }
}

impl Animation for FixedColorProgram {
    fn render(&mut self, leds: &mut [Rgb]) {
        leds.fill(self.color);
    }
}
