//! In-memory strip driver.
//!
//! [`VirtualStrip`] stands in for real hardware when the LED strip is
//! disabled, and lets callers observe what would have been shown. Clones
//! share the same state, so one clone can be moved into a controller while
//! another is kept for inspection.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Arc;

use critical_section::Mutex;
use tracing::debug;

use crate::StripDriver;
use crate::color::{BLACK, Rgb};
use crate::config::HardwareSpec;
use crate::error::StripError;
use crate::math8::scale_rgb;

/// Number of presented frames kept for inspection.
const HISTORY_LIMIT: usize = 512;

#[derive(Debug, Default)]
struct VirtualStripState {
    hardware: Option<HardwareSpec>,
    initialize_count: usize,
    pixels: Vec<Rgb>,
    present_count: usize,
    clear_count: usize,
    history: VecDeque<Vec<Rgb>>,
    fail_after_presents: Option<usize>,
}

#[derive(Clone)]
pub struct VirtualStrip {
    state: Arc<Mutex<RefCell<VirtualStripState>>>,
}

impl Default for VirtualStrip {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualStrip {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RefCell::new(VirtualStripState::default()))),
        }
    }

    /// Make every present after the first `presents` ones fail
    pub fn fail_after(&self, presents: usize) {
        self.with_state(|state| state.fail_after_presents = Some(presents));
    }

    /// Hardware parameters from the last initialize call
    pub fn hardware(&self) -> Option<HardwareSpec> {
        self.with_state(|state| state.hardware)
    }

    pub fn initialize_count(&self) -> usize {
        self.with_state(|state| state.initialize_count)
    }

    pub fn present_count(&self) -> usize {
        self.with_state(|state| state.present_count)
    }

    pub fn clear_count(&self) -> usize {
        self.with_state(|state| state.clear_count)
    }

    /// Last presented frame, brightness applied
    pub fn last_frame(&self) -> Option<Vec<Rgb>> {
        self.with_state(|state| state.history.back().cloned())
    }

    /// Recently presented frames, oldest first
    pub fn frames(&self) -> Vec<Vec<Rgb>> {
        self.with_state(|state| state.history.iter().cloned().collect())
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut VirtualStripState) -> R) -> R {
        critical_section::with(|cs| f(&mut self.state.borrow_ref_mut(cs)))
    }
}

impl StripDriver for VirtualStrip {
    fn initialize(&mut self, hardware: &HardwareSpec) -> Result<(), StripError> {
        debug!(
            leds = hardware.led_count,
            pin = hardware.pin,
            brightness = hardware.brightness,
            "virtual strip initialized"
        );
        self.with_state(|state| {
            state.hardware = Some(*hardware);
            state.initialize_count += 1;
            state.pixels = vec![BLACK; usize::from(hardware.led_count)];
        });
        Ok(())
    }

    fn len(&self) -> usize {
        self.with_state(|state| state.pixels.len())
    }

    fn set_pixel(&mut self, index: usize, color: Rgb) -> Result<(), StripError> {
        self.with_state(|state| {
            if state.hardware.is_none() {
                return Err(StripError::NotInitialized);
            }
            let len = state.pixels.len();
            let pixel = state
                .pixels
                .get_mut(index)
                .ok_or(StripError::PixelOutOfRange { index, len })?;
            *pixel = color;
            Ok(())
        })
    }

    fn present(&mut self) -> Result<(), StripError> {
        self.with_state(|state| {
            let Some(hardware) = state.hardware else {
                return Err(StripError::NotInitialized);
            };
            if state
                .fail_after_presents
                .is_some_and(|limit| state.present_count >= limit)
            {
                return Err(StripError::Hardware("injected present failure".into()));
            }

            let brightness = hardware.brightness8();
            let frame = state
                .pixels
                .iter()
                .map(|pixel| scale_rgb(*pixel, brightness))
                .collect();
            if state.history.len() == HISTORY_LIMIT {
                state.history.pop_front();
            }
            state.history.push_back(frame);
            state.present_count += 1;
            Ok(())
        })
    }

    fn clear(&mut self) -> Result<(), StripError> {
        self.with_state(|state| state.pixels.fill(BLACK));
        self.present()?;
        self.with_state(|state| state.clear_count += 1);
        Ok(())
    }
}
