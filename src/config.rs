//! Structured view of the configuration registers.
//!
//! [`decode`] turns a [`RegisterSnapshot`] into a [`Configuration`]; the
//! disruption rule deciding whether a running animation must be replaced
//! lives here too, so the change handler and the controller agree on it.

use crate::error::DecodeError;
use crate::registers::{
    OFFSET_BLUE, OFFSET_BRIGHTNESS, OFFSET_CONTROL, OFFSET_GREEN, OFFSET_LED_COUNT, OFFSET_PIN,
    OFFSET_RED, REGISTER_COUNT, RegisterSnapshot,
};

const BIT_POWER: u16 = 1 << 0;
const BIT_FIXED: u16 = 1 << 1;
const BIT_RAINBOW: u16 = 1 << 2;
const BIT_STRAND_TEST: u16 = 1 << 3;

const PROGRAM_NAME_FIXED: &str = "fixed";
const PROGRAM_NAME_RAINBOW: &str = "rainbow";
const PROGRAM_NAME_STRAND_TEST: &str = "strand_test";

const DEFAULT_LED_COUNT: u16 = 240;
const DEFAULT_PIN: u16 = 18;
const DEFAULT_BRIGHTNESS: u16 = 255;

/// Rendering behavior selected from the control word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Program {
    #[default]
    Fixed,
    Rainbow,
    StrandTest,
}

impl Program {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fixed => PROGRAM_NAME_FIXED,
            Self::Rainbow => PROGRAM_NAME_RAINBOW,
            Self::StrandTest => PROGRAM_NAME_STRAND_TEST,
        }
    }

    pub fn parse_from_str(s: &str) -> Option<Self> {
        match s {
            PROGRAM_NAME_FIXED => Some(Self::Fixed),
            PROGRAM_NAME_RAINBOW => Some(Self::Rainbow),
            PROGRAM_NAME_STRAND_TEST => Some(Self::StrandTest),
            _ => None,
        }
    }
}

impl core::fmt::Display for Program {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Control register: power plus independent program request flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ControlWord(pub u16);

impl ControlWord {
    pub const fn power(self) -> bool {
        self.0 & BIT_POWER != 0
    }

    pub const fn fixed_requested(self) -> bool {
        self.0 & BIT_FIXED != 0
    }

    pub const fn rainbow_requested(self) -> bool {
        self.0 & BIT_RAINBOW != 0
    }

    pub const fn strand_test_requested(self) -> bool {
        self.0 & BIT_STRAND_TEST != 0
    }

    /// Resolve the request flags to one program.
    ///
    /// Fixed is the fallback, rainbow overrides it and strand test overrides
    /// both. The fixed flag itself never changes the outcome.
    pub const fn program(self) -> Program {
        let mut program = Program::Fixed;
        if self.rainbow_requested() {
            program = Program::Rainbow;
        }
        if self.strand_test_requested() {
            program = Program::StrandTest;
        }
        program
    }
}

/// Fixed color channels as stored in the registers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ColorSpec {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
}

impl ColorSpec {
    pub const fn new(red: u16, green: u16, blue: u16) -> Self {
        Self { red, green, blue }
    }
}

/// Strip parameters, only applied when the render loop starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HardwareSpec {
    pub led_count: u16,
    pub pin: u16,
    pub brightness: u16,
}

impl Default for HardwareSpec {
    fn default() -> Self {
        Self {
            led_count: DEFAULT_LED_COUNT,
            pin: DEFAULT_PIN,
            brightness: DEFAULT_BRIGHTNESS,
        }
    }
}

impl HardwareSpec {
    /// Brightness clamped to the 8-bit range drivers work with
    #[allow(clippy::cast_possible_truncation)]
    pub fn brightness8(self) -> u8 {
        self.brightness.min(u16::from(u8::MAX)) as u8
    }
}

/// Everything the controller needs to know, decoded from one snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Configuration {
    pub power: bool,
    pub program: Program,
    pub color: ColorSpec,
    pub hardware: HardwareSpec,
}

impl Configuration {
    /// Check if moving from `self` to `next` must interrupt the animation.
    ///
    /// Power and program changes always are; color only matters for the
    /// fixed program. Hardware fields never are, they wait for a restart.
    pub fn is_disruptive_change(&self, next: &Self) -> bool {
        if self.power != next.power || self.program != next.program {
            return true;
        }
        self.program == Program::Fixed && self.color != next.color
    }
}

/// Decode a register snapshot.
///
/// Pure; fails only when the snapshot holds fewer than
/// [`REGISTER_COUNT`] words.
pub fn decode(snapshot: &RegisterSnapshot) -> Result<Configuration, DecodeError> {
    let words = snapshot.words();
    if words.len() < REGISTER_COUNT {
        return Err(DecodeError::Short {
            expected: REGISTER_COUNT,
            actual: words.len(),
        });
    }

    let control = ControlWord(words[OFFSET_CONTROL]);
    Ok(Configuration {
        power: control.power(),
        program: control.program(),
        color: ColorSpec {
            red: words[OFFSET_RED],
            green: words[OFFSET_GREEN],
            blue: words[OFFSET_BLUE],
        },
        hardware: HardwareSpec {
            led_count: words[OFFSET_LED_COUNT],
            pin: words[OFFSET_PIN],
            brightness: words[OFFSET_BRIGHTNESS],
        },
    })
}
