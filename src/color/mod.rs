use smart_leds::RGB8;
use smart_leds::hsv::{Hsv as HSV, hsv2rgb};

use crate::config::ColorSpec;

pub type Rgb = RGB8;
pub type Hsv = HSV;

pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

/// Convert register color channels to an 8-bit color.
///
/// Channels above 255 saturate instead of wrapping.
#[allow(clippy::cast_possible_truncation)]
pub fn rgb_from_spec(spec: ColorSpec) -> Rgb {
    let clamp = |channel: u16| channel.min(u16::from(u8::MAX)) as u8;
    Rgb {
        r: clamp(spec.red),
        g: clamp(spec.green),
        b: clamp(spec.blue),
    }
}

/// Fully saturated color at `hue` on the 0-255 color wheel
#[inline]
pub fn wheel(hue: u8) -> Rgb {
    hsv2rgb(Hsv {
        hue,
        sat: 255,
        val: 255,
    })
}
