#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant as StdInstant};

use modled::{
    Controller, ControllerConfig, Duration, InterruptChannel, ProgramTimings, RegisterBank,
    RegisterLayout, VirtualStrip,
};
use modled::registers::BankReader;

pub const LED_COUNT: u16 = 8;
pub const BRIGHTNESS: u16 = 255;
pub const PIN: u16 = 18;

pub const POWER: u16 = 0b0001;
pub const FIXED: u16 = 0b0010;
pub const RAINBOW: u16 = 0b0100;
pub const STRAND_TEST: u16 = 0b1000;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Eight configuration words with the test hardware
pub fn words(control: u16, red: u16, green: u16, blue: u16) -> [u16; 8] {
    [control, red, green, blue, LED_COUNT, BRIGHTNESS, PIN, 0]
}

pub fn fast_config(frame_ms: u64) -> ControllerConfig {
    ControllerConfig {
        timings: ProgramTimings::uniform(Duration::from_millis(frame_ms)),
        idle_poll: Duration::from_millis(5),
        ..ControllerConfig::default()
    }
}

pub struct Rig {
    pub bank: Arc<RegisterBank>,
    pub strip: VirtualStrip,
    pub controller: Controller<VirtualStrip, BankReader>,
}

/// Bank, virtual strip and controller wired the way a server would wire
/// them: the change handler is installed as the bank's write hook.
pub fn rig(initial: [u16; 8], config: ControllerConfig) -> Rig {
    init_tracing();
    let layout = RegisterLayout::default();
    let bank = Arc::new(RegisterBank::with_values(layout.base_address, initial.to_vec()));
    let strip = VirtualStrip::new();
    let controller = Controller::new(
        config,
        strip.clone(),
        bank.reader(layout),
        Arc::new(InterruptChannel::new()),
    );
    bank.set_hook(layout, Arc::new(controller.change_handler()));
    Rig {
        bank,
        strip,
        controller,
    }
}

/// Poll `condition` until it holds or two seconds pass
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = StdInstant::now() + StdDuration::from_secs(2);
    while StdInstant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(StdDuration::from_millis(1));
    }
    condition()
}
