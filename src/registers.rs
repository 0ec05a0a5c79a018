//! Register bank and snapshots.
//!
//! The configuration lives in [`REGISTER_COUNT`] consecutive 16-bit holding
//! registers. Addresses are zero-based data addresses: with the default
//! [`RegisterLayout`] the control word (conventionally "40001") is data
//! address 0 and the reserved word is data address 7. Backends that number
//! registers from one must translate before calling into this module.

use std::cell::RefCell;
use std::sync::Arc;

use critical_section::Mutex;
use heapless::Vec as FixedVec;
use tracing::trace;

use crate::config::HardwareSpec;
use crate::error::RegisterError;

/// Number of registers that make up one configuration snapshot.
pub const REGISTER_COUNT: usize = 8;

/// Word offsets inside a snapshot.
pub(crate) const OFFSET_CONTROL: usize = 0;
pub(crate) const OFFSET_RED: usize = 1;
pub(crate) const OFFSET_GREEN: usize = 2;
pub(crate) const OFFSET_BLUE: usize = 3;
pub(crate) const OFFSET_LED_COUNT: usize = 4;
pub(crate) const OFFSET_BRIGHTNESS: usize = 5;
pub(crate) const OFFSET_PIN: usize = 6;

/// Immutable copy of the configuration registers, read in one piece.
///
/// Holds at most [`REGISTER_COUNT`] words; extra words are dropped. A
/// snapshot with fewer words can exist but will not decode.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegisterSnapshot {
    words: FixedVec<u16, REGISTER_COUNT>,
}

impl RegisterSnapshot {
    pub fn from_slice(values: &[u16]) -> Self {
        let len = values.len().min(REGISTER_COUNT);
        Self {
            words: FixedVec::from_slice(&values[..len]).unwrap_or_default(),
        }
    }

    pub fn words(&self) -> &[u16] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn get(&self, offset: usize) -> Option<u16> {
        self.words.get(offset).copied()
    }
}

impl From<[u16; REGISTER_COUNT]> for RegisterSnapshot {
    fn from(values: [u16; REGISTER_COUNT]) -> Self {
        Self::from_slice(&values)
    }
}

/// Where the configuration registers start in the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegisterLayout {
    pub base_address: u16,
}

impl RegisterLayout {
    pub const fn new(base_address: u16) -> Self {
        Self { base_address }
    }

    /// Check if `address` falls inside the configuration range
    pub fn contains(self, address: u16) -> bool {
        let start = u32::from(self.base_address);
        let address = u32::from(address);
        address >= start && address < start + REGISTER_COUNT as u32
    }
}

/// Something that can produce a full, consistent configuration snapshot.
pub trait SnapshotSource: Send + Sync {
    fn read_snapshot(&self) -> Result<RegisterSnapshot, RegisterError>;
}

/// Callback invoked synchronously after every applied register write.
///
/// `read_snapshot` reads the whole configuration range as it is after the
/// write. Implementations must not block.
pub trait WriteHook: Send + Sync {
    fn on_register_written(
        &self,
        address: u16,
        value: u16,
        read_snapshot: &dyn Fn() -> Result<RegisterSnapshot, RegisterError>,
    );
}

/// In-memory sequential block of holding registers.
///
/// Reads and writes each run inside a single critical section, so a read
/// never observes half of a write.
pub struct RegisterBank {
    start: u16,
    values: Mutex<RefCell<Vec<u16>>>,
    hook: Mutex<RefCell<Option<InstalledHook>>>,
}

#[derive(Clone)]
struct InstalledHook {
    layout: RegisterLayout,
    hook: Arc<dyn WriteHook>,
}

impl RegisterBank {
    /// Create a zeroed bank of `len` registers starting at `start`
    pub fn new(start: u16, len: usize) -> Self {
        Self::with_values(start, vec![0; len])
    }

    pub fn with_values(start: u16, values: Vec<u16>) -> Self {
        Self {
            start,
            values: Mutex::new(RefCell::new(values)),
            hook: Mutex::new(RefCell::new(None)),
        }
    }

    /// Bank holding exactly the configuration range: power off, black,
    /// default hardware.
    pub fn with_defaults(layout: RegisterLayout) -> Self {
        let hardware = HardwareSpec::default();
        let mut values = vec![0; REGISTER_COUNT];
        values[OFFSET_LED_COUNT] = hardware.led_count;
        values[OFFSET_BRIGHTNESS] = hardware.brightness;
        values[OFFSET_PIN] = hardware.pin;
        Self::with_values(layout.base_address, values)
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.values.borrow_ref(cs).len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Install the hook called after each write.
    ///
    /// The hook receives snapshots of the configuration range described by
    /// `layout`.
    pub fn set_hook(&self, layout: RegisterLayout, hook: Arc<dyn WriteHook>) {
        critical_section::with(|cs| {
            self.hook.replace(cs, Some(InstalledHook { layout, hook }));
        });
    }

    pub fn clear_hook(&self) {
        critical_section::with(|cs| {
            self.hook.replace(cs, None);
        });
    }

    /// Read `count` holding registers starting at `address`
    pub fn read(&self, address: u16, count: usize) -> Result<Vec<u16>, RegisterError> {
        critical_section::with(|cs| {
            let values = self.values.borrow_ref(cs);
            let (offset, end) = self.span(address, count, values.len())?;
            Ok(values[offset..end].to_vec())
        })
    }

    /// Read the configuration range described by `layout` in one piece
    pub fn snapshot(&self, layout: RegisterLayout) -> Result<RegisterSnapshot, RegisterError> {
        let words = self.read(layout.base_address, REGISTER_COUNT)?;
        Ok(RegisterSnapshot::from_slice(&words))
    }

    /// Reader for the configuration range, to hand to a controller
    pub fn reader(self: &Arc<Self>, layout: RegisterLayout) -> BankReader {
        BankReader {
            bank: Arc::clone(self),
            layout,
        }
    }

    /// Apply a single register write, then run the write hook
    pub fn write(&self, address: u16, value: u16) -> Result<(), RegisterError> {
        self.write_many(address, &[value])
    }

    /// Apply consecutive register writes in one step, then run the write
    /// hook once per written register inside the configuration range
    pub fn write_many(&self, address: u16, values: &[u16]) -> Result<(), RegisterError> {
        let hook = critical_section::with(|cs| {
            let mut table = self.values.borrow_ref_mut(cs);
            let (offset, end) = self.span(address, values.len(), table.len())?;
            table[offset..end].copy_from_slice(values);
            Ok::<_, RegisterError>(self.hook.borrow_ref(cs).clone())
        })?;
        trace!(address, count = values.len(), "registers written");

        if let Some(installed) = hook {
            let read_snapshot = || self.snapshot(installed.layout);
            for (register, value) in values.iter().enumerate() {
                #[allow(clippy::cast_possible_truncation)]
                let register = address.wrapping_add(register as u16);
                if installed.layout.contains(register) {
                    installed
                        .hook
                        .on_register_written(register, *value, &read_snapshot);
                }
            }
        }
        Ok(())
    }

    fn span(&self, address: u16, count: usize, len: usize) -> Result<(usize, usize), RegisterError> {
        if count == 0 {
            return Err(RegisterError::ZeroLength);
        }
        let out_of_bounds = RegisterError::OutOfBounds { address, count };
        let offset = usize::from(address.checked_sub(self.start).ok_or(out_of_bounds)?);
        let end = offset.checked_add(count).ok_or(out_of_bounds)?;
        if end > len {
            return Err(out_of_bounds);
        }
        Ok((offset, end))
    }
}

/// [`SnapshotSource`] reading the configuration range of a shared bank.
#[derive(Clone)]
pub struct BankReader {
    bank: Arc<RegisterBank>,
    layout: RegisterLayout,
}

impl SnapshotSource for BankReader {
    fn read_snapshot(&self) -> Result<RegisterSnapshot, RegisterError> {
        self.bank.snapshot(self.layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_keeps_first_register_count_words() {
        let snapshot = RegisterSnapshot::from_slice(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(snapshot.words(), &[1, 2, 3, 4, 5, 6, 7, 8]);

        let short = RegisterSnapshot::from_slice(&[1, 2]);
        assert_eq!(short.len(), 2);
        assert_eq!(short.get(2), None);
    }

    #[test]
    fn bank_bounds() {
        let bank = RegisterBank::new(1, 10);
        assert_eq!(bank.read(1, 10).map(|v| v.len()), Ok(10));
        assert_eq!(
            bank.read(0, 1),
            Err(RegisterError::OutOfBounds {
                address: 0,
                count: 1
            })
        );
        assert_eq!(
            bank.read(5, 7),
            Err(RegisterError::OutOfBounds {
                address: 5,
                count: 7
            })
        );
        assert_eq!(bank.read(1, 0), Err(RegisterError::ZeroLength));
        assert!(bank.write(11, 3).is_err());
    }

    struct Recorder(Mutex<RefCell<Vec<(u16, u16, Option<u16>)>>>);

    impl WriteHook for Recorder {
        fn on_register_written(
            &self,
            address: u16,
            value: u16,
            read_snapshot: &dyn Fn() -> Result<RegisterSnapshot, RegisterError>,
        ) {
            let control = read_snapshot().ok().and_then(|snapshot| snapshot.get(0));
            critical_section::with(|cs| {
                self.0.borrow_ref_mut(cs).push((address, value, control));
            });
        }
    }

    #[test]
    fn hook_sees_applied_writes() {
        let layout = RegisterLayout::default();
        let bank = RegisterBank::with_defaults(layout);
        assert_eq!(bank.read(4, 3), Ok(vec![240, 255, 18]));

        let recorder = Arc::new(Recorder(Mutex::new(RefCell::new(vec![]))));
        bank.set_hook(layout, recorder.clone());
        bank.write_many(0, &[3, 255]).unwrap();
        bank.clear_hook();
        bank.write(0, 0).unwrap();

        let calls = critical_section::with(|cs| recorder.0.borrow_ref(cs).clone());
        assert_eq!(calls, vec![(0, 3, Some(3)), (1, 255, Some(3))]);
    }

    #[test]
    fn hook_skips_writes_outside_layout() {
        let layout = RegisterLayout::new(4);
        let bank = RegisterBank::new(0, 16);
        let recorder = Arc::new(Recorder(Mutex::new(RefCell::new(vec![]))));
        bank.set_hook(layout, recorder.clone());

        bank.write_many(2, &[1, 2, 3]).unwrap();
        bank.write(12, 9).unwrap();

        let calls = critical_section::with(|cs| recorder.0.borrow_ref(cs).clone());
        assert_eq!(calls, vec![(4, 3, Some(3))]);
    }

    #[test]
    fn layout_contains_configuration_range() {
        let layout = RegisterLayout::new(10);
        assert!(!layout.contains(9));
        assert!(layout.contains(10));
        assert!(layout.contains(17));
        assert!(!layout.contains(18));
    }
}
