use std::fmt;
use std::mem;

use log::debug;

use super::{bank_masks, BankMasks, Error, Gpio, Mode, PinId, Result};

/// A group of output pins driven as a parallel bus.
///
/// `PinSet` precomputes the set and clear register values for every possible word
/// when it's constructed, so [`apply`] only has to look up an entry and perform four
/// register writes. This trades 16 bytes of memory per word (2^N entries for N pins)
/// for a constant write cost, which matters when driving a bus in a tight loop.
///
/// The register values are identical to those [`Gpio::write_word`] computes for the
/// same pins and word, and are written in the same order.
///
/// A `PinSet` is immutable after construction, and can be shared between threads.
/// The lookup table is released when the `PinSet` goes out of scope.
///
/// [`apply`]: #method.apply
/// [`Gpio::write_word`]: struct.Gpio.html#method.write_word
pub struct PinSet<'a> {
    gpio: &'a Gpio,
    bus: Box<[Option<u8>]>,
    table: Box<[BankMasks]>,
    mapped: bool,
}

impl<'a> PinSet<'a> {
    /// Constructs a new `PinSet` for the specified pins, and configures the pins
    /// as outputs.
    ///
    /// `pins[0]` receives the most significant bit of a word, and the last pin
    /// receives bit 0.
    ///
    /// Returns [`Error::InvalidBusWidth`] unless 1 to 32 pins are specified, and
    /// [`Error::OutOfMemory`] if the lookup table can't be allocated. With
    /// [`Config::strict_validation`] enabled, returns [`Error::InvalidPin`] if any pin
    /// is unmapped. Otherwise, unmapped pins are left out of the register values.
    /// Nothing is written to the registers when construction fails.
    ///
    /// [`Error::InvalidBusWidth`]: enum.Error.html#variant.InvalidBusWidth
    /// [`Error::OutOfMemory`]: enum.Error.html#variant.OutOfMemory
    /// [`Error::InvalidPin`]: enum.Error.html#variant.InvalidPin
    /// [`Config::strict_validation`]: struct.Config.html#method.strict_validation
    pub fn new(gpio: &'a Gpio, pins: &[PinId]) -> Result<PinSet<'a>> {
        let bus = gpio.validate_bus(pins)?;
        let width = bus.len();

        let entries = 1usize
            .checked_shl(width as u32)
            .filter(|entries| entries.checked_mul(mem::size_of::<BankMasks>()).is_some())
            .ok_or(Error::OutOfMemory(width))?;

        let mut table = Vec::new();
        table
            .try_reserve_exact(entries)
            .map_err(|_| Error::OutOfMemory(width))?;

        // Words beyond u32::MAX don't exist, so entries - 1 always fits.
        for word in 0..entries {
            table.push(bank_masks(&bus, word as u32));
        }

        for gpio_pin in bus.iter().flatten() {
            gpio.set_gpio_mode(*gpio_pin, Mode::Output);
        }

        debug!(
            "Built {}-pin set {:?} ({} bytes)",
            width,
            bus,
            entries * mem::size_of::<BankMasks>()
        );

        let mapped = bus.iter().any(Option::is_some);

        Ok(PinSet {
            gpio,
            mapped,
            bus: bus.into_boxed_slice(),
            table: table.into_boxed_slice(),
        })
    }

    /// Returns the number of pins in the bus.
    pub fn width(&self) -> usize {
        self.bus.len()
    }

    /// Returns the BCM GPIO numbers of the bus, most significant bit first.
    ///
    /// Unmapped pins that were skipped because strict validation was disabled
    /// are `None`.
    pub fn signals(&self) -> &[Option<u8>] {
        &self.bus
    }

    /// Returns the precomputed register values for `word`, or `None` if `word`
    /// doesn't fit the bus.
    pub fn masks(&self, word: u32) -> Option<&BankMasks> {
        self.table.get(usize::try_from(word).ok()?)
    }

    /// Drives the pins to the bits of `word`.
    ///
    /// Writes GPSET0, GPSET1, GPCLR0 and GPCLR1 once each, in that order, with the
    /// precomputed values for `word`.
    ///
    /// With [`Config::strict_validation`] enabled, returns [`Error::WordOutOfRange`] if
    /// `word` has bits set beyond the bus width. Otherwise, `word` is truncated, and
    /// nothing is written if none of the pins are mapped.
    ///
    /// [`Config::strict_validation`]: struct.Config.html#method.strict_validation
    /// [`Error::WordOutOfRange`]: enum.Error.html#variant.WordOutOfRange
    #[inline]
    pub fn apply(&self, word: u32) -> Result<()> {
        let word = self.gpio.validate_word(word, self.width())?;

        if !self.mapped {
            return Ok(());
        }

        // validate_word keeps word within the table
        self.table[word as usize].write_to(self.gpio.registers());

        Ok(())
    }
}

impl fmt::Debug for PinSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinSet")
            .field("bus", &self.bus)
            .field("table", &format_args!("{{ .. }}"))
            .field("mapped", &self.mapped)
            .finish()
    }
}
