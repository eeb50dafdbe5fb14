use std::fmt;
use std::mem;
use std::sync::Arc;

/// Number of function select registers (GPFSEL0-GPFSEL5).
pub const MODE_REGISTERS: usize = 6;

/// Number of set/clear/level register pairs.
pub const BANKS: usize = 2;

/// Layout of the GPIO register block, as documented in the BCM2835 datasheet @ 6.1.
///
/// Only the registers needed for mode selection, output and input are described.
/// The reserved words are part of the hardware layout and must stay in place.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct RegisterBlock {
    /// Function select registers, 3 bits per pin, 10 pins per register.
    pub gpfsel: [u32; MODE_REGISTERS],
    _reserved0: u32,
    /// Output set registers. Writing a 1 drives the pin high, writing a 0 has no effect.
    pub gpset: [u32; BANKS],
    _reserved1: u32,
    /// Output clear registers. Writing a 1 drives the pin low, writing a 0 has no effect.
    pub gpclr: [u32; BANKS],
    _reserved2: u32,
    /// Pin level registers.
    pub gplev: [u32; BANKS],
}

const _: () = {
    assert!(mem::offset_of!(RegisterBlock, gpfsel) == 0x00);
    assert!(mem::offset_of!(RegisterBlock, gpset) == 0x1c);
    assert!(mem::offset_of!(RegisterBlock, gpclr) == 0x28);
    assert!(mem::offset_of!(RegisterBlock, gplev) == 0x34);
    assert!(mem::size_of::<RegisterBlock>() == 0x3c);
};

/// Access to the GPIO registers.
///
/// Every call performs exactly one register access. Implementations backed by
/// hardware must use volatile reads and writes, so accesses are neither merged,
/// cached nor reordered.
///
/// [`Gpio`] talks to the registers exclusively through this trait. The memory-mapped
/// implementation is selected by [`Gpio::new`], while [`Gpio::with_registers`]
/// accepts any other implementation, such as [`SimRegisters`].
///
/// [`Gpio`]: struct.Gpio.html
/// [`Gpio::new`]: struct.Gpio.html#method.new
/// [`Gpio::with_registers`]: struct.Gpio.html#method.with_registers
/// [`SimRegisters`]: struct.SimRegisters.html
pub trait Registers: fmt::Debug + Send + Sync {
    /// Reads function select register `index`.
    fn read_gpfsel(&self, index: usize) -> u32;
    /// Writes function select register `index`.
    fn write_gpfsel(&self, index: usize, value: u32);
    /// Writes output set register `bank`.
    fn write_gpset(&self, bank: usize, mask: u32);
    /// Writes output clear register `bank`.
    fn write_gpclr(&self, bank: usize, mask: u32);
    /// Reads pin level register `bank`.
    fn read_gplev(&self, bank: usize) -> u32;
}

// Lets callers keep a handle to the registers after passing them to `Gpio`.
macro_rules! impl_registers_for_pointer {
    ($($pointer:ident),*) => {$(
        impl<R: Registers + ?Sized> Registers for $pointer<R> {
            fn read_gpfsel(&self, index: usize) -> u32 {
                (**self).read_gpfsel(index)
            }

            fn write_gpfsel(&self, index: usize, value: u32) {
                (**self).write_gpfsel(index, value)
            }

            fn write_gpset(&self, bank: usize, mask: u32) {
                (**self).write_gpset(bank, mask)
            }

            fn write_gpclr(&self, bank: usize, mask: u32) {
                (**self).write_gpclr(bank, mask)
            }

            fn read_gplev(&self, bank: usize) -> u32 {
                (**self).read_gplev(bank)
            }
        }
    )*};
}

impl_registers_for_pointer!(Box, Arc);

/// Set and clear register values that drive a group of pins to a given word.
///
/// A `BankMasks` takes 16 bytes, which is what every [`PinSet`] table entry costs.
///
/// [`PinSet`]: struct.PinSet.html
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
pub struct BankMasks {
    /// Values for the output set registers.
    pub set: [u32; BANKS],
    /// Values for the output clear registers.
    pub clear: [u32; BANKS],
}

impl BankMasks {
    /// Writes the masks to the registers.
    ///
    /// Always issues four writes, in the order GPSET0, GPSET1, GPCLR0, GPCLR1. Pins
    /// within a single bank change simultaneously, but pins on bank 1 are driven
    /// high after those on bank 0, and all pins are driven low after all pins have
    /// been driven high.
    #[inline]
    pub fn write_to<R: Registers + ?Sized>(&self, registers: &R) {
        registers.write_gpset(0, self.set[0]);
        registers.write_gpset(1, self.set[1]);
        registers.write_gpclr(0, self.clear[0]);
        registers.write_gpclr(1, self.clear[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bank_masks_entry_size() {
        assert_eq!(mem::size_of::<BankMasks>(), 16);
    }

    #[test]
    fn register_block_fits_mapping() {
        assert!(mem::size_of::<RegisterBlock>() <= 0x1000);
        assert_eq!(mem::align_of::<RegisterBlock>(), 4);
    }
}
