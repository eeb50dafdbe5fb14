use std::sync::{Mutex, MutexGuard, PoisonError};

use log::trace;

use super::registers::{RegisterBlock, Registers};

/// A single register write recorded by [`SimRegisters`].
///
/// [`SimRegisters`]: struct.SimRegisters.html
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum RegisterWrite {
    Gpfsel { index: usize, value: u32 },
    Gpset { bank: usize, mask: u32 },
    Gpclr { bank: usize, mask: u32 },
}

#[derive(Debug, Default)]
struct SimState {
    block: RegisterBlock,
    writes: Vec<RegisterWrite>,
}

/// An in-memory GPIO register block.
///
/// `SimRegisters` behaves like the hardware as far as output pins are concerned:
/// writing to a set or clear register drives the corresponding bits of the level
/// register high or low, and leaves all other bits untouched. Input levels can be
/// injected with [`set_level`].
///
/// Every write is recorded, and can be inspected with [`writes`].
///
/// [`set_level`]: #method.set_level
/// [`writes`]: #method.writes
#[derive(Debug, Default)]
pub struct SimRegisters {
    state: Mutex<SimState>,
}

impl SimRegisters {
    /// Constructs a new `SimRegisters` with all registers cleared.
    pub fn new() -> SimRegisters {
        SimRegisters::default()
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a copy of the current register contents.
    pub fn snapshot(&self) -> RegisterBlock {
        self.state().block
    }

    /// Returns all writes recorded since construction or the last [`clear_writes`].
    ///
    /// [`clear_writes`]: #method.clear_writes
    pub fn writes(&self) -> Vec<RegisterWrite> {
        self.state().writes.clone()
    }

    /// Forgets all recorded writes.
    pub fn clear_writes(&self) {
        self.state().writes.clear();
    }

    /// Overwrites the level register for `bank`, simulating external input levels.
    pub fn set_level(&self, bank: usize, value: u32) {
        self.state().block.gplev[bank] = value;
    }
}

impl Registers for SimRegisters {
    fn read_gpfsel(&self, index: usize) -> u32 {
        self.state().block.gpfsel[index]
    }

    fn write_gpfsel(&self, index: usize, value: u32) {
        trace!("GPFSEL{} <- {:#010x}", index, value);

        let mut state = self.state();
        state.block.gpfsel[index] = value;
        state.writes.push(RegisterWrite::Gpfsel { index, value });
    }

    fn write_gpset(&self, bank: usize, mask: u32) {
        trace!("GPSET{} <- {:#010x}", bank, mask);

        let mut state = self.state();
        state.block.gpset[bank] = mask;
        state.block.gplev[bank] |= mask;
        state.writes.push(RegisterWrite::Gpset { bank, mask });
    }

    fn write_gpclr(&self, bank: usize, mask: u32) {
        trace!("GPCLR{} <- {:#010x}", bank, mask);

        let mut state = self.state();
        state.block.gpclr[bank] = mask;
        state.block.gplev[bank] &= !mask;
        state.writes.push(RegisterWrite::Gpclr { bank, mask });
    }

    fn read_gplev(&self, bank: usize) -> u32 {
        self.state().block.gplev[bank]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strobes_only_touch_their_bits() {
        let regs = SimRegisters::new();

        regs.write_gpset(0, 0b1010);
        regs.write_gpset(0, 0b0001);
        assert_eq!(regs.read_gplev(0), 0b1011);

        regs.write_gpclr(0, 0b0010);
        assert_eq!(regs.read_gplev(0), 0b1001);
        assert_eq!(regs.read_gplev(1), 0);

        regs.write_gpclr(0, 0);
        assert_eq!(regs.read_gplev(0), 0b1001);
    }

    #[test]
    fn records_writes_in_order() {
        let regs = SimRegisters::new();

        regs.write_gpfsel(1, 1 << 21);
        regs.write_gpclr(1, 4);
        let _ = regs.read_gplev(0);

        assert_eq!(
            regs.writes(),
            vec![
                RegisterWrite::Gpfsel {
                    index: 1,
                    value: 1 << 21
                },
                RegisterWrite::Gpclr { bank: 1, mask: 4 },
            ]
        );

        regs.clear_writes();
        assert!(regs.writes().is_empty());
        assert_eq!(regs.snapshot().gpfsel[1], 1 << 21);
    }
}
