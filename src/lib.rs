//! pinbus provides fast access to the Raspberry Pi's GPIO pins by directly
//! accessing the GPIO peripheral's registers.
//!
//! Pins can be addressed by their position on the GPIO header, by a logical index
//! that stays the same across board revisions, or by their BCM GPIO number. Groups
//! of pins can be driven as a parallel bus, either through a one-off batched write,
//! or through a [`PinSet`] that precomputes the register values for every word.
//!
//! pinbus requires Raspberry Pi OS or any similar, recent, Linux distribution, and
//! supports boards built around the BCM2835, BCM2836 and BCM2837, including the
//! revision one Model B. Any other register source can be plugged in through the
//! [`Registers`] trait, and [`SimRegisters`] provides an in-memory register block
//! for testing without hardware.
//!
//! The library uses the [`log`] facade, and doesn't install a logger.
//!
//! [`PinSet`]: gpio/struct.PinSet.html
//! [`Registers`]: gpio/trait.Registers.html
//! [`SimRegisters`]: gpio/struct.SimRegisters.html
//! [`log`]: https://docs.rs/log

// Used by rustdoc to link other crates to pinbus's docs
#![doc(html_root_url = "https://docs.rs/pinbus/0.1.0")]

pub mod gpio;
pub mod system;
