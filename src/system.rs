// Copyright (c) 2017-2019 Rene van der Meer
//
// Permission is hereby granted, free of charge, to any person obtaining a
// copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL
// THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

//! Raspberry Pi system-related tools.
//!
//! Use [`DeviceInfo`] to identify the Raspberry Pi's SoC and board revision, which
//! together decide where the GPIO registers live and which pin numbering
//! tables apply.
//!
//! [`DeviceInfo`]: struct.DeviceInfo.html

use std::fmt;
use std::fs;
use std::result;

use log::debug;

const PATH_PROC_CPUINFO: &str = "/proc/cpuinfo";

const PERIPHERAL_BASE_RPI: u32 = 0x2000_0000;
const PERIPHERAL_BASE_RPI2: u32 = 0x3f00_0000;
const GPIO_OFFSET: u32 = 0x20_0000;

/// Errors that can occur when trying to identify the Raspberry Pi hardware.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown model.
    ///
    /// `DeviceInfo` was unable to identify the SoC or board revision based on
    /// the contents of `/proc/cpuinfo`. Only boards built around the BCM2835,
    /// BCM2836 and BCM2837 are recognized.
    #[error("Unknown Raspberry Pi model")]
    UnknownModel,
}

/// Result type returned from methods that can have `system::Error`s.
pub type Result<T> = result::Result<T, Error>;

/// Board revisions with distinct GPIO header layouts.
///
/// The original Model B (PCB revision 1.0 and 1.1) routes a handful of header
/// pins to different BCM GPIO numbers than every board that came after it.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum BoardRevision {
    RevisionOne,
    RevisionTwo,
}

impl fmt::Display for BoardRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            BoardRevision::RevisionOne => write!(f, "Rev 1"),
            BoardRevision::RevisionTwo => write!(f, "Rev 2"),
        }
    }
}

/// Identifiable Raspberry Pi SoCs.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum SoC {
    Bcm2835,
    Bcm2836,
    Bcm2837,
}

impl fmt::Display for SoC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SoC::Bcm2835 => write!(f, "BCM2835"),
            SoC::Bcm2836 => write!(f, "BCM2836"),
            SoC::Bcm2837 => write!(f, "BCM2837"),
        }
    }
}

// Returns the value of a "Name\t: value" line, if the line starts with name.
fn cpuinfo_field<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let (key, value) = line.split_once(':')?;

    if !key.trim().eq_ignore_ascii_case(name) {
        return None;
    }

    // Only the last whitespace-separated token is relevant
    value.split_whitespace().last()
}

/// Retrieves Raspberry Pi device information.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct DeviceInfo {
    soc: SoC,
    board_revision: BoardRevision,
    peripheral_base: u32,
    gpio_offset: u32,
}

impl DeviceInfo {
    /// Constructs a new `DeviceInfo`.
    ///
    /// `new` attempts to identify the Raspberry Pi's SoC and board revision based on
    /// the contents of `/proc/cpuinfo`.
    pub fn new() -> Result<DeviceInfo> {
        let cpuinfo = fs::read_to_string(PATH_PROC_CPUINFO).map_err(|_| Error::UnknownModel)?;

        let device_info = DeviceInfo::from_cpuinfo(&cpuinfo)?;
        debug!(
            "Identified {} ({}), peripheral base {:#010x}",
            device_info.soc, device_info.board_revision, device_info.peripheral_base
        );

        Ok(device_info)
    }

    /// Identifies the SoC and board revision from the text of `/proc/cpuinfo`.
    ///
    /// The `Hardware` line only confirms this is a Raspberry Pi, because kernels
    /// since 4.9 report `BCM2835` on every model. New-style `Revision` codes (6 or
    /// more hex digits) carry the SoC in their processor field, and always describe
    /// a board with the revision two header layout. Old-style codes (4 digits, or
    /// 8 when over-volted) belong to BCM2835 boards, where `0002` and `0003` are
    /// revision one and everything else is revision two.
    pub fn from_cpuinfo(cpuinfo: &str) -> Result<DeviceInfo> {
        let mut hardware_soc = None;
        let mut revision = None;

        for line in cpuinfo.lines() {
            if let Some(hardware) = cpuinfo_field(line, "Hardware") {
                // Return an error if we don't recognize the SoC. This check is
                // done to prevent accidentally identifying a non-Pi SBC as a Pi
                // solely based on the revision field.
                hardware_soc = Some(match &hardware.to_uppercase()[..] {
                    "BCM2708" | "BCM2835" => SoC::Bcm2835,
                    "BCM2709" | "BCM2836" => SoC::Bcm2836,
                    "BCM2710" | "BCM2837" | "BCM2837A1" | "BCM2837B0" => SoC::Bcm2837,
                    _ => return Err(Error::UnknownModel),
                });
            } else if let Some(value) = cpuinfo_field(line, "Revision") {
                revision = Some(value.to_lowercase());
            }
        }

        let hardware_soc = hardware_soc.ok_or(Error::UnknownModel)?;

        let (soc, board_revision) = match revision.as_deref() {
            Some(code) if code.len() == 4 || code.len() == 8 => {
                // Older revisions are 4 characters long, or 8 if they've been over-volted
                let board_revision = match code.get(code.len() - 4..) {
                    Some("0002") | Some("0003") => BoardRevision::RevisionOne,
                    Some(_) => BoardRevision::RevisionTwo,
                    None => return Err(Error::UnknownModel),
                };

                match hardware_soc {
                    SoC::Bcm2835 => (SoC::Bcm2835, board_revision),
                    soc => (soc, BoardRevision::RevisionTwo),
                }
            }
            Some(code) if code.len() >= 6 => {
                // Newer revisions consist of at least 6 characters
                let code = u32::from_str_radix(code, 16).map_err(|_| Error::UnknownModel)?;

                let soc = match (code >> 12) & 0xf {
                    0 => SoC::Bcm2835,
                    1 => SoC::Bcm2836,
                    2 => SoC::Bcm2837,
                    _ => return Err(Error::UnknownModel),
                };

                (soc, BoardRevision::RevisionTwo)
            }
            Some(_) => return Err(Error::UnknownModel),
            // Without a revision code, only boards that never came in a revision
            // one layout can be identified.
            None => match hardware_soc {
                SoC::Bcm2835 => return Err(Error::UnknownModel),
                soc => (soc, BoardRevision::RevisionTwo),
            },
        };

        let peripheral_base = match soc {
            SoC::Bcm2835 => PERIPHERAL_BASE_RPI,
            SoC::Bcm2836 | SoC::Bcm2837 => PERIPHERAL_BASE_RPI2,
        };

        Ok(DeviceInfo {
            soc,
            board_revision,
            peripheral_base,
            gpio_offset: GPIO_OFFSET,
        })
    }

    /// Returns the Raspberry Pi's SoC.
    pub fn soc(&self) -> SoC {
        self.soc
    }

    /// Returns the board revision, which selects the pin numbering tables.
    pub fn board_revision(&self) -> BoardRevision {
        self.board_revision
    }

    /// Returns the base memory address for the BCM283x peripherals.
    pub(crate) fn peripheral_base(&self) -> u32 {
        self.peripheral_base
    }

    /// Returns the offset from the base memory address for the GPIO section.
    pub(crate) fn gpio_offset(&self) -> u32 {
        self.gpio_offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pi1_rev1_from_revision_digits() {
        let cpuinfo = "processor\t: 0\nHardware\t: BCM2708\nRevision\t: 0003\nSerial\t\t: 0000\n";
        let info = DeviceInfo::from_cpuinfo(cpuinfo).unwrap();

        assert_eq!(info.soc(), SoC::Bcm2835);
        assert_eq!(info.board_revision(), BoardRevision::RevisionOne);
        assert_eq!(info.peripheral_base(), 0x2000_0000);
        assert_eq!(info.gpio_offset(), 0x20_0000);
    }

    #[test]
    fn overvolted_revision_keeps_last_four_digits() {
        let cpuinfo = "Hardware\t: BCM2708\nRevision\t: 10000002\n";
        let info = DeviceInfo::from_cpuinfo(cpuinfo).unwrap();

        assert_eq!(info.board_revision(), BoardRevision::RevisionOne);
    }

    #[test]
    fn pi1_later_boards_are_rev2() {
        let cpuinfo = "Hardware\t: BCM2835\nRevision\t: 0010\n";
        let info = DeviceInfo::from_cpuinfo(cpuinfo).unwrap();

        assert_eq!(info.board_revision(), BoardRevision::RevisionTwo);
    }

    #[test]
    fn pi2_is_always_rev2() {
        let cpuinfo = "Revision\t: 0002\nHardware\t: BCM2709\n";
        let info = DeviceInfo::from_cpuinfo(cpuinfo).unwrap();

        assert_eq!(info.soc(), SoC::Bcm2836);
        assert_eq!(info.board_revision(), BoardRevision::RevisionTwo);
        assert_eq!(info.peripheral_base(), 0x3f00_0000);
    }

    #[test]
    fn soc_from_new_style_revision() {
        // Kernels since 4.9 report BCM2835 on every model
        let cpuinfo = "Hardware\t: BCM2835\nRevision\t: a02082\n";
        let info = DeviceInfo::from_cpuinfo(cpuinfo).unwrap();

        assert_eq!(info.soc(), SoC::Bcm2837);
        assert_eq!(info.board_revision(), BoardRevision::RevisionTwo);
        assert_eq!(info.peripheral_base(), 0x3f00_0000);

        let info = DeviceInfo::from_cpuinfo("Hardware\t: BCM2835\nRevision\t: a01041\n").unwrap();
        assert_eq!(info.soc(), SoC::Bcm2836);
        assert_eq!(info.peripheral_base(), 0x3f00_0000);

        let info = DeviceInfo::from_cpuinfo("Hardware\t: BCM2835\nRevision\t: 9000c1\n").unwrap();
        assert_eq!(info.soc(), SoC::Bcm2835);
        assert_eq!(info.peripheral_base(), 0x2000_0000);
    }

    #[test]
    fn unsupported_processor_in_revision() {
        let cpuinfo = "Hardware\t: BCM2835\nRevision\t: c03111\n";
        assert!(matches!(
            DeviceInfo::from_cpuinfo(cpuinfo),
            Err(Error::UnknownModel)
        ));
    }

    #[test]
    fn unknown_hardware() {
        let cpuinfo = "Hardware\t: sun50iw1p1\nRevision\t: 0000\n";
        assert!(matches!(
            DeviceInfo::from_cpuinfo(cpuinfo),
            Err(Error::UnknownModel)
        ));
    }

    #[test]
    fn missing_fields() {
        assert!(DeviceInfo::from_cpuinfo("processor\t: 0\n").is_err());
        assert!(DeviceInfo::from_cpuinfo("Hardware\t: BCM2708\n").is_err());
    }
}
