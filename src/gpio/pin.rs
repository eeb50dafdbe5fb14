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

use std::fmt;

use super::{Gpio, Level, Mode, PinId, Result};

/// A GPIO pin bound to a [`Gpio`] instance.
///
/// `Pin` resolves its identifier once, when it's retrieved through [`Gpio::get`].
/// Reads and writes go straight to the registers without any further translation
/// or validation.
///
/// [`Gpio`]: struct.Gpio.html
/// [`Gpio::get`]: struct.Gpio.html#method.get
pub struct Pin<'a> {
    gpio: &'a Gpio,
    id: PinId,
    pin: u8,
}

impl<'a> Pin<'a> {
    pub(crate) fn new(gpio: &'a Gpio, id: PinId, pin: u8) -> Pin<'a> {
        Pin { gpio, id, pin }
    }

    /// Returns the identifier the pin was retrieved with.
    #[inline]
    pub fn id(&self) -> PinId {
        self.id
    }

    /// Returns the BCM GPIO number.
    #[inline]
    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// Returns the pin's mode.
    #[inline]
    pub fn mode(&self) -> Mode {
        self.gpio.gpio_mode(self.pin)
    }

    /// Sets the pin's mode to [`Mode::Input`] or [`Mode::Output`].
    ///
    /// [`Mode::Input`]: enum.Mode.html#variant.Input
    /// [`Mode::Output`]: enum.Mode.html#variant.Output
    pub fn set_mode(&mut self, mode: Mode) -> Result<()> {
        self.gpio.set_mode(PinId::Native(u32::from(self.pin)), mode)
    }

    /// Reads the pin's logic level.
    #[inline]
    pub fn read(&self) -> Level {
        Level::from(self.gpio.read_gpio(self.pin))
    }

    /// Reads the pin's logic level, and returns `true` if it's set to [`Low`].
    ///
    /// [`Low`]: enum.Level.html#variant.Low
    #[inline]
    pub fn is_low(&self) -> bool {
        self.read() == Level::Low
    }

    /// Reads the pin's logic level, and returns `true` if it's set to [`High`].
    ///
    /// [`High`]: enum.Level.html#variant.High
    #[inline]
    pub fn is_high(&self) -> bool {
        self.read() == Level::High
    }

    /// Sets the pin's output state.
    #[inline]
    pub fn write(&mut self, level: Level) {
        self.gpio.write_gpio(self.pin, level)
    }

    /// Sets the pin's output state to [`Low`].
    ///
    /// [`Low`]: enum.Level.html#variant.Low
    #[inline]
    pub fn set_low(&mut self) {
        self.write(Level::Low)
    }

    /// Sets the pin's output state to [`High`].
    ///
    /// [`High`]: enum.Level.html#variant.High
    #[inline]
    pub fn set_high(&mut self) {
        self.write(Level::High)
    }

    /// Toggles the pin's output state between [`Low`] and [`High`].
    ///
    /// [`Low`]: enum.Level.html#variant.Low
    /// [`High`]: enum.Level.html#variant.High
    #[inline]
    pub fn toggle(&mut self) {
        let level = self.read();
        self.write(!level)
    }
}

impl fmt::Debug for Pin<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pin")
            .field("id", &self.id)
            .field("pin", &self.pin)
            .finish()
    }
}
