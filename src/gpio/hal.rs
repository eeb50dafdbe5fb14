use core::convert::Infallible;

use embedded_hal::digital::{
    ErrorType, InputPin as InputPinHal, OutputPin as OutputPinHal,
    StatefulOutputPin as StatefulOutputPinHal,
};

use super::Pin;

/// `ErrorType` trait implementation for `embedded-hal` v1.0.0.
impl ErrorType for Pin<'_> {
    type Error = Infallible;
}

/// `InputPin` trait implementation for `embedded-hal` v1.0.0.
impl InputPinHal for Pin<'_> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(Pin::is_high(self))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(Pin::is_low(self))
    }
}

/// `OutputPin` trait implementation for `embedded-hal` v1.0.0.
impl OutputPinHal for Pin<'_> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Pin::set_low(self);

        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Pin::set_high(self);

        Ok(())
    }
}

/// `StatefulOutputPin` trait implementation for `embedded-hal` v1.0.0.
impl StatefulOutputPinHal for Pin<'_> {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(Pin::is_high(self))
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(Pin::is_low(self))
    }

    fn toggle(&mut self) -> Result<(), Self::Error> {
        Pin::toggle(self);

        Ok(())
    }
}
