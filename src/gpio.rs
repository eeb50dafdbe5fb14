//! Interface for the GPIO peripheral.
//!
//! To ensure fast performance, pinbus controls the GPIO peripheral by directly
//! accessing the registers through either `/dev/gpiomem` or `/dev/mem`.
//!
//! ## Pin numbering
//!
//! Pins can be addressed through three numbering schemes, selected by the [`PinId`]
//! variant:
//!
//! * [`PinId::Header`] is the pin's position on the board's GPIO header, starting at 1.
//! * [`PinId::Logical`] is a stable index that refers to the same header function
//!   across board revisions. Logical pins 0-7 are the general purpose pins.
//! * [`PinId::Native`] is the BCM GPIO number.
//!
//! Header and logical numbers are translated to BCM GPIO numbers through tables that
//! depend on the board revision. Table slots without a physical pin are unmapped.
//! Numbers beyond the table width are handled according to the configured
//! [`IndexPolicy`].
//!
//! ## Batched writes
//!
//! [`Gpio::write_word`] drives a group of pins to the bits of a word, most significant
//! bit first, with at most four register writes. [`PinSet`] precomputes the register
//! values for every possible word once, so driving a parallel bus in a tight loop
//! only costs a table lookup per word.
//!
//! Pins within the same bank (GPIO 0-31, or 32-53) change simultaneously. Changes
//! spanning both banks are not atomic: bank 0 is updated before bank 1.
//!
//! ## Concurrency
//!
//! [`Gpio`] is `Send` and `Sync`. Set and clear registers only affect the bits written
//! as 1, so writes to different pins never interfere with each other. Mode changes
//! are read-modify-write operations on registers shared by 10 pins each, and are
//! serialized within a `Gpio` instance. Other processes accessing the registers
//! aren't coordinated with.
//!
//! ## Examples
//!
//! ```no_run
//! use pinbus::gpio::{Gpio, Level, Mode, PinId};
//!
//! # fn main() -> pinbus::gpio::Result<()> {
//! let gpio = Gpio::new()?;
//!
//! gpio.set_mode(PinId::Header(11), Mode::Output)?;
//! gpio.write(PinId::Header(11), Level::High)?;
//!
//! let bus = gpio.pin_set(&[PinId::Native(17), PinId::Native(18), PinId::Native(27)])?;
//! bus.apply(0b101)?;
//! # Ok(())
//! # }
//! ```

use std::env;
use std::fmt;
use std::io;
use std::ops::Not;
use std::result;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, warn};

#[cfg(feature = "hal")]
mod hal;
mod mem;
mod pin;
mod pin_set;
mod registers;
mod sim;
mod table;

use crate::system::{self, BoardRevision, DeviceInfo};

pub use self::pin::Pin;
pub use self::pin_set::PinSet;
pub use self::registers::{BankMasks, RegisterBlock, Registers, BANKS, MODE_REGISTERS};
pub use self::sim::{RegisterWrite, SimRegisters};
pub use self::table::{RegisterGeometry, GPIO_LINES, TABLE_WIDTH};

/// Maximum number of pins in a batched write. A word is a single `u32`.
pub const MAX_BUS_WIDTH: usize = 32;

// Used to limit memory-mapped Gpio to a single instance
static GPIO_INSTANCED: AtomicBool = AtomicBool::new(false);

/// Errors that can occur when accessing the GPIO peripheral.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Permission denied when opening `/dev/gpiomem` or `/dev/mem` for read/write access.
    ///
    /// Make sure the user is a member of the `gpio` group, which grants access to
    /// `/dev/gpiomem`. `/dev/mem` is a fallback that typically requires superuser
    /// privileges.
    #[error("Permission denied: {0}")]
    NotPermitted(String),
    /// Unsupported platform.
    ///
    /// The Raspberry Pi's SoC or board revision can't be identified.
    #[error("Unsupported platform")]
    UnsupportedPlatform,
    /// The GPIO registers couldn't be memory-mapped.
    #[error("Failed to map GPIO registers: {0}")]
    MappingFailed(#[source] io::Error),
    /// An instance of a memory-mapped [`Gpio`] already exists.
    ///
    /// [`Gpio`]: struct.Gpio.html
    #[error("An instance of Gpio already exists")]
    InstanceExists,
    /// The pin identifier doesn't map to a GPIO pin on this board.
    #[error("Invalid pin: {0}")]
    InvalidPin(PinId),
    /// The mode isn't supported. Only [`Mode::Input`] and [`Mode::Output`] can be set.
    ///
    /// [`Mode::Input`]: enum.Mode.html#variant.Input
    /// [`Mode::Output`]: enum.Mode.html#variant.Output
    #[error("Invalid mode: {0}")]
    InvalidMode(Mode),
    /// A batched write requires between 1 and 32 pins.
    #[error("Invalid bus width: {0} pins")]
    InvalidBusWidth(usize),
    /// The word has bits set beyond the width of the bus.
    #[error("Word {word:#x} out of range for a {width}-pin bus")]
    WordOutOfRange { word: u32, width: usize },
    /// Not enough memory for the lookup table of a [`PinSet`].
    ///
    /// [`PinSet`]: struct.PinSet.html
    #[error("Not enough memory for a {0}-pin lookup table")]
    OutOfMemory(usize),
}

impl From<system::Error> for Error {
    fn from(_err: system::Error) -> Error {
        Error::UnsupportedPlatform
    }
}

/// Result type returned from methods that can have `pinbus::gpio::Error`s.
pub type Result<T> = result::Result<T, Error>;

/// Pin numbering schemes.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum Scheme {
    /// Position on the board's GPIO header.
    Header,
    /// Board-independent logical index.
    Logical,
    /// BCM GPIO number.
    Native,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Scheme::Header => write!(f, "Header"),
            Scheme::Logical => write!(f, "Logical"),
            Scheme::Native => write!(f, "Native"),
        }
    }
}

/// A pin number in one of the supported numbering schemes.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum PinId {
    /// Position on the board's GPIO header.
    Header(u32),
    /// Board-independent logical index.
    Logical(u32),
    /// BCM GPIO number.
    Native(u32),
}

impl PinId {
    /// Constructs a `PinId` from a scheme and a number.
    pub fn new(scheme: Scheme, number: u32) -> PinId {
        match scheme {
            Scheme::Header => PinId::Header(number),
            Scheme::Logical => PinId::Logical(number),
            Scheme::Native => PinId::Native(number),
        }
    }

    /// Returns the numbering scheme.
    pub fn scheme(&self) -> Scheme {
        match *self {
            PinId::Header(_) => Scheme::Header,
            PinId::Logical(_) => Scheme::Logical,
            PinId::Native(_) => Scheme::Native,
        }
    }

    /// Returns the pin number within its scheme.
    pub fn number(&self) -> u32 {
        match *self {
            PinId::Header(n) | PinId::Logical(n) | PinId::Native(n) => n,
        }
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            PinId::Header(n) => write!(f, "header pin {}", n),
            PinId::Logical(n) => write!(f, "logical pin {}", n),
            PinId::Native(n) => write!(f, "GPIO {}", n),
        }
    }
}

/// Handling of pin numbers beyond the width of the numbering tables.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum IndexPolicy {
    /// Mask the number to the table width, so 64 refers to the same pin as 0.
    Wrap,
    /// Treat the number as unmapped.
    Reject,
}

impl fmt::Display for IndexPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            IndexPolicy::Wrap => write!(f, "Wrap"),
            IndexPolicy::Reject => write!(f, "Reject"),
        }
    }
}

/// Runtime behavior options for [`Gpio`].
///
/// [`Gpio`]: struct.Gpio.html
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Config {
    strict_validation: bool,
    clamp_read: bool,
    index_policy: IndexPolicy,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            strict_validation: true,
            clamp_read: true,
            index_policy: IndexPolicy::Wrap,
        }
    }
}

// Accepts the usual spellings of a boolean flag.
fn parse_flag(value: &str) -> Option<bool> {
    match &value.trim().to_lowercase()[..] {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Constructs a new `Config` with default settings.
    pub fn new() -> Config {
        Config::default()
    }

    /// Constructs a new `Config` with default settings, overridden by the
    /// `PINBUS_STRICT`, `PINBUS_CLAMP_READ` and `PINBUS_INDEX_POLICY` environment variables.
    ///
    /// Flags accept `1`/`0`, `true`/`false`, `on`/`off` or `yes`/`no`. The index policy
    /// accepts `wrap` or `reject`. Unrecognized values are ignored.
    pub fn from_env() -> Config {
        Config::from_vars(|key| env::var(key).ok())
    }

    fn from_vars<F>(var: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(value) = var("PINBUS_STRICT") {
            match parse_flag(&value) {
                Some(strict) => config.strict_validation = strict,
                None => warn!("Ignoring PINBUS_STRICT={:?}", value),
            }
        }

        if let Some(value) = var("PINBUS_CLAMP_READ") {
            match parse_flag(&value) {
                Some(clamp) => config.clamp_read = clamp,
                None => warn!("Ignoring PINBUS_CLAMP_READ={:?}", value),
            }
        }

        if let Some(value) = var("PINBUS_INDEX_POLICY") {
            match &value.trim().to_lowercase()[..] {
                "wrap" => config.index_policy = IndexPolicy::Wrap,
                "reject" => config.index_policy = IndexPolicy::Reject,
                _ => warn!("Ignoring PINBUS_INDEX_POLICY={:?}", value),
            }
        }

        config
    }

    /// When enabled, unmapped pins, unsupported modes and out of range words are
    /// reported as errors. When disabled, those calls silently do nothing, and out
    /// of range words are truncated to the bus width.
    ///
    /// By default, `strict_validation` is set to `true`.
    pub fn strict_validation(mut self, strict_validation: bool) -> Config {
        self.strict_validation = strict_validation;
        self
    }

    /// When enabled, [`Gpio::read`] returns 0 or 1. When disabled, it returns the
    /// pin's bit as it appears in the level register, so any non-zero value is high.
    ///
    /// By default, `clamp_read` is set to `true`.
    ///
    /// [`Gpio::read`]: struct.Gpio.html#method.read
    pub fn clamp_read(mut self, clamp_read: bool) -> Config {
        self.clamp_read = clamp_read;
        self
    }

    /// Selects how pin numbers beyond the table width are handled.
    ///
    /// By default, `index_policy` is set to [`IndexPolicy::Wrap`].
    ///
    /// [`IndexPolicy::Wrap`]: enum.IndexPolicy.html#variant.Wrap
    pub fn index_policy(mut self, index_policy: IndexPolicy) -> Config {
        self.index_policy = index_policy;
        self
    }

    /// Returns the value of `strict_validation`.
    pub fn is_strict(&self) -> bool {
        self.strict_validation
    }

    /// Returns the value of `clamp_read`.
    pub fn is_clamped(&self) -> bool {
        self.clamp_read
    }

    /// Returns the configured [`IndexPolicy`].
    ///
    /// [`IndexPolicy`]: enum.IndexPolicy.html
    pub fn policy(&self) -> IndexPolicy {
        self.index_policy
    }
}

/// Pin modes.
///
/// The discriminants are the function select field encodings.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[repr(u8)]
pub enum Mode {
    Input = 0b000,
    Output = 0b001,
    Alt0 = 0b100,
    Alt1 = 0b101,
    Alt2 = 0b110,
    Alt3 = 0b111,
    Alt4 = 0b011,
    Alt5 = 0b010,
}

impl Mode {
    fn from_bits(bits: u32) -> Mode {
        match bits & 0b111 {
            0b000 => Mode::Input,
            0b001 => Mode::Output,
            0b100 => Mode::Alt0,
            0b101 => Mode::Alt1,
            0b110 => Mode::Alt2,
            0b111 => Mode::Alt3,
            0b011 => Mode::Alt4,
            _ => Mode::Alt5,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Mode::Input => write!(f, "In"),
            Mode::Output => write!(f, "Out"),
            Mode::Alt0 => write!(f, "Alt0"),
            Mode::Alt1 => write!(f, "Alt1"),
            Mode::Alt2 => write!(f, "Alt2"),
            Mode::Alt3 => write!(f, "Alt3"),
            Mode::Alt4 => write!(f, "Alt4"),
            Mode::Alt5 => write!(f, "Alt5"),
        }
    }
}

/// Pin logic levels.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[repr(u8)]
pub enum Level {
    Low = 0,
    High = 1,
}

impl From<bool> for Level {
    fn from(e: bool) -> Level {
        if e {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl From<u8> for Level {
    fn from(value: u8) -> Self {
        Level::from(value != 0)
    }
}

impl From<u32> for Level {
    fn from(value: u32) -> Self {
        Level::from(value != 0)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Level::Low => write!(f, "Low"),
            Level::High => write!(f, "High"),
        }
    }
}

impl Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

/// Computes the set and clear register values that drive `bus` to `word`.
///
/// The first pin of `bus` receives the most significant of the bus's bits, so bit
/// `bus.len() - 1` of `word` goes to `bus[0]` and bit 0 to the last pin. Slots
/// holding `None` are skipped, but still occupy a bit position. Bits beyond the
/// bus width are ignored.
///
/// # Panics
///
/// Panics if `bus` is longer than [`MAX_BUS_WIDTH`].
///
/// [`MAX_BUS_WIDTH`]: constant.MAX_BUS_WIDTH.html
pub fn bank_masks(bus: &[Option<u8>], word: u32) -> BankMasks {
    assert!(bus.len() <= MAX_BUS_WIDTH, "bus wider than {} pins", MAX_BUS_WIDTH);

    let mut masks = BankMasks::default();

    for (position, gpio) in bus.iter().rev().enumerate() {
        let gpio = match *gpio {
            Some(gpio) => gpio,
            None => continue,
        };

        if let Some(geometry) = table::geometry(gpio) {
            let bit = 1 << (gpio % 32);

            if (word >> position) & 1 == 1 {
                masks.set[geometry.bank] |= bit;
            } else {
                masks.clear[geometry.bank] |= bit;
            }
        }
    }

    masks
}

// Returns the bits a word for a bus of the given width may use.
#[inline]
fn word_mask(width: usize) -> u32 {
    if width >= MAX_BUS_WIDTH {
        u32::MAX
    } else {
        (1 << width) - 1
    }
}

/// Provides access to the Raspberry Pi's GPIO peripheral.
///
/// `Gpio` owns the register mapping, the board revision that selects the numbering
/// tables, and the [`Config`]. All operations take `&self`, and pins are addressed
/// with a [`PinId`] in any numbering scheme.
///
/// [`Config`]: struct.Config.html
/// [`PinId`]: enum.PinId.html
pub struct Gpio {
    registers: Box<dyn Registers>,
    board_revision: BoardRevision,
    config: Config,
    mode_locks: [AtomicBool; MODE_REGISTERS],
    instanced: bool,
}

impl fmt::Debug for Gpio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gpio")
            .field("registers", &self.registers)
            .field("board_revision", &self.board_revision)
            .field("config", &self.config)
            .field("mode_locks", &format_args!("{{ .. }}"))
            .field("instanced", &self.instanced)
            .finish()
    }
}

impl Gpio {
    /// Constructs a new `Gpio` with the default [`Config`].
    ///
    /// Identifies the board through `/proc/cpuinfo`, and maps the GPIO registers
    /// through `/dev/gpiomem`, or `/dev/mem` if that fails.
    ///
    /// Only a single memory-mapped instance of `Gpio` can exist at any time.
    /// Constructing another instance before the existing one goes out of scope
    /// returns [`Error::InstanceExists`]. A `Gpio` can be shared between threads
    /// by reference or through an `Arc`.
    ///
    /// [`Config`]: struct.Config.html
    /// [`Error::InstanceExists`]: enum.Error.html#variant.InstanceExists
    pub fn new() -> Result<Gpio> {
        Gpio::with_config(Config::default())
    }

    /// Constructs a new `Gpio` with the specified [`Config`].
    ///
    /// [`Config`]: struct.Config.html
    pub fn with_config(config: Config) -> Result<Gpio> {
        if GPIO_INSTANCED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::InstanceExists);
        }

        let registers = DeviceInfo::new()
            .map_err(Error::from)
            .and_then(|device_info| Ok((device_info, mem::GpioMem::open(&device_info)?)));

        match registers {
            Ok((device_info, gpio_mem)) => {
                let mut gpio =
                    Gpio::with_registers(gpio_mem, device_info.board_revision(), config);
                gpio.instanced = true;

                Ok(gpio)
            }
            Err(e) => {
                GPIO_INSTANCED.store(false, Ordering::SeqCst);

                Err(e)
            }
        }
    }

    /// Constructs a new `Gpio` on top of the specified register implementation.
    ///
    /// No platform identification takes place, so the board revision has to be
    /// supplied by the caller. Useful for register blocks mapped by other means,
    /// or for [`SimRegisters`].
    ///
    /// [`SimRegisters`]: struct.SimRegisters.html
    pub fn with_registers<R>(registers: R, board_revision: BoardRevision, config: Config) -> Gpio
    where
        R: Registers + 'static,
    {
        debug!(
            "Initialized GPIO for {} board ({:?})",
            board_revision, config
        );

        Gpio {
            registers: Box::new(registers),
            board_revision,
            config,
            mode_locks: [
                AtomicBool::new(false),
                AtomicBool::new(false),
                AtomicBool::new(false),
                AtomicBool::new(false),
                AtomicBool::new(false),
                AtomicBool::new(false),
            ],
            instanced: false,
        }
    }

    /// Returns the board revision that selects the numbering tables.
    pub fn board_revision(&self) -> BoardRevision {
        self.board_revision
    }

    /// Returns the active [`Config`].
    ///
    /// [`Config`]: struct.Config.html
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn registers(&self) -> &dyn Registers {
        &*self.registers
    }

    /// Translates a pin identifier to its BCM GPIO number.
    ///
    /// Returns `None` if the identifier doesn't map to a pin on this board revision.
    /// `resolve` only consults static tables, and always returns the same result
    /// for the same identifier.
    pub fn resolve(&self, pin: PinId) -> Option<u8> {
        let table = table::numbering(self.board_revision, pin.scheme());

        table::lookup(table, pin.number(), self.config.index_policy)
    }

    /// Translates a BCM GPIO number to its number in `scheme`.
    ///
    /// Returns `None` if the GPIO pin isn't routed to any number in `scheme`.
    pub fn pin_id(&self, gpio: u8, scheme: Scheme) -> Option<PinId> {
        let table = table::reverse(self.board_revision, scheme);

        table
            .get(gpio as usize)
            .copied()
            .flatten()
            .map(|number| PinId::new(scheme, u32::from(number)))
    }

    /// Returns where the pin's bits live inside the register block.
    pub fn geometry(&self, pin: PinId) -> Option<RegisterGeometry> {
        self.resolve(pin).and_then(table::geometry).copied()
    }

    // Resolves a pin, applying the validation policy to unmapped pins.
    pub(crate) fn validate(&self, pin: PinId) -> Result<Option<u8>> {
        match self.resolve(pin) {
            Some(gpio) => Ok(Some(gpio)),
            None if self.config.strict_validation => Err(Error::InvalidPin(pin)),
            None => {
                warn!("Ignoring unmapped {}", pin);

                Ok(None)
            }
        }
    }

    // Resolves every pin of a bus, keeping unmapped slots in permissive mode.
    pub(crate) fn validate_bus(&self, pins: &[PinId]) -> Result<Vec<Option<u8>>> {
        if pins.is_empty() || pins.len() > MAX_BUS_WIDTH {
            return Err(Error::InvalidBusWidth(pins.len()));
        }

        pins.iter().map(|&pin| self.validate(pin)).collect()
    }

    // Applies the validation policy to a word for a bus of the given width.
    pub(crate) fn validate_word(&self, word: u32, width: usize) -> Result<u32> {
        let mask = word_mask(width);

        if word & !mask == 0 {
            Ok(word)
        } else if self.config.strict_validation {
            Err(Error::WordOutOfRange { word, width })
        } else {
            warn!(
                "Truncating word {:#x} to {:#x} for a {}-pin bus",
                word,
                word & mask,
                width
            );

            Ok(word & mask)
        }
    }

    /// Returns the pin's current mode.
    ///
    /// Always returns [`Error::InvalidPin`] for unmapped pins, regardless of
    /// [`Config::strict_validation`], because there's no mode to report.
    ///
    /// [`Error::InvalidPin`]: enum.Error.html#variant.InvalidPin
    /// [`Config::strict_validation`]: struct.Config.html#method.strict_validation
    pub fn mode(&self, pin: PinId) -> Result<Mode> {
        let gpio = self.resolve(pin).ok_or(Error::InvalidPin(pin))?;

        Ok(self.gpio_mode(gpio))
    }

    pub(crate) fn gpio_mode(&self, gpio: u8) -> Mode {
        match table::geometry(gpio) {
            Some(geometry) => {
                let reg_value = self.registers.read_gpfsel(geometry.mode_register);

                Mode::from_bits(reg_value >> geometry.mode_shift)
            }
            None => Mode::Input,
        }
    }

    /// Sets the pin's mode to [`Mode::Input`] or [`Mode::Output`].
    ///
    /// Returns [`Error::InvalidPin`] for unmapped pins and [`Error::InvalidMode`] for
    /// alternate function modes when [`Config::strict_validation`] is enabled.
    /// Otherwise, those calls are ignored.
    ///
    /// [`Mode::Input`]: enum.Mode.html#variant.Input
    /// [`Mode::Output`]: enum.Mode.html#variant.Output
    /// [`Error::InvalidPin`]: enum.Error.html#variant.InvalidPin
    /// [`Error::InvalidMode`]: enum.Error.html#variant.InvalidMode
    /// [`Config::strict_validation`]: struct.Config.html#method.strict_validation
    pub fn set_mode(&self, pin: PinId, mode: Mode) -> Result<()> {
        let gpio = match self.validate(pin)? {
            Some(gpio) => gpio,
            None => return Ok(()),
        };

        match mode {
            Mode::Input | Mode::Output => {
                self.set_gpio_mode(gpio, mode);

                Ok(())
            }
            _ if self.config.strict_validation => Err(Error::InvalidMode(mode)),
            _ => {
                warn!("Ignoring unsupported mode {} for {}", mode, pin);

                Ok(())
            }
        }
    }

    pub(crate) fn set_gpio_mode(&self, gpio: u8, mode: Mode) {
        let geometry = match table::geometry(gpio) {
            Some(geometry) => geometry,
            None => return,
        };

        let lock = &self.mode_locks[geometry.mode_register];
        while lock
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            std::hint::spin_loop();
        }

        let reg_value = self.registers.read_gpfsel(geometry.mode_register);
        self.registers.write_gpfsel(
            geometry.mode_register,
            (reg_value & !(0b111 << geometry.mode_shift))
                | ((mode as u32 & 0b111) << geometry.mode_shift),
        );

        lock.store(false, Ordering::Release);
    }

    /// Reads the pin's logic level.
    ///
    /// With [`Config::clamp_read`] enabled, returns 0 or 1. Otherwise, returns the
    /// pin's bit as it appears in the level register.
    ///
    /// Unmapped pins read as 0 when [`Config::strict_validation`] is disabled.
    ///
    /// [`Config::clamp_read`]: struct.Config.html#method.clamp_read
    /// [`Config::strict_validation`]: struct.Config.html#method.strict_validation
    pub fn read(&self, pin: PinId) -> Result<u32> {
        match self.validate(pin)? {
            Some(gpio) => Ok(self.read_gpio(gpio)),
            None => Ok(0),
        }
    }

    pub(crate) fn read_gpio(&self, gpio: u8) -> u32 {
        let geometry = match table::geometry(gpio) {
            Some(geometry) => geometry,
            None => return 0,
        };

        let value = self.registers.read_gplev(geometry.bank) & (1 << (gpio % 32));

        if self.config.clamp_read {
            u32::from(value != 0)
        } else {
            value
        }
    }

    /// Reads the pin's logic level as a [`Level`].
    ///
    /// [`Level`]: enum.Level.html
    pub fn level(&self, pin: PinId) -> Result<Level> {
        self.read(pin).map(Level::from)
    }

    /// Sets the pin's output state.
    ///
    /// Performs a single write to the pin's set or clear register, which leaves all
    /// other pins untouched. Unmapped pins are ignored when [`Config::strict_validation`]
    /// is disabled.
    ///
    /// [`Config::strict_validation`]: struct.Config.html#method.strict_validation
    pub fn write<L: Into<Level>>(&self, pin: PinId, level: L) -> Result<()> {
        if let Some(gpio) = self.validate(pin)? {
            self.write_gpio(gpio, level.into());
        }

        Ok(())
    }

    pub(crate) fn write_gpio(&self, gpio: u8, level: Level) {
        if let Some(geometry) = table::geometry(gpio) {
            let bit = 1 << (gpio % 32);

            match level {
                Level::High => self.registers.write_gpset(geometry.bank, bit),
                Level::Low => self.registers.write_gpclr(geometry.bank, bit),
            }
        }
    }

    /// Sets the pin's output state to [`Level::High`].
    ///
    /// [`Level::High`]: enum.Level.html#variant.High
    pub fn set_high(&self, pin: PinId) -> Result<()> {
        self.write(pin, Level::High)
    }

    /// Sets the pin's output state to [`Level::Low`].
    ///
    /// [`Level::Low`]: enum.Level.html#variant.Low
    pub fn set_low(&self, pin: PinId) -> Result<()> {
        self.write(pin, Level::Low)
    }

    /// Drives a group of pins to the bits of `word`.
    ///
    /// `pins[0]` receives the most significant bit of the bus, and the last pin
    /// receives bit 0. All pins are resolved and the register values computed
    /// before anything is written, after which GPSET0, GPSET1, GPCLR0 and GPCLR1
    /// are written once each, in that order.
    ///
    /// Pins within a bank change simultaneously. Changes across banks are not
    /// atomic. The pins should already be configured as outputs.
    ///
    /// Returns [`Error::InvalidBusWidth`] unless 1 to 32 pins are specified. With
    /// [`Config::strict_validation`] enabled, returns [`Error::InvalidPin`] if any
    /// pin is unmapped and [`Error::WordOutOfRange`] if `word` has bits set beyond
    /// the bus width, without writing any registers. Otherwise, unmapped pins are
    /// skipped and `word` is truncated. Nothing is written if none of the pins are
    /// mapped.
    ///
    /// For repeated writes to the same group of pins, a [`PinSet`] is faster.
    ///
    /// [`Error::InvalidBusWidth`]: enum.Error.html#variant.InvalidBusWidth
    /// [`Error::InvalidPin`]: enum.Error.html#variant.InvalidPin
    /// [`Error::WordOutOfRange`]: enum.Error.html#variant.WordOutOfRange
    /// [`Config::strict_validation`]: struct.Config.html#method.strict_validation
    /// [`PinSet`]: struct.PinSet.html
    pub fn write_word(&self, pins: &[PinId], word: u32) -> Result<()> {
        let bus = self.validate_bus(pins)?;
        let word = self.validate_word(word, bus.len())?;

        // Only reachable with strict validation disabled
        if bus.iter().all(Option::is_none) {
            return Ok(());
        }

        bank_masks(&bus, word).write_to(self.registers());

        Ok(())
    }

    /// Returns a [`Pin`] bound to this `Gpio`.
    ///
    /// The pin identifier is resolved once. Returns [`Error::InvalidPin`] if it
    /// doesn't map to a pin, regardless of [`Config::strict_validation`].
    ///
    /// [`Pin`]: struct.Pin.html
    /// [`Error::InvalidPin`]: enum.Error.html#variant.InvalidPin
    /// [`Config::strict_validation`]: struct.Config.html#method.strict_validation
    pub fn get(&self, pin: PinId) -> Result<Pin<'_>> {
        let gpio = self.resolve(pin).ok_or(Error::InvalidPin(pin))?;

        Ok(Pin::new(self, pin, gpio))
    }

    /// Constructs a [`PinSet`] for the specified pins.
    ///
    /// See [`PinSet::new`].
    ///
    /// [`PinSet`]: struct.PinSet.html
    /// [`PinSet::new`]: struct.PinSet.html#method.new
    pub fn pin_set(&self, pins: &[PinId]) -> Result<PinSet<'_>> {
        PinSet::new(self, pins)
    }
}

impl Drop for Gpio {
    fn drop(&mut self) {
        if self.instanced {
            GPIO_INSTANCED.store(false, Ordering::SeqCst);
        }
    }
}
