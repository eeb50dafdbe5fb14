// Pin numbering and register geometry tables.
//
// Numbering tables are indexed by a header pin or logical index and hold the
// BCM GPIO number routed to it, if any. Reverse tables are indexed by BCM GPIO
// number. Geometry tables are indexed by BCM GPIO number.

use crate::system::BoardRevision;

use super::{IndexPolicy, Scheme};

/// Number of slots in every numbering table. Must be a power of two.
pub const TABLE_WIDTH: usize = 64;

/// Number of GPIO lines exposed by the BCM283x GPIO peripheral.
pub const GPIO_LINES: usize = 54;

pub(crate) type NumberingTable = [Option<u8>; TABLE_WIDTH];

macro_rules! numbering_table {
    (@slot -) => { None };
    (@slot $gpio:literal) => { Some($gpio) };
    ($($slot:tt),* $(,)?) => {
        widen(&[$(numbering_table!(@slot $slot)),*])
    };
}

// Pads a partial table with unmapped slots.
const fn widen(slots: &[Option<u8>]) -> NumberingTable {
    let mut table = [None; TABLE_WIDTH];
    let mut i = 0;

    while i < slots.len() {
        table[i] = slots[i];
        i += 1;
    }

    table
}

const fn invert(table: &NumberingTable) -> NumberingTable {
    let mut inverse = [None; TABLE_WIDTH];
    let mut i = 0;

    while i < TABLE_WIDTH {
        if let Some(gpio) = table[i] {
            inverse[gpio as usize] = Some(i as u8);
        }
        i += 1;
    }

    inverse
}

const fn identity() -> NumberingTable {
    let mut table = [None; TABLE_WIDTH];
    let mut i = 0;

    while i < GPIO_LINES {
        table[i] = Some(i as u8);
        i += 1;
    }

    table
}

#[rustfmt::skip]
static LOGICAL_REV1: NumberingTable = numbering_table![
    17, 18, 21, 22, 23, 24, 25, 4,  // general purpose 0-7
    0,  1,                          // I2C SDA1, SCL1
    8,  7,                          // SPI CE1, CE0
    10, 9,  11,                     // SPI MOSI, MISO, SCLK
    14, 15,                         // UART TX, RX
];

#[rustfmt::skip]
static LOGICAL_REV2: NumberingTable = numbering_table![
    17, 18, 27, 22, 23, 24, 25, 4,  // general purpose 0-7
    2,  3,                          // I2C SDA0, SCL0
    8,  7,                          // SPI CE1, CE0
    10, 9,  11,                     // SPI MOSI, MISO, SCLK
    14, 15,                         // UART TX, RX
    28, 29, 30, 31,                 // P5 header
    5,  6,  13, 19, 26,             // 40-pin header
    12, 16, 20, 21,
    0,  1,
];

// Header pins are numbered from 1, slot 0 is never mapped.
#[rustfmt::skip]
static HEADER_REV1: NumberingTable = numbering_table![
    -,
    -,  -,
    0,  -,
    1,  -,
    4,  14,
    -,  15,
    17, 18,
    21, -,
    22, 23,
    -,  24,
    10, -,
    9,  25,
    11, 8,
    -,  7,
];

#[rustfmt::skip]
static HEADER_REV2: NumberingTable = numbering_table![
    -,
    -,  -,
    2,  -,
    3,  -,
    4,  14,
    -,  15,
    17, 18,
    27, -,
    22, 23,
    -,  24,
    10, -,
    9,  25,
    11, 8,
    -,  7,
    // 40-pin header extension
    0,  1,
    5,  -,
    6,  12,
    13, -,
    19, 16,
    26, 20,
    -,  21,
    // P5 header
    -,  -,
    -,  -,
    -,  -,
    -,  -,
    -,  -,
    28, 29,
    30, 31,
];

static NATIVE: NumberingTable = identity();

static LOGICAL_REV1_INVERSE: NumberingTable = invert(&LOGICAL_REV1);
static LOGICAL_REV2_INVERSE: NumberingTable = invert(&LOGICAL_REV2);
static HEADER_REV1_INVERSE: NumberingTable = invert(&HEADER_REV1);
static HEADER_REV2_INVERSE: NumberingTable = invert(&HEADER_REV2);

/// Returns the numbering table that maps `scheme` numbers to BCM GPIO numbers.
pub(crate) fn numbering(revision: BoardRevision, scheme: Scheme) -> &'static NumberingTable {
    match (scheme, revision) {
        (Scheme::Header, BoardRevision::RevisionOne) => &HEADER_REV1,
        (Scheme::Header, BoardRevision::RevisionTwo) => &HEADER_REV2,
        (Scheme::Logical, BoardRevision::RevisionOne) => &LOGICAL_REV1,
        (Scheme::Logical, BoardRevision::RevisionTwo) => &LOGICAL_REV2,
        (Scheme::Native, _) => &NATIVE,
    }
}

/// Returns the table that maps BCM GPIO numbers back to `scheme` numbers.
pub(crate) fn reverse(revision: BoardRevision, scheme: Scheme) -> &'static NumberingTable {
    match (scheme, revision) {
        (Scheme::Header, BoardRevision::RevisionOne) => &HEADER_REV1_INVERSE,
        (Scheme::Header, BoardRevision::RevisionTwo) => &HEADER_REV2_INVERSE,
        (Scheme::Logical, BoardRevision::RevisionOne) => &LOGICAL_REV1_INVERSE,
        (Scheme::Logical, BoardRevision::RevisionTwo) => &LOGICAL_REV2_INVERSE,
        (Scheme::Native, _) => &NATIVE,
    }
}

/// Looks up `number` in `table`.
///
/// With [`IndexPolicy::Wrap`], numbers outside the table are masked to the table
/// width, so 64 aliases slot 0. With [`IndexPolicy::Reject`], they're unmapped.
#[inline]
pub(crate) fn lookup(table: &NumberingTable, number: u32, policy: IndexPolicy) -> Option<u8> {
    let index = match policy {
        IndexPolicy::Wrap => number as usize & (TABLE_WIDTH - 1),
        IndexPolicy::Reject => usize::try_from(number).ok().filter(|&i| i < TABLE_WIDTH)?,
    };

    table[index]
}

/// Where a GPIO pin's bits live inside the register block.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct RegisterGeometry {
    /// Index of the set/clear/level register pair (pins 0-31, 32-53).
    pub bank: usize,
    /// Index of the function select register holding the pin's mode field.
    pub mode_register: usize,
    /// Bit offset of the 3-bit mode field.
    pub mode_shift: u32,
}

const fn geometry_table() -> [RegisterGeometry; GPIO_LINES] {
    let mut table = [RegisterGeometry {
        bank: 0,
        mode_register: 0,
        mode_shift: 0,
    }; GPIO_LINES];
    let mut gpio = 0;

    while gpio < GPIO_LINES {
        table[gpio] = RegisterGeometry {
            bank: gpio / 32,
            mode_register: gpio / 10,
            mode_shift: (gpio % 10) as u32 * 3,
        };
        gpio += 1;
    }

    table
}

static GEOMETRY: [RegisterGeometry; GPIO_LINES] = geometry_table();

/// Returns the register geometry for a BCM GPIO number.
#[inline]
pub(crate) fn geometry(gpio: u8) -> Option<&'static RegisterGeometry> {
    GEOMETRY.get(gpio as usize)
}
