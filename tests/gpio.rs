use std::sync::Arc;
use std::thread;

use pinbus::gpio::{
    Config, Error, Gpio, IndexPolicy, Level, Mode, PinId, RegisterWrite, Scheme, SimRegisters,
    TABLE_WIDTH,
};
use pinbus::system::BoardRevision;

const REVISIONS: [BoardRevision; 2] = [BoardRevision::RevisionOne, BoardRevision::RevisionTwo];
const SCHEMES: [Scheme; 3] = [Scheme::Header, Scheme::Logical, Scheme::Native];

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn sim_gpio(revision: BoardRevision, config: Config) -> (Gpio, Arc<SimRegisters>) {
    init_logger();

    let registers = Arc::new(SimRegisters::new());
    let gpio = Gpio::with_registers(registers.clone(), revision, config);

    (gpio, registers)
}

fn read_word(gpio: &Gpio, pins: &[PinId]) -> u32 {
    pins.iter()
        .fold(0, |word, &pin| (word << 1) | gpio.read(pin).unwrap())
}

#[test]
fn resolve_is_deterministic() {
    for &revision in &REVISIONS {
        let (gpio, _) = sim_gpio(revision, Config::default());

        for &scheme in &SCHEMES {
            for number in 0..(2 * TABLE_WIDTH as u32) {
                let pin = PinId::new(scheme, number);
                assert_eq!(gpio.resolve(pin), gpio.resolve(pin));
            }
        }
    }
}

#[test]
fn logical_and_native_round_trip() {
    for &revision in &REVISIONS {
        let (gpio, _) = sim_gpio(revision, Config::default());

        for &scheme in &SCHEMES {
            for number in 0..TABLE_WIDTH as u32 {
                let pin = PinId::new(scheme, number);

                if let Some(native) = gpio.resolve(pin) {
                    assert_eq!(gpio.pin_id(native, scheme), Some(pin), "{} ({})", pin, revision);
                }
            }
        }
    }
}

#[test]
fn header_pins_rev2() {
    let (gpio, _) = sim_gpio(BoardRevision::RevisionTwo, Config::default());

    assert_eq!(gpio.resolve(PinId::Header(11)), Some(17));
    assert_eq!(gpio.resolve(PinId::Header(12)), Some(18));
    assert_eq!(gpio.resolve(PinId::Header(13)), Some(27));
    assert_eq!(gpio.resolve(PinId::Header(40)), Some(21));
    assert_eq!(gpio.resolve(PinId::Header(1)), None);
    assert_eq!(gpio.resolve(PinId::Logical(0)), Some(17));
    assert_eq!(gpio.pin_id(27, Scheme::Header), Some(PinId::Header(13)));
    assert_eq!(gpio.pin_id(27, Scheme::Logical), Some(PinId::Logical(2)));
}

#[test]
fn header_pins_rev1() {
    let (gpio, _) = sim_gpio(BoardRevision::RevisionOne, Config::default());

    assert_eq!(gpio.resolve(PinId::Header(3)), Some(0));
    assert_eq!(gpio.resolve(PinId::Header(13)), Some(21));
    assert_eq!(gpio.resolve(PinId::Header(27)), None);
    assert_eq!(gpio.resolve(PinId::Logical(2)), Some(21));
    assert_eq!(gpio.resolve(PinId::Logical(17)), None);
    assert_eq!(gpio.pin_id(27, Scheme::Logical), None);
}

#[test]
fn write_then_read_every_mapped_pin() {
    for &revision in &REVISIONS {
        let (gpio, _) = sim_gpio(revision, Config::default());

        for &scheme in &SCHEMES {
            for number in 0..TABLE_WIDTH as u32 {
                let pin = PinId::new(scheme, number);

                if gpio.resolve(pin).is_none() {
                    continue;
                }

                gpio.set_mode(pin, Mode::Output).unwrap();
                assert_eq!(gpio.mode(pin).unwrap(), Mode::Output);

                gpio.write(pin, 1u32).unwrap();
                assert_eq!(gpio.read(pin).unwrap(), 1);
                gpio.write(pin, 0u32).unwrap();
                assert_eq!(gpio.read(pin).unwrap(), 0);
                gpio.write(pin, 0x80u32).unwrap();
                assert_eq!(gpio.level(pin).unwrap(), Level::High);
            }
        }
    }
}

#[test]
fn raw_read_returns_register_bit() {
    let (gpio, registers) = sim_gpio(
        BoardRevision::RevisionTwo,
        Config::default().clamp_read(false),
    );

    gpio.set_high(PinId::Native(27)).unwrap();
    assert_eq!(gpio.read(PinId::Native(27)).unwrap(), 1 << 27);

    gpio.set_high(PinId::Native(35)).unwrap();
    assert_eq!(gpio.read(PinId::Native(35)).unwrap(), 1 << 3);
    assert_eq!(registers.snapshot().gplev, [1 << 27, 1 << 3]);

    gpio.set_low(PinId::Native(27)).unwrap();
    assert_eq!(gpio.read(PinId::Native(27)).unwrap(), 0);
}

#[test]
fn single_writes_use_strobe_registers() {
    let (gpio, registers) = sim_gpio(BoardRevision::RevisionTwo, Config::default());

    gpio.write(PinId::Header(11), Level::High).unwrap();
    gpio.write(PinId::Native(40), Level::Low).unwrap();

    assert_eq!(
        registers.writes(),
        vec![
            RegisterWrite::Gpset {
                bank: 0,
                mask: 1 << 17
            },
            RegisterWrite::Gpclr {
                bank: 1,
                mask: 1 << 8
            },
        ]
    );
}

#[test]
fn set_mode_preserves_neighbouring_fields() {
    let (gpio, registers) = sim_gpio(BoardRevision::RevisionTwo, Config::default());

    gpio.set_mode(PinId::Native(17), Mode::Output).unwrap();
    gpio.set_mode(PinId::Native(18), Mode::Output).unwrap();
    assert_eq!(registers.snapshot().gpfsel[1], (1 << 21) | (1 << 24));

    gpio.set_mode(PinId::Native(17), Mode::Input).unwrap();
    assert_eq!(registers.snapshot().gpfsel[1], 1 << 24);
    assert_eq!(gpio.mode(PinId::Native(17)).unwrap(), Mode::Input);
    assert_eq!(gpio.mode(PinId::Native(18)).unwrap(), Mode::Output);
}

#[test]
fn write_word_reconstructs_every_word() {
    let pins = [
        PinId::Native(4),
        PinId::Header(11),
        PinId::Logical(2),
        PinId::Native(33),
        PinId::Native(52),
    ];
    let (gpio, _) = sim_gpio(BoardRevision::RevisionTwo, Config::default());

    for &pin in &pins {
        gpio.set_mode(pin, Mode::Output).unwrap();
    }

    for word in 0..(1 << pins.len()) {
        gpio.write_word(&pins, word).unwrap();
        assert_eq!(read_word(&gpio, &pins), word);
    }
}

#[test]
fn write_word_issues_four_ordered_writes() {
    let (gpio, registers) = sim_gpio(BoardRevision::RevisionTwo, Config::default());

    gpio.write_word(&[PinId::Native(17), PinId::Native(40), PinId::Native(27)], 0b110)
        .unwrap();

    assert_eq!(
        registers.writes(),
        vec![
            RegisterWrite::Gpset {
                bank: 0,
                mask: 1 << 17
            },
            RegisterWrite::Gpset {
                bank: 1,
                mask: 1 << 8
            },
            RegisterWrite::Gpclr {
                bank: 0,
                mask: 1 << 27
            },
            RegisterWrite::Gpclr { bank: 1, mask: 0 },
        ]
    );
}

#[test]
fn pin_set_matches_write_word() {
    let orderings: [&[PinId]; 3] = [
        &[PinId::Native(17), PinId::Native(18), PinId::Native(27)],
        &[PinId::Native(27), PinId::Native(17), PinId::Native(18)],
        &[
            PinId::Native(45),
            PinId::Header(16),
            PinId::Native(2),
            PinId::Logical(7),
        ],
    ];

    for pins in orderings.iter() {
        let (gpio, registers) = sim_gpio(BoardRevision::RevisionTwo, Config::default());
        let pin_set = gpio.pin_set(pins).unwrap();
        registers.clear_writes();

        for word in 0..(1u32 << pins.len()) {
            gpio.write_word(pins, word).unwrap();
            let batched = registers.writes();
            registers.clear_writes();

            pin_set.apply(word).unwrap();
            let precomputed = registers.writes();
            registers.clear_writes();

            assert_eq!(batched, precomputed, "word {:#b}", word);
            assert_eq!(batched.len(), 4);
        }
    }
}

#[test]
fn pin_set_drives_three_pin_bus() {
    let (gpio, registers) = sim_gpio(BoardRevision::RevisionTwo, Config::default());
    let pins = [PinId::Native(17), PinId::Native(18), PinId::Native(27)];

    let pin_set = gpio.pin_set(&pins).unwrap();

    for &pin in &pins {
        assert_eq!(gpio.mode(pin).unwrap(), Mode::Output);
    }

    registers.clear_writes();
    pin_set.apply(0b101).unwrap();
    assert_eq!(registers.writes().len(), 4);
    assert_eq!(gpio.level(PinId::Native(17)).unwrap(), Level::High);
    assert_eq!(gpio.level(PinId::Native(18)).unwrap(), Level::Low);
    assert_eq!(gpio.level(PinId::Native(27)).unwrap(), Level::High);

    pin_set.apply(0b010).unwrap();
    assert_eq!(gpio.level(PinId::Native(17)).unwrap(), Level::Low);
    assert_eq!(gpio.level(PinId::Native(18)).unwrap(), Level::High);
    assert_eq!(gpio.level(PinId::Native(27)).unwrap(), Level::Low);
}

#[test]
fn pin_set_shared_between_threads() {
    let (gpio, _) = sim_gpio(BoardRevision::RevisionTwo, Config::default());
    let pin_set = gpio
        .pin_set(&[PinId::Native(5), PinId::Native(6), PinId::Native(13)])
        .unwrap();

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for word in 0..8 {
                    pin_set.apply(word).unwrap();
                }
            });
        }
    });

    pin_set.apply(0b011).unwrap();
    assert_eq!(
        read_word(&gpio, &[PinId::Native(5), PinId::Native(6), PinId::Native(13)]),
        0b011
    );
}

#[test]
fn index_wraps_at_table_width() {
    let (gpio, _) = sim_gpio(BoardRevision::RevisionTwo, Config::default());

    for &scheme in &SCHEMES {
        for number in 0..TABLE_WIDTH as u32 {
            assert_eq!(
                gpio.resolve(PinId::new(scheme, number + TABLE_WIDTH as u32)),
                gpio.resolve(PinId::new(scheme, number))
            );
        }
    }

    assert_eq!(gpio.resolve(PinId::Logical(64)), Some(17));
}

#[test]
fn index_rejected_at_table_width() {
    let (gpio, registers) = sim_gpio(
        BoardRevision::RevisionTwo,
        Config::default().index_policy(IndexPolicy::Reject),
    );

    assert_eq!(gpio.resolve(PinId::Logical(64)), None);
    assert_eq!(gpio.resolve(PinId::Logical(63)), None);
    assert_eq!(gpio.resolve(PinId::Logical(0)), Some(17));
    assert!(matches!(
        gpio.write(PinId::Logical(64), Level::High),
        Err(Error::InvalidPin(PinId::Logical(64)))
    ));
    assert!(registers.writes().is_empty());
}

#[test]
fn unmapped_pins_strict() {
    let (gpio, registers) = sim_gpio(BoardRevision::RevisionTwo, Config::default());
    let unmapped = [PinId::Header(1), PinId::Header(0), PinId::Logical(40), PinId::Native(54)];

    for &pin in &unmapped {
        assert!(matches!(gpio.set_mode(pin, Mode::Output), Err(Error::InvalidPin(p)) if p == pin));
        assert!(matches!(gpio.read(pin), Err(Error::InvalidPin(_))));
        assert!(matches!(gpio.write(pin, Level::High), Err(Error::InvalidPin(_))));
        assert!(matches!(gpio.mode(pin), Err(Error::InvalidPin(_))));
        assert!(matches!(gpio.get(pin), Err(Error::InvalidPin(_))));
    }

    assert!(matches!(
        gpio.write_word(&[PinId::Native(17), PinId::Header(2)], 0b11),
        Err(Error::InvalidPin(PinId::Header(2)))
    ));
    assert!(matches!(
        gpio.pin_set(&[PinId::Header(2), PinId::Native(17)]),
        Err(Error::InvalidPin(PinId::Header(2)))
    ));

    assert!(registers.writes().is_empty());
}

#[test]
fn unmapped_pins_permissive() {
    let (gpio, registers) = sim_gpio(
        BoardRevision::RevisionTwo,
        Config::default().strict_validation(false),
    );
    let unmapped = [PinId::Header(1), PinId::Logical(40), PinId::Native(60)];

    for &pin in &unmapped {
        gpio.set_mode(pin, Mode::Output).unwrap();
        gpio.write(pin, Level::High).unwrap();
        gpio.write(pin, Level::Low).unwrap();
        assert_eq!(gpio.read(pin).unwrap(), 0);
    }

    assert!(registers.writes().is_empty());
}

#[test]
fn unmapped_bus_permissive_writes_nothing() {
    let (gpio, registers) = sim_gpio(
        BoardRevision::RevisionTwo,
        Config::default().strict_validation(false),
    );

    gpio.write_word(&[PinId::Header(1)], 1).unwrap();
    gpio.write_word(&[PinId::Header(1), PinId::Native(60)], 0b11).unwrap();

    let pin_set = gpio.pin_set(&[PinId::Header(1), PinId::Header(2)]).unwrap();
    pin_set.apply(3).unwrap();
    pin_set.apply(0).unwrap();

    assert_eq!(pin_set.signals(), &[None, None]);
    assert!(registers.writes().is_empty());

    // One mapped pin is enough to drive the bus
    gpio.write_word(&[PinId::Header(1), PinId::Header(11)], 0b11).unwrap();
    assert_eq!(registers.writes().len(), 4);
}

#[test]
fn unsupported_modes() {
    let (gpio, registers) = sim_gpio(BoardRevision::RevisionTwo, Config::default());

    assert!(matches!(
        gpio.set_mode(PinId::Native(17), Mode::Alt0),
        Err(Error::InvalidMode(Mode::Alt0))
    ));
    assert!(registers.writes().is_empty());

    let (gpio, registers) = sim_gpio(
        BoardRevision::RevisionTwo,
        Config::default().strict_validation(false),
    );
    gpio.set_mode(PinId::Native(17), Mode::Alt5).unwrap();
    assert!(registers.writes().is_empty());
}

#[test]
fn word_range_strict() {
    let (gpio, registers) = sim_gpio(BoardRevision::RevisionTwo, Config::default());
    let pins = [PinId::Native(22), PinId::Native(23)];
    let pin_set = gpio.pin_set(&pins).unwrap();
    registers.clear_writes();

    assert!(matches!(
        gpio.write_word(&pins, 0b100),
        Err(Error::WordOutOfRange { word: 0b100, width: 2 })
    ));
    assert!(matches!(
        pin_set.apply(4),
        Err(Error::WordOutOfRange { word: 4, width: 2 })
    ));
    assert!(registers.writes().is_empty());
}

#[test]
fn word_range_permissive_truncates() {
    let (gpio, _) = sim_gpio(
        BoardRevision::RevisionTwo,
        Config::default().strict_validation(false),
    );
    let pins = [PinId::Native(22), PinId::Native(23)];
    let pin_set = gpio.pin_set(&pins).unwrap();

    pin_set.apply(0b110).unwrap();
    assert_eq!(read_word(&gpio, &pins), 0b10);

    gpio.write_word(&pins, 0b1101).unwrap();
    assert_eq!(read_word(&gpio, &pins), 0b01);
}

#[test]
fn bus_width_limits() {
    let (gpio, _) = sim_gpio(BoardRevision::RevisionTwo, Config::default());
    let pins: Vec<PinId> = (0..33).map(PinId::Native).collect();

    assert!(matches!(gpio.write_word(&[], 0), Err(Error::InvalidBusWidth(0))));
    assert!(matches!(
        gpio.write_word(&pins, 0),
        Err(Error::InvalidBusWidth(33))
    ));

    gpio.write_word(&pins[1..], u32::MAX).unwrap();
    for &pin in &pins[1..] {
        assert_eq!(gpio.read(pin).unwrap(), 1);
    }
}

#[test]
fn bound_pin() {
    let (gpio, _) = sim_gpio(BoardRevision::RevisionTwo, Config::default());
    let mut pin = gpio.get(PinId::Header(13)).unwrap();

    assert_eq!(pin.pin(), 27);
    assert_eq!(pin.id(), PinId::Header(13));

    pin.set_mode(Mode::Output).unwrap();
    assert_eq!(pin.mode(), Mode::Output);

    pin.set_high();
    assert!(pin.is_high());
    pin.toggle();
    assert!(pin.is_low());
    assert_eq!(gpio.level(PinId::Native(27)).unwrap(), Level::Low);
}

#[test]
fn simulated_inputs() {
    let (gpio, registers) = sim_gpio(BoardRevision::RevisionTwo, Config::default());

    registers.set_level(0, 1 << 4);
    assert_eq!(gpio.read(PinId::Header(7)).unwrap(), 1);
    assert_eq!(gpio.read(PinId::Logical(7)).unwrap(), 1);
    assert_eq!(gpio.read(PinId::Native(5)).unwrap(), 0);
}
