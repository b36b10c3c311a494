use std::fmt;

use bitfield::bitfield;

use super::{
    Configuration, DecodeError, FanSpeed, Mode, Power, Temperature, TimeOfDay, Timer,
    VaneHorizontal, VaneVertical, FRAME_LEN,
};

/// A frame field, as reported by decode errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Signature,
    Mode,
    Temperature,
    WideVane,
    FanSpeed,
    Vane,
    Clock,
    StartTime,
    EndTime,
    Program,
    // Bits with no known meaning in the given byte
    Reserved(usize),
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Signature => f.write_str("signature"),
            Field::Mode => f.write_str("mode"),
            Field::Temperature => f.write_str("temperature"),
            Field::WideVane => f.write_str("wide vane"),
            Field::FanSpeed => f.write_str("fan speed"),
            Field::Vane => f.write_str("vane"),
            Field::Clock => f.write_str("clock"),
            Field::StartTime => f.write_str("start time"),
            Field::EndTime => f.write_str("end time"),
            Field::Program => f.write_str("timer program"),
            Field::Reserved(byte) => write!(f, "reserved bits of byte {}", byte),
        }
    }
}

// Bit numbers count from the least significant bit of byte 0, which is also the order bits are
// sent in.
bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Frame([u8]);
    pub power, set_power : 45;
    pub u8, mode_raw, set_mode_raw : 53, 51;
    pub isee, set_isee : 54;
    pub u8, temperature_raw, set_temperature_raw : 59, 56;
    pub u8, mode_aux_raw, set_mode_aux_raw : 66, 64;
    pub u8, wide_vane_raw, set_wide_vane_raw : 71, 68;
    pub u8, fan_raw, set_fan_raw : 74, 72;
    pub u8, vane_raw, set_vane_raw : 78, 75;
    pub u8, clock_raw, set_clock_raw : 87, 80;
    pub u8, end_raw, set_end_raw : 95, 88;
    pub u8, start_raw, set_start_raw : 103, 96;
    pub u8, program_raw, set_program_raw : 106, 104;
    pub clean, set_clean : 114;
    pub econo_cool, set_econo_cool : 117;
    pub plasma, set_plasma : 122;
    pub long_mode, set_long_mode : 124;
    pub u8, checksum, set_checksum : 143, 136;
}

impl fmt::Debug for Frame<[u8; FRAME_LEN]> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", hex::encode(self.0))
    }
}

impl Frame<[u8; FRAME_LEN]> {
    const SIGNATURE: [u8; 5] = [0x23, 0xCB, 0x26, 0x01, 0x00];

    // Bits that are always zero, per byte. Byte 15 also carries the install position in 0x18,
    // which shares 0x10 with long mode and is otherwise ignored.
    const RESERVED: [u8; FRAME_LEN] = [
        0x00, 0x00, 0x00, 0x00, 0x00, 0xDF, 0x87, 0xF0, 0x08, 0x00, 0x00, 0x00, 0x00, 0xF8, 0xDB,
        0xE3, 0xFF, 0x00,
    ];

    // Modes
    const MODE_HEAT: u8 = 0b001;
    const MODE_DRY: u8 = 0b010;
    const MODE_COOL: u8 = 0b011;
    const MODE_AUTO: u8 = 0b100;
    const MODE_FAN: u8 = 0b111;

    // The mode is repeated in byte 8, auto shares its value with cool
    const MODE_AUX_HEAT: u8 = 0b000;
    const MODE_AUX_DRY: u8 = 0b010;
    const MODE_AUX_COOL: u8 = 0b110;
    const MODE_AUX_AUTO: u8 = 0b110;
    const MODE_AUX_FAN: u8 = 0b000;

    const TEMP_OFFSET: u8 = 16;

    // Wide vane
    const WIDE_VANE_LEFT_END: u8 = 0x1;
    const WIDE_VANE_LEFT: u8 = 0x2;
    const WIDE_VANE_MIDDLE: u8 = 0x3;
    const WIDE_VANE_RIGHT: u8 = 0x4;
    const WIDE_VANE_RIGHT_END: u8 = 0x5;
    const WIDE_VANE_SIDES: u8 = 0x8;
    const WIDE_VANE_SWING: u8 = 0xC;

    // Fans
    const FAN_AUTO: u8 = 0;
    const FAN_LOW: u8 = 1;
    const FAN_MEDIUM: u8 = 2;
    const FAN_HIGH: u8 = 3;
    const FAN_MAX: u8 = 4;
    const FAN_MAX_ALT: u8 = 5; // Sent by some remotes, same speed as FAN_MAX
    const FAN_QUIET: u8 = 6;

    // Vane
    const VANE_AUTO: u8 = 0b1000;
    const VANE_AUTO_ALT: u8 = 0b0000;
    const VANE_HIGHEST: u8 = 0b1001;
    const VANE_HIGH: u8 = 0b1010;
    const VANE_MIDDLE: u8 = 0b1011;
    const VANE_LOW: u8 = 0b1100;
    const VANE_LOWEST: u8 = 0b1101;
    const VANE_SWING: u8 = 0b1111;

    // Programmed timers
    const PROGRAM_NONE: u8 = 0b000;
    const PROGRAM_END: u8 = 0b011;
    const PROGRAM_START: u8 = 0b101;
    const PROGRAM_START_END: u8 = 0b111;

    pub fn new(bytes: [u8; FRAME_LEN]) -> Self {
        Frame(bytes)
    }

    pub fn empty() -> Self {
        let mut bytes = [0; FRAME_LEN];
        bytes[..Self::SIGNATURE.len()].copy_from_slice(&Self::SIGNATURE);
        Frame(bytes)
    }

    pub fn bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    pub fn mode(&self) -> Result<Mode, DecodeError> {
        let mode = match self.mode_raw() {
            Self::MODE_HEAT => Mode::Heat,
            Self::MODE_DRY => Mode::Dry,
            Self::MODE_COOL => Mode::Cool,
            Self::MODE_AUTO => Mode::Auto,
            Self::MODE_FAN => Mode::Fan,
            v => return Err(unknown(Field::Mode, v)),
        };

        if self.mode_aux_raw() != Self::mode_aux(mode) {
            return Err(unknown(Field::Mode, self.mode_aux_raw()));
        }
        Ok(mode)
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.set_mode_raw(match mode {
            Mode::Heat => Self::MODE_HEAT,
            Mode::Dry => Self::MODE_DRY,
            Mode::Cool => Self::MODE_COOL,
            Mode::Auto => Self::MODE_AUTO,
            Mode::Fan => Self::MODE_FAN,
        });
        self.set_mode_aux_raw(Self::mode_aux(mode));
    }

    fn mode_aux(mode: Mode) -> u8 {
        match mode {
            Mode::Heat => Self::MODE_AUX_HEAT,
            Mode::Dry => Self::MODE_AUX_DRY,
            Mode::Cool => Self::MODE_AUX_COOL,
            Mode::Auto => Self::MODE_AUX_AUTO,
            Mode::Fan => Self::MODE_AUX_FAN,
        }
    }

    pub fn temperature(&self) -> Result<Temperature, DecodeError> {
        let raw = self.temperature_raw();
        Temperature::new(raw + Self::TEMP_OFFSET).map_err(|_| unknown(Field::Temperature, raw))
    }

    pub fn set_temperature(&mut self, temperature: Temperature) {
        self.set_temperature_raw(temperature.celsius() - Self::TEMP_OFFSET);
    }

    pub fn wide_vane(&self) -> Result<VaneHorizontal, DecodeError> {
        Ok(match self.wide_vane_raw() {
            Self::WIDE_VANE_LEFT_END => VaneHorizontal::LeftEnd,
            Self::WIDE_VANE_LEFT => VaneHorizontal::Left,
            Self::WIDE_VANE_MIDDLE => VaneHorizontal::Middle,
            Self::WIDE_VANE_RIGHT => VaneHorizontal::Right,
            Self::WIDE_VANE_RIGHT_END => VaneHorizontal::RightEnd,
            Self::WIDE_VANE_SIDES => VaneHorizontal::Sides,
            Self::WIDE_VANE_SWING => VaneHorizontal::Swing,
            v => return Err(unknown(Field::WideVane, v)),
        })
    }

    pub fn set_wide_vane(&mut self, vane: VaneHorizontal) {
        self.set_wide_vane_raw(match vane {
            VaneHorizontal::LeftEnd => Self::WIDE_VANE_LEFT_END,
            VaneHorizontal::Left => Self::WIDE_VANE_LEFT,
            VaneHorizontal::Middle => Self::WIDE_VANE_MIDDLE,
            VaneHorizontal::Right => Self::WIDE_VANE_RIGHT,
            VaneHorizontal::RightEnd => Self::WIDE_VANE_RIGHT_END,
            VaneHorizontal::Sides => Self::WIDE_VANE_SIDES,
            VaneHorizontal::Swing => Self::WIDE_VANE_SWING,
        })
    }

    pub fn fan(&self) -> Result<FanSpeed, DecodeError> {
        Ok(match self.fan_raw() {
            Self::FAN_AUTO => FanSpeed::Auto,
            Self::FAN_LOW => FanSpeed::Low,
            Self::FAN_MEDIUM => FanSpeed::Medium,
            Self::FAN_HIGH => FanSpeed::High,
            Self::FAN_MAX | Self::FAN_MAX_ALT => FanSpeed::Max,
            Self::FAN_QUIET => FanSpeed::Quiet,
            v => return Err(unknown(Field::FanSpeed, v)),
        })
    }

    pub fn set_fan(&mut self, fan: FanSpeed) {
        self.set_fan_raw(match fan {
            FanSpeed::Auto => Self::FAN_AUTO,
            FanSpeed::Low => Self::FAN_LOW,
            FanSpeed::Medium => Self::FAN_MEDIUM,
            FanSpeed::High => Self::FAN_HIGH,
            FanSpeed::Max => Self::FAN_MAX,
            FanSpeed::Quiet => Self::FAN_QUIET,
        })
    }

    pub fn vane(&self) -> Result<VaneVertical, DecodeError> {
        Ok(match self.vane_raw() {
            Self::VANE_AUTO | Self::VANE_AUTO_ALT => VaneVertical::Auto,
            Self::VANE_HIGHEST => VaneVertical::Highest,
            Self::VANE_HIGH => VaneVertical::High,
            Self::VANE_MIDDLE => VaneVertical::Middle,
            Self::VANE_LOW => VaneVertical::Low,
            Self::VANE_LOWEST => VaneVertical::Lowest,
            Self::VANE_SWING => VaneVertical::Swing,
            v => return Err(unknown(Field::Vane, v)),
        })
    }

    pub fn set_vane(&mut self, vane: VaneVertical) {
        self.set_vane_raw(match vane {
            VaneVertical::Auto => Self::VANE_AUTO,
            VaneVertical::Highest => Self::VANE_HIGHEST,
            VaneVertical::High => Self::VANE_HIGH,
            VaneVertical::Middle => Self::VANE_MIDDLE,
            VaneVertical::Low => Self::VANE_LOW,
            VaneVertical::Lowest => Self::VANE_LOWEST,
            VaneVertical::Swing => Self::VANE_SWING,
        })
    }

    pub fn timer(&self) -> Result<Timer, DecodeError> {
        let (start, end) = match self.program_raw() {
            Self::PROGRAM_NONE => (false, false),
            Self::PROGRAM_END => (false, true),
            Self::PROGRAM_START => (true, false),
            Self::PROGRAM_START_END => (true, true),
            v => return Err(unknown(Field::Program, v)),
        };

        // Times of timers that aren't programmed are leftovers and carry no meaning
        Ok(Timer {
            clock: slot(Field::Clock, self.clock_raw())?,
            start: start
                .then(|| slot(Field::StartTime, self.start_raw()))
                .transpose()?,
            end: end
                .then(|| slot(Field::EndTime, self.end_raw()))
                .transpose()?,
        })
    }

    pub fn set_timer(&mut self, timer: &Timer) {
        self.set_clock_raw(timer.clock.slot());
        self.set_start_raw(timer.start.map_or(0, TimeOfDay::slot));
        self.set_end_raw(timer.end.map_or(0, TimeOfDay::slot));
        self.set_program_raw(match (timer.start, timer.end) {
            (None, None) => Self::PROGRAM_NONE,
            (None, Some(_)) => Self::PROGRAM_END,
            (Some(_), None) => Self::PROGRAM_START,
            (Some(_), Some(_)) => Self::PROGRAM_START_END,
        });
    }

    /// Sum of every byte before the checksum, truncated to 8 bits
    pub fn compute_checksum(&self) -> u8 {
        self.0[..FRAME_LEN - 1]
            .iter()
            .fold(0u8, |sum, &b| sum.wrapping_add(b))
    }

    pub fn apply_checksum(&mut self) {
        self.set_checksum(self.compute_checksum());
    }

    pub fn validate_checksum(&self) -> Result<(), DecodeError> {
        let expected = self.compute_checksum();
        if expected != self.checksum() {
            return Err(DecodeError::ChecksumMismatch {
                expected,
                actual: self.checksum(),
            });
        }
        Ok(())
    }

    fn validate_fixed(&self) -> Result<(), DecodeError> {
        if let Some((&actual, _)) = self
            .0
            .iter()
            .zip(Self::SIGNATURE.iter())
            .find(|(actual, expected)| actual != expected)
        {
            return Err(unknown(Field::Signature, actual));
        }

        for (i, (&byte, &mask)) in self.0.iter().zip(Self::RESERVED.iter()).enumerate() {
            if byte & mask != 0 {
                return Err(unknown(Field::Reserved(i), byte & mask));
            }
        }
        Ok(())
    }
}

fn unknown(field: Field, value: u8) -> DecodeError {
    DecodeError::UnknownFieldValue { field, value }
}

fn slot(field: Field, value: u8) -> Result<TimeOfDay, DecodeError> {
    TimeOfDay::from_slot(value).map_err(|_| unknown(field, value))
}

impl From<&Configuration> for Frame<[u8; FRAME_LEN]> {
    fn from(config: &Configuration) -> Self {
        let mut frame = Frame::empty();
        frame.set_power(config.power() == Power::On);
        frame.set_mode(config.mode());
        frame.set_isee(config.isee());
        frame.set_temperature(config.target_temperature());
        frame.set_wide_vane(config.vane_horizontal());
        frame.set_fan(config.fan_speed());
        frame.set_vane(config.vane_vertical());
        frame.set_timer(&config.timer());
        frame.set_econo_cool(config.econo_cool());
        frame.set_clean(config.clean());
        frame.set_long_mode(config.long_mode());
        frame.set_plasma(config.plasma());
        frame.apply_checksum();
        frame
    }
}

impl TryFrom<&Frame<[u8; FRAME_LEN]>> for Configuration {
    type Error = DecodeError;

    fn try_from(frame: &Frame<[u8; FRAME_LEN]>) -> Result<Self, DecodeError> {
        frame.validate_checksum()?;
        frame.validate_fixed()?;

        Ok(Configuration::builder()
            .power(Power::from(frame.power()))
            .mode(frame.mode()?)
            .isee(frame.isee())
            .target_temperature(frame.temperature()?)
            .vane_horizontal(frame.wide_vane()?)
            .fan_speed(frame.fan()?)
            .vane_vertical(frame.vane()?)
            .timer(frame.timer()?)
            .econo_cool(frame.econo_cool())
            .clean(frame.clean())
            .long_mode(frame.long_mode())
            .plasma(frame.plasma())
            .build()?)
    }
}
