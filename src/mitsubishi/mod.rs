pub mod phy;
pub use phy::*;
pub mod packet;

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use thiserror::Error;
use tracing::debug;

use crate::pulses::PulseSequence;
use packet::{Field, Frame};

/// Carrier frequency the emitter must key the mark durations at
pub const CARRIER_HZ: u32 = 38_000;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum InvalidConfiguration {
    #[error("temperature {0}C out of range, must be between 16C and 31C")]
    TemperatureOutOfRange(f32),
    #[error("temperature {0}C is not a whole number of degrees")]
    FractionalTemperature(f32),
    #[error("time slot {0} out of range, must be at most 143")]
    TimeOutOfRange(u8),
    #[error("time must be formatted as HH:MM")]
    InvalidTimeFormat,
    #[error("econo cool is only available in cool mode")]
    EconoCoolRequiresCool,
    #[error("econo cool and long mode can't be enabled together")]
    ConflictingModes,
    #[error("the vertical vane must be auto while econo cool or long mode is enabled")]
    VaneLocked,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("malformed pulse sequence: {0}")]
    MalformedSequence(&'static str),
    #[error("invalid header: mark {mark}us, space {space}us")]
    InvalidHeader { mark: u128, space: u128 },
    #[error("incomplete frame: got {bits} bits, expected {}", FRAME_LEN * 8)]
    IncompleteFrame { bits: usize },
    #[error("checksum mismatch: computed {expected:#04x}, received {actual:#04x}")]
    ChecksumMismatch { expected: u8, actual: u8 },
    #[error("unknown value {value:#04x} for {field}")]
    UnknownFieldValue { field: Field, value: u8 },
    #[error("inconsistent fields: {0}")]
    InconsistentFields(#[from] InvalidConfiguration),
    #[error("the repeated frame doesn't match the first one")]
    RepeatMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumIter, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Power {
    On,
    Off,
}

impl From<bool> for Power {
    fn from(on: bool) -> Self {
        if on {
            Power::On
        } else {
            Power::Off
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumIter, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    Heat,
    Cool,
    Dry,
    Fan,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumIter, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FanSpeed {
    Auto,
    Quiet,
    Low,
    Medium,
    High,
    Max,
}

/// Up/down air flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumIter, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VaneVertical {
    Auto,
    Highest,
    High,
    Middle,
    Low,
    Lowest,
    Swing,
}

/// Left/right air flow, called "wide vane" on the remote.
///
/// Unlike the vertical vane there is no auto position, the frame has no value for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumIter, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VaneHorizontal {
    LeftEnd,
    Left,
    Middle,
    Right,
    RightEnd,
    Sides,
    Swing,
}

/// Target temperature in whole degrees Celsius
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct Temperature(u8);

impl Temperature {
    pub const MIN: u8 = 16;
    pub const MAX: u8 = 31;

    pub fn new(celsius: u8) -> Result<Self, InvalidConfiguration> {
        if !(Self::MIN..=Self::MAX).contains(&celsius) {
            return Err(InvalidConfiguration::TemperatureOutOfRange(celsius as f32));
        }
        Ok(Self(celsius))
    }

    pub fn celsius(self) -> u8 {
        self.0
    }

    /// Every temperature the unit accepts, coldest first
    pub fn all() -> impl Iterator<Item = Temperature> {
        (Self::MIN..=Self::MAX).map(Temperature)
    }
}

impl Default for Temperature {
    fn default() -> Self {
        Self(20)
    }
}

impl TryFrom<f32> for Temperature {
    type Error = InvalidConfiguration;

    fn try_from(celsius: f32) -> Result<Self, Self::Error> {
        if !(Self::MIN as f32..=Self::MAX as f32).contains(&celsius) {
            return Err(InvalidConfiguration::TemperatureOutOfRange(celsius));
        }
        if celsius.fract() != 0.0 {
            return Err(InvalidConfiguration::FractionalTemperature(celsius));
        }
        Ok(Self(celsius as u8))
    }
}

impl From<Temperature> for f32 {
    fn from(temperature: Temperature) -> Self {
        temperature.0 as f32
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}C", self.0)
    }
}

/// Time of day with the unit's 10 minute resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(u8);

impl TimeOfDay {
    pub const MAX_SLOT: u8 = 143;

    /// Minutes are rounded down to the previous 10 minute slot
    pub fn new(hour: u8, minute: u8) -> Result<Self, InvalidConfiguration> {
        if hour > 23 || minute > 59 {
            return Err(InvalidConfiguration::InvalidTimeFormat);
        }
        Ok(Self(hour * 6 + minute / 10))
    }

    pub fn from_slot(slot: u8) -> Result<Self, InvalidConfiguration> {
        if slot > Self::MAX_SLOT {
            return Err(InvalidConfiguration::TimeOutOfRange(slot));
        }
        Ok(Self(slot))
    }

    pub fn slot(self) -> u8 {
        self.0
    }

    pub fn hour(self) -> u8 {
        self.0 / 6
    }

    pub fn minute(self) -> u8 {
        (self.0 % 6) * 10
    }
}

impl<T: chrono::Timelike> From<&T> for TimeOfDay {
    fn from(time: &T) -> Self {
        Self((time.hour() * 6 + time.minute() / 10) as u8)
    }
}

impl std::str::FromStr for TimeOfDay {
    type Err = InvalidConfiguration;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hour, minute) = s
            .split_once(':')
            .ok_or(InvalidConfiguration::InvalidTimeFormat)?;
        let hour = hour
            .parse()
            .map_err(|_| InvalidConfiguration::InvalidTimeFormat)?;
        let minute = minute
            .parse()
            .map_err(|_| InvalidConfiguration::InvalidTimeFormat)?;
        Self::new(hour, minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = InvalidConfiguration;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(time: TimeOfDay) -> Self {
        time.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// The unit's clock and its on/off timers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Timer {
    pub clock: TimeOfDay,
    // Turn on at
    pub start: Option<TimeOfDay>,
    // Turn off at
    pub end: Option<TimeOfDay>,
}

// The complete state sent to the heat pump. Only constructible through `ConfigurationBuilder`,
// so every value maps to a valid frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ConfigurationBuilder")]
pub struct Configuration {
    power: Power,
    mode: Mode,
    target_temperature: Temperature,
    fan_speed: FanSpeed,
    vane_vertical: VaneVertical,
    vane_horizontal: VaneHorizontal,

    // i-See room sensor
    isee: bool,

    // Reduced power cooling, cool mode only
    econo_cool: bool,

    // Long air throw
    long_mode: bool,

    clean: bool,
    plasma: bool,
    timer: Timer,
}

impl Configuration {
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::default()
    }

    pub fn to_builder(&self) -> ConfigurationBuilder {
        ConfigurationBuilder::from(*self)
    }

    pub fn power(&self) -> Power {
        self.power
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn target_temperature(&self) -> Temperature {
        self.target_temperature
    }

    pub fn fan_speed(&self) -> FanSpeed {
        self.fan_speed
    }

    pub fn vane_vertical(&self) -> VaneVertical {
        self.vane_vertical
    }

    pub fn vane_horizontal(&self) -> VaneHorizontal {
        self.vane_horizontal
    }

    pub fn isee(&self) -> bool {
        self.isee
    }

    pub fn econo_cool(&self) -> bool {
        self.econo_cool
    }

    pub fn long_mode(&self) -> bool {
        self.long_mode
    }

    pub fn clean(&self) -> bool {
        self.clean
    }

    pub fn plasma(&self) -> bool {
        self.plasma
    }

    pub fn timer(&self) -> Timer {
        self.timer
    }
}

impl Default for Configuration {
    fn default() -> Self {
        let b = ConfigurationBuilder::default();
        Self {
            power: b.power,
            mode: b.mode,
            target_temperature: b.target_temperature,
            fan_speed: b.fan_speed,
            vane_vertical: b.vane_vertical,
            vane_horizontal: b.vane_horizontal,
            isee: b.isee,
            econo_cool: b.econo_cool,
            long_mode: b.long_mode,
            clean: b.clean,
            plasma: b.plasma,
            timer: b.timer,
        }
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "power: {} mode: {} temp: {} fan: {} vane: {} wide vane: {} clock: {}",
            self.power,
            self.mode,
            self.target_temperature,
            self.fan_speed,
            self.vane_vertical,
            self.vane_horizontal,
            self.timer.clock,
        )?;
        if let Some(start) = self.timer.start {
            write!(f, " start: {}", start)?;
        }
        if let Some(end) = self.timer.end {
            write!(f, " end: {}", end)?;
        }

        let flags = [
            (self.isee, "i-See"),
            (self.econo_cool, "Econo Cool"),
            (self.long_mode, "Long Mode"),
            (self.clean, "Clean"),
            (self.plasma, "Plasma"),
        ];
        let flags: Vec<_> = flags.iter().filter(|m| m.0).map(|m| m.1).collect();
        if !flags.is_empty() {
            write!(f, " modes: [{}]", flags.join(","))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigurationBuilder {
    power: Power,
    mode: Mode,
    target_temperature: Temperature,
    fan_speed: FanSpeed,
    vane_vertical: VaneVertical,
    vane_horizontal: VaneHorizontal,
    isee: bool,
    econo_cool: bool,
    long_mode: bool,
    clean: bool,
    plasma: bool,
    timer: Timer,
}

impl Default for ConfigurationBuilder {
    fn default() -> Self {
        Self {
            power: Power::Off,
            mode: Mode::Auto,
            target_temperature: Temperature::default(),
            fan_speed: FanSpeed::Auto,
            vane_vertical: VaneVertical::Auto,
            vane_horizontal: VaneHorizontal::Middle,
            isee: false,
            econo_cool: false,
            long_mode: false,
            clean: false,
            plasma: false,
            timer: Timer::default(),
        }
    }
}

impl From<Configuration> for ConfigurationBuilder {
    fn from(c: Configuration) -> Self {
        Self {
            power: c.power,
            mode: c.mode,
            target_temperature: c.target_temperature,
            fan_speed: c.fan_speed,
            vane_vertical: c.vane_vertical,
            vane_horizontal: c.vane_horizontal,
            isee: c.isee,
            econo_cool: c.econo_cool,
            long_mode: c.long_mode,
            clean: c.clean,
            plasma: c.plasma,
            timer: c.timer,
        }
    }
}

impl ConfigurationBuilder {
    pub fn power(mut self, power: Power) -> Self {
        self.power = power;
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn target_temperature(mut self, temperature: Temperature) -> Self {
        self.target_temperature = temperature;
        self
    }

    pub fn fan_speed(mut self, fan_speed: FanSpeed) -> Self {
        self.fan_speed = fan_speed;
        self
    }

    pub fn vane_vertical(mut self, vane: VaneVertical) -> Self {
        self.vane_vertical = vane;
        self
    }

    pub fn vane_horizontal(mut self, vane: VaneHorizontal) -> Self {
        self.vane_horizontal = vane;
        self
    }

    pub fn isee(mut self, isee: bool) -> Self {
        self.isee = isee;
        self
    }

    pub fn econo_cool(mut self, econo_cool: bool) -> Self {
        self.econo_cool = econo_cool;
        self
    }

    pub fn long_mode(mut self, long_mode: bool) -> Self {
        self.long_mode = long_mode;
        self
    }

    pub fn clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    pub fn plasma(mut self, plasma: bool) -> Self {
        self.plasma = plasma;
        self
    }

    pub fn timer(mut self, timer: Timer) -> Self {
        self.timer = timer;
        self
    }

    pub fn build(self) -> Result<Configuration, InvalidConfiguration> {
        if self.econo_cool && self.mode != Mode::Cool {
            return Err(InvalidConfiguration::EconoCoolRequiresCool);
        }
        if self.econo_cool && self.long_mode {
            return Err(InvalidConfiguration::ConflictingModes);
        }
        if (self.econo_cool || self.long_mode) && self.vane_vertical != VaneVertical::Auto {
            return Err(InvalidConfiguration::VaneLocked);
        }

        Ok(Configuration {
            power: self.power,
            mode: self.mode,
            target_temperature: self.target_temperature,
            fan_speed: self.fan_speed,
            vane_vertical: self.vane_vertical,
            vane_horizontal: self.vane_horizontal,
            isee: self.isee,
            econo_cool: self.econo_cool,
            long_mode: self.long_mode,
            clean: self.clean,
            plasma: self.plasma,
            timer: self.timer,
        })
    }
}

impl TryFrom<ConfigurationBuilder> for Configuration {
    type Error = InvalidConfiguration;

    fn try_from(builder: ConfigurationBuilder) -> Result<Self, Self::Error> {
        builder.build()
    }
}

/// Encodes a configuration as a single frame
pub fn encode(configuration: &Configuration) -> PulseSequence {
    Phy::new().encode(Frame::from(configuration).bytes())
}

/// Encodes a configuration as the stock remote sends it, with the frame repeated twice
pub fn encode_repeated(configuration: &Configuration) -> PulseSequence {
    Phy::new().encode_repeated(Frame::from(configuration).bytes())
}

pub fn decode(sequence: &PulseSequence) -> Result<Configuration, DecodeError> {
    let phy = Phy::new();
    let decode_copy = |pulses: &[Duration]| {
        let frame = Frame::new(phy.decode_frame(pulses)?);
        Configuration::try_from(&frame)
    };

    let copies = match phy.split(sequence)? {
        Capture::Copies(copies) => copies,
        Capture::Candidates(windows) => {
            let mut first_error = None;
            for (i, window) in windows.into_iter().enumerate() {
                match decode_copy(window) {
                    Ok(configuration) => {
                        debug!("found a frame in candidate {}", i);
                        return Ok(configuration);
                    }
                    Err(e) => {
                        first_error.get_or_insert(e);
                    }
                }
            }
            return Err(first_error
                .unwrap_or(DecodeError::MalformedSequence("no frame in sequence")));
        }
    };

    let mut results = copies.into_iter().map(decode_copy);

    // A single copy is always present
    let first = results
        .next()
        .unwrap_or(Err(DecodeError::MalformedSequence("empty sequence")));

    match (first, results.next()) {
        (first, None) => first,
        (Ok(a), Some(Ok(b))) if a == b => Ok(a),
        (Ok(_), Some(Ok(_))) => Err(DecodeError::RepeatMismatch),
        (Ok(a), Some(Err(e))) => {
            debug!("repeated frame failed to decode, using the first one: {}", e);
            Ok(a)
        }
        (Err(e), Some(Ok(b))) => {
            debug!("first frame failed to decode, using the repeated one: {}", e);
            Ok(b)
        }
        (Err(e), Some(Err(_))) => Err(e),
    }
}
