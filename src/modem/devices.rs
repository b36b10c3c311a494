use std::{
    fs::{File, OpenOptions},
    io::{BufRead, BufReader, Read, Write},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use anyhow::anyhow;
use bytes::BufMut;
use thiserror::Error;
use tracing::{debug, trace};

use crate::mitsubishi::{FRAME_PULSES, REPEATED_PULSES};
use crate::pulses::PulseSequence;

use super::codecs::{create_codec, Codec, CodecError, CodecType};

/// An IR transceiver
pub trait Device {
    type Error;

    fn send(&mut self, sequence: &PulseSequence) -> Result<(), Self::Error>;
    fn recv(&mut self) -> Result<PulseSequence, Self::Error>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceType {
    /// Read/write lines to stdin/stdout
    Lines { codec_type: CodecType },

    /// A LIRC character device, such as /dev/lirc0
    Lirc { path: PathBuf },
}

impl FromStr for DeviceType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(2, ':');
        let device_type = parts.next().unwrap_or_default();

        Ok(match device_type {
            "lines" => {
                let codec_type = parts.next().ok_or_else(|| anyhow!("Missing codec type"))?;
                DeviceType::Lines {
                    codec_type: CodecType::from_str(codec_type)?,
                }
            }
            "lirc" => {
                let path = parts.next().ok_or_else(|| anyhow!("Missing device path"))?;
                DeviceType::Lirc { path: path.into() }
            }
            _ => return Err(anyhow!("unknown device type: {}", device_type)),
        })
    }
}

pub fn create_device(ty: DeviceType) -> Result<Box<dyn Device<Error = DeviceError> + Send>, DeviceError> {
    Ok(match ty {
        DeviceType::Lines { codec_type } => Box::new(Lines::new(
            codec_type,
            Box::new(std::io::stdin()),
            Box::new(std::io::stdout()),
        )),
        DeviceType::Lirc { path } => Box::new(Lirc::open(path)?),
    })
}

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("codec error: {0}")]
    CodecError(#[from] CodecError),

    #[error("io error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("EOF")]
    EOF,
}

pub struct Lines {
    codec: Box<dyn Codec<Error = CodecError> + Send>,
    reader: BufReader<Box<dyn Read + Send>>,
    writer: Box<dyn Write + Send>,
}

impl Lines {
    pub fn new(
        codec_type: CodecType,
        reader: Box<dyn Read + Send>,
        writer: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            codec: create_codec(codec_type),
            reader: BufReader::new(reader),
            writer,
        }
    }
}

impl Device for Lines {
    type Error = DeviceError;

    fn send(&mut self, sequence: &PulseSequence) -> Result<(), Self::Error> {
        let encoded = self.codec.encode(sequence)?;
        writeln!(self.writer, "{}", encoded)?;
        self.writer.flush()?;
        Ok(())
    }

    fn recv(&mut self) -> Result<PulseSequence, Self::Error> {
        let mut input = String::new();
        loop {
            input.clear();
            match self.reader.read_line(&mut input)? {
                0 => return Err(DeviceError::EOF),
                _ if input.trim().is_empty() => continue,
                _ => return Ok(self.codec.decode(input.trim())?),
            }
        }
    }
}

/// A LIRC device, written in PULSE mode and read in MODE2
pub struct Lirc<T = File> {
    inner: T,
}

impl Lirc {
    pub fn open(path: PathBuf) -> Result<Self, DeviceError> {
        let inner = OpenOptions::new().read(true).write(true).open(&path)?;
        debug!("opened lirc device {}", path.display());
        Ok(Self { inner })
    }
}

// MODE2 words carry their type in the top byte and a value in microseconds below it
const MODE2_MASK: u32 = 0xFF00_0000;
const MODE2_VALUE: u32 = 0x00FF_FFFF;
const MODE2_SPACE: u32 = 0x0000_0000;
const MODE2_PULSE: u32 = 0x0100_0000;
const MODE2_TIMEOUT: u32 = 0x0300_0000;
const MODE2_OVERFLOW: u32 = 0x0400_0000;

impl<T: Read + Write> Lirc<T> {
    // A space long enough to end a capture, the repeat gap is ~17ms
    const END_OF_CAPTURE: Duration = Duration::from_millis(50);

    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    fn read_word(&mut self) -> Result<u32, DeviceError> {
        let mut buf = [0u8; 4];
        match self.inner.read_exact(&mut buf) {
            Ok(()) => Ok(u32::from_ne_bytes(buf)),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(DeviceError::EOF),
            Err(e) => Err(e.into()),
        }
    }
}

impl<T: Read + Write> Device for Lirc<T> {
    type Error = DeviceError;

    fn send(&mut self, sequence: &PulseSequence) -> Result<(), Self::Error> {
        let mut buf = Vec::with_capacity(sequence.len() * 4);
        for pulse in sequence.to_micros() {
            buf.put_u32_ne(pulse);
        }
        self.inner.write_all(&buf)?;
        Ok(())
    }

    /// Collects words until a long space or a full repeated frame
    fn recv(&mut self) -> Result<PulseSequence, Self::Error> {
        let mut grabbed: Vec<Duration> = Vec::new();

        loop {
            let word = match self.read_word() {
                Ok(word) => word,
                Err(DeviceError::EOF) if grabbed.len() >= FRAME_PULSES => break,
                Err(e) => return Err(e),
            };

            let duration = Duration::from_micros((word & MODE2_VALUE) as _);

            match word & MODE2_MASK {
                MODE2_PULSE => grabbed.push(duration),
                // A signal always starts with a mark
                MODE2_SPACE if !grabbed.is_empty() && duration < Self::END_OF_CAPTURE => {
                    grabbed.push(duration)
                }
                MODE2_SPACE | MODE2_TIMEOUT => {
                    if grabbed.len() >= FRAME_PULSES {
                        break;
                    }
                    if !grabbed.is_empty() {
                        trace!("dropping {} pulses of noise", grabbed.len());
                        grabbed.clear();
                    }
                    continue;
                }
                MODE2_OVERFLOW => {
                    debug!("receiver overflowed, dropping {} pulses", grabbed.len());
                    grabbed.clear();
                    continue;
                }
                // Carrier frequency reports
                _ => {
                    trace!("ignoring mode2 word {:#010x}", word);
                    continue;
                }
            }

            if grabbed.len() == REPEATED_PULSES {
                break;
            }
        }

        debug!("captured {} pulses", grabbed.len());
        Ok(PulseSequence::new(grabbed))
    }
}
