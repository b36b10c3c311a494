use std::time::Duration;

/**
 * Implements encoding/decoding of payloads sent to a broadlink IR device
 * Inspired from: https://github.com/haimkastner/broadlink-ir-converter/blob/master/src/index.ts
 * Payload format from: https://github.com/mjg59/python-broadlink/blob/master/protocol.md
 */
use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::pulses::PulseSequence;

/// Off time appended after the last mark, broadlink expects on/off pairs
pub const TRAILING_GAP: Duration = Duration::from_millis(100);

trait BroadlinkDuration {
    fn to_broadlink(self) -> u16;
    fn from_broadlink(broadlink_pulse: u16) -> Self;
}

impl BroadlinkDuration for std::time::Duration {
    fn to_broadlink(self) -> u16 {
        // Round through float to avoid rounding errors in conversion
        (self.as_micros() as f64 * 269.0 / 8192.0).round() as u16
    }

    fn from_broadlink(broadlink_pulse: u16) -> Self {
        // Round through float to avoid rounding errors in conversion
        Self::from_nanos(((broadlink_pulse as f64) * 8192000.0 / 269.0).round() as _)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Transport {
    Ir = 0x26,
    Rf433 = 0xb2,
    Rf315 = 0xd7,
}

/*
Offset	Contents
0x00	0x26 = IR, 0xb2 for RF 433Mhz, 0xd7 for RF 315Mhz
0x01	repeat count, (0 = no repeat, 1 send twice, .....)
0x02-0x03	Length of the following data in little endian
0x04 ....	Pulse lengths in 2^-15 s units (µs * 269 / 8192 works very well)
....	For IR codes, the pulse lengths should be paired as ON, OFF
 */
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recording {
    pub repeat_count: u8,
    pub transport: Transport,
    // On-off pulse durations
    pub pulses: Vec<Duration>,
}

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid transport type: {0}")]
    InvalidTransport(u8),
    #[error("payload truncated")]
    Truncated,
}

impl Recording {
    pub fn new_ir(pulses: Vec<Duration>) -> Self {
        Self {
            repeat_count: 0,
            transport: Transport::Ir,
            pulses,
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut b = BytesMut::new();
        b.put_u8(self.transport as u8);
        b.put_u8(self.repeat_count);

        let mut pulses_buf = BytesMut::new();
        for pulse in &self.pulses {
            let pulse = pulse.to_broadlink();
            if pulse < 256 {
                pulses_buf.put_u8(pulse as _);
            } else {
                pulses_buf.put_u8(0);
                pulses_buf.put_u16(pulse);
            }
        }

        b.put_u16_le(pulses_buf.len() as _);
        b.put(pulses_buf);
        b.freeze()
    }

    pub fn from_bytes(buf: Bytes) -> Result<Self, ParseError> {
        let mut buf = buf;
        if buf.remaining() < 4 {
            return Err(ParseError::Truncated);
        }

        let transport = match buf.get_u8() {
            0x26 => Transport::Ir,
            0xb2 => Transport::Rf433,
            0xd7 => Transport::Rf315,
            x => return Err(ParseError::InvalidTransport(x)),
        };

        let repeat_count = buf.get_u8();
        let data_len = buf.get_u16_le() as usize;
        if buf.remaining() < data_len {
            return Err(ParseError::Truncated);
        }
        let mut data = buf.split_to(data_len);

        let mut pulses = Vec::with_capacity(data_len);
        while data.has_remaining() {
            let mut value: u16 = data.get_u8() as u16;

            if value == 0 {
                // This indicates that the value didn't fit in a single byte and is stored as a u16_be
                if data.remaining() < 2 {
                    // Devices pad the payload with zeros
                    break;
                }
                value = data.get_u16();
            }

            pulses.push(Duration::from_broadlink(value));
        }

        if pulses.len() % 2 != 0 {
            pulses.push(TRAILING_GAP);
        }

        Ok(Recording {
            repeat_count,
            transport,
            pulses,
        })
    }
}

impl From<&PulseSequence> for Recording {
    fn from(sequence: &PulseSequence) -> Self {
        let mut pulses = sequence.as_slice().to_vec();
        if pulses.len() % 2 != 0 {
            pulses.push(TRAILING_GAP);
        }
        Recording::new_ir(pulses)
    }
}

impl From<Recording> for PulseSequence {
    fn from(recording: Recording) -> Self {
        let mut pulses = recording.pulses;
        // The trailing off time isn't part of the signal
        if pulses.len() % 2 == 0 {
            pulses.pop();
        }
        PulseSequence::new(pulses)
    }
}
