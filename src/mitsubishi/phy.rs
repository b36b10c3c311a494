use std::time::Duration;

use strum::EnumIter;
use tracing::trace;

use super::DecodeError;
use crate::pulses::PulseSequence;
use crate::pwm::{self, Codec, Rule};

/// Bytes in a frame, checksum included
pub const FRAME_LEN: usize = 18;

pub const HEADER_MARK: Duration = Duration::from_micros(3400);
pub const HEADER_SPACE: Duration = Duration::from_micros(1750);
pub const BIT_MARK: Duration = Duration::from_micros(450);
pub const ONE_SPACE: Duration = Duration::from_micros(1300);
pub const ZERO_SPACE: Duration = Duration::from_micros(420);
pub const STOP_MARK: Duration = Duration::from_micros(440);
pub const REPEAT_SPACE: Duration = Duration::from_micros(17100);

/// Drift accepted on any single mark or space of a bit
pub const BIT_TOLERANCE: Duration = Duration::from_micros(200);
/// Drift accepted on the header and the repeat gap
pub const HEADER_TOLERANCE: Duration = Duration::from_micros(600);

/// Header pair, one pair per bit, stop mark
pub const FRAME_PULSES: usize = 2 + FRAME_LEN * 8 * 2 + 1;
/// Two frames separated by the repeat space
pub const REPEATED_PULSES: usize = 2 * FRAME_PULSES + 1;
/// Longest capture worth looking at, a repeated all-ones frame is ~0.54s
pub const MAX_DURATION: Duration = Duration::from_millis(700);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, EnumIter)]
pub enum Bit {
    Zero,
    One,
}

/// Frame-sized slices of a capture
#[derive(Debug, PartialEq, Eq)]
pub enum Capture<'a> {
    /// A single frame, or both copies of a repeated one
    Copies(Vec<&'a [Duration]>),
    /// Windows starting at every header-like mark, the first one that decodes wins
    Candidates(Vec<&'a [Duration]>),
}

pub struct Phy {
    bits: Codec<Bit>,
    header: Rule,
}

impl Default for Phy {
    fn default() -> Self {
        Self::new()
    }
}

impl Phy {
    pub fn new() -> Self {
        let bits = Codec::new(|bit| match bit {
            Bit::Zero => Rule::new(BIT_MARK, ZERO_SPACE).with_tolerance(BIT_TOLERANCE),
            Bit::One => Rule::new(BIT_MARK, ONE_SPACE).with_tolerance(BIT_TOLERANCE),
        });
        let header = Rule::new(HEADER_MARK, HEADER_SPACE).with_tolerance(HEADER_TOLERANCE);

        Self { bits, header }
    }

    pub fn encode(&self, frame: &[u8; FRAME_LEN]) -> PulseSequence {
        let mut pulses = Vec::with_capacity(FRAME_PULSES);
        self.append_frame(frame, &mut pulses);
        PulseSequence::new(pulses)
    }

    pub fn encode_repeated(&self, frame: &[u8; FRAME_LEN]) -> PulseSequence {
        let mut pulses = Vec::with_capacity(REPEATED_PULSES);
        self.append_frame(frame, &mut pulses);
        pulses.push(REPEAT_SPACE);
        self.append_frame(frame, &mut pulses);
        PulseSequence::new(pulses)
    }

    /// Bytes are sent in order, each one least significant bit first
    fn append_frame(&self, frame: &[u8; FRAME_LEN], pulses: &mut Vec<Duration>) {
        pulses.push(HEADER_MARK);
        pulses.push(HEADER_SPACE);

        let bits = frame.iter().flat_map(|&byte| {
            (0..8).map(move |bit| match byte & (1 << bit) != 0 {
                true => Bit::One,
                false => Bit::Zero,
            })
        });
        self.bits.encode(bits, pulses);

        pulses.push(STOP_MARK);
    }

    /// Validates the overall shape of a capture and lays out the frames it may hold
    pub fn split<'a>(&self, sequence: &'a PulseSequence) -> Result<Capture<'a>, DecodeError> {
        let pulses = sequence.as_slice();

        if pulses.len() % 2 == 0 {
            return Err(DecodeError::MalformedSequence(
                "sequence must start and end with a mark",
            ));
        }
        if pulses.len() < FRAME_PULSES {
            return Err(DecodeError::MalformedSequence("sequence is too short"));
        }
        if sequence.duration_within(MAX_DURATION).is_none() {
            return Err(DecodeError::MalformedSequence("sequence lasts too long"));
        }

        if pulses.len() == FRAME_PULSES {
            return Ok(Capture::Copies(vec![pulses]));
        }

        if pulses.len() == REPEATED_PULSES
            && pwm::within(REPEAT_SPACE, pulses[FRAME_PULSES], HEADER_TOLERANCE)
        {
            return Ok(Capture::Copies(vec![
                &pulses[..FRAME_PULSES],
                &pulses[FRAME_PULSES + 1..],
            ]));
        }

        // Receivers flush whatever they grabbed on timeout, noise included
        let candidates: Vec<_> = (0..=pulses.len() - FRAME_PULSES)
            .step_by(2)
            .filter(|&i| pwm::within(HEADER_MARK, pulses[i], HEADER_TOLERANCE))
            .map(|i| &pulses[i..i + FRAME_PULSES])
            .collect();

        if candidates.is_empty() {
            // Nothing looks like a header, report on the capture as a whole
            return Ok(Capture::Copies(vec![pulses]));
        }
        trace!("{} frame candidates in a {} pulse capture", candidates.len(), pulses.len());
        Ok(Capture::Candidates(candidates))
    }

    /// Decodes a single frame: header pair, bit pairs, stop mark
    pub fn decode_frame(&self, pulses: &[Duration]) -> Result<[u8; FRAME_LEN], DecodeError> {
        if pulses.len() < 3 {
            return Err(DecodeError::MalformedSequence("sequence is too short"));
        }

        let (mark, space) = (pulses[0], pulses[1]);
        if !self.header.matches(mark, space) {
            return Err(DecodeError::InvalidHeader {
                mark: mark.as_micros(),
                space: space.as_micros(),
            });
        }

        let body = &pulses[2..pulses.len() - 1];
        if body.len() != FRAME_LEN * 8 * 2 {
            return Err(DecodeError::IncompleteFrame {
                bits: body.len() / 2,
            });
        }

        let bits = self
            .bits
            .decode(body)
            .map_err(|_| DecodeError::MalformedSequence("missing space"))?;
        if bits.len() != FRAME_LEN * 8 {
            return Err(DecodeError::IncompleteFrame { bits: bits.len() });
        }

        let mut frame = [0u8; FRAME_LEN];
        for (i, bit) in bits.into_iter().enumerate() {
            if bit == Bit::One {
                frame[i / 8] |= 1 << (i % 8);
            }
        }

        trace!("decoded frame {}", hex::encode(frame));
        Ok(frame)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const FRAME: [u8; FRAME_LEN] = hex_literal::hex!("23cb260100200805304554000000000000 0b");

    #[test]
    fn test_encode_layout() {
        let pulses = Phy::new().encode(&FRAME);
        let pulses = pulses.as_slice();
        assert_eq!(pulses.len(), FRAME_PULSES);
        assert_eq!(pulses[..2], [HEADER_MARK, HEADER_SPACE]);
        // 0x23, least significant bit first: 1, 1, 0, 0
        assert_eq!(
            pulses[2..10],
            [BIT_MARK, ONE_SPACE, BIT_MARK, ONE_SPACE, BIT_MARK, ZERO_SPACE, BIT_MARK, ZERO_SPACE]
        );
        assert_eq!(pulses[FRAME_PULSES - 1], STOP_MARK);
    }

    #[test]
    fn test_decode() {
        let phy = Phy::new();
        let pulses = phy.encode(&FRAME);
        assert_eq!(phy.decode_frame(pulses.as_slice()).unwrap(), FRAME);
    }

    #[test]
    fn test_decode_capture() {
        // Timings as a LIRC receiver reports them, every duration is off by a few dozen micros
        let pulses: Vec<u32> = Phy::new()
            .encode(&FRAME)
            .to_micros()
            .into_iter()
            .enumerate()
            .map(|(i, d)| match i % 3 {
                0 => d + 63,
                1 => d - 41,
                _ => d + 17,
            })
            .collect();
        let capture = PulseSequence::from_micros(pulses);
        assert_eq!(Phy::new().decode_frame(capture.as_slice()).unwrap(), FRAME);
    }

    #[test]
    fn test_split() {
        let phy = Phy::new();
        let single = phy.encode(&FRAME);
        assert_eq!(
            phy.split(&single).unwrap(),
            Capture::Copies(vec![single.as_slice()])
        );

        let repeated = phy.encode_repeated(&FRAME);
        assert_eq!(repeated.len(), REPEATED_PULSES);
        assert_eq!(
            phy.split(&repeated).unwrap(),
            Capture::Copies(vec![single.as_slice(), single.as_slice()])
        );
    }

    #[test]
    fn test_split_candidates() {
        let phy = Phy::new();
        let frame = phy.encode(&FRAME).into_inner();

        // Noise on both sides, a 3.2ms mark among it
        let mut pulses = [3200, 900, 600, 300].map(Duration::from_micros).to_vec();
        pulses.extend(frame.iter().copied());
        pulses.extend([5000, 450].map(Duration::from_micros));
        let capture = PulseSequence::new(pulses);

        match phy.split(&capture).unwrap() {
            Capture::Candidates(windows) => {
                assert_eq!(windows.len(), 2);
                assert_eq!(windows[0][..2], capture.as_slice()[..2]);
                assert_eq!(windows[1], frame.as_slice());
            }
            other => panic!("expected candidates, got {:?}", other),
        }
    }

    #[test]
    fn test_split_limits() {
        let phy = Phy::new();

        // Past the repeated length is fine as long as the duration is
        let mut pulses = phy.encode_repeated(&FRAME).into_inner();
        pulses.extend([600, 450].map(Duration::from_micros));
        assert!(matches!(
            phy.split(&PulseSequence::new(pulses)),
            Ok(Capture::Candidates(_))
        ));

        let overflowing = PulseSequence::new(vec![Duration::MAX; FRAME_PULSES]);
        assert_eq!(
            phy.split(&overflowing),
            Err(DecodeError::MalformedSequence("sequence lasts too long"))
        );
    }

    #[test]
    fn test_incomplete_frame() {
        // Two extra pulses in the middle of the frame
        let mut pulses = Phy::new().encode(&FRAME).into_inner();
        pulses.insert(10, ZERO_SPACE);
        pulses.insert(10, BIT_MARK);
        assert_eq!(
            Phy::new().decode_frame(&pulses),
            Err(DecodeError::IncompleteFrame { bits: 145 })
        );
    }
}
