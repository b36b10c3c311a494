use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

/// Alternating mark (carrier on) and space (carrier off) durations, starting with a mark.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<u32>", into = "Vec<u32>")]
pub struct PulseSequence {
    pulses: Vec<Duration>,
}

impl PulseSequence {
    pub fn new(pulses: Vec<Duration>) -> Self {
        Self { pulses }
    }

    pub fn from_micros(pulses: impl IntoIterator<Item = u32>) -> Self {
        Self::new(
            pulses
                .into_iter()
                .map(|p| Duration::from_micros(p as _))
                .collect(),
        )
    }

    pub fn to_micros(&self) -> Vec<u32> {
        self.pulses.iter().map(|p| p.as_micros() as _).collect()
    }

    pub fn as_slice(&self) -> &[Duration] {
        &self.pulses
    }

    pub fn into_inner(self) -> Vec<Duration> {
        self.pulses
    }

    pub fn iter(&self) -> impl Iterator<Item = &Duration> {
        self.pulses.iter()
    }

    pub fn len(&self) -> usize {
        self.pulses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }

    /// `None` if the durations overflow
    pub fn total_duration(&self) -> Option<Duration> {
        self.pulses
            .iter()
            .try_fold(Duration::ZERO, |total, &pulse| total.checked_add(pulse))
    }

    /// The total duration, or `None` as soon as it goes past `limit`
    pub fn duration_within(&self, limit: Duration) -> Option<Duration> {
        self.pulses.iter().try_fold(Duration::ZERO, |total, &pulse| {
            total.checked_add(pulse).filter(|&total| total <= limit)
        })
    }

    /// Formats as `+mark -space +mark ...`, the raw format understood by irp and IrScrutinizer
    pub fn to_raw_format(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PulseSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pulse) in self.pulses.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            let sign = if i % 2 == 0 { '+' } else { '-' };
            write!(f, "{}{}", sign, pulse.as_micros())?;
        }
        Ok(())
    }
}

impl From<Vec<Duration>> for PulseSequence {
    fn from(pulses: Vec<Duration>) -> Self {
        Self::new(pulses)
    }
}

impl From<Vec<u32>> for PulseSequence {
    fn from(pulses: Vec<u32>) -> Self {
        Self::from_micros(pulses)
    }
}

impl From<PulseSequence> for Vec<u32> {
    fn from(sequence: PulseSequence) -> Self {
        sequence.to_micros()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_format() {
        let seq = PulseSequence::from_micros([3400, 1750, 450]);
        assert_eq!(seq.to_raw_format(), "+3400 -1750 +450");
        assert_eq!(seq.total_duration(), Some(Duration::from_micros(5600)));
    }

    #[test]
    fn test_duration_overflow() {
        let seq = PulseSequence::new(vec![Duration::MAX, Duration::from_micros(1)]);
        assert_eq!(seq.total_duration(), None);
        assert_eq!(seq.duration_within(Duration::from_secs(1)), None);

        let seq = PulseSequence::from_micros([3400, 1750, 450]);
        assert_eq!(
            seq.duration_within(Duration::from_micros(5600)),
            Some(Duration::from_micros(5600))
        );
        assert_eq!(seq.duration_within(Duration::from_micros(5599)), None);
    }

    #[test]
    fn test_json() {
        let seq = PulseSequence::from_micros([450, 420, 440]);
        let json = serde_json::to_string(&seq).unwrap();
        assert_eq!(json, "[450,420,440]");
        let back: PulseSequence = serde_json::from_str(&json).unwrap();
        assert_eq!(back, seq);
    }
}
