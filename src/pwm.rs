//! An IR pulse-distance encoder/decoder with configurable mark/space timings
use std::{fmt::Debug, time::Duration};

use strum::IntoEnumIterator;
use thiserror::Error;

/// Reference timing of a single mark/space pair
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Rule {
    pub mark: Duration,
    pub space: Duration,
    pub tolerance: Duration,
}

impl Rule {
    pub fn new(mark: Duration, space: Duration) -> Self {
        // Use a 20% tolerance of the shortest component by default
        Self {
            mark,
            space,
            tolerance: mark.min(space) / 5,
        }
    }

    pub fn with_tolerance(self, tolerance: Duration) -> Self {
        Self { tolerance, ..self }
    }

    pub fn period(&self) -> Duration {
        self.mark + self.space
    }

    /// Whether both components are within tolerance of the reference
    pub fn matches(&self, mark: Duration, space: Duration) -> bool {
        within(self.mark, mark, self.tolerance) && within(self.space, space, self.tolerance)
    }

    fn distance(&self, mark: Duration, space: Duration) -> Duration {
        abs_diff(self.period(), mark + space)
    }
}

pub fn within(reference: Duration, actual: Duration, tolerance: Duration) -> bool {
    abs_diff(reference, actual) <= tolerance
}

fn abs_diff(a: Duration, b: Duration) -> Duration {
    a.checked_sub(b).unwrap_or_else(|| b - a)
}

#[derive(Error, Debug, Copy, Clone)]
pub enum CodecError {
    #[error("the pulse list was missing a space after the last mark")]
    MissingSpace,
}

/// Maps symbols to mark/space pairs and back.
///
/// Decoding picks the symbol whose reference period is nearest to the captured pair, so a pair is
/// classified by which side of the midpoint between two adjacent references it falls on.
pub struct Codec<T> {
    rule: fn(T) -> Rule,
    sorted_rules: Vec<(T, Rule)>,
}

impl<T: IntoEnumIterator + Copy + Debug> Codec<T> {
    pub fn new(rule: fn(T) -> Rule) -> Self {
        let mut sorted_rules: Vec<_> = T::iter().map(|symbol| (symbol, rule(symbol))).collect();
        sorted_rules.sort_by_key(|(_, r)| r.period());

        Self { rule, sorted_rules }
    }

    pub fn rule(&self, symbol: T) -> Rule {
        (self.rule)(symbol)
    }

    /// Largest deviation of a pair period that can never change its classification
    pub fn margin(&self) -> Duration {
        self.sorted_rules
            .windows(2)
            .map(|w| (w[1].1.period() - w[0].1.period()) / 2)
            .min()
            .unwrap_or(Duration::MAX)
    }

    pub fn decode(&self, pulses: &[Duration]) -> Result<Vec<T>, CodecError> {
        if pulses.len() % 2 != 0 {
            return Err(CodecError::MissingSpace);
        }

        Ok(pulses
            .chunks_exact(2)
            .filter_map(|pair| self.classify(pair[0], pair[1]))
            .collect())
    }

    /// Nearest-match classification, ties go to the shorter symbol
    pub fn classify(&self, mark: Duration, space: Duration) -> Option<T> {
        self.sorted_rules
            .iter()
            .min_by_key(|(_, r)| r.distance(mark, space))
            .map(|(symbol, _)| *symbol)
    }

    pub fn encode(&self, symbols: impl Iterator<Item = T>, out: &mut Vec<Duration>) {
        for symbol in symbols {
            let rule = self.rule(symbol);
            out.push(rule.mark);
            out.push(rule.space);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::EnumIter;

    #[derive(Debug, Clone, Copy, Eq, PartialEq, EnumIter)]
    enum Pulse {
        Long,
        Short,
    }

    fn get_codec() -> Codec<Pulse> {
        Codec::new(|p| match p {
            Pulse::Short => Rule::new(Duration::from_micros(100), Duration::from_micros(100)),
            Pulse::Long => Rule::new(Duration::from_micros(100), Duration::from_micros(500)),
        })
    }

    #[test]
    fn test_decode() {
        let pulses = [100, 500, 100, 100, 90, 330, 80, 280].map(Duration::from_micros);
        let decoded = get_codec().decode(&pulses).unwrap();
        assert_eq!(
            decoded,
            vec![Pulse::Long, Pulse::Short, Pulse::Long, Pulse::Short]
        );
    }

    #[test]
    fn test_decode_odd() {
        let pulses = [100, 500, 100].map(Duration::from_micros);
        assert!(matches!(
            get_codec().decode(&pulses),
            Err(CodecError::MissingSpace)
        ));
    }

    #[test]
    fn test_encode() {
        let mut encoded = Vec::new();
        get_codec().encode([Pulse::Short, Pulse::Long].into_iter(), &mut encoded);
        assert_eq!(encoded, [100, 100, 100, 500].map(Duration::from_micros));
    }

    #[test]
    fn test_margin() {
        assert_eq!(get_codec().margin(), Duration::from_micros(200));
    }

    #[test]
    fn test_rule_matches() {
        let rule = Rule::new(Duration::from_micros(3400), Duration::from_micros(1750))
            .with_tolerance(Duration::from_micros(600));
        assert!(rule.matches(Duration::from_micros(3950), Duration::from_micros(1200)));
        assert!(!rule.matches(Duration::from_micros(450), Duration::from_micros(1750)));
    }
}
