use bytes::Bytes;
use thiserror::Error;

use crate::{broadlink::Recording, pulses::PulseSequence};

/// Text encodings of a captured or generated signal, one signal per line
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum CodecType {
    Base64,
    Hex,
    Raw,
}

pub trait Codec {
    type Error;

    fn decode(&self, input: &str) -> Result<PulseSequence, Self::Error>;
    fn encode(&self, sequence: &PulseSequence) -> Result<String, Self::Error>;
}

pub fn create_codec(ty: CodecType) -> Box<dyn Codec<Error = CodecError> + Send> {
    match ty {
        CodecType::Base64 => Box::new(BroadlinkBase64),
        CodecType::Hex => Box::new(BroadlinkHex),
        CodecType::Raw => Box::new(Raw),
    }
}

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("failed to decode hex string: {0}")]
    HexDecodeError(#[from] hex::FromHexError),
    #[error("failed to decode base64 string: {0}")]
    Base64DecodeError(#[from] base64::DecodeError),
    #[error("failed to parse broadlink message: {0}")]
    BroadlinkParseError(#[from] crate::broadlink::ParseError),
    #[error("failed to decode raw string: {0}")]
    RawParseError(String),
    #[error("empty input")]
    EmptyInput,
}

pub struct BroadlinkHex;

impl Codec for BroadlinkHex {
    type Error = CodecError;

    fn decode(&self, input: &str) -> Result<PulseSequence, Self::Error> {
        let decoded = hex::decode(input)?;
        if decoded.is_empty() {
            return Err(CodecError::EmptyInput);
        }

        Ok(Recording::from_bytes(Bytes::from(decoded))?.into())
    }

    fn encode(&self, sequence: &PulseSequence) -> Result<String, Self::Error> {
        let encoded = Recording::from(sequence).to_bytes();
        Ok(hex::encode(&encoded))
    }
}

pub struct BroadlinkBase64;

impl Codec for BroadlinkBase64 {
    type Error = CodecError;

    fn decode(&self, input: &str) -> Result<PulseSequence, Self::Error> {
        let decoded = base64::decode(input)?;
        if decoded.is_empty() {
            return Err(CodecError::EmptyInput);
        }

        Ok(Recording::from_bytes(Bytes::from(decoded))?.into())
    }

    fn encode(&self, sequence: &PulseSequence) -> Result<String, Self::Error> {
        let encoded = Recording::from(sequence).to_bytes();
        Ok(base64::encode(&encoded))
    }
}

pub struct Raw;

impl Codec for Raw {
    type Error = CodecError;

    fn decode(&self, input: &str) -> Result<PulseSequence, Self::Error> {
        // Support IrTransmogrifier's format which looks like `Freq=38400Hz[.....][...]`
        let input = if input.starts_with("Freq=") {
            let mut parts = input.splitn(2, '[');
            parts.next();
            let untrimmed = parts
                .next()
                .ok_or_else(|| CodecError::RawParseError("missing '['".into()))?;
            untrimmed
                .split(']')
                .next()
                .ok_or_else(|| CodecError::RawParseError("missing ']'".into()))?
        } else {
            input
        };

        if input.trim().is_empty() {
            return Err(CodecError::EmptyInput);
        }

        let msg = irp::Message::parse(input)
            .or(Err(CodecError::RawParseError("invalid raw message".into())))?;
        Ok(PulseSequence::from_micros(msg.raw.into_iter().map(|t| t as u32)))
    }

    fn encode(&self, sequence: &PulseSequence) -> Result<String, Self::Error> {
        Ok(sequence.to_raw_format())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mitsubishi::{self, Configuration, Mode, Power};

    fn signal() -> (Configuration, PulseSequence) {
        let config = Configuration::builder()
            .power(Power::On)
            .mode(Mode::Dry)
            .build()
            .unwrap();
        (config, mitsubishi::encode(&config))
    }

    #[test]
    fn test_round_trip_all_codecs() {
        let (config, sequence) = signal();

        for ty in [CodecType::Base64, CodecType::Hex, CodecType::Raw] {
            let codec = create_codec(ty);
            let line = codec.encode(&sequence).unwrap();
            let decoded = codec.decode(&line).unwrap();
            assert_eq!(decoded.len(), sequence.len(), "codec {}", ty);
            assert_eq!(mitsubishi::decode(&decoded), Ok(config), "codec {}", ty);
        }
    }

    #[test]
    fn test_raw() {
        let decoded = Raw.decode("+3400 -1750 +450").unwrap();
        assert_eq!(decoded.to_micros(), vec![3400, 1750, 450]);

        let decoded = Raw.decode("Freq=38000Hz[+3400 -1750 +450][]").unwrap();
        assert_eq!(decoded.to_micros(), vec![3400, 1750, 450]);
    }

    #[test]
    fn test_empty() {
        assert!(matches!(BroadlinkHex.decode(""), Err(CodecError::EmptyInput)));
        assert!(matches!(Raw.decode("  "), Err(CodecError::EmptyInput)));
    }

    #[test]
    fn test_codec_type() {
        assert_eq!("base64".parse::<CodecType>().unwrap(), CodecType::Base64);
        assert!("pronto".parse::<CodecType>().is_err());
    }
}
