use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::{
    cache::ConfigurationCache,
    mitsubishi::{self, Configuration, DecodeError},
    modem::{Device, DeviceError},
};

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    #[error("signal not understood: {0}")]
    Decode(#[from] DecodeError),
}

impl RemoteError {
    /// Whether the error only concerns the last capture, listening can go on
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RemoteError::Decode(_) | RemoteError::Device(DeviceError::CodecError(_))
        )
    }
}

/// Drives the heat pump through an IR device, keeping the configuration cache in sync with every
/// signal sent or received.
pub struct Remote {
    device: Box<dyn Device<Error = DeviceError> + Send>,
    cache: Arc<ConfigurationCache>,
    repeat: bool,
}

impl Remote {
    pub fn new(
        device: Box<dyn Device<Error = DeviceError> + Send>,
        cache: Arc<ConfigurationCache>,
    ) -> Self {
        Self {
            device,
            cache,
            repeat: true,
        }
    }

    /// Send the frame once instead of twice like the stock remote does
    pub fn single_frame(mut self) -> Self {
        self.repeat = false;
        self
    }

    pub fn cache(&self) -> &Arc<ConfigurationCache> {
        &self.cache
    }

    pub fn current(&self) -> Option<Configuration> {
        self.cache.current()
    }

    /// Transmits a configuration, the cache is only updated once the device accepted it
    pub fn set(&mut self, configuration: Configuration) -> Result<(), RemoteError> {
        let pulses = if self.repeat {
            mitsubishi::encode_repeated(&configuration)
        } else {
            mitsubishi::encode(&configuration)
        };

        self.device.send(&pulses)?;
        info!(%configuration, "sent configuration");
        self.cache.record(configuration);
        Ok(())
    }

    /// Waits for one signal and decodes it. The cache is left alone if it can't be decoded.
    pub fn receive(&mut self) -> Result<Configuration, RemoteError> {
        let pulses = match self.device.recv() {
            Ok(pulses) => pulses,
            Err(DeviceError::CodecError(e)) => {
                warn!("dropping unreadable capture: {}", e);
                return Err(DeviceError::CodecError(e).into());
            }
            Err(e) => return Err(e.into()),
        };

        match mitsubishi::decode(&pulses) {
            Ok(configuration) => {
                info!(%configuration, "received configuration");
                self.cache.record(configuration);
                Ok(configuration)
            }
            Err(e) => {
                warn!(pulses = pulses.len(), "signal not understood: {}", e);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        io::Cursor,
        sync::{Arc, Mutex},
        time::Duration,
    };

    use super::*;
    use crate::mitsubishi::{FanSpeed, Mode, Power, Temperature};
    use crate::modem::{create_codec, CodecType, Lines};
    use crate::pulses::PulseSequence;

    #[derive(Default, Clone)]
    struct Loopback {
        sent: Arc<Mutex<Vec<PulseSequence>>>,
        incoming: Arc<Mutex<VecDeque<PulseSequence>>>,
        fail_send: bool,
    }

    impl Device for Loopback {
        type Error = DeviceError;

        fn send(&mut self, sequence: &PulseSequence) -> Result<(), DeviceError> {
            if self.fail_send {
                return Err(DeviceError::IOError(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "emitter unplugged",
                )));
            }
            self.sent.lock().unwrap().push(sequence.clone());
            Ok(())
        }

        fn recv(&mut self) -> Result<PulseSequence, DeviceError> {
            self.incoming
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(DeviceError::EOF)
        }
    }

    fn scenario() -> Configuration {
        Configuration::builder()
            .power(Power::On)
            .mode(Mode::Heat)
            .target_temperature(Temperature::new(22).unwrap())
            .fan_speed(FanSpeed::Auto)
            .build()
            .unwrap()
    }

    #[test]
    fn test_set() {
        let device = Loopback::default();
        let mut remote = Remote::new(Box::new(device.clone()), Arc::new(ConfigurationCache::new()));
        assert_eq!(remote.current(), None);

        remote.set(scenario()).unwrap();
        assert_eq!(remote.current(), Some(scenario()));

        let sent = device.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].len(), mitsubishi::REPEATED_PULSES);
        assert_eq!(mitsubishi::decode(&sent[0]), Ok(scenario()));
    }

    #[test]
    fn test_set_single() {
        let device = Loopback::default();
        let mut remote = Remote::new(Box::new(device.clone()), Arc::new(ConfigurationCache::new()))
            .single_frame();
        remote.set(scenario()).unwrap();
        assert_eq!(device.sent.lock().unwrap()[0].len(), mitsubishi::FRAME_PULSES);
    }

    #[test]
    fn test_failed_send_keeps_cache() {
        let device = Loopback {
            fail_send: true,
            ..Default::default()
        };
        let cache = Arc::new(ConfigurationCache::new());
        let mut remote = Remote::new(Box::new(device), cache.clone());

        assert!(matches!(remote.set(scenario()), Err(RemoteError::Device(_))));
        assert_eq!(cache.current(), None);
    }

    #[test]
    fn test_receive() {
        let device = Loopback::default();
        let cache = Arc::new(ConfigurationCache::new());
        let mut remote = Remote::new(Box::new(device.clone()), cache.clone());
        remote.set(scenario()).unwrap();

        let other = scenario().to_builder().mode(Mode::Cool).build().unwrap();
        let mut garbage = mitsubishi::encode(&other).into_inner();
        garbage[0] = Duration::from_micros(9000);
        {
            let mut incoming = device.incoming.lock().unwrap();
            incoming.push_back(PulseSequence::new(garbage));
            incoming.push_back(mitsubishi::encode(&other));
        }

        // Not understood, the last good state is kept
        let err = remote.receive().unwrap_err();
        assert!(matches!(
            err,
            RemoteError::Decode(DecodeError::InvalidHeader { .. })
        ));
        assert!(err.is_transient());
        assert_eq!(cache.current(), Some(scenario()));

        assert_eq!(remote.receive().unwrap(), other);
        assert_eq!(cache.current(), Some(other));

        let eof = remote.receive().unwrap_err();
        assert!(matches!(eof, RemoteError::Device(DeviceError::EOF)));
        assert!(!eof.is_transient());
    }

    #[test]
    fn test_unreadable_line() {
        let config = scenario();
        let line = create_codec(CodecType::Hex)
            .encode(&mitsubishi::encode(&config))
            .unwrap();
        let input = format!("not hex\n{}\n", line);

        let device = Lines::new(
            CodecType::Hex,
            Box::new(Cursor::new(input.into_bytes())),
            Box::new(Vec::new()),
        );
        let mut remote = Remote::new(Box::new(device), Arc::new(ConfigurationCache::new()));

        let err = remote.receive().unwrap_err();
        assert!(matches!(
            err,
            RemoteError::Device(DeviceError::CodecError(_))
        ));
        assert!(err.is_transient());
        assert_eq!(remote.current(), None);

        assert_eq!(remote.receive().unwrap(), config);
        assert_eq!(remote.current(), Some(config));
    }
}
