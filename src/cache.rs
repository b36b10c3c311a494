use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::mitsubishi::Configuration;

/// The last known configuration and when it was learned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub configuration: Configuration,
    pub updated_at: DateTime<Utc>,
}

/// Holds the configuration the heat pump is presumed to be in.
///
/// The unit can't be queried, so this is updated with every signal that goes through the IR link,
/// sent or received. It is advisory only: a remote out of range of the receiver can still change
/// the unit.
///
/// Share it with `Arc`, a single lock guards the snapshot so readers never see a partial update.
#[derive(Debug, Default)]
pub struct ConfigurationCache {
    state: RwLock<Option<Snapshot>>,
}

impl ConfigurationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the cached configuration unconditionally
    pub fn record(&self, configuration: Configuration) {
        let snapshot = Snapshot {
            configuration,
            updated_at: Utc::now(),
        };
        debug!(%configuration, "recording configuration");
        *self.state.write() = Some(snapshot);
    }

    pub fn current(&self) -> Option<Configuration> {
        self.state.read().map(|s| s.configuration)
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.state.read().map(|s| s.updated_at)
    }

    pub fn snapshot(&self) -> Option<Snapshot> {
        *self.state.read()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;
    use crate::mitsubishi::{FanSpeed, Mode, Power, Temperature};

    fn config(mode: Mode, temperature: u8) -> Configuration {
        Configuration::builder()
            .power(Power::On)
            .mode(mode)
            .target_temperature(Temperature::new(temperature).unwrap())
            .fan_speed(FanSpeed::Auto)
            .build()
            .unwrap()
    }

    #[test]
    fn test_empty() {
        let cache = ConfigurationCache::new();
        assert_eq!(cache.current(), None);
        assert_eq!(cache.last_updated(), None);
        assert_eq!(cache.snapshot(), None);
    }

    #[test]
    fn test_last_record_wins() {
        let cache = ConfigurationCache::new();
        let c1 = config(Mode::Heat, 22);
        let c2 = config(Mode::Cool, 18);

        cache.record(c1);
        assert_eq!(cache.current(), Some(c1));
        let first = cache.last_updated().unwrap();

        cache.record(c2);
        assert_eq!(cache.current(), Some(c2));
        assert!(cache.last_updated().unwrap() >= first);
    }

    #[test]
    fn test_concurrent() {
        let cache = Arc::new(ConfigurationCache::new());
        let configs: Vec<_> = (16..=31).map(|t| config(Mode::Heat, t)).collect();

        let handles: Vec<_> = configs
            .iter()
            .copied()
            .map(|c| {
                let cache = cache.clone();
                thread::spawn(move || cache.record(c))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let current = cache.current().unwrap();
        assert!(configs.contains(&current));
    }
}
