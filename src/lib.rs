pub mod broadlink;
pub mod cache;
pub mod mitsubishi;
pub mod modem;
pub mod pulses;
pub mod pwm;
pub mod remote;

pub use cache::ConfigurationCache;
pub use mitsubishi::{decode, encode, encode_repeated, Configuration, DecodeError};
pub use pulses::PulseSequence;
pub use remote::{Remote, RemoteError};
