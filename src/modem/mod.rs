/*

IR transceivers
---------------

Devices/Broadlink/Base64/Hex/Raw/LIRC <> PulseSequence

PulseSequence -> mitsubishi::decode -> Configuration

Configuration -> mitsubishi::encode -> PulseSequence -> ...


Device strings (CLI `--device`):

# One encoded signal per line on stdin/stdout
lines:base64, lines:hex, lines:raw

# A LIRC character device
lirc:/dev/lirc0

*/

pub mod codecs;
pub use codecs::{create_codec, Codec, CodecError, CodecType};

pub mod devices;
pub use devices::{create_device, Device, DeviceError, DeviceType, Lines, Lirc};
