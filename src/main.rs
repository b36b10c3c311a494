use std::{
    io::{self, Write},
    sync::Arc,
};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use mitsubishi_heatpump::{
    mitsubishi::{
        Configuration, FanSpeed, Mode, Power, Temperature, TimeOfDay, Timer, VaneHorizontal,
        VaneVertical,
    },
    modem::{create_device, DeviceError, DeviceType},
    ConfigurationCache, Remote, RemoteError,
};

mod logging;
use logging::{init_logging, LogFormat, LogLevel};

#[derive(Parser, Debug)]
#[command(version, about = "Mitsubishi heat pump IR remote")]
struct Cli {
    #[arg(long, global = true, value_enum, default_value = "info", env = "HEATPUMP_LOG_LEVEL")]
    log_level: LogLevel,

    #[arg(long, global = true, value_enum, default_value = "text", env = "HEATPUMP_LOG_FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a configuration to the heat pump
    Encode {
        /// lines:<base64|hex|raw> or lirc:<path>
        #[arg(long, env = "HEATPUMP_DEVICE")]
        device: DeviceType,

        /// Send the frame once instead of twice
        #[arg(long)]
        single: bool,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Listen for signals and print every configuration understood
    Decode {
        #[arg(long, env = "HEATPUMP_DEVICE")]
        device: DeviceType,
    },
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[arg(long, default_value = "on")]
    power: Power,

    #[arg(long, default_value = "auto")]
    mode: Mode,

    /// Whole degrees Celsius, 16 to 31
    #[arg(long, default_value_t = 20)]
    temperature: u8,

    #[arg(long, default_value = "auto")]
    fan: FanSpeed,

    #[arg(long, default_value = "auto")]
    vane: VaneVertical,

    #[arg(long, default_value = "middle")]
    wide_vane: VaneHorizontal,

    #[arg(long)]
    isee: bool,

    #[arg(long)]
    econo_cool: bool,

    #[arg(long)]
    long_mode: bool,

    #[arg(long)]
    clean: bool,

    #[arg(long)]
    plasma: bool,

    /// Turn on at HH:MM
    #[arg(long)]
    start: Option<TimeOfDay>,

    /// Turn off at HH:MM
    #[arg(long)]
    end: Option<TimeOfDay>,

    /// HH:MM, or "now" for the local time
    #[arg(long, default_value = "now")]
    clock: String,
}

impl ConfigArgs {
    fn build(self) -> anyhow::Result<Configuration> {
        let clock = match self.clock.as_str() {
            "now" => TimeOfDay::from(&chrono::Local::now()),
            s => s.parse::<TimeOfDay>().context("invalid --clock")?,
        };

        let configuration = Configuration::builder()
            .power(self.power)
            .mode(self.mode)
            .target_temperature(Temperature::new(self.temperature)?)
            .fan_speed(self.fan)
            .vane_vertical(self.vane)
            .vane_horizontal(self.wide_vane)
            .isee(self.isee)
            .econo_cool(self.econo_cool)
            .long_mode(self.long_mode)
            .clean(self.clean)
            .plasma(self.plasma)
            .timer(Timer {
                clock,
                start: self.start,
                end: self.end,
            })
            .build()?;
        Ok(configuration)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let cache = Arc::new(ConfigurationCache::new());

    match cli.command {
        Command::Encode {
            device,
            single,
            config,
        } => {
            let configuration = config.build()?;
            debug!(?device, "opening device");
            let mut remote = Remote::new(create_device(device)?, cache.clone());
            if single {
                remote = remote.single_frame();
            }

            remote.set(configuration)?;
            // stdout may be the device itself
            if let Some(snapshot) = cache.snapshot() {
                eprintln!("{}", serde_json::to_string_pretty(&snapshot)?);
            }
        }
        Command::Decode { device } => {
            let mut remote = Remote::new(create_device(device)?, cache);
            let stdout = io::stdout();
            loop {
                match remote.receive() {
                    Ok(configuration) => {
                        let mut out = stdout.lock();
                        writeln!(out, "{}", serde_json::to_string(&configuration)?)?;
                        out.flush()?;
                    }
                    Err(RemoteError::Device(DeviceError::EOF)) => break,
                    // Already logged, keep listening
                    Err(e) if e.is_transient() => continue,
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }

    Ok(())
}
