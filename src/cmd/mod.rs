use std::io::Write;

use anyhow::{Context, Result};
use clap::{arg, value_parser, AppSettings, ArgAction, Command};
use log::{info, warn};
use rover::{config::Config, BluezRadio, DeviceDescriptor, ListenEnd, SerialSession};
use tokio::sync::oneshot;

mod cat;
mod devices;
mod drive;
mod send;
mod status;

pub struct CmdData {
    config: Config,
    session: SerialSession<BluezRadio>,
}

impl CmdData {
    /// `wanted` comes from a subcommand's own argument and takes precedence
    /// over the configured device.
    async fn device(&self, wanted: Option<&str>) -> Result<DeviceDescriptor> {
        let wanted = wanted
            .or(self.config.device.as_deref())
            .context("no device given, pass --device or set `device` in the config")?;
        let bonded = self.session.list_bonded_devices().await;
        Ok(pick_device(bonded, wanted))
    }

    async fn connect(&mut self, wanted: Option<&str>) -> Result<DeviceDescriptor> {
        let device = self.device(wanted).await?;
        self.session
            .connect(&device)
            .await
            .with_context(|| format!("failed to connect to {}", device))?;
        Ok(device)
    }
}

/// Finds `wanted` among the bonded devices by address or name. An unknown
/// value is still tried as an address.
fn pick_device(
    bonded: impl IntoIterator<Item = DeviceDescriptor>,
    wanted: &str,
) -> DeviceDescriptor {
    if let Some(x) = bonded.into_iter().find(|x| x.matches(wanted)) {
        return x;
    }
    warn!("`{}` is not a bonded device, trying it as an address", wanted);
    DeviceDescriptor::new(wanted, None)
}

/// Writes a received chunk to stdout as text.
fn print_chunk(chunk: &[u8]) {
    let mut out = std::io::stdout().lock();
    out.write_all(String::from_utf8_lossy(chunk).as_bytes()).ok();
    out.flush().ok();
}

async fn wait_end(device: &DeviceDescriptor, end: &mut oneshot::Receiver<ListenEnd>) {
    match end.await {
        Ok(ListenEnd::Failed(e)) => warn!("connection to {} failed: {}", device, e),
        Ok(ListenEnd::Eof) => info!("{} closed the connection", device),
        Ok(ListenEnd::Cancelled) | Err(_) => {}
    }
}

pub async fn run() -> Result<()> {
    let matches = Command::new("rover")
        .version("0.1")
        .about("Drive a car over a bluetooth serial port")
        .arg(
            arg!(
            -v --verbose "Enable verbose output"
            )
            .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(
                -c --config <PATH> "Read settings from a json file"
            )
            .required(false),
        )
        .arg(
            arg!(
                -a --adapter <NAME> "Bluetooth adapter to use"
            )
            .required(false),
        )
        .arg(
            arg!(
                --channel <CHANNEL> "Connect on a fixed rfcomm channel instead of looking up the serial port service"
            )
            .required(false)
            .value_parser(value_parser!(u8)),
        )
        .arg(
            arg!(
                -d --device <DEVICE> "Address or name of a bonded device"
            )
            .required(false),
        )
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(status::subcmd())
        .subcommand(devices::subcmd())
        .subcommand(send::subcmd())
        .subcommand(cat::subcmd())
        .subcommand(drive::subcmd())
        .get_matches();

    let verbose = matches.get_one::<bool>("verbose").copied().unwrap_or(false);
    env_logger::init_from_env(env_logger::Env::default().filter_or(
        env_logger::DEFAULT_FILTER_ENV,
        if verbose { "debug" } else { "info" },
    ));

    let file = match matches.get_one::<String>("config") {
        Some(path) => Config::load(path).await?,
        None => Config::default(),
    };
    let config = file.merge(Config {
        adapter: matches.get_one::<String>("adapter").cloned(),
        channel: matches.get_one::<u8>("channel").copied(),
        device: matches.get_one::<String>("device").cloned(),
    });

    let radio = BluezRadio::new(config.adapter.as_deref(), config.channel).await;
    let mut data = CmdData {
        config,
        session: SerialSession::new(radio),
    };

    match matches.subcommand() {
        Some(("status", m)) => status::cmd(&mut data, m).await,
        Some(("devices", m)) => devices::cmd(&mut data, m).await,
        Some(("send", m)) => send::cmd(&mut data, m).await,
        Some(("cat", m)) => cat::cmd(&mut data, m).await,
        Some(("drive", m)) => drive::cmd(&mut data, m).await,
        _ => unreachable!(),
    }
}
