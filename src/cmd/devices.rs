use anyhow::{bail, Result};
use clap::{ArgMatches, Command};
use log::info;

pub fn subcmd<'help>() -> Command<'help> {
    Command::new("devices").about("list bonded devices")
}

pub async fn cmd(data: &mut super::CmdData, _: &ArgMatches) -> Result<()> {
    if !data.session.is_supported().await {
        bail!("bluetooth is not available")
    }

    let devices = data.session.list_bonded_devices().await;
    if devices.is_empty() {
        info!("no bonded devices, pair the car first");
    }
    for device in devices {
        println!(
            "{}\t{}",
            device.name.as_deref().unwrap_or("unknown device"),
            device.address
        );
    }
    Ok(())
}
