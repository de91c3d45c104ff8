use anyhow::Result;
use clap::{ArgMatches, Command};

pub fn subcmd<'help>() -> Command<'help> {
    Command::new("status").about("show whether bluetooth is available and powered")
}

pub async fn cmd(data: &mut super::CmdData, _: &ArgMatches) -> Result<()> {
    println!("bluetooth supported: {}", data.session.is_supported().await);
    println!("bluetooth enabled: {}", data.session.is_enabled().await);
    Ok(())
}
