use anyhow::{Context, Result};
use clap::{arg, ArgMatches, Command};
use log::info;

pub fn subcmd<'help>() -> Command<'help> {
    Command::new("cat")
        .about("print text received from the device")
        .arg(arg!([DEVICE] "address or name of the device, overrides --device"))
}

pub async fn cmd(data: &mut super::CmdData, m: &ArgMatches) -> Result<()> {
    let device = data
        .connect(m.get_one::<String>("DEVICE").map(String::as_str))
        .await?;
    let mut end = data
        .session
        .start_listening(super::print_chunk)
        .await
        .context("failed to listen to device")?;

    tokio::select! {
        _ = super::wait_end(&device, &mut end) => {}
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }

    data.session.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_argument() {
        let m = subcmd()
            .try_get_matches_from(["cat", "98:D3:31:F5:2A:11"])
            .unwrap();
        assert_eq!(
            m.get_one::<String>("DEVICE").map(String::as_str),
            Some("98:D3:31:F5:2A:11")
        );
        assert!(subcmd().try_get_matches_from(["cat", "a", "b"]).is_err());
    }
}
