use anyhow::{Context, Result};
use clap::{arg, ArgMatches, Command};
use log::{debug, error, info};
use rover::drive::{self, Drive};
use tokio::io::{AsyncBufReadExt, BufReader};

pub fn subcmd<'help>() -> Command<'help> {
    Command::new("drive")
        .about(
            "steer the car from stdin: f, l, s, r, b (or forward, left, ...), other lines are sent as text",
        )
        .arg(arg!([DEVICE] "address or name of the device, overrides --device"))
}

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Skip,
    Quit,
    Send(Vec<u8>),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Skip;
    }
    if line == "quit" {
        return Input::Quit;
    }
    match line.parse::<Drive>() {
        Ok(cmd) => {
            debug!("drive {cmd}");
            Input::Send(cmd.to_line())
        }
        Err(_) => Input::Send(drive::line(line)),
    }
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

    info!("connected to {device}, enter commands or `quit`");

    let mut res = Ok(());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = super::wait_end(&device, &mut end) => break,
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(x)) => x,
                    Ok(None) => break,
                    Err(e) => {
                        res = Err(e).context("failed to read stdin");
                        break;
                    }
                };
                let bytes = match parse_input(&line) {
                    Input::Skip => continue,
                    Input::Quit => break,
                    Input::Send(x) => x,
                };
                if let Err(e) = data.session.send(&bytes).await {
                    error!("failed to send to {device}: {e}");
                    break;
                }
            }
        }
    }

    data.session.close().await;
    res
}
