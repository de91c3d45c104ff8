use anyhow::{Context, Result};
use clap::{arg, ArgAction, ArgMatches, Command};
use rover::drive;

pub fn subcmd<'help>() -> Command<'help> {
    Command::new("send")
        .about("send one line of text to the device")
        .arg(arg!(-r --raw "do not append a line terminator").action(ArgAction::SetTrue))
        .arg(arg!(<TEXT> "text to send").multiple_values(true))
}

pub async fn cmd(data: &mut super::CmdData, m: &ArgMatches) -> Result<()> {
    let raw = m.get_one::<bool>("raw").copied().unwrap_or(false);
    let text = m
        .get_many::<String>("TEXT")
        .map(|x| x.map(String::as_str).collect::<Vec<_>>().join(" "))
        .unwrap_or_default();

    let bytes = if raw {
        text.into_bytes()
    } else {
        drive::line(&text)
    };

    let device = data.connect(None).await?;
    let res = data
        .session
        .send(&bytes)
        .await
        .with_context(|| format!("failed to send to {}", device));
    data.session.close().await;
    res
}
