use anyhow::{anyhow, Context, Result};
use clap::{App, AppSettings, SubCommand};
use env_logger::Env;
use log::error;
use pressroom::build::build_site;
use pressroom::config::Config;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let matches = App::new("pressroom")
        .about("Builds a static blog from Markdown content")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(SubCommand::with_name("build").about("Builds the site into `dist/`"))
        .get_matches();

    let result = match matches.subcommand() {
        ("build", _) => build(),
        (name, _) => Err(anyhow!("Unknown command `{}`", name)),
    };

    if let Err(err) = result {
        error!("{:#}", err);
        std::process::exit(1);
    }
}

fn build() -> Result<()> {
    let cwd = std::env::current_dir().context("Reading the current directory")?;
    let config = Config::from_directory(&cwd)?;
    build_site(&config).context("Building site")?;
    Ok(())
}
