use std::{fs, path::Path};

use tracing::debug;

use crate::{
    config::{Cli, Command, CommonArgs, Config},
    error::Result,
};

pub mod heatmap;
pub mod line;
pub mod merge;

pub fn run(cli: Cli) -> Result<()> {
    let common = match &cli.command {
        Command::Line(args) => &args.common,
        Command::Merge(args) => &args.common,
        Command::Heatmap(args) => &args.common,
    };
    let Some(config) = load_config(common)? else {
        return Ok(());
    };

    match &cli.command {
        Command::Line(args) => line::run(args, &config),
        Command::Merge(args) => merge::run(args, &config),
        Command::Heatmap(args) => heatmap::run(args, &config),
    }
}

/// `None` when the configuration was only to be printed.
fn load_config(common: &CommonArgs) -> Result<Option<Config>> {
    let config = Config::load(common.config_file.as_deref())?;
    debug!("Configuration: {:?}", config);
    if common.print_config {
        print!("{}", config.to_toml()?);
        return Ok(None);
    }
    Ok(Some(config))
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => Ok(fs::create_dir_all(dir)?),
        _ => Ok(()),
    }
}
