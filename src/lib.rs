use std::process::ExitCode;

use clap::Parser;

mod command;
mod config;
pub mod mpd;

pub use command::{Cli, Command};
pub use config::ClientConfig;

pub fn run() -> ExitCode {
  let cli = Cli::parse();

  // Setup logging; RUST_LOG takes precedence over --verbose
  let level = if cli.verbose { "debug" } else { "info" };
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
    .format_timestamp_millis()
    .init();

  let config = match cli.config() {
    Ok(config) => config,
    Err(e) => {
      log::error!("Invalid configuration: {}", e);
      return ExitCode::FAILURE;
    }
  };

  if cli.save_config {
    if let Err(e) = config.save() {
      log::error!("Failed to save config: {}", e);
    }
  }

  let runtime = match tokio::runtime::Runtime::new() {
    Ok(runtime) => runtime,
    Err(e) => {
      log::error!("Failed to start runtime: {}", e);
      return ExitCode::FAILURE;
    }
  };

  match runtime.block_on(command::execute(&config, cli.command)) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      log::error!("{}", e);
      ExitCode::FAILURE
    }
  }
}
