//! Main entry point for salatr.
//!
//! Parses the command line, configures logging, and dispatches to the
//! `status` or `watch` command on a tokio runtime.

use anyhow::Result;

use salatr::args::{self, CliAction, ParsedArgs};
use salatr::commands;
use salatr::common::constants::EXIT_FAILURE;
use salatr::common::logger::Log;
use salatr::config;
use salatr::{log_critical, log_end, log_pipe};

#[tokio::main]
async fn main() -> Result<()> {
    let parsed_args = ParsedArgs::from_env();

    let result = match parsed_args.action {
        CliAction::ShowVersion => {
            args::display_version_info();
            Ok(())
        }
        CliAction::ShowHelp => {
            args::display_help();
            Ok(())
        }
        CliAction::ShowHelpDueToError => {
            args::display_help();
            std::process::exit(EXIT_FAILURE);
        }
        CliAction::Status {
            debug_enabled,
            json,
            config_dir,
        } => {
            Log::set_debug(debug_enabled);
            config::set_config_dir(config_dir)?;
            commands::status::handle_status_command(json).await
        }
        CliAction::Watch {
            debug_enabled,
            log_file,
            config_dir,
        } => {
            Log::set_debug(debug_enabled);
            config::set_config_dir(config_dir)?;
            commands::watch::handle_watch_command(log_file).await
        }
    };

    if let Err(e) = result {
        Log::set_enabled(true);
        log_pipe!();
        log_critical!("{e:#}");
        log_end!();
        std::process::exit(EXIT_FAILURE);
    }

    Ok(())
}
