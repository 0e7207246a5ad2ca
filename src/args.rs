//! Command-line argument parsing and processing.
//!
//! Handles the `status` and `watch` subcommands plus the global help, version,
//! debug, and config directory flags. Running without a command watches.

/// Represents the parsed command-line arguments and their intended actions.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Print the current prayer period once and exit
    Status {
        debug_enabled: bool,
        json: bool,
        config_dir: Option<String>,
    },
    /// Run the scheduler until interrupted, logging every update
    Watch {
        debug_enabled: bool,
        log_file: Option<String>,
        config_dir: Option<String>,
    },

    /// Display help information and exit
    ShowHelp,
    /// Display version information and exit
    ShowVersion,
    /// Show help due to unknown arguments and exit
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

impl ParsedArgs {
    /// Parse command-line arguments into a structured result.
    ///
    /// # Arguments
    /// * `args` - Iterator over command-line arguments (typically from std::env::args())
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut debug_enabled = false;
        let mut display_help = false;
        let mut display_version = false;
        let mut unknown_arg_found = false;
        let mut config_dir: Option<String> = None;
        let mut log_file: Option<String> = None;
        let mut json = false;
        let mut command: Option<String> = None;

        let args_vec: Vec<String> = args
            .into_iter()
            .skip(1)
            .map(|s| s.as_ref().to_string())
            .collect();

        let mut i = 0;
        while i < args_vec.len() {
            let arg_str = &args_vec[i];
            match arg_str.as_str() {
                "--help" | "-h" => display_help = true,
                "--version" | "-V" | "-v" => display_version = true,
                "--debug" | "-d" => debug_enabled = true,
                "--json" | "-j" => json = true,
                "--config" | "-c" => {
                    if i + 1 < args_vec.len() && !args_vec[i + 1].starts_with('-') {
                        config_dir = Some(args_vec[i + 1].clone());
                        i += 1;
                    } else {
                        log_warning!("Missing directory for --config. Usage: --config <directory>");
                        unknown_arg_found = true;
                    }
                }
                "--log" | "-l" => {
                    if i + 1 < args_vec.len() && !args_vec[i + 1].starts_with('-') {
                        log_file = Some(args_vec[i + 1].clone());
                        i += 1;
                    } else {
                        log_warning!("Missing file for --log. Usage: --log <file>");
                        unknown_arg_found = true;
                    }
                }
                "status" | "s" | "watch" | "w" => {
                    if let Some(previous) = &command {
                        log_error!(
                            "Cannot use multiple commands at once: '{}' and '{}'",
                            previous,
                            arg_str
                        );
                        unknown_arg_found = true;
                    } else {
                        command = Some(arg_str.clone());
                    }
                }
                _ => {
                    if arg_str.starts_with('-') {
                        log_warning!("Unknown option: {}", arg_str);
                    } else {
                        log_warning!("Unknown command: {}", arg_str);
                    }
                    unknown_arg_found = true;
                }
            }
            i += 1;
        }

        let is_status = matches!(command.as_deref(), Some("status" | "s"));
        if !unknown_arg_found && is_status && log_file.is_some() {
            log_warning!("--log only applies to 'salatr watch'");
            unknown_arg_found = true;
        }
        if !unknown_arg_found && !is_status && json {
            log_warning!("--json only applies to 'salatr status'");
            unknown_arg_found = true;
        }

        let action = if display_version {
            CliAction::ShowVersion
        } else if display_help {
            CliAction::ShowHelp
        } else if unknown_arg_found {
            CliAction::ShowHelpDueToError
        } else if is_status {
            CliAction::Status {
                debug_enabled,
                json,
                config_dir,
            }
        } else {
            CliAction::Watch {
                debug_enabled,
                log_file,
                config_dir,
            }
        };

        ParsedArgs { action }
    }

    /// Convenience method to parse from std::env::args()
    pub fn from_env() -> ParsedArgs {
        Self::parse(std::env::args())
    }
}

/// Displays version information using custom logging style.
pub fn display_version_info() {
    log_version!();
    log_block_start!(env!("CARGO_PKG_DESCRIPTION"));
    log_end!();
}

/// Displays custom help message using logger methods.
pub fn display_help() {
    log_version!();
    log_block_start!(env!("CARGO_PKG_DESCRIPTION"));
    log_block_start!("Usage:");
    log_indented!("salatr [OPTIONS] [COMMAND]");
    log_block_start!("Options:");
    log_indented!("-c, --config <dir>     Use custom configuration directory");
    log_indented!("-d, --debug            Enable detailed debug output");
    log_indented!("-h, --help             Print help information");
    log_indented!("-j, --json             Print the status snapshot as JSON");
    log_indented!("-l, --log <file>       Also write the watch log to a file");
    log_indented!("-V, --version          Print version information");
    log_block_start!("Commands:");
    log_indented!("status, s              Show the current prayer period and exit");
    log_indented!("watch, w               Follow prayer periods until Ctrl-C (default)");
    log_end!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_no_args_watches() {
        let parsed = ParsedArgs::parse(vec!["salatr"]);
        assert_eq!(
            parsed.action,
            CliAction::Watch {
                debug_enabled: false,
                log_file: None,
                config_dir: None,
            }
        );
    }

    #[test]
    fn test_parse_status_json() {
        let parsed = ParsedArgs::parse(vec!["salatr", "status", "--json"]);
        assert_eq!(
            parsed.action,
            CliAction::Status {
                debug_enabled: false,
                json: true,
                config_dir: None,
            }
        );
    }

    #[test]
    fn test_parse_status_short_alias() {
        let parsed = ParsedArgs::parse(vec!["salatr", "-d", "s"]);
        assert_eq!(
            parsed.action,
            CliAction::Status {
                debug_enabled: true,
                json: false,
                config_dir: None,
            }
        );
    }

    #[test]
    fn test_parse_watch_with_log_and_config() {
        let parsed = ParsedArgs::parse(vec![
            "salatr",
            "--config",
            "/tmp/salatr",
            "watch",
            "--log",
            "/tmp/salatr.log",
        ]);
        assert_eq!(
            parsed.action,
            CliAction::Watch {
                debug_enabled: false,
                log_file: Some("/tmp/salatr.log".to_string()),
                config_dir: Some("/tmp/salatr".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_missing_config_dir() {
        let parsed = ParsedArgs::parse(vec!["salatr", "status", "--config"]);
        assert_eq!(parsed.action, CliAction::ShowHelpDueToError);
    }

    #[test]
    fn test_parse_help_and_version() {
        assert_eq!(ParsedArgs::parse(vec!["salatr", "-h"]).action, CliAction::ShowHelp);
        assert_eq!(ParsedArgs::parse(vec!["salatr", "-V"]).action, CliAction::ShowVersion);
        assert_eq!(ParsedArgs::parse(vec!["salatr", "-v"]).action, CliAction::ShowVersion);
    }

    #[test]
    fn test_version_takes_precedence() {
        let parsed = ParsedArgs::parse(vec!["salatr", "--version", "--help", "--debug"]);
        assert_eq!(parsed.action, CliAction::ShowVersion);
    }

    #[test]
    fn test_help_takes_precedence_over_errors() {
        let parsed = ParsedArgs::parse(vec!["salatr", "--bogus", "--help"]);
        assert_eq!(parsed.action, CliAction::ShowHelp);
    }

    #[test]
    fn test_parse_unknown_flag() {
        let parsed = ParsedArgs::parse(vec!["salatr", "--unknown"]);
        assert_eq!(parsed.action, CliAction::ShowHelpDueToError);
    }

    #[test]
    fn test_parse_unknown_command() {
        let parsed = ParsedArgs::parse(vec!["salatr", "pray"]);
        assert_eq!(parsed.action, CliAction::ShowHelpDueToError);
    }

    #[test]
    fn test_parse_multiple_commands() {
        let parsed = ParsedArgs::parse(vec!["salatr", "status", "watch"]);
        assert_eq!(parsed.action, CliAction::ShowHelpDueToError);
    }

    #[test]
    fn test_json_only_for_status() {
        let parsed = ParsedArgs::parse(vec!["salatr", "watch", "--json"]);
        assert_eq!(parsed.action, CliAction::ShowHelpDueToError);
    }

    #[test]
    fn test_log_only_for_watch() {
        let parsed = ParsedArgs::parse(vec!["salatr", "status", "--log", "out.log"]);
        assert_eq!(parsed.action, CliAction::ShowHelpDueToError);
    }
}
