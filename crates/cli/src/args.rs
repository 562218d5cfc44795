//! Flags shared by every subcommand

use clap::{Args, ValueEnum};

/// Format of what a command prints to stdout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Machine-readable JSON
    Json,
}

impl OutputFormat {
    /// True for JSON output
    pub fn is_json(self) -> bool {
        self == OutputFormat::Json
    }
}

/// Global flags, flattened into the top-level command
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// Path to a rowfinder.toml configuration file
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Disable spinners and colors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        global: GlobalArgs,
    }

    #[test]
    fn test_defaults() {
        let cli = TestCli::parse_from(["rowfinder"]);
        assert_eq!(cli.global.verbose, 0);
        assert_eq!(cli.global.format, OutputFormat::Text);
        assert!(cli.global.config.is_none());
        assert!(!cli.global.quiet);
    }

    #[test]
    fn test_flags() {
        let args = ["rowfinder", "-vv", "--format", "json", "--config", "x.toml"];
        let cli = TestCli::parse_from(args);
        assert_eq!(cli.global.verbose, 2);
        assert!(cli.global.format.is_json());
        assert_eq!(cli.global.config.as_deref(), Some("x.toml"));
    }
}
