//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Hands-free voice turn-taking in the terminal.
///
/// Space starts a recording or sends it, Escape cancels a recording or
/// stops the reply, `a` toggles auto-resume and `q` quits.
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(about = "Hands-free voice turn-taking in the terminal")]
#[command(version)]
pub struct Cli {
    /// JSON file with controller settings
    #[arg(long, env = "PARLEY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Silence threshold on the mean level (0, 1]
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Silence after speech that ends the turn, in milliseconds
    #[arg(long = "silence-ms")]
    pub silence_ms: Option<u64>,

    /// Do not resume listening after a reply finishes
    #[arg(long = "no-auto-resume")]
    pub no_auto_resume: bool,

    /// Delay before the echo agent plays an utterance back
    #[arg(long = "echo-delay-ms", default_value_t = 600)]
    pub echo_delay_ms: u64,

    /// Directory for log files (defaults to the platform data dir)
    #[arg(long = "log-dir", env = "PARLEY_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Enable verbose/debug logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "parley",
            "--threshold",
            "0.35",
            "--silence-ms",
            "900",
            "--no-auto-resume",
            "-v",
        ]);
        assert_eq!(cli.threshold, Some(0.35));
        assert_eq!(cli.silence_ms, Some(900));
        assert!(cli.no_auto_resume);
        assert!(cli.verbose);
        assert_eq!(cli.echo_delay_ms, 600);
    }

    #[test]
    fn test_rejects_non_numeric_threshold() {
        assert!(Cli::try_parse_from(["parley", "--threshold", "loud"]).is_err());
    }
}
