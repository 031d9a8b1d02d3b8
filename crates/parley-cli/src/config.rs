//! Controller configuration for the CLI: optional JSON file, then flags.

use std::path::Path;

use parley_voice::TurnConfig;

use crate::error::CliError;
use crate::parser::Cli;

/// Read a [`TurnConfig`] from `path`, or defaults when no path is given.
///
/// Missing keys fall back to their defaults.
pub fn load(path: Option<&Path>) -> Result<TurnConfig, CliError> {
    let Some(path) = path else {
        return Ok(TurnConfig::default());
    };

    let raw = std::fs::read_to_string(path)
        .map_err(|e| CliError::Io(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&raw).map_err(|e| CliError::Config(format!("{}: {e}", path.display())))
}

/// Apply command-line overrides on top of a loaded config.
///
/// Out-of-range flag values are usage errors; bad file values are left
/// for [`TurnConfig::validate`].
pub fn apply_overrides(config: &mut TurnConfig, cli: &Cli) -> Result<(), CliError> {
    if let Some(threshold) = cli.threshold {
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(CliError::Arguments(format!(
                "--threshold must be in (0, 1], got {threshold}"
            )));
        }
        config.activity.threshold = threshold;
    }
    if let Some(ms) = cli.silence_ms {
        if ms == 0 {
            return Err(CliError::Arguments("--silence-ms must be positive".to_string()));
        }
        config.activity.silence_duration_ms = ms;
    }
    if cli.no_auto_resume {
        config.auto_resume = false;
    }
    Ok(())
}

/// Load, override and validate.
pub fn resolve(cli: &Cli) -> Result<TurnConfig, CliError> {
    let mut config = load(cli.config.as_deref())?;
    apply_overrides(&mut config, cli)?;
    config.validate()?;
    Ok(config)
}
