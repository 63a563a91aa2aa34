//! Path resolution for the config file and the output directory
//!
//! # Environment Variables
//!
//! - `MIRA_INFRA_CONFIG` - Config file to load (e.g., `~/infra/staging.toml`)
//! - `MIRA_INFRA_OUT_DIR` - Where synthesized templates are written
//!
//! # Path Resolution Priority
//!
//! For config_file():
//! 1. `--config` flag
//! 2. `MIRA_INFRA_CONFIG` environment variable
//! 3. `./infra.toml` if it exists
//! 4. None (built-in defaults)
//!
//! For out_dir():
//! 1. `--out` flag
//! 2. `MIRA_INFRA_OUT_DIR` environment variable
//! 3. `./infra.out`

use anyhow::{Result, bail};
use std::path::PathBuf;

/// Environment variable for the config file
pub const ENV_CONFIG: &str = "MIRA_INFRA_CONFIG";

/// Environment variable for the output directory
pub const ENV_OUT_DIR: &str = "MIRA_INFRA_OUT_DIR";

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "infra.toml";

/// Output directory used when nothing else is set
pub const DEFAULT_OUT_DIR: &str = "infra.out";

/// Locate the config file to load, if any
///
/// An explicitly named file (flag or env var) must exist; the implicit
/// `./infra.toml` is optional.
pub fn config_file(explicit: Option<&str>) -> Result<Option<PathBuf>> {
    let named = match explicit {
        Some(path) => Some((expand(path), "--config")),
        None => std::env::var(ENV_CONFIG)
            .ok()
            .filter(|v| !v.is_empty())
            .map(|v| (expand(&v), ENV_CONFIG)),
    };

    if let Some((path, source)) = named {
        if !path.is_file() {
            bail!("Config file from {} not found: {}", source, path.display());
        }
        log::debug!("Using config file from {}: {}", source, path.display());
        return Ok(Some(path));
    }

    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.is_file() {
        log::debug!("Using config file in working directory: {}", local.display());
        return Ok(Some(local));
    }
    Ok(None)
}

/// Directory synthesized templates go to
pub fn out_dir(explicit: Option<&str>) -> PathBuf {
    if let Some(dir) = explicit {
        let path = expand(dir);
        log::debug!("Using out dir from --out: {}", path.display());
        return path;
    }
    if let Ok(dir) = std::env::var(ENV_OUT_DIR)
        && !dir.is_empty()
    {
        let path = expand(&dir);
        log::debug!("Using out dir from {}: {}", ENV_OUT_DIR, path.display());
        return path;
    }
    let path = PathBuf::from(DEFAULT_OUT_DIR);
    log::debug!("Using default out dir: {}", path.display());
    path
}

/// Expand ~ and environment variables in a path string.
///
/// # Examples
///
/// ```ignore
/// // Expands ~ to home directory
/// let home_path = paths::expand("~/infra/staging.toml");
///
/// // Expands environment variables
/// let var_path = paths::expand("$HOME/infra.out");
/// ```
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
