//! Command implementations
//!
//! Every command starts from the same place: resolve the config, declare
//! the stack. Nothing here talks to the cloud.

pub mod check;
pub mod config;
pub mod diff;
pub mod inspect;
pub mod synth;

use anyhow::{Context as AnyhowContext, Result};
use std::path::PathBuf;

use crate::Context;
use crate::config::StackConfig;
use crate::stack::{self, Stack};

/// Effective config plus where it came from
pub struct Loaded {
    pub config: StackConfig,
    pub source: Option<PathBuf>,
    pub stack: Stack,
}

/// Resolve the config and declare the stack
pub fn load(ctx: &Context) -> Result<Loaded> {
    let (config, source) = StackConfig::resolve(ctx.config.as_deref())?;
    let stack = stack::build(&config)
        .with_context(|| format!("Could not declare stack {}", config.stack_name))?;
    Ok(Loaded {
        config,
        source,
        stack,
    })
}
