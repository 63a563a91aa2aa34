use anyhow::Result;

use crate::Context;
use crate::config::StackConfig;
use crate::ui;

/// Print the effective configuration
pub fn show(ctx: &Context) -> Result<()> {
    let (config, source) = StackConfig::resolve(ctx.config.as_deref())?;

    if !ctx.quiet {
        match &source {
            Some(path) => ui::dim(&format!("# from {}", path.display())),
            None => ui::dim("# built-in defaults"),
        }
    }
    print!("{}", render(&config)?);
    Ok(())
}

fn render(config: &StackConfig) -> Result<String> {
    let mut toml = config.to_toml()?;
    if !toml.ends_with('\n') {
        toml.push('\n');
    }
    Ok(toml)
}
