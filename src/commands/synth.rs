//! `synth` and `validate`

use anyhow::{Context as AnyhowContext, Result};
use std::fs;
use std::path::{Path, PathBuf};

use declarative::SynthSummary;

use crate::Context;
use crate::cli::SynthArgs;
use crate::paths;
use crate::progress::BarObserver;
use crate::ui;

/// Synthesize the stack and write the template
pub fn run(ctx: &Context, args: SynthArgs) -> Result<()> {
    let loaded = super::load(ctx)?;
    let stack = &loaded.stack;

    let mut observer = BarObserver::new(ctx.quiet || args.stdout);
    let template = stack
        .synthesize(&mut observer)
        .context("Synthesis failed")?;
    let json = template.to_json()?;

    if args.stdout {
        print!("{json}");
        return Ok(());
    }

    let dir = paths::out_dir(args.out.as_deref());
    let path = write_template(&dir, &stack.context.template_file_name(), &json)?;
    let summary = SynthSummary::new(&template, stack.graph.edges()?.len());

    if !ctx.quiet {
        ui::success(&format!("Synthesized {}", loaded.config.stack_name));
        ui::kv("Template", &path.display().to_string());
        ui::kv("Resources", &summary.resources.to_string());
        ui::kv("Outputs", &summary.outputs.to_string());
        ui::kv("Edges", &summary.edges.to_string());
        let fingerprint = template.fingerprint()?;
        if ctx.verbose > 0 {
            ui::kv("Fingerprint", &fingerprint);
        } else {
            ui::kv("Fingerprint", ui::short_hash(&fingerprint));
        }
    }
    Ok(())
}

/// Write `json` as `<dir>/<file_name>`, creating the directory
pub fn write_template(dir: &Path, file_name: &str, json: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Could not create output directory: {}", dir.display()))?;
    let path = dir.join(file_name);
    fs::write(&path, json).with_context(|| format!("Could not write {}", path.display()))?;
    log::debug!("Wrote {} bytes to {}", json.len(), path.display());
    Ok(path)
}

/// Declare and synthesize without writing anything
pub fn validate(ctx: &Context) -> Result<()> {
    let loaded = super::load(ctx)?;
    let stack = &loaded.stack;

    stack.graph.validate().context("Invalid resource graph")?;
    let template = stack.template().context("Invalid declaration")?;

    if !ctx.quiet {
        match &loaded.source {
            Some(path) => ui::kv("Config", &path.display().to_string()),
            None => ui::kv("Config", "built-in defaults"),
        }
        ui::success(&format!(
            "{} is valid ({} resources, {} outputs)",
            loaded.config.stack_name,
            template.resources.len(),
            template.outputs.len()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StackConfig;
    use crate::stack;
    use declarative::Template;
    use tempfile::TempDir;

    #[test]
    fn test_write_template_creates_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested").join("out");
        let stack = stack::build(&StackConfig::default()).unwrap();
        let json = stack.template().unwrap().to_json().unwrap();

        let path = write_template(&dir, &stack.context.template_file_name(), &json).unwrap();
        assert_eq!(path, dir.join("MiraHqInfrastructure.template.json"));

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, json);
        let parsed = Template::from_json(&written).unwrap();
        assert_eq!(parsed, stack.template().unwrap());
    }

    #[test]
    fn test_rewrite_keeps_fingerprint() {
        let temp = TempDir::new().unwrap();
        let stack = stack::build(&StackConfig::default()).unwrap();
        let template = stack.template().unwrap();

        let path = write_template(temp.path(), "a.json", &template.to_json().unwrap()).unwrap();
        let reread = Template::from_json(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(reread.fingerprint().unwrap(), template.fingerprint().unwrap());
    }
}
