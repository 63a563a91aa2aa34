//! `diff` - compare the declared stack with a previously synthesized template

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use std::path::Path;

use declarative::{ChangeKind, DiffSummary, ResourceChange, Template, TemplateDiff, group_by_type};

use crate::Context;
use crate::cli::DiffArgs;
use crate::paths;
use crate::ui;

/// Compare against `--against` or the template in the out dir
pub fn run(ctx: &Context, args: DiffArgs) -> Result<()> {
    let loaded = super::load(ctx)?;
    let current = loaded
        .stack
        .template()
        .context("Synthesis failed")?;

    let previous_path = match &args.against {
        Some(path) => paths::expand(path),
        None => paths::out_dir(args.out.as_deref()).join(loaded.stack.context.template_file_name()),
    };
    let previous = load_previous(&previous_path)?;

    let diff = TemplateDiff::between(&previous, &current);
    render(ctx, &diff)
}

/// Read a template; a missing file counts as an empty stack
pub fn load_previous(path: &Path) -> Result<Template> {
    if !path.exists() {
        ui::warn(&format!(
            "No previous template at {}, everything is new",
            path.display()
        ));
        return Ok(Template::new(None));
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    Template::from_json(&content).with_context(|| format!("Invalid template: {}", path.display()))
}

fn render(ctx: &Context, diff: &TemplateDiff) -> Result<()> {
    if diff.is_empty() {
        ui::success("No changes");
        return Ok(());
    }

    for (resource_type, changes) in group_by_type(&diff.changes) {
        ui::section(&resource_type);
        for change in changes {
            render_change(ctx, change)?;
        }
    }

    if !diff.outputs_changed.is_empty() {
        ui::section("Outputs");
        for name in &diff.outputs_changed {
            println!("  {} {}", "~".yellow(), name);
        }
    }

    let summary = DiffSummary::from_changes(&diff.changes);
    println!();
    println!(
        "{} to add, {} to change, {} to replace, {} to remove",
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.replacements.to_string().magenta(),
        summary.removals.to_string().red()
    );
    Ok(())
}

fn render_change(ctx: &Context, change: &ResourceChange) -> Result<()> {
    let marker = match change.kind {
        ChangeKind::Added => "+".green(),
        ChangeKind::Removed => "-".red(),
        ChangeKind::Modified => "~".yellow(),
        ChangeKind::Replaced => "±".magenta(),
    };
    println!("  {} {}", marker, change.logical_id.bold());

    // Full property dumps for additions/removals only with -v
    if change.is_modification() || ctx.verbose > 0 {
        for line in change.property_diff()? {
            // Context lines of a modification only with -v
            if line.starts_with(' ') && ctx.verbose == 0 {
                continue;
            }
            println!("      {}", ui::diff_line(&line));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::synth::write_template;
    use crate::config::StackConfig;
    use crate::stack;
    use tempfile::TempDir;

    #[test]
    fn test_missing_previous_is_empty() {
        let temp = TempDir::new().unwrap();
        let previous = load_previous(&temp.path().join("none.json")).unwrap();
        assert!(previous.resources.is_empty());
    }

    #[test]
    fn test_diff_against_written_template() {
        let temp = TempDir::new().unwrap();
        let front_end_only = {
            let mut config = StackConfig::default();
            config.api.enabled = false;
            stack::build(&config).unwrap().template().unwrap()
        };
        let path = write_template(temp.path(), "old.json", &front_end_only.to_json().unwrap()).unwrap();

        let previous = load_previous(&path).unwrap();
        let current = stack::build(&StackConfig::default()).unwrap().template().unwrap();
        let diff = TemplateDiff::between(&previous, &current);
        let summary = DiffSummary::from_changes(&diff.changes);

        assert_eq!(summary.removals, 0);
        assert!(summary.additions >= 10);
        // The deployment policy gains the function statement
        assert_eq!(summary.modifications, 1);
        assert!(
            diff.changes
                .iter()
                .any(|c| c.logical_id == "S3DeploymentPolicy" && c.is_modification())
        );
        assert!(diff.outputs_changed.contains(&"ApiUrl".to_string()));
    }

    #[test]
    fn test_no_changes_against_itself() {
        let temp = TempDir::new().unwrap();
        let template = stack::build(&StackConfig::default()).unwrap().template().unwrap();
        let path = write_template(temp.path(), "same.json", &template.to_json().unwrap()).unwrap();
        let diff = TemplateDiff::between(&load_previous(&path).unwrap(), &template);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_garbage_template_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_previous(&path).is_err());
    }
}
