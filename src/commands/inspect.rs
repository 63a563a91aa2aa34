//! `list` and `graph`

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use std::collections::HashSet;

use declarative::{Resource, ResourceGraph};

use crate::Context;
use crate::ui;

/// Resources matching `target`, in dependency order
pub fn ordered<'a>(graph: &'a ResourceGraph, target: Option<&str>) -> Result<Vec<&'a dyn Resource>> {
    let order = graph
        .topological_order()
        .context("Could not order resources")?;
    let selected: HashSet<String> = graph
        .filter_by_target(target)
        .into_iter()
        .map(|r| r.logical_id())
        .collect();
    Ok(order
        .iter()
        .filter(|id| selected.contains(*id))
        .filter_map(|id| graph.get(id))
        .collect())
}

/// List declared resources
pub fn list(ctx: &Context, target: Option<&str>) -> Result<()> {
    let loaded = super::load(ctx)?;
    let resources = ordered(&loaded.stack.graph, target)?;

    if resources.is_empty() {
        if let Some(target) = target {
            ui::warn(&format!("No resources match '{target}'"));
        }
        return Ok(());
    }

    if !ctx.quiet {
        ui::header(&format!(
            "{} ({} resources)",
            loaded.config.stack_name,
            resources.len()
        ));
    }
    let width = resources
        .iter()
        .map(|r| r.logical_id().len())
        .max()
        .unwrap_or_default();
    for resource in resources {
        let id = format!("{:<width$}", resource.logical_id());
        println!("  {}  {}", id.bold(), resource.resource_type().cyan());
        if ctx.verbose > 0 {
            ui::dim(&format!("  {}", resource.description()));
        }
    }
    Ok(())
}

/// Print dependency edges
pub fn graph(ctx: &Context) -> Result<()> {
    let loaded = super::load(ctx)?;
    let graph = &loaded.stack.graph;
    graph.validate().context("Invalid resource graph")?;

    for (from, to) in graph.edges()? {
        println!("{from} -> {to}");
    }
    Ok(())
}
