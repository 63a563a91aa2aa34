//! Synthesis context and observer traits
//!
//! These keep the declarative crate free of any particular UI: callers
//! plug in their own progress reporting.

use crate::error::{Error, Result};
use crate::types::TemplateOutput;
use serde_json::Value;
use std::collections::BTreeMap;

/// Observer for synthesis progress
///
/// Implement this trait to receive updates while a graph is rendered.
pub trait SynthObserver {
    /// Called once before any resource is rendered
    fn on_start(&mut self, total: usize);

    /// Called after a resource's properties rendered successfully
    fn on_resource(&mut self, logical_id: &str, resource_type: &str);

    /// Called once after the template is complete
    fn on_complete(&mut self);
}

/// No-op observer
pub struct NoProgress;

impl SynthObserver for NoProgress {
    fn on_start(&mut self, _total: usize) {}
    fn on_resource(&mut self, _logical_id: &str, _resource_type: &str) {}
    fn on_complete(&mut self) {}
}

/// Observer that records rendered ids in order
#[derive(Debug, Default)]
pub struct Recorder {
    pub rendered: Vec<String>,
    pub completed: bool,
}

impl SynthObserver for Recorder {
    fn on_start(&mut self, total: usize) {
        self.rendered.reserve(total);
    }

    fn on_resource(&mut self, logical_id: &str, _resource_type: &str) {
        self.rendered.push(logical_id.to_string());
    }

    fn on_complete(&mut self) {
        self.completed = true;
    }
}

/// Everything synthesis needs besides the graph itself
#[derive(Debug, Clone, Default)]
pub struct SynthContext {
    /// Stack name, used for naming the template
    pub stack_name: String,
    /// Template description
    pub description: Option<String>,
    /// Stack outputs, keyed by output name
    pub outputs: BTreeMap<String, TemplateOutput>,
}

impl SynthContext {
    /// Create a new context
    pub fn new(stack_name: impl Into<String>) -> Self {
        Self {
            stack_name: stack_name.into(),
            description: None,
            outputs: BTreeMap::new(),
        }
    }

    /// Set the template description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a stack output
    ///
    /// Fails if an output with the same name already exists.
    pub fn add_output(&mut self, name: &str, description: &str, value: Value) -> Result<()> {
        if self.outputs.contains_key(name) {
            return Err(Error::DuplicateOutput(name.to_string()));
        }
        self.outputs.insert(
            name.to_string(),
            TemplateOutput {
                description: Some(description.to_string()),
                value,
            },
        );
        Ok(())
    }

    /// File name the template is written under
    pub fn template_file_name(&self) -> String {
        format!("{}.template.json", self.stack_name)
    }
}
