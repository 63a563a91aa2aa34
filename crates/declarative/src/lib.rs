//! # Declarative
//!
//! A framework for declarative resource graphs.
//!
//! This crate provides the core abstractions for declaring resources,
//! wiring them together by reference, and synthesizing the result into a
//! template an external provisioning engine can diff and apply.
//!
//! ## Core Concepts
//!
//! - **Resource**: A description of something the provider will create
//! - **Intrinsic**: A `Ref` / `Fn::GetAtt` embedded in properties; the only
//!   way to declare an edge
//! - **ResourceGraph**: Declared resources, checked for dangling references
//!   and cycles, ordered topologically
//! - **Template**: The deterministic output of synthesis
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{Resource, ResourceGraph, SynthContext, intrinsic, synthesize_simple};
//! use serde_json::{json, Value};
//!
//! #[derive(Debug)]
//! struct Zone;
//!
//! impl Resource for Zone {
//!     fn logical_id(&self) -> String { "Zone".into() }
//!     fn resource_type(&self) -> &'static str { "AWS::Route53::HostedZone" }
//!     fn description(&self) -> String { "Hosted zone".into() }
//!     fn properties(&self) -> declarative::Result<Value> {
//!         Ok(json!({ "Name": "example.com." }))
//!     }
//! }
//!
//! let mut graph = ResourceGraph::new();
//! graph.add(Box::new(Zone))?;
//!
//! let mut ctx = SynthContext::new("Example");
//! ctx.add_output("NameServers", "Delegation set", intrinsic::get_att("Zone", "NameServers"))?;
//! let template = synthesize_simple(&graph, &ctx)?;
//! println!("{}", template.to_json()?);
//! ```
//!
//! ## Observer Traits
//!
//! - [`SynthObserver`]: Receives progress updates during synthesis
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks.

pub mod context;
pub mod diff;
pub mod error;
pub mod intrinsic;
pub mod planner;
pub mod resource;
pub mod synth;
pub mod types;

// Re-export main types at crate root
pub use context::{NoProgress, Recorder, SynthContext, SynthObserver};
pub use diff::{ChangeKind, DiffSummary, ResourceChange, TemplateDiff, group_by_type};
pub use error::{Error, Result};
pub use planner::ResourceGraph;
pub use resource::{BoxedResource, Resource, ResourceExt, category_of};
pub use synth::{synthesize, synthesize_simple};
pub use types::{SynthSummary, Template, TemplateOutput, TemplateResource};
