//! Resource trait for declarative graphs
//!
//! A Resource is a description of something the provisioning engine will
//! create. It carries no runtime state; it only knows its name, its
//! provider type, and how to render its properties.

use crate::error::Result;
use crate::intrinsic;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// Core trait for declared resources
///
/// Every resource in a graph implements this trait, which provides:
/// - Identity (logical id, provider type, description)
/// - Property rendering, including local validation of literals
///
/// References to other resources are expressed by embedding
/// [`intrinsic::reference`] or [`intrinsic::get_att`] values in the
/// rendered properties. There is no way to declare ordering directly.
///
/// # Example
///
/// ```ignore
/// use declarative::{Resource, intrinsic};
/// use serde_json::{json, Value};
///
/// #[derive(Debug)]
/// struct Queue { id: String, dead_letter: String }
///
/// impl Resource for Queue {
///     fn logical_id(&self) -> String { self.id.clone() }
///     fn resource_type(&self) -> &'static str { "AWS::SQS::Queue" }
///     fn description(&self) -> String { format!("Queue {}", self.id) }
///     fn properties(&self) -> declarative::Result<Value> {
///         Ok(json!({
///             "RedrivePolicy": {
///                 "deadLetterTargetArn": intrinsic::get_att(&self.dead_letter, "Arn"),
///             }
///         }))
///     }
/// }
/// ```
pub trait Resource: Send + Sync + fmt::Debug {
    /// Logical id, unique within a graph
    ///
    /// Becomes the key under `Resources` in the synthesized template.
    fn logical_id(&self) -> String;

    /// Provider type name (e.g., "AWS::S3::Bucket")
    fn resource_type(&self) -> &'static str;

    /// Human-readable description
    fn description(&self) -> String;

    /// Render the property bag
    ///
    /// Fails with [`crate::Error::InvalidProperty`] when a literal is one the
    /// provider would reject outright.
    fn properties(&self) -> Result<Value>;

    /// Short category used for grouping and filtering
    ///
    /// Defaults to the lower-cased service segment of the provider type,
    /// so "AWS::CloudFront::Distribution" becomes "cloudfront".
    fn category(&self) -> String {
        category_of(self.resource_type())
    }
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;

/// Extension trait for working with declared resources
pub trait ResourceExt {
    /// Logical ids this resource references
    fn dependencies(&self) -> Result<BTreeSet<String>>;
}

impl<R: Resource + ?Sized> ResourceExt for R {
    fn dependencies(&self) -> Result<BTreeSet<String>> {
        Ok(intrinsic::references(&self.properties()?))
    }
}

/// Service segment of a provider type, lower-cased
pub fn category_of(resource_type: &str) -> String {
    resource_type
        .split("::")
        .nth(1)
        .unwrap_or(resource_type)
        .to_lowercase()
}
