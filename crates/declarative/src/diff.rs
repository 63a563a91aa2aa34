//! Diff computation between two synthesized templates
//!
//! This compares declarations only. Comparing against live cloud state is
//! the provisioning engine's job.

use crate::error::Result;
use crate::types::{Template, TemplateResource};
use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};
use std::collections::{BTreeMap, BTreeSet};

/// Kind of change to a single resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Declared in the new template only
    Added,
    /// Declared in the old template only
    Removed,
    /// Same logical id, different properties
    Modified,
    /// Same logical id, different provider type (a replacement)
    Replaced,
}

/// A change to one resource between two templates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceChange {
    /// Logical id of the resource
    pub logical_id: String,
    /// Provider type (the new one for replacements)
    pub resource_type: String,
    /// What changed
    pub kind: ChangeKind,
    /// Previous declaration
    pub before: Option<TemplateResource>,
    /// New declaration
    pub after: Option<TemplateResource>,
}

impl ResourceChange {
    /// Check if this change represents an addition
    pub fn is_addition(&self) -> bool {
        self.kind == ChangeKind::Added
    }

    /// Check if this change represents a removal
    pub fn is_removal(&self) -> bool {
        self.kind == ChangeKind::Removed
    }

    /// Check if this change represents a modification (including replacement)
    pub fn is_modification(&self) -> bool {
        matches!(self.kind, ChangeKind::Modified | ChangeKind::Replaced)
    }

    /// Line diff of the pretty-printed properties
    ///
    /// Each line is prefixed with `-`, `+` or a space.
    pub fn property_diff(&self) -> Result<Vec<String>> {
        let render = |r: &Option<TemplateResource>| -> Result<String> {
            match r {
                Some(r) => Ok(serde_json::to_string_pretty(&r.properties)?),
                None => Ok(String::new()),
            }
        };
        let before = render(&self.before)?;
        let after = render(&self.after)?;

        let diff = TextDiff::from_lines(&before, &after);
        Ok(diff
            .iter_all_changes()
            .map(|change| {
                let sign = match change.tag() {
                    ChangeTag::Delete => '-',
                    ChangeTag::Insert => '+',
                    ChangeTag::Equal => ' ',
                };
                format!("{}{}", sign, change.value().trim_end_matches('\n'))
            })
            .collect())
    }
}

/// Differences between two templates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateDiff {
    /// Resource changes, ordered by logical id
    pub changes: Vec<ResourceChange>,
    /// Output names whose declaration changed, was added or removed
    pub outputs_changed: Vec<String>,
}

impl TemplateDiff {
    /// Compare an old template with a new one
    pub fn between(old: &Template, new: &Template) -> Self {
        let ids: BTreeSet<&String> = old.resources.keys().chain(new.resources.keys()).collect();

        let changes = ids
            .into_iter()
            .filter_map(|id| {
                let before = old.resources.get(id);
                let after = new.resources.get(id);
                let (kind, resource_type) = match (before, after) {
                    (None, Some(a)) => (ChangeKind::Added, &a.resource_type),
                    (Some(b), None) => (ChangeKind::Removed, &b.resource_type),
                    (Some(b), Some(a)) if b.resource_type != a.resource_type => {
                        (ChangeKind::Replaced, &a.resource_type)
                    }
                    (Some(b), Some(a)) if b.properties != a.properties => {
                        (ChangeKind::Modified, &a.resource_type)
                    }
                    _ => return None,
                };
                Some(ResourceChange {
                    logical_id: id.clone(),
                    resource_type: resource_type.clone(),
                    kind,
                    before: before.cloned(),
                    after: after.cloned(),
                })
            })
            .collect();

        let output_names: BTreeSet<&String> = old.outputs.keys().chain(new.outputs.keys()).collect();
        let outputs_changed = output_names
            .into_iter()
            .filter(|name| old.outputs.get(*name) != new.outputs.get(*name))
            .cloned()
            .collect();

        Self {
            changes,
            outputs_changed,
        }
    }

    /// Check if the templates declare the same thing
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.outputs_changed.is_empty()
    }
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    /// Number of resources to add
    pub additions: usize,
    /// Number of resources to remove
    pub removals: usize,
    /// Number of resources to modify in place
    pub modifications: usize,
    /// Number of resources whose type changed
    pub replacements: usize,
}

impl DiffSummary {
    /// Create a summary from a list of changes
    pub fn from_changes(changes: &[ResourceChange]) -> Self {
        let mut summary = Self::default();
        for change in changes {
            match change.kind {
                ChangeKind::Added => summary.additions += 1,
                ChangeKind::Removed => summary.removals += 1,
                ChangeKind::Modified => summary.modifications += 1,
                ChangeKind::Replaced => summary.replacements += 1,
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications + self.replacements
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group changes by provider type
pub fn group_by_type(changes: &[ResourceChange]) -> BTreeMap<String, Vec<&ResourceChange>> {
    let mut groups: BTreeMap<String, Vec<&ResourceChange>> = BTreeMap::new();
    for change in changes {
        groups
            .entry(change.resource_type.clone())
            .or_default()
            .push(change);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn resource(kind: &str, properties: Value) -> TemplateResource {
        TemplateResource {
            resource_type: kind.to_string(),
            properties,
        }
    }

    fn template(entries: Vec<(&str, TemplateResource)>) -> Template {
        let mut template = Template::new(None);
        for (id, r) in entries {
            template.resources.insert(id.to_string(), r);
        }
        template
    }

    #[test]
    fn test_identical_templates() {
        let t = template(vec![("Bucket", resource("AWS::S3::Bucket", json!({})))]);
        let diff = TemplateDiff::between(&t, &t.clone());
        assert!(diff.is_empty());
        assert!(!DiffSummary::from_changes(&diff.changes).has_changes());
    }

    #[test]
    fn test_classifies_changes() {
        let old = template(vec![
            ("Bucket", resource("AWS::S3::Bucket", json!({ "A": 1 }))),
            ("Gone", resource("AWS::S3::Bucket", json!({}))),
            ("Swapped", resource("AWS::S3::Bucket", json!({}))),
        ]);
        let new = template(vec![
            ("Bucket", resource("AWS::S3::Bucket", json!({ "A": 2 }))),
            ("New", resource("AWS::Route53::HostedZone", json!({}))),
            ("Swapped", resource("AWS::S3::BucketPolicy", json!({}))),
        ]);

        let diff = TemplateDiff::between(&old, &new);
        let kinds: Vec<_> = diff
            .changes
            .iter()
            .map(|c| (c.logical_id.as_str(), c.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("Bucket", ChangeKind::Modified),
                ("Gone", ChangeKind::Removed),
                ("New", ChangeKind::Added),
                ("Swapped", ChangeKind::Replaced),
            ]
        );

        let summary = DiffSummary::from_changes(&diff.changes);
        assert_eq!(summary.total(), 4);
        assert_eq!(summary.replacements, 1);

        let groups = group_by_type(&diff.changes);
        assert_eq!(groups["AWS::S3::Bucket"].len(), 2);
    }

    #[test]
    fn test_property_diff_lines() {
        let old = template(vec![("Fn", resource("AWS::Lambda::Function", json!({ "MemorySize": 128 })))]);
        let new = template(vec![("Fn", resource("AWS::Lambda::Function", json!({ "MemorySize": 256 })))]);
        let diff = TemplateDiff::between(&old, &new);
        let lines = diff.changes[0].property_diff().unwrap();
        assert!(lines.contains(&"-  \"MemorySize\": 128".to_string()));
        assert!(lines.contains(&"+  \"MemorySize\": 256".to_string()));
    }

    #[test]
    fn test_output_changes_detected() {
        let old = Template::new(None);
        let mut new = Template::new(None);
        new.outputs.insert(
            "SiteUrl".into(),
            crate::types::TemplateOutput {
                description: None,
                value: json!("https://example.com"),
            },
        );
        let diff = TemplateDiff::between(&old, &new);
        assert_eq!(diff.outputs_changed, vec!["SiteUrl".to_string()]);
        assert!(!diff.is_empty());
    }
}
