//! Core types for synthesized templates

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Template format version understood by the provisioning engine
pub const FORMAT_VERSION: &str = "2010-09-09";

/// A single resource entry in a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateResource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    #[serde(rename = "Properties")]
    pub properties: Value,
}

/// A stack output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateOutput {
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Value")]
    pub value: Value,
}

/// The declarative template handed to the provisioning engine
///
/// All maps are ordered by key, so serializing the same template twice
/// yields the same bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Resources")]
    pub resources: BTreeMap<String, TemplateResource>,
    #[serde(rename = "Outputs", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, TemplateOutput>,
}

impl Template {
    /// Create an empty template
    pub fn new(description: Option<String>) -> Self {
        Self {
            format_version: FORMAT_VERSION.to_string(),
            description,
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// Pretty-printed JSON, newline terminated
    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Parse a template previously written by [`Template::to_json`]
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::TemplateParse(e.to_string()))
    }

    /// Content hash of the serialized template (hex)
    pub fn fingerprint(&self) -> Result<String> {
        Ok(blake3::hash(self.to_json()?.as_bytes()).to_hex().to_string())
    }

    /// Number of resources of a given provider type
    pub fn count_of(&self, resource_type: &str) -> usize {
        self.resources
            .values()
            .filter(|r| r.resource_type == resource_type)
            .count()
    }

    /// Resources of a given provider type, by logical id
    pub fn resources_of<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a TemplateResource)> + 'a {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type)
    }
}

/// Summary of a synthesis run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthSummary {
    pub resources: usize,
    pub outputs: usize,
    pub edges: usize,
}

impl SynthSummary {
    /// Build a summary from a template and its edge count
    pub fn new(template: &Template, edges: usize) -> Self {
        Self {
            resources: template.resources.len(),
            outputs: template.outputs.len(),
            edges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Template {
        let mut template = Template::new(Some("sample".into()));
        template.resources.insert(
            "Zone".into(),
            TemplateResource {
                resource_type: "AWS::Route53::HostedZone".into(),
                properties: json!({ "Name": "example.com." }),
            },
        );
        template.resources.insert(
            "Bucket".into(),
            TemplateResource {
                resource_type: "AWS::S3::Bucket".into(),
                properties: json!({ "VersioningConfiguration": { "Status": "Enabled" } }),
            },
        );
        template
    }

    #[test]
    fn test_json_keys_are_sorted() {
        let json = sample().to_json().unwrap();
        let bucket = json.find("\"Bucket\"").unwrap();
        let zone = json.find("\"Zone\"").unwrap();
        assert!(bucket < zone);
        assert!(json.starts_with("{\n  \"AWSTemplateFormatVersion\": \"2010-09-09\""));
        assert!(!json.contains("Outputs"));
    }

    #[test]
    fn test_json_reads_back() {
        let template = sample();
        let parsed = Template::from_json(&template.to_json().unwrap()).unwrap();
        assert_eq!(parsed, template);
        assert_eq!(parsed.fingerprint().unwrap(), template.fingerprint().unwrap());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            Template::from_json("{ not json"),
            Err(Error::TemplateParse(_))
        ));
    }

    #[test]
    fn test_count_of() {
        let template = sample();
        assert_eq!(template.count_of("AWS::S3::Bucket"), 1);
        assert_eq!(template.count_of("AWS::Lambda::Function"), 0);
        assert_eq!(template.resources_of("AWS::S3::Bucket").count(), 1);
    }
}
