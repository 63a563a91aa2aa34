//! ACM certificates

use serde_json::{Value, json};

use super::route53::HostedZone;
use super::{Error, Resource, Result, intrinsic, validate_domain};

/// TLS certificate for a domain and its alternative names, validated by
/// DNS challenge records written into a hosted zone
#[derive(Debug, Clone)]
pub struct Certificate {
    pub id: String,
    pub domain_name: String,
    pub subject_alternative_names: Vec<String>,
    pub validation_zone_id: String,
}

impl Certificate {
    /// Certificate for `domain` and `*.domain`, validated through `zone`
    pub fn with_wildcard(id: impl Into<String>, domain: &str, zone: &HostedZone) -> Self {
        Self {
            id: id.into(),
            domain_name: domain.to_string(),
            subject_alternative_names: vec![format!("*.{domain}")],
            validation_zone_id: zone.id.clone(),
        }
    }

    /// Certificate ARN
    pub fn arn(&self) -> Value {
        intrinsic::reference(&self.id)
    }

    /// Every name the certificate covers, primary first
    pub fn names(&self) -> Vec<&str> {
        std::iter::once(self.domain_name.as_str())
            .chain(self.subject_alternative_names.iter().map(String::as_str))
            .collect()
    }
}

impl Resource for Certificate {
    fn logical_id(&self) -> String {
        self.id.clone()
    }

    fn resource_type(&self) -> &'static str {
        "AWS::CertificateManager::Certificate"
    }

    fn description(&self) -> String {
        format!("Certificate for {}", self.names().join(", "))
    }

    fn properties(&self) -> Result<Value> {
        for name in self.names() {
            validate_domain(&self.id, name)?;
        }
        if self.subject_alternative_names.len() > 99 {
            return Err(Error::invalid(&self.id, "too many subject alternative names"));
        }

        let mut props = json!({ "DomainName": self.domain_name });
        if !self.subject_alternative_names.is_empty() {
            props["SubjectAlternativeNames"] = json!(self.subject_alternative_names);
        }
        let options: Vec<Value> = self
            .names()
            .into_iter()
            .map(|name| {
                json!({
                    "DomainName": name,
                    "HostedZoneId": intrinsic::reference(&self.validation_zone_id),
                })
            })
            .collect();
        props["DomainValidationOptions"] = json!(options);
        props["ValidationMethod"] = json!("DNS");
        Ok(props)
    }
}
