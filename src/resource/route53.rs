//! Route 53 hosted zone and alias records

use serde_json::{Value, json};

use super::apigateway::ApiDomainName;
use super::cloudfront::{CLOUDFRONT_HOSTED_ZONE_ID, Distribution};
use super::{Error, Resource, Result, fqdn, intrinsic, validate_domain};

/// A public hosted zone
#[derive(Debug, Clone)]
pub struct HostedZone {
    pub id: String,
    pub zone_name: String,
}

impl HostedZone {
    pub fn new(id: impl Into<String>, zone_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            zone_name: zone_name.into(),
        }
    }

    /// Name servers to configure at the registrar
    pub fn name_servers(&self) -> Value {
        intrinsic::get_att(&self.id, "NameServers")
    }
}

impl Resource for HostedZone {
    fn logical_id(&self) -> String {
        self.id.clone()
    }

    fn resource_type(&self) -> &'static str {
        "AWS::Route53::HostedZone"
    }

    fn description(&self) -> String {
        format!("Hosted zone {}", self.zone_name)
    }

    fn properties(&self) -> Result<Value> {
        validate_domain(&self.id, &self.zone_name)?;
        Ok(json!({ "Name": fqdn(&self.zone_name) }))
    }
}

/// Provider resource an alias record resolves to
#[derive(Debug, Clone, PartialEq)]
pub struct AliasTarget {
    pub dns_name: Value,
    pub hosted_zone_id: Value,
}

impl AliasTarget {
    /// Alias to a CDN distribution
    pub fn cloudfront(distribution: &Distribution) -> Self {
        Self {
            dns_name: distribution.domain_name(),
            hosted_zone_id: json!(CLOUDFRONT_HOSTED_ZONE_ID),
        }
    }

    /// Alias to a regional API custom domain
    pub fn api_gateway_domain(domain: &ApiDomainName) -> Self {
        Self {
            dns_name: domain.regional_domain_name(),
            hosted_zone_id: domain.regional_hosted_zone_id(),
        }
    }
}

/// IPv4 alias record in a hosted zone
#[derive(Debug, Clone)]
pub struct AliasRecord {
    pub id: String,
    pub zone_id: String,
    pub zone_name: String,
    /// Name relative to the zone; `None` means the zone apex
    pub record_name: Option<String>,
    pub target: AliasTarget,
}

impl AliasRecord {
    /// Record of type A
    pub fn a(id: impl Into<String>, zone: &HostedZone, record_name: Option<&str>, target: AliasTarget) -> Self {
        Self {
            id: id.into(),
            zone_id: zone.id.clone(),
            zone_name: zone.zone_name.clone(),
            record_name: record_name.map(str::to_string),
            target,
        }
    }

    /// Fully qualified record name
    pub fn name(&self) -> String {
        let zone = fqdn(&self.zone_name);
        match self.record_name.as_deref() {
            None | Some("") => zone,
            Some(name) if fqdn(name).ends_with(&format!(".{zone}")) || fqdn(name) == zone => fqdn(name),
            Some(name) => format!("{name}.{zone}"),
        }
    }
}

impl Resource for AliasRecord {
    fn logical_id(&self) -> String {
        self.id.clone()
    }

    fn resource_type(&self) -> &'static str {
        "AWS::Route53::RecordSet"
    }

    fn description(&self) -> String {
        format!("A alias {}", self.name())
    }

    fn properties(&self) -> Result<Value> {
        let name = self.name();
        validate_domain(&self.id, &name)?;
        if name.len() > 255 {
            return Err(Error::invalid(&self.id, "record name too long"));
        }
        Ok(json!({
            "AliasTarget": {
                "DNSName": self.target.dns_name,
                "HostedZoneId": self.target.hosted_zone_id,
            },
            "HostedZoneId": intrinsic::reference(&self.zone_id),
            "Name": name,
            "Type": "A",
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone() -> HostedZone {
        HostedZone::new("HostedZone", "mira-hq.com")
    }

    fn target() -> AliasTarget {
        AliasTarget {
            dns_name: intrinsic::get_att("Distribution", "DomainName"),
            hosted_zone_id: json!(CLOUDFRONT_HOSTED_ZONE_ID),
        }
    }

    #[test]
    fn test_zone_name_is_fully_qualified() {
        assert_eq!(zone().properties().unwrap(), json!({ "Name": "mira-hq.com." }));
        assert!(HostedZone::new("Z", "bad").properties().is_err());
    }

    #[test]
    fn test_record_names() {
        let apex = AliasRecord::a("RecordSet", &zone(), None, target());
        assert_eq!(apex.name(), "mira-hq.com.");

        let api = AliasRecord::a("ApiRecord", &zone(), Some("api"), target());
        assert_eq!(api.name(), "api.mira-hq.com.");

        let qualified = AliasRecord::a("ApiRecord", &zone(), Some("api.mira-hq.com"), target());
        assert_eq!(qualified.name(), "api.mira-hq.com.");
    }

    #[test]
    fn test_alias_record_properties() {
        let record = AliasRecord::a("RecordSet", &zone(), None, target());
        assert_eq!(
            record.properties().unwrap(),
            json!({
                "AliasTarget": {
                    "DNSName": { "Fn::GetAtt": ["Distribution", "DomainName"] },
                    "HostedZoneId": "Z2FDTNDATAQYW2",
                },
                "HostedZoneId": { "Ref": "HostedZone" },
                "Name": "mira-hq.com.",
                "Type": "A",
            })
        );
    }
}
