//! CloudFront distribution, cache policy and origin access identity

use serde_json::{Map, Value, json};
use std::time::Duration;

use super::s3::Bucket;
use super::{Error, Resource, Result, intrinsic, seconds, validate_domain};

/// Hosted zone id every CloudFront alias target lives in
pub const CLOUDFRONT_HOSTED_ZONE_ID: &str = "Z2FDTNDATAQYW2";

/// Provider default for the longest cache lifetime (one year)
pub const DEFAULT_MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Principal that lets the CDN read a private bucket
#[derive(Debug, Clone)]
pub struct OriginAccessIdentity {
    pub id: String,
    pub comment: String,
}

impl OriginAccessIdentity {
    pub fn new(id: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            comment: comment.into(),
        }
    }

    /// Canonical user id, used as the bucket policy principal
    pub fn canonical_user(&self) -> Value {
        intrinsic::get_att(&self.id, "S3CanonicalUserId")
    }

    /// Principal block for a bucket policy statement
    pub fn grant_principal(&self) -> Value {
        json!({ "CanonicalUser": self.canonical_user() })
    }

    /// `origin-access-identity/cloudfront/<id>` as the origin config expects
    fn origin_path(&self) -> Value {
        intrinsic::join(
            "",
            vec![
                json!("origin-access-identity/cloudfront/"),
                intrinsic::reference(&self.id),
            ],
        )
    }
}

impl Resource for OriginAccessIdentity {
    fn logical_id(&self) -> String {
        self.id.clone()
    }

    fn resource_type(&self) -> &'static str {
        "AWS::CloudFront::CloudFrontOriginAccessIdentity"
    }

    fn description(&self) -> String {
        format!("Origin access identity '{}'", self.comment)
    }

    fn properties(&self) -> Result<Value> {
        if self.comment.len() > 128 {
            return Err(Error::invalid(&self.id, "comment longer than 128 characters"));
        }
        Ok(json!({
            "CloudFrontOriginAccessIdentityConfig": { "Comment": self.comment }
        }))
    }
}

/// How one dimension (cookies, headers, query strings) feeds the cache key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheKeyBehavior {
    /// Not part of the cache key
    None,
    /// Every value is part of the cache key
    All,
    /// Only the listed names are part of the cache key
    AllowList(Vec<String>),
}

impl CacheKeyBehavior {
    fn render(&self, behavior_key: &str, names_key: &str) -> Value {
        let mut config = Map::new();
        let behavior = match self {
            Self::None => "none",
            Self::All => "all",
            Self::AllowList(names) => {
                config.insert(names_key.into(), json!(names));
                "whitelist"
            }
        };
        config.insert(behavior_key.into(), json!(behavior));
        Value::Object(config)
    }
}

/// Cache key and TTL rules
#[derive(Debug, Clone)]
pub struct CachePolicy {
    pub id: String,
    pub name: String,
    pub default_ttl: Duration,
    pub min_ttl: Duration,
    pub max_ttl: Duration,
    pub cookies: CacheKeyBehavior,
    pub headers: CacheKeyBehavior,
    pub query_strings: CacheKeyBehavior,
}

impl CachePolicy {
    /// A policy with nothing in the cache key besides the path
    pub fn single_variant(id: impl Into<String>, name: impl Into<String>, default_ttl: Duration) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            default_ttl,
            min_ttl: Duration::ZERO,
            max_ttl: DEFAULT_MAX_TTL.max(default_ttl),
            cookies: CacheKeyBehavior::None,
            headers: CacheKeyBehavior::None,
            query_strings: CacheKeyBehavior::None,
        }
    }
}

impl Resource for CachePolicy {
    fn logical_id(&self) -> String {
        self.id.clone()
    }

    fn resource_type(&self) -> &'static str {
        "AWS::CloudFront::CachePolicy"
    }

    fn description(&self) -> String {
        format!("Cache policy {} (default TTL {}s)", self.name, seconds(self.default_ttl))
    }

    fn properties(&self) -> Result<Value> {
        let valid_name = !self.name.is_empty()
            && self.name.len() <= 128
            && self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid_name {
            return Err(Error::invalid(&self.id, format!("invalid cache policy name '{}'", self.name)));
        }
        if !(self.min_ttl <= self.default_ttl && self.default_ttl <= self.max_ttl) {
            return Err(Error::invalid(&self.id, "TTLs must satisfy min <= default <= max"));
        }
        if self.headers == CacheKeyBehavior::All {
            return Err(Error::invalid(&self.id, "headers cannot all be part of the cache key"));
        }

        Ok(json!({
            "CachePolicyConfig": {
                "DefaultTTL": seconds(self.default_ttl),
                "MaxTTL": seconds(self.max_ttl),
                "MinTTL": seconds(self.min_ttl),
                "Name": self.name,
                "ParametersInCacheKeyAndForwardedToOrigin": {
                    "CookiesConfig": self.cookies.render("CookieBehavior", "Cookies"),
                    "EnableAcceptEncodingBrotli": false,
                    "EnableAcceptEncodingGzip": false,
                    "HeadersConfig": self.headers.render("HeaderBehavior", "Headers"),
                    "QueryStringsConfig": self.query_strings.render("QueryStringBehavior", "QueryStrings"),
                }
            }
        }))
    }
}

/// Rewrite of an edge error response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub http_status: u16,
    pub response_http_status: Option<u16>,
    pub response_page_path: Option<String>,
    pub ttl: Duration,
}

impl ErrorResponse {
    /// 404 and 403 both served as `path` with status 200
    ///
    /// Lets a single-page app answer deep links without a server round trip.
    pub fn spa_fallback(path: &str, ttl: Duration) -> Vec<Self> {
        [404, 403]
            .into_iter()
            .map(|http_status| Self {
                http_status,
                response_http_status: Some(200),
                response_page_path: Some(path.to_string()),
                ttl,
            })
            .collect()
    }

    fn render(&self, resource: &str) -> Result<Value> {
        if !(400..=599).contains(&self.http_status) {
            return Err(Error::invalid(
                resource,
                format!("error code {} is not a 4xx/5xx status", self.http_status),
            ));
        }
        if let Some(code) = self.response_http_status
            && !(100..=599).contains(&code)
        {
            return Err(Error::invalid(resource, format!("invalid response code {code}")));
        }
        if self.response_page_path.is_some() != self.response_http_status.is_some() {
            return Err(Error::invalid(
                resource,
                "response page path and response code must be set together",
            ));
        }

        let mut entry = json!({
            "ErrorCachingMinTTL": seconds(self.ttl),
            "ErrorCode": self.http_status,
        });
        if let Some(code) = self.response_http_status {
            entry["ResponseCode"] = json!(code);
        }
        if let Some(path) = &self.response_page_path {
            if !path.starts_with('/') {
                return Err(Error::invalid(resource, format!("response page path '{path}' must start with '/'")));
            }
            entry["ResponsePagePath"] = json!(path);
        }
        Ok(entry)
    }
}

/// Private S3 origin read through an origin access identity
#[derive(Debug, Clone)]
pub struct S3Origin {
    pub domain_name: Value,
    pub access_identity: Value,
}

impl S3Origin {
    pub fn new(bucket: &Bucket, identity: &OriginAccessIdentity) -> Self {
        Self {
            domain_name: bucket.regional_domain_name(),
            access_identity: identity.origin_path(),
        }
    }
}

/// The CDN distribution
///
/// Viewers are redirected to HTTPS and served over HTTP/2.
#[derive(Debug, Clone)]
pub struct Distribution {
    pub id: String,
    pub aliases: Vec<String>,
    pub comment: String,
    pub origin: S3Origin,
    pub cache_policy_id: String,
    pub compress: bool,
    pub default_root_object: Option<String>,
    pub enable_ipv6: bool,
    pub certificate_arn: Option<Value>,
    pub enabled: bool,
    pub error_responses: Vec<ErrorResponse>,
}

impl Distribution {
    /// Origin id used by the default behaviour
    const ORIGIN_ID: &'static str = "origin1";
    const VIEWER_PROTOCOL_POLICY: &'static str = "redirect-to-https";
    const HTTP_VERSION: &'static str = "http2";

    /// Domain name assigned by the provider (`xxxx.cloudfront.net`)
    pub fn domain_name(&self) -> Value {
        intrinsic::get_att(&self.id, "DomainName")
    }
}

impl Resource for Distribution {
    fn logical_id(&self) -> String {
        self.id.clone()
    }

    fn resource_type(&self) -> &'static str {
        "AWS::CloudFront::Distribution"
    }

    fn description(&self) -> String {
        format!("CDN for {}", self.aliases.join(", "))
    }

    fn properties(&self) -> Result<Value> {
        for alias in &self.aliases {
            validate_domain(&self.id, alias)?;
        }
        if !self.aliases.is_empty() && self.certificate_arn.is_none() {
            return Err(Error::invalid(&self.id, "aliases require a certificate"));
        }
        let mut seen = std::collections::BTreeSet::new();
        if let Some(dup) = self.error_responses.iter().find(|e| !seen.insert(e.http_status)) {
            return Err(Error::invalid(
                &self.id,
                format!("error code {} remapped twice", dup.http_status),
            ));
        }
        let error_responses = self
            .error_responses
            .iter()
            .map(|e| e.render(&self.id))
            .collect::<Result<Vec<_>>>()?;

        let mut config = json!({
            "Comment": self.comment,
            "DefaultCacheBehavior": {
                "CachePolicyId": intrinsic::reference(&self.cache_policy_id),
                "Compress": self.compress,
                "TargetOriginId": Self::ORIGIN_ID,
                "ViewerProtocolPolicy": Self::VIEWER_PROTOCOL_POLICY,
            },
            "Enabled": self.enabled,
            "HttpVersion": Self::HTTP_VERSION,
            "IPV6Enabled": self.enable_ipv6,
            "Origins": [{
                "DomainName": self.origin.domain_name,
                "Id": Self::ORIGIN_ID,
                "S3OriginConfig": { "OriginAccessIdentity": self.origin.access_identity },
            }],
        });
        if !self.aliases.is_empty() {
            config["Aliases"] = json!(self.aliases);
        }
        if !error_responses.is_empty() {
            config["CustomErrorResponses"] = json!(error_responses);
        }
        if let Some(root) = &self.default_root_object {
            config["DefaultRootObject"] = json!(root);
        }
        if let Some(certificate) = &self.certificate_arn {
            config["ViewerCertificate"] = json!({
                "AcmCertificateArn": certificate,
                "MinimumProtocolVersion": "TLSv1.2_2021",
                "SslSupportMethod": "sni-only",
            });
        }

        Ok(json!({ "DistributionConfig": config }))
    }
}
