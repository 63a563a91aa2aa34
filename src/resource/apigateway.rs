//! HTTP API (API Gateway v2): API, integration, route, stage, custom domain

use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::acm::Certificate;
use super::lambda::Function;
use super::{Error, Resource, Result, intrinsic, seconds, validate_domain};

/// Route key and stage name that catch everything
pub const DEFAULT_ROUTE: &str = "$default";

/// HTTP methods accepted in CORS rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Any,
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "*",
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "*" | "ANY" => Ok(Self::Any),
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(format!("unsupported HTTP method '{s}'")),
        }
    }
}

/// CORS preflight rules
#[derive(Debug, Clone, PartialEq)]
pub struct CorsPreflight {
    pub allow_credentials: bool,
    pub allow_headers: Vec<String>,
    pub allow_methods: Vec<HttpMethod>,
    pub allow_origins: Vec<String>,
    pub expose_headers: Vec<String>,
    pub max_age: Duration,
}

impl CorsPreflight {
    fn render(&self, resource: &str) -> Result<Value> {
        if self.allow_credentials && self.allow_origins.iter().any(|o| o == "*") {
            return Err(Error::invalid(
                resource,
                "CORS cannot allow credentials for every origin",
            ));
        }
        if let Some(origin) = self
            .allow_origins
            .iter()
            .find(|o| o.as_str() != "*" && !o.starts_with("http://") && !o.starts_with("https://"))
        {
            return Err(Error::invalid(resource, format!("CORS origin '{origin}' has no scheme")));
        }
        if seconds(self.max_age) > 86_400 {
            return Err(Error::invalid(resource, "CORS max age exceeds one day"));
        }

        let methods: Vec<&str> = self.allow_methods.iter().map(HttpMethod::as_str).collect();
        let mut config = json!({
            "AllowCredentials": self.allow_credentials,
            "AllowHeaders": self.allow_headers,
            "AllowMethods": methods,
            "AllowOrigins": self.allow_origins,
            "MaxAge": seconds(self.max_age),
        });
        if !self.expose_headers.is_empty() {
            config["ExposeHeaders"] = json!(self.expose_headers);
        }
        Ok(config)
    }
}

/// An HTTP API
#[derive(Debug, Clone)]
pub struct HttpApi {
    pub id: String,
    pub name: String,
    pub cors: Option<CorsPreflight>,
}

impl HttpApi {
    pub fn api_id(&self) -> Value {
        intrinsic::reference(&self.id)
    }

    /// `execute-api` ARN covering every stage and route
    pub fn execute_arn(&self) -> Value {
        super::regional_arn("execute-api", vec![self.api_id(), json!("/*/*")])
    }
}

impl Resource for HttpApi {
    fn logical_id(&self) -> String {
        self.id.clone()
    }

    fn resource_type(&self) -> &'static str {
        "AWS::ApiGatewayV2::Api"
    }

    fn description(&self) -> String {
        format!("HTTP API {}", self.name)
    }

    fn properties(&self) -> Result<Value> {
        if self.name.is_empty() || self.name.len() > 128 {
            return Err(Error::invalid(&self.id, "API name must be 1-128 characters"));
        }
        let mut props = json!({
            "Name": self.name,
            "ProtocolType": "HTTP",
        });
        if let Some(cors) = &self.cors {
            props["CorsConfiguration"] = cors.render(&self.id)?;
        }
        Ok(props)
    }
}

/// Proxy payload format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormatVersion {
    V1,
    V2,
}

impl PayloadFormatVersion {
    fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "1.0",
            Self::V2 => "2.0",
        }
    }
}

/// Proxy integration forwarding requests to a function
#[derive(Debug, Clone)]
pub struct LambdaProxyIntegration {
    pub id: String,
    pub api_id: String,
    pub function_arn: Value,
    pub payload_format: PayloadFormatVersion,
}

impl LambdaProxyIntegration {
    pub fn new(id: impl Into<String>, api: &HttpApi, function: &Function, payload_format: PayloadFormatVersion) -> Self {
        Self {
            id: id.into(),
            api_id: api.id.clone(),
            function_arn: function.arn(),
            payload_format,
        }
    }
}

impl Resource for LambdaProxyIntegration {
    fn logical_id(&self) -> String {
        self.id.clone()
    }

    fn resource_type(&self) -> &'static str {
        "AWS::ApiGatewayV2::Integration"
    }

    fn description(&self) -> String {
        format!("Lambda proxy integration (payload {})", self.payload_format.as_str())
    }

    fn properties(&self) -> Result<Value> {
        Ok(json!({
            "ApiId": intrinsic::reference(&self.api_id),
            "IntegrationType": "AWS_PROXY",
            "IntegrationUri": self.function_arn,
            "PayloadFormatVersion": self.payload_format.as_str(),
        }))
    }
}

/// Route sending a route key to an integration
#[derive(Debug, Clone)]
pub struct Route {
    pub id: String,
    pub api_id: String,
    pub route_key: String,
    pub integration_id: String,
}

impl Resource for Route {
    fn logical_id(&self) -> String {
        self.id.clone()
    }

    fn resource_type(&self) -> &'static str {
        "AWS::ApiGatewayV2::Route"
    }

    fn description(&self) -> String {
        format!("Route {}", self.route_key)
    }

    fn properties(&self) -> Result<Value> {
        if self.route_key != DEFAULT_ROUTE {
            let method = self.route_key.split_whitespace().next().unwrap_or_default();
            method
                .parse::<HttpMethod>()
                .map_err(|e| Error::invalid(&self.id, e))?;
        }
        Ok(json!({
            "ApiId": intrinsic::reference(&self.api_id),
            "AuthorizationType": "NONE",
            "RouteKey": self.route_key,
            "Target": intrinsic::join(
                "",
                vec![json!("integrations/"), intrinsic::reference(&self.integration_id)],
            ),
        }))
    }
}

/// Deployment stage
#[derive(Debug, Clone)]
pub struct Stage {
    pub id: String,
    pub api_id: String,
    pub stage_name: String,
    pub auto_deploy: bool,
}

impl Resource for Stage {
    fn logical_id(&self) -> String {
        self.id.clone()
    }

    fn resource_type(&self) -> &'static str {
        "AWS::ApiGatewayV2::Stage"
    }

    fn description(&self) -> String {
        format!("Stage {}", self.stage_name)
    }

    fn properties(&self) -> Result<Value> {
        Ok(json!({
            "ApiId": intrinsic::reference(&self.api_id),
            "AutoDeploy": self.auto_deploy,
            "StageName": self.stage_name,
        }))
    }
}

/// Regional custom domain for APIs
#[derive(Debug, Clone)]
pub struct ApiDomainName {
    pub id: String,
    pub domain_name: String,
    pub certificate_arn: Value,
}

impl ApiDomainName {
    pub fn new(id: impl Into<String>, domain_name: impl Into<String>, certificate: &Certificate) -> Self {
        Self {
            id: id.into(),
            domain_name: domain_name.into(),
            certificate_arn: certificate.arn(),
        }
    }

    pub fn regional_domain_name(&self) -> Value {
        intrinsic::get_att(&self.id, "RegionalDomainName")
    }

    pub fn regional_hosted_zone_id(&self) -> Value {
        intrinsic::get_att(&self.id, "RegionalHostedZoneId")
    }
}

impl Resource for ApiDomainName {
    fn logical_id(&self) -> String {
        self.id.clone()
    }

    fn resource_type(&self) -> &'static str {
        "AWS::ApiGatewayV2::DomainName"
    }

    fn description(&self) -> String {
        format!("API domain {}", self.domain_name)
    }

    fn properties(&self) -> Result<Value> {
        validate_domain(&self.id, &self.domain_name)?;
        Ok(json!({
            "DomainName": self.domain_name,
            "DomainNameConfigurations": [{
                "CertificateArn": self.certificate_arn,
                "EndpointType": "REGIONAL",
            }],
        }))
    }
}

/// Maps a custom domain onto an API stage
#[derive(Debug, Clone)]
pub struct ApiMapping {
    pub id: String,
    pub api_id: String,
    pub domain_id: String,
    pub stage_id: String,
}

impl Resource for ApiMapping {
    fn logical_id(&self) -> String {
        self.id.clone()
    }

    fn resource_type(&self) -> &'static str {
        "AWS::ApiGatewayV2::ApiMapping"
    }

    fn description(&self) -> String {
        format!("Mapping {} -> {}", self.domain_id, self.api_id)
    }

    fn properties(&self) -> Result<Value> {
        Ok(json!({
            "ApiId": intrinsic::reference(&self.api_id),
            "DomainName": intrinsic::reference(&self.domain_id),
            "Stage": intrinsic::reference(&self.stage_id),
        }))
    }
}
