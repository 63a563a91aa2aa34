//! Lambda function and invoke permission

use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;

use super::iam::ServiceRole;
use super::s3::Bucket;
use super::{Error, Resource, Result, intrinsic};

/// Smallest and largest memory sizes the provider accepts, in MB
pub const MEMORY_RANGE_MB: std::ops::RangeInclusive<u32> = 128..=10240;

/// Managed runtimes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runtime {
    Nodejs14x,
    Nodejs16x,
    Nodejs18x,
    Nodejs20x,
    Python311,
    Python312,
    ProvidedAl2,
    ProvidedAl2023,
}

impl Runtime {
    /// Identifier used in templates
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nodejs14x => "nodejs14.x",
            Self::Nodejs16x => "nodejs16.x",
            Self::Nodejs18x => "nodejs18.x",
            Self::Nodejs20x => "nodejs20.x",
            Self::Python311 => "python3.11",
            Self::Python312 => "python3.12",
            Self::ProvidedAl2 => "provided.al2",
            Self::ProvidedAl2023 => "provided.al2023",
        }
    }

    /// Get all supported runtimes
    pub fn all() -> &'static [Runtime] {
        &[
            Self::Nodejs14x,
            Self::Nodejs16x,
            Self::Nodejs18x,
            Self::Nodejs20x,
            Self::Python311,
            Self::Python312,
            Self::ProvidedAl2,
            Self::ProvidedAl2023,
        ]
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Runtime {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|r| r.name() == s)
            .ok_or_else(|| format!("unsupported runtime '{s}'"))
    }
}

/// X-Ray tracing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tracing {
    Active,
    PassThrough,
}

impl Tracing {
    fn as_str(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::PassThrough => "PassThrough",
        }
    }
}

/// Code archive stored in a bucket
#[derive(Debug, Clone)]
pub struct S3Code {
    pub bucket_id: String,
    pub key: String,
}

impl S3Code {
    pub fn from_bucket(bucket: &Bucket, key: impl Into<String>) -> Self {
        Self {
            bucket_id: bucket.id.clone(),
            key: key.into(),
        }
    }
}

/// A serverless function
#[derive(Debug, Clone)]
pub struct Function {
    pub id: String,
    pub function_name: String,
    pub runtime: Runtime,
    pub handler: String,
    pub code: S3Code,
    pub memory_mb: u32,
    pub tracing: Tracing,
    pub role_id: String,
}

impl Function {
    /// Function ARN
    pub fn arn(&self) -> Value {
        intrinsic::get_att(&self.id, "Arn")
    }

    /// Function name as assigned at deploy time
    pub fn name(&self) -> Value {
        intrinsic::reference(&self.id)
    }
}

impl Resource for Function {
    fn logical_id(&self) -> String {
        self.id.clone()
    }

    fn resource_type(&self) -> &'static str {
        "AWS::Lambda::Function"
    }

    fn description(&self) -> String {
        format!("Function {} ({})", self.function_name, self.runtime)
    }

    fn properties(&self) -> Result<Value> {
        if !MEMORY_RANGE_MB.contains(&self.memory_mb) {
            return Err(Error::invalid(
                &self.id,
                format!("memory size {} MB outside 128-10240", self.memory_mb),
            ));
        }
        if self.handler.is_empty() || self.handler.len() > 128 {
            return Err(Error::invalid(&self.id, "handler must be 1-128 characters"));
        }
        if self.code.key.is_empty() {
            return Err(Error::invalid(&self.id, "code key is empty"));
        }
        let valid_name = !self.function_name.is_empty()
            && self.function_name.len() <= 64
            && self
                .function_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid_name {
            return Err(Error::invalid(
                &self.id,
                format!("invalid function name '{}'", self.function_name),
            ));
        }

        Ok(json!({
            "Code": {
                "S3Bucket": intrinsic::reference(&self.code.bucket_id),
                "S3Key": self.code.key,
            },
            "FunctionName": self.function_name,
            "Handler": self.handler,
            "MemorySize": self.memory_mb,
            "Role": intrinsic::get_att(&self.role_id, "Arn"),
            "Runtime": self.runtime.name(),
            "TracingConfig": { "Mode": self.tracing.as_str() },
        }))
    }
}

/// Execution role for a function with basic logging permissions
///
/// Active tracing also needs trace uploads, granted on the role itself so the
/// function cannot be created before the grant exists.
pub fn execution_role(id: impl Into<String>, tracing: Tracing) -> ServiceRole {
    let role = ServiceRole::new(id, "lambda.amazonaws.com")
        .with_managed_policy("service-role/AWSLambdaBasicExecutionRole");
    match tracing {
        Tracing::Active => role.with_managed_policy("AWSXRayDaemonWriteAccess"),
        Tracing::PassThrough => role,
    }
}

/// Lets a service principal invoke a function
#[derive(Debug, Clone)]
pub struct Permission {
    pub id: String,
    pub function_arn: Value,
    pub principal: String,
    pub source_arn: Option<Value>,
}

impl Resource for Permission {
    fn logical_id(&self) -> String {
        self.id.clone()
    }

    fn resource_type(&self) -> &'static str {
        "AWS::Lambda::Permission"
    }

    fn description(&self) -> String {
        format!("Invoke permission for {}", self.principal)
    }

    fn properties(&self) -> Result<Value> {
        let mut props = json!({
            "Action": "lambda:InvokeFunction",
            "FunctionName": self.function_arn,
            "Principal": self.principal,
        });
        if let Some(source) = &self.source_arn {
            props["SourceArn"] = source.clone();
        }
        Ok(props)
    }
}
