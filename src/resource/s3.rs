//! S3 buckets and bucket policies

use serde_json::{Value, json};

use super::iam::{PolicyDocument, PolicyStatement};
use super::{Resource, Result, intrinsic};

/// Public access block settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPublicAccess {
    pub block_public_acls: bool,
    pub block_public_policy: bool,
    pub ignore_public_acls: bool,
    pub restrict_public_buckets: bool,
}

impl BlockPublicAccess {
    /// Every public access path blocked
    pub const BLOCK_ALL: Self = Self {
        block_public_acls: true,
        block_public_policy: true,
        ignore_public_acls: true,
        restrict_public_buckets: true,
    };

    fn to_json(self) -> Value {
        json!({
            "BlockPublicAcls": self.block_public_acls,
            "BlockPublicPolicy": self.block_public_policy,
            "IgnorePublicAcls": self.ignore_public_acls,
            "RestrictPublicBuckets": self.restrict_public_buckets,
        })
    }
}

/// An S3 bucket
#[derive(Debug, Clone)]
pub struct Bucket {
    pub id: String,
    pub versioned: bool,
    pub block_public_access: Option<BlockPublicAccess>,
}

impl Bucket {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            versioned: false,
            block_public_access: None,
        }
    }

    pub fn versioned(mut self, versioned: bool) -> Self {
        self.versioned = versioned;
        self
    }

    pub fn with_block_public_access(mut self, block: BlockPublicAccess) -> Self {
        self.block_public_access = Some(block);
        self
    }

    /// Bucket ARN
    pub fn arn(&self) -> Value {
        intrinsic::get_att(&self.id, "Arn")
    }

    /// ARN covering every object in the bucket (`<arn>/*`)
    pub fn objects_arn(&self) -> Value {
        self.arn_for_objects("*")
    }

    /// ARN for keys matching a pattern
    pub fn arn_for_objects(&self, key_pattern: &str) -> Value {
        intrinsic::join("", vec![self.arn(), json!(format!("/{key_pattern}"))])
    }

    /// Regional domain name, used as a CDN origin
    pub fn regional_domain_name(&self) -> Value {
        intrinsic::get_att(&self.id, "RegionalDomainName")
    }
}

impl Resource for Bucket {
    fn logical_id(&self) -> String {
        self.id.clone()
    }

    fn resource_type(&self) -> &'static str {
        "AWS::S3::Bucket"
    }

    fn description(&self) -> String {
        format!(
            "Bucket {}{}",
            self.id,
            if self.versioned { " (versioned)" } else { "" }
        )
    }

    fn properties(&self) -> Result<Value> {
        let mut props = json!({});
        if let Some(block) = self.block_public_access {
            props["PublicAccessBlockConfiguration"] = block.to_json();
        }
        if self.versioned {
            props["VersioningConfiguration"] = json!({ "Status": "Enabled" });
        }
        Ok(props)
    }
}

/// Resource policy on a bucket
#[derive(Debug, Clone)]
pub struct BucketPolicy {
    pub id: String,
    pub bucket_id: String,
    pub document: PolicyDocument,
}

impl BucketPolicy {
    /// Policy for `bucket` with a single statement; more can be pushed later
    pub fn new(bucket: &Bucket, statement: PolicyStatement) -> Self {
        Self {
            id: format!("{}Policy", bucket.id),
            bucket_id: bucket.id.clone(),
            document: PolicyDocument::new(vec![statement]),
        }
    }
}

impl Resource for BucketPolicy {
    fn logical_id(&self) -> String {
        self.id.clone()
    }

    fn resource_type(&self) -> &'static str {
        "AWS::S3::BucketPolicy"
    }

    fn description(&self) -> String {
        format!("Resource policy on {}", self.bucket_id)
    }

    fn properties(&self) -> Result<Value> {
        self.document.validate(&self.id)?;
        Ok(json!({
            "Bucket": intrinsic::reference(&self.bucket_id),
            "PolicyDocument": self.document.to_json(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versioned_bucket_properties() {
        let bucket = Bucket::new("FrontEndBucket")
            .versioned(true)
            .with_block_public_access(BlockPublicAccess::BLOCK_ALL);
        let props = bucket.properties().unwrap();
        assert_eq!(props["VersioningConfiguration"], json!({ "Status": "Enabled" }));
        assert_eq!(props["PublicAccessBlockConfiguration"]["RestrictPublicBuckets"], json!(true));
        // Rendering again never flips versioning off
        assert_eq!(bucket.properties().unwrap(), props);
    }

    #[test]
    fn test_plain_bucket_has_no_versioning() {
        let props = Bucket::new("Scratch").properties().unwrap();
        assert_eq!(props, json!({}));
    }

    #[test]
    fn test_objects_arn() {
        let bucket = Bucket::new("B");
        assert_eq!(
            bucket.objects_arn(),
            json!({ "Fn::Join": ["", [{ "Fn::GetAtt": ["B", "Arn"] }, "/*"]] })
        );
    }

    #[test]
    fn test_bucket_policy_references_bucket() {
        let bucket = Bucket::new("B");
        let policy = BucketPolicy::new(
            &bucket,
            PolicyStatement::allow(["s3:GetObject"], [bucket.objects_arn()]),
        );
        let props = policy.properties().unwrap();
        assert_eq!(props["Bucket"], json!({ "Ref": "B" }));
        assert_eq!(policy.logical_id(), "BPolicy");
    }
}
