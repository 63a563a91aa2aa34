//! AWS resource declarations
//!
//! Every piece of infrastructure is modeled as a [`Resource`] with:
//! - A logical id and provider type
//! - A property bag rendered on demand (validated locally)
//! - References to other resources through intrinsics only
//!
//! Builders and variants beyond what the Mira HQ stack declares are kept for
//! policy checks and tests.

#![allow(dead_code)]

pub mod acm;
pub mod apigateway;
pub mod cloudfront;
pub mod iam;
pub mod lambda;
pub mod logs;
pub mod route53;
pub mod s3;

pub use declarative::{Error, Resource, Result, intrinsic};

use regex::Regex;
use serde_json::{Value, json};
use std::sync::LazyLock;
use std::time::Duration;

static DOMAIN_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").expect("valid regex"));

/// Check that `name` is a plausible DNS name, optionally with a leading `*.`
///
/// Mirrors what the provider rejects outright: empty labels, labels over
/// 63 characters, names over 253 characters, single-label names, upper
/// case, and characters outside `[a-z0-9-]`.
pub fn validate_domain(resource: &str, name: &str) -> Result<()> {
    let invalid = |why: &str| Err(Error::invalid(resource, format!("domain '{name}' {why}")));

    let bare = name.strip_prefix("*.").unwrap_or(name);
    let bare = bare.strip_suffix('.').unwrap_or(bare);
    if bare.is_empty() || bare.len() > 253 {
        return invalid("must be 1-253 characters");
    }
    let labels: Vec<&str> = bare.split('.').collect();
    if labels.len() < 2 {
        return invalid("must have at least two labels");
    }
    if let Some(label) = labels.iter().find(|l| !DOMAIN_LABEL.is_match(l)) {
        return invalid(&format!("has invalid label '{label}'"));
    }
    Ok(())
}

/// Fully qualified form with a trailing dot
pub fn fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}

/// Seconds in a duration, as the template expects them
pub fn seconds(duration: Duration) -> u64 {
    duration.as_secs()
}

/// Render a list as a scalar when it has one element
///
/// Policy documents accept either form; single values stay compact.
pub fn scalar_or_list(values: &[Value]) -> Value {
    match values {
        [single] => single.clone(),
        _ => json!(values),
    }
}

/// `arn:<partition>:<service>:<region>:<account>:<suffix...>` as a join
pub fn regional_arn(service: &str, suffix: Vec<Value>) -> Value {
    let mut parts = vec![
        json!("arn:"),
        intrinsic::pseudo("Partition"),
        json!(format!(":{service}:")),
        intrinsic::pseudo("Region"),
        json!(":"),
        intrinsic::pseudo("AccountId"),
        json!(":"),
    ];
    parts.extend(suffix);
    intrinsic::join("", parts)
}

/// `arn:<partition>:iam::aws:policy/<name>` for an AWS managed policy
pub fn aws_managed_policy_arn(name: &str) -> Value {
    intrinsic::join(
        "",
        vec![
            json!("arn:"),
            intrinsic::pseudo("Partition"),
            json!(format!(":iam::aws:policy/{name}")),
        ],
    )
}
