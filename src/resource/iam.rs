//! IAM policies, users and roles
//!
//! Statements are `(effect, actions, resources, condition)` tuples. Besides
//! rendering them, this module evaluates them the way the provider does for
//! identity policies: wildcards grant broadly, statements on one identity
//! are unioned, and an explicit deny always wins.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fmt;

use super::{Error, Resource, Result, aws_managed_policy_arn, intrinsic, scalar_or_list};

/// Policy language version
pub const POLICY_VERSION: &str = "2012-10-17";

/// Effect of a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "Allow"),
            Self::Deny => write!(f, "Deny"),
        }
    }
}

/// Outcome of evaluating a request against policies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// At least one statement allows and none deny
    Allow,
    /// A statement explicitly denies
    Deny,
    /// Nothing matched (implicit deny)
    NotApplicable,
}

/// A request to evaluate: action, resource and condition context
#[derive(Debug, Clone)]
pub struct Request {
    pub action: String,
    /// A concrete ARN string, or the same intrinsic a statement embeds
    pub resource: Value,
    /// Condition keys available to the request (e.g. `aws:CalledVia`)
    pub context: BTreeMap<String, Vec<String>>,
}

impl Request {
    pub fn new(action: impl Into<String>, resource: impl Into<Value>) -> Self {
        Self {
            action: action.into(),
            resource: resource.into(),
            context: BTreeMap::new(),
        }
    }

    /// Add a condition key value
    pub fn with_context(mut self, key: &str, values: &[&str]) -> Self {
        self.context.insert(
            key.to_string(),
            values.iter().map(|v| (*v).to_string()).collect(),
        );
        self
    }
}

/// One statement of a policy document
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyStatement {
    pub effect: Effect,
    pub actions: Vec<String>,
    pub resources: Vec<Value>,
    /// Optional resource-policy principal (e.g. `{"CanonicalUser": ...}`)
    pub principal: Option<Value>,
    /// operator -> key -> values
    pub conditions: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl PolicyStatement {
    /// An allow statement over literal or intrinsic resources
    pub fn allow<A, R>(actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<Value>,
    {
        Self {
            effect: Effect::Allow,
            actions: actions.into_iter().map(Into::into).collect(),
            resources: resources.into_iter().map(Into::into).collect(),
            principal: None,
            conditions: BTreeMap::new(),
        }
    }

    /// A deny statement
    pub fn deny<A, R>(actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<Value>,
    {
        Self {
            effect: Effect::Deny,
            ..Self::allow(actions, resources)
        }
    }

    /// Attach a condition
    pub fn with_condition(mut self, operator: &str, key: &str, values: &[&str]) -> Self {
        self.conditions
            .entry(operator.to_string())
            .or_default()
            .insert(
                key.to_string(),
                values.iter().map(|v| (*v).to_string()).collect(),
            );
        self
    }

    /// Attach a principal
    pub fn with_principal(mut self, principal: Value) -> Self {
        self.principal = Some(principal);
        self
    }

    /// Reject statements the provider would refuse
    pub fn validate(&self, resource: &str) -> Result<()> {
        if self.actions.is_empty() {
            return Err(Error::invalid(resource, "policy statement has no actions"));
        }
        if self.resources.is_empty() {
            return Err(Error::invalid(resource, "policy statement has no resources"));
        }
        if let Some(bad) = self
            .actions
            .iter()
            .find(|a| a.as_str() != "*" && !a.contains(':'))
        {
            return Err(Error::invalid(
                resource,
                format!("action '{bad}' must be '*' or 'service:Action'"),
            ));
        }
        Ok(())
    }

    /// Render as a policy document statement
    pub fn to_json(&self) -> Value {
        let mut statement = Map::new();
        let actions: Vec<Value> = self.actions.iter().map(|a| json!(a)).collect();
        statement.insert("Action".into(), scalar_or_list(&actions));
        if !self.conditions.is_empty() {
            statement.insert("Condition".into(), json!(self.conditions));
        }
        statement.insert("Effect".into(), json!(self.effect));
        if let Some(principal) = &self.principal {
            statement.insert("Principal".into(), principal.clone());
        }
        statement.insert("Resource".into(), scalar_or_list(&self.resources));
        Value::Object(statement)
    }

    /// Whether this statement covers the request
    pub fn matches(&self, request: &Request) -> bool {
        self.actions
            .iter()
            .any(|a| wildcard_match(a, &request.action, true))
            && self
                .resources
                .iter()
                .any(|r| resource_matches(r, &request.resource))
            && self.conditions_hold(&request.context)
    }

    fn conditions_hold(&self, context: &BTreeMap<String, Vec<String>>) -> bool {
        self.conditions.iter().all(|(operator, keys)| {
            keys.iter().all(|(key, expected)| {
                let actual = context.get(key).map(Vec::as_slice).unwrap_or_default();
                condition_holds(operator, expected, actual)
            })
        })
    }
}

/// Evaluate a single condition operator
///
/// A key missing from the request satisfies negated operators and nothing
/// else. Unsupported operators never hold.
fn condition_holds(operator: &str, expected: &[String], actual: &[String]) -> bool {
    let (set_op, base) = match operator.split_once(':') {
        Some((set_op, base)) => (Some(set_op), base),
        None => (None, operator),
    };
    let one = |value: &String| -> bool {
        match base {
            "StringEquals" => expected.iter().any(|e| e == value),
            "StringLike" => expected.iter().any(|e| wildcard_match(e, value, false)),
            "StringNotEquals" => expected.iter().all(|e| e != value),
            "StringNotLike" => expected.iter().all(|e| !wildcard_match(e, value, false)),
            _ => false,
        }
    };
    match set_op {
        Some("ForAnyValue") => actual.iter().any(one),
        Some("ForAllValues") => actual.iter().all(one),
        None if actual.is_empty() => matches!(base, "StringNotEquals" | "StringNotLike"),
        None => actual.iter().all(one),
        Some(_) => false,
    }
}

fn resource_matches(pattern: &Value, resource: &Value) -> bool {
    match (pattern, resource) {
        (Value::String(p), Value::String(r)) => wildcard_match(p, r, false),
        (Value::String(p), _) => p == "*",
        (p, r) => p == r,
    }
}

/// Match `value` against an IAM pattern with `*` and `?` wildcards
///
/// Actions compare case-insensitively, resources case-sensitively.
pub fn wildcard_match(pattern: &str, value: &str, case_insensitive: bool) -> bool {
    if pattern == "*" {
        return true;
    }
    let mut regex = String::from(if case_insensitive { "(?i)^" } else { "^" });
    for c in pattern.chars() {
        match c {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            c => regex.push_str(&regex::escape(&c.to_string())),
        }
    }
    regex.push('$');
    Regex::new(&regex).is_ok_and(|re| re.is_match(value))
}

/// A list of statements
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyDocument {
    pub statements: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new(statements: Vec<PolicyStatement>) -> Self {
        Self { statements }
    }

    /// Render the document
    pub fn to_json(&self) -> Value {
        json!({
            "Statement": self.statements.iter().map(PolicyStatement::to_json).collect::<Vec<_>>(),
            "Version": POLICY_VERSION,
        })
    }

    /// Validate every statement
    pub fn validate(&self, resource: &str) -> Result<()> {
        if self.statements.is_empty() {
            return Err(Error::invalid(resource, "policy document has no statements"));
        }
        self.statements.iter().try_for_each(|s| s.validate(resource))
    }

    /// Evaluate a request against this document alone
    pub fn evaluate(&self, request: &Request) -> Decision {
        evaluate(self.statements.iter(), request)
    }

    /// Union of the literal and intrinsic resources of all allow statements
    pub fn allowed_resources(&self) -> Vec<Value> {
        let mut resources: Vec<Value> = Vec::new();
        for statement in self.statements.iter().filter(|s| s.effect == Effect::Allow) {
            for r in &statement.resources {
                if !resources.contains(r) {
                    resources.push(r.clone());
                }
            }
        }
        resources
    }
}

fn evaluate<'a>(statements: impl Iterator<Item = &'a PolicyStatement>, request: &Request) -> Decision {
    let mut decision = Decision::NotApplicable;
    for statement in statements.filter(|s| s.matches(request)) {
        match statement.effect {
            Effect::Deny => return Decision::Deny,
            Effect::Allow => decision = Decision::Allow,
        }
    }
    decision
}

/// Trust policy letting a service assume a role
fn service_trust_policy(service: &str) -> Value {
    json!({
        "Statement": [{
            "Action": "sts:AssumeRole",
            "Effect": "Allow",
            "Principal": { "Service": service },
        }],
        "Version": POLICY_VERSION,
    })
}

// ============================================================================
// Resources
// ============================================================================

/// Customer managed policy
#[derive(Debug, Clone)]
pub struct ManagedPolicy {
    pub id: String,
    pub description: Option<String>,
    pub document: PolicyDocument,
}

impl ManagedPolicy {
    pub fn new(id: impl Into<String>, statements: Vec<PolicyStatement>) -> Self {
        Self {
            id: id.into(),
            description: None,
            document: PolicyDocument::new(statements),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The policy ARN
    pub fn arn(&self) -> Value {
        intrinsic::reference(&self.id)
    }
}

impl Resource for ManagedPolicy {
    fn logical_id(&self) -> String {
        self.id.clone()
    }

    fn resource_type(&self) -> &'static str {
        "AWS::IAM::ManagedPolicy"
    }

    fn description(&self) -> String {
        format!("Managed policy with {} statements", self.document.statements.len())
    }

    fn properties(&self) -> Result<Value> {
        self.document.validate(&self.id)?;
        let mut props = json!({
            "Path": "/",
            "PolicyDocument": self.document.to_json(),
        });
        if let Some(description) = &self.description {
            props["Description"] = json!(description);
        }
        Ok(props)
    }
}

/// IAM user with attached managed policies
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub user_name: String,
    pub policies: Vec<ManagedPolicy>,
}

impl User {
    pub fn new(id: impl Into<String>, user_name: impl Into<String>, policies: Vec<ManagedPolicy>) -> Self {
        Self {
            id: id.into(),
            user_name: user_name.into(),
            policies,
        }
    }

    /// Evaluate a request across every attached policy
    ///
    /// Grants from different policies add up; a deny anywhere wins.
    pub fn evaluate(&self, request: &Request) -> Decision {
        evaluate(
            self.policies.iter().flat_map(|p| p.document.statements.iter()),
            request,
        )
    }

    /// Shorthand for `evaluate(..) == Decision::Allow`
    pub fn is_allowed(&self, request: &Request) -> bool {
        self.evaluate(request) == Decision::Allow
    }
}

impl Resource for User {
    fn logical_id(&self) -> String {
        self.id.clone()
    }

    fn resource_type(&self) -> &'static str {
        "AWS::IAM::User"
    }

    fn description(&self) -> String {
        format!("IAM user {}", self.user_name)
    }

    fn properties(&self) -> Result<Value> {
        let valid_name = !self.user_name.is_empty()
            && self.user_name.len() <= 64
            && self
                .user_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "+=,.@_-".contains(c));
        if !valid_name {
            return Err(Error::invalid(
                &self.id,
                format!("invalid user name '{}'", self.user_name),
            ));
        }
        let arns: Vec<Value> = self.policies.iter().map(ManagedPolicy::arn).collect();
        Ok(json!({
            "ManagedPolicyArns": arns,
            "UserName": self.user_name,
        }))
    }
}

/// Role assumed by an AWS service
#[derive(Debug, Clone)]
pub struct ServiceRole {
    pub id: String,
    pub service: String,
    /// Names of AWS managed policies (e.g. "service-role/AWSLambdaBasicExecutionRole")
    pub managed_policies: Vec<String>,
}

impl ServiceRole {
    pub fn new(id: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            service: service.into(),
            managed_policies: Vec::new(),
        }
    }

    pub fn with_managed_policy(mut self, name: &str) -> Self {
        self.managed_policies.push(name.to_string());
        self
    }

    pub fn arn(&self) -> Value {
        intrinsic::get_att(&self.id, "Arn")
    }
}

impl Resource for ServiceRole {
    fn logical_id(&self) -> String {
        self.id.clone()
    }

    fn resource_type(&self) -> &'static str {
        "AWS::IAM::Role"
    }

    fn description(&self) -> String {
        format!("Role assumed by {}", self.service)
    }

    fn properties(&self) -> Result<Value> {
        let mut props = json!({
            "AssumeRolePolicyDocument": service_trust_policy(&self.service),
        });
        if !self.managed_policies.is_empty() {
            let arns: Vec<Value> = self
                .managed_policies
                .iter()
                .map(|name| aws_managed_policy_arn(name))
                .collect();
            props["ManagedPolicyArns"] = json!(arns);
        }
        Ok(props)
    }
}
