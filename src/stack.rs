//! The Mira HQ stack: static front-end behind a CDN plus an HTTP API
//!
//! Resources are declared in the order a reader would follow them; the
//! graph derives every dependency from the references embedded in their
//! properties.

use serde_json::json;
use std::time::Duration;

use declarative::{
    Error, NoProgress, ResourceGraph, Result, SynthContext, SynthObserver, Template, synthesize,
};

use crate::config::StackConfig;
use crate::resource::acm::Certificate;
use crate::resource::apigateway::{
    ApiDomainName, ApiMapping, CorsPreflight, DEFAULT_ROUTE, HttpApi, HttpMethod,
    LambdaProxyIntegration, PayloadFormatVersion, Route, Stage,
};
use crate::resource::cloudfront::{
    CachePolicy, Distribution, ErrorResponse, OriginAccessIdentity, S3Origin,
};
use crate::resource::iam::{ManagedPolicy, PolicyStatement, User};
use crate::resource::lambda::{self, Function, Permission, Runtime, S3Code, Tracing};
use crate::resource::logs::FunctionLogGroup;
use crate::resource::route53::{AliasRecord, AliasTarget, HostedZone};
use crate::resource::s3::{BlockPublicAccess, Bucket, BucketPolicy};

/// Staging buckets the provisioning toolkit uploads assets to
pub const TOOLKIT_STAGING_BUCKETS: &str = "arn:aws:s3:::cdktoolkit-stagingbucket-*";

/// Actions the deployment user needs to ship new function code
pub const FUNCTION_DEPLOY_ACTIONS: [&str; 3] = [
    "lambda:UpdateFunctionCode",
    "lambda:CreateFunction",
    "lambda:UpdateFunctionConfiguration",
];

/// A declared stack, ready to synthesize
#[derive(Debug)]
pub struct Stack {
    pub graph: ResourceGraph,
    pub context: SynthContext,
    /// IAM users declared in the graph, kept typed for policy checks
    pub users: Vec<User>,
}

impl Stack {
    /// Find a user by logical id or user name
    pub fn user(&self, name: &str) -> Option<&User> {
        self.users
            .iter()
            .find(|u| u.id == name || u.user_name == name)
    }

    /// Synthesize with progress reporting
    pub fn synthesize<O: SynthObserver>(&self, observer: &mut O) -> Result<Template> {
        synthesize(&self.graph, &self.context, observer)
    }

    /// Synthesize silently
    pub fn template(&self) -> Result<Template> {
        self.synthesize(&mut NoProgress)
    }
}

// ============================================================================
// IAM identities for deployment automation
// ============================================================================

/// Policy letting the provisioning engine act on behalf of the user
///
/// Anything is allowed, but only when the call goes through the engine.
pub fn cdk_deployment_policy() -> ManagedPolicy {
    ManagedPolicy::new(
        "CdkDeploymentPolicy",
        vec![
            PolicyStatement::allow(["cloudformation:*"], ["*"]),
            PolicyStatement::allow(["*"], ["*"]).with_condition(
                "ForAnyValue:StringEquals",
                "aws:CalledVia",
                &["cloudformation.amazonaws.com"],
            ),
            PolicyStatement::allow(["s3:*"], [TOOLKIT_STAGING_BUCKETS]),
        ],
    )
    .with_description("Deploys the stack through the provisioning engine")
}

/// Policy for CI uploads of front-end assets and function code
pub fn s3_deployment_policy(front_end: &Bucket, function: Option<&Function>) -> ManagedPolicy {
    let mut statements = vec![PolicyStatement::allow(
        ["s3:*"],
        [front_end.arn(), front_end.objects_arn()],
    )];
    if let Some(function) = function {
        statements.push(PolicyStatement::allow(
            FUNCTION_DEPLOY_ACTIONS,
            [function.arn()],
        ));
    }
    ManagedPolicy::new("S3DeploymentPolicy", statements)
        .with_description("Uploads the front-end and updates the backend function")
}

// ============================================================================
// Stack
// ============================================================================

/// Declare the whole stack described by `config`
pub fn build(config: &StackConfig) -> Result<Stack> {
    let mut graph = ResourceGraph::new();
    let mut context = SynthContext::new(&config.stack_name);
    if let Some(description) = &config.description {
        context = context.with_description(description);
    }
    let site = &config.site;

    // Deployment through the provisioning engine
    let cdk_policy = cdk_deployment_policy();
    let cdk_user = User::new("CdkDeploymentUser", "CdkDeploymentUser", vec![cdk_policy.clone()]);
    graph.add(Box::new(cdk_policy))?;
    graph.add(Box::new(cdk_user.clone()))?;

    // Front-end bucket, readable only through the CDN
    let bucket = Bucket::new("FrontEndBucket")
        .versioned(site.versioned)
        .with_block_public_access(BlockPublicAccess::BLOCK_ALL);
    let identity = OriginAccessIdentity::new("OriginAccessIdentity", &site.comment);
    let bucket_policy = BucketPolicy::new(
        &bucket,
        PolicyStatement::allow(["s3:GetObject"], [bucket.objects_arn()])
            .with_principal(identity.grant_principal()),
    );
    graph.add(Box::new(bucket.clone()))?;
    graph.add(Box::new(identity.clone()))?;
    graph.add(Box::new(bucket_policy))?;

    // DNS and TLS
    let zone = HostedZone::new("HostedZone", &site.domain);
    let certificate = Certificate::with_wildcard("Certificate", &site.domain, &zone);
    graph.add(Box::new(zone.clone()))?;
    graph.add(Box::new(certificate.clone()))?;

    // CDN
    let cache_policy = CachePolicy::single_variant(
        "CachePolicy",
        format!("{}-CachePolicy", config.stack_name),
        Duration::from_secs(site.default_ttl_secs),
    );
    let distribution = Distribution {
        id: "Distribution".to_string(),
        aliases: vec![site.domain.clone()],
        comment: site.comment.clone(),
        origin: S3Origin::new(&bucket, &identity),
        cache_policy_id: cache_policy.id.clone(),
        compress: true,
        default_root_object: Some(site.root_object.clone()),
        enable_ipv6: true,
        certificate_arn: Some(certificate.arn()),
        enabled: true,
        error_responses: ErrorResponse::spa_fallback(
            &site.fallback_path,
            Duration::from_secs(site.error_ttl_secs),
        ),
    };
    graph.add(Box::new(cache_policy))?;
    graph.add(Box::new(distribution.clone()))?;
    graph.add(Box::new(AliasRecord::a(
        "RecordSet",
        &zone,
        None,
        AliasTarget::cloudfront(&distribution),
    )))?;

    context.add_output(
        "DistributionDomainName",
        "Domain name assigned to the distribution",
        distribution.domain_name(),
    )?;
    context.add_output(
        "SiteUrl",
        "Public URL of the front-end",
        json!(format!("https://{}", site.domain)),
    )?;
    context.add_output(
        "NameServers",
        "Name servers to delegate the domain to",
        declarative::intrinsic::join_list(",", zone.name_servers()),
    )?;

    let function = if config.api.enabled {
        Some(declare_api(config, &mut graph, &mut context, &zone, &certificate)?)
    } else {
        log::debug!("API disabled, declaring the front-end only");
        None
    };

    // CI uploads
    let s3_policy = s3_deployment_policy(&bucket, function.as_ref());
    graph.add(Box::new(s3_policy.clone()))?;
    let s3_user = User::new("S3DeploymentUser", "S3DeploymentUser", vec![s3_policy]);
    graph.add(Box::new(s3_user.clone()))?;

    log::info!(
        "Declared {} resources for {}",
        graph.len(),
        config.stack_name
    );
    Ok(Stack {
        graph,
        context,
        users: vec![cdk_user, s3_user],
    })
}

/// Declare the backend: code bucket, function, HTTP API and its domain
fn declare_api(
    config: &StackConfig,
    graph: &mut ResourceGraph,
    context: &mut SynthContext,
    zone: &HostedZone,
    certificate: &Certificate,
) -> Result<Function> {
    let api = &config.api;

    let code_bucket = Bucket::new("CodeBucket")
        .versioned(config.site.versioned)
        .with_block_public_access(BlockPublicAccess::BLOCK_ALL);
    graph.add(Box::new(code_bucket.clone()))?;

    // Function and its permissions
    let tracing = if api.tracing {
        Tracing::Active
    } else {
        Tracing::PassThrough
    };
    let role = lambda::execution_role("LambdaFunctionRole", tracing);
    let runtime: Runtime = api
        .runtime
        .parse()
        .map_err(|e: String| Error::invalid("LambdaFunction", e))?;
    let function = Function {
        id: "LambdaFunction".to_string(),
        function_name: api.function_name.clone(),
        runtime,
        handler: api.handler.clone(),
        code: S3Code::from_bucket(&code_bucket, &api.code_key),
        memory_mb: api.memory_mb,
        tracing,
        role_id: role.id.clone(),
    };
    graph.add(Box::new(role.clone()))?;
    graph.add(Box::new(function.clone()))?;
    graph.add(Box::new(FunctionLogGroup::new(
        &function,
        api.log_retention_days,
    )))?;

    // HTTP API with the function as default integration
    let domain = ApiDomainName::new("ApiDomainName", config.api_domain(), certificate);
    graph.add(Box::new(domain.clone()))?;

    let methods = api
        .cors
        .allow_methods
        .iter()
        .map(|m| m.parse::<HttpMethod>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::invalid("HttpApi", e))?;
    let http_api = HttpApi {
        id: "HttpApi".to_string(),
        name: "HttpApi".to_string(),
        cors: Some(CorsPreflight {
            allow_credentials: api.cors.allow_credentials,
            allow_headers: api.cors.allow_headers.clone(),
            allow_methods: methods,
            allow_origins: api.cors.origins(&config.site.domain),
            expose_headers: api.cors.expose_headers.clone(),
            max_age: Duration::from_secs(api.cors.max_age_secs),
        }),
    };
    let payload_format = match api.payload_format.as_str() {
        "1.0" => PayloadFormatVersion::V1,
        "2.0" => PayloadFormatVersion::V2,
        other => {
            return Err(Error::invalid(
                "HttpApiIntegration",
                format!("unsupported payload format version '{other}'"),
            ));
        }
    };
    let integration =
        LambdaProxyIntegration::new("HttpApiIntegration", &http_api, &function, payload_format);
    let route = Route {
        id: "HttpApiDefaultRoute".to_string(),
        api_id: http_api.id.clone(),
        route_key: DEFAULT_ROUTE.to_string(),
        integration_id: integration.id.clone(),
    };
    let stage = Stage {
        id: "HttpApiDefaultStage".to_string(),
        api_id: http_api.id.clone(),
        stage_name: DEFAULT_ROUTE.to_string(),
        auto_deploy: true,
    };
    let permission = Permission {
        id: "HttpApiInvokePermission".to_string(),
        function_arn: function.arn(),
        principal: "apigateway.amazonaws.com".to_string(),
        source_arn: Some(http_api.execute_arn()),
    };
    let mapping = ApiMapping {
        id: "HttpApiDefaultMapping".to_string(),
        api_id: http_api.id.clone(),
        domain_id: domain.id.clone(),
        stage_id: stage.id.clone(),
    };
    graph.add(Box::new(http_api.clone()))?;
    graph.add(Box::new(integration))?;
    graph.add(Box::new(route))?;
    graph.add(Box::new(stage))?;
    graph.add(Box::new(permission))?;
    graph.add(Box::new(mapping))?;

    graph.add(Box::new(AliasRecord::a(
        "LambdaRecordSet",
        zone,
        Some(api.subdomain.as_str()),
        AliasTarget::api_gateway_domain(&domain),
    )))?;

    context.add_output(
        "ApiUrl",
        "Public URL of the API",
        json!(format!("https://{}", config.api_domain())),
    )?;
    context.add_output(
        "ApiEndpoint",
        "Default endpoint of the HTTP API",
        declarative::intrinsic::get_att(&http_api.id, "ApiEndpoint"),
    )?;
    context.add_output(
        "FunctionName",
        "Name of the backend function",
        function.name(),
    )?;

    log::debug!(
        "Declared API {} -> function {}",
        config.api_domain(),
        function.function_name
    );
    Ok(function)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::iam::{Decision, Request};
    use declarative::intrinsic;
    use serde_json::Value;

    fn default_stack() -> Stack {
        build(&StackConfig::default()).unwrap()
    }

    fn front_end_only() -> StackConfig {
        let mut config = StackConfig::default();
        config.api.enabled = false;
        config
    }

    #[test]
    fn test_default_stack_synthesizes() {
        let template = default_stack().template().unwrap();
        assert_eq!(template.count_of("AWS::S3::Bucket"), 2);
        assert_eq!(template.count_of("AWS::CloudFront::Distribution"), 1);
        assert_eq!(template.count_of("AWS::Route53::RecordSet"), 2);
        assert_eq!(template.count_of("AWS::IAM::User"), 2);
        assert_eq!(template.count_of("AWS::Lambda::Function"), 1);
        assert_eq!(template.count_of("AWS::ApiGatewayV2::Api"), 1);
        assert!(template.outputs.contains_key("ApiUrl"));
        assert!(template.outputs.contains_key("NameServers"));
    }

    #[test]
    fn test_synthesis_is_byte_identical() {
        let first = default_stack().template().unwrap().to_json().unwrap();
        let second = default_stack().template().unwrap().to_json().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_order_respects_references() {
        let stack = default_stack();
        let order = stack.graph.topological_order().unwrap();
        let position = |id: &str| order.iter().position(|o| o == id).unwrap();
        let edges = stack.graph.edges().unwrap();
        assert!(!edges.is_empty());
        for (from, to) in edges {
            assert!(position(&to) < position(&from), "{from} must follow {to}");
        }
        assert!(position("FrontEndBucket") < position("Distribution"));
        assert!(position("Distribution") < position("RecordSet"));
        assert!(position("HostedZone") < position("Certificate"));
    }

    #[test]
    fn test_function_depends_on_trace_grant() {
        let stack = default_stack();
        let template = stack.template().unwrap();
        let edges = stack.graph.edges().unwrap();

        let mut reachable = std::collections::BTreeSet::new();
        let mut pending = vec!["LambdaFunction".to_string()];
        while let Some(id) = pending.pop() {
            for (_, to) in edges.iter().filter(|(from, _)| *from == id) {
                if reachable.insert(to.clone()) {
                    pending.push(to.clone());
                }
            }
        }

        let grants_traces = |id: &String| {
            template.resources[id]
                .properties
                .to_string()
                .contains("AWSXRayDaemonWriteAccess")
        };
        assert!(reachable.iter().any(grants_traces));
        assert_eq!(template.count_of("AWS::IAM::Policy"), 0);
        assert_eq!(
            template.resources["LambdaFunction"].properties["TracingConfig"],
            json!({ "Mode": "Active" })
        );
    }

    #[test]
    fn test_tracing_off_drops_trace_grant() {
        let mut config = StackConfig::default();
        config.api.tracing = false;
        let template = build(&config).unwrap().template().unwrap();
        let role = template.resources["LambdaFunctionRole"].properties.to_string();
        assert!(!role.contains("AWSXRayDaemonWriteAccess"));
        assert_eq!(
            template.resources["LambdaFunction"].properties["TracingConfig"],
            json!({ "Mode": "PassThrough" })
        );
    }

    #[test]
    fn test_name_servers_output() {
        let template = default_stack().template().unwrap();
        assert_eq!(
            template.outputs["NameServers"].value,
            json!({ "Fn::Join": [",", { "Fn::GetAtt": ["HostedZone", "NameServers"] }] })
        );
    }

    #[test]
    fn test_user_lookup() {
        let stack = default_stack();
        assert_eq!(stack.users.len(), 2);
        assert_eq!(stack.user("S3DeploymentUser").map(|u| u.id.as_str()), Some("S3DeploymentUser"));
        assert!(stack.user("CdkDeploymentUser").is_some());
        assert!(stack.user("Nobody").is_none());
    }

    #[test]
    fn test_cache_policy_single_variant() {
        let template = default_stack().template().unwrap();
        let params = &template.resources["CachePolicy"].properties["CachePolicyConfig"]
            ["ParametersInCacheKeyAndForwardedToOrigin"];
        assert_eq!(params["CookiesConfig"]["CookieBehavior"], json!("none"));
        assert_eq!(params["HeadersConfig"]["HeaderBehavior"], json!("none"));
        assert_eq!(params["QueryStringsConfig"]["QueryStringBehavior"], json!("none"));
        assert_eq!(
            template.resources["CachePolicy"].properties["CachePolicyConfig"]["DefaultTTL"],
            json!(300)
        );
    }

    #[test]
    fn test_buckets_stay_versioned() {
        for _ in 0..2 {
            let template = default_stack().template().unwrap();
            for (_, bucket) in template.resources_of("AWS::S3::Bucket") {
                assert_eq!(
                    bucket.properties["VersioningConfiguration"],
                    json!({ "Status": "Enabled" })
                );
            }
        }
    }

    #[test]
    fn test_error_remap_table() {
        let template = default_stack().template().unwrap();
        let responses = template.resources["Distribution"].properties["DistributionConfig"]
            ["CustomErrorResponses"]
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(
            responses,
            vec![
                json!({ "ErrorCachingMinTTL": 300, "ErrorCode": 404, "ResponseCode": 200, "ResponsePagePath": "/index.html" }),
                json!({ "ErrorCachingMinTTL": 300, "ErrorCode": 403, "ResponseCode": 200, "ResponsePagePath": "/index.html" }),
            ]
        );
    }

    #[test]
    fn test_distribution_wiring() {
        let template = default_stack().template().unwrap();
        let config = &template.resources["Distribution"].properties["DistributionConfig"];
        assert_eq!(
            config["Origins"][0]["DomainName"],
            intrinsic::get_att("FrontEndBucket", "RegionalDomainName")
        );
        assert_eq!(config["Aliases"], json!(["mira-hq.com"]));
        assert_eq!(
            config["ViewerCertificate"]["AcmCertificateArn"],
            intrinsic::reference("Certificate")
        );
        assert_eq!(config["DefaultRootObject"], json!("index.html"));
    }

    #[test]
    fn test_s3_deployment_policy_resources_exact() {
        let bucket = Bucket::new("FrontEndBucket");
        let stack = build(&StackConfig::default()).unwrap();
        let template = stack.template().unwrap();
        let statements = template.resources["S3DeploymentPolicy"].properties["PolicyDocument"]
            ["Statement"]
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(statements.len(), 2);
        assert_eq!(
            statements[0]["Resource"],
            json!([bucket.arn(), bucket.objects_arn()])
        );
        assert_eq!(
            statements[1]["Action"],
            json!([
                "lambda:UpdateFunctionCode",
                "lambda:CreateFunction",
                "lambda:UpdateFunctionConfiguration"
            ])
        );
        assert_eq!(
            statements[1]["Resource"],
            intrinsic::get_att("LambdaFunction", "Arn")
        );
    }

    #[test]
    fn test_s3_deployment_policy_without_function() {
        let bucket = Bucket::new("FrontEndBucket");
        let policy = s3_deployment_policy(&bucket, None);
        assert_eq!(
            policy.document.allowed_resources(),
            vec![bucket.arn(), bucket.objects_arn()]
        );
    }

    #[test]
    fn test_front_end_only_variant() {
        let stack = build(&front_end_only()).unwrap();
        let template = stack.template().unwrap();
        assert!(!template.resources.contains_key("CodeBucket"));
        assert!(!template.resources.contains_key("LambdaFunction"));
        assert!(!template.resources.contains_key("LambdaRecordSet"));
        assert_eq!(template.count_of("AWS::S3::Bucket"), 1);
        assert!(!template.outputs.contains_key("ApiUrl"));
        assert_eq!(
            template.resources["S3DeploymentPolicy"].properties["PolicyDocument"]["Statement"]
                .as_array()
                .map(Vec::len),
            Some(1)
        );
    }

    #[test]
    fn test_api_wiring() {
        let template = default_stack().template().unwrap();
        let integration = &template.resources["HttpApiIntegration"].properties;
        assert_eq!(integration["IntegrationType"], json!("AWS_PROXY"));
        assert_eq!(integration["PayloadFormatVersion"], json!("1.0"));
        assert_eq!(
            template.resources["HttpApiDefaultRoute"].properties["RouteKey"],
            json!("$default")
        );
        assert_eq!(
            template.resources["LambdaRecordSet"].properties["Name"],
            json!("api.mira-hq.com.")
        );
        assert_eq!(
            template.resources["HttpApi"].properties["CorsConfiguration"]["AllowOrigins"],
            json!(["https://mira-hq.com"])
        );
        let function = &template.resources["LambdaFunction"].properties;
        assert_eq!(function["Runtime"], json!("nodejs14.x"));
        assert_eq!(function["MemorySize"], json!(128));
        assert_eq!(
            template.resources["LambdaFunctionLogGroup"].properties["RetentionInDays"],
            json!(30)
        );
    }

    #[test]
    fn test_unsupported_method_fails_build() {
        let mut config = StackConfig::default();
        config.api.cors.allow_methods.push("FETCH".into());
        let err = build(&config).unwrap_err();
        assert!(err.is_declaration_error());
    }

    #[test]
    fn test_invalid_literals_fail_synthesis() {
        let mut config = StackConfig::default();
        config.api.memory_mb = 64;
        assert!(build(&config).unwrap().template().is_err());

        let mut config = StackConfig::default();
        config.site.fallback_path = "index.html".into();
        assert!(build(&config).unwrap().template().is_err());

        let mut config = StackConfig::default();
        config.site.domain = "Mira HQ".into();
        assert!(build(&config).unwrap().template().is_err());

        let mut config = StackConfig::default();
        config.api.log_retention_days = 31;
        assert!(build(&config).unwrap().template().is_err());
    }

    #[test]
    fn test_cdk_user_evaluation() {
        let user = User::new("CdkDeploymentUser", "CdkDeploymentUser", vec![cdk_deployment_policy()]);
        let any = Value::String("arn:aws:s3:::anything".into());

        assert!(user.is_allowed(&Request::new("cloudformation:CreateStack", "*")));
        assert!(user.is_allowed(&Request::new(
            "s3:PutObject",
            "arn:aws:s3:::cdktoolkit-stagingbucket-abc123/asset.zip"
        )));
        // Everything else only through the engine
        assert!(!user.is_allowed(&Request::new("ec2:RunInstances", any.clone())));
        assert!(user.is_allowed(
            &Request::new("ec2:RunInstances", any)
                .with_context("aws:CalledVia", &["cloudformation.amazonaws.com"])
        ));
    }

    #[test]
    fn test_deployment_user_grants_union_and_deny_wins() {
        let bucket = Bucket::new("FrontEndBucket");
        let stack_function = Function {
            id: "LambdaFunction".into(),
            function_name: "MiraHqBackend".into(),
            runtime: Runtime::Nodejs14x,
            handler: "dist/index.graphqlHandler".into(),
            code: S3Code::from_bucket(&Bucket::new("CodeBucket"), "lambda.zip"),
            memory_mb: 128,
            tracing: Tracing::Active,
            role_id: "LambdaFunctionRole".into(),
        };
        let upload = s3_deployment_policy(&bucket, Some(&stack_function));
        let guard = ManagedPolicy::new(
            "NoDeletes",
            vec![PolicyStatement::deny(["s3:Delete*"], [bucket.objects_arn()])],
        );
        let user = User::new("S3DeploymentUser", "S3DeploymentUser", vec![upload, guard]);

        assert!(user.is_allowed(&Request::new("s3:PutObject", bucket.objects_arn())));
        assert!(user.is_allowed(&Request::new(
            "lambda:UpdateFunctionCode",
            stack_function.arn()
        )));
        assert!(!user.is_allowed(&Request::new("lambda:InvokeFunction", stack_function.arn())));
        assert_eq!(
            user.evaluate(&Request::new("s3:DeleteObject", bucket.objects_arn())),
            Decision::Deny
        );
        assert_eq!(
            user.evaluate(&Request::new("iam:ListRoles", "*")),
            Decision::NotApplicable
        );
    }
}
