//! `check` - evaluate a request against a declared user's policies

use anyhow::{Context as AnyhowContext, Result, bail};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::Context;
use crate::cli::CheckArgs;
use crate::resource::iam::{Decision, Request};
use crate::ui;

/// Evaluate `args` against the named user; fails unless the request is allowed
pub fn run(ctx: &Context, args: CheckArgs) -> Result<()> {
    let loaded = super::load(ctx)?;
    let Some(user) = loaded.stack.user(&args.user) else {
        let known: Vec<&str> = loaded.stack.users.iter().map(|u| u.id.as_str()).collect();
        bail!("Unknown user '{}' (declared: {})", args.user, known.join(", "));
    };

    let request = Request {
        action: args.action.clone(),
        resource: parse_resource(&args.resource)?,
        context: parse_context(&args.context)?,
    };
    log::debug!("Evaluating {request:?} for {}", user.id);

    match user.evaluate(&request) {
        Decision::Allow => {
            if !ctx.quiet {
                ui::success(&format!("{} may {} on {}", user.id, args.action, args.resource));
            }
            Ok(())
        }
        Decision::Deny => bail!(
            "{} is explicitly denied {} on {}",
            user.id,
            args.action,
            args.resource
        ),
        Decision::NotApplicable => bail!(
            "{} is not allowed {} on {} (no statement matches)",
            user.id,
            args.action,
            args.resource
        ),
    }
}

/// A literal ARN, or an intrinsic written as JSON (`{"Fn::GetAtt": [...]}`)
pub fn parse_resource(raw: &str) -> Result<Value> {
    if raw.trim_start().starts_with('{') {
        serde_json::from_str(raw).with_context(|| format!("Invalid resource intrinsic: {raw}"))
    } else {
        Ok(Value::String(raw.to_string()))
    }
}

/// `key=value` pairs; repeating a key adds values
pub fn parse_context(pairs: &[String]) -> Result<BTreeMap<String, Vec<String>>> {
    let mut context: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("Context must be key=value, got '{pair}'");
        };
        if key.is_empty() {
            bail!("Context key is empty in '{pair}'");
        }
        context
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }
    Ok(context)
}
