//! Intrinsic references between resources
//!
//! Resources never declare ordering directly. An edge exists whenever one
//! resource's properties embed a `Ref` or `Fn::GetAtt` pointing at another
//! logical id; [`references`] recovers those edges from a property bag.

use serde_json::{Value, json};
use std::collections::BTreeSet;

/// Prefix of provider pseudo parameters (`AWS::Region`, `AWS::Partition`, ...)
pub const PSEUDO_PREFIX: &str = "AWS::";

/// `{"Ref": id}` - the primary identifier of a resource
pub fn reference(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

/// `{"Fn::GetAtt": [id, attr]}` - a named attribute of a resource
pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

/// `{"Fn::Join": [sep, parts]}`
pub fn join(separator: &str, parts: Vec<Value>) -> Value {
    json!({ "Fn::Join": [separator, parts] })
}

/// `{"Fn::Join": [sep, list]}` where `list` is itself a list-valued
/// intrinsic, such as the `NameServers` attribute of a hosted zone
pub fn join_list(separator: &str, list: Value) -> Value {
    json!({ "Fn::Join": [separator, list] })
}

/// `{"Ref": "AWS::<name>"}` - a pseudo parameter, never an edge
pub fn pseudo(name: &str) -> Value {
    json!({ "Ref": format!("{PSEUDO_PREFIX}{name}") })
}

/// Collect every logical id referenced anywhere inside `value`
///
/// Pseudo parameters are skipped. The result is sorted, so callers get
/// the same edge order on every run.
pub fn references(value: &Value) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    collect(value, &mut found);
    found
}

fn collect(value: &Value, found: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(id)) = map.get("Ref") {
                    if !id.starts_with(PSEUDO_PREFIX) {
                        found.insert(id.clone());
                    }
                    return;
                }
                if let Some(Value::Array(args)) = map.get("Fn::GetAtt")
                    && let Some(Value::String(id)) = args.first()
                {
                    found.insert(id.clone());
                    return;
                }
            }
            for nested in map.values() {
                collect(nested, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect(item, found);
            }
        }
        _ => {}
    }
}
