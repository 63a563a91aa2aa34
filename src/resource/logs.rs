//! CloudWatch log groups

use serde_json::{Value, json};

use super::lambda::Function;
use super::{Error, Resource, Result, intrinsic};

/// Retention periods the provider accepts, in days
pub const RETENTION_DAYS: &[u32] = &[
    1, 3, 5, 7, 14, 30, 60, 90, 120, 150, 180, 365, 400, 545, 731, 1096, 1827, 2192, 2557, 2922,
    3288, 3653,
];

/// Log group a function writes to, with bounded retention
#[derive(Debug, Clone)]
pub struct FunctionLogGroup {
    pub id: String,
    pub function_id: String,
    pub retention_days: u32,
}

impl FunctionLogGroup {
    pub fn new(function: &Function, retention_days: u32) -> Self {
        Self {
            id: format!("{}LogGroup", function.id),
            function_id: function.id.clone(),
            retention_days,
        }
    }
}

impl Resource for FunctionLogGroup {
    fn logical_id(&self) -> String {
        self.id.clone()
    }

    fn resource_type(&self) -> &'static str {
        "AWS::Logs::LogGroup"
    }

    fn description(&self) -> String {
        format!("Logs of {} kept {} days", self.function_id, self.retention_days)
    }

    fn properties(&self) -> Result<Value> {
        if !RETENTION_DAYS.contains(&self.retention_days) {
            return Err(Error::invalid(
                &self.id,
                format!("unsupported log retention of {} days", self.retention_days),
            ));
        }
        Ok(json!({
            "LogGroupName": intrinsic::join(
                "",
                vec![json!("/aws/lambda/"), intrinsic::reference(&self.function_id)],
            ),
            "RetentionInDays": self.retention_days,
        }))
    }
}
