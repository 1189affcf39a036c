//! Playbook execution pipeline.

use rigger_runtime::Step;
use rigger_task::{Operation, OperationKind};
use serde_json::{Map, Value};

pub const PLAYBOOK_PIPELINE: &str = "playbook";

/// A single step executing playbook `playbook_id`.
///
/// `params` are sent alongside the id. Object params are merged into the
/// request body; anything else is nested under `params`.
pub fn playbook_steps(playbook_id: &str, params: &Value) -> Vec<Step> {
  let mut body = match params {
    Value::Object(map) => map.clone(),
    Value::Null => Map::new(),
    other => Map::from_iter([("params".to_string(), other.clone())]),
  };
  body.insert("playbook_id".to_string(), Value::String(playbook_id.to_string()));

  let operation = Operation::with_params(OperationKind::ExecutePlaybook, Value::Object(body));
  vec![Step::new(
    format!("{} ({})", OperationKind::ExecutePlaybook.label(), playbook_id),
    operation,
  )]
}

#[cfg(test)]
mod tests {
  use super::*;
  use rigger_task::TaskFamily;
  use serde_json::json;

  #[test]
  fn test_playbook_step_carries_id() {
    let steps = playbook_steps("site", &json!({ "limit": "workers" }));

    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].label, "Execute playbook (site)");
    assert_eq!(steps[0].operation.family(), TaskFamily::Playbook);
    assert_eq!(
      steps[0].operation.params,
      json!({ "limit": "workers", "playbook_id": "site" })
    );
  }

  #[test]
  fn test_non_object_params_are_nested() {
    let steps = playbook_steps("site", &json!(["a"]));
    assert_eq!(
      steps[0].operation.params,
      json!({ "params": ["a"], "playbook_id": "site" })
    );

    let steps = playbook_steps("site", &Value::Null);
    assert_eq!(steps[0].operation.params, json!({ "playbook_id": "site" }));
  }
}
