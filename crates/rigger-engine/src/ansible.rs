//! Ansible lifecycle and initialization pipelines.

use std::fmt;

use rigger_runtime::Step;
use rigger_task::{Operation, OperationKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle actions on the Ansible installation of the control node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnsibleAction {
  Install,
  Reinstall,
  Uninstall,
}

impl AnsibleAction {
  pub const ALL: [AnsibleAction; 3] = [
    AnsibleAction::Install,
    AnsibleAction::Reinstall,
    AnsibleAction::Uninstall,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      AnsibleAction::Install => "install",
      AnsibleAction::Reinstall => "reinstall",
      AnsibleAction::Uninstall => "uninstall",
    }
  }

  /// Registry name of the pipeline running this action.
  pub fn pipeline_name(self) -> &'static str {
    match self {
      AnsibleAction::Install => "ansible-install",
      AnsibleAction::Reinstall => "ansible-reinstall",
      AnsibleAction::Uninstall => "ansible-uninstall",
    }
  }

  /// Operations run by this action, in order.
  pub fn operations(self) -> &'static [OperationKind] {
    match self {
      AnsibleAction::Install => &[
        OperationKind::CheckEnvironment,
        OperationKind::InstallAnsible,
        OperationKind::VerifyAnsible,
      ],
      AnsibleAction::Reinstall => &[
        OperationKind::CheckEnvironment,
        OperationKind::UninstallAnsible,
        OperationKind::CleanupAnsible,
        OperationKind::InstallAnsible,
        OperationKind::VerifyAnsible,
      ],
      AnsibleAction::Uninstall => &[
        OperationKind::CheckEnvironment,
        OperationKind::UninstallAnsible,
        OperationKind::CleanupAnsible,
      ],
    }
  }

  pub fn steps(self, params: &Value) -> Vec<Step> {
    steps_for(self.operations(), params)
  }
}

impl fmt::Display for AnsibleAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// How much of the initialization sequence to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitMode {
  /// Layout, configuration, SSH keys, then a connectivity check.
  #[default]
  Full,
  /// Everything except the connectivity check.
  Quick,
}

impl InitMode {
  pub fn operations(self) -> &'static [OperationKind] {
    match self {
      InitMode::Full => &[
        OperationKind::CreateLayout,
        OperationKind::WriteConfig,
        OperationKind::DistributeKeys,
        OperationKind::PingNodes,
      ],
      InitMode::Quick => &[
        OperationKind::CreateLayout,
        OperationKind::WriteConfig,
        OperationKind::DistributeKeys,
      ],
    }
  }

  pub fn steps(self, params: &Value) -> Vec<Step> {
    steps_for(self.operations(), params)
  }
}

pub const INIT_PIPELINE: &str = "ansible-init";
pub const PING_PIPELINE: &str = "ansible-ping";

/// The standalone connectivity check.
pub fn ping_steps(params: &Value) -> Vec<Step> {
  steps_for(&[OperationKind::PingNodes], params)
}

/// One step per operation, each sending `params` (an empty object for null).
pub(crate) fn steps_for(kinds: &[OperationKind], params: &Value) -> Vec<Step> {
  kinds
    .iter()
    .map(|kind| match params {
      Value::Null => Step::from_operation(Operation::new(*kind)),
      params => Step::from_operation(Operation::with_params(*kind, params.clone())),
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn labels(steps: &[Step]) -> Vec<&str> {
    steps.iter().map(|s| s.label.as_str()).collect()
  }

  #[test]
  fn test_lifecycle_steps() {
    let params = json!({});
    assert_eq!(
      labels(&AnsibleAction::Install.steps(&params)),
      vec!["Check environment", "Install Ansible", "Verify installation"]
    );
    assert_eq!(
      labels(&AnsibleAction::Reinstall.steps(&params)),
      vec![
        "Check environment",
        "Uninstall Ansible",
        "Clean residual files",
        "Install Ansible",
        "Verify installation"
      ]
    );
    assert_eq!(
      labels(&AnsibleAction::Uninstall.steps(&params)),
      vec!["Check environment", "Uninstall Ansible", "Clean residual files"]
    );
  }

  #[test]
  fn test_quick_init_skips_ping() {
    let quick = InitMode::Quick.operations();
    assert_eq!(quick.len(), 3);
    assert!(!quick.contains(&OperationKind::PingNodes));
    assert_eq!(InitMode::Full.operations().len(), 4);
    assert_eq!(InitMode::default(), InitMode::Full);
  }

  #[test]
  fn test_params_reach_every_step() {
    let params = json!({ "inventory": "prod" });
    for step in InitMode::Full.steps(&params) {
      assert_eq!(step.operation.params, params);
    }
    assert_eq!(ping_steps(&params)[0].label, "Ping nodes");
  }
}
