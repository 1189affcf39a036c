//! Remote operations and the task families that report on them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Group of operations sharing one status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFamily {
  Initialization,
  Playbook,
}

impl TaskFamily {
  pub fn as_str(self) -> &'static str {
    match self {
      TaskFamily::Initialization => "initialization",
      TaskFamily::Playbook => "playbook",
    }
  }

  /// Default status endpoint, relative to the executor base URL. The task id
  /// is appended as the final path segment.
  pub fn default_status_path(self) -> &'static str {
    match self {
      TaskFamily::Initialization => "ansible/init/tasks",
      TaskFamily::Playbook => "playbooks/executions",
    }
  }
}

impl fmt::Display for TaskFamily {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Every operation the remote executor can start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
  CheckEnvironment,
  InstallAnsible,
  UninstallAnsible,
  CleanupAnsible,
  VerifyAnsible,
  CreateLayout,
  WriteConfig,
  DistributeKeys,
  PingNodes,
  PrepareEnvironment,
  DeployCluster,
  VerifyCluster,
  ExecutePlaybook,
}

impl OperationKind {
  pub const ALL: [OperationKind; 13] = [
    OperationKind::CheckEnvironment,
    OperationKind::InstallAnsible,
    OperationKind::UninstallAnsible,
    OperationKind::CleanupAnsible,
    OperationKind::VerifyAnsible,
    OperationKind::CreateLayout,
    OperationKind::WriteConfig,
    OperationKind::DistributeKeys,
    OperationKind::PingNodes,
    OperationKind::PrepareEnvironment,
    OperationKind::DeployCluster,
    OperationKind::VerifyCluster,
    OperationKind::ExecutePlaybook,
  ];

  /// Stable snake_case name, also the key for endpoint overrides.
  pub fn as_str(self) -> &'static str {
    match self {
      OperationKind::CheckEnvironment => "check_environment",
      OperationKind::InstallAnsible => "install_ansible",
      OperationKind::UninstallAnsible => "uninstall_ansible",
      OperationKind::CleanupAnsible => "cleanup_ansible",
      OperationKind::VerifyAnsible => "verify_ansible",
      OperationKind::CreateLayout => "create_layout",
      OperationKind::WriteConfig => "write_config",
      OperationKind::DistributeKeys => "distribute_keys",
      OperationKind::PingNodes => "ping_nodes",
      OperationKind::PrepareEnvironment => "prepare_environment",
      OperationKind::DeployCluster => "deploy_cluster",
      OperationKind::VerifyCluster => "verify_cluster",
      OperationKind::ExecutePlaybook => "execute_playbook",
    }
  }

  /// Human-readable step label.
  pub fn label(self) -> &'static str {
    match self {
      OperationKind::CheckEnvironment => "Check environment",
      OperationKind::InstallAnsible => "Install Ansible",
      OperationKind::UninstallAnsible => "Uninstall Ansible",
      OperationKind::CleanupAnsible => "Clean residual files",
      OperationKind::VerifyAnsible => "Verify installation",
      OperationKind::CreateLayout => "Create directory layout",
      OperationKind::WriteConfig => "Write configuration",
      OperationKind::DistributeKeys => "Distribute SSH keys",
      OperationKind::PingNodes => "Ping nodes",
      OperationKind::PrepareEnvironment => "Prepare environment",
      OperationKind::DeployCluster => "Deploy cluster",
      OperationKind::VerifyCluster => "Verify cluster and install extensions",
      OperationKind::ExecutePlaybook => "Execute playbook",
    }
  }

  /// Status family polled for tasks started by this operation.
  pub fn family(self) -> TaskFamily {
    match self {
      OperationKind::ExecutePlaybook => TaskFamily::Playbook,
      _ => TaskFamily::Initialization,
    }
  }

  /// Default start endpoint, relative to the executor base URL.
  pub fn default_path(self) -> &'static str {
    match self {
      OperationKind::CheckEnvironment => "ansible/check",
      OperationKind::InstallAnsible => "ansible/install",
      OperationKind::UninstallAnsible => "ansible/uninstall",
      OperationKind::CleanupAnsible => "ansible/cleanup",
      OperationKind::VerifyAnsible => "ansible/verify",
      OperationKind::CreateLayout => "ansible/init/layout",
      OperationKind::WriteConfig => "ansible/init/config",
      OperationKind::DistributeKeys => "ansible/init/ssh-keys",
      OperationKind::PingNodes => "ansible/init/ping",
      OperationKind::PrepareEnvironment => "kubernetes/phase/environment",
      OperationKind::DeployCluster => "kubernetes/phase/deploy",
      OperationKind::VerifyCluster => "kubernetes/phase/verify",
      OperationKind::ExecutePlaybook => "playbooks/execute",
    }
  }
}

impl fmt::Display for OperationKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// An operation to start, with the JSON parameters sent as the request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
  pub kind: OperationKind,
  #[serde(default)]
  pub params: serde_json::Value,
}

impl Operation {
  /// An operation with an empty parameter object.
  pub fn new(kind: OperationKind) -> Self {
    Self {
      kind,
      params: serde_json::Value::Object(serde_json::Map::new()),
    }
  }

  pub fn with_params(kind: OperationKind, params: serde_json::Value) -> Self {
    Self { kind, params }
  }

  pub fn family(&self) -> TaskFamily {
    self.kind.family()
  }
}
