//! REST implementation of [`TaskClient`].

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rigger_config::ExecutorConfig;
use rigger_task::{Operation, OperationKind, RemoteStatus, StartResponse, TaskFamily};
use tracing::{debug, instrument};
use url::Url;

use crate::client::TaskClient;
use crate::error::ClientError;

/// Talks to the executor over HTTP.
///
/// - start: `POST {base}/{operation path}` with the operation params as JSON.
/// - status: `GET {base}/{family status path}/{task_id}`.
pub struct HttpTaskClient {
  client: Client,
  base_url: Url,
  config: ExecutorConfig,
}

impl HttpTaskClient {
  /// Create a client for the executor described by `config`.
  pub fn new(config: &ExecutorConfig) -> Result<Self, ClientError> {
    let client = Client::builder()
      .timeout(config.request_timeout())
      .build()?;

    // Url::join replaces the last segment unless the base ends with '/'
    let mut base = config.base_url.trim_end_matches('/').to_string();
    base.push('/');
    let base_url = Url::parse(&base)?;
    if base_url.cannot_be_a_base() {
      return Err(ClientError::CannotBeABase { url: base });
    }

    Ok(Self {
      client,
      base_url,
      config: config.clone(),
    })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// Start endpoint for `kind`, honouring configured overrides.
  pub fn operation_url(&self, kind: OperationKind) -> Result<Url, ClientError> {
    let path = self
      .config
      .path_override(kind.as_str())
      .unwrap_or(kind.default_path());
    self.endpoint(path)
  }

  /// Status endpoint for one task of `family`.
  pub fn status_url(&self, family: TaskFamily, task_id: &str) -> Result<Url, ClientError> {
    let path = self
      .config
      .status_path_override(family.as_str())
      .unwrap_or(family.default_status_path());
    let mut url = self.endpoint(path)?;
    url
      .path_segments_mut()
      .map_err(|_| ClientError::CannotBeABase {
        url: self.base_url.to_string(),
      })?
      .pop_if_empty()
      .push(task_id);
    Ok(url)
  }

  fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
    Ok(self.base_url.join(path.trim_start_matches('/'))?)
  }
}

#[async_trait]
impl TaskClient for HttpTaskClient {
  #[instrument(name = "executor_start", skip(self, operation), fields(operation = %operation.kind))]
  async fn start(&self, operation: &Operation) -> Result<StartResponse, ClientError> {
    let url = self.operation_url(operation.kind)?;
    debug!(url = %url, "starting operation");

    let response = self.client.post(url).json(&operation.params).send().await?;
    let status = response.status();
    let body = response.text().await?;

    // A refusal usually comes back as a 4xx/5xx carrying a normal start body;
    // keep its message rather than reporting a bare HTTP status.
    match serde_json::from_str::<StartResponse>(&body) {
      Ok(start) if status.is_success() || !start.success => Ok(start),
      Ok(_) => Err(ClientError::Status {
        status: status.as_u16(),
        body,
      }),
      Err(_) if !status.is_success() => Err(ClientError::Status {
        status: status.as_u16(),
        body,
      }),
      Err(e) => Err(ClientError::InvalidResponse {
        message: format!("failed to parse start response: {}, body: {}", e, body),
      }),
    }
  }

  #[instrument(name = "executor_status", skip(self, family), fields(family = %family))]
  async fn status(&self, family: TaskFamily, task_id: &str) -> Result<RemoteStatus, ClientError> {
    let url = self.status_url(family, task_id)?;

    let response = self.client.get(url).send().await?;
    let status = response.status();
    let body = response.text().await?;

    match serde_json::from_str::<RemoteStatus>(&body) {
      Ok(remote) if status.is_success() || status == StatusCode::NOT_FOUND => Ok(remote),
      _ if status == StatusCode::NOT_FOUND => Ok(RemoteStatus::not_found()),
      Err(e) if status.is_success() => Err(ClientError::InvalidResponse {
        message: format!("failed to parse status response: {}, body: {}", e, body),
      }),
      _ => Err(ClientError::Status {
        status: status.as_u16(),
        body,
      }),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn client_for(base_url: &str) -> HttpTaskClient {
    let config = ExecutorConfig {
      base_url: base_url.to_string(),
      ..ExecutorConfig::default()
    };
    HttpTaskClient::new(&config).unwrap()
  }

  #[test]
  fn test_operation_url_keeps_base_path() {
    let client = client_for("http://executor:8080/api");
    let url = client.operation_url(OperationKind::DistributeKeys).unwrap();
    assert_eq!(url.as_str(), "http://executor:8080/api/ansible/init/ssh-keys");

    let client = client_for("http://executor:8080/api/");
    let url = client.operation_url(OperationKind::ExecutePlaybook).unwrap();
    assert_eq!(url.as_str(), "http://executor:8080/api/playbooks/execute");
  }

  #[test]
  fn test_operation_url_override() {
    let mut config = ExecutorConfig {
      base_url: "http://executor/api".to_string(),
      ..ExecutorConfig::default()
    };
    config
      .paths
      .insert("install_ansible".to_string(), "/tools/ansible".to_string());
    let client = HttpTaskClient::new(&config).unwrap();

    let url = client.operation_url(OperationKind::InstallAnsible).unwrap();
    assert_eq!(url.as_str(), "http://executor/api/tools/ansible");
  }

  #[test]
  fn test_status_url_escapes_task_id() {
    let client = client_for("http://executor/api");
    let url = client
      .status_url(TaskFamily::Initialization, "task 1/2")
      .unwrap();
    assert_eq!(url.as_str(), "http://executor/api/ansible/init/tasks/task%201%2F2");

    let url = client.status_url(TaskFamily::Playbook, "p-9").unwrap();
    assert_eq!(url.as_str(), "http://executor/api/playbooks/executions/p-9");
  }

  #[test]
  fn test_invalid_base_url() {
    let config = ExecutorConfig {
      base_url: "not a url".to_string(),
      ..ExecutorConfig::default()
    };
    assert!(matches!(
      HttpTaskClient::new(&config),
      Err(ClientError::InvalidUrl(_))
    ));
  }
}
