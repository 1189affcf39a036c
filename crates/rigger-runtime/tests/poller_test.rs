//! Poll loop behaviour against a scripted executor.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{ScriptedClient, StatusScript, wait_until};
use rigger_runtime::{
  PollOutcome, Poller, REMOTE_FAILURE_MESSAGE, STATUS_FETCH_FAILURE_PREFIX, TASK_LOST_MESSAGE,
};
use rigger_task::{OperationKind, RemoteStatus, TaskFamily, TaskHandle};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const INTERVAL: Duration = Duration::from_millis(1000);

fn poller() -> Poller {
  Poller::new(INTERVAL, CancellationToken::new())
}

async fn poll_collecting(
  poller: &Poller,
  client: &ScriptedClient,
  task_id: &str,
) -> (PollOutcome, Vec<String>) {
  let mut handle = TaskHandle::new(task_id);
  let mut seen = Vec::new();
  let outcome = poller
    .poll(client, TaskFamily::Initialization, &mut handle, |lines| {
      seen.extend(lines.into_iter().map(|l| l.text))
    })
    .await;
  (outcome, seen)
}

#[tokio::test(start_paused = true)]
async fn test_emits_each_line_once_until_completed() {
  let client = ScriptedClient::new().task(
    OperationKind::PingNodes,
    "t1",
    vec![
      RemoteStatus::running("a\n"),
      RemoteStatus::completed("a\nb\n"),
    ],
  );

  let (outcome, seen) = poll_collecting(&poller(), &client, "t1").await;

  assert_eq!(outcome, PollOutcome::Completed);
  assert_eq!(seen, vec!["a", "b"]);
  assert_eq!(client.status_calls("t1"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_waits_interval_between_fetches() {
  let client = ScriptedClient::new().task(
    OperationKind::PingNodes,
    "t1",
    vec![
      RemoteStatus::running(""),
      RemoteStatus::running("x\n"),
      RemoteStatus::completed("x\n"),
    ],
  );

  let started = Instant::now();
  let (outcome, _) = poll_collecting(&poller(), &client, "t1").await;

  assert_eq!(outcome, PollOutcome::Completed);
  let elapsed = started.elapsed();
  assert!(elapsed >= INTERVAL * 2 && elapsed < INTERVAL * 3);
}

#[tokio::test(start_paused = true)]
async fn test_not_found_is_terminal() {
  let client = ScriptedClient::new();

  let (outcome, seen) = poll_collecting(&poller(), &client, "gone").await;

  assert_eq!(
    outcome,
    PollOutcome::Failed {
      message: TASK_LOST_MESSAGE.to_string()
    }
  );
  assert!(seen.is_empty());
  assert_eq!(client.status_calls("gone"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_task_surfaces_error_and_last_lines() {
  let client = ScriptedClient::new()
    .task(
      OperationKind::InstallAnsible,
      "t1",
      vec![RemoteStatus::failed("TASK [apt]\nfatal: denied\n", "permission denied")],
    )
    .task(
      OperationKind::VerifyAnsible,
      "t2",
      vec![RemoteStatus::failed("", "  ")],
    );

  let (outcome, seen) = poll_collecting(&poller(), &client, "t1").await;
  assert_eq!(
    outcome,
    PollOutcome::Failed {
      message: "permission denied".to_string()
    }
  );
  assert_eq!(seen, vec!["TASK [apt]", "fatal: denied"]);

  let (outcome, _) = poll_collecting(&poller(), &client, "t2").await;
  assert_eq!(
    outcome,
    PollOutcome::Failed {
      message: REMOTE_FAILURE_MESSAGE.to_string()
    }
  );
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_is_not_retried() {
  let client = ScriptedClient::new().on_status("t1", StatusScript::Error(502, "bad gateway".into()));

  let (outcome, _) = poll_collecting(&poller(), &client, "t1").await;

  match outcome {
    PollOutcome::Failed { message } => {
      assert!(message.starts_with(STATUS_FETCH_FAILURE_PREFIX));
      assert!(message.contains("bad gateway"));
    }
    other => panic!("expected failure, got {:?}", other),
  }
  tokio::time::sleep(INTERVAL * 5).await;
  assert_eq!(client.status_calls("t1"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shrunken_log_is_replayed_in_full() {
  let client = ScriptedClient::new().task(
    OperationKind::PingNodes,
    "t1",
    vec![
      RemoteStatus::running("one\ntwo\nthree\n"),
      RemoteStatus::running("new\n"),
      RemoteStatus::completed("new\nnext\n"),
    ],
  );

  let (outcome, seen) = poll_collecting(&poller(), &client, "t1").await;

  assert_eq!(outcome, PollOutcome::Completed);
  assert_eq!(seen, vec!["one", "two", "three", "new", "next"]);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_after_terminal_is_noop() {
  let client = ScriptedClient::new()
    .task(OperationKind::PingNodes, "t1", vec![RemoteStatus::completed("")])
    .task(OperationKind::PingNodes, "t2", vec![RemoteStatus::completed("")]);
  let poller = poller();

  let (outcome, _) = poll_collecting(&poller, &client, "t1").await;
  assert_eq!(outcome, PollOutcome::Completed);
  assert!(!poller.is_active());

  poller.cancel();
  poller.cancel();

  let (outcome, _) = poll_collecting(&poller, &client, "t2").await;
  assert_eq!(outcome, PollOutcome::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_active_loop_stops_fetching() {
  let client = Arc::new(ScriptedClient::new().task(
    OperationKind::DeployCluster,
    "t1",
    vec![RemoteStatus::running("working\n")],
  ));
  let poller = Arc::new(poller());

  let task = tokio::spawn({
    let client = Arc::clone(&client);
    let poller = Arc::clone(&poller);
    async move {
      let mut handle = TaskHandle::new("t1");
      poller
        .poll(&*client, TaskFamily::Initialization, &mut handle, |_| {})
        .await
    }
  });

  wait_until(|| client.status_calls("t1") >= 3).await;
  assert!(poller.is_active());
  poller.cancel();

  assert_eq!(task.await.unwrap(), PollOutcome::Cancelled);
  let fetched = client.status_calls("t1");
  tokio::time::sleep(INTERVAL * 10).await;
  assert_eq!(client.status_calls("t1"), fetched);
  assert!(!poller.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_parent_skips_fetch() {
  let client = ScriptedClient::new().task(
    OperationKind::PingNodes,
    "t1",
    vec![RemoteStatus::running("")],
  );
  let token = CancellationToken::new();
  token.cancel();
  let poller = Poller::new(INTERVAL, token);

  let (outcome, _) = poll_collecting(&poller, &client, "t1").await;

  assert_eq!(outcome, PollOutcome::Cancelled);
  assert_eq!(client.status_calls("t1"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_second_poll_replaces_first() {
  let client = Arc::new(
    ScriptedClient::new()
      .task(OperationKind::PingNodes, "t1", vec![RemoteStatus::running("")])
      .task(
        OperationKind::PingNodes,
        "t2",
        vec![RemoteStatus::running(""), RemoteStatus::completed("done\n")],
      ),
  );
  let poller = Arc::new(poller());

  let first = tokio::spawn({
    let client = Arc::clone(&client);
    let poller = Arc::clone(&poller);
    async move {
      let mut handle = TaskHandle::new("t1");
      poller
        .poll(&*client, TaskFamily::Initialization, &mut handle, |_| {})
        .await
    }
  });
  wait_until(|| client.status_calls("t1") >= 1).await;

  let seen = Mutex::new(Vec::new());
  let mut handle = TaskHandle::new("t2");
  let second = poller
    .poll(&*client, TaskFamily::Initialization, &mut handle, |lines| {
      seen.lock().unwrap().extend(lines)
    })
    .await;

  assert_eq!(first.await.unwrap(), PollOutcome::Cancelled);
  assert_eq!(second, PollOutcome::Completed);
  assert_eq!(seen.lock().unwrap().len(), 1);

  let fetched = client.status_calls("t1");
  tokio::time::sleep(INTERVAL * 5).await;
  assert_eq!(client.status_calls("t1"), fetched);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_times_out_running_task() {
  let client = ScriptedClient::new().task(
    OperationKind::DeployCluster,
    "t1",
    vec![RemoteStatus::running("still going\n")],
  );
  let poller = poller().with_deadline(Some(Instant::now() + Duration::from_millis(3500)));

  let (outcome, seen) = poll_collecting(&poller, &client, "t1").await;

  assert_eq!(outcome, PollOutcome::TimedOut);
  assert_eq!(seen, vec!["still going"]);
  assert_eq!(client.status_calls("t1"), 4);
}

#[tokio::test(start_paused = true)]
async fn test_status_due_at_deadline_still_counts() {
  let client = ScriptedClient::new().task(
    OperationKind::DeployCluster,
    "t1",
    vec![
      RemoteStatus::running("deploying\n"),
      RemoteStatus::completed("deploying\ndone\n"),
    ],
  );
  // The second fetch is due on the same tick the deadline passes.
  let poller = poller().with_deadline(Some(Instant::now() + INTERVAL));

  let (outcome, seen) = poll_collecting(&poller, &client, "t1").await;

  assert_eq!(outcome, PollOutcome::Completed);
  assert_eq!(seen, vec!["deploying", "done"]);
  assert_eq!(client.status_calls("t1"), 2);
}
