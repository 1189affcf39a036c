//! Rigger Runtime
//!
//! This crate drives remote operations to completion and sequences them into
//! fail-fast pipelines.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Pipeline                            │
//! │  - ordered steps, single-use run, explicit reset            │
//! │  - step projection, append-only log sink, running flag      │
//! │  - owns the cancellation token of the current run           │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        StepRunner                           │
//! │  - start call → task handle (or an already-final result)    │
//! │  - pending → active → completed | error                     │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Poller                             │
//! │  - fixed-delay status loop until a terminal state           │
//! │  - log deltas via TaskHandle, one timer at a time           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pipelines never share state: each owns its descriptors, its sink and its
//! token. [`PipelineRegistry`] exists only so observers can find them.

mod error;
mod events;
mod outcome;
mod pipeline;
mod poller;
mod registry;
mod settings;
mod sink;
mod step;

pub use error::PipelineError;
pub use events::{ChannelNotifier, NoopNotifier, PipelineEvent, PipelineNotifier};
pub use outcome::{PipelineResult, PollOutcome, StepOutcome};
pub use pipeline::{Pipeline, PipelineHandle};
pub use poller::{
  Poller, REMOTE_FAILURE_MESSAGE, STATUS_FETCH_FAILURE_PREFIX, TASK_LOST_MESSAGE, TIMEOUT_MESSAGE,
};
pub use registry::PipelineRegistry;
pub use settings::PipelineSettings;
pub use sink::LogSink;
pub use step::{Step, StepDescriptor, StepStatus};
