//! Rigger Task
//!
//! This crate contains the client-side model of a remote task:
//!
//! - [`Operation`] and [`OperationKind`]: the units of remote work the executor
//!   knows how to start, and the [`TaskFamily`] whose status endpoint reports
//!   on them.
//! - [`StartResponse`] and [`RemoteStatus`]: the executor's wire types.
//! - [`TaskHandle`]: the id of one outstanding task plus a cursor into its
//!   cumulative log, used to turn each status response into a delta.
//! - [`LogLine`] and [`Severity`]: display-ready log lines.

mod handle;
mod log;
mod operation;
mod status;

pub use handle::TaskHandle;
pub use log::{LogLine, Severity, classify, split_lines};
pub use operation::{Operation, OperationKind, TaskFamily};
pub use status::{RemoteStatus, StartResponse, TaskState};
