//! Rigger Client
//!
//! This crate defines the [`TaskClient`] trait the pipeline runtime uses to
//! reach the remote executor, and [`HttpTaskClient`], its REST implementation.
//!
//! The executor contract is two calls:
//!
//! - `start(operation)`: begin an operation; the response either carries a
//!   task id to poll or reports a result that is already final.
//! - `status(family, task_id)`: cumulative status and log text of one task.

mod client;
mod error;
mod http;

pub use client::TaskClient;
pub use error::ClientError;
pub use http::HttpTaskClient;
