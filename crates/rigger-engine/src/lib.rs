//! Rigger Engine
//!
//! The provisioning pipelines of the console, built on `rigger-runtime`:
//!
//! - Ansible lifecycle: install, reinstall, uninstall
//! - Ansible initialization: full or quick, plus a standalone ping
//! - Kubernetes bootstrap: three phases, each gated on the one before
//! - Playbook execution
//!
//! [`Console`] owns one independent instance of each and a registry for
//! finding them by name.

mod ansible;
mod console;
mod context;
mod error;
mod kubernetes;
mod playbook;

pub use ansible::{AnsibleAction, INIT_PIPELINE, InitMode, PING_PIPELINE, ping_steps};
pub use console::Console;
pub use context::{PipelineContext, settings_from_config};
pub use error::EngineError;
pub use kubernetes::{ClusterBootstrap, ClusterPhase};
pub use playbook::{PLAYBOOK_PIPELINE, playbook_steps};
