//! Navigator core
//!
//! The engine of a background file-monitoring service: it watches
//! category-scoped storage locations for newly created files, classifies
//! them against match rules, and relocates matches into a configured
//! destination tree.
//!
//! ## Architecture
//!
//! - **service::monitor**: lifecycle and observer orchestration: the
//!   serialized command protocol, the dedicated worker thread, per-category
//!   observers, and the outcome drain loop
//! - **infra**: the published running state and the OS change-notification
//!   facility
//! - **ops::relocate**: match rules and the move engine
//! - **config**: persisted application configuration
//!
//! The composition root (see `apps/daemon`) assembles a [`NavigatorContext`]
//! and drives a [`Navigator`] handle.

pub mod config;
pub mod domain;
pub mod infra;
pub mod ops;
pub mod service;

pub use config::NavigatorConfig;
pub use domain::{MoveOutcome, WatchCategory};
pub use infra::notify::{ChangeEvent, ChangeKind, ChangeNotifier, FsChangeNotifier, NotifyError};
pub use infra::running::RunningState;
pub use ops::relocate::{MovePipeline, RelocatePipeline};
pub use service::monitor::{
	ForegroundEnvelope, MonitorError, MoveResultListener, Navigator, NavigatorContext, Observer,
	ObserverFactory, SessionDescriptor, StatusFileEnvelope, TracingListener,
};
