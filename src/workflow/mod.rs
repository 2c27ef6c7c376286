//! # Multi-Team Workflow
//!
//! Sequential labeling across teams: each step owns a copy of the source
//! dataset in its team's workspace and a labeling queue on it. When a step's
//! queue completes, the next step receives a copy of the labeled dataset and
//! a queue of its own.
//!
//! - [`step`] - one team's selections and its platform operations
//! - [`coordinator`] - ordered steps, status refresh, readiness, persistence
//! - [`monitor`] - background status polling
//! - [`status`] - per-step reports and the shared display board

pub mod coordinator;
pub mod monitor;
pub mod persistence;
pub mod settings;
pub mod status;
pub mod step;

pub use coordinator::{SaveOutcome, StepObservation, StepOutcome, WorkflowCoordinator};
pub use monitor::{CoordinatorRefresher, StatusMonitor, StatusRefresher};
pub use persistence::WorkflowSnapshot;
pub use settings::{LaunchOrigin, SettingsView, WorkflowSettings};
pub use status::{BoardSnapshot, StatusBoard, StepDisplay, StepReport, StepStatus};
pub use step::{SelectionRequirements, StepContext, StepLocation, StepSnapshot, WorkflowStep};
