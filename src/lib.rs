#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Multi-Team Labeling Workflow
//!
//! Orchestrates sequential multi-team data labeling on a labeling platform.
//!
//! ## Overview
//!
//! A source dataset passes through N teams in order. Each team (a *step*)
//! gets its own copy of the dataset inside its workspace and a labeling queue
//! on that copy. When a step's queue completes, the annotated dataset is
//! copied into the next team's workspace and a new queue is opened there.
//! A background monitor polls the platform and drives this progression.
//!
//! ## Module Organization
//!
//! - [`workflow`] - Steps, coordinator, status monitor and persistence
//! - [`app`] - Process-scoped application context behind every command
//! - [`platform`] - Platform service contracts and the REST client
//! - [`models`] - Platform records (projects, datasets, queues, meta, users)
//! - [`web`] - JSON HTTP API
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup and helpers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use multiteam_labeling::app::LabelingApp;
//! use multiteam_labeling::config::ConfigLoader;
//! use multiteam_labeling::platform::{PlatformClient, PlatformServices};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::from_env().load()?;
//! let client = PlatformClient::new(&config.platform)?;
//! let app = LabelingApp::new(&config, PlatformServices::from_shared(Arc::new(client)));
//!
//! app.bootstrap(&config).await?;
//! let board = app.launch().await?;
//! println!("{} steps monitored", board.steps.len());
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod models;
pub mod platform;
pub mod web;
pub mod workflow;

pub use app::LabelingApp;
pub use config::{ConfigLoader, LabelingConfig};
pub use error::{Result, WorkflowError};
pub use platform::{PlatformClient, PlatformServices};
pub use workflow::{StatusMonitor, WorkflowCoordinator, WorkflowStep};
