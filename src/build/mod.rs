//! Build pipeline for the site.
//!
//! Replaces a task-runner file with a fixed graph of named stages that
//! compile assets, generate the site, minify it and publish it.
//!
//! # Overview
//!
//! The build pipeline consists of:
//! - **Stages**: the named units of work and their prerequisites
//! - **Planning**: expand a requested stage into an ordered [`StagePlan`]
//! - **Execution**: run each planned stage, stopping at the first failure
//!
//! # Example
//!
//! ```ignore
//! use sitekit::build::{BuildContext, Pipeline, Stage};
//! use sitekit::config::load_project;
//!
//! let (config, project_root) = load_project()?;
//! let pipeline = Pipeline::new(BuildContext::new(config, project_root));
//!
//! let result = pipeline.run(Stage::ProductionBuild);
//! println!("{}", result.summary());
//! ```

pub mod context;
pub mod pipeline;
pub mod progress;
pub mod result;
pub mod stage;

pub use context::*;
pub use pipeline::*;
pub use progress::*;
pub use result::*;
pub use stage::*;
