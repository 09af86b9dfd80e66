// src/config/mod.rs

//! Project file loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`), including the
//!   `[policy]` thresholds used by the schedule engine.
//! - Load, render and patch project files (`loader.rs`).
//! - Validate basic invariants like DAG correctness (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{ProjectFile, ProjectSection, RawProjectFile, SchedulePolicy, StageConfig};
