// src/dag/mod.rs

//! Stage DAG representation and analysis.
//!
//! - [`stage`] holds the stage record and its date window.
//! - [`graph`] holds the in-memory DAG with forward and backward adjacency.
//! - [`critical_path`] finds the longest duration chain through the DAG.

pub mod critical_path;
pub mod graph;
pub mod stage;

pub use critical_path::CriticalPath;
pub use graph::StageGraph;
pub use stage::{DateWindow, Stage, StageId};
