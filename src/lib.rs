//! storecheck - sequential HTTP scenario runner
//!
//! This library provides the building blocks behind the `storecheck`
//! binary: best-effort response extraction, a single-round-trip HTTP step
//! executor, and an orchestrator that runs ordered step plans with
//! dependency gating and per-assertion verdicts.

pub mod cli;
pub mod commands;
pub mod common;
pub mod extract;
pub mod http;
pub mod mock;
pub mod scenario;

// Re-export commonly used types for tests
pub use common::{Config, Error, Extractor, Result};
pub use scenario::runner::{Runner, ScenarioReport, StepState, Verdict};
pub use scenario::{Scenario, Step};
