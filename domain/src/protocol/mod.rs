//! Protocol domain module
//!
//! A protocol is a declarative workflow: ordered phases of tool-calling
//! steps whose arguments are templates rendered against run variables and
//! earlier step results.
//!
//! - [`definition`] - the document shape and its structural validation
//! - [`interpolation`] - `{{ path }}` placeholder rendering
//! - [`run`] - per-run state, results and async job records

pub mod definition;
pub mod interpolation;
pub mod run;

pub use definition::{ErrorPolicy, Phase, ProtocolDefinition, ProtocolMetadata, Step, ValidationError};
pub use interpolation::{RESULTS_SCOPE, placeholders, render};
pub use run::{ExecutionState, JobId, ProtocolJob, RunResult, RunStatus, SkippedStep};
