//! The pipeline engine: definitions and their sequential executor.

pub mod definition;
pub mod executor;

pub use definition::{PipelineBuilder, PipelineDefinition, ResolverFunction, StageDef};
