//! Traits for the generation pipeline.

use super::{GenerationReport, PipelineError};

/// Trait for validating request objects.
pub trait Validator {
    /// Validate the state of the object.
    fn validate(&self) -> Result<(), String>;
}

/// Trait for artifact generators.
pub trait Generator<Req> {
    /// Generate every artifact for the request.
    fn generate(&self, request: Req) -> Result<GenerationReport, PipelineError>;
}
