//! Pipeline definitions: resolver functions, stages, and the builder.

use crate::context::RequestContext;
use crate::datasource::DataSource;
use crate::errors::ErrorKind;
use crate::events::{EventSink, NoOpEventSink};
use std::sync::Arc;

/// One field function: a request transform paired with a response
/// transform.
///
/// The request transform reads the context and produces the payload for
/// the stage's bound data source; the response transform reads the raw
/// backend result off the context and produces the stage's logical
/// output. Transforms perform no I/O of their own and return errors
/// instead of panicking.
pub trait ResolverFunction: Send + Sync {
    /// Returns the stage name used in errors, events and logs.
    fn name(&self) -> &str;

    /// Builds the backend request payload from the current context.
    ///
    /// # Errors
    ///
    /// Any error aborts the pipeline at this stage.
    fn request(&self, ctx: &mut RequestContext) -> Result<serde_json::Value, ErrorKind>;

    /// Produces the stage's logical output from `ctx.result`.
    ///
    /// # Errors
    ///
    /// Treated identically to a backend failure of this stage.
    fn response(&self, ctx: &mut RequestContext) -> Result<serde_json::Value, ErrorKind>;
}

/// One stage: a resolver function statically bound to a data source.
#[derive(Clone)]
pub struct StageDef {
    /// The transform pair.
    pub function: Arc<dyn ResolverFunction>,
    /// The backend the request payload is dispatched to.
    pub data_source: Arc<dyn DataSource>,
}

impl StageDef {
    /// Creates a stage binding.
    #[must_use]
    pub fn new(function: Arc<dyn ResolverFunction>, data_source: Arc<dyn DataSource>) -> Self {
        Self {
            function,
            data_source,
        }
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.function.name()
    }
}

impl std::fmt::Debug for StageDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageDef")
            .field("stage", &self.name())
            .field("data_source", &self.data_source.name())
            .finish()
    }
}

/// An ordered, immutable sequence of stages for one field.
///
/// Definitions are authored once at startup and shared read-only across
/// all concurrent executions of the field.
pub struct PipelineDefinition {
    pub(crate) name: String,
    pub(crate) stages: Vec<StageDef>,
    pub(crate) event_sink: Arc<dyn EventSink>,
}

impl PipelineDefinition {
    /// Starts building a definition for the named field.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> PipelineBuilder {
        PipelineBuilder {
            name: name.into(),
            stages: Vec::new(),
            event_sink: None,
        }
    }

    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(StageDef::name).collect()
    }
}

impl std::fmt::Debug for PipelineDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineDefinition")
            .field("name", &self.name)
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// Builder for [`PipelineDefinition`].
pub struct PipelineBuilder {
    name: String,
    stages: Vec<StageDef>,
    event_sink: Option<Arc<dyn EventSink>>,
}

impl PipelineBuilder {
    /// Appends a stage.
    #[must_use]
    pub fn stage(
        mut self,
        function: Arc<dyn ResolverFunction>,
        data_source: Arc<dyn DataSource>,
    ) -> Self {
        self.stages.push(StageDef::new(function, data_source));
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Finalizes the definition.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::Validation` for an empty pipeline.
    pub fn build(self) -> Result<PipelineDefinition, ErrorKind> {
        if self.stages.is_empty() {
            return Err(ErrorKind::validation(format!(
                "pipeline '{}' has no stages",
                self.name
            )));
        }
        Ok(PipelineDefinition {
            name: self.name,
            stages: self.stages,
            event_sink: self.event_sink.unwrap_or_else(|| Arc::new(NoOpEventSink)),
        })
    }
}
