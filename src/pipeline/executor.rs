//! Sequential execution of a pipeline definition.

use crate::context::RequestContext;
use crate::errors::{ErrorKind, PipelineError};
use crate::identity::Identity;
use crate::pipeline::definition::PipelineDefinition;
use serde_json::{json, Value};

impl PipelineDefinition {
    /// Executes the stages in order for one invocation.
    ///
    /// A fresh [`RequestContext`] is allocated; each stage's request
    /// transform runs, its payload is dispatched to the stage's bound
    /// data source, and the response transform turns the raw result into
    /// the stage's logical output, which becomes `prev` for the next
    /// stage. The final stage's output is the pipeline result.
    ///
    /// Stages never run concurrently within one invocation, and the
    /// first failure aborts the chain: neither the failing stage's
    /// successors nor their request transforms are ever invoked.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] tagged with the failing stage.
    #[tracing::instrument(level = "debug", skip_all, fields(pipeline = %self.name))]
    pub async fn execute(
        &self,
        arguments: Value,
        identity: Option<Identity>,
    ) -> Result<Value, PipelineError> {
        let mut ctx = RequestContext::new(arguments, identity);
        let mut output = Value::Null;

        for stage in &self.stages {
            let stage_name = stage.name().to_string();
            self.event_sink.try_emit(
                "stage.started",
                Some(json!({"pipeline": self.name, "stage": stage_name})),
            );

            let request = stage
                .function
                .request(&mut ctx)
                .map_err(|kind| self.fail(&stage_name, kind))?;

            let raw = stage
                .data_source
                .invoke(request)
                .await
                .map_err(|kind| self.fail(&stage_name, kind))?;

            ctx.result = raw;
            output = stage
                .function
                .response(&mut ctx)
                .map_err(|kind| self.fail(&stage_name, kind))?;
            ctx.result = Value::Null;
            ctx.prev = output.clone();

            self.event_sink.try_emit(
                "stage.completed",
                Some(json!({"pipeline": self.name, "stage": stage_name})),
            );
        }

        self.event_sink.try_emit(
            "pipeline.completed",
            Some(json!({"pipeline": self.name})),
        );
        Ok(output)
    }

    fn fail(&self, stage: &str, kind: ErrorKind) -> PipelineError {
        tracing::warn!(
            pipeline = %self.name,
            stage = %stage,
            error = %kind,
            "stage failed, aborting pipeline"
        );
        self.event_sink.try_emit(
            "stage.failed",
            Some(json!({
                "pipeline": self.name,
                "stage": stage,
                "error": kind.label(),
            })),
        );
        PipelineError::at(stage, kind)
    }
}
