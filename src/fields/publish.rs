//! The single-stage `publish` resolver.
//!
//! The field exists to be subscribed to: invoking it is how a
//! server-side event becomes a client-visible subscription event. The
//! stage itself is a pure pass-through over the no-op connector; fan-out
//! happens in the layer above once the pipeline completes.

use crate::context::RequestContext;
use crate::datasource::DataSource;
use crate::errors::ErrorKind;
use crate::events::EventSink;
use crate::pipeline::{PipelineDefinition, ResolverFunction};
use serde_json::Value;
use std::sync::Arc;

/// Forwards `arguments.data` unchanged.
#[derive(Debug, Default)]
pub struct PublishFunction;

impl ResolverFunction for PublishFunction {
    fn name(&self) -> &str {
        "publish"
    }

    fn request(&self, ctx: &mut RequestContext) -> Result<Value, ErrorKind> {
        Ok(Value::String(ctx.string_argument("data")?))
    }

    fn response(&self, ctx: &mut RequestContext) -> Result<Value, ErrorKind> {
        Ok(ctx.result.clone())
    }
}

/// Assembles the single-stage pass-through pipeline.
///
/// # Errors
///
/// Returns `ErrorKind::Validation` if the definition cannot be built.
pub fn pipeline(
    none_source: Arc<dyn DataSource>,
    sink: Arc<dyn EventSink>,
) -> Result<PipelineDefinition, ErrorKind> {
    PipelineDefinition::builder("publish")
        .stage(Arc::new(PublishFunction), none_source)
        .event_sink(sink)
        .build()
}
