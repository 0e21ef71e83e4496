//! The single-stage `listStories` resolver.

use crate::context::RequestContext;
use crate::datasource::document::DocumentRequest;
use crate::datasource::DataSource;
use crate::errors::ErrorKind;
use crate::events::EventSink;
use crate::model::Story;
use crate::pipeline::{PipelineDefinition, ResolverFunction};
use serde_json::Value;
use std::sync::Arc;

/// Scans the story table and returns every row, complete or not.
///
/// Rows left behind by failed `createStory` runs are included by design;
/// partial failure is visible to readers.
#[derive(Debug, Default)]
pub struct ListStoriesFunction;

impl ResolverFunction for ListStoriesFunction {
    fn name(&self) -> &str {
        "listStories"
    }

    fn request(&self, _ctx: &mut RequestContext) -> Result<Value, ErrorKind> {
        serde_json::to_value(DocumentRequest::Scan)
            .map_err(|e| ErrorKind::validation(e.to_string()))
    }

    fn response(&self, ctx: &mut RequestContext) -> Result<Value, ErrorKind> {
        let items = ctx
            .result
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| ErrorKind::upstream("scan result carries no items"))?;

        let stories = items
            .iter()
            .map(|item| {
                let story: Story = serde_json::from_value(item.clone())
                    .map_err(|e| ErrorKind::upstream(format!("row is not a story: {e}")))?;
                story.to_api_value()
            })
            .collect::<Result<Vec<Value>, ErrorKind>>()?;

        Ok(Value::Array(stories))
    }
}

/// Assembles the single-stage scan pipeline.
///
/// # Errors
///
/// Returns `ErrorKind::Validation` if the definition cannot be built.
pub fn pipeline(
    story_db: Arc<dyn DataSource>,
    sink: Arc<dyn EventSink>,
) -> Result<PipelineDefinition, ErrorKind> {
    PipelineDefinition::builder("listStories")
        .stage(Arc::new(ListStoriesFunction), story_db)
        .event_sink(sink)
        .build()
}
