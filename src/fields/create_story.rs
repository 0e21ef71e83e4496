//! The four-stage `createStory` workflow.
//!
//! init (document) -> getSecret (secret store) -> generateStory (HTTP)
//! -> saveStory (document). Stage 1 persists an empty, incomplete row and
//! parks the fresh id in the stash; stage 4 reads it back and completes
//! the row with the generated text. A failure in stages 2-4 leaves the
//! incomplete row in place: it stays visible to list queries and is
//! never rolled back.

use crate::config::{ApiStyle, GenerationConfig};
use crate::context::RequestContext;
use crate::datasource::document::DocumentRequest;
use crate::datasource::http::{HttpParams, HttpRequest};
use crate::datasource::DataSource;
use crate::errors::ErrorKind;
use crate::events::EventSink;
use crate::model::{now_iso8601, Story};
use crate::pipeline::{PipelineDefinition, ResolverFunction};
use crate::store::attribute::{AttributeMap, AttributeValue};
use crate::store::table::UpdateExpression;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Stash key carrying the generated row id from stage 1 to stage 4.
const STASH_ID: &str = "id";

fn id_key(id: &str) -> AttributeMap {
    [("id".to_string(), AttributeValue::S(id.to_string()))]
        .into_iter()
        .collect()
}

fn to_payload(request: &DocumentRequest) -> Result<Value, ErrorKind> {
    serde_json::to_value(request).map_err(|e| ErrorKind::validation(e.to_string()))
}

/// Stage 1: create the empty story row.
#[derive(Debug, Default)]
pub struct InitFunction;

impl ResolverFunction for InitFunction {
    fn name(&self) -> &str {
        "init"
    }

    fn request(&self, ctx: &mut RequestContext) -> Result<Value, ErrorKind> {
        // Arguments are validated up front even though the prompt is not
        // used until stage 3; a bad prompt must not leave a row behind.
        ctx.string_argument("prompt")?;
        let owner = ctx.require_identity()?.sub.clone();

        let id = Uuid::new_v4().to_string();
        ctx.stash_put(STASH_ID, json!(id));

        let story = Story::blank(&id, owner);
        to_payload(&DocumentRequest::PutItem {
            key: id_key(&id),
            attribute_values: story.to_attributes(),
        })
    }

    fn response(&self, _ctx: &mut RequestContext) -> Result<Value, ErrorKind> {
        // Nothing flows to stage 2 through prev; the id travels in the stash.
        Ok(json!({}))
    }
}

/// Stage 2: fetch the generation credential.
#[derive(Debug)]
pub struct GetSecretFunction {
    secret_name: String,
}

impl GetSecretFunction {
    /// Creates the stage for the single permitted secret name.
    #[must_use]
    pub fn new(secret_name: impl Into<String>) -> Self {
        Self {
            secret_name: secret_name.into(),
        }
    }
}

impl ResolverFunction for GetSecretFunction {
    fn name(&self) -> &str {
        "getSecret"
    }

    fn request(&self, _ctx: &mut RequestContext) -> Result<Value, ErrorKind> {
        Ok(json!({"name": self.secret_name}))
    }

    fn response(&self, ctx: &mut RequestContext) -> Result<Value, ErrorKind> {
        Ok(ctx.result.clone())
    }
}

/// Stage 3: call the generation upstream.
#[derive(Debug)]
pub struct GenerateStoryFunction {
    config: GenerationConfig,
}

impl GenerateStoryFunction {
    /// Creates the stage with the configured upstream call shape.
    #[must_use]
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }

    fn body(&self, prompt: &str) -> Value {
        let mut body = Map::new();
        body.insert("model".to_string(), json!(self.config.model));
        match self.config.api_style {
            ApiStyle::Chat => {
                body.insert(
                    "messages".to_string(),
                    json!([
                        {"role": "system", "content": self.config.system_prompt},
                        {"role": "user", "content": prompt},
                    ]),
                );
            }
            ApiStyle::Completion => {
                body.insert(
                    "prompt".to_string(),
                    json!(format!("{}\n\n{prompt}", self.config.system_prompt)),
                );
            }
        }
        if let Some(max_tokens) = self.config.max_tokens {
            body.insert("max_tokens".to_string(), json!(max_tokens));
        }
        if let Some(temperature) = self.config.temperature {
            body.insert("temperature".to_string(), json!(temperature));
        }
        Value::Object(body)
    }

    fn extract_text(&self, body: &Value) -> Result<String, ErrorKind> {
        let text = match self.config.api_style {
            ApiStyle::Chat => body
                .pointer("/choices/0/message/content")
                .and_then(Value::as_str),
            ApiStyle::Completion => body.pointer("/choices/0/text").and_then(Value::as_str),
        }
        .ok_or_else(|| ErrorKind::upstream("generation response has no text choice"))?;

        if text.is_empty() {
            return Err(ErrorKind::upstream("generation response text is empty"));
        }
        Ok(text.to_string())
    }
}

impl ResolverFunction for GenerateStoryFunction {
    fn name(&self) -> &str {
        "generateStory"
    }

    fn request(&self, ctx: &mut RequestContext) -> Result<Value, ErrorKind> {
        let secret = ctx
            .prev
            .as_str()
            .ok_or_else(|| ErrorKind::upstream("secret stage produced a non-string value"))?
            .to_string();
        let prompt = ctx.string_argument("prompt")?;

        let request = HttpRequest {
            method: "POST".to_string(),
            resource_path: self.config.resource_path().to_string(),
            params: HttpParams {
                headers: [
                    ("Content-Type".to_string(), "application/json".to_string()),
                    ("Authorization".to_string(), format!("Bearer {secret}")),
                ]
                .into_iter()
                .collect(),
                query: Default::default(),
                body: Some(self.body(&prompt)),
            },
        };
        serde_json::to_value(request).map_err(|e| ErrorKind::validation(e.to_string()))
    }

    fn response(&self, ctx: &mut RequestContext) -> Result<Value, ErrorKind> {
        let raw_body = ctx
            .result
            .get("body")
            .and_then(Value::as_str)
            .ok_or_else(|| ErrorKind::upstream("upstream result carries no body"))?;
        let body: Value = serde_json::from_str(raw_body)
            .map_err(|e| ErrorKind::upstream(format!("upstream body is not JSON: {e}")))?;
        Ok(Value::String(self.extract_text(&body)?))
    }
}

/// Stage 4: complete the story row with the generated text.
#[derive(Debug, Default)]
pub struct SaveStoryFunction;

impl ResolverFunction for SaveStoryFunction {
    fn name(&self) -> &str {
        "saveStory"
    }

    fn request(&self, ctx: &mut RequestContext) -> Result<Value, ErrorKind> {
        let id = ctx.stash_string(STASH_ID)?;
        let text = ctx
            .prev
            .as_str()
            .ok_or_else(|| ErrorKind::upstream("generation stage produced a non-string value"))?
            .to_string();

        to_payload(&DocumentRequest::UpdateItem {
            key: id_key(&id),
            update: UpdateExpression {
                expression: "set updatedAt = :updatedAt, isComplete = :isComplete, text = :text"
                    .to_string(),
                expression_values: [
                    (
                        ":updatedAt".to_string(),
                        AttributeValue::S(now_iso8601()),
                    ),
                    (":isComplete".to_string(), AttributeValue::Bool(true)),
                    (":text".to_string(), AttributeValue::S(text)),
                ]
                .into_iter()
                .collect(),
            },
        })
    }

    fn response(&self, ctx: &mut RequestContext) -> Result<Value, ErrorKind> {
        let story: Story = serde_json::from_value(ctx.result.clone())
            .map_err(|e| ErrorKind::upstream(format!("updated row is not a story: {e}")))?;
        story.to_api_value()
    }
}

/// Assembles the four-stage pipeline over its three data sources.
///
/// # Errors
///
/// Returns `ErrorKind::Validation` if the definition cannot be built.
pub fn pipeline(
    story_db: Arc<dyn DataSource>,
    secret_store: Arc<dyn DataSource>,
    generation: Arc<dyn DataSource>,
    secret_name: impl Into<String>,
    config: GenerationConfig,
    sink: Arc<dyn EventSink>,
) -> Result<PipelineDefinition, ErrorKind> {
    PipelineDefinition::builder("createStory")
        .stage(Arc::new(InitFunction), story_db.clone())
        .stage(Arc::new(GetSecretFunction::new(secret_name)), secret_store)
        .stage(Arc::new(GenerateStoryFunction::new(config)), generation)
        .stage(Arc::new(SaveStoryFunction), story_db)
        .event_sink(sink)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use pretty_assertions::assert_eq;

    fn ctx_with_prompt(prompt: &str) -> RequestContext {
        RequestContext::new(json!({"prompt": prompt}), Some(Identity::user("user-1")))
    }

    #[test]
    fn init_stashes_the_id_and_builds_a_put() {
        let mut ctx = ctx_with_prompt("a brave snail");
        let payload = InitFunction.request(&mut ctx).unwrap();

        let id = ctx.stash_string("id").unwrap();
        assert_eq!(payload["operation"], json!("PutItem"));
        assert_eq!(payload["key"]["id"]["S"], json!(id));
        assert_eq!(payload["attribute_values"]["owner"]["S"], json!("user-1"));
        assert_eq!(payload["attribute_values"]["isComplete"]["BOOL"], json!(false));
        assert_eq!(payload["attribute_values"]["text"]["S"], json!(""));
    }

    #[test]
    fn init_rejects_anonymous_callers() {
        let mut ctx = RequestContext::new(json!({"prompt": "x"}), None);
        assert!(matches!(
            InitFunction.request(&mut ctx),
            Err(ErrorKind::AuthorizationDenied(_))
        ));
    }

    #[test]
    fn init_rejects_missing_prompt_before_writing() {
        let mut ctx = RequestContext::new(json!({}), Some(Identity::user("u")));
        assert!(matches!(
            InitFunction.request(&mut ctx),
            Err(ErrorKind::Validation(_))
        ));
        assert!(ctx.stash_get("id").is_none());
    }

    #[test]
    fn get_secret_requests_the_fixed_name() {
        let stage = GetSecretFunction::new("OPENAI_SECRET");
        let mut ctx = ctx_with_prompt("x");
        assert_eq!(
            stage.request(&mut ctx).unwrap(),
            json!({"name": "OPENAI_SECRET"})
        );

        ctx.result = json!("sk-abc");
        assert_eq!(stage.response(&mut ctx).unwrap(), json!("sk-abc"));
    }

    #[test]
    fn generate_builds_a_bearer_chat_request() {
        let stage = GenerateStoryFunction::new(GenerationConfig::new());
        let mut ctx = ctx_with_prompt("a brave snail");
        ctx.prev = json!("sk-abc");

        let payload = stage.request(&mut ctx).unwrap();
        assert_eq!(payload["method"], json!("POST"));
        assert_eq!(payload["resource_path"], json!("/v1/chat/completions"));
        assert_eq!(
            payload["params"]["headers"]["Authorization"],
            json!("Bearer sk-abc")
        );
        assert_eq!(
            payload["params"]["body"]["messages"][1]["content"],
            json!("a brave snail")
        );
    }

    #[test]
    fn generate_completion_style_concatenates_the_prompt() {
        let config = GenerationConfig::new()
            .with_api_style(ApiStyle::Completion)
            .with_max_tokens(256);
        let stage = GenerateStoryFunction::new(config);
        let mut ctx = ctx_with_prompt("a brave snail");
        ctx.prev = json!("sk-abc");

        let payload = stage.request(&mut ctx).unwrap();
        assert_eq!(payload["resource_path"], json!("/v1/completions"));
        assert_eq!(payload["params"]["body"]["max_tokens"], json!(256));
        let prompt = payload["params"]["body"]["prompt"].as_str().unwrap();
        assert!(prompt.ends_with("a brave snail"));
    }

    #[test]
    fn generate_parses_each_api_style() {
        let chat = GenerateStoryFunction::new(GenerationConfig::new());
        let mut ctx = ctx_with_prompt("x");
        ctx.result = json!({
            "status_code": 200,
            "headers": {},
            "body": r#"{"choices": [{"message": {"content": "Once upon a time."}}]}"#,
        });
        assert_eq!(
            chat.response(&mut ctx).unwrap(),
            json!("Once upon a time.")
        );

        let completion = GenerateStoryFunction::new(
            GenerationConfig::new().with_api_style(ApiStyle::Completion),
        );
        ctx.result = json!({
            "status_code": 200,
            "headers": {},
            "body": r#"{"choices": [{"text": "The end."}]}"#,
        });
        assert_eq!(completion.response(&mut ctx).unwrap(), json!("The end."));
    }

    #[test]
    fn generate_rejects_malformed_upstream_bodies() {
        let stage = GenerateStoryFunction::new(GenerationConfig::new());
        let mut ctx = ctx_with_prompt("x");

        ctx.result = json!({"status_code": 200, "headers": {}, "body": "not json"});
        assert!(matches!(
            stage.response(&mut ctx),
            Err(ErrorKind::UpstreamFormat(_))
        ));

        ctx.result = json!({"status_code": 200, "headers": {}, "body": r#"{"choices": []}"#});
        assert!(matches!(
            stage.response(&mut ctx),
            Err(ErrorKind::UpstreamFormat(_))
        ));

        ctx.result = json!({
            "status_code": 200,
            "headers": {},
            "body": r#"{"choices": [{"message": {"content": ""}}]}"#,
        });
        assert!(matches!(
            stage.response(&mut ctx),
            Err(ErrorKind::UpstreamFormat(_))
        ));
    }

    #[test]
    fn save_reads_the_stashed_id_not_prev() {
        let mut ctx = ctx_with_prompt("x");
        ctx.stash_put("id", json!("row-1"));
        ctx.prev = json!("Once upon a time.");

        let payload = SaveStoryFunction.request(&mut ctx).unwrap();
        assert_eq!(payload["operation"], json!("UpdateItem"));
        assert_eq!(payload["key"]["id"]["S"], json!("row-1"));
        assert_eq!(
            payload["update"]["expression_values"][":text"]["S"],
            json!("Once upon a time.")
        );
        assert_eq!(
            payload["update"]["expression_values"][":isComplete"]["BOOL"],
            json!(true)
        );
    }

    #[test]
    fn save_fails_without_a_stashed_id() {
        let mut ctx = ctx_with_prompt("x");
        ctx.prev = json!("text");
        assert!(matches!(
            SaveStoryFunction.request(&mut ctx),
            Err(ErrorKind::Validation(_))
        ));
    }

    #[test]
    fn save_response_strips_the_owner() {
        let mut ctx = ctx_with_prompt("x");
        ctx.result = json!({
            "__typename": "Story",
            "id": "row-1",
            "owner": "user-1",
            "createdAt": "2024-05-01T10:00:00.000Z",
            "updatedAt": "2024-05-01T10:00:05.000Z",
            "isComplete": true,
            "text": "Once upon a time.",
        });

        let result = SaveStoryFunction.response(&mut ctx).unwrap();
        assert!(result.get("owner").is_none());
        assert_eq!(result["isComplete"], json!(true));
        assert_eq!(result["text"], json!("Once upon a time."));
    }
}
