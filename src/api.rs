//! The field-invocation surface: wiring of data sources, resolvers,
//! authorization modes, and subscription fan-out.

use crate::config::StoryflowConfig;
use crate::datasource::{
    DataSource, DocumentDataSource, HttpDataSource, NoneDataSource, SecretStoreDataSource,
};
use crate::errors::{ApiError, ErrorKind};
use crate::events::{EventSink, LoggingEventSink};
use crate::fields;
use crate::identity::{AuthMode, Identity};
use crate::pipeline::PipelineDefinition;
use crate::store::stream::ChangeRecord;
use crate::store::table::DocumentTable;
use crate::subscriptions::SubscriptionHub;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Whether a field reads or mutates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Read-only field.
    Query,
    /// Mutating field; successful results fan out to subscribers.
    Mutation,
}

/// One registered field.
pub struct FieldResolver {
    kind: FieldKind,
    auth: AuthMode,
    pipeline: Arc<PipelineDefinition>,
}

impl FieldResolver {
    /// Returns the field's pipeline definition.
    #[must_use]
    pub fn pipeline(&self) -> &Arc<PipelineDefinition> {
        &self.pipeline
    }
}

/// The assembled API.
///
/// Holds the immutable field registry, the story table (and with it the
/// change feed), and the subscription hub. Concurrent invocations share
/// nothing but these read-mostly handles; each execution allocates its
/// own context.
pub struct Api {
    fields: HashMap<String, FieldResolver>,
    hub: SubscriptionHub,
    table: Arc<DocumentTable>,
}

impl Api {
    /// Starts building an API.
    #[must_use]
    pub fn builder() -> ApiBuilder {
        ApiBuilder::new()
    }

    /// Invokes a field.
    ///
    /// Anonymous callers are rejected before the pipeline runs for
    /// fields that require an identity. On mutation success the result
    /// is fanned out to the field's subscribers.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] for unknown fields, failed authorization, or
    /// an aborted pipeline.
    pub async fn invoke(
        &self,
        field: &str,
        arguments: Value,
        identity: Option<&Identity>,
    ) -> Result<Value, ApiError> {
        let resolver = self
            .fields
            .get(field)
            .ok_or_else(|| ApiError::UnknownField(field.to_string()))?;

        if !resolver.auth.permits(identity) {
            return Err(ApiError::Unauthorized {
                field: field.to_string(),
            });
        }

        let result = resolver
            .pipeline
            .execute(arguments, identity.cloned())
            .await?;

        if resolver.kind == FieldKind::Mutation {
            let delivered = self.hub.publish(field, result.clone());
            tracing::debug!(field = %field, subscribers = delivered, "mutation fanned out");
        }
        Ok(result)
    }

    /// Subscribes to a mutation field's results.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::UnknownField` for fields without a channel.
    pub fn subscribe(&self, field: &str) -> Result<broadcast::Receiver<Value>, ApiError> {
        self.hub
            .subscribe(field)
            .ok_or_else(|| ApiError::UnknownField(field.to_string()))
    }

    /// Subscribes to the story table's change feed at its latest position.
    #[must_use]
    pub fn change_feed(&self) -> broadcast::Receiver<ChangeRecord> {
        self.table.subscribe()
    }

    /// Returns the story table.
    #[must_use]
    pub fn table(&self) -> &Arc<DocumentTable> {
        &self.table
    }

    /// Returns the registered field names.
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }
}

/// Builder for [`Api`].
///
/// Test deployments may inject fake secret-store and generation data
/// sources; everything else is constructed from configuration.
pub struct ApiBuilder {
    config: StoryflowConfig,
    table: Option<Arc<DocumentTable>>,
    secret_source: Option<Arc<dyn DataSource>>,
    generation_source: Option<Arc<dyn DataSource>>,
    event_sink: Option<Arc<dyn EventSink>>,
}

impl ApiBuilder {
    /// Creates a builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: StoryflowConfig::default(),
            table: None,
            secret_source: None,
            generation_source: None,
            event_sink: None,
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: StoryflowConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses an existing story table.
    #[must_use]
    pub fn table(mut self, table: Arc<DocumentTable>) -> Self {
        self.table = Some(table);
        self
    }

    /// Overrides the secret-store data source.
    #[must_use]
    pub fn secret_source(mut self, source: Arc<dyn DataSource>) -> Self {
        self.secret_source = Some(source);
        self
    }

    /// Overrides the generation data source.
    #[must_use]
    pub fn generation_source(mut self, source: Arc<dyn DataSource>) -> Self {
        self.generation_source = Some(source);
        self
    }

    /// Sets the event sink shared by every pipeline.
    #[must_use]
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Wires the data sources, pipelines and registry.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::Validation` if a pipeline cannot be built.
    pub fn build(self) -> Result<Api, ErrorKind> {
        let sink: Arc<dyn EventSink> = self
            .event_sink
            .unwrap_or_else(|| Arc::new(LoggingEventSink::debug()));
        let table = self
            .table
            .unwrap_or_else(|| Arc::new(DocumentTable::new("stories")));

        let story_source: Arc<dyn DataSource> = Arc::new(DocumentDataSource::new(
            "storyTableDataSource",
            table.clone(),
        ));
        let secret_source: Arc<dyn DataSource> = self.secret_source.unwrap_or_else(|| {
            Arc::new(SecretStoreDataSource::new(
                "secretStoreDataSource",
                self.config.secret.clone(),
            ))
        });
        let generation_source: Arc<dyn DataSource> = self.generation_source.unwrap_or_else(|| {
            Arc::new(HttpDataSource::new(
                "generationDataSource",
                self.config.generation.endpoint.clone(),
                self.config.generation.timeout(),
            ))
        });
        let none_source: Arc<dyn DataSource> = Arc::new(NoneDataSource::new("noneDataSource"));

        let mut fields = HashMap::new();
        fields.insert(
            "listStories".to_string(),
            FieldResolver {
                kind: FieldKind::Query,
                // Readable without an identity, matching the read grant
                // for unauthenticated callers.
                auth: AuthMode::AllowAnonymous,
                pipeline: Arc::new(fields::list_stories::pipeline(
                    story_source.clone(),
                    sink.clone(),
                )?),
            },
        );
        fields.insert(
            "createStory".to_string(),
            FieldResolver {
                kind: FieldKind::Mutation,
                auth: AuthMode::Required,
                pipeline: Arc::new(fields::create_story::pipeline(
                    story_source,
                    secret_source,
                    generation_source,
                    self.config.secret.secret_name.clone(),
                    self.config.generation.clone(),
                    sink.clone(),
                )?),
            },
        );
        fields.insert(
            "publish".to_string(),
            FieldResolver {
                kind: FieldKind::Mutation,
                auth: AuthMode::Required,
                pipeline: Arc::new(fields::publish::pipeline(none_source, sink)?),
            },
        );

        let hub = SubscriptionHub::default();
        for (name, resolver) in &fields {
            if resolver.kind == FieldKind::Mutation {
                hub.register(name.clone());
            }
        }

        Ok(Api { fields, hub, table })
    }
}

impl Default for ApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}
