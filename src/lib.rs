//! # Storyflow
//!
//! A pipeline-resolver engine for an AI story-telling service.
//!
//! A client submits a prompt; a four-stage pipeline persists a
//! placeholder row, fetches the upstream API key from the secret store,
//! calls the generation endpoint, and saves the finished story. Inserts
//! on the story table flow through a change feed to the change-stream
//! bridge, which fans them out to `publish` subscribers.
//!
//! - **Pipeline execution**: sequential stages, each a pair of request
//!   and response transforms around a data source call
//! - **Data sources**: document table, signed secret store, generation
//!   HTTP upstream, and a no-op connector
//! - **Change feed**: broadcast insert/modify/remove records with
//!   at-least-once delivery to the bridge
//! - **Subscriptions**: per-field fan-out of mutation results
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use storyflow::prelude::*;
//!
//! let api = Api::builder().config(config).build()?;
//! let story = api
//!     .invoke("createStory", json!({"prompt": "a lighthouse"}), Some(&identity))
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod api;
pub mod bridge;
pub mod config;
pub mod context;
pub mod datasource;
pub mod errors;
pub mod events;
pub mod fields;
pub mod identity;
pub mod model;
pub mod pipeline;
pub mod store;
pub mod subscriptions;
pub mod telemetry;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::api::{Api, ApiBuilder, FieldKind};
    pub use crate::bridge::ChangeStreamBridge;
    pub use crate::config::{ApiStyle, GenerationConfig, SecretStoreConfig, StoryflowConfig};
    pub use crate::context::RequestContext;
    pub use crate::datasource::{
        DataSource, DocumentDataSource, HttpDataSource, NoneDataSource, SecretStoreDataSource,
    };
    pub use crate::errors::{ApiError, BridgeError, ErrorKind, PipelineError};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::identity::{AuthMode, Identity};
    pub use crate::model::Story;
    pub use crate::pipeline::{PipelineBuilder, PipelineDefinition, ResolverFunction, StageDef};
    pub use crate::store::{
        AttributeMap, AttributeValue, ChangeFeed, ChangeRecord, DocumentTable, StreamEventKind,
        UpdateExpression,
    };
    pub use crate::subscriptions::SubscriptionHub;
}
