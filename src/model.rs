//! The persisted story entity and its attribute codec.

use crate::errors::ErrorKind;
use crate::store::attribute::{AttributeMap, AttributeValue};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type discriminator persisted alongside every row.
pub const STORY_TYPENAME: &str = "Story";

/// A generated story.
///
/// `owner` is persisted but never serialized to callers; the caller-facing
/// JSON shape therefore comes from `Serialize`, while storage goes through
/// [`to_attributes`] / [`from_attributes`], which carry every field.
///
/// [`to_attributes`]: Story::to_attributes
/// [`from_attributes`]: Story::from_attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    /// Opaque unique identifier, generated at creation.
    pub id: String,
    /// Subject of the creating caller. Not exposed to callers.
    #[serde(skip_serializing, default)]
    pub owner: String,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
    /// ISO-8601 timestamp of the latest mutation.
    pub updated_at: String,
    /// Whether generation finished and the text was saved.
    pub is_complete: bool,
    /// Generated content; empty until generation completes.
    pub text: String,
}

impl Story {
    /// Creates the initial, incomplete row for a fresh id and owner.
    #[must_use]
    pub fn blank(id: impl Into<String>, owner: impl Into<String>) -> Self {
        let now = now_iso8601();
        Self {
            id: id.into(),
            owner: owner.into(),
            created_at: now.clone(),
            updated_at: now,
            is_complete: false,
            text: String::new(),
        }
    }

    /// Encodes the story into its storage attribute representation.
    #[must_use]
    pub fn to_attributes(&self) -> AttributeMap {
        [
            (
                "__typename".to_string(),
                AttributeValue::S(STORY_TYPENAME.to_string()),
            ),
            ("id".to_string(), AttributeValue::S(self.id.clone())),
            ("owner".to_string(), AttributeValue::S(self.owner.clone())),
            (
                "createdAt".to_string(),
                AttributeValue::S(self.created_at.clone()),
            ),
            (
                "updatedAt".to_string(),
                AttributeValue::S(self.updated_at.clone()),
            ),
            (
                "isComplete".to_string(),
                AttributeValue::Bool(self.is_complete),
            ),
            ("text".to_string(), AttributeValue::S(self.text.clone())),
        ]
        .into_iter()
        .collect()
    }

    /// Decodes a story from its storage attribute representation.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::UpstreamFormat` if a required field is absent
    /// or has the wrong attribute type.
    pub fn from_attributes(attributes: &AttributeMap) -> Result<Self, ErrorKind> {
        let string_field = |name: &str| -> Result<String, ErrorKind> {
            attributes
                .get(name)
                .and_then(AttributeValue::as_s)
                .map(ToString::to_string)
                .ok_or_else(|| {
                    ErrorKind::upstream(format!("story row is missing string field '{name}'"))
                })
        };

        Ok(Self {
            id: string_field("id")?,
            owner: string_field("owner")?,
            created_at: string_field("createdAt")?,
            updated_at: string_field("updatedAt")?,
            is_complete: attributes
                .get("isComplete")
                .and_then(AttributeValue::as_bool)
                .ok_or_else(|| {
                    ErrorKind::upstream("story row is missing boolean field 'isComplete'")
                })?,
            text: string_field("text")?,
        })
    }

    /// Returns the caller-facing JSON shape (owner stripped).
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::UpstreamFormat` if serialization fails.
    pub fn to_api_value(&self) -> Result<Value, ErrorKind> {
        serde_json::to_value(self).map_err(|e| ErrorKind::upstream(e.to_string()))
    }
}

/// Current time as an ISO-8601 string with millisecond precision.
#[must_use]
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
