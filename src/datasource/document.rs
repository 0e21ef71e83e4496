//! Document-store connector.

use crate::datasource::DataSource;
use crate::errors::ErrorKind;
use crate::store::attribute::{map_to_json, AttributeMap, AttributeValue};
use crate::store::table::{DocumentTable, UpdateExpression};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Structured requests the document connector accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation")]
pub enum DocumentRequest {
    /// Write a row, overwriting any existing row with the same key.
    PutItem {
        /// The row key, as an attribute map containing `id`.
        key: AttributeMap,
        /// Attribute values of the row.
        attribute_values: AttributeMap,
    },
    /// Apply an update expression to an existing row.
    UpdateItem {
        /// The row key.
        key: AttributeMap,
        /// The update to apply.
        update: UpdateExpression,
    },
    /// Delete a row.
    DeleteItem {
        /// The row key.
        key: AttributeMap,
    },
    /// Return every row.
    Scan,
}

/// Connector for a [`DocumentTable`].
///
/// Requests carry attribute-encoded values; results come back as plain
/// JSON, decoded row by row.
#[derive(Debug)]
pub struct DocumentDataSource {
    name: String,
    table: Arc<DocumentTable>,
}

impl DocumentDataSource {
    /// Creates a connector bound to the given table.
    #[must_use]
    pub fn new(name: impl Into<String>, table: Arc<DocumentTable>) -> Self {
        Self {
            name: name.into(),
            table,
        }
    }

    /// Returns the bound table.
    #[must_use]
    pub fn table(&self) -> &Arc<DocumentTable> {
        &self.table
    }

    fn key_id(key: &AttributeMap) -> Result<String, ErrorKind> {
        key.get("id")
            .and_then(AttributeValue::as_s)
            .map(ToString::to_string)
            .ok_or_else(|| ErrorKind::validation("request key must contain a string 'id'"))
    }
}

#[async_trait]
impl DataSource for DocumentDataSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, request: Value) -> Result<Value, ErrorKind> {
        let request: DocumentRequest = serde_json::from_value(request)
            .map_err(|e| ErrorKind::validation(format!("malformed document request: {e}")))?;

        match request {
            DocumentRequest::PutItem {
                key,
                attribute_values,
            } => {
                let id = Self::key_id(&key)?;
                let mut row = attribute_values;
                // The key wins over any conflicting attribute value.
                for (name, value) in key {
                    row.insert(name, value);
                }
                let stored = self.table.put_item(id, row);
                Ok(map_to_json(&stored))
            }
            DocumentRequest::UpdateItem { key, update } => {
                let id = Self::key_id(&key)?;
                let updated = self.table.update_item(&id, &update)?;
                Ok(map_to_json(&updated))
            }
            DocumentRequest::DeleteItem { key } => {
                let id = Self::key_id(&key)?;
                Ok(self
                    .table
                    .delete_item(&id)
                    .map_or(Value::Null, |old| map_to_json(&old)))
            }
            DocumentRequest::Scan => {
                let items: Vec<Value> = self.table.scan().iter().map(map_to_json).collect();
                Ok(json!({
                    "items": items,
                    "scanned_count": items.len(),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn source() -> DocumentDataSource {
        DocumentDataSource::new("storyTable", Arc::new(DocumentTable::new("stories")))
    }

    fn put_request(id: &str, text: &str) -> Value {
        json!({
            "operation": "PutItem",
            "key": {"id": {"S": id}},
            "attribute_values": {
                "text": {"S": text},
                "isComplete": {"BOOL": false},
            },
        })
    }

    #[tokio::test]
    async fn put_merges_key_into_row() {
        let source = source();
        let stored = source.invoke(put_request("a", "hello")).await.unwrap();

        assert_eq!(stored.get("id"), Some(&json!("a")));
        assert_eq!(stored.get("text"), Some(&json!("hello")));
        assert_eq!(stored.get("isComplete"), Some(&json!(false)));
    }

    #[tokio::test]
    async fn update_decodes_to_plain_json() {
        let source = source();
        source.invoke(put_request("a", "")).await.unwrap();

        let updated = source
            .invoke(json!({
                "operation": "UpdateItem",
                "key": {"id": {"S": "a"}},
                "update": {
                    "expression": "set text = :text, isComplete = :isComplete",
                    "expression_values": {
                        ":text": {"S": "done"},
                        ":isComplete": {"BOOL": true},
                    },
                },
            }))
            .await
            .unwrap();

        assert_eq!(updated.get("text"), Some(&json!("done")));
        assert_eq!(updated.get("isComplete"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn update_on_missing_key_fails() {
        let source = source();
        let err = source
            .invoke(json!({
                "operation": "UpdateItem",
                "key": {"id": {"S": "ghost"}},
                "update": {
                    "expression": "set text = :text",
                    "expression_values": {":text": {"S": "x"}},
                },
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn scan_returns_every_row() {
        let source = source();
        source.invoke(put_request("a", "one")).await.unwrap();
        source.invoke(put_request("b", "two")).await.unwrap();

        let result = source.invoke(json!({"operation": "Scan"})).await.unwrap();
        assert_eq!(result.get("scanned_count"), Some(&json!(2)));
        assert_eq!(result["items"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn malformed_request_is_a_validation_error() {
        let source = source();
        let err = source
            .invoke(json!({"operation": "BatchWrite"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ErrorKind::Validation(_)));

        let err = source
            .invoke(json!({
                "operation": "PutItem",
                "key": {"name": {"S": "no id"}},
                "attribute_values": {},
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, ErrorKind::Validation(_)));
    }
}
