//! The change-stream bridge: storage insert events become publish
//! invocations.

use crate::api::Api;
use crate::errors::BridgeError;
use crate::identity::Identity;
use crate::store::attribute::map_to_json;
use crate::store::stream::{ChangeRecord, StreamEventKind};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Long-lived consumer of the table's mutation feed.
///
/// Only insert records are forwarded; each one triggers exactly one
/// `publish` invocation carrying the new row serialized as the `data`
/// argument. The feed is at-least-once, so downstream subscribers may
/// observe duplicate notifications; the serialized row's `id` and
/// `updatedAt` fields are the dedup key a subscriber would use. The
/// bridge itself neither deduplicates nor retries: a failed invocation
/// is returned to the host, whose redelivery policy owns recovery.
pub struct ChangeStreamBridge {
    api: Arc<Api>,
    identity: Identity,
}

impl ChangeStreamBridge {
    /// Creates a bridge publishing through the given API.
    #[must_use]
    pub fn new(api: Arc<Api>) -> Self {
        Self {
            api,
            identity: Identity::service("change-stream-bridge"),
        }
    }

    /// Consumes the feed until it closes.
    ///
    /// Each record is handled synchronously, one at a time, preserving
    /// feed order. A receiver that lags behind the feed's capacity logs
    /// the skipped count and continues from the oldest retained record.
    ///
    /// # Errors
    ///
    /// Returns the first [`BridgeError`]; the host decides whether to
    /// restart the bridge and rely on redelivery.
    pub async fn run(
        &self,
        mut feed: broadcast::Receiver<ChangeRecord>,
    ) -> Result<(), BridgeError> {
        loop {
            match feed.recv().await {
                Ok(record) => {
                    self.handle(&record).await?;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "change feed receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("change feed closed, bridge stopping");
                    return Ok(());
                }
            }
        }
    }

    /// Handles one record.
    ///
    /// Returns the published payload for an insert, `None` for filtered
    /// record kinds.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError`] for records without a usable image and
    /// for failed publish invocations.
    pub async fn handle(&self, record: &ChangeRecord) -> Result<Option<String>, BridgeError> {
        if record.kind != StreamEventKind::Insert {
            return Ok(None);
        }

        let image = record
            .new_image
            .as_ref()
            .ok_or_else(|| BridgeError::MalformedRecord {
                key: record.key.clone(),
                reason: "insert record has no new image".to_string(),
            })?;
        let data =
            serde_json::to_string(&map_to_json(image)).map_err(|e| BridgeError::MalformedRecord {
                key: record.key.clone(),
                reason: e.to_string(),
            })?;

        tracing::debug!(key = %record.key, sequence = record.sequence, "forwarding insert");

        self.api
            .invoke("publish", json!({"data": data}), Some(&self.identity))
            .await?;
        Ok(Some(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Story;

    fn bridge() -> (Arc<Api>, ChangeStreamBridge) {
        let api = Arc::new(Api::builder().build().unwrap());
        (api.clone(), ChangeStreamBridge::new(api))
    }

    fn insert_record(id: &str) -> ChangeRecord {
        ChangeRecord {
            kind: StreamEventKind::Insert,
            key: id.to_string(),
            new_image: Some(Story::blank(id, "user-1").to_attributes()),
            old_image: None,
            sequence: 0,
        }
    }

    #[tokio::test]
    async fn insert_triggers_exactly_one_publish() {
        let (api, bridge) = bridge();
        let mut rx = api.subscribe("publish").unwrap();

        let published = bridge.handle(&insert_record("row-1")).await.unwrap();
        let data = published.unwrap();
        assert!(data.contains("row-1"));

        let delivered = rx.recv().await.unwrap();
        assert_eq!(delivered.as_str().unwrap(), data);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn non_insert_records_are_filtered() {
        let (api, bridge) = bridge();
        let mut rx = api.subscribe("publish").unwrap();

        let mut modify = insert_record("row-1");
        modify.kind = StreamEventKind::Modify;
        assert_eq!(bridge.handle(&modify).await.unwrap(), None);

        let mut remove = insert_record("row-1");
        remove.kind = StreamEventKind::Remove;
        remove.new_image = None;
        assert_eq!(bridge.handle(&remove).await.unwrap(), None);

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn insert_without_image_is_malformed() {
        let (_api, bridge) = bridge();
        let mut record = insert_record("row-1");
        record.new_image = None;

        let err = bridge.handle(&record).await.unwrap_err();
        assert!(matches!(err, BridgeError::MalformedRecord { .. }));
    }
}
