//! The change-stream bridge wired end to end: a mutation's insert record
//! reaches publish subscribers.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use storyflow::prelude::*;

struct FixedSecret;

#[async_trait]
impl DataSource for FixedSecret {
    fn name(&self) -> &str {
        "fakeSecretStore"
    }

    async fn invoke(&self, _request: Value) -> Result<Value, ErrorKind> {
        Ok(json!("sk-test"))
    }
}

struct CannedGeneration;

#[async_trait]
impl DataSource for CannedGeneration {
    fn name(&self) -> &str {
        "fakeGeneration"
    }

    async fn invoke(&self, _request: Value) -> Result<Value, ErrorKind> {
        let body = json!({"choices": [{"message": {"content": "The end."}}]});
        Ok(json!({"status_code": 200, "headers": {}, "body": body.to_string()}))
    }
}

fn api() -> Arc<Api> {
    Arc::new(
        Api::builder()
            .secret_source(Arc::new(FixedSecret))
            .generation_source(Arc::new(CannedGeneration))
            .event_sink(Arc::new(NoOpEventSink))
            .build()
            .unwrap(),
    )
}

#[tokio::test]
async fn inserts_flow_from_mutation_to_subscribers() -> anyhow::Result<()> {
    let api = api();
    // Subscribe to both ends before the mutation so nothing is missed.
    let feed = api.change_feed();
    let mut rx = api.subscribe("publish")?;

    let bridge = ChangeStreamBridge::new(api.clone());
    let worker = tokio::spawn(async move { bridge.run(feed).await });

    let identity = Identity::user("user-1");
    let story = api
        .invoke("createStory", json!({"prompt": "a lighthouse"}), Some(&identity))
        .await?;

    let delivered = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await??;
    let row: Value = serde_json::from_str(delivered.as_str().unwrap())?;
    assert_eq!(row["id"], story["id"]);
    // The insert image is the placeholder row, not the finished story.
    assert_eq!(row["isComplete"], json!(false));
    assert_eq!(row["owner"], json!("user-1"));

    // The completing update is a modify record and is never forwarded.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());

    worker.abort();
    Ok(())
}

#[tokio::test]
async fn bridge_stops_cleanly_when_the_feed_closes() -> anyhow::Result<()> {
    let api = api();
    let bridge = ChangeStreamBridge::new(api);

    let table = Arc::new(DocumentTable::new("detached"));
    let feed = table.subscribe();
    drop(table);

    bridge.run(feed).await?;
    Ok(())
}
