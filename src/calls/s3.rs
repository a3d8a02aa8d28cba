use anyhow::Result;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3 as s3;
use serde_json::{json, Map as JsonMap, Value};

use super::ApiCall;

/// Buckets are global; the listing is issued once per region walk and the
/// wire `Name` field is surfaced as `BucketName` so identity extraction
/// picks it up.
pub struct ListBuckets;

#[async_trait]
impl ApiCall for ListBuckets {
    async fn fetch_pages(&self, conf: &SdkConfig) -> Result<Vec<Value>> {
        let client = s3::Client::new(conf);
        let resp = client.list_buckets().send().await?;

        let mut items = Vec::new();
        for b in resp.buckets() {
            let mut m = JsonMap::new();
            if let Some(name) = b.name() {
                m.insert("BucketName".into(), json!(name));
            }
            if let Some(created) = b.creation_date() {
                m.insert("CreationDate".into(), json!(created.secs()));
            }
            items.push(Value::Object(m));
        }

        Ok(vec![json!({ "Buckets": items })])
    }
}
