use anyhow::Result;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_efs as efs;
use serde_json::{json, Map as JsonMap, Value};

use super::ApiCall;

pub struct DescribeFileSystems;

#[async_trait]
impl ApiCall for DescribeFileSystems {
    async fn fetch_pages(&self, conf: &SdkConfig) -> Result<Vec<Value>> {
        let client = efs::Client::new(conf);
        let mut pages = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let mut req = client.describe_file_systems();
            if let Some(m) = marker.as_deref() {
                req = req.marker(m);
            }
            let resp = req.send().await?;

            let mut items = Vec::new();
            for fs in resp.file_systems() {
                let mut m = JsonMap::new();
                m.insert("FileSystemId".into(), json!(fs.file_system_id()));
                m.insert("FileSystemArn".into(), json!(fs.file_system_arn()));
                m.insert("Name".into(), json!(fs.name()));
                m.insert("LifeCycleState".into(), json!(fs.life_cycle_state().as_str()));
                let tags: Vec<Value> = fs
                    .tags()
                    .iter()
                    .map(|t| json!({"Key": t.key(), "Value": t.value()}))
                    .collect();
                m.insert("Tags".into(), Value::Array(tags));
                items.push(Value::Object(m));
            }
            pages.push(json!({ "FileSystems": items }));

            marker = resp.next_marker().map(str::to_string);
            if marker.is_none() {
                break;
            }
        }
        Ok(pages)
    }
}
