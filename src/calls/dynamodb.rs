use anyhow::Result;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_dynamodb as dynamodb;
use serde_json::{json, Value};

use super::ApiCall;

/// Table names come back as bare strings; normalization treats each one as
/// a resource id and the store synthesizes the ARN.
pub struct ListTables;

#[async_trait]
impl ApiCall for ListTables {
    async fn fetch_pages(&self, conf: &SdkConfig) -> Result<Vec<Value>> {
        let client = dynamodb::Client::new(conf);
        let mut pages = Vec::new();
        let mut start: Option<String> = None;
        loop {
            let mut req = client.list_tables();
            if let Some(s) = start.as_deref() {
                req = req.exclusive_start_table_name(s);
            }
            let resp = req.send().await?;

            pages.push(json!({ "TableNames": resp.table_names() }));

            start = resp.last_evaluated_table_name().map(str::to_string);
            if start.is_none() {
                break;
            }
        }
        Ok(pages)
    }
}
