use anyhow::Result;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ecs as ecs;
use serde_json::{json, Value};

use super::ApiCall;

/// Cluster listings are bare ARN strings; normalization derives the id
/// from the final path segment.
pub struct ListClusters;

#[async_trait]
impl ApiCall for ListClusters {
    async fn fetch_pages(&self, conf: &SdkConfig) -> Result<Vec<Value>> {
        let client = ecs::Client::new(conf);
        let mut pages = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut req = client.list_clusters();
            if let Some(t) = token.as_deref() {
                req = req.next_token(t);
            }
            let resp = req.send().await?;

            pages.push(json!({ "clusterArns": resp.cluster_arns() }));

            token = resp.next_token().map(str::to_string);
            if token.is_none() {
                break;
            }
        }
        Ok(pages)
    }
}
