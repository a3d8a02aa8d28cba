use anyhow::Result;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sns as sns;
use aws_sdk_sqs as sqs;
use serde_json::{json, Value};

use super::ApiCall;

pub struct ListTopics;

#[async_trait]
impl ApiCall for ListTopics {
    async fn fetch_pages(&self, conf: &SdkConfig) -> Result<Vec<Value>> {
        let client = sns::Client::new(conf);
        let mut pages = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut req = client.list_topics();
            if let Some(t) = token.as_deref() {
                req = req.next_token(t);
            }
            let resp = req.send().await?;

            let items: Vec<Value> = resp
                .topics()
                .iter()
                .filter_map(|t| t.topic_arn())
                .map(|arn| json!({"TopicArn": arn}))
                .collect();
            pages.push(json!({ "Topics": items }));

            token = resp.next_token().map(str::to_string);
            if token.is_none() {
                break;
            }
        }
        Ok(pages)
    }
}

/// Queue listings are bare URL strings. The URL doubles as the stable
/// reconciliation key for a queue.
pub struct ListQueues;

#[async_trait]
impl ApiCall for ListQueues {
    async fn fetch_pages(&self, conf: &SdkConfig) -> Result<Vec<Value>> {
        let client = sqs::Client::new(conf);
        let mut pages = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut req = client.list_queues();
            if let Some(t) = token.as_deref() {
                req = req.next_token(t);
            }
            let resp = req.send().await?;

            pages.push(json!({ "QueueUrls": resp.queue_urls() }));

            token = resp.next_token().map(str::to_string);
            if token.is_none() {
                break;
            }
        }
        Ok(pages)
    }
}
