use anyhow::Result;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_autoscaling as autoscaling;
use serde_json::{json, Map as JsonMap, Value};

use super::ApiCall;

pub struct DescribeAutoScalingGroups;

#[async_trait]
impl ApiCall for DescribeAutoScalingGroups {
    async fn fetch_pages(&self, conf: &SdkConfig) -> Result<Vec<Value>> {
        let client = autoscaling::Client::new(conf);
        let mut pages = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut req = client.describe_auto_scaling_groups();
            if let Some(t) = token.as_deref() {
                req = req.next_token(t);
            }
            let resp = req.send().await?;

            let mut items = Vec::new();
            for group in resp.auto_scaling_groups() {
                let mut m = JsonMap::new();
                m.insert(
                    "AutoScalingGroupName".into(),
                    json!(group.auto_scaling_group_name()),
                );
                m.insert(
                    "AutoScalingGroupARN".into(),
                    json!(group.auto_scaling_group_arn()),
                );
                m.insert("Status".into(), json!(group.status()));
                m.insert("MinSize".into(), json!(group.min_size()));
                m.insert("MaxSize".into(), json!(group.max_size()));
                m.insert("DesiredCapacity".into(), json!(group.desired_capacity()));
                m.insert("AvailabilityZones".into(), json!(group.availability_zones()));
                let tags: Vec<Value> = group
                    .tags()
                    .iter()
                    .map(|t| json!({"Key": t.key(), "Value": t.value()}))
                    .collect();
                if !tags.is_empty() {
                    m.insert("Tags".into(), Value::Array(tags));
                }
                items.push(Value::Object(m));
            }
            pages.push(json!({ "AutoScalingGroups": items }));

            token = resp.next_token().map(str::to_string);
            if token.is_none() {
                break;
            }
        }
        Ok(pages)
    }
}
