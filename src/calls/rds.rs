use anyhow::Result;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_rds as rds;
use serde_json::{json, Map as JsonMap, Value};

use super::ApiCall;

fn tag_list_value(tags: &[rds::types::Tag]) -> Value {
    Value::Array(
        tags.iter()
            .filter_map(|t| {
                let k = t.key()?;
                let v = t.value()?;
                Some(json!({"Key": k, "Value": v}))
            })
            .collect(),
    )
}

pub struct DescribeDbInstances;

#[async_trait]
impl ApiCall for DescribeDbInstances {
    async fn fetch_pages(&self, conf: &SdkConfig) -> Result<Vec<Value>> {
        let client = rds::Client::new(conf);
        let mut pages = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let mut req = client.describe_db_instances();
            if let Some(m) = marker.as_deref() {
                req = req.marker(m);
            }
            let resp = req.send().await?;

            let mut items = Vec::new();
            for inst in resp.db_instances() {
                let mut m = JsonMap::new();
                if let Some(id) = inst.db_instance_identifier() {
                    m.insert("DBInstanceIdentifier".into(), json!(id));
                }
                if let Some(arn) = inst.db_instance_arn() {
                    m.insert("DBInstanceArn".into(), json!(arn));
                }
                if let Some(status) = inst.db_instance_status() {
                    m.insert("DBInstanceStatus".into(), json!(status));
                }
                if let Some(engine) = inst.engine() {
                    m.insert("Engine".into(), json!(engine));
                }
                if let Some(version) = inst.engine_version() {
                    m.insert("EngineVersion".into(), json!(version));
                }
                if let Some(class) = inst.db_instance_class() {
                    m.insert("DBInstanceClass".into(), json!(class));
                }
                m.insert("StorageEncrypted".into(), json!(inst.storage_encrypted()));
                m.insert("MultiAZ".into(), json!(inst.multi_az()));
                if !inst.tag_list().is_empty() {
                    m.insert("TagList".into(), tag_list_value(inst.tag_list()));
                }
                items.push(Value::Object(m));
            }
            pages.push(json!({ "DBInstances": items }));

            marker = resp.marker().map(str::to_string);
            if marker.is_none() {
                break;
            }
        }
        Ok(pages)
    }
}

pub struct DescribeDbClusters;

#[async_trait]
impl ApiCall for DescribeDbClusters {
    async fn fetch_pages(&self, conf: &SdkConfig) -> Result<Vec<Value>> {
        let client = rds::Client::new(conf);
        let mut pages = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let mut req = client.describe_db_clusters();
            if let Some(m) = marker.as_deref() {
                req = req.marker(m);
            }
            let resp = req.send().await?;

            let mut items = Vec::new();
            for cluster in resp.db_clusters() {
                let mut m = JsonMap::new();
                if let Some(id) = cluster.db_cluster_identifier() {
                    m.insert("DBClusterIdentifier".into(), json!(id));
                }
                if let Some(arn) = cluster.db_cluster_arn() {
                    m.insert("DBClusterArn".into(), json!(arn));
                }
                if let Some(status) = cluster.status() {
                    m.insert("Status".into(), json!(status));
                }
                if let Some(engine) = cluster.engine() {
                    m.insert("Engine".into(), json!(engine));
                }
                m.insert("MultiAZ".into(), json!(cluster.multi_az()));
                if !cluster.tag_list().is_empty() {
                    m.insert("TagList".into(), tag_list_value(cluster.tag_list()));
                }
                items.push(Value::Object(m));
            }
            pages.push(json!({ "DBClusters": items }));

            marker = resp.marker().map(str::to_string);
            if marker.is_none() {
                break;
            }
        }
        Ok(pages)
    }
}
