mod snapshot;

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use anyhow::{Context, Result};
use aws_config::SdkConfig;
use aws_sdk_dynamodb::types::{AttributeValue, PutRequest, WriteRequest};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::types::NormalizedResource;
use self::snapshot::SnapshotWriter;

/// Store-imposed ceiling on items per batch write.
const BATCH_SIZE: usize = 25;
/// Additional attempts for unprocessed subsets, with 2^attempt seconds
/// between them.
const BATCH_RETRIES: u32 = 3;

/// Persistence and reconciliation engine for one inventory table and its
/// snapshot bucket. Sole writer of all durable inventory state.
pub struct InventoryStore {
    client: aws_sdk_dynamodb::Client,
    table: String,
    snapshots: SnapshotWriter,
}

impl InventoryStore {
    pub fn new(conf: &SdkConfig, table: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            client: aws_sdk_dynamodb::Client::new(conf),
            table: table.into(),
            snapshots: SnapshotWriter::new(conf, bucket),
        }
    }

    /// Persist one account's scan results and reconcile vanished records.
    ///
    /// An empty scan performs no writes at all: no snapshot, no records,
    /// no reconciliation sweep. A transient empty result must never
    /// mass-mark an account's records missing.
    ///
    /// Returns the number of resources processed, independent of how many
    /// batch items ultimately stuck.
    pub async fn persist(
        &self,
        account_id: &str,
        resources: &[NormalizedResource],
    ) -> Result<usize> {
        if resources.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();

        // Snapshot failure must not stop indexing.
        if let Err(err) = self.snapshots.write(account_id, now, resources).await {
            error!(account = %account_id, error = %format!("{err:#}"), "snapshot write failed");
        }

        let timestamp = now.to_rfc3339();
        let mut seen_arns = HashSet::new();
        let mut items = Vec::with_capacity(resources.len());
        for resource in resources {
            let arn = effective_arn(account_id, resource);
            items.push(build_item(account_id, &timestamp, &arn, resource));
            seen_arns.insert(arn);
        }
        let count = items.len();

        self.write_batches(items).await;
        info!(account = %account_id, count, "stored inventory records");

        self.mark_missing(account_id, &seen_arns, &timestamp).await?;

        Ok(count)
    }

    async fn write_batches(&self, items: Vec<HashMap<String, AttributeValue>>) {
        for batch in to_write_batches(items) {
            if let Err(err) = self.write_batch_with_retry(batch).await {
                error!(error = %format!("{err:#}"), "batch write failed, dropping batch");
            }
        }
    }

    /// One batch write, retrying the unprocessed subset with exponential
    /// backoff. Items still unprocessed after the retry budget are dropped
    /// with an error log; nothing recovers them short of rediscovery.
    async fn write_batch_with_retry(&self, requests: Vec<WriteRequest>) -> Result<()> {
        let mut pending: HashMap<String, Vec<WriteRequest>> =
            HashMap::from([(self.table.clone(), requests)]);
        let mut attempt: u32 = 0;

        loop {
            let resp = self
                .client
                .batch_write_item()
                .set_request_items(Some(pending))
                .send()
                .await
                .context("batch_write_item failed")?;

            match resp.unprocessed_items().filter(|m| !m.is_empty()).cloned() {
                None => return Ok(()),
                Some(rest) => {
                    if attempt >= BATCH_RETRIES {
                        let dropped: usize = rest.values().map(Vec::len).sum();
                        error!(dropped, "unprocessed items remain after retries, dropping");
                        return Ok(());
                    }
                    tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                    attempt += 1;
                    pending = rest;
                }
            }
        }
    }

    /// Reconciliation sweep: every record still `active` whose ARN was not
    /// observed by this scan flips to `missing`. This is the only
    /// active→missing path; rediscovery flips a record back by plain
    /// overwrite in [`Self::persist`].
    async fn mark_missing(
        &self,
        account_id: &str,
        seen: &HashSet<String>,
        timestamp: &str,
    ) -> Result<usize> {
        let existing = self.query_inventory_records(account_id).await?;
        let stale = stale_sort_keys(&existing, seen);

        let mut flipped = 0usize;
        for sk in stale {
            let update = self
                .client
                .update_item()
                .table_name(&self.table)
                .key("pk", AttributeValue::S(account_pk(account_id)))
                .key("sk", AttributeValue::S(sk.clone()))
                .update_expression("SET discoveryStatus = :status, lastDiscoveredAt = :ts")
                .expression_attribute_values(":status", AttributeValue::S("missing".into()))
                .expression_attribute_values(":ts", AttributeValue::S(timestamp.to_string()))
                .send()
                .await;
            match update {
                Ok(_) => flipped += 1,
                Err(err) => {
                    warn!(sort_key = %sk, error = %err, "failed to mark record missing")
                }
            }
        }

        if flipped > 0 {
            info!(account = %account_id, flipped, "marked vanished resources missing");
        }
        Ok(flipped)
    }

    async fn query_inventory_records(&self, account_id: &str) -> Result<Vec<ExistingRecord>> {
        let mut records = Vec::new();
        let mut start: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let mut query = self
                .client
                .query()
                .table_name(&self.table)
                .key_condition_expression("pk = :pk AND begins_with(sk, :prefix)")
                .expression_attribute_values(":pk", AttributeValue::S(account_pk(account_id)))
                .expression_attribute_values(":prefix", AttributeValue::S("INVENTORY#".into()))
                .projection_expression("sk, resourceArn, discoveryStatus");
            if let Some(key) = start {
                query = query.set_exclusive_start_key(Some(key));
            }

            let resp = query
                .send()
                .await
                .with_context(|| format!("failed to query inventory for {account_id}"))?;

            for item in resp.items() {
                let Some(sk) = item.get("sk").and_then(|v| v.as_s().ok()) else {
                    continue;
                };
                let Some(arn) = item.get("resourceArn").and_then(|v| v.as_s().ok()) else {
                    continue;
                };
                if arn.is_empty() {
                    continue;
                }
                let status = item
                    .get("discoveryStatus")
                    .and_then(|v| v.as_s().ok())
                    .cloned()
                    .unwrap_or_else(|| "active".to_string());
                records.push(ExistingRecord {
                    sort_key: sk.clone(),
                    arn: arn.clone(),
                    status,
                });
            }

            start = resp.last_evaluated_key().cloned();
            if start.is_none() {
                break;
            }
        }

        Ok(records)
    }
}

#[derive(Debug)]
struct ExistingRecord {
    sort_key: String,
    arn: String,
    status: String,
}

/// The resource's own ARN when the provider supplied one, otherwise a
/// deterministic synthesized one. The synthesized form is the
/// reconciliation key, so it must be byte-stable across runs.
pub fn effective_arn(account_id: &str, resource: &NormalizedResource) -> String {
    if !resource.resource_arn.is_empty() {
        return resource.resource_arn.clone();
    }
    format!(
        "arn:aws:{}:{}:{}:{}/{}",
        resource.service, resource.region, account_id, resource.resource_type, resource.resource_id
    )
}

fn account_pk(account_id: &str) -> String {
    format!("ACCOUNT#{account_id}")
}

/// Chunk items into write requests, never more than [`BATCH_SIZE`] per
/// batch.
fn to_write_batches(items: Vec<HashMap<String, AttributeValue>>) -> Vec<Vec<WriteRequest>> {
    items
        .chunks(BATCH_SIZE)
        .map(|chunk| {
            chunk
                .iter()
                .filter_map(|item| {
                    let put = PutRequest::builder().set_item(Some(item.clone())).build().ok()?;
                    Some(WriteRequest::builder().put_request(put).build())
                })
                .collect()
        })
        .collect()
}

/// Sort keys of records to flip: still `active` and absent from the
/// current scan's ARN set. Records already `missing` are left alone.
fn stale_sort_keys(existing: &[ExistingRecord], seen: &HashSet<String>) -> Vec<String> {
    existing
        .iter()
        .filter(|r| r.status == "active" && !seen.contains(&r.arn))
        .map(|r| r.sort_key.clone())
        .collect()
}

fn build_item(
    account_id: &str,
    timestamp: &str,
    arn: &str,
    resource: &NormalizedResource,
) -> HashMap<String, AttributeValue> {
    let rt = &resource.resource_type;
    let mut item = HashMap::new();

    item.insert("pk".to_string(), AttributeValue::S(account_pk(account_id)));
    item.insert(
        "sk".to_string(),
        AttributeValue::S(format!("INVENTORY#{rt}#{arn}")),
    );
    item.insert(
        "gsi1pk".to_string(),
        AttributeValue::S("TYPE#INVENTORY".to_string()),
    );
    item.insert(
        "gsi1sk".to_string(),
        AttributeValue::S(format!("{rt}#{}#{}", resource.region, resource.name)),
    );
    item.insert(
        "gsi2pk".to_string(),
        AttributeValue::S(format!("REGION#{}", resource.region)),
    );
    item.insert(
        "gsi2sk".to_string(),
        AttributeValue::S(format!("{rt}#{timestamp}")),
    );
    item.insert(
        "gsi3pk".to_string(),
        AttributeValue::S(format!("RESOURCE_TYPE#{rt}")),
    );
    item.insert(
        "gsi3sk".to_string(),
        AttributeValue::S(format!("{account_id}#{}", resource.resource_id)),
    );

    item.insert(
        "resourceId".to_string(),
        AttributeValue::S(resource.resource_id.clone()),
    );
    item.insert("resourceArn".to_string(), AttributeValue::S(arn.to_string()));
    item.insert("resourceType".to_string(), AttributeValue::S(rt.clone()));
    item.insert("name".to_string(), AttributeValue::S(resource.name.clone()));
    item.insert(
        "region".to_string(),
        AttributeValue::S(resource.region.clone()),
    );
    item.insert("state".to_string(), AttributeValue::S(resource.state.clone()));
    item.insert(
        "accountId".to_string(),
        AttributeValue::S(account_id.to_string()),
    );
    item.insert(
        "lastDiscoveredAt".to_string(),
        AttributeValue::S(timestamp.to_string()),
    );
    item.insert(
        "discoveryStatus".to_string(),
        AttributeValue::S("active".to_string()),
    );

    if !resource.tags.is_empty() {
        let tags: HashMap<String, AttributeValue> = resource
            .tags
            .iter()
            .map(|(k, v)| (k.clone(), AttributeValue::S(v.clone())))
            .collect();
        item.insert("tags".to_string(), AttributeValue::M(tags));
    }

    // Everything not promoted to a top-level attribute.
    let metadata = HashMap::from([(
        "service".to_string(),
        AttributeValue::S(resource.service.clone()),
    )]);
    item.insert("metadata".to_string(), AttributeValue::M(metadata));

    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn resource(id: &str, arn: &str) -> NormalizedResource {
        NormalizedResource {
            resource_type: "ec2instances".into(),
            region: "us-east-1".into(),
            service: "ec2".into(),
            resource_id: id.into(),
            resource_arn: arn.into(),
            name: id.into(),
            state: "running".into(),
            tags: BTreeMap::new(),
            raw: serde_json::json!({}),
        }
    }

    #[test]
    fn provider_arn_passes_through() {
        let r = resource("i-abc", "arn:aws:ec2:us-east-1:111122223333:instance/i-abc");
        assert_eq!(
            effective_arn("111122223333", &r),
            "arn:aws:ec2:us-east-1:111122223333:instance/i-abc"
        );
    }

    #[test]
    fn synthesized_arn_is_deterministic() {
        let r = resource("orders", "");
        let first = effective_arn("111122223333", &r);
        let second = effective_arn("111122223333", &r);
        assert_eq!(first, "arn:aws:ec2:us-east-1:111122223333:ec2instances/orders");
        assert_eq!(first, second);
    }

    #[test]
    fn batches_never_exceed_the_store_ceiling() {
        let items: Vec<_> = (0..60)
            .map(|i| {
                HashMap::from([(
                    "pk".to_string(),
                    AttributeValue::S(format!("ACCOUNT#{i}")),
                )])
            })
            .collect();
        let batches = to_write_batches(items);
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![25, 25, 10]);
    }

    #[test]
    fn empty_input_yields_no_batches() {
        assert!(to_write_batches(Vec::new()).is_empty());
    }

    #[test]
    fn sweep_targets_only_active_and_absent() {
        let existing = vec![
            ExistingRecord {
                sort_key: "INVENTORY#ec2instances#arn:a".into(),
                arn: "arn:a".into(),
                status: "active".into(),
            },
            ExistingRecord {
                sort_key: "INVENTORY#ec2instances#arn:b".into(),
                arn: "arn:b".into(),
                status: "active".into(),
            },
            ExistingRecord {
                sort_key: "INVENTORY#ec2instances#arn:c".into(),
                arn: "arn:c".into(),
                status: "missing".into(),
            },
        ];
        let seen: HashSet<String> = HashSet::from(["arn:a".to_string()]);

        let stale = stale_sort_keys(&existing, &seen);
        assert_eq!(stale, vec!["INVENTORY#ec2instances#arn:b".to_string()]);
    }

    #[test]
    fn item_carries_primary_and_secondary_keys() {
        let mut r = resource("i-abc", "");
        r.tags.insert("Name".into(), "web-1".into());
        r.name = "web-1".into();
        let arn = effective_arn("111122223333", &r);
        let item = build_item("111122223333", "2026-08-06T00:00:00+00:00", &arn, &r);

        let s = |key: &str| item.get(key).unwrap().as_s().unwrap().clone();
        assert_eq!(s("pk"), "ACCOUNT#111122223333");
        assert_eq!(
            s("sk"),
            "INVENTORY#ec2instances#arn:aws:ec2:us-east-1:111122223333:ec2instances/i-abc"
        );
        assert_eq!(s("gsi1pk"), "TYPE#INVENTORY");
        assert_eq!(s("gsi1sk"), "ec2instances#us-east-1#web-1");
        assert_eq!(s("gsi2pk"), "REGION#us-east-1");
        assert_eq!(s("gsi2sk"), "ec2instances#2026-08-06T00:00:00+00:00");
        assert_eq!(s("gsi3pk"), "RESOURCE_TYPE#ec2instances");
        assert_eq!(s("gsi3sk"), "111122223333#i-abc");
        assert_eq!(s("discoveryStatus"), "active");
        assert_eq!(s("state"), "running");

        let tags = item.get("tags").unwrap().as_m().unwrap();
        assert_eq!(tags.get("Name").unwrap().as_s().unwrap(), "web-1");
        let metadata = item.get("metadata").unwrap().as_m().unwrap();
        assert_eq!(metadata.get("service").unwrap().as_s().unwrap(), "ec2");
    }

    #[test]
    fn untagged_item_omits_the_tags_attribute() {
        let r = resource("i-abc", "");
        let arn = effective_arn("111122223333", &r);
        let item = build_item("111122223333", "ts", &arn, &r);
        assert!(!item.contains_key("tags"));
    }
}
