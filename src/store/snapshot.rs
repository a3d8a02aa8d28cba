use anyhow::{Context, Result};
use aws_config::SdkConfig;
use aws_sdk_s3::primitives::ByteStream;
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::info;

use crate::types::NormalizedResource;

/// Append-only raw-payload audit trail. Written once per account per run;
/// never read back by the engine.
pub struct SnapshotWriter {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl SnapshotWriter {
    pub fn new(conf: &SdkConfig, bucket: impl Into<String>) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(conf),
            bucket: bucket.into(),
        }
    }

    pub async fn write(
        &self,
        account_id: &str,
        now: DateTime<Utc>,
        resources: &[NormalizedResource],
    ) -> Result<()> {
        let key = snapshot_key(account_id, now);
        let body = serde_json::to_vec(&json!({
            "accountId": account_id,
            "timestamp": now.to_rfc3339(),
            "resourceCount": resources.len(),
            "resources": resources,
        }))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type("application/json")
            .body(ByteStream::from(body))
            .send()
            .await
            .with_context(|| format!("failed to write snapshot s3://{}/{key}", self.bucket))?;

        info!(bucket = %self.bucket, key = %key, "stored raw snapshot");
        Ok(())
    }
}

pub fn snapshot_key(account_id: &str, now: DateTime<Utc>) -> String {
    format!("raw/{}/{account_id}/inventory.json", now.format("%Y/%m/%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn snapshot_key_is_date_partitioned() {
        let now = Utc.with_ymd_and_hms(2026, 8, 6, 12, 30, 0).unwrap();
        assert_eq!(
            snapshot_key("111122223333", now),
            "raw/2026/08/06/111122223333/inventory.json"
        );
    }

    #[test]
    fn snapshot_key_zero_pads_month_and_day() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
        assert_eq!(
            snapshot_key("42", now),
            "raw/2026/01/05/42/inventory.json"
        );
    }
}
