use std::time::Duration;

use anyhow::{ensure, Result};
use aws_config::SdkConfig;
use serde_json::Value;
use tracing::{info, warn};

use crate::calls::CallRegistry;
use crate::normalize;
use crate::session::ScanSession;
use crate::types::{Account, CallStatus, NormalizedResource, ResourceTypeSpec, ScanReport};

/// Drives the region × resource-type walk for one account.
///
/// Failures are isolated per (region, resource-type): a failed or unknown
/// call is recorded in the report and the walk continues. The full resource
/// list is assembled before persistence sees any of it.
pub struct ScanOrchestrator {
    registry: CallRegistry,
    catalog: Vec<ResourceTypeSpec>,
    call_delay: Duration,
}

pub struct ScanOutput {
    pub resources: Vec<NormalizedResource>,
    pub report: ScanReport,
}

impl ScanOrchestrator {
    pub fn new(registry: CallRegistry, catalog: Vec<ResourceTypeSpec>, call_delay: Duration) -> Self {
        Self {
            registry,
            catalog,
            call_delay,
        }
    }

    pub async fn scan_account(
        &self,
        session: &ScanSession,
        account: &Account,
    ) -> Result<ScanOutput> {
        ensure!(
            !session.is_expired(),
            "session for account {} has expired",
            account.account_id
        );

        let mut resources = Vec::new();
        let mut report = ScanReport::default();

        for region in &account.regions {
            info!(account = %account.account_id, region = %region, "scanning region");
            let conf = session.regional(region);

            for spec in &self.catalog {
                let status = self
                    .scan_resource_type(&conf, region, spec, &mut resources)
                    .await;
                match &status {
                    CallStatus::Succeeded(count) => {
                        info!(resource_type = %spec.name, region = %region, count, "scanned");
                    }
                    CallStatus::SkippedUnknownCall => {
                        warn!(
                            resource_type = %spec.name,
                            service = %spec.service,
                            call = %spec.call,
                            "no registered call, skipping resource type"
                        );
                    }
                    CallStatus::Failed(err) => {
                        warn!(
                            resource_type = %spec.name,
                            region = %region,
                            error = %err,
                            "scan call failed, continuing"
                        );
                    }
                }
                report.record(region, &spec.name, status);

                // Flat inter-call pause to bound the outbound call rate.
                tokio::time::sleep(self.call_delay).await;
            }
        }

        Ok(ScanOutput { resources, report })
    }

    async fn scan_resource_type(
        &self,
        conf: &SdkConfig,
        region: &str,
        spec: &ResourceTypeSpec,
        out: &mut Vec<NormalizedResource>,
    ) -> CallStatus {
        let Some(call) = self.registry.get(&spec.service, &spec.call) else {
            return CallStatus::SkippedUnknownCall;
        };

        match call.fetch_pages(conf).await {
            Ok(pages) => {
                let mut count = 0;
                for page in pages {
                    for item in extract_collection(&page, &spec.result_key) {
                        out.push(normalize::normalize(item, &spec.name, region, &spec.service));
                        count += 1;
                    }
                }
                CallStatus::Succeeded(count)
            }
            Err(err) => CallStatus::Failed(format!("{err:#}")),
        }
    }
}

/// Read the result collection out of one page. A scalar value counts as a
/// single-element collection; a missing key as an empty one.
pub fn extract_collection(page: &Value, key: &str) -> Vec<Value> {
    match page.get(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceTypeSpec;
    use serde_json::json;

    #[test]
    fn collection_extraction_handles_arrays_scalars_and_absence() {
        let page = json!({"TableNames": ["a", "b"]});
        assert_eq!(extract_collection(&page, "TableNames").len(), 2);

        let page = json!({"DistributionList": {"Items": []}});
        let items = extract_collection(&page, "DistributionList");
        assert_eq!(items.len(), 1);
        assert!(items[0].is_object());

        let page = json!({"Other": []});
        assert!(extract_collection(&page, "TableNames").is_empty());

        let page = json!({"TableNames": null});
        assert!(extract_collection(&page, "TableNames").is_empty());
    }

    #[tokio::test]
    async fn unknown_call_is_skipped_not_fatal() {
        let orchestrator = ScanOrchestrator::new(
            CallRegistry::with_default_calls(),
            vec![ResourceTypeSpec::new("KMSKeys", "kms", "list_keys", "Keys")],
            Duration::from_millis(0),
        );
        let session = ScanSession::from_config(SdkConfig::builder().build());
        let account = Account {
            account_id: "111122223333".into(),
            account_name: "test".into(),
            role_arn: None,
            regions: vec!["us-east-1".into()],
        };

        let output = orchestrator.scan_account(&session, &account).await.unwrap();
        assert!(output.resources.is_empty());
        assert_eq!(output.report.skipped_count(), 1);
        assert_eq!(output.report.failed_count(), 0);
    }
}
