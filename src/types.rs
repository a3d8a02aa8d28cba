use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One discoverable resource kind: which API call to make and where the
/// result collection lives in the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceTypeSpec {
    pub name: String,
    pub service: String,
    pub call: String,
    pub result_key: String,
}

impl ResourceTypeSpec {
    pub fn new(name: &str, service: &str, call: &str, result_key: &str) -> Self {
        Self {
            name: name.to_string(),
            service: service.to_string(),
            call: call.to_string(),
            result_key: result_key.to_string(),
        }
    }

    /// Canonical resource-type name used in store keys and records:
    /// lower-cased, spaces replaced by underscores.
    pub fn canonical_name(&self) -> String {
        canonical_type_name(&self.name)
    }
}

pub fn canonical_type_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// An account to scan, as registered in the application table.
#[derive(Debug, Clone)]
pub struct Account {
    pub account_id: String,
    pub account_name: String,
    pub role_arn: Option<String>,
    pub regions: Vec<String>,
}

/// Canonical identity record for one discovered resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResource {
    pub resource_type: String,
    pub region: String,
    pub service: String,
    pub resource_id: String,
    pub resource_arn: String,
    pub name: String,
    pub state: String,
    pub tags: BTreeMap<String, String>,
    #[serde(rename = "rawData")]
    pub raw: Value,
}

/// Outcome of one (region, resource-type) call during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallStatus {
    Succeeded(usize),
    SkippedUnknownCall,
    Failed(String),
}

/// Per-account scan report: one entry per (region, resource-type) visited.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub entries: Vec<(String, String, CallStatus)>,
}

impl ScanReport {
    pub fn record(&mut self, region: &str, resource_type: &str, status: CallStatus) {
        self.entries
            .push((region.to_string(), resource_type.to_string(), status));
    }

    pub fn failed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, _, s)| matches!(s, CallStatus::Failed(_)))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, _, s)| matches!(s, CallStatus::SkippedUnknownCall))
            .count()
    }
}

/// Final sync state recorded for an account after its pipeline finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Success,
    Failed,
}

impl SyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncStatus::Success => "success",
            SyncStatus::Failed => "failed",
        }
    }
}

/// What the account pipeline hands back to the run summary.
#[derive(Debug)]
pub struct AccountOutcome {
    pub account_id: String,
    pub status: SyncStatus,
    pub resource_count: usize,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_name_lowercases_and_underscores() {
        assert_eq!(canonical_type_name("EC2Instances"), "ec2instances");
        assert_eq!(
            canonical_type_name("Auto Scaling Groups"),
            "auto_scaling_groups"
        );
    }

    #[test]
    fn sync_status_strings() {
        assert_eq!(SyncStatus::Success.as_str(), "success");
        assert_eq!(SyncStatus::Failed.as_str(), "failed");
    }

    #[test]
    fn scan_report_counts() {
        let mut report = ScanReport::default();
        report.record("us-east-1", "EC2Instances", CallStatus::Succeeded(3));
        report.record("us-east-1", "KMSKeys", CallStatus::SkippedUnknownCall);
        report.record(
            "us-west-2",
            "RDSInstances",
            CallStatus::Failed("throttled".into()),
        );
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.entries.len(), 3);
    }

    #[test]
    fn normalized_resource_snapshot_field_names() {
        let r = NormalizedResource {
            resource_type: "ec2instances".into(),
            region: "us-east-1".into(),
            service: "ec2".into(),
            resource_id: "i-abc".into(),
            resource_arn: String::new(),
            name: "i-abc".into(),
            state: "running".into(),
            tags: BTreeMap::new(),
            raw: serde_json::json!({"InstanceId": "i-abc"}),
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["resourceType"], "ec2instances");
        assert_eq!(v["resourceId"], "i-abc");
        assert_eq!(v["rawData"]["InstanceId"], "i-abc");
    }
}
