use std::collections::BTreeMap;

use serde_json::Value;

use crate::types::NormalizedResource;

/// Identifier field names tried in order when extracting a resource id.
const ID_FIELDS: &[&str] = &[
    "InstanceId",
    "DBInstanceIdentifier",
    "DBClusterIdentifier",
    "ClusterIdentifier",
    "FunctionName",
    "BucketName",
    "VolumeId",
    "VpcId",
    "SubnetId",
    "GroupId",
    "KeyId",
    "AutoScalingGroupName",
    "LoadBalancerArn",
    "TopicArn",
    "QueueUrl",
    "FileSystemId",
    "NatGatewayId",
    "DistributionId",
];

/// ARN-shaped field names tried in order. `QueueUrl` is not an ARN but is
/// the stable key SQS gives us for a queue, so it stays in the list.
const ARN_FIELDS: &[&str] = &[
    "Arn",
    "ARN",
    "FunctionArn",
    "DBInstanceArn",
    "DBClusterArn",
    "LoadBalancerArn",
    "TopicArn",
    "QueueUrl",
    "FileSystemArn",
    "KeyArn",
];

const NAME_FIELDS: &[&str] = &[
    "Name",
    "DBInstanceIdentifier",
    "DBClusterIdentifier",
    "FunctionName",
    "BucketName",
    "AutoScalingGroupName",
    "LoadBalancerName",
    "FileSystemId",
];

const STATE_FIELDS: &[&str] = &["State", "DBInstanceStatus", "Status", "LifeCycleState"];

/// Common identity extracted from one raw response item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub resource_id: String,
    pub resource_arn: String,
    pub name: String,
    pub state: String,
    pub tags: BTreeMap<String, String>,
}

/// Map a raw provider response item to a [`NormalizedResource`].
///
/// `resource_type` is the catalog spec name; it is canonicalized here so
/// every downstream consumer sees the same key form.
pub fn normalize(raw: Value, resource_type: &str, region: &str, service: &str) -> NormalizedResource {
    let identity = extract_identity(&raw);
    NormalizedResource {
        resource_type: crate::types::canonical_type_name(resource_type),
        region: region.to_string(),
        service: service.to_string(),
        resource_id: identity.resource_id,
        resource_arn: identity.resource_arn,
        name: identity.name,
        state: identity.state,
        tags: identity.tags,
        raw,
    }
}

/// Heuristic identity extraction across heterogeneous response shapes.
///
/// Bare strings are either ARNs (id = final path segment) or plain ids.
/// Objects are probed with fixed priority lists per field. Anything else
/// yields the all-default degraded identity.
pub fn extract_identity(raw: &Value) -> Identity {
    let mut identity = Identity {
        state: "unknown".to_string(),
        ..Identity::default()
    };

    if let Some(s) = raw.as_str() {
        if s.starts_with("arn:") {
            identity.resource_arn = s.to_string();
            identity.resource_id = arn_tail(s);
        } else {
            identity.resource_id = s.to_string();
        }
        identity.name = identity.resource_id.clone();
        return identity;
    }

    let Some(obj) = raw.as_object() else {
        return identity;
    };

    for key in ID_FIELDS {
        if let Some(v) = obj.get(*key).and_then(Value::as_str) {
            identity.resource_id = v.to_string();
            break;
        }
    }

    for key in ARN_FIELDS {
        if let Some(v) = obj.get(*key).and_then(Value::as_str) {
            identity.resource_arn = v.to_string();
            break;
        }
    }

    for key in NAME_FIELDS {
        if let Some(v) = obj.get(*key).and_then(Value::as_str) {
            identity.name = v.to_string();
            break;
        }
    }

    identity.tags = extract_tags(obj);

    if identity.name.is_empty() {
        if let Some(n) = identity.tags.get("Name") {
            identity.name = n.clone();
        }
    }

    if let Some(state) = STATE_FIELDS.iter().find_map(|k| obj.get(*k)) {
        match state {
            Value::String(s) => identity.state = s.clone(),
            Value::Object(m) => {
                if let Some(s) = m
                    .get("Name")
                    .or_else(|| m.get("Code"))
                    .and_then(Value::as_str)
                {
                    identity.state = s.to_string();
                }
            }
            _ => {}
        }
    }

    if identity.name.is_empty() {
        identity.name = identity.resource_id.clone();
    }

    identity
}

/// Last `/`-delimited segment of an ARN, falling back to the last
/// `:`-delimited one for ARNs without a path.
fn arn_tail(arn: &str) -> String {
    if arn.contains('/') {
        arn.rsplit('/').next().unwrap_or(arn).to_string()
    } else {
        arn.rsplit(':').next().unwrap_or(arn).to_string()
    }
}

/// Tags arrive either as `[{Key, Value}]` pairs (under `Tags` or
/// `TagList`) or as a direct string map.
fn extract_tags(obj: &serde_json::Map<String, Value>) -> BTreeMap<String, String> {
    let Some(tags) = obj.get("Tags").or_else(|| obj.get("TagList")) else {
        return BTreeMap::new();
    };

    match tags {
        Value::Array(pairs) => pairs
            .iter()
            .filter_map(|pair| {
                let key = pair.get("Key").and_then(Value::as_str)?;
                let value = pair.get("Value").and_then(Value::as_str).unwrap_or("");
                Some((key.to_string(), value.to_string()))
            })
            .collect(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect(),
        _ => BTreeMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn arn_string_takes_final_path_segment() {
        let id = extract_identity(&json!(
            "arn:aws:ecs:us-east-1:111122223333:cluster/web-cluster"
        ));
        assert_eq!(
            id.resource_arn,
            "arn:aws:ecs:us-east-1:111122223333:cluster/web-cluster"
        );
        assert_eq!(id.resource_id, "web-cluster");
        assert_eq!(id.name, "web-cluster");
    }

    #[test]
    fn arn_string_without_path_takes_final_colon_segment() {
        let id = extract_identity(&json!("arn:aws:sns:us-east-1:111122223333:alerts"));
        assert_eq!(id.resource_id, "alerts");
    }

    #[test]
    fn plain_string_is_resource_id() {
        let id = extract_identity(&json!("orders-table"));
        assert_eq!(id.resource_id, "orders-table");
        assert_eq!(id.resource_arn, "");
        assert_eq!(id.name, "orders-table");
        assert_eq!(id.state, "unknown");
    }

    #[test]
    fn id_priority_order_is_fixed() {
        let id = extract_identity(&json!({
            "VolumeId": "vol-1",
            "InstanceId": "i-1",
        }));
        assert_eq!(id.resource_id, "i-1");
    }

    #[test]
    fn structured_state_prefers_name_subfield() {
        let id = extract_identity(&json!({
            "InstanceId": "i-abc",
            "State": {"Code": 16, "Name": "running"},
        }));
        assert_eq!(id.state, "running");
    }

    #[test]
    fn structured_state_falls_back_to_code() {
        let id = extract_identity(&json!({
            "InstanceId": "i-abc",
            "State": {"Code": "16"},
        }));
        assert_eq!(id.state, "16");
    }

    #[test]
    fn string_state_fields_in_order() {
        let id = extract_identity(&json!({
            "DBInstanceIdentifier": "db-1",
            "DBInstanceStatus": "available",
        }));
        assert_eq!(id.state, "available");

        let id = extract_identity(&json!({
            "FileSystemId": "fs-1",
            "LifeCycleState": "available",
        }));
        assert_eq!(id.state, "available");
    }

    #[test]
    fn tag_pairs_become_map_and_fill_name() {
        let id = extract_identity(&json!({
            "InstanceId": "i-1",
            "Tags": [
                {"Key": "Name", "Value": "web-1"},
                {"Key": "env", "Value": "prod"},
            ],
        }));
        assert_eq!(id.name, "web-1");
        assert_eq!(id.tags.get("env").map(String::as_str), Some("prod"));
    }

    #[test]
    fn tag_list_key_is_accepted() {
        let id = extract_identity(&json!({
            "DBInstanceIdentifier": "db-1",
            "TagList": [{"Key": "team", "Value": "data"}],
        }));
        assert_eq!(id.tags.get("team").map(String::as_str), Some("data"));
    }

    #[test]
    fn direct_tag_map_is_accepted() {
        let id = extract_identity(&json!({
            "FunctionName": "billing",
            "Tags": {"owner": "payments"},
        }));
        assert_eq!(id.tags.get("owner").map(String::as_str), Some("payments"));
    }

    #[test]
    fn name_defaults_to_resource_id() {
        let id = extract_identity(&json!({"InstanceId": "i-abc", "Tags": []}));
        assert_eq!(id.name, "i-abc");
    }

    #[test]
    fn explicit_name_field_wins_over_tag() {
        let id = extract_identity(&json!({
            "FileSystemId": "fs-1",
            "Name": "shared-data",
            "Tags": [{"Key": "Name", "Value": "from-tag"}],
        }));
        assert_eq!(id.name, "shared-data");
    }

    #[test]
    fn non_object_non_string_degrades_to_defaults() {
        let id = extract_identity(&json!(42));
        assert_eq!(id, Identity {
            state: "unknown".into(),
            ..Identity::default()
        });

        let id = extract_identity(&json!([1, 2, 3]));
        assert_eq!(id.resource_id, "");
        assert_eq!(id.state, "unknown");
    }

    #[test]
    fn normalize_canonicalizes_type_and_keeps_raw() {
        let raw = json!({"InstanceId": "i-abc"});
        let r = normalize(raw.clone(), "EC2Instances", "us-east-1", "ec2");
        assert_eq!(r.resource_type, "ec2instances");
        assert_eq!(r.region, "us-east-1");
        assert_eq!(r.service, "ec2");
        assert_eq!(r.raw, raw);
    }

    #[test]
    fn two_instances_one_tagged_one_not() {
        let tagged = normalize(
            json!({
                "InstanceId": "i-def",
                "State": {"Name": "running"},
                "Tags": [{"Key": "Name", "Value": "web-1"}],
            }),
            "EC2Instances",
            "us-east-1",
            "ec2",
        );
        let untagged = normalize(
            json!({"InstanceId": "i-abc", "State": {"Name": "stopped"}}),
            "EC2Instances",
            "us-east-1",
            "ec2",
        );
        assert_eq!(tagged.name, "web-1");
        assert_eq!(untagged.name, "i-abc");
        assert_eq!(tagged.state, "running");
        assert_eq!(untagged.state, "stopped");
    }
}
