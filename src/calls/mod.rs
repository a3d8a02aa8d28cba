use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use aws_config::SdkConfig;
use serde_json::Value;

mod autoscaling;
mod dynamodb;
mod ec2;
mod ecs;
mod efs;
mod lambda;
mod messaging;
mod rds;
mod s3;

/// One provider list/describe call.
///
/// Implementations consume every page of the paginated form (or issue one
/// non-paginated call) against a region-bound config, and render each page
/// as a JSON object keyed by the catalog's result key, items in wire shape.
#[async_trait]
pub trait ApiCall: Send + Sync {
    async fn fetch_pages(&self, conf: &SdkConfig) -> Result<Vec<Value>>;
}

/// Typed registry mapping `(service, call)` to an [`ApiCall`].
///
/// Populated once at startup; a catalog entry with no registry entry is the
/// "unknown call" skip case.
pub struct CallRegistry {
    calls: HashMap<(String, String), Arc<dyn ApiCall>>,
}

impl CallRegistry {
    pub fn with_default_calls() -> Self {
        let mut registry = Self {
            calls: HashMap::new(),
        };

        registry.register("ec2", "describe_instances", Arc::new(ec2::DescribeInstances));
        registry.register("ec2", "describe_volumes", Arc::new(ec2::DescribeVolumes));
        registry.register("ec2", "describe_vpcs", Arc::new(ec2::DescribeVpcs));
        registry.register("ec2", "describe_subnets", Arc::new(ec2::DescribeSubnets));
        registry.register(
            "ec2",
            "describe_security_groups",
            Arc::new(ec2::DescribeSecurityGroups),
        );
        registry.register("lambda", "list_functions", Arc::new(lambda::ListFunctions));
        registry.register("ecs", "list_clusters", Arc::new(ecs::ListClusters));
        registry.register(
            "autoscaling",
            "describe_auto_scaling_groups",
            Arc::new(autoscaling::DescribeAutoScalingGroups),
        );
        registry.register("rds", "describe_db_instances", Arc::new(rds::DescribeDbInstances));
        registry.register("rds", "describe_db_clusters", Arc::new(rds::DescribeDbClusters));
        registry.register("dynamodb", "list_tables", Arc::new(dynamodb::ListTables));
        registry.register("s3", "list_buckets", Arc::new(s3::ListBuckets));
        registry.register("efs", "describe_file_systems", Arc::new(efs::DescribeFileSystems));
        registry.register("sns", "list_topics", Arc::new(messaging::ListTopics));
        registry.register("sqs", "list_queues", Arc::new(messaging::ListQueues));

        registry
    }

    pub fn register(&mut self, service: &str, call: &str, api: Arc<dyn ApiCall>) {
        self.calls
            .insert((service.to_string(), call.to_string()), api);
    }

    pub fn get(&self, service: &str, call: &str) -> Option<Arc<dyn ApiCall>> {
        self.calls
            .get(&(service.to_string(), call.to_string()))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;

    #[test]
    fn registry_covers_every_default_catalog_entry() {
        let registry = CallRegistry::with_default_calls();
        for spec in default_catalog() {
            assert!(
                registry.get(&spec.service, &spec.call).is_some(),
                "no registered call for {}.{}",
                spec.service,
                spec.call
            );
        }
    }

    #[test]
    fn unknown_calls_miss() {
        let registry = CallRegistry::with_default_calls();
        assert!(registry.get("ec2", "describe_warp_drives").is_none());
        assert!(registry.get("redshift", "describe_clusters").is_none());
    }
}
