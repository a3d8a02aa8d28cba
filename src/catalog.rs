use crate::types::ResourceTypeSpec;

/// Built-in resource-type catalog, used when the caller supplies none.
/// Order matters: it is the scan order within each region.
pub fn default_catalog() -> Vec<ResourceTypeSpec> {
    vec![
        // Compute
        ResourceTypeSpec::new("EC2Instances", "ec2", "describe_instances", "Instances"),
        ResourceTypeSpec::new("LambdaFunctions", "lambda", "list_functions", "Functions"),
        ResourceTypeSpec::new("ECSClusters", "ecs", "list_clusters", "clusterArns"),
        ResourceTypeSpec::new(
            "AutoScalingGroups",
            "autoscaling",
            "describe_auto_scaling_groups",
            "AutoScalingGroups",
        ),
        // Database
        ResourceTypeSpec::new("RDSInstances", "rds", "describe_db_instances", "DBInstances"),
        ResourceTypeSpec::new("RDSClusters", "rds", "describe_db_clusters", "DBClusters"),
        ResourceTypeSpec::new("DynamoDBTables", "dynamodb", "list_tables", "TableNames"),
        // Storage
        ResourceTypeSpec::new("S3Buckets", "s3", "list_buckets", "Buckets"),
        ResourceTypeSpec::new("EBSVolumes", "ec2", "describe_volumes", "Volumes"),
        ResourceTypeSpec::new("EFSFilesystems", "efs", "describe_file_systems", "FileSystems"),
        // Networking
        ResourceTypeSpec::new("VPCs", "ec2", "describe_vpcs", "Vpcs"),
        ResourceTypeSpec::new("Subnets", "ec2", "describe_subnets", "Subnets"),
        // Security
        ResourceTypeSpec::new(
            "SecurityGroups",
            "ec2",
            "describe_security_groups",
            "SecurityGroups",
        ),
        // Messaging
        ResourceTypeSpec::new("SNSTopics", "sns", "list_topics", "Topics"),
        ResourceTypeSpec::new("SQSQueues", "sqs", "list_queues", "QueueUrls"),
    ]
}

/// Regions scanned for accounts that do not declare their own list.
pub fn default_regions() -> Vec<String> {
    ["us-east-1", "us-west-2", "eu-west-1", "ap-south-1"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_entries_are_unique_by_service_and_call() {
        let catalog = default_catalog();
        let keys: HashSet<_> = catalog
            .iter()
            .map(|s| (s.service.clone(), s.call.clone()))
            .collect();
        assert_eq!(keys.len(), catalog.len());
    }

    #[test]
    fn catalog_names_canonicalize_cleanly() {
        for spec in default_catalog() {
            let canonical = spec.canonical_name();
            assert!(!canonical.is_empty());
            assert!(!canonical.contains(' '));
            assert_eq!(canonical, canonical.to_lowercase());
        }
    }

    #[test]
    fn default_regions_start_with_us_east_1() {
        assert_eq!(default_regions()[0], "us-east-1");
    }
}
