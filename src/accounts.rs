use std::collections::HashMap;

use anyhow::{Context, Result};
use aws_config::SdkConfig;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use chrono::Utc;
use tracing::warn;

use crate::catalog::default_regions;
use crate::types::{Account, AccountOutcome};

/// Application-table adapter: the registry of accounts to scan and the
/// per-account sync-status row.
pub struct AccountRegistry {
    client: Client,
    table: String,
}

impl AccountRegistry {
    pub fn new(conf: &SdkConfig, table: impl Into<String>) -> Self {
        Self {
            client: Client::new(conf),
            table: table.into(),
        }
    }

    /// All active account registrations, via the GSI1 type partition.
    pub async fn list_active(&self) -> Result<Vec<Account>> {
        let mut accounts = Vec::new();
        let mut start: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let mut query = self
                .client
                .query()
                .table_name(&self.table)
                .index_name("GSI1")
                .key_condition_expression("gsi1pk = :pk")
                .filter_expression("#status = :active")
                .expression_attribute_names("#status", "status")
                .expression_attribute_values(":pk", AttributeValue::S("TYPE#ACCOUNT".into()))
                .expression_attribute_values(":active", AttributeValue::S("active".into()));
            if let Some(key) = start {
                query = query.set_exclusive_start_key(Some(key));
            }

            let resp = query
                .send()
                .await
                .context("failed to query account registry")?;

            for item in resp.items() {
                match parse_account(item) {
                    Some(account) => accounts.push(account),
                    None => warn!("skipping account item without an account_id"),
                }
            }

            start = resp.last_evaluated_key().cloned();
            if start.is_none() {
                break;
            }
        }

        Ok(accounts)
    }

    /// One account's registration row, for single-account runs.
    pub async fn get(&self, account_id: &str) -> Result<Option<Account>> {
        let resp = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("pk", AttributeValue::S(format!("ACCOUNT#{account_id}")))
            .key("sk", AttributeValue::S("METADATA".into()))
            .send()
            .await
            .with_context(|| format!("failed to fetch account {account_id}"))?;

        Ok(resp.item().and_then(parse_account))
    }

    /// Overwrite the account's sync-status attributes for this run.
    pub async fn update_sync_status(&self, outcome: &AccountOutcome) -> Result<()> {
        self.client
            .update_item()
            .table_name(&self.table)
            .key(
                "pk",
                AttributeValue::S(format!("ACCOUNT#{}", outcome.account_id)),
            )
            .key("sk", AttributeValue::S("METADATA".into()))
            .update_expression(
                "SET lastSyncedAt = :ts, lastSyncStatus = :status, \
                 lastSyncResourceCount = :count, lastSyncDurationMs = :duration",
            )
            .expression_attribute_values(":ts", AttributeValue::S(Utc::now().to_rfc3339()))
            .expression_attribute_values(
                ":status",
                AttributeValue::S(outcome.status.as_str().to_string()),
            )
            .expression_attribute_values(
                ":count",
                AttributeValue::N(outcome.resource_count.to_string()),
            )
            .expression_attribute_values(
                ":duration",
                AttributeValue::N(outcome.duration_ms.to_string()),
            )
            .send()
            .await
            .with_context(|| format!("failed to update sync status for {}", outcome.account_id))?;
        Ok(())
    }
}

/// Parse a registration item. Items without an account id are unusable;
/// a missing region list falls back to the built-in defaults.
fn parse_account(item: &HashMap<String, AttributeValue>) -> Option<Account> {
    let account_id = string_attr(item, "account_id")?;

    let account_name = string_attr(item, "account_name").unwrap_or_else(|| account_id.clone());
    let role_arn = string_attr(item, "role_arn").filter(|s| !s.is_empty());

    let regions: Vec<String> = item
        .get("regions")
        .and_then(|v| v.as_l().ok())
        .map(|list| {
            list.iter()
                .filter_map(|v| v.as_s().ok().cloned())
                .collect()
        })
        .unwrap_or_default();
    let regions = if regions.is_empty() {
        default_regions()
    } else {
        regions
    };

    Some(Account {
        account_id,
        account_name,
        role_arn,
        regions,
    })
}

fn string_attr(item: &HashMap<String, AttributeValue>, key: &str) -> Option<String> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .filter(|s| !s.is_empty())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> AttributeValue {
        AttributeValue::S(v.to_string())
    }

    #[test]
    fn parses_a_full_registration_row() {
        let mut item = HashMap::new();
        item.insert("account_id".to_string(), s("111122223333"));
        item.insert("account_name".to_string(), s("prod"));
        item.insert(
            "role_arn".to_string(),
            s("arn:aws:iam::111122223333:role/scan"),
        );
        item.insert(
            "regions".to_string(),
            AttributeValue::L(vec![s("us-east-1"), s("eu-west-1")]),
        );

        let account = parse_account(&item).unwrap();
        assert_eq!(account.account_id, "111122223333");
        assert_eq!(account.account_name, "prod");
        assert_eq!(
            account.role_arn.as_deref(),
            Some("arn:aws:iam::111122223333:role/scan")
        );
        assert_eq!(account.regions, vec!["us-east-1", "eu-west-1"]);
    }

    #[test]
    fn missing_account_id_is_rejected() {
        let mut item = HashMap::new();
        item.insert("account_name".to_string(), s("prod"));
        assert!(parse_account(&item).is_none());
    }

    #[test]
    fn defaults_fill_name_role_and_regions() {
        let mut item = HashMap::new();
        item.insert("account_id".to_string(), s("111122223333"));
        item.insert("role_arn".to_string(), s(""));

        let account = parse_account(&item).unwrap();
        assert_eq!(account.account_name, "111122223333");
        assert!(account.role_arn.is_none());
        assert_eq!(account.regions, default_regions());
    }
}
