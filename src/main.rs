mod accounts;
mod calls;
mod catalog;
mod config;
mod normalize;
mod scanner;
mod session;
mod store;
mod types;

use std::time::Instant;

use anyhow::Result;
use futures::future::join_all;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use accounts::AccountRegistry;
use calls::CallRegistry;
use config::Config;
use scanner::ScanOrchestrator;
use session::ScanSession;
use store::InventoryStore;
use types::{Account, AccountOutcome, SyncStatus};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    info!("resource discovery starting");

    let base_conf = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let registry = AccountRegistry::new(&base_conf, &config.app_table);
    let store = InventoryStore::new(&base_conf, &config.inventory_table, &config.inventory_bucket);

    let accounts: Vec<Account> = match &config.account_id {
        Some(id) => {
            info!(account = %id, "restricting run to a single account");
            registry.get(id).await?.into_iter().collect()
        }
        None => registry.list_active().await?,
    };

    if accounts.is_empty() {
        info!("no accounts to scan");
        return Ok(());
    }
    info!(count = accounts.len(), "accounts to scan");

    let orchestrator = ScanOrchestrator::new(
        CallRegistry::with_default_calls(),
        catalog::default_catalog(),
        config.call_delay,
    );

    // Store keys are account-partitioned; account pipelines run
    // concurrently and never collide.
    let outcomes = join_all(
        accounts
            .iter()
            .map(|account| scan_one_account(account, &orchestrator, &store, &registry)),
    )
    .await;

    let succeeded = outcomes
        .iter()
        .filter(|o| o.status == SyncStatus::Success)
        .count();
    let failed = outcomes.len() - succeeded;
    let total_resources: usize = outcomes.iter().map(|o| o.resource_count).sum();
    info!(
        accounts = outcomes.len(),
        succeeded,
        failed,
        total_resources,
        "discovery run complete"
    );

    Ok(())
}

/// Full pipeline for one account. Never propagates an error to siblings:
/// any failure is folded into a `failed` outcome, and the sync status is
/// recorded either way.
async fn scan_one_account(
    account: &Account,
    orchestrator: &ScanOrchestrator,
    store: &InventoryStore,
    registry: &AccountRegistry,
) -> AccountOutcome {
    info!(
        account = %account.account_id,
        name = %account.account_name,
        "scanning account"
    );
    let started = Instant::now();

    let result = run_pipeline(account, orchestrator, store).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    let outcome = match result {
        Ok(resource_count) => {
            info!(
                account = %account.account_id,
                resource_count,
                duration_ms,
                "account scan succeeded"
            );
            AccountOutcome {
                account_id: account.account_id.clone(),
                status: SyncStatus::Success,
                resource_count,
                duration_ms,
            }
        }
        Err(err) => {
            error!(
                account = %account.account_id,
                error = %format!("{err:#}"),
                "account scan failed"
            );
            AccountOutcome {
                account_id: account.account_id.clone(),
                status: SyncStatus::Failed,
                resource_count: 0,
                duration_ms,
            }
        }
    };

    if let Err(err) = registry.update_sync_status(&outcome).await {
        error!(
            account = %outcome.account_id,
            error = %format!("{err:#}"),
            "failed to record sync status"
        );
    }

    outcome
}

async fn run_pipeline(
    account: &Account,
    orchestrator: &ScanOrchestrator,
    store: &InventoryStore,
) -> Result<usize> {
    let session = ScanSession::acquire(account.role_arn.as_deref()).await?;
    let output = orchestrator.scan_account(&session, account).await?;

    let failed = output.report.failed_count();
    let skipped = output.report.skipped_count();
    if failed > 0 || skipped > 0 {
        info!(
            account = %account.account_id,
            failed,
            skipped,
            "scan completed with failed or skipped calls"
        );
    }

    store.persist(&account.account_id, &output.resources).await
}
