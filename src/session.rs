use std::time::{Duration, UNIX_EPOCH};

use anyhow::{Context, Result};
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use chrono::{DateTime, Utc};
use tracing::info;

const SESSION_NAME: &str = "inventory-discovery";
const SESSION_DURATION_SECS: i32 = 3600;

/// Credentials handle for one account scan.
///
/// Holds a loaded [`SdkConfig`] (ambient identity or assumed role) carrying
/// the outbound-call policy every derived service client inherits. Assumed
/// roles embed an expiry; a handle must not be used past it, and scans are
/// expected to finish within the window. There is no mid-scan renewal.
pub struct ScanSession {
    conf: SdkConfig,
    expires_at: Option<DateTime<Utc>>,
}

impl ScanSession {
    /// Acquire a session for the given role, or for the ambient identity
    /// when `role_arn` is `None`. Role-assumption failure is a hard error
    /// for the account.
    pub async fn acquire(role_arn: Option<&str>) -> Result<Self> {
        let Some(role_arn) = role_arn else {
            let conf = loader().load().await;
            return Ok(Self {
                conf,
                expires_at: None,
            });
        };

        info!(role_arn, "assuming cross-account role");
        let base = aws_config::defaults(BehaviorVersion::latest()).load().await;
        let sts = aws_sdk_sts::Client::new(&base);
        let resp = sts
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(SESSION_NAME)
            .duration_seconds(SESSION_DURATION_SECS)
            .send()
            .await
            .with_context(|| format!("failed to assume role {role_arn}"))?;

        let creds = resp
            .credentials()
            .context("assume-role response carried no credentials")?;

        let expiry_epoch = creds.expiration().secs();
        let provider = Credentials::new(
            creds.access_key_id(),
            creds.secret_access_key(),
            Some(creds.session_token().to_string()),
            Some(UNIX_EPOCH + Duration::from_secs(expiry_epoch.max(0) as u64)),
            "AssumedRole",
        );

        let conf = loader().credentials_provider(provider).load().await;
        Ok(Self {
            conf,
            expires_at: Some(Utc::now() + chrono::Duration::seconds(i64::from(SESSION_DURATION_SECS))),
        })
    }

    /// Derive a region-bound config from the handle without re-resolving
    /// credentials.
    pub fn regional(&self, region: &str) -> SdkConfig {
        self.conf
            .to_builder()
            .region(Region::new(region.to_string()))
            .build()
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    #[cfg(test)]
    pub(crate) fn from_config(conf: SdkConfig) -> Self {
        Self {
            conf,
            expires_at: None,
        }
    }

    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }
}

/// Retry and timeout policy applied to every provider call made through a
/// session: 3 adaptive attempts, 10 s connect / 30 s read.
fn loader() -> aws_config::ConfigLoader {
    aws_config::defaults(BehaviorVersion::latest())
        .retry_config(RetryConfig::adaptive().with_max_attempts(3))
        .timeout_config(
            TimeoutConfig::builder()
                .connect_timeout(Duration::from_secs(10))
                .read_timeout(Duration::from_secs(30))
                .build(),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_expiring_at(expires_at: Option<DateTime<Utc>>) -> ScanSession {
        ScanSession {
            conf: SdkConfig::builder().build(),
            expires_at,
        }
    }

    #[test]
    fn ambient_sessions_never_expire() {
        let s = session_expiring_at(None);
        assert!(!s.is_expired_at(Utc::now() + chrono::Duration::days(365)));
    }

    #[test]
    fn assumed_role_sessions_expire_at_the_boundary() {
        let now = Utc::now();
        let s = session_expiring_at(Some(now));
        assert!(s.is_expired_at(now));
        assert!(!s.is_expired_at(now - chrono::Duration::seconds(1)));
    }
}
