//! Common utilities shared by the page-level components
//!
//! Polling and text normalisation used by readiness checks, the resolver
//! and the interaction executor.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;

// ============================================================================
// Polling Utilities
// ============================================================================

/// Configuration for polling operations
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub timeout_ms: u64,
    pub initial_interval_ms: u64,
    pub max_interval_ms: u64,
    pub use_exponential_backoff: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10000,
            initial_interval_ms: 100,
            max_interval_ms: 500,
            use_exponential_backoff: true,
        }
    }
}

impl PollConfig {
    pub fn with_timeout(timeout_ms: u64, interval_ms: u64) -> Self {
        Self {
            timeout_ms,
            initial_interval_ms: interval_ms,
            max_interval_ms: interval_ms.max(500),
            use_exponential_backoff: false,
        }
    }
}

/// Poll `check_fn` until it yields a value or the timeout elapses
///
/// The whole loop runs under `tokio::time::timeout`, so an in-flight check is
/// cancelled when the bound is hit. Returns `Ok(None)` on timeout. Errors from
/// `check_fn` abort the poll.
pub async fn poll_for<T, F, Fut>(mut check_fn: F, config: &PollConfig) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let timeout = Duration::from_millis(config.timeout_ms);
    let mut interval = config.initial_interval_ms.max(1);

    let polling = async {
        loop {
            if let Some(value) = check_fn().await? {
                return Ok::<T, anyhow::Error>(value);
            }

            tokio::time::sleep(Duration::from_millis(interval)).await;

            if config.use_exponential_backoff {
                interval = (interval * 3 / 2).min(config.max_interval_ms);
            }
        }
    };

    match tokio::time::timeout(timeout, polling).await {
        Ok(result) => result.map(Some),
        Err(_) => Ok(None),
    }
}

/// Poll `check_fn` until it returns `true` or the timeout elapses
///
/// Returns `Ok(true)` if the condition was met, `Ok(false)` on timeout.
pub async fn poll_until<F, Fut>(mut check_fn: F, config: &PollConfig) -> Result<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let met = poll_for(
        || {
            let check = check_fn();
            async move { Ok::<Option<()>, anyhow::Error>(check.await?.then_some(())) }
        },
        config,
    )
    .await?;
    Ok(met.is_some())
}

// ============================================================================
// Text Utilities
// ============================================================================

/// Lowercase and drop whitespace, hyphens and underscores
///
/// "Company Code", "company-code" and "COMPANY_CODE" all normalise to
/// "companycode".
pub fn normalize_name(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Trim and collapse inner whitespace runs to one space
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Company Code"), "companycode");
        assert_eq!(normalize_name("company-code"), "companycode");
        assert_eq!(normalize_name("COMPANY_CODE"), "companycode");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  100 \n  USD "), "100 USD");
    }

    #[tokio::test]
    async fn test_poll_until_met() {
        let calls = AtomicU32::new(0);
        let met = poll_until(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<bool, anyhow::Error>(n >= 2) }
            },
            &PollConfig::with_timeout(2000, 5),
        )
        .await
        .unwrap();
        assert!(met);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_poll_until_times_out() {
        let met = poll_until(
            || async { Ok::<bool, anyhow::Error>(false) },
            &PollConfig::with_timeout(50, 10),
        )
        .await
        .unwrap();
        assert!(!met);
    }

    #[tokio::test]
    async fn test_poll_until_propagates_errors() {
        let result = poll_until(
            || async { Err::<bool, _>(anyhow::anyhow!("boom")) },
            &PollConfig::with_timeout(1000, 10),
        )
        .await;
        assert!(result.is_err());
    }
}
