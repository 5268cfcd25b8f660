use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{SearchOutcome, SearchPage};

/// レート制限時の再試行ポリシー
///
/// `max_attempts` が `None` の場合は成功するまで無制限に再試行する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    pub fn unbounded(interval: Duration) -> Self {
        Self::new(interval)
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// `attempt` 回目の試行後にまだ再試行してよいか
    pub fn should_retry(&self, attempt: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempt < max,
            None => true,
        }
    }

    /// レート制限されている間 `search` を繰り返し、最初に得られたページを返す
    pub async fn run<F, Fut>(&self, label: &str, mut search: F) -> Result<SearchPage>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<SearchOutcome>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match search().await? {
                SearchOutcome::Page(page) => {
                    if attempt > 1 {
                        debug!(label, attempt, "search succeeded after rate limiting");
                    }
                    return Ok(page);
                }
                SearchOutcome::RateLimited { retry_after } => {
                    if !self.should_retry(attempt) {
                        return Err(Error::RateLimitExceeded { attempts: attempt });
                    }
                    warn!(
                        label,
                        attempt,
                        retry_after,
                        wait_secs = self.interval.as_secs_f64(),
                        "rate limited, backing off"
                    );
                    tokio::time::sleep(self.interval).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(20))
    }
}
