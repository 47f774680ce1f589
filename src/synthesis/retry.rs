use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(300);
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 3] = [500, 502, 504];
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Retry policy shared by every request made to the speech service.
///
/// `max_attempts` counts the first try, so the default of 3 means at most two retries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.to_vec(),
        }
    }
}

/// Why a single attempt failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptFailure {
    /// Connection, timeout or body-read failure.
    Transport(String),
    /// The service answered with a non-2xx status.
    Status { status: u16, body: String },
    /// The response arrived but could not be decoded.
    Decode(String),
}

impl AttemptFailure {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(_) | Self::Decode(_) => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Transport(msg) => format!("transport failure: {msg}"),
            Self::Status { status, body } if body.is_empty() => format!("HTTP {status}"),
            Self::Status { status, body } => format!("HTTP {status}: {body}"),
            Self::Decode(msg) => format!("invalid response: {msg}"),
        }
    }
}

impl RetryPolicy {
    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    /// Whether `failure` may be retried at all, ignoring the attempt budget.
    pub fn is_retryable(&self, failure: &AttemptFailure) -> bool {
        match failure {
            AttemptFailure::Transport(_) => true,
            AttemptFailure::Status { status, .. } => self.is_retryable_status(*status),
            AttemptFailure::Decode(_) => false,
        }
    }

    /// Whether another attempt follows attempt number `attempt` (1-based) failing with `failure`.
    pub fn should_retry(&self, attempt: u32, failure: &AttemptFailure) -> bool {
        attempt < self.max_attempts && self.is_retryable(failure)
    }

    /// Delay before retry number `retry` (1-based): `base * 2^(retry - 1)`.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(retry - 1).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor)
    }

    /// Run `op` until it succeeds, fails permanently, or the attempt budget is spent.
    ///
    /// `op` receives the 1-based attempt number. The returned failure is the last one seen.
    pub fn run<T>(
        &self,
        mut op: impl FnMut(u32) -> Result<T, AttemptFailure>,
    ) -> Result<T, AttemptFailure> {
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(v) => return Ok(v),
                Err(failure) if self.should_retry(attempt, &failure) => {
                    let delay = self.backoff_for(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        reason = %failure.message(),
                        "request failed, retrying"
                    );
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                    attempt += 1;
                }
                Err(failure) => return Err(failure),
            }
        }
    }
}
