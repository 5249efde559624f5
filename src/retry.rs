//! Bounded retry with exponential backoff, jitter, and quota-aware waits.

// crates.io
use rand::Rng;
// self
use crate::{_prelude::*, obs, rate_limit::RateLimitTracker};

/// Retry configuration applied to every logical request.
///
/// `max_attempts` counts total tries, so the default of 3 means one initial request
/// plus up to two retries.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
	/// Total tries per logical request, including the first one.
	pub max_attempts: u32,
	/// Delay before the first retry.
	pub base_delay: Duration,
	/// Upper bound for any exponential backoff delay.
	pub max_delay: Duration,
	/// Symmetric jitter fraction applied to backoff delays (0.25 = ±25%).
	pub jitter: f64,
	/// Whether HTTP 429 responses are retried.
	pub retry_rate_limits: bool,
}
impl RetryPolicy {
	const DEFAULT_BASE_DELAY: Duration = Duration::seconds(1);
	const DEFAULT_JITTER: f64 = 0.25;
	const DEFAULT_MAX_ATTEMPTS: u32 = 3;
	const DEFAULT_MAX_DELAY: Duration = Duration::seconds(60);

	/// Policy that never retries.
	pub fn no_retry() -> Self {
		Self::default().with_max_attempts(1)
	}

	/// Overrides the total number of tries.
	pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
		self.max_attempts = max_attempts;

		self
	}

	/// Overrides the delay before the first retry.
	pub fn with_base_delay(mut self, delay: Duration) -> Self {
		self.base_delay = if delay.is_negative() { Duration::ZERO } else { delay };

		self
	}

	/// Overrides the backoff cap.
	pub fn with_max_delay(mut self, delay: Duration) -> Self {
		self.max_delay = if delay.is_negative() { Duration::ZERO } else { delay };

		self
	}

	/// Overrides the jitter fraction; values are clamped to `0.0..=1.0`.
	pub fn with_jitter(mut self, jitter: f64) -> Self {
		self.jitter = if jitter.is_finite() { jitter.clamp(0.0, 1.0) } else { 0.0 };

		self
	}

	/// Enables or disables retries on HTTP 429.
	pub fn with_retry_rate_limits(mut self, enabled: bool) -> Self {
		self.retry_rate_limits = enabled;

		self
	}

	/// Un-jittered backoff before retry number `attempt` (1-based): `base * 2^(attempt-1)`,
	/// capped at `max_delay`.
	pub fn base_backoff(&self, attempt: u32) -> Duration {
		let exponent = attempt.saturating_sub(1).min(30);
		let factor = 1_i32 << exponent;

		self.base_delay
			.checked_mul(factor)
			.map_or(self.max_delay, |delay| delay.min(self.max_delay))
	}

	/// Jittered backoff before retry number `attempt` (1-based).
	pub fn backoff(&self, attempt: u32) -> Duration {
		let delay = self.base_backoff(attempt);

		if self.jitter <= 0.0 || delay.is_zero() {
			return delay;
		}

		let factor = rand::rng().random_range(-self.jitter..=self.jitter);
		let jittered = delay + delay * factor;

		if jittered.is_negative() { Duration::ZERO } else { jittered }
	}

	/// Delay to sleep after `error` on attempt `attempt`, or `None` when the error must
	/// propagate (fatal error, rate limits disabled, or attempts exhausted).
	///
	/// Rate-limit failures prefer the server's `Retry-After`, then the tracker's reset
	/// wait, then the exponential backoff.
	pub fn delay_for(
		&self,
		error: &Error,
		attempt: u32,
		tracker: &RateLimitTracker,
	) -> Option<Duration> {
		if attempt >= self.max_attempts {
			return None;
		}

		match error {
			Error::Transient(_) => Some(self.backoff(attempt)),
			Error::RateLimited(e) if self.retry_rate_limits => {
				let wait = e
					.retry_after
					.filter(|wait| wait.is_positive())
					.or_else(|| Some(tracker.should_wait()).filter(|wait| wait.is_positive()))
					.unwrap_or_else(|| self.backoff(attempt));

				Some(wait)
			},
			_ => None,
		}
	}

	/// Runs `op` until it succeeds, fails fatally, or attempts run out.
	///
	/// `op` receives the 1-based attempt number. The last error is returned once attempts
	/// are exhausted.
	pub async fn execute<T, F, Fut>(&self, tracker: &RateLimitTracker, mut op: F) -> Result<T>
	where
		F: FnMut(u32) -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		let mut attempt = 1;

		loop {
			match op(attempt).await {
				Ok(value) => return Ok(value),
				Err(e) => {
					let Some(delay) = self.delay_for(&e, attempt, tracker) else {
						return Err(e);
					};

					obs::log_retry(attempt, delay, &e);
					sleep(delay).await;

					attempt += 1;
				},
			}
		}
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
			base_delay: Self::DEFAULT_BASE_DELAY,
			max_delay: Self::DEFAULT_MAX_DELAY,
			jitter: Self::DEFAULT_JITTER,
			retry_rate_limits: true,
		}
	}
}

/// Sleeps for a non-negative `time::Duration` on the tokio timer.
pub(crate) async fn sleep(delay: Duration) {
	if delay.is_positive() {
		tokio::time::sleep(delay.unsigned_abs()).await;
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicU32, Ordering};
	// self
	use super::*;
	use crate::error::{RateLimitError, TransientError, TransportError};

	fn transient() -> Error {
		TransientError::Server { status: 503, message: "maintenance".into(), retry_after: None }
			.into()
	}

	fn rate_limited(retry_after: Option<Duration>) -> Error {
		RateLimitError {
			message: "slow down".into(),
			retry_after,
			limit: Some(60),
			remaining: Some(0),
			reset_at: None,
		}
		.into()
	}

	#[test]
	fn backoff_doubles_and_caps() {
		let policy = RetryPolicy::default().with_jitter(0.0);

		assert_eq!(policy.backoff(1), Duration::seconds(1));
		assert_eq!(policy.backoff(2), Duration::seconds(2));
		assert_eq!(policy.backoff(3), Duration::seconds(4));
		assert_eq!(policy.backoff(7), Duration::seconds(60));
		assert_eq!(policy.backoff(200), Duration::seconds(60));
	}

	#[test]
	fn jitter_stays_within_bounds() {
		let policy = RetryPolicy::default();

		for _ in 0..64 {
			let delay = policy.backoff(3);

			assert!(delay >= Duration::seconds(3) && delay <= Duration::seconds(5), "{delay}");
		}
	}

	#[test]
	fn delay_for_classifies_errors() {
		let policy = RetryPolicy::default().with_jitter(0.0);
		let tracker = RateLimitTracker::new();

		assert_eq!(policy.delay_for(&transient(), 1, &tracker), Some(Duration::seconds(1)));
		assert_eq!(
			policy.delay_for(&rate_limited(Some(Duration::seconds(9))), 1, &tracker),
			Some(Duration::seconds(9))
		);
		assert_eq!(policy.delay_for(&rate_limited(None), 2, &tracker), Some(Duration::seconds(2)));
		assert_eq!(policy.delay_for(&Error::validation("bad"), 1, &tracker), None);
		assert_eq!(policy.delay_for(&transient(), 3, &tracker), None);

		let policy = policy.with_retry_rate_limits(false);

		assert_eq!(policy.delay_for(&rate_limited(Some(Duration::seconds(9))), 1, &tracker), None);
	}

	#[tokio::test(start_paused = true)]
	async fn always_transient_makes_exactly_max_attempts() {
		let policy = RetryPolicy::default();
		let tracker = RateLimitTracker::new();
		let calls = AtomicU32::new(0);
		let result: Result<()> = policy
			.execute(&tracker, |_| {
				calls.fetch_add(1, Ordering::SeqCst);

				async { Err(TransportError::Timeout.into()) }
			})
			.await;

		assert_eq!(calls.load(Ordering::SeqCst), 3);
		assert!(matches!(
			result,
			Err(Error::Transient(TransientError::Transport(TransportError::Timeout)))
		));
	}

	#[tokio::test(start_paused = true)]
	async fn fatal_errors_make_a_single_attempt() {
		let policy = RetryPolicy::default();
		let tracker = RateLimitTracker::new();
		let calls = AtomicU32::new(0);
		let result: Result<()> = policy
			.execute(&tracker, |_| {
				calls.fetch_add(1, Ordering::SeqCst);

				async { Err(Error::validation("query must not be empty")) }
			})
			.await;

		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert!(matches!(result, Err(Error::Validation { .. })));
	}

	#[tokio::test(start_paused = true)]
	async fn rate_limit_retry_waits_for_retry_after() {
		let policy = RetryPolicy::default();
		let tracker = RateLimitTracker::new();
		let started = tokio::time::Instant::now();
		let value = policy
			.execute(&tracker, |attempt| async move {
				if attempt == 1 { Err(rate_limited(Some(Duration::seconds(5)))) } else { Ok(attempt) }
			})
			.await
			.expect("Second attempt should succeed.");

		assert_eq!(value, 2);
		assert!(started.elapsed() >= std::time::Duration::from_secs(5));
	}
}
