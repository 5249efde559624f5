//! Client-side view of the server's request quota.
//!
//! The tracker reads the quota headers attached to every response and answers one
//! question before each request: does the caller have to wait for the window to reset?
//! Reads and updates share one mutex so concurrent requests on a client never spend the
//! same unit of quota twice.

// crates.io
use http::{HeaderMap, header::RETRY_AFTER};
use time::format_description::well_known::Rfc2822;
// self
use crate::_prelude::*;

/// Per-minute request limit header.
pub const LIMIT_MINUTE_HEADER: &str = "x-ratelimit-limit-minute";
/// Requests remaining in the per-minute window.
pub const REMAINING_MINUTE_HEADER: &str = "x-ratelimit-remaining-minute";
/// Daily request limit header.
pub const LIMIT_DAILY_HEADER: &str = "x-ratelimit-limit-daily";
/// Requests remaining for the day.
pub const REMAINING_DAILY_HEADER: &str = "x-ratelimit-remaining-daily";
/// Unix timestamp (seconds) at which the per-minute window resets.
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Last quota figures reported by the server.
///
/// Every field stays `None` until the server has reported it at least once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RateLimitState {
	/// Requests allowed per minute.
	pub limit: Option<u64>,
	/// Requests left in the current minute window.
	pub remaining: Option<u64>,
	/// Instant the minute window resets.
	pub reset_at: Option<OffsetDateTime>,
	/// Requests allowed per day.
	pub daily_limit: Option<u64>,
	/// Requests left for the day.
	pub daily_remaining: Option<u64>,
	/// When the headers were last observed.
	pub observed_at: Option<OffsetDateTime>,
}
impl RateLimitState {
	/// Wait required before the next request at `now`.
	pub fn wait_at(&self, now: OffsetDateTime) -> Duration {
		match (self.remaining, self.reset_at) {
			(Some(0), Some(reset_at)) if now < reset_at => reset_at - now,
			_ => Duration::ZERO,
		}
	}

	/// Returns `true` when the minute window is known to be exhausted.
	pub fn is_exhausted(&self) -> bool {
		self.remaining == Some(0)
	}
}

/// Result of [`RateLimitTracker::reserve`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
	/// The request may proceed immediately.
	Allow,
	/// The request should be delayed.
	Delay(RetryDirective),
}

/// Advises callers when to retry after a [`RateLimitDecision::Delay`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryDirective {
	/// Instant when it is safe to retry.
	pub earliest_retry_at: OffsetDateTime,
	/// Suggested backoff duration.
	pub recommended_backoff: Duration,
	/// Optional descriptive string.
	pub reason: Option<String>,
}
impl RetryDirective {
	/// Creates a new directive with the provided timing metadata.
	pub fn new(earliest_retry_at: OffsetDateTime, recommended_backoff: Duration) -> Self {
		Self { earliest_retry_at, recommended_backoff, reason: None }
	}

	/// Adds a human-readable reason.
	pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
		self.reason = Some(reason.into());

		self
	}
}

/// Mutex-guarded quota state shared by every clone of a client.
#[derive(Debug, Default)]
pub struct RateLimitTracker {
	state: Mutex<RateLimitState>,
}
impl RateLimitTracker {
	/// Creates an empty tracker.
	pub fn new() -> Self {
		Self::default()
	}

	/// Updates the state from response headers, observed now.
	pub fn observe(&self, headers: &HeaderMap) {
		self.observe_at(headers, OffsetDateTime::now_utc());
	}

	/// Updates the state from response headers observed at `now`.
	///
	/// Headers that are absent or unparsable leave the previous value untouched.
	pub fn observe_at(&self, headers: &HeaderMap, now: OffsetDateTime) {
		let limit = header_u64(headers, LIMIT_MINUTE_HEADER);
		let remaining = header_u64(headers, REMAINING_MINUTE_HEADER);
		let daily_limit = header_u64(headers, LIMIT_DAILY_HEADER);
		let daily_remaining = header_u64(headers, REMAINING_DAILY_HEADER);
		let reset_at = header_timestamp(headers, RESET_HEADER);

		if limit.is_none()
			&& remaining.is_none()
			&& daily_limit.is_none()
			&& daily_remaining.is_none()
			&& reset_at.is_none()
		{
			return;
		}

		let mut state = self.state.lock();

		state.limit = limit.or(state.limit);
		state.remaining = remaining.or(state.remaining);
		state.reset_at = reset_at.or(state.reset_at);
		state.daily_limit = daily_limit.or(state.daily_limit);
		state.daily_remaining = daily_remaining.or(state.daily_remaining);
		state.observed_at = Some(now);
	}

	/// Wait required before the next request, measured against the wall clock.
	pub fn should_wait(&self) -> Duration {
		self.should_wait_at(OffsetDateTime::now_utc())
	}

	/// Wait required before the next request at `now`.
	///
	/// Non-zero only when the server reported zero remaining requests and the reset
	/// instant is still in the future.
	pub fn should_wait_at(&self, now: OffsetDateTime) -> Duration {
		self.state.lock().wait_at(now)
	}

	/// Decides whether a request may be sent now, measured against the wall clock.
	pub fn reserve(&self) -> RateLimitDecision {
		self.reserve_at(OffsetDateTime::now_utc())
	}

	/// Decides whether a request may be sent at `now` and claims one unit of quota if so.
	///
	/// A known positive remaining count is decremented locally; the next response
	/// overwrites it with the server's figure.
	pub fn reserve_at(&self, now: OffsetDateTime) -> RateLimitDecision {
		let mut state = self.state.lock();
		let wait = state.wait_at(now);

		if wait.is_positive() {
			let earliest = state.reset_at.unwrap_or(now + wait);

			return RateLimitDecision::Delay(
				RetryDirective::new(earliest, wait).with_reason("minute quota exhausted"),
			);
		}
		if let Some(remaining) = state.remaining.as_mut() {
			*remaining = remaining.saturating_sub(1);
		}

		RateLimitDecision::Allow
	}

	/// Returns a copy of the current state.
	pub fn snapshot(&self) -> RateLimitState {
		self.state.lock().clone()
	}
}

/// Parses a `Retry-After` header expressed in seconds or as an RFC 2822 date.
///
/// Dates in the past yield `None`.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	parse_retry_after_at(headers, OffsetDateTime::now_utc())
}

pub(crate) fn parse_retry_after_at(headers: &HeaderMap, now: OffsetDateTime) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u32>() {
		return Some(Duration::seconds(i64::from(secs)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - now;

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

pub(crate) fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
	headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

pub(crate) fn header_timestamp(headers: &HeaderMap, name: &str) -> Option<OffsetDateTime> {
	let secs = i64::try_from(header_u64(headers, name)?).ok()?;

	OffsetDateTime::from_unix_timestamp(secs).ok()
}
