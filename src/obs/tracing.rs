// self
use crate::{_prelude::*, obs::CallKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// A span wrapping one logical client call (all of its attempts).
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Creates a new span tagged with the provided call kind + endpoint path.
	pub fn new(kind: CallKind, path: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("rencom.call", kind = kind.as_str(), path);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, path);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a warning before a failed attempt is retried.
pub fn log_retry(attempt: u32, delay: Duration, error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			attempt,
			delay_ms = delay.whole_milliseconds() as u64,
			%error,
			"Retrying request."
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (attempt, delay, error);
	}
}

/// Emits a warning when the client holds a request back until the quota window resets.
pub fn log_quota_wait(delay: Duration) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			delay_ms = delay.whole_milliseconds() as u64,
			"Waiting for the rate-limit window to reset."
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = delay;
	}
}
