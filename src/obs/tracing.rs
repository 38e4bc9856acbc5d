// self
use crate::{
	_prelude::*,
	obs::{FlowKind, FlowOutcome, record_flow_outcome},
};

/// One observed strategy step: a `microsoft_strategy.flow` span (with `tracing`) plus the
/// outcome counter (with `metrics`). Both halves compile away when their feature is off.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	kind: FlowKind,
	stage: &'static str,
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Opens a span for `kind` at `stage` (`redirect`, `token`, `graph`, ...).
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		Self {
			kind,
			stage,
			#[cfg(feature = "tracing")]
			span: tracing::info_span!("microsoft_strategy.flow", flow = kind.as_str(), stage),
		}
	}

	/// Flow kind of the span.
	pub fn kind(&self) -> FlowKind {
		self.kind
	}

	/// Stage label of the span.
	pub fn stage(&self) -> &'static str {
		self.stage
	}

	/// Records `outcome` against this span's flow and stage.
	pub fn record(&self, outcome: FlowOutcome) {
		record_flow_outcome(self.kind, self.stage, outcome);
	}

	/// Runs an infallible synchronous step inside the span.
	pub fn observe_sync<T>(&self, step: impl FnOnce() -> T) -> T {
		#[cfg(feature = "tracing")]
		let _entered = self.span.enter();

		self.record(FlowOutcome::Attempt);

		let value = step();

		self.record(FlowOutcome::Success);

		value
	}

	/// Awaits `fut` inside the span and records the attempt and its outcome.
	pub async fn observe<T, Fut>(&self, fut: Fut) -> Result<T>
	where
		Fut: Future<Output = Result<T>>,
	{
		self.record(FlowOutcome::Attempt);

		#[cfg(feature = "tracing")]
		let result = tracing::Instrument::instrument(fut, self.span.clone()).await;
		#[cfg(not(feature = "tracing"))]
		let result = fut.await;

		self.finish(&result);

		result
	}

	fn finish<T>(&self, result: &Result<T>) {
		#[cfg(feature = "tracing")]
		if let Err(err) = result {
			self.span.in_scope(|| tracing::warn!(error = %err, "strategy step failed"));
		}

		self.record(FlowOutcome::of(result));
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn sync_step_passes_result_through() {
		let span = FlowSpan::new(FlowKind::Authorization, "redirect");
		let value = span.observe_sync(|| 7);

		assert_eq!(value, 7);
		assert_eq!(span.stage(), "redirect");
	}

	#[tokio::test]
	async fn async_step_passes_errors_through() {
		let span = FlowSpan::new(FlowKind::ProfileFetch, "graph");
		let err = span
			.observe(async { Err::<(), _>(Error::authorization("invalid_state", "mismatch")) })
			.await
			.expect_err("Failure should propagate.");

		assert!(matches!(err, Error::Authorization { .. }));
		assert_eq!(span.kind(), FlowKind::ProfileFetch);
	}
}
