// self
use crate::obs::{FlowKind, FlowOutcome};

/// Counter incremented once per recorded outcome.
pub const FLOW_COUNTER: &str = "microsoft_strategy_flow_total";

/// Records a flow outcome for `stage` via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, stage: &'static str, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		FLOW_COUNTER,
		"flow" => kind.as_str(),
		"stage" => stage,
		"outcome" => outcome.as_str()
	)
	.increment(1);

	#[cfg(not(feature = "metrics"))]
	let _ = (kind, stage, outcome);
}
