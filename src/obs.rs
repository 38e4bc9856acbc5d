//! Optional observability helpers for strategy flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `microsoft_strategy.flow` with the `flow`
//!   and `stage` fields.
//! - Enable `metrics` to increment the `microsoft_strategy_flow_total` counter for every
//!   attempt, success, and failure, labeled by `flow`, `stage`, and `outcome`.
//!
//! Strategy code goes through [`FlowSpan::observe`] or [`FlowSpan::observe_sync`] so both
//! signals stay in step.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Strategy flows observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Building the authorize redirect.
	Authorization,
	/// Exchanging the authorization code at the token endpoint.
	CodeExchange,
	/// Fetching and normalizing the user profile.
	ProfileFetch,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Authorization => "authorization",
			FlowKind::CodeExchange => "code_exchange",
			FlowKind::ProfileFetch => "profile_fetch",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome label of a recorded step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// The step started.
	Attempt,
	/// The step returned `Ok`.
	Success,
	/// The step returned `Err`.
	Failure,
}
impl FlowOutcome {
	/// Metric label of the outcome.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}

	/// Maps a result onto its terminal outcome.
	pub fn of<T, E>(result: &std::result::Result<T, E>) -> Self {
		match result {
			Ok(_) => FlowOutcome::Success,
			Err(_) => FlowOutcome::Failure,
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
