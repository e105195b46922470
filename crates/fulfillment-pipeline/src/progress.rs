//! Progress observation side-channel.

use fulfillment_types::OrderProcessingState;

/// Observer notified with every state the pipeline reaches, the initial
/// input included.
///
/// Observation is fire-and-forget: the signature is infallible, the call is
/// synchronous, and the pipeline ignores whatever the sink does with the
/// snapshot. A sink can never alter the pipeline outcome.
pub trait ProgressSink: Send + Sync {
	fn observe(&self, state: &OrderProcessingState);
}

impl<F> ProgressSink for F
where
	F: Fn(&OrderProcessingState) + Send + Sync,
{
	fn observe(&self, state: &OrderProcessingState) {
		self(state)
	}
}

/// Sink that drops every snapshot, for callers that want the progress entry
/// point without an observer.
pub fn noop_sink() -> impl ProgressSink {
	|_: &OrderProcessingState| {}
}
