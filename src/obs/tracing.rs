// crates.io
use tracing::{Span, instrument::Instrumented};
// self
use crate::{_prelude::*, obs::ActionKind};

/// A span builder used by travel desk actions.
#[derive(Clone, Debug)]
pub struct ActionSpan {
	span: Span,
}
impl ActionSpan {
	/// Creates a new span tagged with the provided action + stage.
	pub fn new(kind: ActionKind, stage: &'static str) -> Self {
		Self { span: tracing::info_span!("travel_desk.action", action = kind.as_str(), stage) }
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		use tracing::Instrument;

		fut.instrument(self.span.clone())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = ActionSpan::new(ActionKind::SearchFlights, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
