//! Observability helpers for travel desk actions.
//!
//! Every action runs inside a `travel_desk.action` span carrying the `action` and `stage`
//! fields. Enable the `metrics` feature to increment the `travel_desk_action_total` counter
//! for every attempt/success/failure, labeled by `action` + `outcome`.

mod metrics;
mod tracing;

pub use self::metrics::*;
pub use self::tracing::*;

// self
use crate::_prelude::*;

/// Actions exposed by the travel desk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
	/// Airport and city autocomplete.
	SearchLocations,
	/// Flight-offer search.
	SearchFlights,
	/// Flight selection hand-off.
	SelectFlight,
	/// Removal of a stored selection.
	ClearSelection,
	/// Read of a stored selection by the redirect target.
	RetrieveSelection,
	/// Hotel city autocomplete.
	SearchHotelLocations,
	/// Hotel-offer search.
	SearchHotels,
	/// Paginated hotel-offer search.
	SearchHotelsPage,
	/// Hotel selection hand-off.
	SelectHotel,
}
impl ActionKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ActionKind::SearchLocations => "search_locations",
			ActionKind::SearchFlights => "search_flights",
			ActionKind::SelectFlight => "select_flight",
			ActionKind::ClearSelection => "clear_selection",
			ActionKind::RetrieveSelection => "retrieve_selection",
			ActionKind::SearchHotelLocations => "search_hotel_locations",
			ActionKind::SearchHotels => "search_hotels",
			ActionKind::SearchHotelsPage => "search_hotels_page",
			ActionKind::SelectHotel => "select_hotel",
		}
	}
}
impl Display for ActionKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionOutcome {
	/// Entry to an action.
	Attempt,
	/// Successful completion, including searches without results.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl ActionOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ActionOutcome::Attempt => "attempt",
			ActionOutcome::Success => "success",
			ActionOutcome::Failure => "failure",
		}
	}
}
impl Display for ActionOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside an action span and records its outcome.
pub async fn observe<T, F>(kind: ActionKind, stage: &'static str, fut: F) -> Result<T>
where
	F: Future<Output = Result<T>>,
{
	let span = ActionSpan::new(kind, stage);

	record_action_outcome(kind, ActionOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => record_action_outcome(kind, ActionOutcome::Success),
		Err(e) => {
			::tracing::info!(action = kind.as_str(), error = %e, "Action failed.");

			record_action_outcome(kind, ActionOutcome::Failure);
		},
	}

	result
}
