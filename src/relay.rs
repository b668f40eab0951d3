//! Hands a selected offer across the redirect to the booking page.
//!
//! The selection is stored under the caller's [`ClientIdentity`] for one hour. The redirect
//! target reads it with [`SelectionRelay::retrieve`] and deletes it with
//! [`SelectionRelay::clear`] once consumed; a newer selection overwrites an older one.

// self
use crate::{
	_prelude::*,
	gateway::Gateway,
	http::ApiHttpClient,
	identity::ClientIdentity,
	oauth::TransportErrorMapper,
	store::TtlStore,
};

/// Lifetime of a stored selection.
pub const SELECTION_TTL: Duration = Duration::hours(1);

/// Kind of offer a relay carries; each kind has its own key space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionKind {
	/// Flight offer.
	Flight,
	/// Hotel offer.
	Hotel,
}
impl SelectionKind {
	/// Store key prefix.
	pub const fn prefix(self) -> &'static str {
		match self {
			Self::Flight => "travel_desk:selected_flight:",
			Self::Hotel => "travel_desk:selected_hotel:",
		}
	}

	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Flight => "flight",
			Self::Hotel => "hotel",
		}
	}
}
impl Display for SelectionKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// TTL-backed store of one selection per identity.
#[derive(Clone)]
pub struct SelectionRelay {
	store: Arc<dyn TtlStore>,
	kind: SelectionKind,
}
impl SelectionRelay {
	/// Creates a relay for `kind` over `store`.
	pub fn new(store: Arc<dyn TtlStore>, kind: SelectionKind) -> Self {
		Self { store, kind }
	}

	/// Relay for flight selections.
	pub fn flights(store: Arc<dyn TtlStore>) -> Self {
		Self::new(store, SelectionKind::Flight)
	}

	/// Relay for hotel selections.
	pub fn hotels(store: Arc<dyn TtlStore>) -> Self {
		Self::new(store, SelectionKind::Hotel)
	}

	/// Kind carried by this relay.
	pub fn kind(&self) -> SelectionKind {
		self.kind
	}

	/// Store key for `identity`.
	pub fn key(&self, identity: &ClientIdentity) -> String {
		format!("{}{identity}", self.kind.prefix())
	}

	/// Stores `payload`, replacing any previous selection and restarting the TTL.
	pub async fn store(&self, identity: &ClientIdentity, payload: Value) -> Result<()> {
		let key = self.key(identity);

		self.store.set(&key, payload, SELECTION_TTL).await?;

		tracing::debug!(kind = self.kind.as_str(), "Stored selection.");

		Ok(())
	}

	/// Returns the live selection without removing it.
	pub async fn retrieve(&self, identity: &ClientIdentity) -> Result<Option<Value>> {
		Ok(self.store.get(&self.key(identity)).await?)
	}

	/// Removes the selection, returning `true` if one was live.
	pub async fn clear(&self, identity: &ClientIdentity) -> Result<bool> {
		Ok(self.store.delete(&self.key(identity)).await?)
	}
}
impl Debug for SelectionRelay {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SelectionRelay").field("kind", &self.kind).finish()
	}
}

/// Origin and destination codes of a flight offer's outbound itinerary.
///
/// The origin is the first segment's departure; the destination is the last segment's arrival.
pub fn outbound_endpoints(offer: &Value) -> Option<(String, String)> {
	let segments = offer.pointer("/itineraries/0/segments")?.as_array()?;
	let origin = segments.first()?.pointer("/departure/iataCode")?.as_str()?;
	let destination = segments.last()?.pointer("/arrival/iataCode")?.as_str()?;

	Some((origin.to_owned(), destination.to_owned()))
}

/// Adds `originLocationName` and `destinationLocationName` to a flight offer.
///
/// Names are resolved through the location search by exact code; unresolved codes are used
/// as their own names. Offers without an outbound segment are left untouched.
pub async fn augment_flight_offer<C, M>(gateway: &Gateway<C, M>, offer: &mut Value)
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let Some((origin, destination)) = outbound_endpoints(offer) else {
		return;
	};
	let origin_name = gateway.resolve_location_name(&origin).await;
	let destination_name = gateway.resolve_location_name(&destination).await;

	if let Some(fields) = offer.as_object_mut() {
		fields.insert("originLocationName".into(), Value::String(origin_name));
		fields.insert("destinationLocationName".into(), Value::String(destination_name));
	}
}
