//! Flight-offer search payloads.
//!
//! [`FlightSearchParams`] is the loosely typed form input; [`FlightSearchParams::to_request`]
//! validates it and builds the nested [`FlightOfferRequest`] the provider expects.

// crates.io
use serde::Deserializer;
use time::{Date, macros::format_description};
// self
use crate::{
	_prelude::*,
	gateway::Gateway,
	http::ApiHttpClient,
	oauth::TransportErrorMapper,
};

/// Flight-offer search endpoint.
pub const FLIGHT_OFFERS_PATH: &str = "/v2/shopping/flight-offers";
/// Booking source requested for every search.
pub const DEFAULT_SOURCE: &str = "GDS";
/// Most seated travelers (adults and children) one search may carry.
pub const MAX_SEATED_TRAVELERS: u32 = 9;

/// Cabin requested for the whole trip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TravelClass {
	/// Economy cabin.
	#[default]
	Economy,
	/// Premium economy cabin.
	PremiumEconomy,
	/// Business cabin.
	Business,
	/// First cabin.
	First,
}
impl TravelClass {
	/// Provider label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Economy => "ECONOMY",
			Self::PremiumEconomy => "PREMIUM_ECONOMY",
			Self::Business => "BUSINESS",
			Self::First => "FIRST",
		}
	}
}
impl FromStr for TravelClass {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		match s.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
			"" | "ECONOMY" => Ok(Self::Economy),
			"PREMIUM_ECONOMY" => Ok(Self::PremiumEconomy),
			"BUSINESS" => Ok(Self::Business),
			"FIRST" => Ok(Self::First),
			other => Err(Error::invalid_input(format!("Unknown travel class {other}"))),
		}
	}
}

/// Flight search form input.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlightSearchParams {
	/// Origin IATA code.
	pub origin_location_code: String,
	/// Destination IATA code.
	pub destination_location_code: String,
	/// Outbound date, `YYYY-MM-DD`.
	pub departure_date: String,
	/// Return date for round trips.
	pub return_date: Option<String>,
	/// Adult travelers.
	#[serde(deserialize_with = "loose_count")]
	pub adults: u32,
	/// Child travelers.
	#[serde(deserialize_with = "loose_count")]
	pub children: u32,
	/// Infants held on an adult's lap.
	#[serde(deserialize_with = "loose_count")]
	pub infants: u32,
	/// Requested cabin, case-insensitive.
	pub travel_class: Option<String>,
	/// Restricts results to direct flights.
	#[serde(deserialize_with = "loose_flag")]
	pub non_stop: bool,
}
impl FlightSearchParams {
	/// One-way search for a single adult.
	pub fn one_way(
		origin: impl Into<String>,
		destination: impl Into<String>,
		departure_date: impl Into<String>,
	) -> Self {
		Self {
			origin_location_code: origin.into(),
			destination_location_code: destination.into(),
			departure_date: departure_date.into(),
			..Default::default()
		}
	}

	/// Adds a return leg.
	pub fn with_return(mut self, return_date: impl Into<String>) -> Self {
		self.return_date = Some(return_date.into());

		self
	}

	/// Sets the traveler counts.
	pub fn with_travelers(mut self, adults: u32, children: u32, infants: u32) -> Self {
		self.adults = adults;
		self.children = children;
		self.infants = infants;

		self
	}

	/// Validates the input and builds the provider payload.
	pub fn to_request(
		&self,
		currency_code: &str,
		max_flight_offers: u32,
	) -> Result<FlightOfferRequest> {
		let origin = self.origin_location_code.trim();
		let destination = self.destination_location_code.trim();
		let departure = self.departure_date.trim();

		if origin.is_empty() || destination.is_empty() || departure.is_empty() {
			return Err(Error::invalid_input(
				"Missing required search fields (origin, destination, departure date)",
			));
		}

		let mut origin_destinations =
			vec![OriginDestination::new("1", origin, destination, parse_date(departure)?)];

		let return_date =
			self.return_date.as_deref().map(str::trim).filter(|date| !date.is_empty());

		if let Some(return_date) = return_date {
			origin_destinations.push(OriginDestination::new(
				"2",
				destination,
				origin,
				parse_date(return_date)?,
			));
		}

		let cabin = self.travel_class.as_deref().unwrap_or_default().parse::<TravelClass>()?;
		let origin_destination_ids = origin_destinations.iter().map(|leg| leg.id.clone()).collect();
		let connection_restriction =
			self.non_stop.then_some(ConnectionRestriction { max_number_of_connections: 0 });

		Ok(FlightOfferRequest {
			currency_code: currency_code.to_owned(),
			origin_destinations,
			travelers: build_travelers(self.adults, self.children, self.infants)?,
			sources: vec![DEFAULT_SOURCE.to_owned()],
			search_criteria: SearchCriteria {
				max_flight_offers,
				flight_filters: FlightFilters {
					cabin_restrictions: vec![CabinRestriction {
						cabin,
						coverage: Coverage::MostSegments,
						origin_destination_ids,
					}],
					connection_restriction,
				},
			},
		})
	}
}
impl Default for FlightSearchParams {
	fn default() -> Self {
		Self {
			origin_location_code: String::new(),
			destination_location_code: String::new(),
			departure_date: String::new(),
			return_date: None,
			adults: 1,
			children: 0,
			infants: 0,
			travel_class: None,
			non_stop: false,
		}
	}
}

/// Flight-offer search body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightOfferRequest {
	/// ISO 4217 currency for prices.
	pub currency_code: String,
	/// Outbound leg `"1"` and optional return leg `"2"`.
	pub origin_destinations: Vec<OriginDestination>,
	/// Traveler list.
	pub travelers: Vec<Traveler>,
	/// Booking sources.
	pub sources: Vec<String>,
	/// Result limits and filters.
	pub search_criteria: SearchCriteria,
}

/// One leg of the requested journey.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginDestination {
	/// Leg id.
	pub id: String,
	/// Origin IATA code.
	pub origin_location_code: String,
	/// Destination IATA code.
	pub destination_location_code: String,
	/// Departure date window.
	pub departure_date_time_range: DateTimeRange,
}
impl OriginDestination {
	fn new(id: &str, origin: &str, destination: &str, date: String) -> Self {
		Self {
			id: id.to_owned(),
			origin_location_code: origin.to_owned(),
			destination_location_code: destination.to_owned(),
			departure_date_time_range: DateTimeRange { date },
		}
	}
}

/// Departure date window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateTimeRange {
	/// Date, `YYYY-MM-DD`.
	pub date: String,
}

/// Traveler category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TravelerType {
	/// Adult.
	Adult,
	/// Child.
	Child,
	/// Infant without a seat.
	HeldInfant,
}

/// Traveler entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Traveler {
	/// Sequential id starting at `"1"`.
	pub id: String,
	/// Category.
	pub traveler_type: TravelerType,
	/// Adult holding this infant.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub associated_adult_id: Option<String>,
}

/// Result limits and filters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
	/// Upper bound on returned offers.
	pub max_flight_offers: u32,
	/// Cabin and connection filters.
	pub flight_filters: FlightFilters,
}

/// Cabin and connection filters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightFilters {
	/// Cabin restrictions.
	pub cabin_restrictions: Vec<CabinRestriction>,
	/// Connection limit, present for direct-only searches.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub connection_restriction: Option<ConnectionRestriction>,
}

/// Cabin applied to a set of legs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CabinRestriction {
	/// Requested cabin.
	pub cabin: TravelClass,
	/// How many segments must match.
	pub coverage: Coverage,
	/// Leg ids the restriction covers.
	pub origin_destination_ids: Vec<String>,
}

/// Segment coverage of a cabin restriction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Coverage {
	/// Most segments of each leg.
	MostSegments,
	/// At least one segment.
	AtLeastOneSegment,
	/// Every segment.
	AllSegments,
}

/// Connection limit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRestriction {
	/// Maximum connections per leg.
	pub max_number_of_connections: u32,
}

impl<C, M> Gateway<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Posts a flight-offer search.
	///
	/// Fills `currencyCode`, `searchCriteria.maxFlightOffers`, and `sources` from the settings
	/// when the criteria leave them out.
	pub async fn search_flight_offers(&self, mut criteria: Value) -> Result<Value> {
		let Some(fields) = criteria.as_object_mut() else {
			return Err(Error::invalid_input("Search criteria must be a JSON object"));
		};

		if fields.is_empty() {
			return Err(Error::invalid_input("Search criteria cannot be empty"));
		}

		fields
			.entry("currencyCode")
			.or_insert_with(|| Value::String(self.settings.currency_code.clone()));
		fields.entry("sources").or_insert_with(|| json!([DEFAULT_SOURCE]));

		let search_criteria = fields.entry("searchCriteria").or_insert_with(|| json!({}));

		if let Some(search_criteria) = search_criteria.as_object_mut() {
			search_criteria
				.entry("maxFlightOffers")
				.or_insert_with(|| json!(self.settings.max_flight_offers));
		}

		self.post(FLIGHT_OFFERS_PATH, &criteria).await
	}
}

/// Builds the traveler list.
///
/// Adults come first, then children, then held infants. The n-th infant is held by the n-th
/// adult; infants beyond the adult count are held by the last adult. No travelers at all
/// yields a single adult. More than [`MAX_SEATED_TRAVELERS`] seats, more infants than that,
/// or infants without any adult are invalid input.
pub fn build_travelers(adults: u32, children: u32, infants: u32) -> Result<Vec<Traveler>> {
	if adults.saturating_add(children) > MAX_SEATED_TRAVELERS {
		return Err(Error::invalid_input(format!(
			"At most {MAX_SEATED_TRAVELERS} adults and children can travel together"
		)));
	}
	if infants > MAX_SEATED_TRAVELERS {
		return Err(Error::invalid_input(format!(
			"At most {MAX_SEATED_TRAVELERS} infants can travel together"
		)));
	}
	if infants > 0 && adults == 0 {
		return Err(Error::invalid_input("Infants require an adult"));
	}

	let mut travelers = Vec::new();
	let mut adult_ids = Vec::new();
	let mut next_id = 1_u32;
	let mut push = |traveler_type, associated_adult_id| {
		let id = next_id.to_string();

		next_id += 1;
		travelers.push(Traveler { id: id.clone(), traveler_type, associated_adult_id });

		id
	};

	for _ in 0..adults {
		adult_ids.push(push(TravelerType::Adult, None));
	}
	for _ in 0..children {
		push(TravelerType::Child, None);
	}
	for i in 0..infants as usize {
		let holder = adult_ids.get(i).or_else(|| adult_ids.last()).cloned();

		push(TravelerType::HeldInfant, holder);
	}

	if travelers.is_empty() {
		travelers.push(Traveler {
			id: "1".into(),
			traveler_type: TravelerType::Adult,
			associated_adult_id: None,
		});
	}

	Ok(travelers)
}

pub(crate) fn parse_date(raw: &str) -> Result<String> {
	Date::parse(raw, format_description!("[year]-[month]-[day]"))
		.map(|_| raw.to_owned())
		.map_err(|_| Error::invalid_input(format!("Invalid date {raw}; expected YYYY-MM-DD")))
}

/// Accepts counts sent as numbers or numeric strings; anything else counts as zero.
pub(crate) fn loose_count<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(match Value::deserialize(deserializer)? {
		Value::Number(n) => n.as_u64().map_or(0, |n| u32::try_from(n).unwrap_or(u32::MAX)),
		Value::String(s) => s.trim().parse().unwrap_or(0),
		_ => 0,
	})
}

/// Accepts `true`, `"true"`, `1`, and `"1"` as set.
fn loose_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(match Value::deserialize(deserializer)? {
		Value::Bool(b) => b,
		Value::Number(n) => n.as_u64() == Some(1),
		Value::String(s) => matches!(s.trim(), "true" | "1"),
		_ => false,
	})
}
