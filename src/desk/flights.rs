//! Flight autocomplete, search, and selection actions.

// self
use crate::{
	_prelude::*,
	desk::{RequestContext, TravelDesk, parse_offer},
	error::ConfigError,
	gateway::{self, FlightSearchParams, Location, SearchOutcome},
	http::ApiHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, ActionKind},
	rate_limit::{FLIGHT_SEARCH, LOCATION_SEARCH},
	relay,
};

const MIN_LOCATION_KEYWORD: usize = 3;

/// Autocomplete entry for the airport and city pickers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSuggestion {
	/// Display text, `Name (IATA), City`.
	pub label: String,
	/// IATA code submitted by the picker.
	pub value: Option<String>,
	/// Location name.
	pub name: Option<String>,
	/// IATA code.
	pub iata_code: Option<String>,
	/// `AIRPORT` or `CITY`.
	pub sub_type: Option<String>,
	/// Raw provider entry.
	pub full_data: Value,
}
impl LocationSuggestion {
	/// Builds a suggestion from a raw location entry.
	pub fn from_entry(entry: Value) -> Self {
		let location = Location::from_value(&entry);
		let mut label = location.name.clone().unwrap_or_default();

		if let Some(code) = &location.iata_code {
			label.push_str(&format!(" ({code})"));
		}
		if let Some(city) = location.city_name() {
			label.push_str(&format!(", {city}"));
		}

		Self {
			label,
			value: location.iata_code.clone(),
			name: location.name,
			iata_code: location.iata_code,
			sub_type: location.sub_type,
			full_data: entry,
		}
	}
}

/// Result of [`TravelDesk::select_flight`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightSelection {
	/// Booking page the browser should navigate to.
	pub redirect_url: Url,
	/// Stored offer, including the resolved location names.
	pub offer: Value,
}

impl<C, M> TravelDesk<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Suggests airports and cities for a keyword of at least three characters.
	pub async fn search_locations(
		&self,
		ctx: &RequestContext,
		keyword: &str,
	) -> Result<SearchOutcome<Vec<LocationSuggestion>>> {
		obs::observe(ActionKind::SearchLocations, "handle", async {
			self.verify(ctx)?;
			self.throttle(ctx, LOCATION_SEARCH).await?;

			let keyword = keyword.trim();

			if keyword.chars().count() < MIN_LOCATION_KEYWORD {
				return Err(Error::invalid_input(format!(
					"Search term must be at least {MIN_LOCATION_KEYWORD} characters"
				)));
			}

			let entries = gateway::data_items(self.gateway.search_locations(keyword).await?);

			Ok(SearchOutcome::from_items(entries)
				.map(|entries| entries.into_iter().map(LocationSuggestion::from_entry).collect()))
		})
		.await
	}

	/// Runs a flight-offer search built from the form input.
	///
	/// Found searches carry the whole provider response, so `dictionaries` (carrier and
	/// aircraft names) and `meta` reach the results page alongside `data`.
	pub async fn search_flights(
		&self,
		ctx: &RequestContext,
		params: &FlightSearchParams,
	) -> Result<SearchOutcome<Value>> {
		obs::observe(ActionKind::SearchFlights, "handle", async {
			self.verify(ctx)?;
			self.throttle(ctx, FLIGHT_SEARCH).await?;

			let settings = self.settings();
			let request = params.to_request(&settings.currency_code, settings.max_flight_offers)?;
			let criteria = serde_json::to_value(&request).map_err(ConfigError::EncodeBody)?;
			let response = self.gateway.search_flight_offers(criteria).await?;

			let has_offers = response
				.get("data")
				.and_then(Value::as_array)
				.is_some_and(|offers| !offers.is_empty());

			Ok(if has_offers { SearchOutcome::Found(response) } else { SearchOutcome::NoResults })
		})
		.await
	}

	/// Stores the chosen offer for the booking page and returns where to redirect.
	///
	/// The offer is stored before the booking page URL is checked, so a misconfigured site
	/// still leaves the selection available for retrieval.
	pub async fn select_flight(
		&self,
		ctx: &RequestContext,
		offer_json: &str,
	) -> Result<FlightSelection> {
		obs::observe(ActionKind::SelectFlight, "handle", async {
			self.verify(ctx)?;

			let mut offer = parse_offer(offer_json, "flight")?;

			relay::augment_flight_offer(&self.gateway, &mut offer).await;
			self.flights.store(&ctx.identity, offer.clone()).await?;

			let redirect_url =
				self.settings().booking_page_url.clone().ok_or(ConfigError::MissingBookingPage)?;

			Ok(FlightSelection { redirect_url, offer })
		})
		.await
	}
}
