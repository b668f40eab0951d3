//! Hotel lookups and offer searches.
//!
//! Offer searches put every hotel id in the query string, so large cities can exceed the
//! provider's URI limit. [`Gateway::search_hotel_offers_batched`] caps the first attempt at
//! [`MAX_HOTELS_PER_REQUEST`] ids and retries once with [`REDUCED_HOTEL_BATCH`] ids when the
//! provider rejects the URI.

// self
use crate::{
	_prelude::*,
	gateway::{self, Gateway, flights},
	http::ApiHttpClient,
	oauth::TransportErrorMapper,
};

/// Hotel list endpoint.
pub const HOTELS_BY_CITY_PATH: &str = "/v1/reference-data/locations/hotels/by-city";
/// Hotel offer endpoint.
pub const HOTEL_OFFERS_PATH: &str = "/v3/shopping/hotel-offers";
/// Ids sent in the first offer request, and the page size of paginated searches.
pub const MAX_HOTELS_PER_REQUEST: usize = 50;
/// Ids sent when retrying after a URI-length rejection.
pub const REDUCED_HOTEL_BATCH: usize = 20;
/// Search radius around the city center, in kilometers.
pub const CITY_RADIUS_KM: u32 = 20;

/// Dates and occupancy of a hotel stay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StayParams {
	/// Check-in date, `YYYY-MM-DD`.
	pub check_in_date: String,
	/// Check-out date, `YYYY-MM-DD`.
	pub check_out_date: String,
	/// Adult guests.
	pub adults: u32,
}

/// Hotel search form input.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HotelSearchParams {
	/// City IATA code.
	pub city_code: String,
	/// Check-in date, `YYYY-MM-DD`.
	pub check_in_date: String,
	/// Check-out date, `YYYY-MM-DD`.
	pub check_out_date: String,
	/// Adult guests.
	#[serde(deserialize_with = "flights::loose_count")]
	pub adults: u32,
	/// One-based page for paginated searches.
	#[serde(deserialize_with = "flights::loose_count")]
	pub page: u32,
}
impl HotelSearchParams {
	/// Search in `city_code` for one adult.
	pub fn new(
		city_code: impl Into<String>,
		check_in_date: impl Into<String>,
		check_out_date: impl Into<String>,
	) -> Self {
		Self {
			city_code: city_code.into(),
			check_in_date: check_in_date.into(),
			check_out_date: check_out_date.into(),
			..Default::default()
		}
	}

	/// Validates the input, returning the trimmed city code and the stay.
	pub fn validate(&self) -> Result<(String, StayParams)> {
		let city_code = self.city_code.trim();
		let check_in = self.check_in_date.trim();
		let check_out = self.check_out_date.trim();

		if city_code.is_empty() || check_in.is_empty() || check_out.is_empty() {
			return Err(Error::invalid_input("Missing required search fields"));
		}

		let stay = StayParams {
			check_in_date: flights::parse_date(check_in)?,
			check_out_date: flights::parse_date(check_out)?,
			adults: self.adults.max(1),
		};

		Ok((city_code.to_owned(), stay))
	}
}
impl Default for HotelSearchParams {
	fn default() -> Self {
		Self {
			city_code: String::new(),
			check_in_date: String::new(),
			check_out_date: String::new(),
			adults: 1,
			page: 1,
		}
	}
}

/// Offers returned by a batched search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchedOffers {
	/// Offer entries from the provider's `data` array.
	pub offers: Vec<Value>,
	/// Number of hotel ids in the request that succeeded.
	pub hotels_searched: usize,
}

impl<C, M> Gateway<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Lists the ids of hotels within [`CITY_RADIUS_KM`] of `city_code`.
	pub async fn hotel_ids_by_city(&self, city_code: &str) -> Result<Vec<String>> {
		let city_code = city_code.trim();

		if city_code.is_empty() {
			return Err(Error::invalid_input("City code is required"));
		}

		let response = self
			.get(
				HOTELS_BY_CITY_PATH,
				&[
					("cityCode", city_code.to_owned()),
					("radius", CITY_RADIUS_KM.to_string()),
					("radiusUnit", "KM".to_owned()),
				],
			)
			.await?;
		let ids = gateway::data_items(response)
			.iter()
			.filter_map(|hotel| hotel.get("hotelId").and_then(Value::as_str))
			.map(str::to_owned)
			.collect();

		Ok(ids)
	}

	/// Searches offers for exactly the given hotel ids.
	pub async fn search_hotel_offers(
		&self,
		hotel_ids: &[String],
		stay: &StayParams,
	) -> Result<Value> {
		if hotel_ids.is_empty() || stay.check_in_date.is_empty() || stay.check_out_date.is_empty() {
			return Err(Error::invalid_input(
				"Hotel ids, check-in date, and check-out date are required",
			));
		}

		self.get(
			HOTEL_OFFERS_PATH,
			&[
				("hotelIds", hotel_ids.join(",")),
				("checkInDate", stay.check_in_date.clone()),
				("checkOutDate", stay.check_out_date.clone()),
				("adults", stay.adults.to_string()),
				("paymentPolicy", "NONE".to_owned()),
				("bestRateOnly", "true".to_owned()),
				("view", "FULL".to_owned()),
			],
		)
		.await
	}

	/// Searches offers for at most [`MAX_HOTELS_PER_REQUEST`] of `hotel_ids`.
	///
	/// A URI-length rejection triggers exactly one retry with the first
	/// [`REDUCED_HOTEL_BATCH`] ids; any other failure, or a second failure, is returned as is.
	pub async fn search_hotel_offers_batched(
		&self,
		hotel_ids: &[String],
		stay: &StayParams,
	) -> Result<BatchedOffers> {
		let batch = &hotel_ids[..hotel_ids.len().min(MAX_HOTELS_PER_REQUEST)];

		tracing::debug!(
			total = hotel_ids.len(),
			batch = batch.len(),
			"Searching hotel offers for the first batch."
		);

		let (response, searched) = match self.search_hotel_offers(batch, stay).await {
			Ok(response) => (response, batch.len()),
			Err(e) if e.is_uri_too_long() => {
				let reduced = &batch[..batch.len().min(REDUCED_HOTEL_BATCH)];

				tracing::warn!(
					batch = reduced.len(),
					"Hotel offer URI was too long; retrying with a smaller batch."
				);

				(self.search_hotel_offers(reduced, stay).await?, reduced.len())
			},
			Err(e) => return Err(e),
		};

		Ok(BatchedOffers { offers: gateway::data_items(response), hotels_searched: searched })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn validate_requires_city_and_dates() {
		let missing = HotelSearchParams::new("PAR", "2025-12-01", " ").validate();

		assert!(matches!(missing, Err(Error::InvalidInput { .. })));

		let (city, stay) = HotelSearchParams::new(" PAR ", "2025-12-01", "2025-12-03")
			.validate()
			.expect("Complete params should validate.");

		assert_eq!(city, "PAR");
		assert_eq!(stay.adults, 1);
		assert_eq!(stay.check_out_date, "2025-12-03");
	}

	#[test]
	fn form_input_defaults_to_first_page() {
		let params: HotelSearchParams = serde_json::from_value(json!({
			"cityCode": "LON",
			"checkInDate": "2025-12-01",
			"checkOutDate": "2025-12-02",
			"adults": "3"
		}))
		.expect("Form input should decode.");

		assert_eq!(params.page, 1);
		assert_eq!(params.adults, 3);
	}
}
