//! Airport and city lookups.

// self
use crate::{
	_prelude::*,
	gateway::{self, Gateway},
	http::ApiHttpClient,
	oauth::TransportErrorMapper,
};

/// Location search endpoint.
pub const LOCATIONS_PATH: &str = "/v1/reference-data/locations";
/// Sub-types queried by the flight location search.
pub const AIRPORT_AND_CITY: &str = "AIRPORT,CITY";
/// Sub-type queried by the hotel city search.
pub const CITY: &str = "CITY";

const PAGE_LIMIT: &str = "10";

/// Fields of a location entry used for suggestions and name resolution.
///
/// Every field is optional; the provider omits some of them for certain sub-types.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Location {
	/// Display name, usually upper-case.
	pub name: Option<String>,
	/// IATA code.
	pub iata_code: Option<String>,
	/// `AIRPORT` or `CITY`.
	pub sub_type: Option<String>,
	/// Postal details.
	pub address: Option<LocationAddress>,
}
impl Location {
	/// Reads the known fields out of a raw entry, ignoring entries of an unexpected shape.
	pub fn from_value(value: &Value) -> Self {
		Self::deserialize(value).unwrap_or_default()
	}

	/// City name from the address, if present.
	pub fn city_name(&self) -> Option<&str> {
		self.address.as_ref().and_then(|address| address.city_name.as_deref())
	}

	/// Country code from the address, if present.
	pub fn country_code(&self) -> Option<&str> {
		self.address.as_ref().and_then(|address| address.country_code.as_deref())
	}
}

/// Address block of a [`Location`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LocationAddress {
	/// City name.
	pub city_name: Option<String>,
	/// ISO country code.
	pub country_code: Option<String>,
}

impl<C, M> Gateway<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Searches airports and cities matching `keyword`.
	pub async fn search_locations(&self, keyword: &str) -> Result<Value> {
		self.location_query(keyword, AIRPORT_AND_CITY).await
	}

	/// Searches cities matching `keyword`.
	pub async fn search_hotel_cities(&self, keyword: &str) -> Result<Value> {
		self.location_query(keyword, CITY).await
	}

	/// Resolves a display name for `code` by exact IATA match.
	///
	/// Falls back to `code` itself when nothing matches or the lookup fails.
	pub async fn resolve_location_name(&self, code: &str) -> String {
		match self.search_locations(code).await {
			Ok(response) => gateway::data_items(response)
				.iter()
				.map(Location::from_value)
				.find(|location| location.iata_code.as_deref() == Some(code))
				.and_then(|location| location.name)
				.unwrap_or_else(|| code.to_owned()),
			Err(e) => {
				tracing::warn!(code, error = %e, "Location lookup failed; using the raw code.");

				code.to_owned()
			},
		}
	}

	async fn location_query(&self, keyword: &str, sub_type: &str) -> Result<Value> {
		let keyword = keyword.trim();

		if keyword.is_empty() {
			return Err(Error::invalid_input("Search keyword cannot be empty"));
		}

		self.get(
			LOCATIONS_PATH,
			&[
				("subType", sub_type.to_owned()),
				("keyword", keyword.to_uppercase()),
				("page[limit]", PAGE_LIMIT.to_owned()),
			],
		)
		.await
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn location_tolerates_partial_entries() {
		let full = Location::from_value(&json!({
			"type": "location",
			"subType": "AIRPORT",
			"name": "JOHN F KENNEDY INTL",
			"iataCode": "JFK",
			"address": { "cityName": "NEW YORK", "countryCode": "US" }
		}));

		assert_eq!(full.iata_code.as_deref(), Some("JFK"));
		assert_eq!(full.city_name(), Some("NEW YORK"));
		assert_eq!(full.country_code(), Some("US"));

		let partial = Location::from_value(&json!({ "name": "PARIS", "address": null }));

		assert_eq!(partial.name.as_deref(), Some("PARIS"));
		assert_eq!(partial.city_name(), None);
		assert_eq!(Location::from_value(&json!("garbage")), Location::default());
	}
}
